//! # Block Codec
//!
//! On-disk encoding of a [`Block`]: bincode 1 with its default fixed-int,
//! little-endian layout, fields in declaration order:
//!
//! ```text
//! height (u64) | payload (u64 len + bytes) | prev_hash (32B) | seal (u64 len + bytes) | hash (32B)
//! ```
//!
//! Decoding is strict. Besides bincode's own structural checks, a record is
//! rejected if it carries trailing bytes or describes a block that could never
//! have been produced by [`Block::seal`] in a valid chain (height 0, or a
//! genesis/predecessor mismatch). Hash consistency is *not* checked here; that
//! is [`Block::verify`]'s job.

use crate::config::GENESIS_HEIGHT;
use crate::error::{LedgerError, LedgerResult};

use super::block::Block;

/// Serialize a block for storage. Writing into a `Vec` has no failure path,
/// so this only errs if bincode itself is broken.
pub fn encode(block: &Block) -> LedgerResult<Vec<u8>> {
    bincode::serialize(block).map_err(|e| LedgerError::CorruptRecord(e.to_string()))
}

/// Parse a stored record back into a block.
pub fn decode(bytes: &[u8]) -> LedgerResult<Block> {
    let block: Block = bincode::deserialize(bytes)
        .map_err(|e| LedgerError::CorruptRecord(format!("undecodable block: {e}")))?;

    let consumed = bincode::serialized_size(&block)
        .map_err(|e| LedgerError::CorruptRecord(e.to_string()))?;
    if consumed != bytes.len() as u64 {
        return Err(LedgerError::CorruptRecord(format!(
            "block record has {} trailing bytes",
            bytes.len() as u64 - consumed
        )));
    }

    if block.height < GENESIS_HEIGHT {
        return Err(LedgerError::CorruptRecord(format!(
            "impossible block height {}",
            block.height
        )));
    }
    if (block.height == GENESIS_HEIGHT) != block.prev_hash.is_zero() {
        return Err(LedgerError::CorruptRecord(format!(
            "block {} at height {} has inconsistent predecessor {}",
            block.hash, block.height, block.prev_hash
        )));
    }

    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::BlockHash;
    use crate::storage::seal::{ProofOfWork, Unsealed};

    fn genesis() -> Block {
        Block::seal(GENESIS_HEIGHT, b"alice:100".to_vec(), BlockHash::ZERO, &Unsealed).unwrap()
    }

    #[test]
    fn roundtrip_unsealed_and_pow_blocks() {
        let genesis = genesis();
        let child = Block::seal(2, b"alice->bob:10".to_vec(), genesis.hash, &ProofOfWork::new(6))
            .unwrap();
        let empty = Block::seal(3, Vec::new(), child.hash, &Unsealed).unwrap();

        for block in [genesis, child, empty] {
            let bytes = encode(&block).unwrap();
            assert_eq!(decode(&bytes).unwrap(), block);
        }
    }

    #[test]
    fn encoding_is_deterministic() {
        assert_eq!(encode(&genesis()).unwrap(), encode(&genesis()).unwrap());
    }

    #[test]
    fn garbage_is_corrupt() {
        let err = decode(b"definitely not a block").unwrap_err();
        assert!(matches!(err, LedgerError::CorruptRecord(_)));
    }

    #[test]
    fn truncated_record_is_corrupt() {
        let bytes = encode(&genesis()).unwrap();
        let err = decode(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, LedgerError::CorruptRecord(_)));
    }

    #[test]
    fn trailing_bytes_are_corrupt() {
        let mut bytes = encode(&genesis()).unwrap();
        bytes.push(0);
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, LedgerError::CorruptRecord(_)));
    }

    #[test]
    fn height_zero_is_corrupt() {
        let block = Block::with_seal(0, b"x".to_vec(), BlockHash::ZERO, Vec::new());
        let err = decode(&encode(&block).unwrap()).unwrap_err();
        assert!(matches!(err, LedgerError::CorruptRecord(_)));
    }

    #[test]
    fn genesis_with_predecessor_is_corrupt() {
        let block = Block::with_seal(1, b"x".to_vec(), BlockHash::new([5u8; 32]), Vec::new());
        assert!(decode(&encode(&block).unwrap()).is_err());
    }

    #[test]
    fn orphan_without_predecessor_is_corrupt() {
        let block = Block::with_seal(4, b"x".to_vec(), BlockHash::ZERO, Vec::new());
        assert!(decode(&encode(&block).unwrap()).is_err());
    }
}
