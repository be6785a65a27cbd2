//! # Block Sealing
//!
//! Sealing is the pluggable step that runs before a block's hash is fixed.
//! A [`Sealer`] looks at the block's content and returns opaque seal
//! metadata; the block hash is then computed over the content *and* that
//! metadata. The core never interprets the seal beyond hashing it.
//!
//! Two sealers ship with the crate:
//!
//! - [`Unsealed`] — empty metadata, the hash is a plain content hash.
//! - [`ProofOfWork`] — searches for an 8-byte big-endian nonce that gives the
//!   block hash at least `difficulty_bits` leading zero bits.
//!
//! Sealers must be deterministic in the sense that matters for verification:
//! the same content with the same seal metadata always hashes the same, which
//! holds automatically because the hash is computed by [`Block`], not by the
//! sealer.

use std::fmt;

use crate::config::MAX_DIFFICULTY_BITS;
use crate::crypto::hash::{leading_zero_bits, BlockHash};
use crate::error::{LedgerError, LedgerResult};

use super::block::{compute_block_hash, Block};

/// Block content a sealer gets to see.
#[derive(Debug, Clone, Copy)]
pub struct SealInput<'a> {
    pub height: u64,
    pub payload: &'a [u8],
    pub prev_hash: &'a BlockHash,
}

impl SealInput<'_> {
    /// Hash the content together with candidate seal metadata.
    pub fn hash_with(&self, seal: &[u8]) -> BlockHash {
        compute_block_hash(self.height, self.prev_hash, self.payload, seal)
    }
}

/// Pluggable sealing step.
pub trait Sealer: Send + Sync + fmt::Debug {
    /// Produce seal metadata for the given content.
    fn seal(&self, input: &SealInput<'_>) -> LedgerResult<Vec<u8>>;

    /// Whether an existing block satisfies this sealer's rules. The default
    /// accepts everything; cost functions override it.
    fn accepts(&self, _block: &Block) -> bool {
        true
    }
}

impl<S: Sealer + ?Sized> Sealer for Box<S> {
    fn seal(&self, input: &SealInput<'_>) -> LedgerResult<Vec<u8>> {
        (**self).seal(input)
    }

    fn accepts(&self, block: &Block) -> bool {
        (**self).accepts(block)
    }
}

// ---------------------------------------------------------------------------
// Unsealed
// ---------------------------------------------------------------------------

/// No-op sealer: empty seal metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsealed;

impl Sealer for Unsealed {
    fn seal(&self, _input: &SealInput<'_>) -> LedgerResult<Vec<u8>> {
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// ProofOfWork
// ---------------------------------------------------------------------------

/// Nonce length of a proof-of-work seal.
pub const NONCE_LENGTH: usize = 8;

/// Hashcash-style cost function over the block hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofOfWork {
    difficulty_bits: u32,
}

impl ProofOfWork {
    pub fn new(difficulty_bits: u32) -> Self {
        Self { difficulty_bits }
    }

    pub fn difficulty_bits(&self) -> u32 {
        self.difficulty_bits
    }

    fn meets_target(&self, hash: &BlockHash) -> bool {
        leading_zero_bits(hash.as_bytes()) >= self.difficulty_bits
    }
}

impl Sealer for ProofOfWork {
    fn seal(&self, input: &SealInput<'_>) -> LedgerResult<Vec<u8>> {
        if self.difficulty_bits > MAX_DIFFICULTY_BITS {
            return Err(LedgerError::Seal(format!(
                "difficulty {} exceeds maximum of {} bits",
                self.difficulty_bits, MAX_DIFFICULTY_BITS
            )));
        }

        for nonce in 0..=u64::MAX {
            let seal = nonce.to_be_bytes();
            if self.meets_target(&input.hash_with(&seal)) {
                tracing::debug!(
                    height = input.height,
                    nonce,
                    difficulty_bits = self.difficulty_bits,
                    "proof of work found"
                );
                return Ok(seal.to_vec());
            }
        }

        Err(LedgerError::Seal(format!(
            "nonce space exhausted at height {}",
            input.height
        )))
    }

    fn accepts(&self, block: &Block) -> bool {
        block.seal.len() == NONCE_LENGTH && self.meets_target(&block.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(payload: &'a [u8], prev: &'a BlockHash) -> SealInput<'a> {
        SealInput {
            height: 2,
            payload,
            prev_hash: prev,
        }
    }

    #[test]
    fn unsealed_produces_empty_seal() {
        let prev = BlockHash::ZERO;
        let seal = Unsealed.seal(&input(b"data", &prev)).unwrap();
        assert!(seal.is_empty());
    }

    #[test]
    fn proof_of_work_meets_difficulty() {
        let prev = BlockHash::new([9u8; 32]);
        let pow = ProofOfWork::new(8);
        let input = input(b"alice->bob:10", &prev);

        let seal = pow.seal(&input).unwrap();
        assert_eq!(seal.len(), NONCE_LENGTH);

        let hash = input.hash_with(&seal);
        assert!(leading_zero_bits(hash.as_bytes()) >= 8);
    }

    #[test]
    fn proof_of_work_is_deterministic() {
        let prev = BlockHash::new([1u8; 32]);
        let pow = ProofOfWork::new(6);
        let a = pow.seal(&input(b"same", &prev)).unwrap();
        let b = pow.seal(&input(b"same", &prev)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn zero_difficulty_takes_first_nonce() {
        let prev = BlockHash::ZERO;
        let seal = ProofOfWork::new(0).seal(&input(b"x", &prev)).unwrap();
        assert_eq!(seal, 0u64.to_be_bytes().to_vec());
    }

    #[test]
    fn impossible_difficulty_is_rejected() {
        let prev = BlockHash::ZERO;
        let err = ProofOfWork::new(MAX_DIFFICULTY_BITS + 1)
            .seal(&input(b"x", &prev))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Seal(_)));
    }

    #[test]
    fn proof_of_work_rejects_unsealed_block() {
        let block = Block::seal(1, b"genesis".to_vec(), BlockHash::ZERO, &Unsealed).unwrap();
        // An empty seal can never satisfy the nonce-length rule.
        assert!(!ProofOfWork::new(1).accepts(&block));
        assert!(Unsealed.accepts(&block));
    }
}
