//! # Hashing Utilities
//!
//! Every identifier in the ledger is a BLAKE3 digest. This module owns the
//! digest helpers and the [`BlockHash`] newtype that the rest of the crate
//! passes around instead of bare `[u8; 32]` arrays.
//!
//! ## The zero hash
//!
//! The all-zero hash is reserved: it is the `prev_hash` of the genesis block
//! and means "no predecessor". A real BLAKE3 output of all zeros would take
//! about 2^256 attempts to find, so the sentinel never collides with a stored
//! block in practice.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::HASH_LENGTH;

/// Compute the BLAKE3 hash of the input data.
///
/// # Example
///
/// ```
/// use tally_ledger::crypto::blake3_hash;
///
/// let hash = blake3_hash(b"tally");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Hash multiple byte slices together without concatenating them first.
///
/// Feeding the parts one by one into the hasher gives the same digest as
/// hashing their concatenation.
pub fn blake3_hash_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Count the leading zero bits of a digest, most significant bit first.
pub fn leading_zero_bits(digest: &[u8]) -> u32 {
    let mut bits = 0;
    for byte in digest {
        if *byte == 0 {
            bits += 8;
        } else {
            bits += byte.leading_zeros();
            break;
        }
    }
    bits
}

// ---------------------------------------------------------------------------
// BlockHash
// ---------------------------------------------------------------------------

/// A 32-byte BLAKE3 block identifier. Doubles as the block's storage key.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockHash([u8; HASH_LENGTH]);

impl BlockHash {
    /// The "no predecessor" sentinel carried by the genesis block.
    pub const ZERO: BlockHash = BlockHash([0u8; HASH_LENGTH]);

    /// Wrap raw digest bytes.
    pub const fn new(bytes: [u8; HASH_LENGTH]) -> Self {
        BlockHash(bytes)
    }

    /// Parse a hash from a byte slice. Returns `None` unless the slice is
    /// exactly [`HASH_LENGTH`] bytes long.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; HASH_LENGTH] = bytes.try_into().ok()?;
        Some(BlockHash(array))
    }

    /// Parse a hex-encoded hash.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LENGTH] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_LENGTH]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl AsRef<[u8]> for BlockHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; HASH_LENGTH]> for BlockHash {
    fn from(bytes: [u8; HASH_LENGTH]) -> Self {
        BlockHash(bytes)
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({})", self.to_hex())
    }
}
