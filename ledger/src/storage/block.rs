//! # Block Structure
//!
//! A block is the unit of the ledger: an opaque payload, a height, a link to
//! its predecessor, seal metadata, and a self-identifying hash.
//!
//! ## Block Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  height: u64          (genesis = 1)          │
//! │  payload: Vec<u8>     (opaque)               │
//! │  prev_hash: [u8; 32]  (zero for genesis)     │
//! │  seal: Vec<u8>        (sealer metadata)      │
//! │  hash: [u8; 32]       (BLAKE3, see below)    │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Hash Computation
//!
//! ```text
//! BLAKE3( height (u64 LE) || prev_hash || len(payload) (u64 LE) || payload || seal )
//! ```
//!
//! The payload is length-prefixed so that no payload/seal split can produce
//! the same preimage as another. The seal comes last and needs no prefix.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::GENESIS_HEIGHT;
use crate::crypto::hash::{blake3_hash_multi, BlockHash};
use crate::error::LedgerResult;

use super::seal::{SealInput, Sealer};

/// An immutable ledger record. Construct it with [`Block::seal`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain, 1-indexed.
    pub height: u64,
    /// Application data. Never interpreted by the ledger.
    pub payload: Vec<u8>,
    /// Hash of the predecessor. [`BlockHash::ZERO`] for genesis.
    pub prev_hash: BlockHash,
    /// Metadata produced by the sealing step.
    pub seal: Vec<u8>,
    /// BLAKE3 hash over all of the above.
    pub hash: BlockHash,
}

impl Block {
    /// Run `sealer` over the content and derive the block hash.
    ///
    /// Sealing the same content with a sealer that yields the same metadata
    /// always reproduces the same hash.
    pub fn seal<S: Sealer + ?Sized>(
        height: u64,
        payload: Vec<u8>,
        prev_hash: BlockHash,
        sealer: &S,
    ) -> LedgerResult<Self> {
        let seal = sealer.seal(&SealInput {
            height,
            payload: &payload,
            prev_hash: &prev_hash,
        })?;
        Ok(Self::with_seal(height, payload, prev_hash, seal))
    }

    /// Build a block from already-known seal metadata.
    pub fn with_seal(height: u64, payload: Vec<u8>, prev_hash: BlockHash, seal: Vec<u8>) -> Self {
        let hash = compute_block_hash(height, &prev_hash, &payload, &seal);
        Block {
            height,
            payload,
            prev_hash,
            seal,
            hash,
        }
    }

    /// Recompute the hash from the stored fields.
    pub fn compute_hash(&self) -> BlockHash {
        compute_block_hash(self.height, &self.prev_hash, &self.payload, &self.seal)
    }

    /// True when the stored hash matches the content. A `false` here means
    /// the record was tampered with or corrupted on disk.
    pub fn verify(&self) -> bool {
        self.hash == self.compute_hash()
    }

    pub fn is_genesis(&self) -> bool {
        self.height == GENESIS_HEIGHT && self.prev_hash.is_zero()
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn hash_hex(&self) -> String {
        self.hash.to_hex()
    }

    pub fn prev_hash_hex(&self) -> String {
        self.prev_hash.to_hex()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "height:    {}", self.height)?;
        writeln!(f, "hash:      {}", self.hash)?;
        writeln!(f, "prev_hash: {}", self.prev_hash)?;
        writeln!(f, "seal:      {}", hex::encode(&self.seal))?;
        write!(f, "payload:   {}", String::from_utf8_lossy(&self.payload))
    }
}

/// Hash block content plus seal metadata.
pub(crate) fn compute_block_hash(
    height: u64,
    prev_hash: &BlockHash,
    payload: &[u8],
    seal: &[u8],
) -> BlockHash {
    let height_bytes = height.to_le_bytes();
    let payload_len = (payload.len() as u64).to_le_bytes();
    BlockHash::new(blake3_hash_multi(&[
        &height_bytes[..],
        &prev_hash.as_bytes()[..],
        &payload_len[..],
        payload,
        seal,
    ]))
}
