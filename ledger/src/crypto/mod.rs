//! # Cryptographic Primitives
//!
//! Hashing only. Block identity, linkage and the proof-of-work target are all
//! expressed in terms of BLAKE3 digests produced here.

pub mod hash;

pub use hash::{blake3_hash, blake3_hash_multi, leading_zero_bits, BlockHash};
