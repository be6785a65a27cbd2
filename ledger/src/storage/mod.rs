//! # Storage Module
//!
//! Everything that makes the ledger a ledger: the block record, how it is
//! sealed and encoded, where it is stored, and how the chain is walked.
//!
//! ## Architecture
//!
//! ```text
//! block.rs  — Block structure, hash computation, verification
//! seal.rs   — Pluggable sealing step (Unsealed, ProofOfWork)
//! codec.rs  — Block <-> bytes (bincode), strict decoding
//! db.rs     — sled persistence: hash -> block, top_hash -> tip
//! chain.rs  — Chain orchestration and the Ancestors iterator
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! payload → Chain::append → Block::seal → codec::encode → LedgerDb::transact
//!                                                          (block + tip, atomic)
//! Chain::ancestors → LedgerDb::get → codec::decode → Block → prev_hash → ...
//! ```

pub mod block;
pub mod chain;
pub mod codec;
pub mod db;
pub mod seal;

pub use block::Block;
pub use chain::{Ancestors, Chain};
pub use db::{LedgerDb, LedgerTxn};
pub use seal::{ProofOfWork, SealInput, Sealer, Unsealed};
