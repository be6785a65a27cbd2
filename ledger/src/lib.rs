// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Tally Ledger — Core Library
//!
//! A minimal append-only ledger: a singly-linked sequence of immutable blocks,
//! each naming its predecessor by BLAKE3 hash, persisted in sled and driven
//! through a small chain API.
//!
//! ## Architecture
//!
//! - **crypto** — BLAKE3 helpers and the `BlockHash` identifier.
//! - **storage** — Block, sealing, codec, the sled-backed store, and `Chain`.
//! - **config** — On-disk constants and `LedgerConfig`.
//! - **error** — The `LedgerError` taxonomy.
//!
//! ## Quick Start
//!
//! ```
//! use tally_ledger::storage::{Chain, LedgerDb, Unsealed};
//!
//! let db = LedgerDb::open_temporary()?;
//! let mut chain = Chain::initialize(db, b"alice:100", Unsealed)?;
//! let block = chain.append(b"alice->bob:10")?;
//! assert_eq!(block.height, 2);
//! assert_eq!(chain.ancestors().count(), 2);
//! # Ok::<(), tally_ledger::LedgerError>(())
//! ```

pub mod config;
pub mod crypto;
pub mod error;
pub mod storage;

pub use config::LedgerConfig;
pub use crypto::BlockHash;
pub use error::{LedgerError, LedgerResult};
pub use storage::{Block, Chain};
