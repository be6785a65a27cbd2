//! # Ledger Configuration & Constants
//!
//! Every magic number of the on-disk format lives here, next to the
//! [`LedgerConfig`] that callers hand to [`Chain::open_with`] and
//! [`Chain::initialize_with`]. Changing a constant in the first half of this
//! file makes existing ledgers unreadable, so don't.
//!
//! [`Chain::open_with`]: crate::storage::Chain::open_with
//! [`Chain::initialize_with`]: crate::storage::Chain::initialize_with

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::storage::seal::{ProofOfWork, Sealer, Unsealed};

// ---------------------------------------------------------------------------
// On-disk Layout
// ---------------------------------------------------------------------------

/// Name of the sled tree holding every block and the tip pointer.
pub const BLOCKS_TREE: &str = "blocks";

/// Reserved key in [`BLOCKS_TREE`] whose value is the current tip hash.
/// Block keys are always 32 bytes, so this 8-byte key can never clash.
pub const TOP_HASH_KEY: &[u8] = b"top_hash";

/// Height of the genesis block. Heights are 1-indexed.
pub const GENESIS_HEIGHT: u64 = 1;

/// Block hash length in bytes (BLAKE3 output).
pub const HASH_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Sealing
// ---------------------------------------------------------------------------

/// Upper bound on the proof-of-work target. The nonce is a `u64`, so 2^64
/// attempts is the whole search space; a higher target would almost surely
/// exhaust it. Beyond ~32 bits a single block already takes hours on
/// commodity hardware.
pub const MAX_DIFFICULTY_BITS: u32 = 64;

/// Default data directory when nothing else is configured.
pub const DEFAULT_DATA_DIR: &str = "tally.db";

// ---------------------------------------------------------------------------
// LedgerConfig
// ---------------------------------------------------------------------------

/// Runtime configuration for opening a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Directory of the sled database. Ignored when `temporary` is set.
    pub path: PathBuf,

    /// Open a throwaway database that is removed when the handle drops.
    pub temporary: bool,

    /// Flush to disk after every committed transaction. Turning this off
    /// trades durability of the last few appends for throughput.
    pub flush_on_commit: bool,

    /// Proof-of-work target in leading zero bits. Zero disables sealing.
    pub difficulty_bits: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DATA_DIR),
            temporary: false,
            flush_on_commit: true,
            difficulty_bits: 0,
        }
    }
}

impl LedgerConfig {
    /// Configuration for a persistent ledger at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Configuration for an in-memory ledger, mostly for tests.
    pub fn temporary() -> Self {
        Self {
            temporary: true,
            ..Self::default()
        }
    }

    pub fn with_difficulty(mut self, bits: u32) -> Self {
        self.difficulty_bits = bits;
        self
    }

    pub fn with_flush_on_commit(mut self, flush: bool) -> Self {
        self.flush_on_commit = flush;
        self
    }

    /// Build the sealer this configuration asks for.
    pub fn sealer(&self) -> Box<dyn Sealer> {
        if self.difficulty_bits == 0 {
            Box::new(Unsealed)
        } else {
            Box::new(ProofOfWork::new(self.difficulty_bits))
        }
    }

    /// Translate into sled's own configuration.
    pub(crate) fn sled_config(&self) -> sled::Config {
        let config = sled::Config::new();
        if self.temporary {
            config.temporary(true)
        } else {
            config.path(&self.path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_hash_key_cannot_collide_with_block_keys() {
        assert_ne!(TOP_HASH_KEY.len(), HASH_LENGTH);
    }

    #[test]
    fn default_config_is_durable_and_unsealed() {
        let config = LedgerConfig::default();
        assert!(config.flush_on_commit);
        assert!(!config.temporary);
        assert_eq!(config.difficulty_bits, 0);
        assert_eq!(config.path, PathBuf::from(DEFAULT_DATA_DIR));
    }

    #[test]
    fn builder_setters() {
        let config = LedgerConfig::new("/tmp/ledger")
            .with_difficulty(8)
            .with_flush_on_commit(false);
        assert_eq!(config.path, PathBuf::from("/tmp/ledger"));
        assert_eq!(config.difficulty_bits, 8);
        assert!(!config.flush_on_commit);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: LedgerConfig =
            serde_json::from_str(r#"{ "difficulty_bits": 4 }"#).expect("valid config");
        assert_eq!(config.difficulty_bits, 4);
        assert!(config.flush_on_commit);
        assert_eq!(config.path, PathBuf::from(DEFAULT_DATA_DIR));
    }
}
