//! # Chain Management
//!
//! [`Chain`] is the only entry point for mutating a ledger. It owns a
//! [`LedgerDb`] handle, the sealer, and an in-memory copy of the tip hash.
//!
//! ## Lifecycle
//!
//! ```text
//!   Uninitialized ──initialize──▶ Initialized ──append──▶ Initialized ...
//!        │                             ▲
//!        └──────open: NotInitialized   └──open
//! ```
//!
//! ## Appending
//!
//! 1. Resolve the tip (cached hash, store as fallback) and decode its block.
//! 2. Seal a block at `tip.height + 1` pointing at `tip.hash`. Sealing can be
//!    slow, so it happens before the transaction starts.
//! 3. In one transaction: require the tip key, write the block, move the tip.
//! 4. Update the cached tip, then flush. A failed flush is reported as
//!    [`LedgerError::Unflushed`] with the cache already pointing at the
//!    committed block.
//!
//! ## Stale tips
//!
//! Two `Chain` instances over the same store do not notify each other. If
//! another instance moved the tip, `append` still builds on this instance's
//! cached tip and logs a warning; call [`Chain::refresh`] first when another
//! writer may be active.

use crate::config::{LedgerConfig, GENESIS_HEIGHT};
use crate::crypto::hash::BlockHash;
use crate::error::{LedgerError, LedgerResult};

use super::block::Block;
use super::db::{abort, LedgerDb, LedgerTxn, TxnResult};
use super::seal::Sealer;

/// A ledger bound to its store.
#[derive(Debug)]
pub struct Chain {
    db: LedgerDb,
    sealer: Box<dyn Sealer>,
    tip: BlockHash,
}

impl Chain {
    /// Create the genesis block from `genesis_payload` and bind to `db`.
    ///
    /// Fails with [`LedgerError::AlreadyInitialized`] if `db` already has a
    /// tip; the store is left untouched in that case.
    pub fn initialize<S>(db: LedgerDb, genesis_payload: &[u8], sealer: S) -> LedgerResult<Self>
    where
        S: Sealer + 'static,
    {
        if db.get_tip()?.is_some() {
            return Err(LedgerError::AlreadyInitialized);
        }

        let genesis = Block::seal(
            GENESIS_HEIGHT,
            genesis_payload.to_vec(),
            BlockHash::ZERO,
            &sealer,
        )?;

        db.commit(|txn| {
            // Re-check under the transaction so racing initializers cannot
            // both write a genesis block.
            if txn.get_tip()?.is_some() {
                return abort(LedgerError::AlreadyInitialized);
            }
            txn.put_block(&genesis)?;
            txn.set_tip(&genesis.hash)
        })?;

        tracing::info!(hash = %genesis.hash, "ledger initialized with genesis block");

        let chain = Self {
            db,
            sealer: Box::new(sealer),
            tip: genesis.hash,
        };
        chain.db.sync_commit()?;
        Ok(chain)
    }

    /// Bind to an already-initialized store.
    pub fn open<S>(db: LedgerDb, sealer: S) -> LedgerResult<Self>
    where
        S: Sealer + 'static,
    {
        let tip = db.get_tip()?.ok_or(LedgerError::NotInitialized)?;
        tracing::debug!(tip = %tip, "ledger opened");

        Ok(Self {
            db,
            sealer: Box::new(sealer),
            tip,
        })
    }

    /// Open the store described by `config` and initialize a new ledger in it.
    pub fn initialize_with(config: &LedgerConfig, genesis_payload: &[u8]) -> LedgerResult<Self> {
        let db = LedgerDb::open_with(config)?;
        Self::initialize(db, genesis_payload, config.sealer())
    }

    /// Open the store described by `config` and bind to its ledger.
    pub fn open_with(config: &LedgerConfig) -> LedgerResult<Self> {
        let db = LedgerDb::open_with(config)?;
        Self::open(db, config.sealer())
    }

    /// Flush and release the store.
    pub fn close(self) -> LedgerResult<()> {
        self.db.close()
    }

    // -- Queries --------------------------------------------------------------

    /// Hash of the most recently appended block.
    pub fn tip(&self) -> BlockHash {
        self.tip
    }

    /// Decode the block the tip points at.
    pub fn tip_block(&self) -> LedgerResult<Block> {
        let tip = self.tip;
        self.db.get_block(&tip)?.ok_or_else(|| {
            LedgerError::CorruptRecord(format!("tip {tip} does not name a stored block"))
        })
    }

    /// Height of the tip block.
    pub fn height(&self) -> LedgerResult<u64> {
        Ok(self.tip_block()?.height)
    }

    pub fn get_block(&self, hash: &BlockHash) -> LedgerResult<Option<Block>> {
        self.db.get_block(hash)
    }

    pub fn sealer(&self) -> &dyn Sealer {
        self.sealer.as_ref()
    }

    pub fn db(&self) -> &LedgerDb {
        &self.db
    }

    /// Walk from the current tip back to genesis.
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors::new(&self.db, self.tip)
    }

    // -- Mutation -------------------------------------------------------------

    /// Seal `payload` into a new block on top of the tip and commit it.
    pub fn append(&mut self, payload: &[u8]) -> LedgerResult<Block> {
        self.append_with(payload, |_| Ok(()), LedgerDb::sync_commit)
    }

    /// Reload the cached tip from the store. Returns the new tip.
    pub fn refresh(&mut self) -> LedgerResult<BlockHash> {
        let tip = self.db.get_tip()?.ok_or(LedgerError::MissingTip)?;
        self.tip = tip;
        Ok(tip)
    }

    /// `append` with a hook that runs inside the commit, between writing
    /// the block and moving the tip, and a `sync` step run after it.
    fn append_with<H, F>(
        &mut self,
        payload: &[u8],
        between_writes: H,
        sync: F,
    ) -> LedgerResult<Block>
    where
        H: Fn(&LedgerTxn<'_>) -> TxnResult<()>,
        F: FnOnce(&LedgerDb) -> LedgerResult<()>,
    {
        let parent = self.tip_block()?;
        let block = Block::seal(
            parent.height + 1,
            payload.to_vec(),
            parent.hash,
            self.sealer.as_ref(),
        )?;

        self.db.commit(|txn| {
            let stored_tip = match txn.get_tip()? {
                Some(tip) => tip,
                None => return abort(LedgerError::MissingTip),
            };
            if stored_tip != parent.hash {
                tracing::warn!(
                    cached = %parent.hash,
                    stored = %stored_tip,
                    "tip moved under this chain handle; appending on the cached tip"
                );
            }
            txn.put_block(&block)?;
            between_writes(txn)?;
            txn.set_tip(&block.hash)
        })?;

        self.tip = block.hash;
        tracing::info!(height = block.height, hash = %block.hash, "block appended");

        sync(&self.db)?;
        Ok(block)
    }

    /// Check every block from the tip down: the stored hash must match the
    /// content and the sealer must accept it. Link and height errors come
    /// from [`Ancestors`]. Returns the number of blocks checked.
    pub fn verify_integrity(&self) -> LedgerResult<u64> {
        let mut checked = 0u64;

        for block in self.ancestors() {
            let block = block?;
            if !block.verify() {
                return Err(LedgerError::CorruptRecord(format!(
                    "block at height {} fails hash verification (stored {}, computed {})",
                    block.height,
                    block.hash,
                    block.compute_hash()
                )));
            }
            if !self.sealer.accepts(&block) {
                return Err(LedgerError::CorruptRecord(format!(
                    "block {} at height {} does not satisfy the seal",
                    block.hash, block.height
                )));
            }
            checked += 1;
        }

        tracing::debug!(blocks = checked, "chain integrity verified");
        Ok(checked)
    }
}

// ---------------------------------------------------------------------------
// Ancestors
// ---------------------------------------------------------------------------

/// Lazy walk from a starting hash back to genesis, one store lookup per step.
///
/// Yields blocks in strictly descending height order and stops after the
/// genesis block. Each step must lower the height by exactly one, so the
/// walk ends after at most `start.height` blocks even if links were
/// rewritten into a cycle. A missing block, a block stored under the wrong
/// key, or a height out of sequence yields a [`LedgerError::CorruptRecord`]
/// and ends the walk.
#[derive(Debug)]
pub struct Ancestors<'a> {
    db: &'a LedgerDb,
    next: Option<BlockHash>,
    expected_height: Option<u64>,
}

impl<'a> Ancestors<'a> {
    /// Start at `start`. A zero hash gives an empty walk.
    pub fn new(db: &'a LedgerDb, start: BlockHash) -> Self {
        Self {
            db,
            next: Some(start).filter(|hash| !hash.is_zero()),
            expected_height: None,
        }
    }
}

impl Iterator for Ancestors<'_> {
    type Item = LedgerResult<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = self.next.take()?;

        let block = match self.db.get_block(&hash) {
            Ok(Some(block)) => block,
            Ok(None) => {
                return Some(Err(LedgerError::CorruptRecord(format!(
                    "broken link: block {hash} is not in the store"
                ))))
            }
            Err(err) => return Some(Err(err)),
        };

        if block.hash != hash {
            return Some(Err(LedgerError::CorruptRecord(format!(
                "block stored under {hash} claims hash {}",
                block.hash
            ))));
        }

        if let Some(expected) = self.expected_height {
            if block.height != expected {
                return Some(Err(LedgerError::CorruptRecord(format!(
                    "block {hash} has height {}, expected {expected}",
                    block.height
                ))));
            }
        }
        self.expected_height = block.height.checked_sub(1);

        tracing::trace!(height = block.height, hash = %hash, "visited block");
        if !block.prev_hash.is_zero() {
            self.next = Some(block.prev_hash);
        }
        Some(Ok(block))
    }
}

impl std::iter::FusedIterator for Ancestors<'_> {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
