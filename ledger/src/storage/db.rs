//! # LedgerDb — Persistent Storage Engine
//!
//! The ledger's store, built on sled's embedded key-value store. A single
//! sled tree holds everything:
//!
//! | Tree     | Key                 | Value                  |
//! |----------|---------------------|------------------------|
//! | `blocks` | block hash (32B)    | `codec::encode(Block)` |
//! | `blocks` | `b"top_hash"` (8B)  | tip hash (32B)         |
//!
//! Hashes have no useful ordering, so the tree is only ever read by point
//! lookups. Chain order is rebuilt by walking `prev_hash` links from the tip
//! (see [`Ancestors`](super::chain::Ancestors)).
//!
//! ## Atomicity
//!
//! Every mutation goes through [`LedgerDb::transact`], which wraps a sled
//! transaction on the `blocks` tree. A block insert and the tip rewrite
//! either both land or neither does. sled serializes conflicting writers and
//! re-runs the closure on conflict, which is why the closure is `Fn`.
//!
//! ## Lifetime
//!
//! sled takes an exclusive lock on the database directory when it opens and
//! releases it when the last handle is dropped, on every exit path.
//! [`LedgerDb::close`] flushes before dropping.

use std::path::Path;

use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
    TransactionalTree,
};
use sled::{Db, Tree};

use crate::config::{LedgerConfig, BLOCKS_TREE, TOP_HASH_KEY};
use crate::crypto::hash::BlockHash;
use crate::error::{LedgerError, LedgerResult};

use super::block::Block;
use super::codec;

/// Result type of a closure running inside [`LedgerDb::transact`].
pub type TxnResult<T> = ConflictableTransactionResult<T, LedgerError>;

/// Abort the surrounding transaction with a ledger error. Nothing the
/// closure wrote so far becomes visible.
pub fn abort<T>(err: LedgerError) -> TxnResult<T> {
    Err(ConflictableTransactionError::Abort(err))
}

fn parse_tip(bytes: &[u8]) -> LedgerResult<BlockHash> {
    BlockHash::from_slice(bytes).ok_or_else(|| {
        LedgerError::CorruptRecord(format!("tip pointer has {} bytes, expected 32", bytes.len()))
    })
}

// ---------------------------------------------------------------------------
// LedgerDb
// ---------------------------------------------------------------------------

/// Handle to the ledger's sled database.
///
/// Cloning is cheap and yields another handle to the same database; sled
/// keeps the directory lock until every clone is dropped.
#[derive(Debug, Clone)]
pub struct LedgerDb {
    db: Db,
    blocks: Tree,
    flush_on_commit: bool,
}

impl LedgerDb {
    /// Open or create a durable ledger store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> LedgerResult<Self> {
        Self::open_with(&LedgerConfig::new(path))
    }

    /// Open a store that lives in a temporary location and disappears when
    /// the last handle is dropped.
    pub fn open_temporary() -> LedgerResult<Self> {
        Self::open_with(&LedgerConfig::temporary())
    }

    /// Open a store as described by `config`.
    pub fn open_with(config: &LedgerConfig) -> LedgerResult<Self> {
        let db = config.sled_config().open()?;
        let blocks = db.open_tree(BLOCKS_TREE)?;
        tracing::debug!(
            path = %config.path.display(),
            temporary = config.temporary,
            "ledger store opened"
        );

        Ok(Self {
            db,
            blocks,
            flush_on_commit: config.flush_on_commit,
        })
    }

    /// Flush outstanding writes and release this handle.
    pub fn close(self) -> LedgerResult<()> {
        self.db.flush()?;
        tracing::debug!("ledger store closed");
        Ok(())
    }

    // -- Reads ----------------------------------------------------------------

    /// Raw point lookup outside of a transaction.
    pub fn get(&self, key: &[u8]) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self.blocks.get(key)?.map(|value| value.to_vec()))
    }

    /// Current tip hash, or `None` if the ledger was never initialized.
    pub fn get_tip(&self) -> LedgerResult<Option<BlockHash>> {
        self.get(TOP_HASH_KEY)?
            .map(|bytes| parse_tip(&bytes))
            .transpose()
    }

    /// Fetch and decode the block stored under `hash`.
    pub fn get_block(&self, hash: &BlockHash) -> LedgerResult<Option<Block>> {
        self.get(hash.as_ref())?
            .map(|bytes| codec::decode(&bytes))
            .transpose()
    }

    pub fn contains_block(&self, hash: &BlockHash) -> LedgerResult<bool> {
        Ok(self.blocks.contains_key(hash.as_ref())?)
    }

    /// Number of stored blocks. Walks the whole tree.
    pub fn block_count(&self) -> LedgerResult<usize> {
        let tip = usize::from(self.blocks.contains_key(TOP_HASH_KEY)?);
        Ok(self.blocks.len() - tip)
    }

    // -- Writes ---------------------------------------------------------------

    /// Run `f` inside one atomic transaction on the blocks tree, then
    /// [`sync_commit`](Self::sync_commit).
    ///
    /// All writes made by `f` commit together, or none do if `f` aborts or
    /// sled hits an I/O error. A [`LedgerError::Unflushed`] result means the
    /// writes did commit.
    pub fn transact<F, T>(&self, f: F) -> LedgerResult<T>
    where
        F: Fn(&LedgerTxn<'_>) -> TxnResult<T>,
    {
        let value = self.commit(f)?;
        self.sync_commit()?;
        Ok(value)
    }

    /// Run `f` inside one atomic transaction without flushing afterwards.
    ///
    /// Any error returned here means nothing was written.
    pub fn commit<F, T>(&self, f: F) -> LedgerResult<T>
    where
        F: Fn(&LedgerTxn<'_>) -> TxnResult<T>,
    {
        self.blocks
            .transaction(|tree| f(&LedgerTxn { tree }))
            .map_err(|err| match err {
                TransactionError::Abort(err) => err,
                TransactionError::Storage(err) => LedgerError::Io(err),
            })
    }

    /// Flush a finished commit if `flush_on_commit` is set. Failures come
    /// back as [`LedgerError::Unflushed`].
    pub fn sync_commit(&self) -> LedgerResult<()> {
        if self.flush_on_commit {
            self.db.flush().map_err(LedgerError::Unflushed)?;
        }
        Ok(())
    }

    /// Force a flush of all pending writes to disk.
    pub fn flush(&self) -> LedgerResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LedgerTxn
// ---------------------------------------------------------------------------

/// Read/write view of the blocks tree inside [`LedgerDb::transact`].
pub struct LedgerTxn<'a> {
    tree: &'a TransactionalTree,
}

impl LedgerTxn<'_> {
    pub fn get(&self, key: &[u8]) -> TxnResult<Option<Vec<u8>>> {
        Ok(self.tree.get(key)?.map(|value| value.to_vec()))
    }

    pub fn insert(&self, key: &[u8], value: Vec<u8>) -> TxnResult<()> {
        self.tree.insert(key, value)?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn remove(&self, key: &[u8]) -> TxnResult<()> {
        self.tree.remove(key)?;
        Ok(())
    }

    pub fn get_tip(&self) -> TxnResult<Option<BlockHash>> {
        match self.get(TOP_HASH_KEY)? {
            Some(bytes) => match parse_tip(&bytes) {
                Ok(hash) => Ok(Some(hash)),
                Err(err) => abort(err),
            },
            None => Ok(None),
        }
    }

    /// Write `block` under its own hash.
    pub fn put_block(&self, block: &Block) -> TxnResult<()> {
        let bytes = codec::encode(block).map_err(ConflictableTransactionError::Abort)?;
        self.insert(block.hash.as_ref(), bytes)
    }

    /// Point the tip at `hash`.
    pub fn set_tip(&self, hash: &BlockHash) -> TxnResult<()> {
        self.insert(TOP_HASH_KEY, hash.as_ref().to_vec())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GENESIS_HEIGHT;
    use crate::storage::seal::Unsealed;

    fn make_block_chain(count: u64) -> Vec<Block> {
        let mut blocks = vec![Block::seal(
            GENESIS_HEIGHT,
            b"genesis".to_vec(),
            BlockHash::ZERO,
            &Unsealed,
        )
        .unwrap()];
        for height in 2..=count {
            let parent = blocks.last().unwrap().hash;
            let payload = format!("block {height}").into_bytes();
            blocks.push(Block::seal(height, payload, parent, &Unsealed).unwrap());
        }
        blocks
    }

    fn commit(db: &LedgerDb, block: &Block) {
        db.transact(|txn| {
            txn.put_block(block)?;
            txn.set_tip(&block.hash)
        })
        .unwrap();
    }

    #[test]
    fn open_temporary_database() {
        let db = LedgerDb::open_temporary().expect("should create temp db");
        assert_eq!(db.block_count().unwrap(), 0);
        assert!(db.get_tip().unwrap().is_none());
    }

    #[test]
    fn open_persistent_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocks = make_block_chain(1);

        let db = LedgerDb::open(dir.path()).expect("should open db");
        commit(&db, &blocks[0]);
        db.close().unwrap();

        let reopened = LedgerDb::open(dir.path()).expect("should reopen db");
        assert_eq!(reopened.get_tip().unwrap(), Some(blocks[0].hash));
        assert_eq!(reopened.get_block(&blocks[0].hash).unwrap(), Some(blocks[0].clone()));
    }

    #[test]
    fn transaction_commits_block_and_tip_together() {
        let db = LedgerDb::open_temporary().unwrap();
        let blocks = make_block_chain(3);
        for block in &blocks {
            commit(&db, block);
        }

        assert_eq!(db.block_count().unwrap(), 3);
        assert_eq!(db.get_tip().unwrap(), Some(blocks[2].hash));
        for block in &blocks {
            assert!(db.contains_block(&block.hash).unwrap());
        }
    }

    #[test]
    fn aborted_transaction_leaves_no_trace() {
        let db = LedgerDb::open_temporary().unwrap();
        let blocks = make_block_chain(2);
        commit(&db, &blocks[0]);

        let err = db
            .transact(|txn| {
                txn.put_block(&blocks[1])?;
                abort::<()>(LedgerError::MissingTip)
            })
            .unwrap_err();

        assert!(matches!(err, LedgerError::MissingTip));
        assert!(!db.contains_block(&blocks[1].hash).unwrap());
        assert_eq!(db.get_tip().unwrap(), Some(blocks[0].hash));
    }

    #[test]
    fn transaction_reads_its_own_writes() {
        let db = LedgerDb::open_temporary().unwrap();
        let block = &make_block_chain(1)[0];

        let tip = db
            .transact(|txn| {
                txn.set_tip(&block.hash)?;
                txn.get_tip()
            })
            .unwrap();
        assert_eq!(tip, Some(block.hash));
    }

    #[test]
    fn get_block_returns_none_for_unknown_hash() {
        let db = LedgerDb::open_temporary().unwrap();
        assert!(db.get_block(&BlockHash::new([0xAB; 32])).unwrap().is_none());
    }

    #[test]
    fn malformed_tip_is_corrupt() {
        let db = LedgerDb::open_temporary().unwrap();
        db.transact(|txn| txn.insert(TOP_HASH_KEY, vec![1, 2, 3])).unwrap();

        assert!(matches!(db.get_tip(), Err(LedgerError::CorruptRecord(_))));
        let in_txn = db.transact(|txn| txn.get_tip());
        assert!(matches!(in_txn, Err(LedgerError::CorruptRecord(_))));
    }

    #[test]
    fn malformed_block_is_corrupt() {
        let db = LedgerDb::open_temporary().unwrap();
        let hash = BlockHash::new([7u8; 32]);
        db.transact(|txn| txn.insert(hash.as_ref(), b"junk".to_vec())).unwrap();

        assert!(matches!(db.get_block(&hash), Err(LedgerError::CorruptRecord(_))));
    }

    #[test]
    fn concurrent_reads_see_committed_tip() {
        use std::sync::Arc;
        use std::thread;

        let db = Arc::new(LedgerDb::open_temporary().unwrap());
        let blocks = make_block_chain(4);
        for block in &blocks {
            commit(&db, block);
        }
        let expected = blocks[3].hash;

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let db = Arc::clone(&db);
                thread::spawn(move || {
                    let tip = db.get_tip().unwrap().unwrap();
                    assert_eq!(tip, expected);
                    db.get_block(&tip).unwrap().unwrap().height
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().expect("reader thread should not panic"), 4);
        }
    }

    #[test]
    fn commit_without_sync_is_visible() {
        let db = LedgerDb::open_temporary().unwrap();
        let block = &make_block_chain(1)[0];

        db.commit(|txn| {
            txn.put_block(block)?;
            txn.set_tip(&block.hash)
        })
        .unwrap();
        assert_eq!(db.get_tip().unwrap(), Some(block.hash));
        db.sync_commit().unwrap();
    }

    #[test]
    fn flush_does_not_error() {
        let db = LedgerDb::open_with(&LedgerConfig::temporary().with_flush_on_commit(false))
            .unwrap();
        commit(&db, &make_block_chain(1)[0]);
        db.flush().expect("flush should succeed");
    }
}
