//! Error taxonomy shared by every layer of the ledger.

/// Errors surfaced by the codec, the store and the chain.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger is already initialized")]
    AlreadyInitialized,

    #[error("ledger is not initialized")]
    NotInitialized,

    #[error("tip pointer is missing from the store")]
    MissingTip,

    #[error("corrupt record: {0}")]
    CorruptRecord(String),

    #[error("sled error: {0}")]
    Io(#[from] sled::Error),

    /// The transaction committed, but flushing it to disk failed. The
    /// change is visible to readers and may not survive a crash.
    #[error("committed but not flushed to disk: {0}")]
    Unflushed(#[source] sled::Error),

    #[error("sealing failed: {0}")]
    Seal(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
