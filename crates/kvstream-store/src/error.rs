/// Errors from key-value store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The source key of a rename does not exist.
    #[error("no such key: {0}")]
    NoSuchKey(String),

    /// Failure reported by the storage backend (connection, protocol, server).
    #[error("backend error: {0}")]
    Backend(String),

    /// A command inside an executed batch failed.
    #[error("batch command {index} failed: {source}")]
    BatchFailed {
        index: usize,
        #[source]
        source: Box<StoreError>,
    },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
