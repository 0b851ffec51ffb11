use kvstream_store::StoreError;

/// Errors surfaced by byte sources and sinks.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// A sink was opened with neither a key nor a digest algorithm.
    #[error("write stream requires a key or a digest algorithm")]
    MissingIdentity,

    /// A source was opened without a key.
    #[error("read stream requires a key")]
    MissingKey,

    #[error("window size must be greater than zero")]
    InvalidWindowSize,

    #[error("ttl must be greater than zero")]
    InvalidTtl,

    /// The staged value grew past the configured ceiling.
    #[error("write stream exceeded maximum allowed length of {max_bytes} bytes")]
    SizeExceeded { max_bytes: u64 },

    /// An underlying store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Rename or expire failed after every byte was appended.
    #[error("commit to {key} failed: {source}")]
    Commit {
        key: String,
        #[source]
        source: StoreError,
    },

    /// The sink already finished or was aborted.
    #[error("write stream is closed")]
    Closed,

    /// Reading from a local byte source failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;
