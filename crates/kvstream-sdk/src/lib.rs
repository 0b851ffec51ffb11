//! High-level kvstream API.
//!
//! [`StreamStore`] owns one shared store connection and opens streaming
//! readers and atomic streaming writers over it with defaults taken from a
//! [`StreamConfig`]. This is the main entry point for applications.

pub mod config;
pub mod error;
pub mod facade;

pub use config::StreamConfig;
pub use error::{ConfigError, ConfigResult};
pub use facade::StreamStore;

// Re-export key types
pub use kvstream_crypto::DigestAlgorithm;
pub use kvstream_io::{
    pipe, ByteSink, ByteSource, ChunkSink, ChunkSource, IterSource, ReaderSource, SinkCommit,
    SinkOptions, SourceOptions, StreamError, StreamResult,
};
pub use kvstream_store::{Batch, InMemoryKvStore, KeyTtl, KvStore, StoreError};
