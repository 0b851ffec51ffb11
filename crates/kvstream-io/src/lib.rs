//! Streaming byte access to values in a request/response key-value store.
//!
//! The store only offers bounded round-trips (range-read, append, rename,
//! expire, delete). This crate turns them into two streams:
//!
//! - [`ByteSource`] -- pulls a value in window-sized range-reads.
//! - [`ByteSink`] -- appends chunks to a private staging key and publishes
//!   them with a single atomic rename, optionally under the digest of the
//!   bytes written, with a hard size ceiling and a post-commit expiry.
//!
//! Both implement narrow capability traits ([`ChunkSource`], [`ChunkSink`])
//! so other backends and local inputs ([`ReaderSource`], [`IterSource`]) can
//! be wired together with [`pipe`].
//!
//! # Invariants
//!
//! 1. A source never re-reads bytes: its offset advances by a full window per
//!    pull, and no read happens after end of stream or an error.
//! 2. A sink has exactly one staging key, renamed away on commit or deleted
//!    on failure, abort, or drop.
//! 3. The digest covers exactly the appended bytes, in append order.
//! 4. Expiry is applied only after a successful direct commit.

pub mod error;
pub mod options;
pub mod pipe;
pub mod reader;
pub mod sink;
pub mod source;
pub mod traits;

pub use error::{StreamError, StreamResult};
pub use options::{
    SinkOptions, SourceOptions, DEFAULT_WINDOW_SIZE, STAGING_NAMESPACE, STAGING_RANDOM_BYTES,
};
pub use pipe::pipe;
pub use reader::{IterSource, ReaderSource};
pub use sink::ByteSink;
pub use source::ByteSource;
pub use traits::{ChunkSink, ChunkSource, SinkCommit};
