//! Key-value store capability set for kvstream.
//!
//! The stream layer never talks to a concrete client. It consumes the
//! [`KvStore`] trait: a handful of bounded request/response operations on
//! byte-valued keys (range-read, append, rename, expire, delete, set) plus a
//! deferred [`Batch`] that the caller executes explicitly.
//!
//! # Storage Backends
//!
//! - [`InMemoryKvStore`] -- `HashMap`-based store with Redis semantics and
//!   lazy expiry, for tests, the CLI and embedding
//!
//! # Design Rules
//!
//! 1. Every operation is a single round-trip; nothing here streams.
//! 2. `append` and `rename` are atomic; the stream layer builds its commit
//!    protocol on them.
//! 3. A range-read of a missing key is empty, never an error.
//! 4. All backend errors are propagated verbatim, never retried.

pub mod batch;
pub mod error;
pub mod memory;
pub mod traits;

pub use batch::{Batch, BatchCommand, BatchReply};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryKvStore;
pub use traits::{KeyTtl, KvStore};
