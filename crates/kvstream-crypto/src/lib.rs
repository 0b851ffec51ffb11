//! Digests for kvstream.
//!
//! A write session configured with a [`DigestAlgorithm`] feeds every appended
//! chunk into a [`StreamHasher`]. The lowercase hex digest becomes the
//! session's commit key when the caller supplied none, giving
//! content-addressed deduplication.
//!
//! All hashing wraps established libraries (`sha2`, `blake3`).

pub mod hasher;

pub use hasher::{DigestAlgorithm, DigestError, StreamHasher};
