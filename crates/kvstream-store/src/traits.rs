use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::batch::{Batch, BatchCommand, BatchReply};
use crate::error::{StoreError, StoreResult};

/// Remaining lifetime of a key, as reported by [`KvStore::ttl`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyTtl {
    /// The key does not exist.
    Missing,
    /// The key exists and never expires.
    Persistent,
    /// The key expires after the given duration.
    Expires(Duration),
}

/// Request/response key-value store holding byte values.
///
/// This is the capability set the stream layer consumes. Every operation is a
/// single bounded round-trip; nothing here streams. Implementations must
/// satisfy:
/// - `append` and `rename` are atomic with respect to other operations.
/// - `get_range` never fails for a missing key; it returns no bytes.
/// - Errors are returned verbatim, never retried.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the inclusive byte range `[start, end]` of a value.
    ///
    /// The range is clamped to the value; a range past the end or a missing
    /// key yields an empty buffer.
    async fn get_range(&self, key: &str, start: u64, end: u64) -> StoreResult<Bytes>;

    /// Append bytes to a value, creating it if absent. Returns the new length.
    async fn append(&self, key: &str, value: &[u8]) -> StoreResult<u64>;

    /// Atomically rename `from` to `to`, overwriting `to`.
    ///
    /// Fails with [`StoreError::NoSuchKey`] if `from` does not exist.
    async fn rename(&self, from: &str, to: &str) -> StoreResult<()>;

    /// Set a time-to-live on a key. Returns `false` if the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool>;

    /// Delete a key. Returns `true` if the key existed.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Unconditionally set a value, clearing any time-to-live.
    async fn set(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Read a whole value.
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>>;

    /// Query the remaining lifetime of a key.
    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl>;

    /// List keys starting with `prefix`, sorted.
    async fn scan_prefix(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Execute and drain every command queued in `batch`, in order.
    ///
    /// Default implementation issues the commands one by one and stops at the
    /// first failure. Backends with native transactions should override it.
    async fn exec(&self, batch: &Batch) -> StoreResult<Vec<BatchReply>> {
        let mut replies = Vec::new();
        for (index, command) in batch.take().into_iter().enumerate() {
            let reply = match command {
                BatchCommand::Set { key, value } => {
                    self.set(&key, &value).await.map(|()| BatchReply::Done)
                }
                BatchCommand::Append { key, value } => {
                    self.append(&key, &value).await.map(BatchReply::Length)
                }
                BatchCommand::Rename { from, to } => {
                    self.rename(&from, &to).await.map(|()| BatchReply::Done)
                }
                BatchCommand::Expire { key, ttl } => {
                    self.expire(&key, ttl).await.map(BatchReply::Existed)
                }
                BatchCommand::Delete { key } => self.delete(&key).await.map(BatchReply::Existed),
            };
            let reply = reply.map_err(|e| StoreError::BatchFailed {
                index,
                source: Box::new(e),
            })?;
            replies.push(reply);
        }
        Ok(replies)
    }
}
