use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::time::Instant;

use crate::batch::{Batch, BatchCommand, BatchReply};
use crate::error::{StoreError, StoreResult};
use crate::traits::{KeyTtl, KvStore};

/// A stored value with its optional expiry deadline.
#[derive(Clone, Debug)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Vec<u8>) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// Entries guarded by the store lock. Expired entries are purged lazily on
/// access, the way Redis treats keys whose deadline has passed.
#[derive(Default)]
struct Entries(HashMap<String, Entry>);

impl Entries {
    fn live(&mut self, key: &str) -> Option<&mut Entry> {
        let now = Instant::now();
        if self.0.get(key).is_some_and(|e| e.is_expired(now)) {
            self.0.remove(key);
        }
        self.0.get_mut(key)
    }

    fn purge_expired(&mut self) {
        let now = Instant::now();
        self.0.retain(|_, e| !e.is_expired(now));
    }

    fn get_range(&mut self, key: &str, start: u64, end: u64) -> Bytes {
        let Some(entry) = self.live(key) else {
            return Bytes::new();
        };
        let len = entry.value.len() as u64;
        if len == 0 || start >= len || start > end {
            return Bytes::new();
        }
        let end = end.min(len - 1);
        Bytes::copy_from_slice(&entry.value[start as usize..=end as usize])
    }

    fn apply(&mut self, command: BatchCommand) -> StoreResult<BatchReply> {
        match command {
            BatchCommand::Set { key, value } => {
                self.0.insert(key, Entry::new(value.to_vec()));
                Ok(BatchReply::Done)
            }
            BatchCommand::Append { key, value } => {
                let length = match self.live(&key) {
                    Some(entry) => {
                        entry.value.extend_from_slice(&value);
                        entry.value.len()
                    }
                    None => {
                        let length = value.len();
                        self.0.insert(key, Entry::new(value.to_vec()));
                        length
                    }
                };
                Ok(BatchReply::Length(length as u64))
            }
            BatchCommand::Rename { from, to } => {
                if self.live(&from).is_none() {
                    return Err(StoreError::NoSuchKey(from));
                }
                if let Some(entry) = self.0.remove(&from) {
                    // The destination takes over the source's expiry.
                    self.0.insert(to, entry);
                }
                Ok(BatchReply::Done)
            }
            BatchCommand::Expire { key, ttl } => match self.live(&key) {
                Some(entry) => {
                    entry.expires_at = Some(Instant::now() + ttl);
                    Ok(BatchReply::Existed(true))
                }
                None => Ok(BatchReply::Existed(false)),
            },
            BatchCommand::Delete { key } => {
                let existed = self.live(&key).is_some();
                self.0.remove(&key);
                Ok(BatchReply::Existed(existed))
            }
        }
    }
}

/// In-memory key-value store with Redis semantics.
///
/// Intended for tests, the CLI, and embedding. All entries live behind a
/// `RwLock`; no lock is held across an await point. Batches execute under a
/// single write lock, so no other operation observes a half-applied batch.
pub struct InMemoryKvStore {
    entries: RwLock<Entries>,
}

impl InMemoryKvStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
        }
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let mut entries = self.entries.write().expect("lock poisoned");
        entries.purge_expired();
        entries.0.len()
    }

    /// Returns `true` if no live key exists.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted list of all live keys.
    pub fn keys(&self) -> Vec<String> {
        let mut entries = self.entries.write().expect("lock poisoned");
        entries.purge_expired();
        let mut keys: Vec<String> = entries.0.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Remove every key.
    pub fn clear(&self) {
        self.entries.write().expect("lock poisoned").0.clear();
    }

    fn apply(&self, command: BatchCommand) -> StoreResult<BatchReply> {
        self.entries.write().expect("lock poisoned").apply(command)
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get_range(&self, key: &str, start: u64, end: u64) -> StoreResult<Bytes> {
        let mut entries = self.entries.write().expect("lock poisoned");
        Ok(entries.get_range(key, start, end))
    }

    async fn append(&self, key: &str, value: &[u8]) -> StoreResult<u64> {
        match self.apply(BatchCommand::Append {
            key: key.to_string(),
            value: Bytes::copy_from_slice(value),
        })? {
            BatchReply::Length(length) => Ok(length),
            other => Err(StoreError::Backend(format!("unexpected APPEND reply {other:?}"))),
        }
    }

    async fn rename(&self, from: &str, to: &str) -> StoreResult<()> {
        self.apply(BatchCommand::Rename {
            from: from.to_string(),
            to: to.to_string(),
        })
        .map(drop)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        let reply = self.apply(BatchCommand::Expire {
            key: key.to_string(),
            ttl,
        })?;
        Ok(reply == BatchReply::Existed(true))
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let reply = self.apply(BatchCommand::Delete {
            key: key.to_string(),
        })?;
        Ok(reply == BatchReply::Existed(true))
    }

    async fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.apply(BatchCommand::Set {
            key: key.to_string(),
            value: Bytes::copy_from_slice(value),
        })
        .map(drop)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        let mut entries = self.entries.write().expect("lock poisoned");
        Ok(entries
            .live(key)
            .map(|entry| Bytes::copy_from_slice(&entry.value)))
    }

    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
        let mut entries = self.entries.write().expect("lock poisoned");
        Ok(match entries.live(key) {
            None => KeyTtl::Missing,
            Some(Entry {
                expires_at: None, ..
            }) => KeyTtl::Persistent,
            Some(Entry {
                expires_at: Some(deadline),
                ..
            }) => KeyTtl::Expires(deadline.saturating_duration_since(Instant::now())),
        })
    }

    async fn scan_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .keys()
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect())
    }

    async fn exec(&self, batch: &Batch) -> StoreResult<Vec<BatchReply>> {
        let commands = batch.take();
        let mut entries = self.entries.write().expect("lock poisoned");
        let mut replies = Vec::with_capacity(commands.len());
        for (index, command) in commands.into_iter().enumerate() {
            let name = command.name();
            let reply = entries.apply(command).map_err(|e| {
                tracing::debug!(index, command = name, error = %e, "batch command failed");
                StoreError::BatchFailed {
                    index,
                    source: Box::new(e),
                }
            })?;
            replies.push(reply);
        }
        Ok(replies)
    }
}

impl std::fmt::Debug for InMemoryKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryKvStore")
            .field("key_count", &count)
            .finish()
    }
}
