use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use kvstream_crypto::StreamHasher;
use kvstream_store::{Batch, KvStore, StoreResult};
use rand::RngCore;
use tracing::{debug, warn};

use crate::error::{StreamError, StreamResult};
use crate::options::{SinkOptions, STAGING_NAMESPACE, STAGING_RANDOM_BYTES};
use crate::traits::{ChunkSink, SinkCommit};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SessionState {
    Open,
    Committed,
    Aborted,
}

/// Push-based writer that publishes a value atomically.
///
/// Chunks are appended to a private staging key. Nothing is visible under
/// the commit key until [`finish`](ChunkSink::finish) renames the staging key
/// onto it, so readers see either the old value or the complete new one.
///
/// # Commit key
///
/// The hex digest if a digest algorithm is configured, else the caller's key.
/// With neither (unreachable through [`open`](Self::open)) the staging key
/// itself is kept.
///
/// # Size ceiling
///
/// `max_bytes` is checked against the total the store reports after each
/// append. The append that crosses the ceiling has already landed when the
/// error is raised, so the staged value overshoots by at most one window
/// until the abort deletes it.
///
/// # Batches
///
/// With a caller-owned [`Batch`], `finish` only queues the rename and the
/// configured TTL is **not** applied. The caller must execute the batch for
/// the value to appear and must set any expiry itself.
///
/// # Cleanup
///
/// Any failed write or commit deletes the staging key. A sink dropped while
/// still open spawns the delete on the current tokio runtime.
pub struct ByteSink {
    store: Arc<dyn KvStore>,
    staging_key: String,
    key: Option<String>,
    window_size: usize,
    max_bytes: Option<u64>,
    ttl: Option<Duration>,
    hasher: Option<StreamHasher>,
    batch: Option<Batch>,
    length: u64,
    digest: Option<String>,
    commit_key: Option<String>,
    state: SessionState,
}

impl ByteSink {
    /// Validate the options and create the staging key.
    ///
    /// Fails without touching the store if `key` is absent or empty and no
    /// digest algorithm is configured, or if the window or ttl is zero. Fails with the store's error if the
    /// staging key cannot be created.
    pub async fn open(
        store: Arc<dyn KvStore>,
        key: Option<String>,
        options: SinkOptions,
    ) -> StreamResult<Self> {
        let key = key.filter(|k| !k.is_empty());
        if key.is_none() && options.digest.is_none() {
            return Err(StreamError::MissingIdentity);
        }
        if options.window_size == 0 {
            return Err(StreamError::InvalidWindowSize);
        }
        if options.ttl.is_some_and(|ttl| ttl.is_zero()) {
            return Err(StreamError::InvalidTtl);
        }

        let staging_key = new_staging_key();
        store.set(&staging_key, b"").await?;
        debug!(staging = %staging_key, key = ?key, digest = ?options.digest, "write session opened");

        Ok(Self {
            store,
            staging_key,
            key,
            window_size: options.window_size,
            max_bytes: options.max_bytes,
            ttl: options.ttl,
            hasher: options.digest.map(StreamHasher::new),
            batch: options.batch,
            length: 0,
            digest: None,
            commit_key: None,
            state: SessionState::Open,
        })
    }

    pub fn staging_key(&self) -> &str {
        &self.staging_key
    }

    /// Caller-supplied key, if any.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Staged length as last reported by the store.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Hex digest, available once the session finished.
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// Key the session committed to, available once the session finished.
    pub fn commit_key(&self) -> Option<&str> {
        self.commit_key.as_deref()
    }

    pub fn max_bytes(&self) -> Option<u64> {
        self.max_bytes
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// `true` once the session committed or was aborted.
    pub fn is_finished(&self) -> bool {
        self.state != SessionState::Open
    }

    pub fn is_committed(&self) -> bool {
        self.state == SessionState::Committed
    }

    fn ensure_open(&self) -> StreamResult<()> {
        match self.state {
            SessionState::Open => Ok(()),
            _ => Err(StreamError::Closed),
        }
    }

    async fn append_piece(&mut self, piece: &[u8]) -> StreamResult<()> {
        let length = self.store.append(&self.staging_key, piece).await?;
        self.length = length;
        if let Some(hasher) = self.hasher.as_mut() {
            hasher.update(piece);
        }
        match self.max_bytes {
            Some(max_bytes) if length > max_bytes => Err(StreamError::SizeExceeded { max_bytes }),
            _ => Ok(()),
        }
    }

    async fn publish(&self, commit_key: &str) -> StoreResult<()> {
        self.store.rename(&self.staging_key, commit_key).await?;
        if let Some(ttl) = self.ttl {
            self.store.expire(commit_key, ttl).await?;
        }
        Ok(())
    }

    /// Delete the staging key after a failure, keeping the original error.
    async fn discard(&mut self, cause: &StreamError) {
        self.state = SessionState::Aborted;
        match self.store.delete(&self.staging_key).await {
            Ok(_) => debug!(staging = %self.staging_key, error = %cause, "write session aborted"),
            Err(e) => warn!(
                staging = %self.staging_key,
                error = %e,
                cause = %cause,
                "failed to delete staging key"
            ),
        }
    }

    fn committed(&self, deferred: bool) -> SinkCommit {
        SinkCommit {
            key: self.commit_key.clone().unwrap_or_default(),
            digest: self.digest.clone(),
            length: self.length,
            deferred,
        }
    }
}

#[async_trait]
impl ChunkSink for ByteSink {
    /// Append `chunk` to the staging key, in window-sized pieces.
    async fn write_chunk(&mut self, mut chunk: Bytes) -> StreamResult<()> {
        self.ensure_open()?;
        while !chunk.is_empty() {
            let piece = chunk.split_to(self.window_size.min(chunk.len()));
            if let Err(e) = self.append_piece(&piece).await {
                self.discard(&e).await;
                return Err(e);
            }
        }
        Ok(())
    }

    async fn finish(&mut self) -> StreamResult<SinkCommit> {
        self.ensure_open()?;

        self.digest = self.hasher.take().map(StreamHasher::finalize_hex);
        let commit_key = self
            .digest
            .clone()
            .or_else(|| self.key.clone())
            .unwrap_or_else(|| self.staging_key.clone());
        self.commit_key = Some(commit_key.clone());

        if let Some(batch) = &self.batch {
            batch.rename(self.staging_key.clone(), commit_key.clone());
            self.state = SessionState::Committed;
            debug!(
                staging = %self.staging_key,
                key = %commit_key,
                length = self.length,
                "commit rename queued into batch"
            );
            return Ok(self.committed(true));
        }

        if let Err(source) = self.publish(&commit_key).await {
            let err = StreamError::Commit {
                key: commit_key,
                source,
            };
            self.discard(&err).await;
            return Err(err);
        }
        self.state = SessionState::Committed;
        debug!(key = %commit_key, length = self.length, ttl = ?self.ttl, "write session committed");
        Ok(self.committed(false))
    }

    /// Delete the staging key. Safe to call more than once.
    async fn abort(&mut self) -> StreamResult<()> {
        if self.state == SessionState::Open {
            self.state = SessionState::Aborted;
        }
        self.store.delete(&self.staging_key).await?;
        debug!(staging = %self.staging_key, "staging key deleted");
        Ok(())
    }
}

impl Drop for ByteSink {
    fn drop(&mut self) {
        if self.state != SessionState::Open {
            return;
        }
        let store = Arc::clone(&self.store);
        let staging = std::mem::take(&mut self.staging_key);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = store.delete(&staging).await {
                        warn!(staging = %staging, error = %e, "failed to delete staging key of dropped sink");
                    }
                });
            }
            Err(_) => {
                warn!(staging = %staging, "sink dropped outside a tokio runtime; staging key left behind");
            }
        }
    }
}

impl std::fmt::Debug for ByteSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteSink")
            .field("staging_key", &self.staging_key)
            .field("key", &self.key)
            .field("length", &self.length)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

fn new_staging_key() -> String {
    let mut bytes = [0u8; STAGING_RANDOM_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{STAGING_NAMESPACE}{}", BASE64.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvstream_crypto::DigestAlgorithm;
    use kvstream_store::InMemoryKvStore;

    fn memory() -> (Arc<InMemoryKvStore>, Arc<dyn KvStore>) {
        let store = Arc::new(InMemoryKvStore::new());
        let dyn_store: Arc<dyn KvStore> = store.clone();
        (store, dyn_store)
    }

    #[test]
    fn staging_keys_are_namespaced_and_unique() {
        let a = new_staging_key();
        let b = new_staging_key();
        assert!(a.starts_with(STAGING_NAMESPACE));
        // 15 bytes encode to 20 base64 characters without padding.
        assert_eq!(a.len(), STAGING_NAMESPACE.len() + 20);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn open_requires_key_or_digest() {
        let (store, dyn_store) = memory();
        let err = ByteSink::open(dyn_store.clone(), None, SinkOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StreamError::MissingIdentity));

        let err = ByteSink::open(dyn_store, Some(String::new()), SinkOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StreamError::MissingIdentity));
        assert!(store.is_empty(), "validation happens before any store call");
    }

    #[tokio::test]
    async fn open_creates_empty_staging_key() {
        let (store, dyn_store) = memory();
        let sink = ByteSink::open(dyn_store, Some("k".into()), SinkOptions::default())
            .await
            .unwrap();
        let staged = store.get(sink.staging_key()).await.unwrap().unwrap();
        assert!(staged.is_empty());
        assert!(!sink.is_finished());
    }

    #[tokio::test]
    async fn large_chunks_are_split_into_windows() {
        let (store, dyn_store) = memory();
        let options = SinkOptions::default().with_window_size(4);
        let mut sink = ByteSink::open(dyn_store, Some("k".into()), options)
            .await
            .unwrap();
        sink.write_chunk(Bytes::from_static(b"0123456789")).await.unwrap();
        assert_eq!(sink.length(), 10);

        let commit = sink.finish().await.unwrap();
        assert_eq!(commit.key, "k");
        assert_eq!(store.get("k").await.unwrap().unwrap(), "0123456789");
    }

    #[tokio::test]
    async fn digest_without_key_becomes_commit_key() {
        let (store, dyn_store) = memory();
        let options = SinkOptions::default().with_digest(DigestAlgorithm::Sha256);
        let mut sink = ByteSink::open(dyn_store, None, options).await.unwrap();
        sink.write_chunk(Bytes::from_static(b"ab")).await.unwrap();
        sink.write_chunk(Bytes::from_static(b"c")).await.unwrap();

        let commit = sink.finish().await.unwrap();
        let expected = DigestAlgorithm::Sha256.digest_hex(b"abc");
        assert_eq!(commit.digest.as_deref(), Some(expected.as_str()));
        assert_eq!(commit.key, expected);
        assert_eq!(sink.digest(), Some(expected.as_str()));
        assert_eq!(store.get(&expected).await.unwrap().unwrap(), "abc");
    }

    #[tokio::test]
    async fn digest_wins_over_explicit_key() {
        let (store, dyn_store) = memory();
        let options = SinkOptions::default().with_digest(DigestAlgorithm::Blake3);
        let mut sink = ByteSink::open(dyn_store, Some("named".into()), options)
            .await
            .unwrap();
        sink.write_chunk(Bytes::from_static(b"data")).await.unwrap();
        let commit = sink.finish().await.unwrap();

        assert_eq!(commit.key, DigestAlgorithm::Blake3.digest_hex(b"data"));
        assert!(store.get("named").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn writes_after_finish_are_rejected() {
        let (_store, dyn_store) = memory();
        let mut sink = ByteSink::open(dyn_store, Some("k".into()), SinkOptions::default())
            .await
            .unwrap();
        sink.finish().await.unwrap();

        let err = sink.write_chunk(Bytes::from_static(b"late")).await.unwrap_err();
        assert!(matches!(err, StreamError::Closed));
        assert!(matches!(sink.finish().await.unwrap_err(), StreamError::Closed));
    }

    #[tokio::test]
    async fn empty_session_commits_empty_value() {
        let (store, dyn_store) = memory();
        let mut sink = ByteSink::open(dyn_store, Some("empty".into()), SinkOptions::default())
            .await
            .unwrap();
        let commit = sink.finish().await.unwrap();
        assert_eq!(commit.length, 0);
        assert_eq!(store.get("empty").await.unwrap().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn abort_is_idempotent() {
        let (store, dyn_store) = memory();
        let mut sink = ByteSink::open(dyn_store, Some("k".into()), SinkOptions::default())
            .await
            .unwrap();
        sink.write_chunk(Bytes::from_static(b"abc")).await.unwrap();
        sink.abort().await.unwrap();
        sink.abort().await.unwrap();

        assert!(sink.is_finished());
        assert!(!sink.is_committed());
        assert!(store.is_empty());
    }
}
