use std::time::Duration;

use kvstream_crypto::DigestAlgorithm;
use kvstream_store::Batch;

/// Bytes per pull (sources) or per append (sinks) unless configured: 1 MiB.
pub const DEFAULT_WINDOW_SIZE: usize = 1024 * 1024;

/// Prefix of every staging key. Scanning it finds abandoned write sessions.
pub const STAGING_NAMESPACE: &str = "kvstream.staging.";

/// Random bytes behind each staging key, before base64 encoding.
pub const STAGING_RANDOM_BYTES: usize = 15;

/// Configuration for a [`ByteSource`](crate::ByteSource).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceOptions {
    /// Bytes requested per range-read.
    pub window_size: usize,
}

impl SourceOptions {
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

/// Configuration for a [`ByteSink`](crate::ByteSink).
#[derive(Clone, Debug)]
pub struct SinkOptions {
    /// Largest single append. Longer chunks are split.
    pub window_size: usize,
    /// Hard ceiling on the staged length, checked after each append.
    pub max_bytes: Option<u64>,
    /// Expiry set on the commit key after a direct commit.
    ///
    /// Ignored when [`batch`](Self::batch) is set: only the rename is queued.
    pub ttl: Option<Duration>,
    /// Digest fed with every appended byte. Without a key, its hex output
    /// becomes the commit key.
    pub digest: Option<DigestAlgorithm>,
    /// Caller-owned batch that receives the commit rename instead of the store.
    pub batch: Option<Batch>,
}

impl SinkOptions {
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_ttl_seconds(self, seconds: u64) -> Self {
        self.with_ttl(Duration::from_secs(seconds))
    }

    pub fn with_digest(mut self, digest: DigestAlgorithm) -> Self {
        self.digest = Some(digest);
        self
    }

    pub fn with_batch(mut self, batch: Batch) -> Self {
        self.batch = Some(batch);
        self
    }
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            max_bytes: None,
            ttl: None,
            digest: None,
            batch: None,
        }
    }
}
