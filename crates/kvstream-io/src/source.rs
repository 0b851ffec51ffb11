use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use kvstream_store::KvStore;
use tracing::debug;

use crate::error::{StreamError, StreamResult};
use crate::options::SourceOptions;
use crate::traits::ChunkSource;

/// Pull-based reader of one stored value, one range-read per chunk.
///
/// Each pull asks the store for the inclusive range
/// `[offset, offset + window - 1]` and advances the offset by a full window
/// before the response arrives, so bytes are never read twice. A response
/// shorter than the window means the value ended; the stream is finished
/// right after that chunk is delivered without another round-trip.
///
/// A missing key reads as an empty value.
pub struct ByteSource {
    store: Arc<dyn KvStore>,
    key: String,
    window_size: usize,
    offset: u64,
    bytes_read: u64,
    finished: bool,
}

impl ByteSource {
    /// Create a source for `key`. No store request is made until the first pull.
    pub fn new(
        store: Arc<dyn KvStore>,
        key: impl Into<String>,
        options: SourceOptions,
    ) -> StreamResult<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(StreamError::MissingKey);
        }
        if options.window_size == 0 {
            return Err(StreamError::InvalidWindowSize);
        }
        Ok(Self {
            store,
            key,
            window_size: options.window_size,
            offset: 0,
            bytes_read: 0,
            finished: false,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Start of the next range-read.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Bytes delivered so far, including a partial stream cut short by an error.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// `true` once the end of the value or an error was observed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Adapt into a [`futures::Stream`] of chunks.
    pub fn into_stream(self) -> impl Stream<Item = StreamResult<Bytes>> + Send {
        futures::stream::try_unfold(self, |mut source| async move {
            let chunk = source.next_chunk().await?;
            Ok::<_, StreamError>(chunk.map(|chunk| (chunk, source)))
        })
    }

    fn end_of_stream(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        debug!(key = %self.key, bytes = self.bytes_read, "read stream ended");
    }
}

#[async_trait]
impl ChunkSource for ByteSource {
    async fn next_chunk(&mut self) -> StreamResult<Option<Bytes>> {
        if self.finished {
            return Ok(None);
        }

        let window = self.window_size as u64;
        let start = self.offset;
        let end = start + window - 1;
        self.offset = end + 1;

        let chunk = match self.store.get_range(&self.key, start, end).await {
            Ok(chunk) => chunk,
            Err(e) => {
                self.finished = true;
                debug!(key = %self.key, start, error = %e, "range-read failed");
                return Err(e.into());
            }
        };
        self.bytes_read += chunk.len() as u64;

        if chunk.is_empty() {
            self.end_of_stream();
            return Ok(None);
        }
        if (chunk.len() as u64) < window {
            self.end_of_stream();
        }
        Ok(Some(chunk))
    }
}

impl std::fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteSource")
            .field("key", &self.key)
            .field("window_size", &self.window_size)
            .field("offset", &self.offset)
            .field("bytes_read", &self.bytes_read)
            .field("finished", &self.finished)
            .finish()
    }
}
