use std::ops::Deref;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use kvstream_io::{
    pipe, ByteSink, ByteSource, ChunkSource, SinkOptions, StreamResult, STAGING_NAMESPACE,
};
use kvstream_store::KvStore;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::config::StreamConfig;

/// High-level streaming API over one shared store connection.
///
/// Every source and sink opened here holds a clone of the same `Arc`'d
/// connection. The wrapper dereferences to the connection, so the full
/// client API stays available next to the streaming operations.
pub struct StreamStore<S> {
    store: Arc<S>,
    config: StreamConfig,
}

impl<S: KvStore + 'static> StreamStore<S> {
    /// Wrap a store connection with default settings.
    pub fn new(store: S) -> Self {
        Self::from_arc(Arc::new(store))
    }

    /// Wrap a connection that is already shared elsewhere.
    pub fn from_arc(store: Arc<S>) -> Self {
        Self {
            store,
            config: StreamConfig::default(),
        }
    }

    pub fn with_config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// The shared connection handed to sessions.
    pub fn connection(&self) -> Arc<dyn KvStore> {
        self.store.clone()
    }

    /// Sink options seeded from the configured defaults.
    pub fn sink_options(&self) -> SinkOptions {
        self.config.sink_options()
    }

    /// Open a pull-based reader of `key`.
    ///
    /// `window_size` overrides the configured window for this source only.
    pub fn open_source(&self, key: &str, window_size: Option<usize>) -> StreamResult<ByteSource> {
        let mut options = self.config.source_options();
        if let Some(window_size) = window_size {
            options.window_size = window_size;
        }
        ByteSource::new(self.connection(), key, options)
    }

    /// Open an atomic writer. See [`ByteSink`] for the commit rules.
    pub async fn open_sink(
        &self,
        key: Option<&str>,
        options: SinkOptions,
    ) -> StreamResult<ByteSink> {
        ByteSink::open(self.connection(), key.map(str::to_string), options).await
    }

    /// Pipe `source` into a fresh sink and commit it.
    ///
    /// Returns the finished sink, which exposes the commit key, digest and
    /// length. The first error from either side aborts the sink and is
    /// returned as is.
    pub async fn write_all<R>(
        &self,
        mut source: R,
        key: Option<&str>,
        options: SinkOptions,
    ) -> StreamResult<ByteSink>
    where
        R: ChunkSource,
    {
        let mut sink = self.open_sink(key, options).await?;
        let commit = pipe(&mut source, &mut sink).await?;
        debug!(key = %commit.key, length = commit.length, deferred = commit.deferred, "write_all done");
        Ok(sink)
    }

    /// Read a whole value through a source. A missing key reads as empty.
    pub async fn read_all(&self, key: &str) -> StreamResult<Bytes> {
        let mut source = self.open_source(key, None)?;
        let mut data = BytesMut::new();
        while let Some(chunk) = source.next_chunk().await? {
            data.extend_from_slice(&chunk);
        }
        Ok(data.freeze())
    }

    /// Stream a value into `writer`, returning the bytes copied.
    pub async fn copy_to<W>(&self, key: &str, writer: &mut W) -> StreamResult<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut source = self.open_source(key, None)?;
        while let Some(chunk) = source.next_chunk().await? {
            writer.write_all(&chunk).await?;
        }
        writer.flush().await?;
        Ok(source.bytes_read())
    }

    /// Staging keys currently present in the store.
    ///
    /// Non-empty only while sessions are open, or after a crash left one
    /// behind.
    pub async fn scan_staging(&self) -> StreamResult<Vec<String>> {
        Ok(self.store.scan_prefix(STAGING_NAMESPACE).await?)
    }
}

impl<S> Deref for StreamStore<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.store
    }
}

impl<S> Clone for StreamStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S> std::fmt::Debug for StreamStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
