use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StreamResult;

/// Pull side of a byte stream: hands out one chunk per call.
///
/// The consumer only calls `next_chunk` when it is ready for more data, so
/// readiness of the caller is the backpressure signal. Once `Ok(None)` or an
/// error has been returned, every later call returns `Ok(None)`.
#[async_trait]
pub trait ChunkSource: Send {
    /// Pull the next chunk. `Ok(None)` marks the end of the stream.
    async fn next_chunk(&mut self) -> StreamResult<Option<Bytes>>;
}

#[async_trait]
impl<S: ChunkSource + ?Sized> ChunkSource for &mut S {
    async fn next_chunk(&mut self) -> StreamResult<Option<Bytes>> {
        (**self).next_chunk().await
    }
}

#[async_trait]
impl<S: ChunkSource + ?Sized> ChunkSource for Box<S> {
    async fn next_chunk(&mut self) -> StreamResult<Option<Bytes>> {
        (**self).next_chunk().await
    }
}

/// What a finished write session published.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SinkCommit {
    /// Key the data is (or, if `deferred`, will be) visible under.
    pub key: String,
    /// Hex digest of every byte written, when a digest was configured.
    pub digest: Option<String>,
    /// Total bytes written.
    pub length: u64,
    /// `true` if the rename was queued into a caller-owned batch rather than
    /// executed. The key is not visible until that batch runs.
    pub deferred: bool,
}

/// Push side of a byte stream: accepts chunks, then publishes or discards them.
///
/// Each `write_chunk` completes its store round-trip before returning, and
/// `&mut self` prevents a second write from starting meanwhile.
#[async_trait]
pub trait ChunkSink: Send {
    /// Accept the next chunk.
    async fn write_chunk(&mut self, chunk: Bytes) -> StreamResult<()>;

    /// No more chunks: publish everything written.
    async fn finish(&mut self) -> StreamResult<SinkCommit>;

    /// Discard everything written.
    async fn abort(&mut self) -> StreamResult<()>;
}
