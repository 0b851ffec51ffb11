//! Chunk sources over local data, for feeding a sink.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{StreamError, StreamResult};
use crate::options::DEFAULT_WINDOW_SIZE;
use crate::traits::ChunkSource;

/// Chunks any [`AsyncRead`] (a file, a socket) into at most `window_size`
/// bytes per pull.
pub struct ReaderSource<R> {
    reader: R,
    window_size: usize,
    bytes_read: u64,
    finished: bool,
}

impl<R: AsyncRead + Unpin + Send> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            window_size: DEFAULT_WINDOW_SIZE,
            bytes_read: 0,
            finished: false,
        }
    }

    pub fn with_window_size(mut self, window_size: usize) -> StreamResult<Self> {
        if window_size == 0 {
            return Err(StreamError::InvalidWindowSize);
        }
        self.window_size = window_size;
        Ok(self)
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> ChunkSource for ReaderSource<R> {
    async fn next_chunk(&mut self) -> StreamResult<Option<Bytes>> {
        if self.finished {
            return Ok(None);
        }
        let mut buf = vec![0u8; self.window_size];
        let n = match self.reader.read(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                self.finished = true;
                return Err(e.into());
            }
        };
        if n == 0 {
            self.finished = true;
            return Ok(None);
        }
        buf.truncate(n);
        self.bytes_read += n as u64;
        Ok(Some(Bytes::from(buf)))
    }
}

/// Chunk source over an in-memory sequence of chunks.
pub struct IterSource<I> {
    chunks: I,
}

impl<I> IterSource<I>
where
    I: Iterator<Item = Bytes> + Send,
{
    pub fn new(chunks: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            chunks: chunks.into_iter(),
        }
    }
}

#[async_trait]
impl<I> ChunkSource for IterSource<I>
where
    I: Iterator<Item = Bytes> + Send,
{
    async fn next_chunk(&mut self) -> StreamResult<Option<Bytes>> {
        Ok(self.chunks.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reader_is_chunked_by_window() {
        let data: &[u8] = b"0123456789";
        let mut source = ReaderSource::new(data).with_window_size(4).unwrap();

        let mut chunks = Vec::new();
        while let Some(chunk) = source.next_chunk().await.unwrap() {
            chunks.push(chunk);
        }
        assert_eq!(chunks, vec!["0123", "4567", "89"]);
        assert_eq!(source.bytes_read(), 10);
        assert!(source.next_chunk().await.unwrap().is_none());
    }

    #[test]
    fn zero_window_is_rejected() {
        let data: &[u8] = b"";
        assert!(matches!(
            ReaderSource::new(data).with_window_size(0),
            Err(StreamError::InvalidWindowSize)
        ));
    }

    #[tokio::test]
    async fn iter_source_yields_in_order() {
        let mut source = IterSource::new(vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")]);
        assert_eq!(source.next_chunk().await.unwrap().unwrap(), "a");
        assert_eq!(source.next_chunk().await.unwrap().unwrap(), "b");
        assert!(source.next_chunk().await.unwrap().is_none());
    }
}
