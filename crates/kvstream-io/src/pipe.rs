use tracing::warn;

use crate::error::StreamResult;
use crate::traits::{ChunkSink, ChunkSource, SinkCommit};

/// Drive every chunk of `source` into `sink`, then finish the sink.
///
/// The first error from either side ends the copy. The sink is aborted before
/// that error is returned, so nothing is left staged.
pub async fn pipe<S, K>(source: &mut S, sink: &mut K) -> StreamResult<SinkCommit>
where
    S: ChunkSource + ?Sized,
    K: ChunkSink + ?Sized,
{
    if let Err(e) = copy_chunks(source, sink).await {
        if let Err(abort_err) = sink.abort().await {
            warn!(error = %abort_err, "abort after failed pipe also failed");
        }
        return Err(e);
    }
    sink.finish().await
}

async fn copy_chunks<S, K>(source: &mut S, sink: &mut K) -> StreamResult<()>
where
    S: ChunkSource + ?Sized,
    K: ChunkSink + ?Sized,
{
    while let Some(chunk) = source.next_chunk().await? {
        sink.write_chunk(chunk).await?;
    }
    Ok(())
}
