mod common;

use std::sync::Arc;

use bytes::Bytes;
use common::{payload, FaultyStore, Op};
use kvstream_crypto::DigestAlgorithm;
use kvstream_io::{
    ByteSink, ByteSource, ChunkSink, ChunkSource, SinkOptions, SourceOptions, StreamError,
    STAGING_NAMESPACE,
};
use kvstream_store::{InMemoryKvStore, KvStore};
use proptest::prelude::*;

async fn drain(source: &mut ByteSource) -> Vec<u8> {
    let mut data = Vec::new();
    while let Some(chunk) = source.next_chunk().await.unwrap() {
        data.extend_from_slice(&chunk);
    }
    data
}

#[tokio::test]
async fn read_failure_is_terminal_and_keeps_counters() {
    let store = FaultyStore::new();
    store.inner().set("k", &payload(10, 1)).await.unwrap();
    store.fail_after(Op::GetRange, 1);
    let dyn_store: Arc<dyn KvStore> = store.clone();

    let options = SourceOptions::default().with_window_size(4);
    let mut source = ByteSource::new(dyn_store, "k", options).unwrap();

    assert_eq!(source.next_chunk().await.unwrap().unwrap().len(), 4);
    let err = source.next_chunk().await.unwrap_err();
    assert!(matches!(err, StreamError::Store(_)));
    assert_eq!(source.bytes_read(), 4);
    assert!(source.is_finished());

    assert!(source.next_chunk().await.unwrap().is_none());
    assert_eq!(store.calls(Op::GetRange), 2, "no read after the error");
}

#[tokio::test]
async fn one_byte_window() {
    let store = Arc::new(InMemoryKvStore::new());
    store.set("k", b"xyz").await.unwrap();
    let options = SourceOptions::default().with_window_size(1);
    let mut source = ByteSource::new(store, "k", options).unwrap();

    assert_eq!(drain(&mut source).await, b"xyz");
    assert_eq!(source.bytes_read(), 3);
    // Three full windows, then one empty read to discover the end.
    assert_eq!(source.offset(), 4);
}

async fn write_then_read(
    data: &[u8],
    chunk_size: usize,
    sink_window: usize,
    source_window: usize,
    digest: Option<DigestAlgorithm>,
) -> (Vec<u8>, u64, Option<String>, Arc<InMemoryKvStore>) {
    let store = Arc::new(InMemoryKvStore::new());
    let dyn_store: Arc<dyn KvStore> = store.clone();

    let mut options = SinkOptions::default().with_window_size(sink_window);
    options.digest = digest;
    let key = digest.is_none().then(|| "roundtrip".to_string());
    let mut sink = ByteSink::open(dyn_store.clone(), key, options).await.unwrap();
    for chunk in data.chunks(chunk_size) {
        sink.write_chunk(Bytes::copy_from_slice(chunk)).await.unwrap();
    }
    let commit = sink.finish().await.unwrap();

    let options = SourceOptions::default().with_window_size(source_window);
    let mut source = ByteSource::new(dyn_store, commit.key.clone(), options).unwrap();
    let read = drain(&mut source).await;
    (read, source.bytes_read(), commit.digest, store)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn written_bytes_read_back_exactly(
        data in proptest::collection::vec(any::<u8>(), 0..4096),
        chunk_size in 1usize..512,
        sink_window in 1usize..300,
        source_window in 1usize..700,
    ) {
        let (read, bytes_read, digest, store) = runtime().block_on(
            write_then_read(&data, chunk_size, sink_window, source_window, None),
        );
        prop_assert_eq!(&read, &data);
        prop_assert_eq!(bytes_read, data.len() as u64);
        prop_assert!(digest.is_none());
        let leftovers = runtime().block_on(store.scan_prefix(STAGING_NAMESPACE)).unwrap();
        prop_assert!(leftovers.is_empty());
    }

    #[test]
    fn digest_matches_direct_hash(
        data in proptest::collection::vec(any::<u8>(), 0..4096),
        chunk_size in 1usize..512,
        alg_index in 0usize..DigestAlgorithm::ALL.len(),
    ) {
        let alg = DigestAlgorithm::ALL[alg_index];
        let (read, _, digest, _) = runtime().block_on(
            write_then_read(&data, chunk_size, 128, 256, Some(alg)),
        );
        prop_assert_eq!(digest, Some(alg.digest_hex(&data)));
        prop_assert_eq!(read, data);
    }
}
