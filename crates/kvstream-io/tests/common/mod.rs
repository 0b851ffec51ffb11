#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use kvstream_store::{Batch, BatchReply, InMemoryKvStore, KeyTtl, KvStore, StoreError, StoreResult};

/// Store operations that can be made to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    GetRange,
    Append,
    Rename,
    Expire,
    Delete,
    Set,
}

/// In-memory store that fails chosen operations after a number of successes.
#[derive(Default)]
pub struct FaultyStore {
    inner: InMemoryKvStore,
    faults: Mutex<HashMap<Op, usize>>,
    calls: Mutex<HashMap<Op, usize>>,
}

impl FaultyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Let `op` succeed `successes` times, then fail every later call.
    pub fn fail_after(&self, op: Op, successes: usize) {
        self.faults.lock().unwrap().insert(op, successes);
    }

    pub fn calls(&self, op: Op) -> usize {
        self.calls.lock().unwrap().get(&op).copied().unwrap_or(0)
    }

    pub fn inner(&self) -> &InMemoryKvStore {
        &self.inner
    }

    fn check(&self, op: Op) -> StoreResult<()> {
        let count = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(op).or_insert(0);
            *count += 1;
            *count
        };
        match self.faults.lock().unwrap().get(&op) {
            Some(&successes) if count > successes => {
                Err(StoreError::Backend(format!("injected {op:?} failure")))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl KvStore for FaultyStore {
    async fn get_range(&self, key: &str, start: u64, end: u64) -> StoreResult<Bytes> {
        self.check(Op::GetRange)?;
        self.inner.get_range(key, start, end).await
    }

    async fn append(&self, key: &str, value: &[u8]) -> StoreResult<u64> {
        self.check(Op::Append)?;
        self.inner.append(key, value).await
    }

    async fn rename(&self, from: &str, to: &str) -> StoreResult<()> {
        self.check(Op::Rename)?;
        self.inner.rename(from, to).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        self.check(Op::Expire)?;
        self.inner.expire(key, ttl).await
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.check(Op::Delete)?;
        self.inner.delete(key).await
    }

    async fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.check(Op::Set)?;
        self.inner.set(key, value).await
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        self.inner.get(key).await
    }

    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
        self.inner.ttl(key).await
    }

    async fn scan_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        self.inner.scan_prefix(prefix).await
    }

    async fn exec(&self, batch: &Batch) -> StoreResult<Vec<BatchReply>> {
        self.inner.exec(batch).await
    }
}

/// Deterministic pseudo-random payload.
pub fn payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}
