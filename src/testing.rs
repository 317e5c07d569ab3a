//! Store doubles for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::{Result, StoreError};
use crate::store::{CasOutcome, VersionedStore, VersionedValue};
use crate::version::{ExpectedVersion, Version};

/// Counts every call before delegating
pub struct CountingStore<S> {
    inner: S,
    pub get_calls: AtomicUsize,
    pub put_calls: AtomicUsize,
    pub cas_calls: AtomicUsize,
}

impl<S> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            get_calls: AtomicUsize::new(0),
            put_calls: AtomicUsize::new(0),
            cas_calls: AtomicUsize::new(0),
        }
    }

    pub fn total_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
            + self.put_calls.load(Ordering::SeqCst)
            + self.cas_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: VersionedStore> VersionedStore for CountingStore<S> {
    async fn get(&self, key: &str) -> Result<Option<VersionedValue>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<Version> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, value).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: ExpectedVersion,
        value: &[u8],
    ) -> Result<CasOutcome> {
        self.cas_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.compare_and_swap(key, expected, value).await
    }
}

/// Reports every key as absent and loses every compare-and-swap
#[derive(Default)]
pub struct ConflictingStore {
    pub cas_calls: AtomicUsize,
}

#[async_trait]
impl VersionedStore for ConflictingStore {
    async fn get(&self, _key: &str) -> Result<Option<VersionedValue>> {
        Ok(None)
    }

    async fn put(&self, _key: &str, _value: &[u8]) -> Result<Version> {
        Ok(Version::new(1))
    }

    async fn compare_and_swap(
        &self,
        _key: &str,
        _expected: ExpectedVersion,
        _value: &[u8],
    ) -> Result<CasOutcome> {
        let calls = self.cas_calls.fetch_add(1, Ordering::SeqCst) as u64;
        Ok(CasOutcome::Conflict { current: Some(Version::new(calls + 1)) })
    }
}

/// Fails every call as if the backend were unreachable
pub struct FailingStore;

fn unreachable_backend() -> StoreError {
    StoreError::Io(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "backend unreachable"))
}

#[async_trait]
impl VersionedStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<VersionedValue>> {
        Err(unreachable_backend())
    }

    async fn put(&self, _key: &str, _value: &[u8]) -> Result<Version> {
        Err(unreachable_backend())
    }

    async fn compare_and_swap(
        &self,
        _key: &str,
        _expected: ExpectedVersion,
        _value: &[u8],
    ) -> Result<CasOutcome> {
        Err(unreachable_backend())
    }
}

/// Sleeps before answering every call
pub struct SlowStore {
    delay: Duration,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl VersionedStore for SlowStore {
    async fn get(&self, _key: &str) -> Result<Option<VersionedValue>> {
        tokio::time::sleep(self.delay).await;
        Ok(None)
    }

    async fn put(&self, _key: &str, _value: &[u8]) -> Result<Version> {
        tokio::time::sleep(self.delay).await;
        Ok(Version::new(1))
    }

    async fn compare_and_swap(
        &self,
        _key: &str,
        _expected: ExpectedVersion,
        _value: &[u8],
    ) -> Result<CasOutcome> {
        tokio::time::sleep(self.delay).await;
        Ok(CasOutcome::Swapped(Version::new(1)))
    }
}

/// Yields to the scheduler after every read so concurrent writers overlap
pub struct YieldingStore<S> {
    inner: S,
}

impl<S> YieldingStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: VersionedStore> VersionedStore for YieldingStore<S> {
    async fn get(&self, key: &str) -> Result<Option<VersionedValue>> {
        let read = self.inner.get(key).await;
        tokio::task::yield_now().await;
        read
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<Version> {
        self.inner.put(key, value).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: ExpectedVersion,
        value: &[u8],
    ) -> Result<CasOutcome> {
        self.inner.compare_and_swap(key, expected, value).await
    }
}
