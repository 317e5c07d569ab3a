use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::Result;
use crate::version::{ExpectedVersion, Version};

/// A stored value together with the version of the write that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue {
    pub value: Arc<[u8]>,
    pub version: Version,
}

/// Result of a conditional write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The write committed under a fresh version
    Swapped(Version),
    /// Another write landed first; `current` is what the key holds now
    Conflict { current: Option<Version> },
}

/// Versioned key-value backend the counters are built on.
///
/// Implementations must make `compare_and_swap` atomic with respect to every
/// other write of the same key: two swaps against the same expected version
/// never both succeed.
#[async_trait]
pub trait VersionedStore: Send + Sync {
    /// Read the latest value of `key`, or `None` if it was never written
    async fn get(&self, key: &str) -> Result<Option<VersionedValue>>;

    /// Unconditionally write `value` under `key`
    async fn put(&self, key: &str, value: &[u8]) -> Result<Version>;

    /// Write `value` only if `key` is still at `expected`
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: ExpectedVersion,
        value: &[u8],
    ) -> Result<CasOutcome>;

    /// Release the backend. Later calls may fail with [`StoreError::Closed`](crate::StoreError::Closed).
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl<S: VersionedStore + ?Sized> VersionedStore for Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<VersionedValue>> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<Version> {
        (**self).put(key, value).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: ExpectedVersion,
        value: &[u8],
    ) -> Result<CasOutcome> {
        (**self).compare_and_swap(key, expected, value).await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }
}
