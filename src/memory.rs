use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::errors::Result;
use crate::memtable::Memtable;
use crate::store::{CasOutcome, VersionedStore, VersionedValue};
use crate::version::{ExpectedVersion, Version};

/// Non-durable [`VersionedStore`] kept entirely in memory.
///
/// Reads are lock-free. Writes are serialized so that the version check of a
/// compare-and-swap and the write it guards happen as one step.
///
/// # Examples
///
/// ```
/// use tallykv::{CasOutcome, ExpectedVersion, MemoryStore, VersionedStore};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let created = store.compare_and_swap("visits", ExpectedVersion::Absent, b"1").await?;
/// assert!(matches!(created, CasOutcome::Swapped(_)));
///
/// let again = store.compare_and_swap("visits", ExpectedVersion::Absent, b"1").await?;
/// assert!(matches!(again, CasOutcome::Conflict { .. }));
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MemoryStore {
    memtable: Memtable,
    write_lock: Mutex<()>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys ever written
    pub fn len(&self) -> usize {
        self.memtable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memtable.len() == 0
    }
}

#[async_trait]
impl VersionedStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<VersionedValue>> {
        Ok(self.memtable.get(key))
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<Version> {
        let _guard = self.write_lock.lock().await;
        Ok(self.memtable.insert(key, value))
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: ExpectedVersion,
        value: &[u8],
    ) -> Result<CasOutcome> {
        let _guard = self.write_lock.lock().await;

        let current = self.memtable.version_of(key);
        if !expected.matches(current) {
            return Ok(CasOutcome::Conflict { current });
        }

        Ok(CasOutcome::Swapped(self.memtable.insert(key, value)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        let version = store.put("k", b"5").await.unwrap();
        let read = store.get("k").await.unwrap().unwrap();
        assert_eq!(&*read.value, b"5");
        assert_eq!(read.version, version);
    }

    #[tokio::test]
    async fn test_cas_against_stale_version() {
        let store = MemoryStore::new();
        let v1 = store.put("k", b"1").await.unwrap();
        let v2 = store.put("k", b"2").await.unwrap();

        let stale = store.compare_and_swap("k", ExpectedVersion::At(v1), b"3").await.unwrap();
        assert_eq!(stale, CasOutcome::Conflict { current: Some(v2) });
        assert_eq!(&*store.get("k").await.unwrap().unwrap().value, b"2");

        let fresh = store.compare_and_swap("k", ExpectedVersion::At(v2), b"3").await.unwrap();
        let CasOutcome::Swapped(v3) = fresh else { panic!("expected swap, got {fresh:?}") };
        assert_ne!(v3, v2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_create_has_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();

        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let value = i.to_string();
                store.compare_and_swap("k", ExpectedVersion::Absent, value.as_bytes()).await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if let CasOutcome::Swapped(_) = handle.await.unwrap().unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
