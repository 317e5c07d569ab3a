use std::sync::Arc;

use crossbeam_skiplist::SkipMap;

use crate::store::VersionedValue;
use crate::version::{Version, VersionCounter};

/// In-memory entry carrying the version of its last write
#[derive(Debug)]
struct MemtableEntry {
    value: Arc<[u8]>,
    version: Version,
}

/// Record returned by Memtable iterator
#[derive(Debug)]
pub struct MemtableRecord {
    pub key: Arc<str>,
    pub value: Arc<[u8]>,
    pub version: Version,
}

/// Lock-free in-memory index of the latest value per key.
///
/// Readers never block. Callers that need read-check-write atomicity must
/// serialize their writers themselves.
#[derive(Default)]
pub struct Memtable {
    data: SkipMap<Arc<str>, MemtableEntry>,
    version_counter: VersionCounter,
}

impl Memtable {
    /// Insert a key-value pair under a freshly issued version
    pub fn insert(&self, key: &str, value: &[u8]) -> Version {
        let version = self.version_counter.next_version();
        self.insert_at(key, value, version);
        version
    }

    /// Insert a key-value pair under an already issued version (WAL replay)
    pub fn insert_at(&self, key: &str, value: &[u8], version: Version) {
        self.version_counter.advance_past(version);

        let key: Arc<str> = key.into();
        let value: Arc<[u8]> = value.into();
        self.data.insert(key, MemtableEntry { value, version });
    }

    /// Issue the version for a write the caller is about to make durable
    pub fn next_version(&self) -> Version {
        self.version_counter.next_version()
    }

    /// Latest value of `key`
    #[inline]
    pub fn get(&self, key: &str) -> Option<VersionedValue> {
        self.data.get(key).map(|entry| {
            let entry = entry.value();
            VersionedValue { value: Arc::clone(&entry.value), version: entry.version }
        })
    }

    /// Version of the latest write of `key`
    #[inline]
    pub fn version_of(&self, key: &str) -> Option<Version> {
        self.data.get(key).map(|entry| entry.value().version)
    }

    /// Version the next write will receive
    #[inline]
    pub fn current_version(&self) -> Version {
        self.version_counter.current_version()
    }

    /// Iterate over all entries in key order
    pub fn iter(&self) -> impl Iterator<Item = MemtableRecord> + '_ {
        self.data.iter().map(|entry| {
            let val = entry.value();
            MemtableRecord {
                key: Arc::clone(entry.key()),
                value: Arc::clone(&val.value),
                version: val.version,
            }
        })
    }

    /// Get number of keys in memtable
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
