use crate::memtable::Memtable;
use crate::version::Version;

/// `LocalStore` statistics and metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Number of counters stored
    pub keys: usize,

    /// Version the next write will receive
    pub current_version: Version,

    /// Size of the write-ahead log in bytes
    pub wal_bytes: u64,
}

impl Stats {
    pub(crate) fn new(memtable: &Memtable, wal_bytes: u64) -> Self {
        Self { keys: memtable.len(), current_version: memtable.current_version(), wal_bytes }
    }
}
