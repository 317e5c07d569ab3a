use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::errors::{Result, StoreError};
use crate::memtable::Memtable;
use crate::stats::Stats;
use crate::store::{CasOutcome, VersionedStore, VersionedValue};
use crate::version::{ExpectedVersion, Version};
use crate::wal::Wal;

const WAL_FILE: &str = "wal.log";

/// Durable single-node [`VersionedStore`].
///
/// Every write is appended to a CRC-checked write-ahead log and synced
/// before it becomes visible. The latest value of each key lives in a
/// lock-free memtable, so reads never touch disk.
///
/// A write that has taken the log lock runs to completion on its own task.
/// Dropping the caller's future (a timeout, say) abandons only the wait, so
/// the log and the memtable never disagree about a write.
pub struct LocalStore {
    wal: Arc<Mutex<Wal>>,
    memtable: Arc<Memtable>,
    db_dir: PathBuf,
    closed: AtomicBool,
}

impl LocalStore {
    /// Open (or create) the store under `path`, replaying its log
    ///
    /// ```no_run
    /// use tallykv::LocalStore;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let store = LocalStore::open("./data").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        tokio::fs::create_dir_all(&path).await?;
        let wal_path = path.join(WAL_FILE);

        let recovered_entries = Wal::recover(&wal_path).await?;
        let replayed = recovered_entries.len();
        let memtable = Memtable::default();

        for entry in recovered_entries {
            let key = std::str::from_utf8(&entry.key).map_err(|err| {
                StoreError::Corruption(format!("non UTF-8 key in WAL: {err}").into())
            })?;
            memtable.insert_at(key, &entry.value, entry.version);
        }

        // Compact the log down to one record per key
        let live: Vec<_> = memtable.iter().collect();
        let wal = Wal::checkpoint(wal_path, live).await?;

        info!(
            path = %path.display(),
            replayed,
            keys = memtable.len(),
            "opened local store"
        );

        Ok(Self {
            wal: Arc::new(Mutex::new(wal)),
            memtable: Arc::new(memtable),
            db_dir: path,
            closed: AtomicBool::new(false),
        })
    }

    /// Directory holding the store's files
    pub fn path(&self) -> &Path {
        &self.db_dir
    }

    /// Snapshot of store statistics
    pub async fn stats(&self) -> Stats {
        let wal_bytes = self.wal.lock().await.len();
        Stats::new(&self.memtable, wal_bytes)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    /// Take the WAL lock, failing if the store was closed meanwhile
    async fn lock_open(&self) -> Result<OwnedMutexGuard<Wal>> {
        let wal = Arc::clone(&self.wal).lock_owned().await;
        self.ensure_open()?;
        Ok(wal)
    }

    /// Make `value` durable under a fresh version and publish it.
    ///
    /// The append and the publish run as one spawned task that owns the
    /// WAL lock, so they either both happen or neither does.
    async fn commit(
        &self,
        mut wal: OwnedMutexGuard<Wal>,
        key: &str,
        value: &[u8],
    ) -> Result<Version> {
        let memtable = Arc::clone(&self.memtable);
        let key = key.to_owned();
        let value = value.to_vec();

        tokio::spawn(async move {
            let version = memtable.next_version();
            wal.append(key.as_bytes(), &value, version).await?;
            memtable.insert_at(&key, &value, version);
            Ok::<_, StoreError>(version)
        })
        .await
        .map_err(|err| StoreError::Io(io::Error::other(format!("WAL commit task failed: {err}"))))?
    }
}

#[async_trait]
impl VersionedStore for LocalStore {
    async fn get(&self, key: &str) -> Result<Option<VersionedValue>> {
        self.ensure_open()?;
        Ok(self.memtable.get(key))
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<Version> {
        let wal = self.lock_open().await?;

        let version = self.commit(wal, key, value).await?;
        debug!(key, %version, "put");
        Ok(version)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: ExpectedVersion,
        value: &[u8],
    ) -> Result<CasOutcome> {
        let wal = self.lock_open().await?;

        let current = self.memtable.version_of(key);
        if !expected.matches(current) {
            return Ok(CasOutcome::Conflict { current });
        }

        let version = self.commit(wal, key, value).await?;
        debug!(key, %version, "compare-and-swap");
        Ok(CasOutcome::Swapped(version))
    }

    async fn close(&self) -> Result<()> {
        let mut wal = self.wal.lock().await;
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        wal.sync().await?;
        info!(path = %self.db_dir.display(), "closed local store");
        Ok(())
    }
}
