use std::path::{Path, PathBuf};

use bytes::Bytes;
use crc32fast::Hasher;
use memmap2::Mmap;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::errors::{Result, StoreError};
use crate::memtable::MemtableRecord;
use crate::version::Version;

/// Header size: CRC(4) + `KeyLen`(4) + `ValLen`(4) + Version(8)
const HEADER_SIZE: usize = 20;

/// WAL entry representation in memory
#[derive(Debug)]
pub struct WalEntry {
    pub key: Bytes,
    pub value: Bytes,
    pub version: Version,
}

impl WalEntry {
    /// Deserialize entry from bytes with CRC verification
    fn deserialize(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(StoreError::InvalidData("Entry too short".into()));
        }

        let stored_crc = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);

        let mut hasher = Hasher::new();
        hasher.update(&data[4..]);
        let computed_crc = hasher.finalize();

        if stored_crc != computed_crc {
            return Err(StoreError::Corruption(
                format!("CRC mismatch: expected {stored_crc}, got {computed_crc}").into(),
            ));
        }

        let key_len = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;
        let val_len = u32::from_le_bytes([data[8], data[9], data[10], data[11]]) as usize;
        let version = u64::from_le_bytes([
            data[12], data[13], data[14], data[15], data[16], data[17], data[18], data[19],
        ]);

        let expected_len = HEADER_SIZE + key_len + val_len;
        if data.len() < expected_len {
            return Err(StoreError::InvalidData(
                format!("Entry incomplete: expected {} bytes, got {}", expected_len, data.len())
                    .into(),
            ));
        }

        let val_start = HEADER_SIZE + key_len;
        let key = Bytes::copy_from_slice(&data[HEADER_SIZE..val_start]);
        let value = Bytes::copy_from_slice(&data[val_start..val_start + val_len]);

        Ok(Self { key, value, version: Version::new(version) })
    }
}

/// Append one encoded record to `buf`
fn encode_into(buf: &mut Vec<u8>, key: &[u8], value: &[u8], version: Version) {
    let start = buf.len();
    let entry_len = HEADER_SIZE + key.len() + value.len();
    buf.resize(start + entry_len, 0);
    let entry = &mut buf[start..];

    entry[4..8].copy_from_slice(&(key.len() as u32).to_le_bytes());
    entry[8..12].copy_from_slice(&(value.len() as u32).to_le_bytes());
    entry[12..20].copy_from_slice(&version.get().to_le_bytes());
    entry[HEADER_SIZE..HEADER_SIZE + key.len()].copy_from_slice(key);
    entry[HEADER_SIZE + key.len()..].copy_from_slice(value);

    // CRC32 over everything after the checksum itself
    let mut hasher = Hasher::new();
    hasher.update(&entry[4..]);
    entry[0..4].copy_from_slice(&hasher.finalize().to_le_bytes());
}

async fn write_synced(file: &mut File, buf: &[u8]) -> std::io::Result<()> {
    file.write_all(buf).await?;
    file.sync_data().await
}

/// Write-Ahead Log (WAL) for durability
pub struct Wal {
    file: File,
    offset: u64,
    write_buf: Vec<u8>,
}

impl Wal {
    /// Create or open a WAL file
    pub async fn new(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path).await?;

        let metadata = file.metadata().await?;
        let offset = metadata.len();
        Ok(Self { file, offset, write_buf: Vec::new() })
    }

    /// Append an entry to the WAL with durability guarantee
    /// CRITICAL: Does not return until `sync_data()` completes
    pub async fn append(&mut self, key: &[u8], value: &[u8], version: Version) -> Result<()> {
        self.write_buf.clear();
        encode_into(&mut self.write_buf, key, value, version);

        if let Err(err) = write_synced(&mut self.file, &self.write_buf).await {
            // A record that failed to sync must not resurface on replay
            if let Err(truncate_err) = self.file.set_len(self.offset).await {
                warn!(offset = self.offset, %truncate_err, "failed to roll back WAL tail");
            }
            return Err(err.into());
        }
        self.offset += self.write_buf.len() as u64;
        Ok(())
    }

    /// Sync WAL to disk (durability guarantee)
    pub async fn sync(&mut self) -> Result<()> {
        self.file.sync_data().await?;
        Ok(())
    }

    /// Bytes written so far
    pub fn len(&self) -> u64 {
        self.offset
    }

    /// Recover all entries from WAL (startup replay)
    pub async fn recover(path: &Path) -> Result<Vec<WalEntry>> {
        let path = path.to_path_buf();

        // mmap operations are blocking, we delegate them to blocking thread pool to maintain non-blocking guarantee
        tokio::task::spawn_blocking(move || {
            let file_std = match std::fs::File::open(&path) {
                Ok(f) => f,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(err) => return Err(err.into()),
            };
            if file_std.metadata()?.len() == 0 {
                return Ok(Vec::new());
            }
            let mmap = unsafe { Mmap::map(&file_std)? };

            let mut entries = Vec::new();
            let mut offset = 0;

            while offset + HEADER_SIZE <= mmap.len() {
                let header = &mmap[offset..offset + HEADER_SIZE];
                let key_len =
                    u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
                let val_len =
                    u32::from_le_bytes([header[8], header[9], header[10], header[11]]) as usize;

                let total_len = HEADER_SIZE + key_len + val_len;

                // Torn tail from a crash mid-append
                if offset + total_len > mmap.len() {
                    warn!(offset, "WAL ends with an incomplete entry, ignoring tail");
                    break;
                }

                let entry_slice = &mmap[offset..offset + total_len];
                match WalEntry::deserialize(entry_slice) {
                    Ok(entry) => entries.push(entry),
                    Err(StoreError::Corruption(msg)) => {
                        warn!(offset, %msg, "WAL corruption, stopping replay");
                        break;
                    }
                    Err(err) => return Err(err),
                }

                offset += total_len;
            }

            Ok(entries)
        })
        .await
        .map_err(|err| {
            StoreError::Io(std::io::Error::other(format!("WAL recovery task failed: {err}")))
        })?
    }

    /// Replace the log at `path` with one record per live key and reopen it.
    ///
    /// The new log is fully synced under a temporary name before it replaces
    /// the old one, so a crash at any point leaves a complete log behind.
    pub async fn checkpoint(path: PathBuf, records: Vec<MemtableRecord>) -> Result<Self> {
        let tmp_path = path.with_extension("log.tmp");

        let mut buf = Vec::new();
        for record in records {
            encode_into(&mut buf, record.key.as_bytes(), &record.value, record.version);
        }

        let mut tmp = File::create(&tmp_path).await?;
        tmp.write_all(&buf).await?;
        tmp.sync_all().await?;
        drop(tmp);

        tokio::fs::rename(&tmp_path, &path).await?;

        Self::new(path).await
    }
}
