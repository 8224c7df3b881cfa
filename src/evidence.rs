//! Photo evidence, one blob per day number.
//!
//! Operations on the same day are serialized through a per-day async mutex, so
//! a put racing a delete for day 7 always lands in a well-defined order.

use crate::model::TOTAL_DAYS;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

pub const DEFAULT_CAPACITY_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum EvidenceError {
    #[error("day {0} is outside 1..={max}", max = TOTAL_DAYS)]
    DayOutOfRange(u32),
    #[error("evidence is empty")]
    Empty,
    #[error("storage is full: {needed} bytes needed, {available} available")]
    CapacityExceeded { needed: u64, available: u64 },
    #[error("evidence IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EvidenceResult<T> = Result<T, EvidenceError>;

#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Stores or overwrites the blob for `day`.
    async fn put(&self, day: u32, blob: &[u8]) -> EvidenceResult<()>;

    /// `None` when nothing is stored for `day`.
    async fn get(&self, day: u32) -> EvidenceResult<Option<Vec<u8>>>;

    /// Idempotent.
    async fn delete(&self, day: u32) -> EvidenceResult<()>;

    /// Removes every entry, returning how many were present.
    async fn clear(&self) -> EvidenceResult<usize>;
}

fn check_day(day: u32) -> EvidenceResult<()> {
    if day == 0 || day as usize > TOTAL_DAYS {
        return Err(EvidenceError::DayOutOfRange(day));
    }
    Ok(())
}

#[derive(Default)]
struct DayLocks {
    inner: Mutex<HashMap<u32, Arc<tokio::sync::Mutex<()>>>>,
}

impl DayLocks {
    async fn lock(&self, day: u32) -> OwnedMutexGuard<()> {
        let slot = {
            let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            map.entry(day).or_default().clone()
        };
        slot.lock_owned().await
    }
}

/// One file per day under a directory, written via temp file and rename.
pub struct FsEvidenceStore {
    dir: PathBuf,
    capacity_bytes: u64,
    locks: DayLocks,
}

impl FsEvidenceStore {
    pub fn new(dir: impl Into<PathBuf>, capacity_bytes: u64) -> Self {
        Self {
            dir: dir.into(),
            capacity_bytes,
            locks: DayLocks::default(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn blob_path(&self, day: u32) -> PathBuf {
        self.dir.join(format!("day-{:02}.img", day))
    }

    async fn bytes_used_excluding(&self, day: u32) -> EvidenceResult<u64> {
        let mut used = 0u64;
        for other in (1..=TOTAL_DAYS as u32).filter(|d| *d != day) {
            match tokio::fs::metadata(self.blob_path(other)).await {
                Ok(meta) => used += meta.len(),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(used)
    }

    async fn remove_blob(&self, day: u32) -> EvidenceResult<bool> {
        match tokio::fs::remove_file(self.blob_path(day)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl EvidenceStore for FsEvidenceStore {
    async fn put(&self, day: u32, blob: &[u8]) -> EvidenceResult<()> {
        check_day(day)?;
        if blob.is_empty() {
            return Err(EvidenceError::Empty);
        }
        let _guard = self.locks.lock(day).await;

        let used = self.bytes_used_excluding(day).await?;
        let available = self.capacity_bytes.saturating_sub(used);
        if blob.len() as u64 > available {
            return Err(EvidenceError::CapacityExceeded {
                needed: blob.len() as u64,
                available,
            });
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let target = self.blob_path(day);
        let tmp = self.dir.join(format!(".day-{:02}.img.tmp", day));
        tokio::fs::write(&tmp, blob).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::debug!(day, bytes = blob.len(), "evidence stored");
        Ok(())
    }

    async fn get(&self, day: u32) -> EvidenceResult<Option<Vec<u8>>> {
        check_day(day)?;
        let _guard = self.locks.lock(day).await;

        match tokio::fs::read(self.blob_path(day)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, day: u32) -> EvidenceResult<()> {
        check_day(day)?;
        let _guard = self.locks.lock(day).await;

        if self.remove_blob(day).await? {
            tracing::debug!(day, "evidence deleted");
        }
        Ok(())
    }

    async fn clear(&self) -> EvidenceResult<usize> {
        let mut removed = 0;
        for day in 1..=TOTAL_DAYS as u32 {
            let _guard = self.locks.lock(day).await;
            if self.remove_blob(day).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// In-memory store with switchable failures, for exercising the soft-fail paths.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryEvidenceStore {
    blobs: Mutex<HashMap<u32, Vec<u8>>>,
    pub fail_puts: std::sync::atomic::AtomicBool,
    pub fail_deletes: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl MemoryEvidenceStore {
    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    fn injected(flag: &std::sync::atomic::AtomicBool) -> EvidenceResult<()> {
        if flag.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(EvidenceError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected failure",
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[async_trait]
impl EvidenceStore for MemoryEvidenceStore {
    async fn put(&self, day: u32, blob: &[u8]) -> EvidenceResult<()> {
        check_day(day)?;
        Self::injected(&self.fail_puts)?;
        self.blobs.lock().unwrap().insert(day, blob.to_vec());
        Ok(())
    }

    async fn get(&self, day: u32) -> EvidenceResult<Option<Vec<u8>>> {
        check_day(day)?;
        Ok(self.blobs.lock().unwrap().get(&day).cloned())
    }

    async fn delete(&self, day: u32) -> EvidenceResult<()> {
        check_day(day)?;
        Self::injected(&self.fail_deletes)?;
        self.blobs.lock().unwrap().remove(&day);
        Ok(())
    }

    async fn clear(&self) -> EvidenceResult<usize> {
        Self::injected(&self.fail_deletes)?;
        let mut blobs = self.blobs.lock().unwrap();
        let n = blobs.len();
        blobs.clear();
        Ok(n)
    }
}
