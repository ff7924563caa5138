//! Cross-process run lock.
//!
//! A deploy run holds an exclusive advisory lock on a file in the cache directory
//! for its whole duration. Acquisition never waits: if another process holds the
//! lock the run fails before any traversal starts.

use crate::core::error::{MirrorSyncError, Result};
use fs2::FileExt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

pub const LOCK_FILE: &str = ".mirrorsync.lock";

/// Guard for the run lock; released on drop.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(cache_root: &Path) -> Result<Self> {
        fs::create_dir_all(cache_root)?;
        let path = cache_root.join(LOCK_FILE);
        let file = File::create(&path)?;
        file.try_lock_exclusive()
            .map_err(|_| MirrorSyncError::lock_unavailable(&path))?;
        log::debug!("Acquired run lock {}", path.display());
        Ok(RunLock { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
