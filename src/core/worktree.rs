//! Cache-backed working trees.
//!
//! A [`WorkingTree`] is a plain directory with no repository metadata of its own.
//! Every git operation on it runs against the mirror's object database with the
//! directory passed in as the checkout target.

use crate::core::cache::RemoteCache;
use crate::core::error::{MirrorSyncError, Result};
use log::debug;
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of repository metadata that marks a directory as foreign.
pub const FOREIGN_METADATA: &str = ".git";

pub struct WorkingTree {
    path: PathBuf,
    cache: Arc<dyn RemoteCache>,
}

impl WorkingTree {
    pub fn new(path: impl Into<PathBuf>, cache: Arc<dyn RemoteCache>) -> Self {
        WorkingTree {
            path: path.into(),
            cache,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_present(&self) -> bool {
        self.path.is_dir()
    }

    /// Whether the directory carries repository metadata we did not create.
    pub fn has_foreign_metadata(&self) -> bool {
        self.path.join(FOREIGN_METADATA).symlink_metadata().is_ok()
    }

    /// Remove the directory and everything in it, then recreate it empty.
    pub fn recreate(&self) -> Result<()> {
        match fs::symlink_metadata(&self.path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(&self.path),
            Ok(_) => fs::remove_file(&self.path),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
        .map_err(|e| MirrorSyncError::work_tree(&self.path, e))?;

        fs::create_dir_all(&self.path).map_err(|e| MirrorSyncError::work_tree(&self.path, e))
    }

    /// Hard reset the directory contents to `signature`.
    pub fn reset_hard(&self, signature: &str) -> Result<()> {
        self.cache.checkout(signature, &self.path)
    }

    /// Delete everything not part of the tree of `signature`.
    ///
    /// `keep` lists root-relative paths that survive even though they are untracked.
    pub fn clean(&self, signature: &str, keep: &[&Path]) -> Result<()> {
        let tracked = self.cache.tracked_paths(signature)?;
        self.clean_dir(&self.path, Path::new(""), &tracked, keep)
    }

    fn clean_dir(
        &self,
        dir: &Path,
        relative: &Path,
        tracked: &BTreeSet<PathBuf>,
        keep: &[&Path],
    ) -> Result<()> {
        let entries = fs::read_dir(dir).map_err(|e| MirrorSyncError::work_tree(dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| MirrorSyncError::work_tree(dir, e))?;
            let full_path = entry.path();
            let relative_path = relative.join(entry.file_name());

            if keep.iter().any(|k| relative_path.as_path() == *k) {
                continue;
            }

            let file_type = entry
                .file_type()
                .map_err(|e| MirrorSyncError::work_tree(&full_path, e))?;

            if !tracked.contains(&relative_path) {
                debug!("Removing untracked {}", full_path.display());
                let removed = if file_type.is_dir() {
                    fs::remove_dir_all(&full_path)
                } else {
                    fs::remove_file(&full_path)
                };
                removed.map_err(|e| MirrorSyncError::work_tree(&full_path, e))?;
            } else if file_type.is_dir() {
                self.clean_dir(&full_path, &relative_path, tracked, keep)?;
            }
        }
        Ok(())
    }
}
