//! Synchronization of one working tree to one ref of one remote.
//!
//! [`SyncEngine`] ties a [`RemoteCache`] and a [`WorkingTree`] together. Each call to
//! [`SyncEngine::sync`] runs strictly in order:
//!
//! 1. refresh the mirror when the ref might have moved or is unknown
//! 2. resolve the ref to a signature
//! 3. classify the working tree against that signature
//! 4. rebuild the directory from scratch when it is absent or mismatched
//! 5. hard reset to the signature and clean everything but the deploy record
//!
//! # Status classification
//! - [`SyncStatus::Absent`]: the path is not a directory
//! - [`SyncStatus::Mismatched`]: no valid deploy record, or foreign repository metadata
//! - [`SyncStatus::Outdated`]: valid record with a different (or no) target signature
//! - [`SyncStatus::InSync`]: valid record whose signature is the target

use crate::core::cache::{CacheRegistry, RemoteCache};
use crate::core::error::{MirrorSyncError, Result};
use crate::core::record::{DeployRecord, RecordRead, RECORD_FILE};
use crate::core::worktree::WorkingTree;
use log::debug;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Absent,
    Mismatched,
    Outdated,
    InSync,
}

impl SyncStatus {
    /// Whether the directory must be destroyed and rebuilt before checkout.
    pub fn needs_rebuild(self) -> bool {
        matches!(self, SyncStatus::Absent | SyncStatus::Mismatched)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStatus::Absent => "absent",
            SyncStatus::Mismatched => "mismatched",
            SyncStatus::Outdated => "outdated",
            SyncStatus::InSync => "insync",
        };
        f.write_str(name)
    }
}

pub struct SyncEngine {
    reference: String,
    cache: Arc<dyn RemoteCache>,
    tree: WorkingTree,
    head: Option<String>,
}

impl SyncEngine {
    pub fn new(
        reference: impl Into<String>,
        cache: Arc<dyn RemoteCache>,
        path: impl Into<PathBuf>,
    ) -> Self {
        let tree = WorkingTree::new(path, Arc::clone(&cache));
        SyncEngine {
            reference: reference.into(),
            cache,
            tree,
            head: None,
        }
    }

    /// Engine whose cache comes from the run's shared registry.
    pub fn from_registry(
        registry: &CacheRegistry,
        reference: impl Into<String>,
        remote: &str,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self::new(reference, registry.cache_for(remote), path)
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn path(&self) -> &Path {
        self.tree.path()
    }

    /// Signature recorded by the last successful sync.
    pub fn head(&self) -> Option<&str> {
        self.head.as_deref()
    }

    /// Bring the working tree to the resolved ref. Returns the signature checked out.
    pub fn sync(&mut self) -> Result<String> {
        if self.needs_refresh() {
            self.cache.refresh()?;
        }

        let signature = self.cache.resolve(&self.reference).ok_or_else(|| {
            MirrorSyncError::unresolvable_ref(&self.reference, self.cache.location())
        })?;

        let status = self.status(Some(&signature));
        match status {
            SyncStatus::InSync => {
                debug!("{} is already at ref {}", self.path().display(), self.reference)
            }
            _ => debug!(
                "Updating {} to {} ({status})",
                self.path().display(),
                self.reference
            ),
        }

        if status.needs_rebuild() {
            self.tree.recreate()?;
        }

        self.tree.reset_hard(&signature)?;
        self.tree.clean(&signature, &[Path::new(RECORD_FILE)])?;

        self.head = Some(signature.clone());
        Ok(signature)
    }

    /// Classify the working tree against `target`.
    pub fn status(&self, target: Option<&str>) -> SyncStatus {
        if !self.tree.is_present() {
            return SyncStatus::Absent;
        }

        let record = match DeployRecord::read(self.path()) {
            RecordRead::Valid(record) => record,
            RecordRead::Malformed(_) | RecordRead::Absent => return SyncStatus::Mismatched,
        };

        if self.tree.has_foreign_metadata() {
            return SyncStatus::Mismatched;
        }

        match target {
            Some(target) if record.signature == target => SyncStatus::InSync,
            _ => SyncStatus::Outdated,
        }
    }

    /// Status against the ref as the mirror resolves it right now, without fetching.
    pub fn current_status(&self) -> SyncStatus {
        let target = self.cache.resolve(&self.reference);
        self.status(target.as_deref())
    }

    /// Whether the mirror must be fetched before resolving.
    ///
    /// Only revisions and tags that already resolve are trusted without a fetch.
    pub fn needs_refresh(&self) -> bool {
        if !self.cache.exists() {
            debug!("Mirror for {} does not exist yet", self.cache.remote());
            return true;
        }
        if self.cache.resolve(&self.reference).is_none() {
            debug!("Ref {} is not known to the mirror", self.reference);
            return true;
        }
        !self.cache.ref_type(&self.reference).is_immutable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::RefType;
    use chrono::Utc;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingCache {
        exists: bool,
        ref_type: RefType,
        signature: Option<String>,
        refreshes: AtomicUsize,
    }

    impl CountingCache {
        fn new(exists: bool, ref_type: RefType, signature: Option<&str>) -> Arc<Self> {
            Arc::new(CountingCache {
                exists,
                ref_type,
                signature: signature.map(str::to_string),
                refreshes: AtomicUsize::new(0),
            })
        }
    }

    impl RemoteCache for CountingCache {
        fn remote(&self) -> &str {
            "counting"
        }
        fn location(&self) -> &Path {
            Path::new("/cache/counting")
        }
        fn exists(&self) -> bool {
            self.exists
        }
        fn resolve(&self, _reference: &str) -> Option<String> {
            self.signature.clone()
        }
        fn ref_type(&self, _reference: &str) -> RefType {
            self.ref_type
        }
        fn refresh(&self) -> Result<()> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn checkout(&self, _signature: &str, _work_tree: &Path) -> Result<()> {
            Ok(())
        }
        fn tracked_paths(&self, _signature: &str) -> Result<BTreeSet<PathBuf>> {
            Ok(BTreeSet::new())
        }
    }

    fn write_record(path: &Path, signature: &str) {
        DeployRecord {
            module_name: "example".to_string(),
            signature: signature.to_string(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
        .write(path)
        .unwrap();
    }

    #[test]
    fn test_status_absent_without_directory() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CountingCache::new(true, RefType::Tag, Some("abc"));
        let engine = SyncEngine::new("v1", cache, temp_dir.path().join("missing"));
        assert_eq!(engine.status(Some("abc")), SyncStatus::Absent);
    }

    #[test]
    fn test_status_mismatched_without_record() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CountingCache::new(true, RefType::Tag, Some("abc"));
        let engine = SyncEngine::new("v1", cache, temp_dir.path());
        assert_eq!(engine.status(Some("abc")), SyncStatus::Mismatched);
    }

    #[test]
    fn test_status_mismatched_with_unparsable_record() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(RECORD_FILE), "garbage").unwrap();
        let cache = CountingCache::new(true, RefType::Tag, Some("abc"));
        let engine = SyncEngine::new("v1", cache, temp_dir.path());
        assert_eq!(engine.status(Some("abc")), SyncStatus::Mismatched);
    }

    #[test]
    fn test_status_mismatched_with_foreign_metadata_overrides_record() {
        let temp_dir = TempDir::new().unwrap();
        write_record(temp_dir.path(), "abc");
        std::fs::create_dir(temp_dir.path().join(".git")).unwrap();
        let cache = CountingCache::new(true, RefType::Tag, Some("abc"));
        let engine = SyncEngine::new("v1", cache, temp_dir.path());
        assert_eq!(engine.status(Some("abc")), SyncStatus::Mismatched);
    }

    #[test]
    fn test_status_outdated_and_insync() {
        let temp_dir = TempDir::new().unwrap();
        write_record(temp_dir.path(), "abc");
        let cache = CountingCache::new(true, RefType::Tag, Some("abc"));
        let engine = SyncEngine::new("v1", cache, temp_dir.path());

        assert_eq!(engine.status(Some("def")), SyncStatus::Outdated);
        assert_eq!(engine.status(None), SyncStatus::Outdated);
        assert_eq!(engine.status(Some("abc")), SyncStatus::InSync);
        assert_eq!(engine.current_status(), SyncStatus::InSync);
    }

    #[test]
    fn test_needs_refresh_decisions() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tree");

        let missing = CountingCache::new(false, RefType::Tag, Some("abc"));
        assert!(SyncEngine::new("v1", missing, &path).needs_refresh());

        let unknown = CountingCache::new(true, RefType::Tag, None);
        assert!(SyncEngine::new("v1", unknown, &path).needs_refresh());

        let branch = CountingCache::new(true, RefType::Other, Some("abc"));
        assert!(SyncEngine::new("main", branch, &path).needs_refresh());

        let tag = CountingCache::new(true, RefType::Tag, Some("abc"));
        assert!(!SyncEngine::new("v1", tag, &path).needs_refresh());

        let revision = CountingCache::new(true, RefType::Revision, Some("abc"));
        assert!(!SyncEngine::new("abc", revision, &path).needs_refresh());
    }

    #[test]
    fn test_unresolvable_ref_leaves_tree_untouched() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("keep.txt"), "keep").unwrap();
        let cache = CountingCache::new(true, RefType::Other, None);
        let mut engine = SyncEngine::new("gone", cache.clone(), temp_dir.path());

        let err = engine.sync().unwrap_err();
        assert!(matches!(err, MirrorSyncError::UnresolvableRef { .. }));
        assert!(err.to_string().contains("/cache/counting"));
        assert_eq!(cache.refreshes.load(Ordering::SeqCst), 1);
        assert!(temp_dir.path().join("keep.txt").exists());
        assert_eq!(engine.head(), None);
    }

    #[test]
    fn test_sync_records_head() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CountingCache::new(true, RefType::Tag, Some("abc"));
        let mut engine = SyncEngine::new("v1", cache.clone(), temp_dir.path().join("tree"));

        assert_eq!(engine.sync().unwrap(), "abc");
        assert_eq!(engine.head(), Some("abc"));
        assert_eq!(cache.refreshes.load(Ordering::SeqCst), 0);
        assert!(engine.path().is_dir());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SyncStatus::InSync.to_string(), "insync");
        assert_eq!(SyncStatus::Mismatched.to_string(), "mismatched");
    }
}
