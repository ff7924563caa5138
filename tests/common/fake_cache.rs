//! In-memory [`RemoteCache`] for refresh-decision and failure-injection tests

#![allow(dead_code)]

use mirrorsync::core::cache::{RefType, RemoteCache};
use mirrorsync::core::error::{MirrorSyncError, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct FakeCache {
    remote: String,
    location: PathBuf,
    exists: AtomicBool,
    /// Refs visible before any refresh.
    refs: Mutex<HashMap<String, (RefType, String)>>,
    /// Refs that only appear once a refresh happened.
    remote_refs: HashMap<String, (RefType, String)>,
    trees: HashMap<String, BTreeMap<String, String>>,
    fail_refresh: bool,
    refreshes: AtomicUsize,
}

impl FakeCache {
    pub fn new(remote: &str) -> Self {
        FakeCache {
            remote: remote.to_string(),
            location: PathBuf::from("/fake-cache").join(remote),
            exists: AtomicBool::new(true),
            refs: Mutex::new(HashMap::new()),
            remote_refs: HashMap::new(),
            trees: HashMap::new(),
            fail_refresh: false,
            refreshes: AtomicUsize::new(0),
        }
    }

    /// A ref already present in the mirror.
    pub fn with_ref(self, name: &str, ref_type: RefType, signature: &str) -> Self {
        self.refs
            .lock()
            .unwrap()
            .insert(name.to_string(), (ref_type, signature.to_string()));
        self
    }

    /// A ref that the mirror only learns about after a refresh.
    pub fn with_remote_ref(mut self, name: &str, ref_type: RefType, signature: &str) -> Self {
        self.remote_refs
            .insert(name.to_string(), (ref_type, signature.to_string()));
        self
    }

    pub fn with_tree(mut self, signature: &str, files: &[(&str, &str)]) -> Self {
        let tree = files
            .iter()
            .map(|(path, content)| (path.to_string(), content.to_string()))
            .collect();
        self.trees.insert(signature.to_string(), tree);
        self
    }

    pub fn missing(self) -> Self {
        self.exists.store(false, Ordering::SeqCst);
        self
    }

    pub fn failing_refresh(mut self) -> Self {
        self.fail_refresh = true;
        self
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    fn tree(&self, signature: &str) -> Result<&BTreeMap<String, String>> {
        self.trees
            .get(signature)
            .ok_or_else(|| MirrorSyncError::unresolvable_ref(signature, &self.location))
    }
}

impl RemoteCache for FakeCache {
    fn remote(&self) -> &str {
        &self.remote
    }

    fn location(&self) -> &Path {
        &self.location
    }

    fn exists(&self) -> bool {
        self.exists.load(Ordering::SeqCst)
    }

    fn resolve(&self, reference: &str) -> Option<String> {
        if !self.exists() {
            return None;
        }
        self.refs
            .lock()
            .unwrap()
            .get(reference)
            .map(|(_, signature)| signature.clone())
    }

    fn ref_type(&self, reference: &str) -> RefType {
        self.refs
            .lock()
            .unwrap()
            .get(reference)
            .map(|(ref_type, _)| *ref_type)
            .unwrap_or(RefType::Other)
    }

    fn refresh(&self) -> Result<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if self.fail_refresh {
            return Err(MirrorSyncError::fetch(
                &self.remote,
                git2::Error::from_str("could not connect to remote"),
            ));
        }
        self.exists.store(true, Ordering::SeqCst);
        self.refs
            .lock()
            .unwrap()
            .extend(self.remote_refs.clone());
        Ok(())
    }

    fn checkout(&self, signature: &str, work_tree: &Path) -> Result<()> {
        for (path, content) in self.tree(signature)? {
            let target = work_tree.join(path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(target, content)?;
        }
        Ok(())
    }

    fn tracked_paths(&self, signature: &str) -> Result<BTreeSet<PathBuf>> {
        let mut paths = BTreeSet::new();
        for path in self.tree(signature)?.keys() {
            for ancestor in Path::new(path).ancestors() {
                if !ancestor.as_os_str().is_empty() {
                    paths.insert(ancestor.to_path_buf());
                }
            }
        }
        Ok(paths)
    }
}
