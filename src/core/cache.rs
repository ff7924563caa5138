//! Mirror caches of remote repositories.
//!
//! Every distinct remote gets exactly one bare mirror on disk. Mirrors outlive a
//! single run; the in-memory [`CacheRegistry`] that hands them out lives for one run
//! only and guarantees that two engines on the same remote share one cache.
//!
//! # Public API
//! - [`RemoteCache`]: Operations an engine needs from a mirror
//! - [`GitMirror`]: `git2` backed bare mirror
//! - [`CacheRegistry`]: Run-scoped registry keyed by normalized remote URL
//! - [`RefType`]: Classification of a ref inside a mirror

use crate::core::error::{MirrorSyncError, Result};
use git2::{
    build::CheckoutBuilder, AutotagOption, FetchOptions, FetchPrune, Oid, RemoteCallbacks,
    Repository, TreeWalkMode, TreeWalkResult,
};
use log::{debug, info};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

const MIRROR_REMOTE: &str = "origin";

/// Refspecs fetched into a mirror; branches and tags map onto themselves.
const MIRROR_REFSPECS: &[&str] = &["+refs/heads/*:refs/heads/*", "+refs/tags/*:refs/tags/*"];

/// What a ref names inside a mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefType {
    Revision,
    Tag,
    /// Branches, symbolic refs and anything that fails to classify.
    Other,
}

impl RefType {
    /// Revisions and tags never move, so a mirror that already knows them is fresh enough.
    pub fn is_immutable(self) -> bool {
        matches!(self, RefType::Revision | RefType::Tag)
    }
}

/// A local copy of a remote's object database.
///
/// `resolve` and `ref_type` are offline and never fail. `refresh` is the only
/// operation that talks to the remote and the only writer to the mirror.
pub trait RemoteCache: Send + Sync {
    /// The remote this cache mirrors.
    fn remote(&self) -> &str;

    /// On-disk location of the mirror, used in diagnostics.
    fn location(&self) -> &Path;

    fn exists(&self) -> bool;

    fn resolve(&self, reference: &str) -> Option<String>;

    fn ref_type(&self, reference: &str) -> RefType;

    /// Fetch all branches and tags, creating the mirror if needed.
    fn refresh(&self) -> Result<()>;

    /// Write the tree of `signature` into `work_tree`, overwriting whatever is there.
    fn checkout(&self, signature: &str, work_tree: &Path) -> Result<()>;

    /// Every path (files and directories) contained in the tree of `signature`.
    fn tracked_paths(&self, signature: &str) -> Result<BTreeSet<PathBuf>>;
}

/// Gate letting a fetch run at most once per run.
///
/// The lock is held for the whole fetch, so concurrent callers wait for the
/// first one and then return without fetching. A failed fetch leaves the gate
/// open for the next caller.
#[derive(Debug, Default)]
struct RefreshOnce {
    done: Mutex<bool>,
}

impl RefreshOnce {
    /// Returns whether `fetch` ran.
    fn run(&self, fetch: impl FnOnce() -> Result<()>) -> Result<bool> {
        let mut done = self.done.lock().unwrap_or_else(PoisonError::into_inner);
        if *done {
            return Ok(false);
        }
        fetch()?;
        *done = true;
        Ok(true)
    }
}

/// Bare `git2` mirror of one remote.
pub struct GitMirror {
    remote: String,
    git_dir: PathBuf,
    refreshed: RefreshOnce,
}

impl GitMirror {
    pub fn new(remote: impl Into<String>, cache_root: &Path) -> Self {
        let remote = remote.into();
        let git_dir = cache_root.join(sanitize_remote(&remote));
        GitMirror {
            remote,
            git_dir,
            refreshed: RefreshOnce::default(),
        }
    }

    fn open(&self) -> Result<Repository> {
        Ok(Repository::open_bare(&self.git_dir)?)
    }

    fn create(&self) -> Result<Repository> {
        info!("Creating mirror of {} at {}", self.remote, self.git_dir.display());
        if let Some(parent) = self.git_dir.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Repository::init_bare(&self.git_dir)?)
    }

    fn fetch(&self) -> Result<()> {
        let repo = if self.exists() {
            self.open()?
        } else {
            self.create()?
        };

        let mut remote = match repo.find_remote(MIRROR_REMOTE) {
            Ok(remote) => remote,
            Err(_) => repo.remote(MIRROR_REMOTE, &self.remote)?,
        };

        let mut fetch_options = FetchOptions::new();
        fetch_options
            .remote_callbacks(credential_callbacks(&repo))
            .prune(FetchPrune::On)
            .download_tags(AutotagOption::All);

        debug!("Fetching {} into {}", self.remote, self.git_dir.display());
        remote
            .fetch(MIRROR_REFSPECS, Some(&mut fetch_options), None)
            .map_err(|e| MirrorSyncError::fetch(&self.remote, e))
    }

    fn find_commit<'r>(&self, repo: &'r Repository, signature: &str) -> Result<git2::Commit<'r>> {
        let oid = Oid::from_str(signature)?;
        Ok(repo.find_commit(oid)?)
    }
}

impl RemoteCache for GitMirror {
    fn remote(&self) -> &str {
        &self.remote
    }

    fn location(&self) -> &Path {
        &self.git_dir
    }

    fn exists(&self) -> bool {
        self.git_dir.is_dir()
    }

    fn resolve(&self, reference: &str) -> Option<String> {
        let repo = self.open().ok()?;
        resolve_commit(&repo, reference)
    }

    fn ref_type(&self, reference: &str) -> RefType {
        let Ok(repo) = self.open() else {
            return RefType::Other;
        };

        if repo
            .find_reference(&format!("refs/heads/{reference}"))
            .is_ok()
        {
            RefType::Other
        } else if repo.find_reference(&format!("refs/tags/{reference}")).is_ok() {
            RefType::Tag
        } else if is_hex(reference) && resolve_commit(&repo, reference).is_some() {
            RefType::Revision
        } else {
            RefType::Other
        }
    }

    fn refresh(&self) -> Result<()> {
        if !self.refreshed.run(|| self.fetch())? {
            debug!("Mirror {} already refreshed in this run", self.git_dir.display());
        }
        Ok(())
    }

    fn checkout(&self, signature: &str, work_tree: &Path) -> Result<()> {
        let repo = self.open()?;
        let commit = self.find_commit(&repo, signature)?;

        // The mirror's own index and HEAD stay untouched; only the target dir is written.
        let mut builder = CheckoutBuilder::new();
        builder
            .force()
            .recreate_missing(true)
            .update_index(false)
            .target_dir(work_tree);
        repo.checkout_tree(commit.as_object(), Some(&mut builder))?;
        Ok(())
    }

    fn tracked_paths(&self, signature: &str) -> Result<BTreeSet<PathBuf>> {
        let repo = self.open()?;
        let tree = self.find_commit(&repo, signature)?.tree()?;

        let mut paths = BTreeSet::new();
        tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            if let Some(name) = entry.name() {
                paths.insert(Path::new(root).join(name));
            }
            TreeWalkResult::Ok
        })?;
        Ok(paths)
    }
}

fn resolve_commit(repo: &Repository, reference: &str) -> Option<String> {
    if reference.is_empty() {
        return None;
    }
    repo.revparse_single(&format!("{reference}^{{commit}}"))
        .ok()
        .map(|object| object.id().to_string())
}

fn credential_callbacks(repo: &Repository) -> RemoteCallbacks<'static> {
    let config = repo.config().ok();
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |url, username_from_url, allowed| {
        if allowed.is_ssh_key() {
            if let Some(user) = username_from_url {
                return git2::Cred::ssh_key_from_agent(user);
            }
        }
        if allowed.is_user_pass_plaintext() {
            if let Some(ref config) = config {
                if let Ok(cred) = git2::Cred::credential_helper(config, url, username_from_url) {
                    return Ok(cred);
                }
            }
        }
        git2::Cred::default()
    });
    callbacks
}

fn is_hex(reference: &str) -> bool {
    (4..=40).contains(&reference.len()) && reference.chars().all(|c| c.is_ascii_hexdigit())
}

/// Directory name used for a remote's mirror.
///
/// Every character outside `[@\w.-]` becomes `-`, so
/// `https://example.com/org/repo.git` maps to `https---example.com-org-repo.git`.
pub fn sanitize_remote(remote: &str) -> String {
    remote
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '@' | '.' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Registry key for a remote URL.
pub fn normalize_remote(remote: &str) -> String {
    remote.trim().trim_end_matches('/').to_string()
}

type CacheFactory = Box<dyn Fn(&str, &Path) -> Arc<dyn RemoteCache> + Send + Sync>;

/// Run-scoped registry that hands out one shared cache per remote.
pub struct CacheRegistry {
    cache_root: PathBuf,
    caches: Mutex<HashMap<String, Arc<dyn RemoteCache>>>,
    factory: CacheFactory,
}

impl CacheRegistry {
    /// Registry producing [`GitMirror`]s under `cache_root`.
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self::with_factory(cache_root, |remote, root| {
            Arc::new(GitMirror::new(remote, root)) as Arc<dyn RemoteCache>
        })
    }

    /// Registry producing caches from a custom factory.
    pub fn with_factory<F>(cache_root: impl Into<PathBuf>, factory: F) -> Self
    where
        F: Fn(&str, &Path) -> Arc<dyn RemoteCache> + Send + Sync + 'static,
    {
        CacheRegistry {
            cache_root: cache_root.into(),
            caches: Mutex::new(HashMap::new()),
            factory: Box::new(factory),
        }
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// The cache for `remote`, created on first use.
    pub fn cache_for(&self, remote: &str) -> Arc<dyn RemoteCache> {
        let key = normalize_remote(remote);
        let mut caches = self.caches.lock().unwrap_or_else(PoisonError::into_inner);
        caches
            .entry(key)
            .or_insert_with_key(|key| (self.factory)(key, &self.cache_root))
            .clone()
    }

    /// Number of distinct remotes seen in this run.
    pub fn len(&self) -> usize {
        self.caches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
