//! Core functionality for mirrorsync.
//!
//! This module provides the building blocks of a deploy run: mirror caches,
//! cache-backed working trees, the synchronization engine, deploy records and
//! the deployment graph traversal.

pub mod cache;
pub mod config;
pub mod deployment;
pub mod dirs;
pub mod error;
pub mod lock;
pub mod manifest;
pub mod output;
pub mod record;
pub mod sync;
pub mod worktree;

// === Error handling ===
pub use error::{MirrorSyncError, Result};

// === Mirrors and working trees ===
// One shared mirror per remote, handed out by a run-scoped registry
pub use cache::{CacheRegistry, GitMirror, RefType, RemoteCache};
pub use worktree::WorkingTree;

// === Synchronization ===
pub use record::{DeployRecord, RecordRead, RECORD_FILE};
pub use sync::{SyncEngine, SyncStatus};

// === Deployment traversal ===
pub use deployment::{
    walk, Deployment, DeploymentVisitor, Environment, Failure, Module, ModuleDeclarations,
    Outcome, Source, Visit,
};
pub use manifest::{ConfiguredDeployment, GitModule, Manifest, ManifestDeclarations};

// === Settings and locking ===
pub use config::{DeploySettings, SourceSettings};
pub use lock::RunLock;

// === Output formatting ===
pub use output::{print_error, print_info, print_section_header, print_success};
