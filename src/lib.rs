//! Mirrorsync - deploy environments and modules from cached git mirrors.
//!
//! Working directories are pinned to resolved revisions of remote repositories.
//! Each remote is mirrored once on disk and every working tree drawn from it
//! borrows the mirror's object database instead of carrying its own repository.
//!
//! # Public API
//! The main public interface is re-exported from the [`core`] module:
//! - [`SyncEngine`] and [`SyncStatus`] for driving one working tree
//! - [`CacheRegistry`] and [`RemoteCache`] for shared mirrors
//! - [`walk`] and the deployment graph traits for traversal
//! - [`DeployRecord`] for the bookkeeping file beside each working tree

pub mod commands;
pub mod core;

pub use core::{
    walk,
    // Mirrors
    CacheRegistry,
    // Deployment graph
    ConfiguredDeployment,
    DeployRecord,
    DeploySettings,
    Deployment,
    DeploymentVisitor,
    Environment,
    GitMirror,
    GitModule,
    // Error handling
    MirrorSyncError,
    Module,
    ModuleDeclarations,
    Outcome,
    RecordRead,
    RefType,
    RemoteCache,
    Result,
    RunLock,
    Source,
    // Synchronization
    SyncEngine,
    SyncStatus,
    Visit,
    WorkingTree,
};
