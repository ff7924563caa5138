//! Domain-specific error types and error handling utilities.
//!
//! This module defines [`MirrorSyncError`] which covers every failure mode of the
//! synchronization engine and the deploy action. It uses `thiserror` for ergonomic
//! error definitions and includes constructors for the common failure scenarios.
//!
//! # Public API
//! - [`MirrorSyncError`]: Main error enum covering all failure modes
//! - [`Result<T>`]: Type alias for `std::result::Result<T, MirrorSyncError>`
//!
//! # Error Categories
//! - **Per-unit errors**: fetch failures, unresolvable refs, working tree I/O.
//!   These are folded into a deploy outcome and never abort the run.
//! - **Run-level errors**: settings loading, write lock, run lock.
//!   These are reported before any traversal starts.

use std::path::PathBuf;
use thiserror::Error;

/// Domain-specific error types for mirrorsync
#[derive(Error, Debug)]
pub enum MirrorSyncError {
    // Mirror errors
    #[error("Unable to fetch from remote '{remote}': {source}")]
    Fetch { remote: String, source: git2::Error },

    #[error("Unable to sync repo to unresolvable ref '{reference}' (mirror: {mirror})")]
    UnresolvableRef { reference: String, mirror: PathBuf },

    #[error("Git repository error: {0}")]
    Git(#[from] git2::Error),

    // Working tree errors
    #[error("Failed to update working tree '{path}': {source}")]
    WorkTree {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Deployment errors
    #[error("Failed to parse module declarations '{path}': {source}")]
    ManifestParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid module name '{name}' in '{path}'")]
    InvalidModuleName { path: PathBuf, name: String },

    // Run-level errors
    #[error("Settings file does not exist at '{path}'")]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to parse settings file '{path}': {source}")]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Could not find cache directory")]
    CacheDirectoryNotFound,

    #[error("Deploy lock is held by another process ({path})")]
    LockUnavailable { path: PathBuf },

    #[error("Deployments are locked: {message}")]
    WriteLocked { message: String },
}

/// Convenience type alias for Results using MirrorSyncError
pub type Result<T> = std::result::Result<T, MirrorSyncError>;

impl MirrorSyncError {
    /// Create a fetch error for a remote
    pub fn fetch(remote: impl Into<String>, source: git2::Error) -> Self {
        Self::Fetch {
            remote: remote.into(),
            source,
        }
    }

    /// Create an unresolvable ref error naming the mirror that was searched
    pub fn unresolvable_ref(reference: impl Into<String>, mirror: impl Into<PathBuf>) -> Self {
        Self::UnresolvableRef {
            reference: reference.into(),
            mirror: mirror.into(),
        }
    }

    /// Create a working tree error
    pub fn work_tree(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WorkTree {
            path: path.into(),
            source,
        }
    }

    pub fn manifest_parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::ManifestParse {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_module_name(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self::InvalidModuleName {
            path: path.into(),
            name: name.into(),
        }
    }

    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn config_parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::ConfigParse {
            path: path.into(),
            source,
        }
    }

    pub fn lock_unavailable(path: impl Into<PathBuf>) -> Self {
        Self::LockUnavailable { path: path.into() }
    }

    pub fn write_locked(message: impl Into<String>) -> Self {
        Self::WriteLocked {
            message: message.into(),
        }
    }
}
