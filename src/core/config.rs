use crate::core::dirs::{get_cache_directory, get_config_directory};
use crate::core::error::{MirrorSyncError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SourceSettings {
    pub name: String,
    /// Directory holding one subdirectory per environment.
    pub basedir: PathBuf,
    #[serde(default)]
    pub environments: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct DeploySettings {
    /// Where mirrors live; defaults to the user cache directory.
    #[serde(default)]
    pub cachedir: Option<PathBuf>,
    /// When set, deployments are refused with this message.
    #[serde(default)]
    pub write_lock: Option<String>,
    #[serde(default)]
    pub sources: Vec<SourceSettings>,
}

impl DeploySettings {
    pub fn default_path() -> Result<PathBuf> {
        Ok(get_config_directory()?.join("config.json"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MirrorSyncError::config_not_found(path));
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| MirrorSyncError::config_parse(path, e))
    }

    pub fn cache_root(&self) -> Result<PathBuf> {
        match &self.cachedir {
            Some(dir) => Ok(dir.clone()),
            None => get_cache_directory(),
        }
    }

    /// Refuse to deploy while a write lock message is configured.
    pub fn check_write_lock(&self) -> Result<()> {
        match &self.write_lock {
            Some(message) => Err(MirrorSyncError::write_locked(message.clone())),
            None => Ok(()),
        }
    }
}
