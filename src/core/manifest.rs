//! File-backed deployment graph.
//!
//! Sources and environments come from [`DeploySettings`]. Each environment directory
//! carries a `modules.json` declaring the modules it needs:
//!
//! ```json
//! {
//!   "moduledir": "modules",
//!   "modules": [
//!     { "name": "apache", "remote": "https://git.example.com/apache.git", "ref": "v1.0.0" }
//!   ]
//! }
//! ```
//!
//! Every declared module becomes a [`GitModule`] whose sync is a [`SyncEngine`] drawing
//! its mirror from the run's shared [`CacheRegistry`].

use crate::core::cache::CacheRegistry;
use crate::core::config::{DeploySettings, SourceSettings};
use crate::core::deployment::{Deployment, Environment, Module, ModuleDeclarations, Source};
use crate::core::error::{MirrorSyncError, Result};
use crate::core::sync::SyncEngine;
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

pub const MANIFEST_FILE: &str = "modules.json";

const DEFAULT_MODULEDIR: &str = "modules";

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ModuleEntry {
    pub name: String,
    pub remote: String,
    #[serde(rename = "ref")]
    pub reference: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Manifest {
    #[serde(default = "default_moduledir")]
    pub moduledir: PathBuf,
    #[serde(default)]
    pub modules: Vec<ModuleEntry>,
}

fn default_moduledir() -> PathBuf {
    PathBuf::from(DEFAULT_MODULEDIR)
}

impl Manifest {
    /// Parse a manifest, rejecting module names that would not land in their own
    /// directory directly under `moduledir`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let manifest: Manifest =
            serde_json::from_str(&content).map_err(|e| MirrorSyncError::manifest_parse(path, e))?;

        if let Some(entry) = manifest
            .modules
            .iter()
            .find(|entry| !is_valid_module_name(&entry.name))
        {
            return Err(MirrorSyncError::invalid_module_name(path, &entry.name));
        }
        Ok(manifest)
    }
}

/// A single normal path component: not empty, `.`, `..`, absolute or nested.
fn is_valid_module_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// A module deployed from a git remote.
pub struct GitModule {
    name: String,
    engine: SyncEngine,
}

impl GitModule {
    pub fn new(name: impl Into<String>, engine: SyncEngine) -> Self {
        GitModule {
            name: name.into(),
            engine,
        }
    }
}

impl Module for GitModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> &Path {
        self.engine.path()
    }

    fn signature(&self) -> Option<String> {
        self.engine.head().map(str::to_string)
    }

    fn sync(&mut self) -> Result<()> {
        self.engine.sync().map(|_| ())
    }
}

/// Declarations read from an environment's `modules.json`.
pub struct ManifestDeclarations {
    environment_path: PathBuf,
    registry: Arc<CacheRegistry>,
    modules: Option<Vec<Box<dyn Module>>>,
}

impl ManifestDeclarations {
    pub fn new(environment_path: impl Into<PathBuf>, registry: Arc<CacheRegistry>) -> Self {
        ManifestDeclarations {
            environment_path: environment_path.into(),
            registry,
            modules: None,
        }
    }
}

impl ModuleDeclarations for ManifestDeclarations {
    fn load(&mut self) -> Result<()> {
        if self.modules.is_some() {
            return Ok(());
        }

        let manifest = Manifest::load(&self.environment_path.join(MANIFEST_FILE))?;
        let moduledir = self.environment_path.join(&manifest.moduledir);
        let modules = manifest
            .modules
            .into_iter()
            .map(|entry| {
                let engine = SyncEngine::from_registry(
                    &self.registry,
                    entry.reference,
                    &entry.remote,
                    moduledir.join(&entry.name),
                );
                Box::new(GitModule::new(entry.name, engine)) as Box<dyn Module>
            })
            .collect();

        self.modules = Some(modules);
        Ok(())
    }

    fn modules(&mut self) -> &mut [Box<dyn Module>] {
        match &mut self.modules {
            Some(modules) => modules.as_mut_slice(),
            None => &mut [],
        }
    }
}

pub struct DirectoryEnvironment {
    dirname: String,
    path: PathBuf,
    declarations: ManifestDeclarations,
}

impl DirectoryEnvironment {
    pub fn new(basedir: &Path, dirname: impl Into<String>, registry: Arc<CacheRegistry>) -> Self {
        let dirname = dirname.into();
        let path = basedir.join(&dirname);
        DirectoryEnvironment {
            declarations: ManifestDeclarations::new(&path, registry),
            dirname,
            path,
        }
    }
}

impl Environment for DirectoryEnvironment {
    fn dirname(&self) -> &str {
        &self.dirname
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn declarations(&mut self) -> &mut dyn ModuleDeclarations {
        &mut self.declarations
    }
}

pub struct ConfiguredSource {
    name: String,
    environments: Vec<Box<dyn Environment>>,
}

impl ConfiguredSource {
    pub fn new(settings: &SourceSettings, registry: &Arc<CacheRegistry>) -> Self {
        let environments = settings
            .environments
            .iter()
            .map(|name| {
                Box::new(DirectoryEnvironment::new(
                    &settings.basedir,
                    name.as_str(),
                    Arc::clone(registry),
                )) as Box<dyn Environment>
            })
            .collect();
        ConfiguredSource {
            name: settings.name.clone(),
            environments,
        }
    }
}

impl Source for ConfiguredSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn environments(&mut self) -> Result<&mut [Box<dyn Environment>]> {
        Ok(&mut self.environments)
    }
}

pub struct ConfiguredDeployment {
    sources: Vec<Box<dyn Source>>,
}

impl ConfiguredDeployment {
    pub fn new(settings: &DeploySettings, registry: Arc<CacheRegistry>) -> Self {
        let sources = settings
            .sources
            .iter()
            .map(|source| Box::new(ConfiguredSource::new(source, &registry)) as Box<dyn Source>)
            .collect();
        ConfiguredDeployment { sources }
    }
}

impl Deployment for ConfiguredDeployment {
    fn sources(&mut self) -> &mut [Box<dyn Source>] {
        &mut self.sources
    }
}
