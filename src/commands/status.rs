use crate::core::cache::CacheRegistry;
use crate::core::config::DeploySettings;
use crate::core::error::Result;
use crate::core::sync::{SyncEngine, SyncStatus};
use crate::core::print_info;
use std::path::PathBuf;

/// Classify a working tree against the ref as currently known to its mirror.
///
/// Never fetches; an unknown ref is reported against no target.
pub fn working_tree_status(
    settings: &DeploySettings,
    path: PathBuf,
    remote: &str,
    reference: &str,
) -> Result<SyncStatus> {
    let registry = CacheRegistry::new(settings.cache_root()?);
    let engine = SyncEngine::from_registry(&registry, reference, remote, path);
    Ok(engine.current_status())
}

pub fn execute_status(
    config: Option<PathBuf>,
    path: PathBuf,
    remote: String,
    reference: String,
) -> Result<()> {
    let config_path = match config {
        Some(path) => path,
        None => DeploySettings::default_path()?,
    };
    let settings = DeploySettings::load(&config_path)?;

    let status = working_tree_status(&settings, path.clone(), &remote, &reference)?;
    print_info(&format!("{}: {status}", path.display()));
    Ok(())
}
