use crate::core::error::MirrorSyncError;
use std::path::PathBuf;

pub fn get_config_directory() -> Result<PathBuf, MirrorSyncError> {
    let base = match std::env::consts::OS {
        "linux" | "freebsd" | "netbsd" | "openbsd" => std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::home_dir().unwrap_or_default().join(".config")),
        _ => dirs::config_dir().unwrap_or_default(),
    };

    Ok(base.join("mirrorsync"))
}

pub fn get_cache_directory() -> Result<PathBuf, MirrorSyncError> {
    let base = match std::env::consts::OS {
        "linux" | "freebsd" | "netbsd" | "openbsd" => std::env::var("XDG_CACHE_HOME")
            .map(PathBuf::from)
            .or_else(|_| {
                dirs::home_dir()
                    .map(|home| home.join(".cache"))
                    .ok_or(MirrorSyncError::CacheDirectoryNotFound)
            })?,
        _ => dirs::cache_dir().ok_or(MirrorSyncError::CacheDirectoryNotFound)?,
    };

    Ok(base.join("mirrorsync"))
}
