use std::env::current_exe;
use std::path::{Path, PathBuf};
use std::str;
use directories_next::ProjectDirs;
use log::{info, warn};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::config::types::ScanConfig;
use crate::error::ConfigError;

// creates a path to <exe>.json in the same directory as the executable
// this could be useful for usb sticks
fn get_portable_config_path() -> Option<PathBuf> {
    match current_exe() {
        Ok(mut path) => {
            if !path.set_extension("json") {
                warn!("current exe has no filename: {}", path.to_string_lossy());
                return None
            }

            Some(path)
        },
        Err(err) => {
            warn!("failed to get current exe path: {:?}", err);
            None
        },
    }
}

// creates a path to peripheral-scout.json in an os dependent standard directory, such as %AppData% on
// windows.
fn get_local_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "peripheral-scout", "peripheral-scout").map(|dirs| {
        dirs.config_dir().join("peripheral-scout.json")
    })
}

pub fn get_config_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = get_portable_config_path() {
        if path.is_file() {
            return Ok(path);
        }
    }

    match get_local_config_path() {
        None => Err(ConfigError::NoConfigPath),
        Some(path) => Ok(path),
    }
}

pub async fn read_config(path: &Path) -> Result<ScanConfig, ConfigError> {
    info!("Reading config file {}", path.to_string_lossy());
    let mut file = File::open(path).await?;

    let mut content = vec![];
    file.read_to_end(&mut content).await?;

    if content.is_empty() {
        return Ok(ScanConfig::default());
    }

    let content = str::from_utf8(&content)?;
    let config: ScanConfig = serde_json::from_str(content)?;
    Ok(config)
}

/// Reads the config at `path` (or the default location). A missing file means defaults.
pub async fn load_config(path: Option<&Path>) -> Result<ScanConfig, ConfigError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => get_config_path()?,
    };

    match read_config(&path).await {
        Ok(config) => Ok(config),
        Err(err) if err.is_file_not_found_error() => {
            info!("Config file not found, using defaults");
            Ok(ScanConfig::default())
        },
        Err(err) => Err(err),
    }
}
