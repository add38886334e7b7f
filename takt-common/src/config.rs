//! Configuration loading and root folder resolution
//!
//! The root folder holds the SQLite database (`takt.db`) and all uploaded
//! media (`media/`). Resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. `TAKT_ROOT` environment variable
//! 3. TOML config file (`root_folder` key)
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Environment variable naming the root folder
pub const ROOT_ENV_VAR: &str = "TAKT_ROOT";

/// Default port for the competition-management service
pub const DEFAULT_PORT: u16 = 5741;

/// Resolve the root folder following the 4-tier priority order
pub fn resolve_root_folder(cli_arg: Option<&str>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_ENV_VAR) {
        return PathBuf::from(path);
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = find_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root_folder);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Locate the platform config file, if one exists
fn find_config_file() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // Try ~/.config/takt/config.toml first, then /etc/takt/config.toml
        if let Some(path) = dirs::config_dir().map(|d| d.join("takt").join("config.toml")) {
            if path.exists() {
                return Ok(path);
            }
        }
        let system_config = PathBuf::from("/etc/takt/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
        Err(Error::Config("No config file found".to_string()))
    } else {
        let path = dirs::config_dir()
            .map(|d| d.join("takt").join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
        if path.exists() {
            Ok(path)
        } else {
            Err(Error::Config(format!("Config file not found: {:?}", path)))
        }
    }
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("takt"))
        .unwrap_or_else(|| PathBuf::from("./takt_data"))
}

/// Create the root folder and media subfolder if missing
pub fn ensure_root_folder(root: &Path) -> Result<()> {
    std::fs::create_dir_all(root)?;
    std::fs::create_dir_all(media_root(root))?;
    Ok(())
}

/// Path of the SQLite database inside the root folder
pub fn database_path(root: &Path) -> PathBuf {
    root.join("takt.db")
}

/// Folder holding uploaded media (photos, passport scans, recordings)
pub fn media_root(root: &Path) -> PathBuf {
    root.join("media")
}

/// Read the listen port override from the settings table, falling back to
/// [`DEFAULT_PORT`] when unset or unparseable
pub async fn load_listen_port(pool: &sqlx::SqlitePool) -> Result<u16> {
    let value: Option<String> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = 'listen_port'")
            .fetch_optional(pool)
            .await?;

    Ok(value
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT))
}
