/// Canonical file paths for HoldScreen data files.
///
/// All files live under the per-user application data directory
/// (%APPDATA%\HoldScreen\ on Windows, `<config_dir>/HoldScreen/` elsewhere):
///   - startupApps.json  The list of applications to wait for. Never auto-created.
///   - settings.toml     Optional timing overrides.
///   - status.toml       Written by the loader for an external window to render.
use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_DIR_NAME: &str = "HoldScreen";
pub const CONFIG_FILE_NAME: &str = "startupApps.json";
pub const SETTINGS_FILE_NAME: &str = "settings.toml";
pub const STATUS_FILE_NAME: &str = "status.toml";

/// Overrides the data directory entirely when set (used by installers and tests).
pub const DATA_DIR_ENV: &str = "HOLDSCREEN_DATA_DIR";

/// Returns the HoldScreen application data directory.
pub fn app_data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    base_dir().map(|base| base.join(APP_DIR_NAME))
}

#[cfg(windows)]
fn base_dir() -> Result<PathBuf> {
    std::env::var_os("APPDATA")
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
        .context("APPDATA environment variable not set")
}

#[cfg(not(windows))]
fn base_dir() -> Result<PathBuf> {
    dirs::config_dir().context("Could not determine the user configuration directory")
}

/// Returns the full path to the application list: `<app-data>/startupApps.json`
pub fn config_file_path() -> Result<PathBuf> {
    Ok(app_data_dir()?.join(CONFIG_FILE_NAME))
}

/// Returns the full path to the optional settings file: `<app-data>/settings.toml`
pub fn settings_file_path() -> Result<PathBuf> {
    Ok(app_data_dir()?.join(SETTINGS_FILE_NAME))
}

/// Returns the full path to the status file: `<app-data>/status.toml`
pub fn status_file_path() -> Result<PathBuf> {
    Ok(app_data_dir()?.join(STATUS_FILE_NAME))
}
