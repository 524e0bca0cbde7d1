use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::wait_set::WatchedApp;

/// Lifecycle phase of the loader, as written to the status file.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LoaderState {
    /// Reading config and building the wait-set.
    Starting,
    /// Timers running; waiting for applications to appear.
    Polling,
    /// Timers cancelled; the grace period is running.
    Terminating,
    /// The loader has exited.
    Terminated,
}

/// One row of the pending/done list.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppEntry {
    pub name: String,
    pub done: bool,
}

impl From<&WatchedApp> for AppEntry {
    fn from(app: &WatchedApp) -> Self {
        Self {
            name: app.name.clone(),
            done: app.is_initialized(),
        }
    }
}

/// Runtime status written by the loader to `<app-data>/status.toml`.
/// A splash window reads this file (read-only) to render the holding screen.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoaderStatus {
    /// Loader binary version (set from Cargo.toml at compile time).
    pub version: String,
    pub state: LoaderState,
    /// Text currently shown under the spinner, e.g. `Loading System (50%)..`.
    pub status_text: String,
    pub progress_percent: u8,
    /// Fatal startup error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// RFC 3339 timestamp of the last write.
    pub updated_at: String,
    #[serde(default)]
    pub apps: Vec<AppEntry>,
}

impl LoaderStatus {
    /// Constructs the initial status on loader startup.
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            state: LoaderState::Starting,
            status_text: String::new(),
            progress_percent: 0,
            error: None,
            updated_at: chrono::Local::now().to_rfc3339(),
            apps: Vec::new(),
        }
    }
}

/// Serializes `status` to TOML and writes it to `path`.
/// Creates the parent directory if it does not exist.
/// Logs errors rather than panicking; a status write failure never stops the loader.
pub fn write_status(path: &Path, status: &LoaderStatus) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("[status] Failed to create directory {}: {e}", parent.display());
            return;
        }
    }
    match toml::to_string_pretty(status) {
        Ok(content) => {
            if let Err(e) = std::fs::write(path, content) {
                tracing::warn!("[status] Failed to write status file: {e}");
            }
        }
        Err(e) => tracing::warn!("[status] Failed to serialize status: {e}"),
    }
}
