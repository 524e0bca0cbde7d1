use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_DOT_INTERVAL_MS: u64 = 500;
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 500;

const MIN_TIMEOUT_SECS: u64 = 1;
const MIN_INTERVAL_MS: u64 = 50;
const MAX_GRACE_PERIOD_MS: u64 = 10_000;

/// Failures while turning `startupApps.json` into a wait-set.
/// Every variant is fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid config in {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No application in the config has HoldLoader enabled")]
    EmptyWaitSet,
}

/// One entry of `startupApps.json`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ApplicationDescriptor {
    /// Process name to match, case-insensitive (e.g. "Notepad").
    #[serde(rename = "Name")]
    pub name: String,
    /// Full executable path, used when the process name alone is ambiguous.
    #[serde(rename = "Path", default)]
    pub path: Option<String>,
    /// Only entries with this flag set keep the loader open.
    #[serde(rename = "HoldLoader", default = "default_hold_loader")]
    pub hold_loader: bool,
}

fn default_hold_loader() -> bool {
    true
}

/// Creates the parent directory of `path` if it is missing.
pub fn ensure_config_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
    }
    Ok(())
}

/// Loads the application list at `path` and keeps only the entries with
/// `HoldLoader` set. The returned list may be empty; the wait-set rejects that.
pub fn load(path: &Path) -> Result<Vec<ApplicationDescriptor>, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let apps: Vec<ApplicationDescriptor> =
        serde_json::from_str(&content).map_err(|source| ConfigError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;

    let total = apps.len();
    let held: Vec<_> = apps.into_iter().filter(|app| app.hold_loader).collect();
    tracing::info!(
        total,
        holding = held.len(),
        "[config] Loaded {}",
        path.display()
    );
    Ok(held)
}

/// Timing knobs read from `settings.toml`. Every field is optional.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoaderSettings {
    /// Seconds before the loader gives up waiting.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Milliseconds between process presence checks.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Milliseconds between loading-dot animation steps.
    #[serde(default = "default_dot_interval_ms")]
    pub dot_interval_ms: u64,
    /// Milliseconds between deciding to close and actually exiting.
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            dot_interval_ms: DEFAULT_DOT_INTERVAL_MS,
            grace_period_ms: DEFAULT_GRACE_PERIOD_MS,
        }
    }
}

impl LoaderSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(MIN_TIMEOUT_SECS))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_INTERVAL_MS))
    }

    pub fn dot_interval(&self) -> Duration {
        Duration::from_millis(self.dot_interval_ms.max(MIN_INTERVAL_MS))
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms.min(MAX_GRACE_PERIOD_MS))
    }
}

/// Loads the settings file at `path`, returning `LoaderSettings::default()` if the file does not exist.
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_settings_or_default(path: &Path) -> Result<LoaderSettings> {
    if !path.exists() {
        return Ok(LoaderSettings::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse settings file: {}", path.display()))
}

/// Like [`load_settings_or_default`], but an unreadable or unparseable file is
/// logged and replaced by the defaults instead of failing startup.
pub fn load_settings_or_warn(path: &Path) -> LoaderSettings {
    load_settings_or_default(path).unwrap_or_else(|e| {
        tracing::warn!("[config] Error (using defaults): {e:#}");
        LoaderSettings::default()
    })
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_dot_interval_ms() -> u64 {
    DEFAULT_DOT_INTERVAL_MS
}

fn default_grace_period_ms() -> u64 {
    DEFAULT_GRACE_PERIOD_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("startupApps.json");
        std::fs::write(&path, content).unwrap();
        path
    }

    // ── load ──────────────────────────────────────────────────────────────────

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("startupApps.json");
        assert!(matches!(load(&path), Err(ConfigError::NotFound(p)) if p == path));
    }

    #[test]
    fn load_parses_valid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"[
                { "Name": "Notepad", "Path": "C:\\Windows\\notepad.exe", "HoldLoader": true },
                { "Name": "explorer", "Path": null, "HoldLoader": true }
            ]"#,
        );

        let apps = load(&path).unwrap();
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0].name, "Notepad");
        assert_eq!(apps[0].path.as_deref(), Some(r"C:\Windows\notepad.exe"));
        assert_eq!(apps[1].name, "explorer");
        assert!(apps[1].path.is_none());
    }

    #[test]
    fn load_hold_loader_defaults_to_true() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, r#"[{ "Name": "Notepad" }]"#);

        let apps = load(&path).unwrap();
        assert_eq!(apps.len(), 1);
        assert!(apps[0].hold_loader);
        assert!(apps[0].path.is_none());
    }

    #[test]
    fn load_filters_out_non_holding_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"[
                { "Name": "Steam", "HoldLoader": false },
                { "Name": "Discord", "HoldLoader": true }
            ]"#,
        );

        let apps = load(&path).unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].name, "Discord");
    }

    #[test]
    fn load_all_entries_not_holding_returns_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"[{ "Name": "Steam", "HoldLoader": false }, { "Name": "Discord", "HoldLoader": false }]"#,
        );
        assert!(load(&path).unwrap().is_empty());
    }

    #[test]
    fn load_non_array_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, r#""not an array""#);
        assert!(matches!(load(&path), Err(ConfigError::Malformed { .. })));
    }

    #[test]
    fn load_null_document_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "null");
        assert!(matches!(load(&path), Err(ConfigError::Malformed { .. })));
    }

    #[test]
    fn load_missing_name_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, r#"[{ "Path": "C:\\app.exe" }]"#);
        assert!(matches!(load(&path), Err(ConfigError::Malformed { .. })));
    }

    #[test]
    fn load_garbage_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[{ this is not json");
        let err = load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
        assert!(err.to_string().contains("startupApps.json"));
    }

    // ── ensure_config_dir ─────────────────────────────────────────────────────

    #[test]
    fn ensure_config_dir_creates_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("startupApps.json");
        ensure_config_dir(&path).unwrap();
        assert!(path.parent().unwrap().is_dir());
        assert!(!path.exists());
    }

    #[test]
    fn ensure_config_dir_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("startupApps.json");
        ensure_config_dir(&path).unwrap();
        ensure_config_dir(&path).unwrap();
    }

    // ── settings ──────────────────────────────────────────────────────────────

    #[test]
    fn settings_default_values() {
        let s = LoaderSettings::default();
        assert_eq!(s.timeout(), Duration::from_secs(15));
        assert_eq!(s.poll_interval(), Duration::from_millis(1000));
        assert_eq!(s.dot_interval(), Duration::from_millis(500));
        assert_eq!(s.grace_period(), Duration::from_millis(500));
    }

    #[test]
    fn settings_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        assert_eq!(load_settings_or_default(&path).unwrap(), LoaderSettings::default());
    }

    #[test]
    fn settings_partial_toml_uses_field_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "timeout_secs = 30\n").unwrap();

        let s = load_settings_or_default(&path).unwrap();
        assert_eq!(s.timeout_secs, 30);
        assert_eq!(s.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(s.dot_interval_ms, DEFAULT_DOT_INTERVAL_MS);
        assert_eq!(s.grace_period_ms, DEFAULT_GRACE_PERIOD_MS);
    }

    #[test]
    fn settings_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "this is not valid toml ][[[").unwrap();
        assert!(load_settings_or_default(&path).is_err());
    }

    #[test]
    fn settings_or_warn_falls_back_on_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "timeout_secs = \"soon\"\n").unwrap();
        assert_eq!(load_settings_or_warn(&path), LoaderSettings::default());
    }

    #[test]
    fn settings_or_warn_keeps_valid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "grace_period_ms = 250\n").unwrap();
        let s = load_settings_or_warn(&path);
        assert_eq!(s.grace_period(), Duration::from_millis(250));
        assert_eq!(s.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn settings_durations_are_clamped() {
        let s = LoaderSettings {
            timeout_secs: 0,
            poll_interval_ms: 1,
            dot_interval_ms: 0,
            grace_period_ms: 60_000,
        };
        assert_eq!(s.timeout(), Duration::from_secs(MIN_TIMEOUT_SECS));
        assert_eq!(s.poll_interval(), Duration::from_millis(MIN_INTERVAL_MS));
        assert_eq!(s.dot_interval(), Duration::from_millis(MIN_INTERVAL_MS));
        assert_eq!(s.grace_period(), Duration::from_millis(MAX_GRACE_PERIOD_MS));
    }
}
