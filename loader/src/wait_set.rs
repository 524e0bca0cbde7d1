use crate::config::{ApplicationDescriptor, ConfigError};
use crate::process_monitor::{self, ProcessInfo};

/// Runtime state of one application the loader is waiting for.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchedApp {
    pub name: String,
    pub path: Option<String>,
    initialized: bool,
}

impl WatchedApp {
    pub fn new(name: impl Into<String>, path: Option<String>) -> Self {
        Self {
            name: name.into(),
            path,
            initialized: false,
        }
    }

    /// `true` once the app has been seen running. Never reverts.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Label shown next to the app name in the status list.
    pub fn status_label(&self) -> &'static str {
        if self.initialized {
            "✅ Done"
        } else {
            "⌛ Initializing..."
        }
    }
}

/// Derived counts, computed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSetStatus {
    pub completed: usize,
    pub total: usize,
    pub all_done: bool,
}

/// The fixed, non-empty set of applications that gate the loader's exit.
#[derive(Debug)]
pub struct WaitSet {
    apps: Vec<WatchedApp>,
}

impl WaitSet {
    /// Builds the wait-set from the descriptors returned by [`crate::config::load`],
    /// which already holds only `HoldLoader` entries. An empty list is an error.
    pub fn from_descriptors(descriptors: &[ApplicationDescriptor]) -> Result<Self, ConfigError> {
        let apps: Vec<WatchedApp> = descriptors
            .iter()
            .map(|d| WatchedApp::new(d.name.clone(), d.path.clone()))
            .collect();
        if apps.is_empty() {
            return Err(ConfigError::EmptyWaitSet);
        }
        Ok(Self { apps })
    }

    /// Checks every still-pending app against `snapshot` and marks the ones
    /// found running. Returns `true` if at least one app changed state.
    pub fn update(&mut self, snapshot: &[ProcessInfo]) -> bool {
        let mut changed = false;
        for app in self.apps.iter_mut().filter(|a| !a.initialized) {
            if process_monitor::is_running(snapshot, app) {
                tracing::info!(app = %app.name, "[monitor] Detected");
                app.initialized = true;
                changed = true;
            }
        }
        changed
    }

    pub fn all_done(&self) -> bool {
        self.apps.iter().all(|a| a.initialized)
    }

    /// `floor(100 * initialized / total)`.
    pub fn progress_percent(&self) -> u8 {
        let status = self.status();
        (status.completed * 100 / status.total) as u8
    }

    pub fn status(&self) -> WaitSetStatus {
        let completed = self.apps.iter().filter(|a| a.initialized).count();
        WaitSetStatus {
            completed,
            total: self.apps.len(),
            all_done: completed == self.apps.len(),
        }
    }

    pub fn apps(&self) -> &[WatchedApp] {
        &self.apps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str) -> ApplicationDescriptor {
        ApplicationDescriptor {
            name: name.to_string(),
            path: None,
            hold_loader: true,
        }
    }

    fn running(names: &[&str]) -> Vec<ProcessInfo> {
        names
            .iter()
            .map(|n| ProcessInfo::new(*n, None::<std::path::PathBuf>))
            .collect()
    }

    // ── construction ──────────────────────────────────────────────────────────

    #[test]
    fn from_descriptors_builds_one_pending_app_per_descriptor() {
        let set = WaitSet::from_descriptors(&[descriptor("A"), descriptor("B")]).unwrap();
        assert_eq!(set.apps().len(), 2);
        assert_eq!(set.apps()[0].name, "A");
        assert_eq!(set.apps()[1].name, "B");
        assert!(set.apps().iter().all(|a| !a.is_initialized()));
    }

    #[test]
    fn from_descriptors_empty_is_error() {
        assert!(matches!(
            WaitSet::from_descriptors(&[]),
            Err(ConfigError::EmptyWaitSet)
        ));
    }

    // ── update ────────────────────────────────────────────────────────────────

    #[test]
    fn single_app_done_after_one_update() {
        let mut set = WaitSet::from_descriptors(&[descriptor("Notepad")]).unwrap();
        assert!(set.update(&running(&["Notepad"])));
        assert!(set.all_done());
        assert_eq!(set.progress_percent(), 100);
    }

    #[test]
    fn two_apps_one_matched_is_half_done() {
        let mut set =
            WaitSet::from_descriptors(&[descriptor("A"), descriptor("B")]).unwrap();
        assert!(set.update(&running(&["A", "unrelated"])));
        assert_eq!(set.progress_percent(), 50);
        assert!(!set.all_done());
        assert_eq!(
            set.status(),
            WaitSetStatus { completed: 1, total: 2, all_done: false }
        );
    }

    #[test]
    fn update_without_new_matches_reports_no_change() {
        let mut set =
            WaitSet::from_descriptors(&[descriptor("A"), descriptor("B")]).unwrap();
        assert!(set.update(&running(&["A"])));
        assert!(!set.update(&running(&["A"])));
        assert!(!set.update(&running(&[])));
    }

    #[test]
    fn initialized_never_reverts() {
        let mut set =
            WaitSet::from_descriptors(&[descriptor("A"), descriptor("B")]).unwrap();
        let snapshots = [
            running(&["A"]),
            running(&[]),
            running(&["B"]),
            running(&[]),
            running(&["unrelated"]),
        ];
        let mut seen = vec![false; 2];
        for snapshot in &snapshots {
            set.update(snapshot);
            for (i, app) in set.apps().iter().enumerate() {
                if seen[i] {
                    assert!(app.is_initialized(), "{} reverted", app.name);
                }
                seen[i] = app.is_initialized();
            }
        }
        assert!(set.all_done());
    }

    // ── progress ──────────────────────────────────────────────────────────────

    #[test]
    fn progress_floors_and_is_100_only_when_done() {
        let mut set = WaitSet::from_descriptors(&[
            descriptor("A"),
            descriptor("B"),
            descriptor("C"),
        ])
        .unwrap();
        assert_eq!(set.progress_percent(), 0);

        set.update(&running(&["A"]));
        assert_eq!(set.progress_percent(), 33);
        assert!(!set.all_done());

        set.update(&running(&["B"]));
        assert_eq!(set.progress_percent(), 66);
        assert!(!set.all_done());

        set.update(&running(&["C"]));
        assert_eq!(set.progress_percent(), 100);
        assert!(set.all_done());
    }

    #[test]
    fn status_label_reflects_state() {
        let mut set = WaitSet::from_descriptors(&[descriptor("A")]).unwrap();
        assert_eq!(set.apps()[0].status_label(), "⌛ Initializing...");
        set.update(&running(&["a"]));
        assert_eq!(set.apps()[0].status_label(), "✅ Done");
    }
}
