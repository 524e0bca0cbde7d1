use std::path::{Path, PathBuf};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

use crate::wait_set::WatchedApp;

/// One live OS process as seen by a single presence check.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessInfo {
    pub name: String,
    /// `None` when the executable path could not be resolved (access denied,
    /// protected process, or the process exited mid-query).
    pub exe: Option<PathBuf>,
}

impl ProcessInfo {
    pub fn new(name: impl Into<String>, exe: Option<impl Into<PathBuf>>) -> Self {
        Self {
            name: name.into(),
            exe: exe.map(Into::into),
        }
    }
}

/// Source of point-in-time process listings.
pub trait ProcessSnapshotProvider {
    /// Returns a fresh snapshot. Never cached across calls.
    fn processes(&mut self) -> Vec<ProcessInfo>;
}

/// [`ProcessSnapshotProvider`] backed by `sysinfo`.
pub struct SysinfoProvider {
    sys: System,
}

impl SysinfoProvider {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }
}

impl ProcessSnapshotProvider for SysinfoProvider {
    fn processes(&mut self) -> Vec<ProcessInfo> {
        // Dead processes must drop out so a snapshot never reports a stale match.
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::new().with_exe(UpdateKind::OnlyIfNotSet),
        );

        let mut unresolved = 0usize;
        let snapshot: Vec<ProcessInfo> = self
            .sys
            .processes()
            .values()
            .map(|p| {
                let exe = p.exe().filter(|e| !e.as_os_str().is_empty());
                if exe.is_none() {
                    unresolved += 1;
                    tracing::trace!(pid = %p.pid(), "[monitor] Executable path unavailable");
                }
                let short = p.name().to_string_lossy();
                ProcessInfo::new(full_process_name(&short, exe), exe)
            })
            .collect();

        tracing::debug!(
            processes = snapshot.len(),
            unresolved,
            "[monitor] Snapshot taken"
        );
        snapshot
    }
}

/// Linux truncates the kernel process name to 15 bytes. When the short name is
/// a prefix of the executable's file name, the file name is the real name.
fn full_process_name(short: &str, exe: Option<&Path>) -> String {
    let file_name = exe
        .and_then(Path::file_name)
        .map(|f| f.to_string_lossy().into_owned());
    match file_name {
        Some(f) if f.len() > short.len() && !short.is_empty() && f.starts_with(short) => f,
        _ => short.to_string(),
    }
}

/// Strips a trailing `.exe` so Windows image names compare equal to bare names.
fn bare_process_name(name: &str) -> &str {
    let len = name.len();
    if len > 4 && name.is_char_boundary(len - 4) && name[len - 4..].eq_ignore_ascii_case(".exe") {
        &name[..len - 4]
    } else {
        name
    }
}

fn paths_equal_ignore_case(a: &Path, b: &str) -> bool {
    a.to_string_lossy().to_lowercase() == b.to_lowercase()
}

/// Returns `true` if `app` appears in `snapshot`, either by process name or,
/// when the app has a configured path, by resolved executable path. An empty
/// name or path disables that comparison.
///
/// Processes whose path could not be resolved only take part in the name
/// comparison.
pub fn is_running(snapshot: &[ProcessInfo], app: &WatchedApp) -> bool {
    let target = app.name.to_lowercase();
    let by_name = !target.is_empty()
        && snapshot
            .iter()
            .any(|p| bare_process_name(&p.name).to_lowercase() == target);
    if by_name {
        return true;
    }

    match app.path.as_deref().filter(|p| !p.is_empty()) {
        Some(wanted) => snapshot
            .iter()
            .filter_map(|p| p.exe.as_deref())
            .any(|exe| paths_equal_ignore_case(exe, wanted)),
        None => false,
    }
}
