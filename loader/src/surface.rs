/// The presentation side of the loader.
///
/// The controller only pushes text and signals here; how they are drawn is up
/// to the implementation. [`ConsoleSurface`] prints to the terminal and mirrors
/// everything into `status.toml` for an external splash window.
use std::path::PathBuf;

use crate::status::{self, AppEntry, LoaderState, LoaderStatus};
use crate::wait_set::WatchedApp;

pub trait PresentationSurface {
    /// Replaces the status line (progress text or a terminal message).
    fn show_status(&mut self, text: &str, progress_percent: u8);
    /// The pending/done list changed.
    fn refresh_apps(&mut self, apps: &[WatchedApp]);
    /// A startup failure the user must see before the loader exits.
    fn show_fatal(&mut self, title: &str, message: &str);
    /// The controller entered `state`.
    fn state_changed(&mut self, state: LoaderState);
    /// Exit visuals are over; tear the surface down.
    fn close(&mut self);
}

pub struct ConsoleSurface {
    status_path: Option<PathBuf>,
    status: LoaderStatus,
    last_line: String,
}

impl ConsoleSurface {
    /// `status_path` of `None` disables the status file.
    pub fn new(status_path: Option<PathBuf>) -> Self {
        Self {
            status_path,
            status: LoaderStatus::new(),
            last_line: String::new(),
        }
    }

    fn flush(&mut self) {
        if let Some(path) = &self.status_path {
            self.status.updated_at = chrono::Local::now().to_rfc3339();
            status::write_status(path, &self.status);
        }
    }
}

impl PresentationSurface for ConsoleSurface {
    fn show_status(&mut self, text: &str, progress_percent: u8) {
        if text != self.last_line {
            println!("{text}");
            self.last_line = text.to_string();
        }
        self.status.status_text = text.to_string();
        self.status.progress_percent = progress_percent;
        self.flush();
    }

    fn refresh_apps(&mut self, apps: &[WatchedApp]) {
        for app in apps {
            println!("  {}  {}", app.name, app.status_label());
        }
        self.status.apps = apps.iter().map(AppEntry::from).collect();
        self.flush();
    }

    fn show_fatal(&mut self, title: &str, message: &str) {
        eprintln!("{title}: {message}");
        self.status.error = Some(format!("{title}: {message}"));
        self.flush();
    }

    fn state_changed(&mut self, state: LoaderState) {
        self.status.state = state;
        self.flush();
    }

    fn close(&mut self) {
        tracing::debug!("[status] Surface closed");
        self.status.state = LoaderState::Terminated;
        self.flush();
    }
}
