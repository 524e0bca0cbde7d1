/// The loader's state machine: `Starting -> Polling -> Terminating -> Terminated`.
///
/// All state lives in [`Controller`] and is only touched from [`Controller::handle`],
/// which the control loop calls for one event at a time. Timers, the keyboard
/// hook and Ctrl+C only ever send [`LoaderEvent`]s.
use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::config::{self, LoaderSettings};
use crate::event::LoaderEvent;
use crate::process_monitor::ProcessSnapshotProvider;
use crate::scheduler::Scheduler;
use crate::status::LoaderState;
use crate::surface::PresentationSurface;
use crate::wait_set::WaitSet;

pub const TIMEOUT_TEXT: &str = "Timeout - Closing...";
pub const CANCELLED_TEXT: &str = "Cancelled - Closing...";

const DOT_STEPS: usize = 4;

/// Why the loader stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Every watched application was seen running.
    Completed,
    /// The startup deadline passed with applications still pending.
    TimedOut,
    /// The user pressed Escape / Alt+F4 / Ctrl+C.
    Aborted,
    /// Config could not be loaded or nothing was configured to wait for.
    StartupFailed,
}

impl ExitReason {
    pub fn exit_code(self) -> i32 {
        match self {
            ExitReason::StartupFailed => 1,
            _ => 0,
        }
    }
}

/// Whether the control loop should keep running after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Controller<P, S> {
    state: LoaderState,
    config_path: PathBuf,
    settings: LoaderSettings,
    provider: P,
    surface: S,
    scheduler: Scheduler,
    wait_set: Option<WaitSet>,
    dot_count: usize,
    exit_reason: Option<ExitReason>,
}

impl<P: ProcessSnapshotProvider, S: PresentationSurface> Controller<P, S> {
    /// `tx` is the sending half of the channel the control loop reads from.
    pub fn new(
        config_path: PathBuf,
        settings: LoaderSettings,
        provider: P,
        surface: S,
        tx: mpsc::UnboundedSender<LoaderEvent>,
    ) -> Self {
        Self {
            state: LoaderState::Starting,
            config_path,
            settings,
            provider,
            surface,
            scheduler: Scheduler::new(tx),
            wait_set: None,
            dot_count: 0,
            exit_reason: None,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> LoaderState {
        self.state
    }

    #[cfg(test)]
    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.exit_reason
    }

    #[cfg(test)]
    pub fn wait_set(&self) -> Option<&WaitSet> {
        self.wait_set.as_ref()
    }

    #[cfg(test)]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    #[cfg(test)]
    pub fn active_timers(&self) -> usize {
        self.scheduler.active()
    }

    /// Drives the loader to completion: startup, then one event at a time
    /// until the grace period after shutdown has elapsed.
    pub async fn run(&mut self, rx: &mut mpsc::UnboundedReceiver<LoaderEvent>) -> ExitReason {
        if self.start() == Flow::Continue {
            while let Some(evt) = rx.recv().await {
                if self.handle(evt) == Flow::Exit {
                    break;
                }
            }
        }
        self.exit_reason.unwrap_or(ExitReason::Aborted)
    }

    /// Loads config, builds the wait-set and starts the three timers.
    /// On any failure the user is shown a fatal error and the loader goes
    /// straight to `Terminated` without starting a timer.
    pub fn start(&mut self) -> Flow {
        self.surface.state_changed(LoaderState::Starting);

        if let Err(e) = config::ensure_config_dir(&self.config_path) {
            self.fail_startup("Fatal Error", &format!("Initialization failed: {e:#}"));
            return Flow::Exit;
        }

        let wait_set = match config::load(&self.config_path)
            .and_then(|descriptors| WaitSet::from_descriptors(&descriptors))
        {
            Ok(ws) => ws,
            Err(e) => {
                self.fail_startup("Config Error", &format!("Failed to load config:\n{e}"));
                return Flow::Exit;
            }
        };

        tracing::info!(
            apps = wait_set.apps().len(),
            timeout_secs = self.settings.timeout().as_secs(),
            "[lifecycle] Waiting for applications"
        );
        self.surface.refresh_apps(wait_set.apps());
        self.wait_set = Some(wait_set);

        self.enter(LoaderState::Polling);
        self.scheduler
            .schedule_periodic(self.settings.dot_interval(), LoaderEvent::DotTick);
        self.scheduler
            .schedule_periodic(self.settings.poll_interval(), LoaderEvent::PollTick);
        self.scheduler
            .schedule_once(self.settings.timeout(), LoaderEvent::Timeout);
        self.render_progress();
        Flow::Continue
    }

    /// Applies one event. Ticks arriving outside `Polling` are ignored.
    pub fn handle(&mut self, event: LoaderEvent) -> Flow {
        match (self.state, event) {
            (LoaderState::Polling, LoaderEvent::DotTick) => {
                self.dot_count = (self.dot_count + 1) % DOT_STEPS;
                self.render_progress();
            }
            (LoaderState::Polling, LoaderEvent::PollTick) => self.poll(),
            (LoaderState::Polling, LoaderEvent::Timeout) => {
                if !self.all_done() {
                    tracing::warn!("[lifecycle] Timed out waiting for applications");
                    self.surface.show_status(TIMEOUT_TEXT, self.progress_percent());
                    self.begin_terminating(ExitReason::TimedOut);
                }
            }
            (LoaderState::Polling, LoaderEvent::Abort) => {
                tracing::info!("[lifecycle] Aborted by user");
                self.surface.show_status(CANCELLED_TEXT, self.progress_percent());
                self.begin_terminating(ExitReason::Aborted);
            }
            (LoaderState::Terminating, LoaderEvent::GraceElapsed) => {
                self.finish();
                return Flow::Exit;
            }
            (LoaderState::Terminated, _) => return Flow::Exit,
            (state, evt) => {
                tracing::trace!(?state, ?evt, "[lifecycle] Ignoring event");
            }
        }
        Flow::Continue
    }

    /// Enters `Terminating`: cancels every timer, then schedules the grace
    /// period. Returns `false` if shutdown had already begun.
    pub fn begin_terminating(&mut self, reason: ExitReason) -> bool {
        if self.state != LoaderState::Polling {
            return false;
        }
        let cancelled = self.scheduler.cancel_all();
        self.exit_reason = Some(reason);
        self.enter(LoaderState::Terminating);
        tracing::info!(?reason, cancelled, "[lifecycle] Closing");
        self.scheduler
            .schedule_once(self.settings.grace_period(), LoaderEvent::GraceElapsed);
        true
    }

    fn poll(&mut self) {
        let snapshot = self.provider.processes();
        let Some(wait_set) = self.wait_set.as_mut() else {
            return;
        };

        let changed = wait_set.update(&snapshot);
        if changed {
            self.surface.refresh_apps(wait_set.apps());
        }
        let status = wait_set.status();
        if changed {
            self.render_progress();
        }

        tracing::debug!(
            completed = status.completed,
            total = status.total,
            "[lifecycle] Presence check"
        );
        if status.all_done {
            self.begin_terminating(ExitReason::Completed);
        }
    }

    fn fail_startup(&mut self, title: &str, message: &str) {
        tracing::error!("[lifecycle] {title}: {message}");
        self.exit_reason = Some(ExitReason::StartupFailed);
        self.enter(LoaderState::Terminating);
        self.surface.show_fatal(title, message);
        self.finish();
    }

    fn finish(&mut self) {
        self.scheduler.cancel_all();
        self.enter(LoaderState::Terminated);
        self.surface.close();
    }

    fn enter(&mut self, state: LoaderState) {
        tracing::debug!(from = ?self.state, to = ?state, "[lifecycle] Transition");
        self.state = state;
        self.surface.state_changed(state);
    }

    fn all_done(&self) -> bool {
        self.wait_set.as_ref().map_or(false, WaitSet::all_done)
    }

    fn progress_percent(&self) -> u8 {
        self.wait_set.as_ref().map_or(0, WaitSet::progress_percent)
    }

    fn render_progress(&mut self) {
        let percent = self.progress_percent();
        let text = format!("Loading System ({percent}%){}", ".".repeat(self.dot_count));
        self.surface.show_status(&text, percent);
    }
}
