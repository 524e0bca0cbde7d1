mod config;
mod event;
mod hotkey;
mod lifecycle;
mod paths;
mod process_monitor;
mod scheduler;
mod status;
mod surface;
mod wait_set;

use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::event::LoaderEvent;
use crate::lifecycle::{Controller, ExitReason};
use crate::process_monitor::SysinfoProvider;
use crate::surface::ConsoleSurface;

// Every timer, tick handler and state change runs on this one thread.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let reason = run().await;
    std::process::exit(reason.exit_code());
}

async fn run() -> ExitReason {
    // ── Paths ─────────────────────────────────────────────────────────────────
    let (config_path, settings_path, status_path) = match (
        paths::config_file_path(),
        paths::settings_file_path(),
        paths::status_file_path(),
    ) {
        (Ok(c), Ok(s), Ok(st)) => (c, s, st),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
            tracing::error!("Fatal Error: Initialization failed: {e:#}");
            return ExitReason::StartupFailed;
        }
    };

    // ── Settings ──────────────────────────────────────────────────────────────
    let settings = config::load_settings_or_warn(&settings_path);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<LoaderEvent>();

    // ── Abort inputs ──────────────────────────────────────────────────────────
    let hotkey_handle = match hotkey::start(event_tx.clone()) {
        Ok(h) => Some(h),
        Err(e) => {
            tracing::warn!("[hotkey] Abort keys unavailable: {e:#}");
            None
        }
    };
    {
        let tx = event_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(LoaderEvent::Abort);
            }
        });
    }

    tracing::info!("holdscreen v{} started", env!("CARGO_PKG_VERSION"));

    // ── Control loop ──────────────────────────────────────────────────────────
    let mut controller = Controller::new(
        config_path,
        settings,
        SysinfoProvider::new(),
        ConsoleSurface::new(Some(status_path)),
        event_tx,
    );
    let reason = controller.run(&mut event_rx).await;
    tracing::info!(?reason, "Loader finished");

    if let Some(h) = hotkey_handle {
        h.stop();
    }
    reason
}
