/// Abort keys (Escape, Alt+F4) via a low-level Windows keyboard hook (`WH_KEYBOARD_LL`).
///
/// The hook runs on a dedicated OS thread with its own Windows message pump and
/// only forwards [`LoaderEvent::Abort`] into the control loop; it never touches
/// loader state. The hook sees every key press on the desktop, so an abort is
/// forwarded only while the loader's console window is in the foreground.
/// Key presses are passed on to the next hook unchanged.
///
/// On non-Windows platforms the public API compiles but is a no-op at runtime;
/// Ctrl+C remains the abort path there.
use anyhow::Result;
use std::sync::OnceLock;
use tokio::sync::mpsc;

use crate::event::LoaderEvent;

#[cfg_attr(not(windows), allow(dead_code))]
pub const VK_ESCAPE: u32 = 0x1B;
#[cfg_attr(not(windows), allow(dead_code))]
pub const VK_F4: u32 = 0x73;

/// Channel used to forward [`LoaderEvent::Abort`] from the hook callback to the
/// control loop. Set once by [`start`].
static HOOK_TX: OnceLock<mpsc::UnboundedSender<LoaderEvent>> = OnceLock::new();

/// Returns `true` for the key combinations that close the loader early:
/// Escape on its own, or F4 while Alt is held.
#[cfg_attr(not(windows), allow(dead_code))]
pub fn is_abort_key(vk: u32, alt_down: bool) -> bool {
    match vk {
        VK_ESCAPE => true,
        VK_F4 => alt_down,
        _ => false,
    }
}

/// Returns `true` when the foreground window is the loader's own window.
/// A null own window (no console attached) is never focused.
#[cfg_attr(not(windows), allow(dead_code))]
pub fn is_loader_focused(foreground: isize, own: isize) -> bool {
    own != 0 && foreground == own
}

// ── Public handle ─────────────────────────────────────────────────────────────

/// A handle to the running keyboard hook.
pub struct HotkeyHandle {
    #[cfg(windows)]
    thread: std::thread::JoinHandle<()>,
    /// Thread ID of the message-pump thread, used to post `WM_QUIT`.
    #[cfg(windows)]
    thread_id: u32,
}

impl HotkeyHandle {
    /// Signals the hook thread to stop and blocks until it exits.
    pub fn stop(self) {
        #[cfg(windows)]
        {
            imp::post_quit(self.thread_id);
            let _ = self.thread.join();
        }
    }
}

// ── Startup ───────────────────────────────────────────────────────────────────

/// Installs the keyboard hook on a dedicated OS thread.
///
/// Abort presses are delivered with a non-blocking send; once the control
/// loop has gone away they are silently dropped.
pub fn start(tx: mpsc::UnboundedSender<LoaderEvent>) -> Result<HotkeyHandle> {
    // Silently ignore if called more than once (e.g. in test binaries).
    let _ = HOOK_TX.set(tx);

    #[cfg(windows)]
    {
        use anyhow::Context;

        let (id_tx, id_rx) = std::sync::mpsc::sync_channel::<u32>(1);
        let thread = std::thread::Builder::new()
            .name("hotkey-pump".into())
            .spawn(move || imp::run_message_pump(id_tx))
            .context("Failed to spawn hotkey thread")?;
        let thread_id = id_rx
            .recv()
            .context("Hotkey thread exited before reporting its ID")?;
        Ok(HotkeyHandle { thread, thread_id })
    }

    #[cfg(not(windows))]
    Ok(HotkeyHandle {})
}

// ── Windows implementation ────────────────────────────────────────────────────

#[cfg(windows)]
mod imp {
    use std::sync::mpsc as std_mpsc;

    use windows::Win32::Foundation::{HINSTANCE, LPARAM, LRESULT, WPARAM};
    use windows::Win32::System::Console::GetConsoleWindow;
    use windows::Win32::System::Threading::GetCurrentThreadId;
    use windows::Win32::UI::WindowsAndMessaging::{
        CallNextHookEx, DispatchMessageW, GetForegroundWindow, GetMessageW, PostThreadMessageW,
        SetWindowsHookExW,
        UnhookWindowsHookEx, KBDLLHOOKSTRUCT, LLKHF_ALTDOWN, MSG, WH_KEYBOARD_LL, WM_KEYDOWN,
        WM_QUIT, WM_SYSKEYDOWN,
    };

    use super::{is_abort_key, is_loader_focused, HOOK_TX};
    use crate::event::LoaderEvent;

    /// Low-level keyboard hook procedure. Called by Windows on every keyboard
    /// event system-wide.
    unsafe extern "system" fn keyboard_proc(
        n_code: i32,
        w_param: WPARAM,
        l_param: LPARAM,
    ) -> LRESULT {
        let msg = w_param.0 as u32;
        if n_code >= 0 && (msg == WM_KEYDOWN || msg == WM_SYSKEYDOWN) {
            let kb = &*(l_param.0 as *const KBDLLHOOKSTRUCT);
            let alt_down = kb.flags.0 & LLKHF_ALTDOWN.0 != 0;
            if is_abort_key(kb.vkCode, alt_down)
                && is_loader_focused(GetForegroundWindow().0, GetConsoleWindow().0)
            {
                if let Some(tx) = HOOK_TX.get() {
                    let _ = tx.send(LoaderEvent::Abort);
                }
            }
        }
        CallNextHookEx(None, n_code, w_param, l_param)
    }

    /// Installs `WH_KEYBOARD_LL`, runs a Windows message pump until `WM_QUIT`,
    /// then uninstalls the hook.
    ///
    /// Sends the current thread ID to `id_tx` before installing the hook so
    /// that [`super::HotkeyHandle::stop`] can always post `WM_QUIT`.
    pub fn run_message_pump(id_tx: std_mpsc::SyncSender<u32>) {
        unsafe {
            let _ = id_tx.send(GetCurrentThreadId());
            drop(id_tx);

            let hook = match SetWindowsHookExW(
                WH_KEYBOARD_LL,
                Some(keyboard_proc),
                HINSTANCE::default(),
                0,
            ) {
                Ok(hook) => hook,
                Err(e) => {
                    tracing::warn!("[hotkey] SetWindowsHookExW failed: {e}");
                    return;
                }
            };

            let mut msg = MSG::default();
            // GetMessageW: >0 = message, 0 = WM_QUIT, <0 = error.
            while GetMessageW(&mut msg, None, 0, 0).0 > 0 {
                DispatchMessageW(&msg);
            }

            let _ = UnhookWindowsHookEx(hook);
            tracing::debug!("[hotkey] Hook thread exited");
        }
    }

    /// Posts `WM_QUIT` to `thread_id`, causing its `GetMessageW` loop to exit.
    pub fn post_quit(thread_id: u32) {
        unsafe {
            let _ = PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
