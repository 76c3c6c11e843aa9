//! Main window lifecycle: singleton creation, liveness lookup, dock
//! visibility, and the platform reveal strategy.

use std::time::Duration;

use tauri::{AppHandle, Manager, WebviewUrl, WebviewWindow, WebviewWindowBuilder};

pub const MAIN_WINDOW: &str = "main";

const WINDOW_WIDTH: f64 = 900.0;
const WINDOW_HEIGHT: f64 = 670.0;

/// The live main window, if one exists. A destroyed window disappears from
/// the window manager, so "absent or destroyed" is a single check.
pub fn main_window(app: &AppHandle) -> Option<WebviewWindow> {
    app.get_webview_window(MAIN_WINDOW)
}

/// Create the single application window, hidden. At most one live window
/// may exist; callers must check `main_window` first.
pub fn create_main_window(app: &AppHandle) -> tauri::Result<WebviewWindow> {
    debug_assert!(
        main_window(app).is_none(),
        "create_main_window called while a live window exists"
    );

    let builder = WebviewWindowBuilder::new(app, MAIN_WINDOW, WebviewUrl::App("index.html".into()))
        .title("Quickjot")
        .inner_size(WINDOW_WIDTH, WINDOW_HEIGHT)
        .decorations(false)
        .transparent(true)
        .skip_taskbar(true)
        .visible(false);

    // The window icon comes from the bundle everywhere except Linux.
    #[cfg(target_os = "linux")]
    let builder = match app.default_window_icon().cloned() {
        Some(icon) => builder.icon(icon)?,
        None => builder,
    };

    let main = builder.build()?;

    #[cfg(target_os = "macos")]
    if let Err(e) = window_vibrancy::apply_vibrancy(
        &main,
        window_vibrancy::NSVisualEffectMaterial::UnderWindowBackground,
        None,
        None,
    ) {
        log::warn!("failed to apply window vibrancy: {}", e);
    }

    Ok(main)
}

/// Apply the process-wide dock visibility toggle. Only macOS has a dock;
/// elsewhere this is a no-op.
pub fn apply_dock_visibility(app: &AppHandle, visible: bool) {
    #[cfg(target_os = "macos")]
    {
        use tauri::ActivationPolicy;
        let policy = if visible {
            ActivationPolicy::Regular
        } else {
            ActivationPolicy::Accessory
        };
        if let Err(e) = app.set_activation_policy(policy) {
            log::warn!("failed to update dock visibility: {}", e);
        }
    }
    #[cfg(not(target_os = "macos"))]
    {
        let _ = (app, visible);
    }
}

// ── Reveal strategy ────────────────────────────────────────────────────────

/// How to transfer visibility and focus to the window when the tray summons
/// it. The default path is timer-free; macOS gets the workspace-pinning
/// workaround so revealing the window does not switch Spaces. On that
/// platform the final focused state is eventually-consistent, not
/// immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealStrategy {
    /// Show, then focus, immediately.
    Direct,
    /// Pin to all workspaces, show without claiming focus, then unpin and
    /// focus once the delay elapses.
    WorkspacePinned { delay: Duration },
}

impl RevealStrategy {
    pub fn for_platform() -> Self {
        if cfg!(target_os = "macos") {
            RevealStrategy::WorkspacePinned {
                delay: Duration::from_millis(100),
            }
        } else {
            RevealStrategy::Direct
        }
    }

    pub fn reveal(self, main: &WebviewWindow) -> tauri::Result<()> {
        match self {
            RevealStrategy::Direct => {
                main.show()?;
                main.set_focus()
            }
            RevealStrategy::WorkspacePinned { delay } => {
                main.set_visible_on_all_workspaces(true)?;
                main.show()?;
                let main = main.clone();
                tauri::async_runtime::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let result = main
                        .set_visible_on_all_workspaces(false)
                        .and_then(|_| main.set_focus());
                    if let Err(e) = result {
                        log::warn!("deferred focus transfer failed: {}", e);
                    }
                });
                Ok(())
            }
        }
    }
}
