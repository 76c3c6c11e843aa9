//! System tray icon, context menu, and click routing.
//!
//! Left-click drives the show/hide/focus state machine; right-click only
//! opens the context menu and never touches window state.

use std::sync::Mutex;

use tauri::{
    image::Image,
    menu::{CheckMenuItem, Menu, MenuItem, PredefinedMenuItem},
    tray::{MouseButton, MouseButtonState, TrayIconBuilder, TrayIconEvent},
    App, AppHandle, Manager, Monitor, Position, Rect, Size,
};

use crate::window;

// ── Tray state ─────────────────────────────────────────────────────────────

/// Tray icon variant selection hook. Only one variant exists today; the
/// hook point is kept for alternate icons (recording, unread, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconVariant {
    Normal,
}

/// Process-lifetime tray state, mutated only through the context menu.
pub struct TrayState {
    pub dock_visible: bool,
    pub icon_variant: IconVariant,
}

impl Default for TrayState {
    fn default() -> Self {
        Self {
            dock_visible: true,
            icon_variant: IconVariant::Normal,
        }
    }
}

// ── Geometry ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Snapshot of the geometry a positioning decision needs. Read fresh on
/// every tray click; the display arrangement can change between clicks.
#[derive(Debug, Clone, Copy)]
pub struct ScreenGeometry {
    pub tray: Bounds,
    pub window_width: f64,
    pub display: Bounds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPosition {
    pub x: i32,
    pub y: i32,
}

/// Where to place the window when revealing it from the tray.
///
/// The window sits just below the tray icon, centered under it unless the
/// window is too wide for the space right of the icon (wider than twice the
/// remaining distance), in which case it is aligned with the display's
/// right edge. The x coordinate is clamped to the display's own extent.
pub fn anchor_below_tray(geometry: &ScreenGeometry) -> WindowPosition {
    let ScreenGeometry {
        tray,
        window_width,
        display,
    } = *geometry;

    let distance_to_right_edge = display.x + display.width - (tray.x + tray.width);
    let x = if window_width > 2.0 * distance_to_right_edge {
        display.x + display.width - window_width
    } else {
        tray.x + tray.width / 2.0 - window_width / 2.0
    };

    let max_x = display.x + display.width - window_width;
    let x = x.max(display.x).min(max_x);
    let y = tray.y + tray.height;

    WindowPosition {
        x: x.round() as i32,
        y: y.round() as i32,
    }
}

// ── Click routing ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowStatus {
    pub visible: bool,
    pub focused: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickAction {
    /// No live window: create one, then position and reveal it.
    CreateAndReveal,
    /// Visible and focused: hide.
    Hide,
    /// Visible but unfocused: focus only, no repositioning.
    Focus,
    /// Hidden: position and reveal.
    Reveal,
}

/// The tray-click state machine. `None` means the handle is absent or the
/// window was destroyed.
pub fn route_click(status: Option<WindowStatus>) -> ClickAction {
    match status {
        None => ClickAction::CreateAndReveal,
        Some(w) if w.visible && w.focused => ClickAction::Hide,
        Some(w) if w.visible => ClickAction::Focus,
        Some(_) => ClickAction::Reveal,
    }
}

// ── Tray setup ─────────────────────────────────────────────────────────────

/// Build the tray icon with its context menu and register the tray state.
/// Called from the app setup hook.
pub fn init(app: &App) -> Result<(), Box<dyn std::error::Error>> {
    app.manage(Mutex::new(TrayState::default()));

    let show_in_dock = CheckMenuItem::with_id(
        app,
        "show_in_dock",
        "Show in Dock",
        true,
        true,
        None::<&str>,
    )?;
    let separator = PredefinedMenuItem::separator(app)?;
    let quit = MenuItem::with_id(app, "quit", "Quit", true, None::<&str>)?;
    let menu = Menu::with_items(app, &[&show_in_dock, &separator, &quit])?;

    let mut tray = TrayIconBuilder::new()
        .menu(&menu)
        .show_menu_on_left_click(false);
    if let Some(icon) = tray_icon(app, IconVariant::Normal) {
        tray = tray.icon(icon);
    }

    let dock_item = show_in_dock.clone();
    let _tray = tray
        .on_menu_event(move |app, event| match event.id.as_ref() {
            "show_in_dock" => {
                let visible = {
                    let state = app.state::<Mutex<TrayState>>();
                    let mut tray_state = state.lock().expect("tray state lock");
                    tray_state.dock_visible = !tray_state.dock_visible;
                    tray_state.dock_visible
                };
                let _ = dock_item.set_checked(visible);
                window::apply_dock_visibility(app, visible);
            }
            "quit" => app.exit(0),
            _ => {}
        })
        .on_tray_icon_event(|tray, event| {
            if let TrayIconEvent::Click {
                button: MouseButton::Left,
                button_state: MouseButtonState::Up,
                rect,
                ..
            } = event
            {
                if let Err(e) = handle_tray_click(tray.app_handle(), rect) {
                    log::error!("tray click handling failed: {}", e);
                }
            }
        })
        .build(app)?;

    Ok(())
}

fn tray_icon(app: &App, variant: IconVariant) -> Option<Image<'_>> {
    match variant {
        IconVariant::Normal => app.default_window_icon().cloned(),
    }
}

/// Route a left-click on the tray icon. Window liveness is checked fresh;
/// a destroyed window reads as absent and triggers re-creation.
fn handle_tray_click(app: &AppHandle, tray_rect: Rect) -> anyhow::Result<()> {
    let main = window::main_window(app);
    let status = main.as_ref().map(|w| WindowStatus {
        visible: w.is_visible().unwrap_or(false),
        focused: w.is_focused().unwrap_or(false),
    });

    match route_click(status) {
        ClickAction::Hide => {
            if let Some(w) = main {
                w.hide()?;
            }
        }
        ClickAction::Focus => {
            if let Some(w) = main {
                w.set_focus()?;
            }
        }
        ClickAction::Reveal => {
            if let Some(w) = main {
                reveal_at(app, &w, tray_rect)?;
            }
        }
        ClickAction::CreateAndReveal => {
            let w = window::create_main_window(app)?;
            reveal_at(app, &w, tray_rect)?;
        }
    }
    Ok(())
}

/// Position the window below the tray icon, then show and focus it through
/// the platform reveal strategy.
fn reveal_at(
    app: &AppHandle,
    main: &tauri::WebviewWindow,
    tray_rect: Rect,
) -> anyhow::Result<()> {
    let tray = bounds_from_rect(&tray_rect);
    let window_width = main.outer_size()?.width as f64;
    let display = display_containing(app, &tray)?;

    let position = anchor_below_tray(&ScreenGeometry {
        tray,
        window_width,
        display,
    });
    main.set_position(tauri::PhysicalPosition::new(position.x, position.y))?;
    window::RevealStrategy::for_platform().reveal(main)?;
    Ok(())
}

fn bounds_from_rect(rect: &Rect) -> Bounds {
    let (x, y) = match rect.position {
        Position::Physical(p) => (p.x as f64, p.y as f64),
        Position::Logical(p) => (p.x, p.y),
    };
    let (width, height) = match rect.size {
        Size::Physical(s) => (s.width as f64, s.height as f64),
        Size::Logical(s) => (s.width, s.height),
    };
    Bounds {
        x,
        y,
        width,
        height,
    }
}

fn display_containing(app: &AppHandle, tray: &Bounds) -> anyhow::Result<Bounds> {
    let monitor = app
        .monitor_from_point(tray.x, tray.y)?
        .or(app.primary_monitor()?);
    let monitor = monitor.ok_or_else(|| anyhow::anyhow!("no monitor available"))?;
    Ok(monitor_bounds(&monitor))
}

fn monitor_bounds(monitor: &Monitor) -> Bounds {
    let position = monitor.position();
    let size = monitor.size();
    Bounds {
        x: position.x as f64,
        y: position.y as f64,
        width: size.width as f64,
        height: size.height as f64,
    }
}
