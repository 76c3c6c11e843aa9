use std::path::Path;
use std::sync::RwLock;

use base64::Engine;
use serde::Serialize;
use tauri::{AppHandle, Emitter, Manager, RunEvent, State, WindowEvent};
use tauri_plugin_clipboard_manager::ClipboardExt;
use tauri_plugin_opener::OpenerExt;

pub mod document;
pub mod metadata;
pub mod tray;
pub mod window;

use document::PasteOutcome;

/// Application context: the single owner of document and fetcher state,
/// managed by Tauri instead of living in process globals.
pub struct AppState {
    pub document: RwLock<document::Document>,
    pub fetcher: metadata::MetadataFetcher,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            document: RwLock::new(document::Document::default()),
            fetcher: metadata::MetadataFetcher::new(),
        }
    }
}

// Event payloads for the editor surface.

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct PreviewResolvedEvent {
    id: u64,
    metadata: metadata::LinkMetadata,
}

#[derive(Clone, Serialize)]
struct SubmitEvent {
    markdown: String,
}

// TAURI COMMANDS

#[tauri::command]
fn get_document(state: State<AppState>) -> document::Document {
    state.document.read().expect("document read lock").clone()
}

#[tauri::command]
fn set_cursor(index: usize, state: State<AppState>) {
    state
        .document
        .write()
        .expect("document write lock")
        .set_cursor(index);
}

#[tauri::command]
fn remove_block(index: usize, app: AppHandle, state: State<AppState>) -> Result<(), String> {
    {
        let mut doc = state.document.write().expect("document write lock");
        doc.remove_block(index).ok_or("block index out of range")?;
    }
    app.emit("document-changed", ()).map_err(|e| e.to_string())
}

/// Committed text content from the editor's default paste/typing path.
#[tauri::command]
fn insert_text(markdown: String, app: AppHandle, state: State<AppState>) -> Result<(), String> {
    state
        .document
        .write()
        .expect("document write lock")
        .insert_text(markdown);
    app.emit("document-changed", ()).map_err(|e| e.to_string())
}

/// Classify pasted text. Returns true when the paste was handled here
/// (embed or link preview inserted); false tells the editor to fall
/// through to its default paste behavior.
#[tauri::command]
fn paste_text(text: String, app: AppHandle, state: State<AppState>) -> Result<bool, String> {
    let outcome = {
        let mut doc = state.document.write().expect("document write lock");
        doc.paste_text(&text)
    };

    match outcome {
        PasteOutcome::YouTubeEmbed { .. } => {
            app.emit("document-changed", ()).map_err(|e| e.to_string())?;
            Ok(true)
        }
        PasteOutcome::LinkPreview { id, url } => {
            app.emit("document-changed", ()).map_err(|e| e.to_string())?;
            spawn_preview_fetch(app, id, url);
            Ok(true)
        }
        PasteOutcome::Unhandled => Ok(false),
    }
}

/// Pasted image files. Each file is read independently; insertion order
/// follows read completion, not clipboard order.
#[tauri::command]
fn paste_image_files(paths: Vec<String>, app: AppHandle) {
    for path in paths {
        spawn_image_read(app.clone(), path);
    }
}

/// Serialize the document to markdown and hand it to the external
/// consumer. Whitespace-only output is suppressed: nothing fires.
#[tauri::command]
fn submit_note(app: AppHandle, state: State<AppState>) -> Result<Option<String>, String> {
    let markdown = {
        let doc = state.document.read().expect("document read lock");
        doc.submit_markdown()
    };
    let Some(markdown) = markdown else {
        return Ok(None);
    };

    app.clipboard()
        .write_text(markdown.clone())
        .map_err(|e| e.to_string())?;
    app.emit(
        "note-submitted",
        SubmitEvent {
            markdown: markdown.clone(),
        },
    )
    .map_err(|e| e.to_string())?;
    Ok(Some(markdown))
}

/// The process-boundary metadata call: the editor surface cannot fetch
/// cross-origin, so the privileged side does it. Never errors; failures
/// come back as the fallback shape.
#[tauri::command]
async fn fetch_link_metadata(
    url: String,
    state: State<'_, AppState>,
) -> Result<metadata::LinkMetadata, String> {
    Ok(state.fetcher.fetch(&url).await)
}

/// Open a link in the system browser instead of navigating the editor.
#[tauri::command]
fn open_url(url: String, app: AppHandle) -> Result<(), String> {
    app.opener()
        .open_url(url, None::<&str>)
        .map_err(|e| e.to_string())
}

// ── Async completions ──────────────────────────────────────────────────────

fn spawn_preview_fetch(app: AppHandle, id: u64, url: String) {
    tauri::async_runtime::spawn(async move {
        let fetched = {
            let state = app.state::<AppState>();
            state.fetcher.fetch(&url).await
        };

        let resolved = {
            let state = app.state::<AppState>();
            let mut doc = state.document.write().expect("document write lock");
            doc.resolve_preview(id, fetched.clone())
        };

        if resolved {
            let event = PreviewResolvedEvent {
                id,
                metadata: fetched,
            };
            if let Err(e) = app.emit("link-preview-resolved", event) {
                log::error!("failed to emit link-preview-resolved: {}", e);
            }
        } else {
            log::debug!("link preview {} removed before metadata arrived", id);
        }
    });
}

fn spawn_image_read(app: AppHandle, path: String) {
    tauri::async_runtime::spawn(async move {
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let src = image_data_url(&path, &bytes);
                {
                    let state = app.state::<AppState>();
                    let mut doc = state.document.write().expect("document write lock");
                    doc.insert_image(src);
                }
                if let Err(e) = app.emit("document-changed", ()) {
                    log::error!("failed to emit document-changed: {}", e);
                }
            }
            Err(e) => log::warn!("failed to read pasted image {}: {}", path, e),
        }
    });
}

fn image_data_url(path: &str, bytes: &[u8]) -> String {
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let mime = match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    };
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{};base64,{}", mime, encoded)
}

/// Whether the process should survive an exit request. Closing the last
/// window raises a codeless request; only the Quit menu item (which exits
/// with an explicit code) ends the app.
fn keep_running_after(exit_code: Option<i32>) -> bool {
    exit_code.is_none()
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    env_logger::init();

    let app = tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_clipboard_manager::init())
        .setup(|app| {
            app.manage(AppState::default());
            tray::init(app)?;

            // Dock visibility defaults to shown.
            window::apply_dock_visibility(app.handle(), true);

            let main = window::create_main_window(app.handle())?;
            main.show()?;
            Ok(())
        })
        .on_window_event(|main, event| {
            if let WindowEvent::Destroyed = event {
                // The handle is gone from the window manager now; the next
                // tray click re-creates the window instead of touching a
                // stale reference.
                log::debug!("window {} destroyed", main.label());
            }
        })
        .invoke_handler(tauri::generate_handler![
            get_document,
            set_cursor,
            remove_block,
            insert_text,
            paste_text,
            paste_image_files,
            submit_note,
            fetch_link_metadata,
            open_url,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(|_app, event| {
        if let RunEvent::ExitRequested { code, api, .. } = event {
            // The tray icon stays up after the last window closes; the next
            // left-click re-creates the window.
            if keep_running_after(code) {
                api.prevent_exit();
            }
        }
    });
}
