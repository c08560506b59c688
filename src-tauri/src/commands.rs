use std::time::Instant;

use tauri::{AppHandle, Manager, State};
use tracing::{info, warn};

use crate::config::{WindowSettings, validate_settings, write_settings};
use crate::geometry::{PhysicalPosition, Position};
use crate::kind::WindowKind;
use crate::orchestrator::ToggleOptions;
use crate::shell::desktop::PET_WINDOW_LABEL;
use crate::state::AppState;

#[tauri::command]
pub async fn toggle_window(
    state: State<'_, AppState>,
    kind: WindowKind,
    options: Option<ToggleOptions>,
) -> Result<bool, String> {
    let orchestrator = state.orchestrator();
    orchestrator
        .toggle(kind, options.unwrap_or_default())
        .await
        .map(|handle| handle.is_some())
        .map_err(|err| err.to_string())
}

#[tauri::command]
pub async fn close_window(state: State<'_, AppState>, kind: WindowKind) -> Result<bool, String> {
    Ok(state.orchestrator().close(kind).await)
}

#[tauri::command]
pub fn has_window(state: State<'_, AppState>, kind: WindowKind) -> bool {
    state.orchestrator().has_open(kind)
}

#[tauri::command]
pub fn open_windows(state: State<'_, AppState>) -> Vec<WindowKind> {
    state.orchestrator().open_kinds()
}

#[tauri::command]
pub async fn update_window_position(
    state: State<'_, AppState>,
    kind: WindowKind,
) -> Result<(), String> {
    state.orchestrator().update_position(kind).await;
    Ok(())
}

#[tauri::command]
pub fn update_anchor_position(state: State<'_, AppState>, x: f64, y: f64) {
    state
        .orchestrator()
        .update_anchor_position(Position::new(x, y));
}

#[tauri::command]
pub fn set_window_pinned(state: State<'_, AppState>, kind: WindowKind, pinned: bool) -> bool {
    state.orchestrator().set_pinned(kind, pinned)
}

#[tauri::command]
pub async fn resize_ai_assistant(state: State<'_, AppState>, height: f64) -> Result<bool, String> {
    Ok(state.orchestrator().resize_ai_assistant(height).await)
}

#[tauri::command]
pub fn begin_pet_drag(
    app_handle: AppHandle,
    state: State<'_, AppState>,
    pointer_x: f64,
    pointer_y: f64,
) -> Result<(), String> {
    let origin = pet_origin(&app_handle)?;
    let runtime = state.runtime();
    runtime
        .drag
        .lock()
        .begin(origin, Position::new(pointer_x, pointer_y));
    Ok(())
}

#[tauri::command]
pub fn drag_pet(
    app_handle: AppHandle,
    state: State<'_, AppState>,
    pointer_x: f64,
    pointer_y: f64,
) -> Result<(), String> {
    let runtime = state.runtime();
    let Some(position) = runtime
        .drag
        .lock()
        .move_to(Position::new(pointer_x, pointer_y), Instant::now())
    else {
        return Ok(());
    };

    let pet = app_handle
        .get_webview_window(PET_WINDOW_LABEL)
        .ok_or_else(|| "pet window not found".to_string())?;
    pet.set_position(tauri::LogicalPosition::new(position.x, position.y))
        .map_err(|err| err.to_string())?;
    runtime.orchestrator.update_anchor_position(position);
    Ok(())
}

#[tauri::command]
pub fn end_pet_drag(state: State<'_, AppState>) -> Result<(), String> {
    let runtime = state.runtime();
    runtime.drag.lock().end();

    let anchor = runtime.orchestrator.anchor();
    let snapshot = {
        let mut settings = runtime.settings.lock();
        if settings.pet_x == anchor.position.x && settings.pet_y == anchor.position.y {
            return Ok(());
        }
        settings.pet_x = anchor.position.x;
        settings.pet_y = anchor.position.y;
        settings.clone()
    };
    if let Err(err) = write_settings(&runtime.config_path, &snapshot) {
        warn!("failed to persist pet position: {err}");
    }
    Ok(())
}

/// Toggles the menu unless the click is the tail end of a drag.
#[tauri::command]
pub async fn pet_click(state: State<'_, AppState>) -> Result<bool, String> {
    let runtime = state.runtime();
    if !runtime.drag.lock().click_allowed(Instant::now()) {
        return Ok(false);
    }

    runtime
        .orchestrator
        .toggle(WindowKind::Menu, ToggleOptions::default())
        .await
        .map(|handle| handle.is_some())
        .map_err(|err| err.to_string())
}

#[tauri::command]
pub fn get_settings(state: State<'_, AppState>) -> WindowSettings {
    state.runtime().settings.lock().clone()
}

#[tauri::command]
pub fn save_settings(
    app_handle: AppHandle,
    state: State<'_, AppState>,
    settings: WindowSettings,
) -> Result<WindowSettings, String> {
    let runtime = state.runtime();
    let validated = validate_settings(settings)?;

    let previous_hotkey = runtime.current_hotkey.lock().clone();
    if previous_hotkey != validated.history_hotkey {
        rebind_history_hotkey(&app_handle, &previous_hotkey, &validated.history_hotkey)?;
        *runtime.current_hotkey.lock() = validated.history_hotkey.clone();
    }

    write_settings(&runtime.config_path, &validated)?;
    runtime
        .orchestrator
        .apply_options(validated.orchestrator_options());

    let previous_anchor = runtime.settings.lock().anchor();
    let anchor = validated.anchor();
    if previous_anchor != anchor {
        apply_pet_geometry(&app_handle, &validated);
        runtime.orchestrator.update_anchor_size(anchor.size);
        runtime.orchestrator.update_anchor_position(anchor.position);
    }
    *runtime.settings.lock() = validated.clone();

    info!("settings saved");
    Ok(validated)
}

/// Sizes and moves the pet window to the configured geometry.
pub(crate) fn apply_pet_geometry(app_handle: &AppHandle, settings: &WindowSettings) {
    let Some(pet) = app_handle.get_webview_window(PET_WINDOW_LABEL) else {
        warn!("pet window not found");
        return;
    };
    if let Err(err) = pet.set_size(tauri::LogicalSize::new(
        settings.pet_width,
        settings.pet_height,
    )) {
        warn!("failed to resize pet window: {err}");
    }
    if let Err(err) = pet.set_position(tauri::LogicalPosition::new(settings.pet_x, settings.pet_y)) {
        warn!("failed to move pet window: {err}");
    }
}

fn pet_origin(app_handle: &AppHandle) -> Result<Position, String> {
    let pet = app_handle
        .get_webview_window(PET_WINDOW_LABEL)
        .ok_or_else(|| "pet window not found".to_string())?;
    let scale_factor = pet.scale_factor().map_err(|err| err.to_string())?;
    let position = pet.outer_position().map_err(|err| err.to_string())?;
    Ok(PhysicalPosition {
        x: position.x,
        y: position.y,
    }
    .to_logical(scale_factor))
}

#[cfg(desktop)]
pub(crate) fn parse_shortcut(
    hotkey: &str,
) -> Result<tauri_plugin_global_shortcut::Shortcut, String> {
    hotkey
        .parse::<tauri_plugin_global_shortcut::Shortcut>()
        .map_err(|err| format!("invalid hotkey `{hotkey}`: {err}"))
}

/// Registers the first usable history hotkey, starting with `configured`.
/// Returns the one that took, or `None` when every candidate is taken.
#[cfg(desktop)]
pub(crate) fn register_history_hotkey(app_handle: &AppHandle, configured: &str) -> Option<String> {
    use tauri_plugin_global_shortcut::GlobalShortcutExt;

    use crate::config::hotkey_candidates;

    let manager = app_handle.global_shortcut();
    for hotkey in hotkey_candidates(configured) {
        let shortcut = match parse_shortcut(&hotkey) {
            Ok(shortcut) => shortcut,
            Err(err) => {
                warn!("{err}");
                continue;
            }
        };
        match manager.register(shortcut) {
            Ok(()) => {
                if hotkey != configured {
                    warn!("history hotkey `{configured}` unavailable; using `{hotkey}`");
                }
                return Some(hotkey);
            }
            Err(err) => warn!("failed to register history hotkey `{hotkey}`: {err}"),
        }
    }
    None
}

/// Moves the history shortcut to `next`. If `next` cannot be registered the
/// previous binding is put back and the error is returned.
#[cfg(desktop)]
fn rebind_history_hotkey(app_handle: &AppHandle, previous: &str, next: &str) -> Result<(), String> {
    use tauri_plugin_global_shortcut::GlobalShortcutExt;

    let next_shortcut = parse_shortcut(next)?;
    let manager = app_handle.global_shortcut();
    let bound = parse_shortcut(previous)
        .ok()
        .filter(|shortcut| manager.is_registered(*shortcut));

    if let Some(shortcut) = bound
        && let Err(err) = manager.unregister(shortcut)
    {
        warn!("failed to release history hotkey `{previous}`: {err}");
    }

    let Err(err) = manager.register(next_shortcut) else {
        return Ok(());
    };
    if let Some(shortcut) = bound
        && let Err(restore_err) = manager.register(shortcut)
    {
        warn!("failed to restore history hotkey `{previous}`: {restore_err}");
    }
    Err(format!("failed to register history hotkey `{next}`: {err}"))
}

#[cfg(not(desktop))]
fn rebind_history_hotkey(
    _app_handle: &AppHandle,
    _previous: &str,
    _next: &str,
) -> Result<(), String> {
    Ok(())
}
