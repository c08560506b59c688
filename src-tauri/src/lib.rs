pub mod anchor;
pub mod config;
pub mod drag;
pub mod error;
pub mod geometry;
pub mod kind;
pub mod orchestrator;
pub mod placement;
pub mod registry;
pub mod shell;
pub mod store;

#[cfg(feature = "shell")]
mod commands;
#[cfg(feature = "shell")]
mod state;

use error::AppError;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info";

/// Honours `RUST_LOG` when set, otherwise logs at info.
pub fn init_logging() -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .map_err(|err| AppError::LoggingInit(err.to_string()))?;

    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| AppError::LoggingInit(err.to_string()))
}

#[cfg(feature = "shell")]
pub use app::run;

#[cfg(feature = "shell")]
mod app {
    use std::error::Error;
    use std::sync::Arc;

    use tauri::menu::{Menu, MenuItem};
    use tauri::tray::TrayIconBuilder;
    use tauri::{AppHandle, Emitter, Manager, RunEvent, WindowEvent};
    use tokio::sync::broadcast;
    use tracing::{error, info, warn};

    use crate::commands;
    use crate::config::{self, WindowSettings};
    use crate::error::AppError;
    use crate::init_logging;
    use crate::kind::WindowKind;
    use crate::orchestrator::{
        CloseDecision, LifecycleEvent, ToggleOptions, WindowOrchestrator,
    };
    use crate::shell::desktop::{PET_WINDOW_LABEL, TauriShell};
    use crate::state::AppState;
    use crate::store::{GeometryStore, JsonFileStore, WINDOW_STATE_FILE};

    const MENU_ID_TOGGLE_PET: &str = "toggle_pet";
    const MENU_ID_CLIPBOARD: &str = "open_clipboard";
    const MENU_ID_PREFERENCES: &str = "open_preferences";
    const MENU_ID_QUIT: &str = "quit";
    const EVENT_WINDOW_OPENED: &str = "window-opened";
    const EVENT_WINDOW_CLOSED: &str = "window-closed";

    type SetupResult<T> = Result<T, Box<dyn Error>>;

    fn setup_tray(app: &mut tauri::App) -> SetupResult<()> {
        let toggle_pet_item =
            MenuItem::with_id(app, MENU_ID_TOGGLE_PET, "Show/Hide Pet", true, None::<&str>)?;
        let clipboard_item = MenuItem::with_id(
            app,
            MENU_ID_CLIPBOARD,
            "Clipboard History",
            true,
            None::<&str>,
        )?;
        let preferences_item =
            MenuItem::with_id(app, MENU_ID_PREFERENCES, "Preferences", true, None::<&str>)?;
        let quit_item = MenuItem::with_id(app, MENU_ID_QUIT, "Quit", true, None::<&str>)?;
        let menu = Menu::with_items(
            app,
            &[&toggle_pet_item, &clipboard_item, &preferences_item, &quit_item],
        )?;

        TrayIconBuilder::new()
            .icon(tauri::include_image!("./icons/icon.png"))
            .menu(&menu)
            .show_menu_on_left_click(true)
            .on_menu_event(|app_handle, event| match event.id().as_ref() {
                MENU_ID_TOGGLE_PET => toggle_pet_visibility(app_handle),
                MENU_ID_CLIPBOARD => spawn_toggle(app_handle, WindowKind::ClipboardHistory),
                MENU_ID_PREFERENCES => spawn_toggle(app_handle, WindowKind::Preferences),
                MENU_ID_QUIT => {
                    let app_handle = app_handle.clone();
                    tauri::async_runtime::spawn(async move {
                        let orchestrator = app_handle.state::<AppState>().orchestrator();
                        orchestrator.close_all().await;
                        app_handle.exit(0);
                    });
                }
                _ => {}
            })
            .build(app)?;

        Ok(())
    }

    #[cfg(desktop)]
    fn setup_global_shortcut(app: &mut tauri::App) -> SetupResult<()> {
        use tauri_plugin_global_shortcut::ShortcutState;

        app.handle().plugin(
            tauri_plugin_global_shortcut::Builder::new()
                .with_handler(|app_handle, _, event| {
                    if matches!(event.state, ShortcutState::Pressed) {
                        spawn_toggle(app_handle, WindowKind::ClipboardHistory);
                    }
                })
                .build(),
        )?;

        let runtime = app.state::<AppState>().runtime();
        let configured_hotkey = runtime.current_hotkey.lock().clone();
        match commands::register_history_hotkey(app.handle(), &configured_hotkey) {
            Some(hotkey) => *runtime.current_hotkey.lock() = hotkey,
            None => {
                warn!("no history hotkey available; clipboard history stays reachable from the tray");
                runtime.current_hotkey.lock().clear();
            }
        }
        Ok(())
    }

    #[cfg(not(desktop))]
    fn setup_global_shortcut(_app: &mut tauri::App) -> SetupResult<()> {
        Ok(())
    }

    fn setup_app(app: &mut tauri::App) -> SetupResult<()> {
        let config_dir = app
            .path()
            .app_config_dir()
            .map_err(|err| AppError::Runtime(format!("config directory unavailable: {err}")))?;

        let config_path = config::config_path(&config_dir);
        let settings = match config::load_settings(&config_path) {
            Ok(settings) => settings,
            Err(err) => {
                warn!("{}", AppError::Settings(err));
                WindowSettings::default()
            }
        };

        let state_path = config_dir.join(WINDOW_STATE_FILE);
        let store: Arc<dyn GeometryStore> = match JsonFileStore::open(&state_path) {
            Ok(store) => Arc::new(store),
            Err(err) => {
                warn!("starting with empty window state: {err}");
                Arc::new(JsonFileStore::empty(&state_path))
            }
        };

        commands::apply_pet_geometry(app.handle(), &settings);

        let orchestrator = Arc::new(WindowOrchestrator::new(
            TauriShell::new(app.handle().clone()),
            settings.anchor(),
            store,
            settings.orchestrator_options(),
        ));
        spawn_lifecycle_forwarder(app.handle().clone(), orchestrator.subscribe());
        spawn_anchor_follower(Arc::clone(&orchestrator));

        app.manage(AppState::new(orchestrator, settings, config_path));

        setup_tray(app)?;
        setup_global_shortcut(app)?;
        Ok(())
    }

    fn spawn_toggle(app_handle: &AppHandle, kind: WindowKind) {
        let orchestrator = app_handle.state::<AppState>().orchestrator();
        tauri::async_runtime::spawn(async move {
            if let Err(err) = orchestrator.toggle(kind, ToggleOptions::default()).await {
                error!(kind = kind.id(), "toggle failed: {err}");
            }
        });
    }

    fn toggle_pet_visibility(app_handle: &AppHandle) {
        let Some(pet) = app_handle.get_webview_window(PET_WINDOW_LABEL) else {
            warn!("pet window not found");
            return;
        };
        let result = match pet.is_visible() {
            Ok(true) => pet.hide(),
            Ok(false) => pet.show(),
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            warn!("failed to toggle pet visibility: {err}");
        }
    }

    fn spawn_lifecycle_forwarder(
        app_handle: AppHandle,
        mut events: broadcast::Receiver<LifecycleEvent>,
    ) {
        tauri::async_runtime::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(LifecycleEvent::Opened { kind }) => {
                        emit_kind_event(&app_handle, EVENT_WINDOW_OPENED, kind);
                    }
                    Ok(LifecycleEvent::Closed { kind }) => {
                        emit_kind_event(&app_handle, EVENT_WINDOW_CLOSED, kind);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("lifecycle forwarder lagged, skipped {skipped} events");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        warn!("lifecycle event channel closed");
                        break;
                    }
                }
            }
        });
    }

    fn spawn_anchor_follower(orchestrator: Arc<WindowOrchestrator<TauriShell>>) {
        tauri::async_runtime::spawn(async move {
            orchestrator.follow_anchor().await;
        });
    }

    fn emit_kind_event(app_handle: &AppHandle, event_name: &str, kind: WindowKind) {
        if let Err(err) = app_handle.emit(event_name, kind) {
            warn!(event_name = event_name, "failed to emit event: {err}");
        }
    }

    fn handle_run_event(app_handle: &AppHandle, event: RunEvent) {
        match event {
            RunEvent::WindowEvent {
                label,
                event: WindowEvent::Focused(false),
                ..
            } => {
                let Some(kind) = WindowKind::from_id(&label) else {
                    return;
                };
                let orchestrator = app_handle.state::<AppState>().orchestrator();
                tauri::async_runtime::spawn(async move {
                    orchestrator.handle_focus_lost(kind).await;
                });
            }
            RunEvent::WindowEvent {
                label,
                event: WindowEvent::CloseRequested { api, .. },
                ..
            } => {
                if label == PET_WINDOW_LABEL {
                    api.prevent_close();
                    toggle_pet_visibility(app_handle);
                    info!("pet window hidden to tray");
                    return;
                }

                let Some(kind) = WindowKind::from_id(&label) else {
                    return;
                };
                let orchestrator = app_handle.state::<AppState>().orchestrator();
                if orchestrator.handle_close_requested(kind) == CloseDecision::Veto {
                    api.prevent_close();
                    tauri::async_runtime::spawn(async move {
                        orchestrator.persist_and_close(kind).await;
                    });
                }
            }
            RunEvent::ExitRequested { code, api, .. } => {
                if code.is_none() {
                    api.prevent_exit();
                    info!("prevented system-triggered app exit; app remains in tray");
                }
            }
            _ => {}
        }
    }

    pub fn run() {
        if let Err(init_err) = init_logging() {
            eprintln!("logging bootstrap failed: {init_err}");
        }

        info!("starting petclip window orchestrator");

        let builder = tauri::Builder::default()
            .setup(setup_app)
            .invoke_handler(tauri::generate_handler![
                commands::toggle_window,
                commands::close_window,
                commands::has_window,
                commands::open_windows,
                commands::update_window_position,
                commands::update_anchor_position,
                commands::set_window_pinned,
                commands::resize_ai_assistant,
                commands::begin_pet_drag,
                commands::drag_pet,
                commands::end_pet_drag,
                commands::pet_click,
                commands::get_settings,
                commands::save_settings
            ]);

        let app = match builder.build(tauri::generate_context!()) {
            Ok(app) => app,
            Err(build_err) => {
                error!("failed to build tauri app: {build_err}");
                return;
            }
        };

        app.run(handle_run_event);
    }
}
