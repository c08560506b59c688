use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tauri::{AppHandle, Manager, WebviewUrl, WebviewWindow, WebviewWindowBuilder, WindowEvent};

use super::{DestroyedCallback, NativeWindow, WindowShell};
use crate::error::WindowError;
use crate::geometry::{PhysicalPosition, PhysicalSize, Position, Rect, Size};
use crate::kind::WindowSpec;

pub const PET_WINDOW_LABEL: &str = "main";

/// Native shell backed by the running Tauri app.
#[derive(Clone)]
pub struct TauriShell {
    app: AppHandle,
}

impl TauriShell {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }

    fn monitor(&self) -> Result<tauri::Monitor, WindowError> {
        let pet_monitor = self
            .app
            .get_webview_window(PET_WINDOW_LABEL)
            .and_then(|pet| pet.current_monitor().ok().flatten());
        if let Some(monitor) = pet_monitor {
            return Ok(monitor);
        }

        self.app
            .primary_monitor()
            .map_err(|err| WindowError::MonitorUnavailable(err.to_string()))?
            .ok_or_else(|| {
                WindowError::MonitorUnavailable("primary monitor not found".to_string())
            })
    }
}

#[async_trait]
impl WindowShell for TauriShell {
    type Window = TauriWindow;

    async fn create_window(
        &self,
        label: &str,
        spec: &WindowSpec,
    ) -> Result<Self::Window, WindowError> {
        let url = WebviewUrl::App(spec.url.clone().into());
        let builder = WebviewWindowBuilder::new(&self.app, label, url)
            .title(&spec.title)
            .inner_size(spec.size.width, spec.size.height)
            .position(spec.position.x, spec.position.y)
            .resizable(spec.resizable)
            .decorations(spec.decorations)
            .always_on_top(spec.always_on_top)
            .skip_taskbar(spec.skip_taskbar)
            .focused(spec.focus);
        #[cfg(not(target_os = "macos"))]
        let builder = builder.transparent(spec.transparent);

        let window = builder.build().map_err(|err| match err {
            tauri::Error::WindowLabelAlreadyExists(_)
            | tauri::Error::WebviewLabelAlreadyExists(_) => {
                WindowError::AlreadyExists(label.to_string())
            }
            other => WindowError::Create {
                label: label.to_string(),
                message: other.to_string(),
            },
        })?;

        Ok(TauriWindow::new(window))
    }

    async fn work_area(&self) -> Result<Rect, WindowError> {
        let monitor = self.monitor()?;
        let scale = monitor.scale_factor();
        let area = monitor.work_area();
        let position = PhysicalPosition {
            x: area.position.x,
            y: area.position.y,
        }
        .to_logical(scale);
        let size = PhysicalSize {
            width: area.size.width,
            height: area.size.height,
        }
        .to_logical(scale);
        Ok(Rect::from_parts(position, size))
    }
}

#[derive(Clone)]
pub struct TauriWindow {
    window: WebviewWindow,
    label: String,
    destroyed: Arc<Mutex<Option<DestroyedCallback>>>,
}

impl TauriWindow {
    fn new(window: WebviewWindow) -> Self {
        let label = window.label().to_string();
        Self {
            window,
            label,
            destroyed: Arc::new(Mutex::new(None)),
        }
    }

    fn query_error(&self, err: tauri::Error) -> WindowError {
        WindowError::Query {
            label: self.label.clone(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl NativeWindow for TauriWindow {
    fn label(&self) -> &str {
        &self.label
    }

    async fn close(&self) -> Result<(), WindowError> {
        // `destroy` skips CloseRequested, so vetoed closes do not loop.
        self.window.destroy().map_err(|err| WindowError::Close {
            label: self.label.clone(),
            message: err.to_string(),
        })
    }

    async fn set_position(&self, position: Position) -> Result<(), WindowError> {
        self.window
            .set_position(tauri::LogicalPosition::new(position.x, position.y))
            .map_err(|err| WindowError::Position {
                label: self.label.clone(),
                message: err.to_string(),
            })
    }

    async fn set_size(&self, size: Size) -> Result<(), WindowError> {
        self.window
            .set_size(tauri::LogicalSize::new(size.width, size.height))
            .map_err(|err| WindowError::Size {
                label: self.label.clone(),
                message: err.to_string(),
            })
    }

    async fn outer_position(&self) -> Result<PhysicalPosition, WindowError> {
        let position = self
            .window
            .outer_position()
            .map_err(|err| self.query_error(err))?;
        Ok(PhysicalPosition {
            x: position.x,
            y: position.y,
        })
    }

    async fn inner_size(&self) -> Result<PhysicalSize, WindowError> {
        let size = self
            .window
            .inner_size()
            .map_err(|err| self.query_error(err))?;
        Ok(PhysicalSize {
            width: size.width,
            height: size.height,
        })
    }

    async fn scale_factor(&self) -> Result<f64, WindowError> {
        self.window
            .scale_factor()
            .map_err(|err| self.query_error(err))
    }

    fn on_destroyed(&self, callback: DestroyedCallback) {
        *self.destroyed.lock() = Some(callback);
        let destroyed = Arc::clone(&self.destroyed);
        self.window.on_window_event(move |event| {
            if !matches!(event, WindowEvent::Destroyed) {
                return;
            }
            let callback = destroyed.lock().take();
            if let Some(callback) = callback {
                callback();
            }
        });
    }
}
