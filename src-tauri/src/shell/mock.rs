//! In-memory shell for orchestrator tests.
//!
//! Behaves like the native layer where it matters: labels stay taken until
//! the destroy completes, and destroyed listeners fire once.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{DestroyedCallback, NativeWindow, WindowShell};
use crate::error::WindowError;
use crate::geometry::{DEFAULT_WORK_AREA, PhysicalPosition, PhysicalSize, Position, Rect, Size};
use crate::kind::WindowSpec;

pub const MOCK_TITLE_BAR_HEIGHT: f64 = 30.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create { label: String, spec: WindowSpec },
    Close(String),
    SetPosition(String, Position),
    SetSize(String, Size),
}

struct MockInner {
    calls: Mutex<Vec<Call>>,
    live: Mutex<HashMap<String, MockWindow>>,
    fail_next_create: Mutex<Option<WindowError>>,
    fail_next_close: Mutex<Option<WindowError>>,
    fail_position: Mutex<bool>,
    fail_size: Mutex<bool>,
    defer_destroy: Mutex<bool>,
    work_area: Mutex<Result<Rect, WindowError>>,
    scale_factor: Mutex<f64>,
}

#[derive(Clone)]
pub struct MockShell {
    inner: Arc<MockInner>,
}

impl MockShell {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MockInner {
                calls: Mutex::new(Vec::new()),
                live: Mutex::new(HashMap::new()),
                fail_next_create: Mutex::new(None),
                fail_next_close: Mutex::new(None),
                fail_position: Mutex::new(false),
                fail_size: Mutex::new(false),
                defer_destroy: Mutex::new(false),
                work_area: Mutex::new(Ok(DEFAULT_WORK_AREA)),
                scale_factor: Mutex::new(1.0),
            }),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.inner.calls.lock().clear();
    }

    pub fn position_calls(&self) -> Vec<(String, Position)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SetPosition(label, position) => Some((label, position)),
                _ => None,
            })
            .collect()
    }

    pub fn created_specs(&self) -> Vec<WindowSpec> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Create { spec, .. } => Some(spec),
                _ => None,
            })
            .collect()
    }

    pub fn is_live(&self, label: &str) -> bool {
        self.inner.live.lock().contains_key(label)
    }

    pub fn window(&self, label: &str) -> Option<MockWindow> {
        self.inner.live.lock().get(label).cloned()
    }

    pub fn fail_next_create(&self, err: WindowError) {
        *self.inner.fail_next_create.lock() = Some(err);
    }

    pub fn fail_next_close(&self, err: WindowError) {
        *self.inner.fail_next_close.lock() = Some(err);
    }

    pub fn fail_positioning(&self, fail: bool) {
        *self.inner.fail_position.lock() = fail;
    }

    pub fn fail_sizing(&self, fail: bool) {
        *self.inner.fail_size.lock() = fail;
    }

    /// Keep closed windows alive until `finish_destroy` is called.
    pub fn defer_destroy(&self, defer: bool) {
        *self.inner.defer_destroy.lock() = defer;
    }

    pub fn set_work_area(&self, area: Result<Rect, WindowError>) {
        *self.inner.work_area.lock() = area;
    }

    pub fn set_scale_factor(&self, scale_factor: f64) {
        *self.inner.scale_factor.lock() = scale_factor;
    }

    /// Completes a pending destroy, or simulates the user closing the window.
    pub fn finish_destroy(&self, label: &str) {
        let window = self.inner.live.lock().remove(label);
        if let Some(window) = window {
            window.fire_destroyed();
        }
    }

    fn record(&self, call: Call) {
        self.inner.calls.lock().push(call);
    }
}

#[async_trait]
impl WindowShell for MockShell {
    type Window = MockWindow;

    async fn create_window(
        &self,
        label: &str,
        spec: &WindowSpec,
    ) -> Result<Self::Window, WindowError> {
        self.record(Call::Create {
            label: label.to_string(),
            spec: spec.clone(),
        });

        if let Some(err) = self.inner.fail_next_create.lock().take() {
            return Err(err);
        }

        let mut live = self.inner.live.lock();
        if live.contains_key(label) {
            return Err(WindowError::AlreadyExists(label.to_string()));
        }

        let window = MockWindow {
            label: label.to_string(),
            shell: self.clone(),
            state: Arc::new(MockWindowState {
                position: Mutex::new(spec.position),
                size: Mutex::new(spec.size),
                decorated: spec.decorations,
                destroyed: Mutex::new(None),
            }),
        };
        live.insert(label.to_string(), window.clone());
        Ok(window)
    }

    async fn work_area(&self) -> Result<Rect, WindowError> {
        self.inner.work_area.lock().clone()
    }
}

struct MockWindowState {
    position: Mutex<Position>,
    size: Mutex<Size>,
    decorated: bool,
    destroyed: Mutex<Option<DestroyedCallback>>,
}

#[derive(Clone)]
pub struct MockWindow {
    label: String,
    shell: MockShell,
    state: Arc<MockWindowState>,
}

impl MockWindow {
    pub fn position(&self) -> Position {
        *self.state.position.lock()
    }

    /// Client area, as passed at creation and to `set_size`.
    pub fn size(&self) -> Size {
        *self.state.size.lock()
    }

    /// Frame size including the title bar of decorated windows.
    pub fn outer_size(&self) -> Size {
        let size = self.size();
        if self.state.decorated {
            Size::new(size.width, size.height + MOCK_TITLE_BAR_HEIGHT)
        } else {
            size
        }
    }

    /// Moves the window as if the user dragged it.
    pub fn user_move(&self, position: Position) {
        *self.state.position.lock() = position;
    }

    pub fn user_resize(&self, size: Size) {
        *self.state.size.lock() = size;
    }

    fn fire_destroyed(&self) {
        let callback = self.state.destroyed.lock().take();
        if let Some(callback) = callback {
            callback();
        }
    }
}

#[async_trait]
impl NativeWindow for MockWindow {
    fn label(&self) -> &str {
        &self.label
    }

    async fn close(&self) -> Result<(), WindowError> {
        self.shell.record(Call::Close(self.label.clone()));
        if let Some(err) = self.shell.inner.fail_next_close.lock().take() {
            return Err(err);
        }
        if !*self.shell.inner.defer_destroy.lock() {
            self.shell.finish_destroy(&self.label);
        }
        Ok(())
    }

    async fn set_position(&self, position: Position) -> Result<(), WindowError> {
        self.shell
            .record(Call::SetPosition(self.label.clone(), position));
        if *self.shell.inner.fail_position.lock() {
            return Err(WindowError::Position {
                label: self.label.clone(),
                message: "mock positioning failure".to_string(),
            });
        }
        *self.state.position.lock() = position;
        Ok(())
    }

    async fn set_size(&self, size: Size) -> Result<(), WindowError> {
        self.shell.record(Call::SetSize(self.label.clone(), size));
        if *self.shell.inner.fail_size.lock() {
            return Err(WindowError::Size {
                label: self.label.clone(),
                message: "mock sizing failure".to_string(),
            });
        }
        *self.state.size.lock() = size;
        Ok(())
    }

    async fn outer_position(&self) -> Result<PhysicalPosition, WindowError> {
        let scale = *self.shell.inner.scale_factor.lock();
        let position = self.position();
        Ok(PhysicalPosition {
            x: (position.x * scale).round() as i32,
            y: (position.y * scale).round() as i32,
        })
    }

    async fn inner_size(&self) -> Result<PhysicalSize, WindowError> {
        let scale = *self.shell.inner.scale_factor.lock();
        let size = self.size();
        Ok(PhysicalSize {
            width: (size.width * scale).round() as u32,
            height: (size.height * scale).round() as u32,
        })
    }

    async fn scale_factor(&self) -> Result<f64, WindowError> {
        Ok(*self.shell.inner.scale_factor.lock())
    }

    fn on_destroyed(&self, callback: DestroyedCallback) {
        *self.state.destroyed.lock() = Some(callback);
    }
}
