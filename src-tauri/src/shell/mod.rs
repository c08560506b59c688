//! Boundary to the native window layer.

#[cfg(test)]
pub(crate) mod mock;
#[cfg(feature = "shell")]
pub mod desktop;

use async_trait::async_trait;

use crate::error::WindowError;
use crate::geometry::{PhysicalPosition, PhysicalSize, Position, Rect, Size};
use crate::kind::WindowSpec;

/// Invoked once when the native window is gone.
pub type DestroyedCallback = Box<dyn FnOnce() + Send + 'static>;

#[async_trait]
pub trait WindowShell: Send + Sync + 'static {
    type Window: NativeWindow;

    /// Resolves once the native layer acknowledged creation.
    async fn create_window(&self, label: &str, spec: &WindowSpec)
    -> Result<Self::Window, WindowError>;

    /// Usable area of the screen the pet lives on, in logical pixels.
    async fn work_area(&self) -> Result<Rect, WindowError>;
}

#[async_trait]
pub trait NativeWindow: Clone + Send + Sync + 'static {
    fn label(&self) -> &str;

    async fn close(&self) -> Result<(), WindowError>;

    async fn set_position(&self, position: Position) -> Result<(), WindowError>;

    async fn set_size(&self, size: Size) -> Result<(), WindowError>;

    async fn outer_position(&self) -> Result<PhysicalPosition, WindowError>;

    /// Client area without decorations; the size windows are created with.
    async fn inner_size(&self) -> Result<PhysicalSize, WindowError>;

    async fn scale_factor(&self) -> Result<f64, WindowError>;

    /// Registers the destroyed listener. Called exactly once per window.
    fn on_destroyed(&self, callback: DestroyedCallback);
}
