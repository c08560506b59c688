//! Logical and physical coordinate types shared by placement and the shell.
//!
//! Everything the orchestrator stores or computes is in logical pixels. The
//! native layer reports outer position and size in physical pixels; those are
//! converted with the window's scale factor at the boundary.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Logical rectangle. Serialises as `{x, y, width, height}`, the shape used
/// for persisted window geometry.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_parts(position: Position, size: Size) -> Self {
        Self::new(position.x, position.y, size.width, size.height)
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// True when a window of `size` placed at `position` lies fully inside.
    pub fn contains(&self, position: Position, size: Size) -> bool {
        position.x >= self.x
            && position.y >= self.y
            && position.x + size.width <= self.right()
            && position.y + size.height <= self.bottom()
    }

    /// Clamps each coordinate independently so the window stays inside.
    /// Windows larger than the area are pinned to its top-left edge.
    pub fn clamp(&self, position: Position, size: Size) -> Position {
        Position {
            x: clamp_axis(position.x, self.x, self.width, size.width),
            y: clamp_axis(position.y, self.y, self.height, size.height),
        }
    }

    pub fn centered(&self, size: Size) -> Position {
        Position {
            x: self.x + (self.width - size.width) / 2.0,
            y: self.y + (self.height - size.height) / 2.0,
        }
    }

    fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

fn clamp_axis(value: f64, origin: f64, extent: f64, length: f64) -> f64 {
    let max = (origin + extent - length).max(origin);
    value.max(origin).min(max)
}

/// Fallback work area used until the monitor has been queried once.
pub const DEFAULT_WORK_AREA: Rect = Rect::new(0.0, 0.0, 1920.0, 1080.0);

/// Picks `area` unless it is empty, in which case the previous value wins.
pub fn usable_area(area: Rect, previous: Rect) -> Rect {
    if area.is_degenerate() { previous } else { area }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhysicalPosition {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhysicalSize {
    pub width: u32,
    pub height: u32,
}

fn normalize_scale(scale_factor: f64) -> f64 {
    if scale_factor.is_finite() && scale_factor > 0.0 {
        scale_factor
    } else {
        1.0
    }
}

impl PhysicalPosition {
    /// Rounds to whole logical pixels, matching how the pet reports its origin.
    pub fn to_logical(self, scale_factor: f64) -> Position {
        let scale = normalize_scale(scale_factor);
        Position {
            x: (f64::from(self.x) / scale).round(),
            y: (f64::from(self.y) / scale).round(),
        }
    }
}

impl PhysicalSize {
    pub fn to_logical(self, scale_factor: f64) -> Size {
        let scale = normalize_scale(scale_factor);
        Size {
            width: (f64::from(self.width) / scale).round(),
            height: (f64::from(self.height) / scale).round(),
        }
    }
}
