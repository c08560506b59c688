use std::time::{Duration, Instant};

use crate::geometry::Position;

/// Clicks on the pet are ignored for this long after it was dragged.
pub const CLICK_SUPPRESS_AFTER_DRAG: Duration = Duration::from_millis(500);

/// Pointer-driven drag of the pet window.
///
/// Positions are logical; the pointer is tracked in screen coordinates and
/// only its delta since `begin` is applied to the window origin.
#[derive(Debug, Default)]
pub struct PetDrag {
    active: Option<DragStart>,
    suppress_click_until: Option<Instant>,
}

#[derive(Debug, Clone, Copy)]
struct DragStart {
    window_origin: Position,
    pointer: Position,
}

impl PetDrag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, window_origin: Position, pointer: Position) {
        self.active = Some(DragStart {
            window_origin,
            pointer,
        });
    }

    /// New window origin for the pointer, or `None` when no drag is running.
    pub fn move_to(&mut self, pointer: Position, now: Instant) -> Option<Position> {
        let start = self.active?;
        self.suppress_click_until = Some(now + CLICK_SUPPRESS_AFTER_DRAG);
        Some(
            start
                .window_origin
                .offset(pointer.x - start.pointer.x, pointer.y - start.pointer.y),
        )
    }

    pub fn end(&mut self) {
        self.active = None;
    }

    pub fn click_allowed(&self, now: Instant) -> bool {
        match self.suppress_click_until {
            Some(until) => now >= until,
            None => true,
        }
    }
}
