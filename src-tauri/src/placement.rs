//! Where overlay windows go relative to the pet.
//!
//! Every anchor-relative placement follows the same order: a primary
//! candidate, an opposite-corner secondary candidate, and only when neither
//! fits, the primary candidate clamped into the work area.

use serde::{Deserialize, Serialize};

use crate::anchor::AnchorSnapshot;
use crate::geometry::{Position, Rect, Size};
use crate::kind::WindowKind;

pub const DEFAULT_ANCHOR_OFFSET: f64 = 150.0;
pub const DEFAULT_PLACEMENT_GAP: f64 = 10.0;
/// The assistant bubble's right edge sits this far right of the pet's origin.
pub const AI_ANCHOR_INSET: f64 = 140.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementConfig {
    pub anchor_offset: f64,
    pub gap: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            anchor_offset: DEFAULT_ANCHOR_OFFSET,
            gap: DEFAULT_PLACEMENT_GAP,
        }
    }
}

pub fn choose_position(primary: Position, secondary: Position, size: Size, area: Rect) -> Position {
    if area.contains(primary, size) {
        primary
    } else if area.contains(secondary, size) {
        secondary
    } else {
        area.clamp(primary, size)
    }
}

/// Lower-right of the pet first, upper-left as the fallback.
pub fn menu_position(
    anchor: &AnchorSnapshot,
    size: Size,
    area: Rect,
    config: &PlacementConfig,
) -> Position {
    let Position { x, y } = anchor.position;
    let primary = Position::new(x + config.anchor_offset, y);
    let secondary = Position::new(x - size.width - config.gap, y - size.height - config.gap);
    choose_position(primary, secondary, size, area)
}

/// Above the pet first, below it as the fallback.
pub fn ai_assistant_position(
    anchor: &AnchorSnapshot,
    size: Size,
    area: Rect,
    config: &PlacementConfig,
) -> Position {
    let x = anchor.position.x + AI_ANCHOR_INSET - size.width;
    let primary = Position::new(x, anchor.position.y - size.height);
    let secondary = Position::new(x, anchor.rect().bottom() + config.gap);
    choose_position(primary, secondary, size, area)
}

/// Default spot for the clipboard history: right of the pet, else left of it.
pub fn beside_anchor(
    anchor: &AnchorSnapshot,
    size: Size,
    area: Rect,
    config: &PlacementConfig,
) -> Position {
    let pet = anchor.rect();
    let primary = Position::new(pet.right() + config.gap, pet.y);
    let secondary = Position::new(pet.x - size.width - config.gap, pet.y);
    choose_position(primary, secondary, size, area)
}

/// Brings persisted geometry back on screen, shrinking it if the work area
/// got smaller since it was saved.
pub fn restore_geometry(saved: Rect, area: Rect) -> Rect {
    let size = Size::new(
        saved.width.min(area.width).max(1.0),
        saved.height.min(area.height).max(1.0),
    );
    Rect::from_parts(area.clamp(saved.position(), size), size)
}

/// Anchor-relative position for kinds that follow the pet.
pub fn anchored_position(
    kind: WindowKind,
    anchor: &AnchorSnapshot,
    size: Size,
    area: Rect,
    config: &PlacementConfig,
) -> Option<Position> {
    match kind {
        WindowKind::Menu => Some(menu_position(anchor, size, area, config)),
        WindowKind::AiAssistant => Some(ai_assistant_position(anchor, size, area, config)),
        WindowKind::ClipboardHistory | WindowKind::Preferences => None,
    }
}

/// Initial position for a freshly created window without saved geometry.
pub fn initial_position(
    kind: WindowKind,
    anchor: &AnchorSnapshot,
    size: Size,
    area: Rect,
    config: &PlacementConfig,
) -> Position {
    match kind {
        WindowKind::Menu | WindowKind::AiAssistant => {
            anchored_position(kind, anchor, size, area, config)
                .unwrap_or_else(|| area.centered(size))
        }
        WindowKind::ClipboardHistory => beside_anchor(anchor, size, area, config),
        WindowKind::Preferences => area.clamp(area.centered(size), size),
    }
}
