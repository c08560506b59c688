use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::geometry::{Position, Rect, Size};

/// Last observed logical geometry of the pet window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorSnapshot {
    pub position: Position,
    pub size: Size,
}

impl AnchorSnapshot {
    pub fn rect(&self) -> Rect {
        Rect::from_parts(self.position, self.size)
    }
}

/// Single-writer cell for the anchor geometry.
///
/// The orchestrator owns the only instance and is the only writer; placement
/// reads snapshots and `follow_anchor` subscribes to changes.
pub struct AnchorState {
    tx: watch::Sender<AnchorSnapshot>,
}

impl AnchorState {
    pub fn new(initial: AnchorSnapshot) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn snapshot(&self) -> AnchorSnapshot {
        *self.tx.borrow()
    }

    /// Stores a new position; returns false when it did not change.
    pub(crate) fn set_position(&self, position: Position) -> bool {
        self.tx.send_if_modified(|anchor| {
            if anchor.position == position {
                return false;
            }
            anchor.position = position;
            true
        })
    }

    pub(crate) fn set_size(&self, size: Size) -> bool {
        self.tx.send_if_modified(|anchor| {
            if anchor.size == size {
                return false;
            }
            anchor.size = size;
            true
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<AnchorSnapshot> {
        self.tx.subscribe()
    }
}
