use std::collections::HashMap;

use crate::geometry::Rect;
use crate::kind::WindowKind;

/// One live overlay window.
#[derive(Debug, Clone)]
pub struct ManagedWindow<W> {
    pub kind: WindowKind,
    pub handle: W,
    pub geometry: Rect,
    pub generation: u64,
    pub pinned: bool,
    pub close_vetoed: bool,
}

/// At most one entry per kind. Generations tell successive windows of the
/// same kind apart, so a late destroyed event cannot evict a newer window.
#[derive(Debug)]
pub struct WindowRegistry<W> {
    entries: HashMap<WindowKind, ManagedWindow<W>>,
    next_generation: u64,
}

impl<W> Default for WindowRegistry<W> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            next_generation: 1,
        }
    }
}

impl<W: Clone> WindowRegistry<W> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: WindowKind) -> Option<&ManagedWindow<W>> {
        self.entries.get(&kind)
    }

    pub fn get_mut(&mut self, kind: WindowKind) -> Option<&mut ManagedWindow<W>> {
        self.entries.get_mut(&kind)
    }

    pub fn contains(&self, kind: WindowKind) -> bool {
        self.entries.contains_key(&kind)
    }

    pub fn handle(&self, kind: WindowKind) -> Option<W> {
        self.entries.get(&kind).map(|entry| entry.handle.clone())
    }

    /// Registers a window and returns its generation. An existing entry of
    /// the same kind is replaced and handed back to the caller.
    pub fn insert(
        &mut self,
        kind: WindowKind,
        handle: W,
        geometry: Rect,
    ) -> (u64, Option<ManagedWindow<W>>) {
        let generation = self.next_generation;
        self.next_generation += 1;
        let previous = self.entries.insert(
            kind,
            ManagedWindow {
                kind,
                handle,
                geometry,
                generation,
                pinned: false,
                close_vetoed: false,
            },
        );
        (generation, previous)
    }

    /// Removes the entry only if it is still the given generation.
    pub fn remove_generation(&mut self, kind: WindowKind, generation: u64) -> bool {
        match self.entries.get(&kind) {
            Some(entry) if entry.generation == generation => {
                self.entries.remove(&kind);
                true
            }
            _ => false,
        }
    }

    /// Records new geometry if the entry is still the given generation.
    pub fn update_geometry(&mut self, kind: WindowKind, generation: u64, geometry: Rect) {
        if let Some(entry) = self.entries.get_mut(&kind) {
            if entry.generation == generation {
                entry.geometry = geometry;
            }
        }
    }

    pub fn kinds(&self) -> Vec<WindowKind> {
        WindowKind::ALL
            .into_iter()
            .filter(|kind| self.entries.contains_key(kind))
            .collect()
    }
}
