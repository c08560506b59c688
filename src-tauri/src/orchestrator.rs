//! Creation, toggling, placement and teardown of the overlay windows.
//!
//! The registry is the source of truth for which windows are open. It is only
//! touched synchronously between native awaits, and it is corrected from the
//! destroyed listener rather than trusted from call-site success.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::anchor::{AnchorSnapshot, AnchorState};
use crate::error::WindowError;
use crate::geometry::{DEFAULT_WORK_AREA, Position, Rect, Size, usable_area};
use crate::kind::{AI_HEIGHT_KEY, WindowKind};
use crate::placement::{
    PlacementConfig, ai_assistant_position, anchored_position, initial_position,
    restore_geometry,
};
use crate::registry::WindowRegistry;
use crate::shell::{NativeWindow, WindowShell};
use crate::store::{GeometryStore, load_height, load_rect, save_height, save_rect};

pub const MIN_AI_HEIGHT: f64 = 40.0;
pub const MAX_AI_HEIGHT: f64 = 800.0;
const LIFECYCLE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleOptions {
    /// Explicit geometry, bypassing saved state and placement.
    #[serde(default)]
    pub geometry: Option<Rect>,
    /// Sub-navigation target, e.g. the preferences panel to show.
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LifecycleEvent {
    Opened { kind: WindowKind },
    Closed { kind: WindowKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    Allow,
    /// Keep the window open; the shell must call `persist_and_close`.
    Veto,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrchestratorOptions {
    pub placement: PlacementConfig,
    pub close_history_on_blur: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            placement: PlacementConfig::default(),
            close_history_on_blur: true,
        }
    }
}

pub struct WindowOrchestrator<S: WindowShell> {
    shell: S,
    registry: Arc<Mutex<WindowRegistry<S::Window>>>,
    anchor: AnchorState,
    store: Arc<dyn GeometryStore>,
    work_area: Mutex<Rect>,
    placement: Mutex<PlacementConfig>,
    close_history_on_blur: AtomicBool,
    events: broadcast::Sender<LifecycleEvent>,
}

impl<S: WindowShell> WindowOrchestrator<S> {
    pub fn new(
        shell: S,
        anchor: AnchorSnapshot,
        store: Arc<dyn GeometryStore>,
        options: OrchestratorOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(LIFECYCLE_CHANNEL_CAPACITY);
        Self {
            shell,
            registry: Arc::new(Mutex::new(WindowRegistry::new())),
            anchor: AnchorState::new(anchor),
            store,
            work_area: Mutex::new(DEFAULT_WORK_AREA),
            placement: Mutex::new(options.placement),
            close_history_on_blur: AtomicBool::new(options.close_history_on_blur),
            events,
        }
    }

    pub fn apply_options(&self, options: OrchestratorOptions) {
        *self.placement.lock() = options.placement;
        self.close_history_on_blur
            .store(options.close_history_on_blur, Ordering::Relaxed);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    pub fn anchor(&self) -> AnchorSnapshot {
        self.anchor.snapshot()
    }

    pub fn has_open(&self, kind: WindowKind) -> bool {
        self.registry.lock().contains(kind)
    }

    pub fn open_kinds(&self) -> Vec<WindowKind> {
        self.registry.lock().kinds()
    }

    pub fn handle(&self, kind: WindowKind) -> Option<S::Window> {
        self.registry.lock().handle(kind)
    }

    /// Last geometry the orchestrator applied or observed for `kind`.
    pub fn geometry(&self, kind: WindowKind) -> Option<Rect> {
        self.registry.lock().get(kind).map(|entry| entry.geometry)
    }

    /// Closes `kind` if it is open, otherwise creates it.
    ///
    /// Returns the new handle, or `None` when the call closed a window, when
    /// a close attempt failed, or when creation lost the race against a
    /// previous instance that is still being destroyed.
    pub async fn toggle(
        &self,
        kind: WindowKind,
        options: ToggleOptions,
    ) -> Result<Option<S::Window>, WindowError> {
        if self.has_open(kind) {
            self.close_entry(kind).await;
            return Ok(None);
        }

        self.open(kind, options).await
    }

    async fn open(
        &self,
        kind: WindowKind,
        options: ToggleOptions,
    ) -> Result<Option<S::Window>, WindowError> {
        let area = self.refresh_work_area().await;
        let geometry = match options.geometry {
            Some(geometry) => geometry,
            None => self.initial_geometry(kind, area),
        };
        let spec = kind.spec(
            geometry.position(),
            geometry.size(),
            options.target.as_deref(),
        );

        let handle = match self.shell.create_window(kind.id(), &spec).await {
            Ok(handle) => handle,
            Err(WindowError::AlreadyExists(label)) => {
                warn!(
                    kind = kind.id(),
                    label = label.as_str(),
                    "previous window instance is still being destroyed; ignoring toggle"
                );
                return Ok(None);
            }
            Err(err) => {
                error!(kind = kind.id(), "failed to create overlay window: {err}");
                return Err(err);
            }
        };

        let (generation, previous) = self
            .registry
            .lock()
            .insert(kind, handle.clone(), geometry);
        if previous.is_some() {
            warn!(
                kind = kind.id(),
                "replaced a registry entry that was opened concurrently"
            );
        }
        self.attach_destroyed_listener(kind, &handle, generation);

        info!(
            kind = kind.id(),
            x = geometry.x,
            y = geometry.y,
            width = geometry.width,
            height = geometry.height,
            "overlay window opened"
        );
        self.publish(LifecycleEvent::Opened { kind });
        Ok(Some(handle))
    }

    fn initial_geometry(&self, kind: WindowKind, area: Rect) -> Rect {
        if let Some(key) = kind.geometry_key() {
            match load_rect(self.store.as_ref(), key) {
                Ok(Some(saved)) => return restore_geometry(saved, area),
                Ok(None) => {}
                Err(err) => warn!(kind = kind.id(), "ignoring saved window geometry: {err}"),
            }
        }

        let mut size = kind.profile().size;
        if kind == WindowKind::AiAssistant {
            match load_height(self.store.as_ref(), AI_HEIGHT_KEY) {
                Ok(Some(height)) => size.height = clamp_ai_height(height),
                Ok(None) => {}
                Err(err) => warn!("ignoring saved assistant height: {err}"),
            }
        }

        let anchor = self.anchor.snapshot();
        let placement = *self.placement.lock();
        let position = initial_position(kind, &anchor, size, area, &placement);
        Rect::from_parts(position, size)
    }

    fn attach_destroyed_listener(&self, kind: WindowKind, handle: &S::Window, generation: u64) {
        let registry = Arc::downgrade(&self.registry);
        let events = self.events.clone();
        handle.on_destroyed(Box::new(move || {
            let Some(registry) = registry.upgrade() else {
                return;
            };
            let removed = registry.lock().remove_generation(kind, generation);
            if removed {
                info!(kind = kind.id(), "overlay window destroyed");
                let _ = events.send(LifecycleEvent::Closed { kind });
            }
        }));
    }

    /// Closes `kind` if it is open. Returns whether a window was closed.
    pub async fn close(&self, kind: WindowKind) -> bool {
        self.close_entry(kind).await
    }

    pub async fn close_all(&self) {
        for kind in self.open_kinds() {
            self.close_entry(kind).await;
        }
    }

    async fn close_entry(&self, kind: WindowKind) -> bool {
        let entry = {
            let registry = self.registry.lock();
            registry
                .get(kind)
                .map(|entry| (entry.handle.clone(), entry.generation))
        };
        let Some((handle, generation)) = entry else {
            return false;
        };

        self.persist_geometry(kind, &handle, generation).await;

        if let Err(err) = handle.close().await {
            error!(kind = kind.id(), "failed to close overlay window: {err}");
            // The next close request must capture geometry again.
            if let Some(entry) = self.registry.lock().get_mut(kind)
                && entry.generation == generation
            {
                entry.close_vetoed = false;
            }
            return false;
        }

        let removed = self.registry.lock().remove_generation(kind, generation);
        if removed {
            self.publish(LifecycleEvent::Closed { kind });
        }
        info!(kind = kind.id(), "overlay window closed");
        true
    }

    async fn persist_geometry(&self, kind: WindowKind, handle: &S::Window, generation: u64) {
        let Some(key) = kind.geometry_key() else {
            return;
        };

        let geometry = match capture_geometry(handle).await {
            Ok(geometry) => geometry,
            Err(err) => {
                warn!(kind = kind.id(), "failed to read window geometry before close: {err}");
                return;
            }
        };

        self.registry
            .lock()
            .update_geometry(kind, generation, geometry);
        if let Err(err) = save_rect(self.store.as_ref(), key, geometry) {
            warn!(kind = kind.id(), "failed to persist window geometry: {err}");
        }
    }

    /// Sole writer of the anchor geometry; called from the pet's move handler.
    pub fn update_anchor_position(&self, position: Position) {
        if self.anchor.set_position(position) {
            debug!(x = position.x, y = position.y, "anchor moved");
        }
    }

    pub fn update_anchor_size(&self, size: Size) {
        if self.anchor.set_size(size) {
            debug!(width = size.width, height = size.height, "anchor resized");
        }
    }

    /// Re-places an anchor-relative window against the current anchor.
    /// Does nothing when `kind` is closed or independent.
    pub async fn update_position(&self, kind: WindowKind) {
        if !kind.follows_anchor() {
            return;
        }

        let entry = {
            let registry = self.registry.lock();
            registry
                .get(kind)
                .map(|entry| (entry.handle.clone(), entry.generation, entry.geometry))
        };
        let Some((handle, generation, geometry)) = entry else {
            return;
        };

        let area = self.refresh_work_area().await;
        let anchor = self.anchor.snapshot();
        let placement = *self.placement.lock();
        let size = geometry.size();
        let Some(position) = anchored_position(kind, &anchor, size, area, &placement) else {
            return;
        };
        if position == geometry.position() {
            return;
        }

        match handle.set_position(position).await {
            Ok(()) => self.registry.lock().update_geometry(
                kind,
                generation,
                Rect::from_parts(position, size),
            ),
            Err(err) => warn!(kind = kind.id(), "failed to follow anchor: {err}"),
        }
    }

    /// Re-follows every anchor-relative window whenever the anchor moves.
    /// Runs until the orchestrator is dropped.
    pub async fn follow_anchor(&self) {
        let mut anchor_rx = self.anchor.subscribe();
        loop {
            for kind in WindowKind::ALL {
                if kind.follows_anchor() {
                    self.update_position(kind).await;
                }
            }
            if anchor_rx.changed().await.is_err() {
                break;
            }
        }
    }

    /// Grows or shrinks the assistant bubble to fit its content, keeping it
    /// anchored, and remembers the height for next time.
    pub async fn resize_ai_assistant(&self, height: f64) -> bool {
        let kind = WindowKind::AiAssistant;
        let entry = {
            let registry = self.registry.lock();
            registry
                .get(kind)
                .map(|entry| (entry.handle.clone(), entry.generation, entry.geometry))
        };
        let Some((handle, generation, geometry)) = entry else {
            return false;
        };

        let height = clamp_ai_height(height);
        let size = Size::new(geometry.width, height);

        let mut applied = geometry;
        let resized = match handle.set_size(size).await {
            Ok(()) => {
                applied.width = size.width;
                applied.height = size.height;
                true
            }
            Err(err) => {
                warn!("failed to resize assistant window: {err}");
                false
            }
        };

        // Anchor whatever size the window actually has.
        let area = self.refresh_work_area().await;
        let anchor = self.anchor.snapshot();
        let placement = *self.placement.lock();
        let position = ai_assistant_position(&anchor, applied.size(), area, &placement);
        if position != applied.position() {
            match handle.set_position(position).await {
                Ok(()) => {
                    applied.x = position.x;
                    applied.y = position.y;
                }
                Err(err) => warn!("failed to move resized assistant window: {err}"),
            }
        }
        self.registry
            .lock()
            .update_geometry(kind, generation, applied);

        if resized
            && let Err(err) = save_height(self.store.as_ref(), AI_HEIGHT_KEY, height)
        {
            warn!("failed to persist assistant height: {err}");
        }
        true
    }

    /// Pinned windows survive focus loss. Returns whether `kind` is open.
    pub fn set_pinned(&self, kind: WindowKind, pinned: bool) -> bool {
        match self.registry.lock().get_mut(kind) {
            Some(entry) => {
                entry.pinned = pinned;
                true
            }
            None => false,
        }
    }

    /// The clipboard history dismisses itself on blur unless pinned.
    /// Returns whether the window was closed.
    pub async fn handle_focus_lost(&self, kind: WindowKind) -> bool {
        if kind != WindowKind::ClipboardHistory
            || !self.close_history_on_blur.load(Ordering::Relaxed)
        {
            return false;
        }

        let pinned = self.registry.lock().get(kind).map(|entry| entry.pinned);
        match pinned {
            Some(false) => {
                debug!(kind = kind.id(), "closing on focus loss");
                self.close_entry(kind).await
            }
            Some(true) | None => false,
        }
    }

    /// Decides on a user-initiated close. Windows with persisted geometry
    /// are held open once so their geometry can be written first.
    pub fn handle_close_requested(&self, kind: WindowKind) -> CloseDecision {
        if kind.geometry_key().is_none() {
            return CloseDecision::Allow;
        }

        let mut registry = self.registry.lock();
        match registry.get_mut(kind) {
            Some(entry) if !entry.close_vetoed => {
                entry.close_vetoed = true;
                CloseDecision::Veto
            }
            _ => CloseDecision::Allow,
        }
    }

    /// Completes a vetoed close: saves geometry, then closes the window.
    pub async fn persist_and_close(&self, kind: WindowKind) -> bool {
        self.close_entry(kind).await
    }

    async fn refresh_work_area(&self) -> Rect {
        match self.shell.work_area().await {
            Ok(area) => {
                let mut cached = self.work_area.lock();
                *cached = usable_area(area, *cached);
                *cached
            }
            Err(err) => {
                warn!("using cached work area: {err}");
                *self.work_area.lock()
            }
        }
    }

    fn publish(&self, event: LifecycleEvent) {
        // No subscribers is fine; the shell attaches its forwarder at startup.
        let _ = self.events.send(event);
    }
}

async fn capture_geometry<W: NativeWindow>(handle: &W) -> Result<Rect, WindowError> {
    let scale_factor = handle.scale_factor().await?;
    let position = handle.outer_position().await?.to_logical(scale_factor);
    let size = handle.inner_size().await?.to_logical(scale_factor);
    Ok(Rect::from_parts(position, size))
}

pub fn clamp_ai_height(height: f64) -> f64 {
    if height.is_finite() {
        height.clamp(MIN_AI_HEIGHT, MAX_AI_HEIGHT)
    } else {
        WindowKind::AiAssistant.profile().size.height
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::{
        CloseDecision, LifecycleEvent, OrchestratorOptions, ToggleOptions, WindowOrchestrator,
        clamp_ai_height,
    };
    use crate::anchor::AnchorSnapshot;
    use crate::error::WindowError;
    use crate::geometry::{Position, Rect, Size};
    use crate::kind::{AI_HEIGHT_KEY, CLIPBOARD_STATE_KEY, WindowKind};
    use crate::shell::NativeWindow;
    use crate::shell::mock::{Call, MOCK_TITLE_BAR_HEIGHT, MockShell};
    use crate::store::{MemoryStore, load_height, load_rect, save_rect};

    fn pet_at(x: f64, y: f64) -> AnchorSnapshot {
        AnchorSnapshot {
            position: Position::new(x, y),
            size: Size::new(150.0, 95.0),
        }
    }

    fn orchestrator_at(
        x: f64,
        y: f64,
    ) -> (WindowOrchestrator<MockShell>, MockShell, Arc<MemoryStore>) {
        let shell = MockShell::new();
        let store = Arc::new(MemoryStore::new());
        let orchestrator = WindowOrchestrator::new(
            shell.clone(),
            pet_at(x, y),
            store.clone(),
            OrchestratorOptions::default(),
        );
        (orchestrator, shell, store)
    }

    async fn toggle(orchestrator: &WindowOrchestrator<MockShell>, kind: WindowKind) -> bool {
        orchestrator
            .toggle(kind, ToggleOptions::default())
            .await
            .unwrap()
            .is_some()
    }

    #[tokio::test]
    async fn toggle_opens_closes_and_reopens() {
        let (orchestrator, shell, _) = orchestrator_at(100.0, 100.0);

        assert!(toggle(&orchestrator, WindowKind::Menu).await);
        assert!(orchestrator.has_open(WindowKind::Menu));
        assert_eq!(orchestrator.open_kinds(), vec![WindowKind::Menu]);

        assert!(!toggle(&orchestrator, WindowKind::Menu).await);
        assert!(!orchestrator.has_open(WindowKind::Menu));
        assert!(!shell.is_live("menu"));

        assert!(toggle(&orchestrator, WindowKind::Menu).await);
        assert!(orchestrator.has_open(WindowKind::Menu));
    }

    #[tokio::test]
    async fn never_more_than_one_window_per_kind() {
        let (orchestrator, _, _) = orchestrator_at(400.0, 400.0);
        for round in 0..7 {
            orchestrator
                .toggle(WindowKind::ClipboardHistory, ToggleOptions::default())
                .await
                .unwrap();
            orchestrator
                .toggle(WindowKind::Menu, ToggleOptions::default())
                .await
                .unwrap();
            let open = orchestrator.open_kinds();
            assert!(open.len() <= 2);
            assert_eq!(orchestrator.has_open(WindowKind::Menu), round % 2 == 0);
        }
    }

    #[tokio::test]
    async fn menu_is_created_with_profile_and_fallback_position() {
        let (orchestrator, shell, _) = orchestrator_at(1700.0, 900.0);
        toggle(&orchestrator, WindowKind::Menu).await;

        let specs = shell.created_specs();
        assert_eq!(specs.len(), 1);
        let spec = &specs[0];
        assert_eq!(spec.url, "/menu");
        assert_eq!(spec.position, Position::new(1390.0, 540.0));
        assert_eq!(spec.size, Size::new(300.0, 350.0));
        assert!(spec.always_on_top && spec.skip_taskbar && spec.focus);
        assert!(!spec.decorations);
        assert_eq!(
            orchestrator.geometry(WindowKind::Menu),
            Some(Rect::new(1390.0, 540.0, 300.0, 350.0))
        );
    }

    #[tokio::test]
    async fn primary_position_wins_when_it_fits() {
        let (orchestrator, shell, _) = orchestrator_at(10.0, 10.0);
        toggle(&orchestrator, WindowKind::Menu).await;
        assert_eq!(shell.created_specs()[0].position, Position::new(160.0, 10.0));
    }

    #[tokio::test]
    async fn already_exists_during_create_is_absorbed() {
        let (orchestrator, shell, _) = orchestrator_at(100.0, 100.0);
        shell.fail_next_create(WindowError::AlreadyExists("menu".to_string()));

        let result = orchestrator
            .toggle(WindowKind::Menu, ToggleOptions::default())
            .await;
        assert!(matches!(result, Ok(None)));
        assert!(orchestrator.open_kinds().is_empty());
    }

    #[tokio::test]
    async fn reopening_before_destroy_finishes_is_a_benign_race() {
        let (orchestrator, shell, _) = orchestrator_at(100.0, 100.0);
        shell.defer_destroy(true);

        assert!(toggle(&orchestrator, WindowKind::Menu).await);
        assert!(!toggle(&orchestrator, WindowKind::Menu).await);
        assert!(!orchestrator.has_open(WindowKind::Menu));
        assert!(shell.is_live("menu"));

        assert!(!toggle(&orchestrator, WindowKind::Menu).await);
        assert!(!orchestrator.has_open(WindowKind::Menu));

        shell.finish_destroy("menu");
        assert!(!orchestrator.has_open(WindowKind::Menu));
        assert!(toggle(&orchestrator, WindowKind::Menu).await);
        assert!(orchestrator.has_open(WindowKind::Menu));
    }

    #[tokio::test]
    async fn other_create_errors_propagate_without_registering() {
        let (orchestrator, shell, _) = orchestrator_at(100.0, 100.0);
        shell.fail_next_create(WindowError::Create {
            label: "preferences".to_string(),
            message: "webview unavailable".to_string(),
        });

        let result = orchestrator
            .toggle(WindowKind::Preferences, ToggleOptions::default())
            .await;
        assert!(matches!(result, Err(WindowError::Create { .. })));
        assert!(!orchestrator.has_open(WindowKind::Preferences));
    }

    #[tokio::test]
    async fn failed_close_keeps_entry_for_retry() {
        let (orchestrator, shell, _) = orchestrator_at(100.0, 100.0);
        toggle(&orchestrator, WindowKind::Menu).await;
        shell.fail_next_close(WindowError::Close {
            label: "menu".to_string(),
            message: "busy".to_string(),
        });

        let result = orchestrator
            .toggle(WindowKind::Menu, ToggleOptions::default())
            .await;
        assert!(matches!(result, Ok(None)));
        assert!(orchestrator.has_open(WindowKind::Menu));

        assert!(!toggle(&orchestrator, WindowKind::Menu).await);
        assert!(!orchestrator.has_open(WindowKind::Menu));
    }

    #[tokio::test]
    async fn menu_follows_anchor_by_the_same_delta() {
        let (orchestrator, shell, _) = orchestrator_at(300.0, 200.0);
        toggle(&orchestrator, WindowKind::Menu).await;
        let before = shell.window("menu").unwrap().position();

        orchestrator.update_anchor_position(Position::new(340.0, 175.0));
        orchestrator.update_position(WindowKind::Menu).await;

        let after = shell.window("menu").unwrap().position();
        assert_eq!(after, before.offset(40.0, -25.0));
        assert_eq!(orchestrator.geometry(WindowKind::Menu).unwrap().position(), after);
    }

    #[tokio::test]
    async fn follow_is_reclamped_at_the_screen_edge() {
        let (orchestrator, shell, _) = orchestrator_at(1400.0, 100.0);
        toggle(&orchestrator, WindowKind::Menu).await;
        assert_eq!(
            shell.window("menu").unwrap().position(),
            Position::new(1550.0, 100.0)
        );

        orchestrator.update_anchor_position(Position::new(1700.0, 100.0));
        orchestrator.update_position(WindowKind::Menu).await;
        assert_eq!(
            shell.window("menu").unwrap().position(),
            Position::new(1620.0, 100.0)
        );
    }

    #[tokio::test]
    async fn update_position_on_closed_window_touches_nothing() {
        let (orchestrator, shell, _) = orchestrator_at(100.0, 100.0);
        orchestrator.update_anchor_position(Position::new(500.0, 500.0));
        orchestrator.update_position(WindowKind::Menu).await;
        orchestrator.update_position(WindowKind::AiAssistant).await;
        assert!(shell.calls().is_empty());
    }

    #[tokio::test]
    async fn independent_windows_stay_put_when_anchor_moves() {
        let (orchestrator, shell, _) = orchestrator_at(100.0, 100.0);
        toggle(&orchestrator, WindowKind::ClipboardHistory).await;
        shell.clear_calls();

        orchestrator.update_anchor_position(Position::new(600.0, 300.0));
        orchestrator.update_position(WindowKind::ClipboardHistory).await;
        assert!(shell.position_calls().is_empty());
    }

    #[tokio::test]
    async fn positioning_failure_keeps_stale_geometry() {
        let (orchestrator, shell, _) = orchestrator_at(300.0, 200.0);
        toggle(&orchestrator, WindowKind::Menu).await;
        let before = orchestrator.geometry(WindowKind::Menu).unwrap();

        shell.fail_positioning(true);
        orchestrator.update_anchor_position(Position::new(320.0, 200.0));
        orchestrator.update_position(WindowKind::Menu).await;

        assert!(orchestrator.has_open(WindowKind::Menu));
        assert_eq!(orchestrator.geometry(WindowKind::Menu), Some(before));
        assert_eq!(shell.position_calls().len(), 1);
    }

    #[tokio::test]
    async fn user_closing_a_window_clears_the_registry() {
        let (orchestrator, shell, _) = orchestrator_at(100.0, 100.0);
        let mut events = orchestrator.subscribe();
        toggle(&orchestrator, WindowKind::AiAssistant).await;

        shell.finish_destroy("aiAgent");
        assert!(!orchestrator.has_open(WindowKind::AiAssistant));
        assert_eq!(
            events.recv().await.unwrap(),
            LifecycleEvent::Opened {
                kind: WindowKind::AiAssistant
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            LifecycleEvent::Closed {
                kind: WindowKind::AiAssistant
            }
        );
    }

    #[tokio::test]
    async fn toggle_close_publishes_closed_once() {
        let (orchestrator, _, _) = orchestrator_at(100.0, 100.0);
        let mut events = orchestrator.subscribe();
        toggle(&orchestrator, WindowKind::Menu).await;
        toggle(&orchestrator, WindowKind::Menu).await;

        assert!(matches!(
            events.recv().await,
            Ok(LifecycleEvent::Opened { .. })
        ));
        assert!(matches!(
            events.recv().await,
            Ok(LifecycleEvent::Closed { .. })
        ));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn clipboard_geometry_is_saved_on_close_and_restored() {
        let (orchestrator, shell, store) = orchestrator_at(100.0, 100.0);
        shell.set_scale_factor(1.5);
        toggle(&orchestrator, WindowKind::ClipboardHistory).await;

        let window = shell.window("clipboard").unwrap();
        window.user_move(Position::new(640.0, 120.0));
        window.user_resize(Size::new(420.0, 500.0));
        toggle(&orchestrator, WindowKind::ClipboardHistory).await;

        assert_eq!(
            load_rect(store.as_ref(), CLIPBOARD_STATE_KEY).unwrap(),
            Some(Rect::new(640.0, 120.0, 420.0, 500.0))
        );

        toggle(&orchestrator, WindowKind::ClipboardHistory).await;
        let spec = shell.created_specs().pop().unwrap();
        assert_eq!(spec.position, Position::new(640.0, 120.0));
        assert_eq!(spec.size, Size::new(420.0, 500.0));
    }

    #[tokio::test]
    async fn saved_geometry_off_screen_is_clamped_on_open() {
        let (orchestrator, shell, store) = orchestrator_at(100.0, 100.0);
        save_rect(
            store.as_ref(),
            CLIPBOARD_STATE_KEY,
            Rect::new(3000.0, 900.0, 400.0, 600.0),
        )
        .unwrap();

        toggle(&orchestrator, WindowKind::ClipboardHistory).await;
        let spec = shell.created_specs().pop().unwrap();
        assert_eq!(spec.position, Position::new(1520.0, 480.0));
    }

    #[tokio::test]
    async fn explicit_geometry_and_target_are_honoured() {
        let (orchestrator, shell, _) = orchestrator_at(100.0, 100.0);
        let options = ToggleOptions {
            geometry: Some(Rect::new(20.0, 30.0, 700.0, 500.0)),
            target: Some("account".to_string()),
        };
        orchestrator
            .toggle(WindowKind::Preferences, options)
            .await
            .unwrap();

        let spec = shell.created_specs().pop().unwrap();
        assert_eq!(spec.url, "/preferences?nav=account");
        assert_eq!(spec.position, Position::new(20.0, 30.0));
        assert_eq!(spec.size, Size::new(700.0, 500.0));
        assert!(spec.decorations);
    }

    #[tokio::test]
    async fn close_request_is_vetoed_once_for_persisted_windows() {
        let (orchestrator, _, store) = orchestrator_at(100.0, 100.0);
        toggle(&orchestrator, WindowKind::Preferences).await;
        toggle(&orchestrator, WindowKind::Menu).await;

        assert_eq!(
            orchestrator.handle_close_requested(WindowKind::Menu),
            CloseDecision::Allow
        );
        assert_eq!(
            orchestrator.handle_close_requested(WindowKind::Preferences),
            CloseDecision::Veto
        );
        assert_eq!(
            orchestrator.handle_close_requested(WindowKind::Preferences),
            CloseDecision::Allow
        );

        assert!(orchestrator.persist_and_close(WindowKind::Preferences).await);
        assert!(!orchestrator.has_open(WindowKind::Preferences));
        assert_eq!(
            load_rect(store.as_ref(), crate::kind::PREFERENCES_STATE_KEY).unwrap(),
            Some(Rect::new(560.0, 250.0, 800.0, 580.0))
        );
    }

    #[tokio::test]
    async fn decorated_window_keeps_its_size_across_reopens() {
        let (orchestrator, shell, store) = orchestrator_at(100.0, 100.0);
        for _ in 0..6 {
            toggle(&orchestrator, WindowKind::Preferences).await;
        }

        let specs = shell.created_specs();
        assert_eq!(specs.len(), 3);
        for spec in specs {
            assert!(spec.decorations);
            assert_eq!(spec.size, Size::new(800.0, 580.0));
        }
        assert_eq!(
            load_rect(store.as_ref(), crate::kind::PREFERENCES_STATE_KEY)
                .unwrap()
                .map(|rect| rect.size()),
            Some(Size::new(800.0, 580.0))
        );
    }

    #[tokio::test]
    async fn saved_size_excludes_the_title_bar() {
        let (orchestrator, shell, store) = orchestrator_at(100.0, 100.0);
        toggle(&orchestrator, WindowKind::Preferences).await;
        let window = shell.window("preferences").unwrap();
        assert_eq!(window.outer_size(), Size::new(800.0, 580.0 + MOCK_TITLE_BAR_HEIGHT));

        toggle(&orchestrator, WindowKind::Preferences).await;
        let saved = load_rect(store.as_ref(), crate::kind::PREFERENCES_STATE_KEY).unwrap();
        assert_eq!(saved.map(|rect| rect.height), Some(580.0));
    }

    #[tokio::test]
    async fn failed_close_rearms_the_close_veto() {
        let (orchestrator, shell, store) = orchestrator_at(100.0, 100.0);
        toggle(&orchestrator, WindowKind::Preferences).await;
        assert_eq!(
            orchestrator.handle_close_requested(WindowKind::Preferences),
            CloseDecision::Veto
        );
        shell.fail_next_close(WindowError::Close {
            label: "preferences".to_string(),
            message: "busy".to_string(),
        });
        assert!(!orchestrator.persist_and_close(WindowKind::Preferences).await);
        assert!(orchestrator.has_open(WindowKind::Preferences));

        shell
            .window("preferences")
            .unwrap()
            .user_move(Position::new(40.0, 50.0));
        assert_eq!(
            orchestrator.handle_close_requested(WindowKind::Preferences),
            CloseDecision::Veto
        );
        assert!(orchestrator.persist_and_close(WindowKind::Preferences).await);
        assert_eq!(
            load_rect(store.as_ref(), crate::kind::PREFERENCES_STATE_KEY).unwrap(),
            Some(Rect::new(40.0, 50.0, 800.0, 580.0))
        );
    }

    #[tokio::test]
    async fn anchor_size_moves_the_clipboard_default_spot() {
        let (orchestrator, shell, _) = orchestrator_at(100.0, 100.0);
        orchestrator.update_anchor_size(Size::new(200.0, 120.0));
        assert_eq!(orchestrator.anchor().size, Size::new(200.0, 120.0));

        toggle(&orchestrator, WindowKind::ClipboardHistory).await;
        let spec = shell.created_specs().pop().unwrap();
        assert_eq!(spec.position, Position::new(310.0, 100.0));
    }

    #[tokio::test]
    async fn focus_loss_closes_history_unless_pinned() {
        let (orchestrator, _, _) = orchestrator_at(100.0, 100.0);
        toggle(&orchestrator, WindowKind::ClipboardHistory).await;
        toggle(&orchestrator, WindowKind::Menu).await;

        assert!(orchestrator.set_pinned(WindowKind::ClipboardHistory, true));
        assert!(!orchestrator.handle_focus_lost(WindowKind::ClipboardHistory).await);
        assert!(orchestrator.has_open(WindowKind::ClipboardHistory));

        assert!(!orchestrator.handle_focus_lost(WindowKind::Menu).await);
        assert!(orchestrator.has_open(WindowKind::Menu));

        orchestrator.set_pinned(WindowKind::ClipboardHistory, false);
        assert!(orchestrator.handle_focus_lost(WindowKind::ClipboardHistory).await);
        assert!(!orchestrator.has_open(WindowKind::ClipboardHistory));
        assert!(!orchestrator.set_pinned(WindowKind::ClipboardHistory, true));
    }

    #[tokio::test]
    async fn focus_loss_policy_can_be_disabled() {
        let (orchestrator, _, _) = orchestrator_at(100.0, 100.0);
        orchestrator.apply_options(OrchestratorOptions {
            close_history_on_blur: false,
            ..OrchestratorOptions::default()
        });
        toggle(&orchestrator, WindowKind::ClipboardHistory).await;
        assert!(!orchestrator.handle_focus_lost(WindowKind::ClipboardHistory).await);
        assert!(orchestrator.has_open(WindowKind::ClipboardHistory));
    }

    #[tokio::test]
    async fn assistant_resize_reanchors_and_remembers_height() {
        let (orchestrator, shell, store) = orchestrator_at(1550.0, 800.0);
        assert!(!orchestrator.resize_ai_assistant(200.0).await);

        toggle(&orchestrator, WindowKind::AiAssistant).await;
        assert!(orchestrator.resize_ai_assistant(200.0).await);

        let window = shell.window("aiAgent").unwrap();
        assert_eq!(window.size(), Size::new(360.0, 200.0));
        assert_eq!(window.position(), Position::new(1330.0, 600.0));
        assert_eq!(load_height(store.as_ref(), AI_HEIGHT_KEY).unwrap(), Some(200.0));

        toggle(&orchestrator, WindowKind::AiAssistant).await;
        toggle(&orchestrator, WindowKind::AiAssistant).await;
        let spec = shell.created_specs().pop().unwrap();
        assert_eq!(spec.size, Size::new(360.0, 200.0));
        assert_eq!(spec.position, Position::new(1330.0, 600.0));
    }

    #[tokio::test]
    async fn failed_assistant_resize_keeps_position_for_the_old_size() {
        let (orchestrator, shell, store) = orchestrator_at(1550.0, 800.0);
        toggle(&orchestrator, WindowKind::AiAssistant).await;
        shell.fail_sizing(true);
        shell.clear_calls();

        assert!(orchestrator.resize_ai_assistant(200.0).await);

        let window = shell.window("aiAgent").unwrap();
        assert_eq!(window.size(), Size::new(360.0, 70.0));
        assert_eq!(window.position(), Position::new(1330.0, 730.0));
        assert!(shell.position_calls().is_empty());
        assert_eq!(
            orchestrator.geometry(WindowKind::AiAssistant),
            Some(Rect::new(1330.0, 730.0, 360.0, 70.0))
        );
        assert_eq!(load_height(store.as_ref(), AI_HEIGHT_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn work_area_failure_falls_back_to_cached_area() {
        let (orchestrator, shell, _) = orchestrator_at(100.0, 100.0);
        shell.set_work_area(Ok(Rect::new(0.0, 0.0, 1280.0, 720.0)));
        toggle(&orchestrator, WindowKind::Menu).await;
        toggle(&orchestrator, WindowKind::Menu).await;

        shell.set_work_area(Err(WindowError::MonitorUnavailable("gone".to_string())));
        orchestrator.update_anchor_position(Position::new(1100.0, 300.0));
        toggle(&orchestrator, WindowKind::Menu).await;

        // Both candidates overflow the cached 1280x720 area; primary is clamped.
        let spec = shell.created_specs().pop().unwrap();
        assert_eq!(spec.position, Position::new(980.0, 300.0));
    }

    #[tokio::test]
    async fn follow_anchor_task_moves_anchored_windows() {
        let (orchestrator, shell, _) = orchestrator_at(300.0, 200.0);
        let orchestrator = Arc::new(orchestrator);
        toggle(&orchestrator, WindowKind::Menu).await;

        let follower = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.follow_anchor().await })
        };
        tokio::task::yield_now().await;
        orchestrator.update_anchor_position(Position::new(310.0, 220.0));

        let expected = Position::new(460.0, 220.0);
        let moved = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if shell.window("menu").map(|window| window.position()) == Some(expected) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        follower.abort();
        assert!(moved.is_ok());
    }

    #[tokio::test]
    async fn close_all_closes_every_open_window() {
        let (orchestrator, shell, _) = orchestrator_at(100.0, 100.0);
        for kind in WindowKind::ALL {
            toggle(&orchestrator, kind).await;
        }
        assert_eq!(orchestrator.open_kinds().len(), 4);

        orchestrator.close_all().await;
        assert!(orchestrator.open_kinds().is_empty());
        let closes = shell
            .calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Close(_)))
            .count();
        assert_eq!(closes, 4);
    }

    #[tokio::test]
    async fn returned_handle_is_the_registered_window() {
        let (orchestrator, _, _) = orchestrator_at(100.0, 100.0);
        let handle = orchestrator
            .toggle(WindowKind::Menu, ToggleOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(handle.label(), "menu");
        assert_eq!(orchestrator.handle(WindowKind::Menu).unwrap().label(), "menu");
    }

    #[test]
    fn assistant_height_is_bounded() {
        assert_eq!(clamp_ai_height(10.0), 40.0);
        assert_eq!(clamp_ai_height(5000.0), 800.0);
        assert_eq!(clamp_ai_height(f64::NAN), 70.0);
        assert_eq!(clamp_ai_height(250.0), 250.0);
    }
}
