use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::WindowSettings;
use crate::drag::PetDrag;
use crate::orchestrator::WindowOrchestrator;
use crate::shell::desktop::TauriShell;

pub struct RuntimeState {
    pub orchestrator: Arc<WindowOrchestrator<TauriShell>>,
    pub drag: Mutex<PetDrag>,
    pub settings: Mutex<WindowSettings>,
    pub current_hotkey: Mutex<String>,
    pub config_path: PathBuf,
}

#[derive(Clone)]
pub struct AppState {
    runtime: Arc<RuntimeState>,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<WindowOrchestrator<TauriShell>>,
        settings: WindowSettings,
        config_path: PathBuf,
    ) -> Self {
        let runtime = RuntimeState {
            orchestrator,
            drag: Mutex::new(PetDrag::new()),
            current_hotkey: Mutex::new(settings.history_hotkey.clone()),
            settings: Mutex::new(settings),
            config_path,
        };
        Self {
            runtime: Arc::new(runtime),
        }
    }

    pub fn runtime(&self) -> Arc<RuntimeState> {
        Arc::clone(&self.runtime)
    }

    pub fn orchestrator(&self) -> Arc<WindowOrchestrator<TauriShell>> {
        Arc::clone(&self.runtime.orchestrator)
    }
}
