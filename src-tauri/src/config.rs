use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::anchor::AnchorSnapshot;
use crate::geometry::{Position, Size};
use crate::orchestrator::OrchestratorOptions;
use crate::placement::{DEFAULT_ANCHOR_OFFSET, DEFAULT_PLACEMENT_GAP, PlacementConfig};

pub const CONFIG_FILE: &str = "config.json";
pub const DEFAULT_HISTORY_HOTKEY: &str = "Alt+Shift+V";
/// Tried when the configured and default hotkeys are both taken.
pub const BACKUP_HISTORY_HOTKEY: &str = "Ctrl+Alt+Shift+V";

pub const MAX_ANCHOR_OFFSET: f64 = 1000.0;
pub const MAX_PLACEMENT_GAP: f64 = 200.0;
pub const MIN_PET_EDGE: f64 = 16.0;
pub const MAX_PET_EDGE: f64 = 1024.0;

const DEFAULT_PET_X: f64 = 1550.0;
const DEFAULT_PET_Y: f64 = 800.0;
const DEFAULT_PET_WIDTH: f64 = 150.0;
const DEFAULT_PET_HEIGHT: f64 = 95.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSettings {
    #[serde(default = "default_anchor_offset")]
    pub anchor_offset: f64,
    #[serde(default = "default_placement_gap")]
    pub placement_gap: f64,
    #[serde(default = "default_pet_x")]
    pub pet_x: f64,
    #[serde(default = "default_pet_y")]
    pub pet_y: f64,
    #[serde(default = "default_pet_width")]
    pub pet_width: f64,
    #[serde(default = "default_pet_height")]
    pub pet_height: f64,
    #[serde(default = "default_close_history_on_blur")]
    pub close_history_on_blur: bool,
    #[serde(default = "default_history_hotkey")]
    pub history_hotkey: String,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            anchor_offset: default_anchor_offset(),
            placement_gap: default_placement_gap(),
            pet_x: default_pet_x(),
            pet_y: default_pet_y(),
            pet_width: default_pet_width(),
            pet_height: default_pet_height(),
            close_history_on_blur: default_close_history_on_blur(),
            history_hotkey: default_history_hotkey(),
        }
    }
}

fn default_anchor_offset() -> f64 {
    DEFAULT_ANCHOR_OFFSET
}

fn default_placement_gap() -> f64 {
    DEFAULT_PLACEMENT_GAP
}

fn default_pet_x() -> f64 {
    DEFAULT_PET_X
}

fn default_pet_y() -> f64 {
    DEFAULT_PET_Y
}

fn default_pet_width() -> f64 {
    DEFAULT_PET_WIDTH
}

fn default_pet_height() -> f64 {
    DEFAULT_PET_HEIGHT
}

fn default_close_history_on_blur() -> bool {
    true
}

fn default_history_hotkey() -> String {
    DEFAULT_HISTORY_HOTKEY.to_string()
}

impl WindowSettings {
    pub fn placement(&self) -> PlacementConfig {
        PlacementConfig {
            anchor_offset: self.anchor_offset,
            gap: self.placement_gap,
        }
    }

    pub fn orchestrator_options(&self) -> OrchestratorOptions {
        OrchestratorOptions {
            placement: self.placement(),
            close_history_on_blur: self.close_history_on_blur,
        }
    }

    pub fn anchor(&self) -> AnchorSnapshot {
        AnchorSnapshot {
            position: Position::new(self.pet_x, self.pet_y),
            size: Size::new(self.pet_width, self.pet_height),
        }
    }
}

/// Hotkeys to try at startup, in order, without duplicates.
pub fn hotkey_candidates(configured: &str) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::with_capacity(3);
    for hotkey in [configured, DEFAULT_HISTORY_HOTKEY, BACKUP_HISTORY_HOTKEY] {
        let hotkey = hotkey.trim();
        if !hotkey.is_empty() && !candidates.iter().any(|known| known == hotkey) {
            candidates.push(hotkey.to_string());
        }
    }
    candidates
}

pub fn config_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE)
}

pub fn read_settings(path: &Path) -> Result<WindowSettings, String> {
    if !path.exists() {
        return Ok(WindowSettings::default());
    }

    let content = fs::read_to_string(path).map_err(|err| err.to_string())?;
    serde_json::from_str::<WindowSettings>(&content).map_err(|err| err.to_string())
}

pub fn write_settings(path: &Path, settings: &WindowSettings) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| err.to_string())?;
    }

    let serialized = serde_json::to_string_pretty(settings).map_err(|err| err.to_string())?;
    fs::write(path, serialized).map_err(|err| err.to_string())
}

/// Reads settings and repairs anything out of range instead of failing.
pub fn load_settings(path: &Path) -> Result<WindowSettings, String> {
    read_settings(path).map(normalize_loaded_settings)
}

pub fn normalize_loaded_settings(mut settings: WindowSettings) -> WindowSettings {
    if !in_range(settings.anchor_offset, 0.0, MAX_ANCHOR_OFFSET) {
        warn!(
            anchor_offset = settings.anchor_offset,
            "loaded anchor offset is out of range; resetting to default"
        );
        settings.anchor_offset = DEFAULT_ANCHOR_OFFSET;
    }

    if !in_range(settings.placement_gap, 0.0, MAX_PLACEMENT_GAP) {
        warn!(
            placement_gap = settings.placement_gap,
            "loaded placement gap is out of range; resetting to default"
        );
        settings.placement_gap = DEFAULT_PLACEMENT_GAP;
    }

    if !settings.pet_x.is_finite() || !settings.pet_y.is_finite() {
        warn!("loaded pet position is not finite; resetting to default");
        settings.pet_x = DEFAULT_PET_X;
        settings.pet_y = DEFAULT_PET_Y;
    }

    if !in_range(settings.pet_width, MIN_PET_EDGE, MAX_PET_EDGE)
        || !in_range(settings.pet_height, MIN_PET_EDGE, MAX_PET_EDGE)
    {
        warn!(
            pet_width = settings.pet_width,
            pet_height = settings.pet_height,
            "loaded pet size is out of range; resetting to default"
        );
        settings.pet_width = DEFAULT_PET_WIDTH;
        settings.pet_height = DEFAULT_PET_HEIGHT;
    }

    let hotkey = settings.history_hotkey.trim();
    settings.history_hotkey = if hotkey.is_empty() {
        default_history_hotkey()
    } else {
        hotkey.to_string()
    };

    settings
}

pub fn validate_settings(mut settings: WindowSettings) -> Result<WindowSettings, String> {
    if !in_range(settings.anchor_offset, 0.0, MAX_ANCHOR_OFFSET) {
        return Err(format!(
            "anchorOffset must be between 0 and {MAX_ANCHOR_OFFSET}"
        ));
    }

    if !in_range(settings.placement_gap, 0.0, MAX_PLACEMENT_GAP) {
        return Err(format!(
            "placementGap must be between 0 and {MAX_PLACEMENT_GAP}"
        ));
    }

    if !settings.pet_x.is_finite() || !settings.pet_y.is_finite() {
        return Err("petX and petY must be finite numbers".to_string());
    }

    if !in_range(settings.pet_width, MIN_PET_EDGE, MAX_PET_EDGE)
        || !in_range(settings.pet_height, MIN_PET_EDGE, MAX_PET_EDGE)
    {
        return Err(format!(
            "petWidth and petHeight must be between {MIN_PET_EDGE} and {MAX_PET_EDGE}"
        ));
    }

    let hotkey = settings.history_hotkey.trim();
    if hotkey.is_empty() {
        return Err("historyHotkey cannot be empty".to_string());
    }
    settings.history_hotkey = hotkey.to_string();

    Ok(settings)
}

fn in_range(value: f64, min: f64, max: f64) -> bool {
    (min..=max).contains(&value)
}
