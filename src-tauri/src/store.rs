use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::geometry::Rect;

pub const WINDOW_STATE_FILE: &str = "window-state.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("window state io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("window state is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("stored value for `{key}` is invalid: {message}")]
    InvalidValue { key: String, message: String },
}

/// Key-value persistence for window geometry.
pub trait GeometryStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct StoredHeight {
    height: f64,
}

pub fn load_rect(store: &dyn GeometryStore, key: &str) -> Result<Option<Rect>, StoreError> {
    let Some(value) = store.get(key)? else {
        return Ok(None);
    };
    let rect: Rect = serde_json::from_value(value).map_err(|err| StoreError::InvalidValue {
        key: key.to_string(),
        message: err.to_string(),
    })?;
    if !(rect.width > 0.0 && rect.height > 0.0) {
        return Err(StoreError::InvalidValue {
            key: key.to_string(),
            message: format!("non-positive size {}x{}", rect.width, rect.height),
        });
    }
    Ok(Some(rect))
}

pub fn save_rect(store: &dyn GeometryStore, key: &str, rect: Rect) -> Result<(), StoreError> {
    store.set(key, serde_json::to_value(rect)?)
}

pub fn load_height(store: &dyn GeometryStore, key: &str) -> Result<Option<f64>, StoreError> {
    let Some(value) = store.get(key)? else {
        return Ok(None);
    };
    let stored: StoredHeight =
        serde_json::from_value(value).map_err(|err| StoreError::InvalidValue {
            key: key.to_string(),
            message: err.to_string(),
        })?;
    Ok(Some(stored.height))
}

pub fn save_height(store: &dyn GeometryStore, key: &str, height: f64) -> Result<(), StoreError> {
    store.set(key, serde_json::to_value(StoredHeight { height })?)
}

/// Pretty-printed JSON object on disk, rewritten on every `set`.
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, Value>>,
}

impl JsonFileStore {
    /// Opens the store; a missing file starts empty, a corrupt one is
    /// reported so the caller can decide to start over.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mutex::new(BTreeMap::new()),
        }
    }
}

impl GeometryStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string_pretty(&*entries)?;
        fs::write(&self.path, serialized)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GeometryStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }
}
