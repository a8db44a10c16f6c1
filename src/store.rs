//! Flat key-value persistence.
//!
//! [`KeyValueStore`] is the only persistence surface the voice core needs:
//! string keys mapped to string values.  [`JsonFileStore`] keeps the whole
//! map in one JSON object on disk and rewrites it on every `set`;
//! [`MemoryStore`] is the in-process equivalent used by tests and by the
//! binary when no config directory is writable.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use thiserror::Error;

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Errors surfaced by a [`KeyValueStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store contents are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// KeyValueStore
// ---------------------------------------------------------------------------

/// String-to-string persistent store.
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, or `None` when the key was never set.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Volatile store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JsonFileStore
// ---------------------------------------------------------------------------

/// Store persisted as a single JSON object file.
///
/// A missing file reads as an empty store.  The file is created (with parent
/// directories) on the first `set`.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>, StoreError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let data = std::fs::read_to_string(&self.path)?;
        if data.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&data)?)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let map = self.read_map()?;
        Ok(map.get(key).and_then(Value::as_str).map(str::to_string))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read_map()?;
        map.insert(key.to_string(), Value::String(value.to_string()));

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&map)?)?;
        Ok(())
    }
}

/// A [`JsonFileStore`] at `path`, or a [`MemoryStore`] when the directory
/// for `path` cannot be created.
pub fn open_store(path: &Path) -> Arc<dyn KeyValueStore> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    match std::fs::create_dir_all(dir) {
        Ok(()) => Arc::new(JsonFileStore::open(path)),
        Err(e) => {
            log::warn!(
                "store: cannot use {} ({e}); custom commands will not be saved",
                dir.display()
            );
            Arc::new(MemoryStore::new())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn memory_store_get_missing_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("nope").unwrap(), None);
    }

    #[test]
    fn memory_store_set_replaces() {
        let store = MemoryStore::new();
        store.set("k", "one").unwrap();
        store.set("k", "two").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn file_store_missing_file_is_empty() {
        let dir = tempdir().expect("temp dir");
        let store = JsonFileStore::open(dir.path().join("store.json"));
        assert_eq!(store.get("customVoiceCommands").unwrap(), None);
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("sub").join("store.json");

        {
            let store = JsonFileStore::open(&path);
            store.set("a", "1").unwrap();
            store.set("b", "{\"play\":\"go\"}").unwrap();
        }

        let reopened = JsonFileStore::open(&path);
        assert_eq!(reopened.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(
            reopened.get("b").unwrap().as_deref(),
            Some("{\"play\":\"go\"}")
        );
    }

    #[test]
    fn open_store_writes_to_disk() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("store.json");

        open_store(&path).set("a", "1").unwrap();
        assert_eq!(
            JsonFileStore::open(&path).get("a").unwrap().as_deref(),
            Some("1")
        );
    }

    #[test]
    fn open_store_falls_back_to_memory() {
        let dir = tempdir().expect("temp dir");
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "a file, not a directory").unwrap();
        let path = blocker.join("store.json");

        let store = open_store(&path);
        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        assert!(!path.exists());
    }

    #[test]
    fn file_store_rejects_corrupt_file() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();

        let store = JsonFileStore::open(&path);
        assert!(matches!(store.get("a"), Err(StoreError::Json(_))));
    }
}
