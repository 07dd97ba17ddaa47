//! Key/value storage used to remember the session identifier across runs.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::warn;
use uuid::Uuid;

/// Minimal string key/value store.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
}

/// Process-local store; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by a single JSON object file.
///
/// Writes go through a temporary file and a rename, so a crash never leaves
/// a half-written file behind.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Use the JSON file at `path`; it is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> io::Result<Map<String, Value>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(entries)) => Ok(entries),
            Ok(_) => Err(io::Error::new(io::ErrorKind::InvalidData, "store file is not a JSON object")),
            Err(e) => Err(io::Error::new(io::ErrorKind::InvalidData, e)),
        }
    }

    fn atomic_write(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let temp_filename = format!(
            "{}.tmp.{}",
            self.path.file_name().and_then(|s| s.to_str()).unwrap_or("store"),
            Uuid::new_v4()
        );
        let temp_path = self.path.with_file_name(temp_filename);

        if let Err(e) = fs::write(&temp_path, content) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
        fs::rename(&temp_path, &self.path).inspect_err(|_| {
            let _ = fs::remove_file(&temp_path);
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.read_entries() {
            Ok(entries) => entries.get(key).and_then(Value::as_str).map(str::to_string),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read key/value store");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        // An unreadable file is replaced rather than blocking the write.
        let mut entries = self.read_entries().unwrap_or_default();
        entries.insert(key.to_string(), Value::String(value.to_string()));
        let content = serde_json::to_string_pretty(&Value::Object(entries))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.atomic_write(&content)
    }
}
