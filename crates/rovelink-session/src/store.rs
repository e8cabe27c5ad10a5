//! Persisted key/value settings.
//!
//! Values are either short strings or single bytes, mirroring what the
//! device keeps in flash. A read of a missing key is `Ok(None)`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;

type Result<T> = std::result::Result<T, StoreError>;

/// Key/value settings storage.
pub trait ConfigStore: Send + Sync {
    fn get_str(&self, key: &str) -> Result<Option<String>>;
    fn set_str(&self, key: &str, value: &str) -> Result<()>;
    fn get_u8(&self, key: &str) -> Result<Option<u8>>;
    fn set_u8(&self, key: &str, value: u8) -> Result<()>;
    /// Remove `key`. Erasing a missing key is not an error.
    fn erase(&self, key: &str) -> Result<()>;
}

/// A stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    U8(u8),
    Str(String),
}

#[derive(Debug, Default)]
struct Values(BTreeMap<String, StoredValue>);

impl Values {
    fn get_str(&self, key: &str) -> Result<Option<String>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(StoredValue::Str(value)) => Ok(Some(value.clone())),
            Some(StoredValue::U8(_)) => Err(StoreError::TypeMismatch {
                key: key.to_string(),
                expected: "string",
            }),
        }
    }

    fn get_u8(&self, key: &str) -> Result<Option<u8>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(StoredValue::U8(value)) => Ok(Some(*value)),
            Some(StoredValue::Str(_)) => Err(StoreError::TypeMismatch {
                key: key.to_string(),
                expected: "u8",
            }),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Volatile store, lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<Values>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryStore {
    fn get_str(&self, key: &str) -> Result<Option<String>> {
        lock(&self.values).get_str(key)
    }

    fn set_str(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.values)
            .0
            .insert(key.to_string(), StoredValue::Str(value.to_string()));
        Ok(())
    }

    fn get_u8(&self, key: &str) -> Result<Option<u8>> {
        lock(&self.values).get_u8(key)
    }

    fn set_u8(&self, key: &str, value: u8) -> Result<()> {
        lock(&self.values)
            .0
            .insert(key.to_string(), StoredValue::U8(value));
        Ok(())
    }

    fn erase(&self, key: &str) -> Result<()> {
        lock(&self.values).0.remove(key);
        Ok(())
    }
}

/// Store backed by a JSON object on disk.
///
/// The file is read once at open and rewritten after every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<Values>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read(&path) {
            Ok(raw) if raw.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(raw) => serde_json::from_slice(&raw)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        debug!(path = %path.display(), keys = values.len(), "config store opened");
        Ok(Self {
            path,
            values: Mutex::new(Values(values)),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of every stored entry.
    pub fn entries(&self) -> BTreeMap<String, StoredValue> {
        lock(&self.values).0.clone()
    }

    fn update(&self, apply: impl FnOnce(&mut BTreeMap<String, StoredValue>)) -> Result<()> {
        let mut values = lock(&self.values);
        let mut next = values.0.clone();
        apply(&mut next);
        let raw = serde_json::to_vec_pretty(&next)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&self.path, raw).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        values.0 = next;
        Ok(())
    }
}

impl ConfigStore for JsonFileStore {
    fn get_str(&self, key: &str) -> Result<Option<String>> {
        lock(&self.values).get_str(key)
    }

    fn set_str(&self, key: &str, value: &str) -> Result<()> {
        self.update(|values| {
            values.insert(key.to_string(), StoredValue::Str(value.to_string()));
        })
    }

    fn get_u8(&self, key: &str) -> Result<Option<u8>> {
        lock(&self.values).get_u8(key)
    }

    fn set_u8(&self, key: &str, value: u8) -> Result<()> {
        self.update(|values| {
            values.insert(key.to_string(), StoredValue::U8(value));
        })
    }

    fn erase(&self, key: &str) -> Result<()> {
        self.update(|values| {
            values.remove(key);
        })
    }
}
