//! Shared key-value store visible to every client.
//!
//! Records carry a version that increases with every write. Writers use
//! [`SharedStore::compare_and_swap`] so that two clients racing for the same
//! seat cannot both win.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fs4::fs_std::FileExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record changed: expected version {expected}, found {actual}")]
    Conflict { expected: u64, actual: u64 },

    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt record: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}

/// A stored value with its write counter. Version 0 means "absent".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub version: u64,
    pub data: String,
}

/// A decoded record
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

pub trait SharedStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Record>, StoreError>;

    /// Write `data` if the record is still at version `expected`.
    ///
    /// Returns the new version.
    fn compare_and_swap(&self, key: &str, expected: u64, data: String) -> Result<u64, StoreError>;

    /// Unconditional write; still bumps the version
    fn overwrite(&self, key: &str, data: String) -> Result<u64, StoreError>;
}

/// Load and decode a JSON record
pub fn load_json<T: DeserializeOwned>(
    store: &dyn SharedStore,
    key: &str,
) -> Result<Option<Versioned<T>>, StoreError> {
    match store.load(key)? {
        Some(record) => Ok(Some(Versioned {
            version: record.version,
            value: serde_json::from_str(&record.data)?,
        })),
        None => Ok(None),
    }
}

/// In-process store shared by every session through an `Arc`
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, Record>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SharedStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Record>, StoreError> {
        Ok(self.records.get(key).map(|r| r.value().clone()))
    }

    fn compare_and_swap(&self, key: &str, expected: u64, data: String) -> Result<u64, StoreError> {
        match self.records.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                let actual = entry.get().version;
                if actual != expected {
                    return Err(StoreError::Conflict { expected, actual });
                }
                entry.insert(Record {
                    version: actual + 1,
                    data,
                });
                Ok(actual + 1)
            }
            Entry::Vacant(entry) => {
                if expected != 0 {
                    return Err(StoreError::Conflict {
                        expected,
                        actual: 0,
                    });
                }
                entry.insert(Record { version: 1, data });
                Ok(1)
            }
        }
    }

    fn overwrite(&self, key: &str, data: String) -> Result<u64, StoreError> {
        let mut entry = self.records.entry(key.to_string()).or_insert(Record {
            version: 0,
            data: String::new(),
        });
        entry.version += 1;
        entry.data = data;
        Ok(entry.version)
    }
}

/// Store persisted as a single JSON file of records.
///
/// Writes go through a temporary file and a rename so a crash never leaves
/// a half-written record set. Each write holds an exclusive OS lock on a
/// `.lock` file beside the store, so handles in separate processes sharing
/// one path serialize their compare-and-swap. Calls block the calling thread.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut lock_path = path.clone().into_os_string();
        lock_path.push(".lock");
        Self {
            path,
            lock_path: lock_path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Exclusive lock across processes, released when the file drops
    fn lock_file(&self) -> Result<File, StoreError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&self.lock_path)?;
        FileExt::lock_exclusive(&file)?;
        Ok(file)
    }

    fn read_all(&self) -> Result<HashMap<String, Record>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(HashMap::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, records: &HashMap<String, Record>) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(records)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update(
        &self,
        key: &str,
        expected: Option<u64>,
        data: String,
    ) -> Result<u64, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let _file_lock = self.lock_file()?;
        let mut records = self.read_all()?;
        let actual = records.get(key).map(|r| r.version).unwrap_or(0);
        if let Some(expected) = expected {
            if actual != expected {
                return Err(StoreError::Conflict { expected, actual });
            }
        }
        let version = actual + 1;
        records.insert(key.to_string(), Record { version, data });
        self.write_all(&records)?;
        Ok(version)
    }
}

impl SharedStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<Record>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(self.read_all()?.remove(key))
    }

    fn compare_and_swap(&self, key: &str, expected: u64, data: String) -> Result<u64, StoreError> {
        self.update(key, Some(expected), data)
    }

    fn overwrite(&self, key: &str, data: String) -> Result<u64, StoreError> {
        self.update(key, None, data)
    }
}
