use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to persist {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The only I/O surface the task store and its siblings ever touch: a
/// string-keyed, string-valued store, mirroring the device key-value
/// storage of the original app. Swapping in [`MemoryStorage`] makes every
/// consumer testable without a filesystem.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// One file per key inside a data directory. Writes go through a temp file
/// in the same directory and are renamed into place, so a crashed write
/// never leaves a truncated collection behind.
#[derive(Debug, Clone)]
pub struct FileStorage {
    data_dir: PathBuf,
}

impl FileStorage {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(data_dir)?;
        info!(data_dir = %data_dir.display(), "opened file storage");
        Ok(Self {
            data_dir: data_dir.to_path_buf(),
        })
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        // Keys like `@tasks` map onto plain file names; anything outside
        // [A-Za-z0-9_-] is dropped so a key can never escape the data dir.
        let stem: String = key
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        self.data_dir.join(format!("{stem}.json"))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.entry_path(key);
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.entry_path(key);
        debug!(file = %path.display(), bytes = value.len(), "writing storage entry");

        let mut temp = NamedTempFile::new_in(&self.data_dir)?;
        temp.write_all(value.as_bytes())?;
        temp.flush()?;
        temp.persist(&path).map_err(|err| StorageError::Persist {
            path,
            source: err.error,
        })?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let path = self.entry_path(key);
        debug!(file = %path.display(), "removing storage entry");
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::{FileStorage, MemoryStorage, Storage};

    #[test]
    fn file_storage_round_trips() {
        let temp = tempdir().expect("tempdir");
        let mut storage = FileStorage::open(temp.path()).expect("open");

        assert_eq!(storage.get("@tasks").expect("get"), None);
        storage.set("@tasks", "[1,2,3]").expect("set");
        assert_eq!(
            storage.get("@tasks").expect("get"),
            Some("[1,2,3]".to_string())
        );

        storage.remove("@tasks").expect("remove");
        assert_eq!(storage.get("@tasks").expect("get"), None);
    }

    #[test]
    fn removing_a_missing_key_is_fine() {
        let temp = tempdir().expect("tempdir");
        let mut storage = FileStorage::open(temp.path()).expect("open");
        storage.remove("never-written").expect("remove");
    }

    #[test]
    fn keys_are_sanitized_to_file_names() {
        let temp = tempdir().expect("tempdir");
        let mut storage = FileStorage::open(temp.path()).expect("open");
        storage.set("@tasks", "x").expect("set");
        assert!(temp.path().join("tasks.json").exists());
    }

    #[test]
    fn memory_storage_round_trips() {
        let mut storage = MemoryStorage::new();
        storage.set("user", "{}").expect("set");
        assert_eq!(storage.get("user").expect("get"), Some("{}".to_string()));
        storage.remove("user").expect("remove");
        assert_eq!(storage.get("user").expect("get"), None);
    }
}
