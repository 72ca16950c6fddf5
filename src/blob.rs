//! Key-value blob persistence.
//!
//! The note store keeps its whole collection under a single key. A blob store
//! only has to read and overwrite whole values.
use std::{
    collections::HashMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use log::{debug, error, trace};
use tempfile::NamedTempFile;

use crate::{NotesError, Result};

/// Persistence collaborator injected into `NoteStore`.
pub trait BlobStore {
    /// Returns the stored value, or `None` when the key was never written.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the value stored under `key`.
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Helper method to get the file path for a key
    fn blob_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl BlobStore for FileBlobStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.blob_path(key);
        debug!("Reading blob from file: {}", path.display());

        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!("No blob at {}", path.display());
                Ok(None)
            }
            Err(e) => {
                error!("Failed to read blob file {}: {}", path.display(), e);
                Err(NotesError::Io(e))
            }
        }
    }

    /// Writes through a temporary file in the same directory, then renames it
    /// over the target so readers never see a half-written blob.
    fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.blob_path(key);

        if !self.dir.exists() {
            debug!("Creating data directory: {}", self.dir.display());
            fs::create_dir_all(&self.dir).map_err(|e| {
                error!("Failed to create directory {}: {}", self.dir.display(), e);
                NotesError::Io(e)
            })?;
        }

        let mut temp_file = NamedTempFile::new_in(&self.dir).map_err(|e| {
            error!("Failed to create temporary file: {}", e);
            NotesError::Io(e)
        })?;

        trace!("Writing {} bytes to temporary file", value.len());
        temp_file.write_all(value.as_bytes())?;
        temp_file.flush()?;

        temp_file.persist(&path).map_err(|e| {
            error!("Failed to persist file {}: {}", path.display(), e.error);
            NotesError::Io(e.error)
        })?;

        debug!("Blob written to {}", path.display());
        Ok(())
    }
}

/// Process-local blob store. Clones share the same entries, so a "fresh
/// session" can be simulated by opening a second store on a clone.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries.lock().map_err(|_| NotesError::PersistenceError {
            key: String::new(),
            message: "memory blob store lock poisoned".to_string(),
        })
    }
}

impl BlobStore for MemoryBlobStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_store_missing_key_reads_none() {
        let dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(dir.path());
        assert_eq!(store.read("notes").unwrap(), None);
    }

    #[test]
    fn file_store_overwrites_whole_value() {
        let dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(dir.path().join("nested"));

        store.write("notes", "[1,2,3]").unwrap();
        store.write("notes", "[]").unwrap();

        assert_eq!(store.read("notes").unwrap().as_deref(), Some("[]"));
        assert!(dir.path().join("nested").join("notes.json").is_file());
    }

    #[test]
    fn memory_store_clones_share_entries() {
        let store = MemoryBlobStore::new();
        let other = store.clone();

        store.write("notes", "x").unwrap();
        assert_eq!(other.read("notes").unwrap().as_deref(), Some("x"));
        assert_eq!(other.read("missing").unwrap(), None);
    }
}
