//! Artifact storage.
//!
//! Rendered artifacts are keyed by file name (`mission_map.png`,
//! `map_live.yaml`, ...). Writes are not atomic and concurrent writers to the
//! same name race; the last write wins.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{Error, Result};

/// Named blob storage for rendered artifacts.
pub trait ArtifactStore: Send + Sync {
    /// Write (or overwrite) an artifact.
    fn put(&self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Read an artifact; `None` if it was never written.
    fn get(&self, name: &str) -> Result<Option<Vec<u8>>>;
}

/// Artifacts as files in one directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open a store, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.exists() {
            fs::create_dir_all(root)?;
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Directory the store writes to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of an artifact.
    pub fn path(&self, name: &str) -> Result<PathBuf> {
        let file = Path::new(name);
        if file.components().count() != 1 || file.file_name().is_none() {
            return Err(Error::Other(format!("Invalid artifact name: {:?}", name)));
        }
        Ok(self.root.join(file))
    }
}

impl ArtifactStore for FileStore {
    fn put(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(name)?;
        fs::write(&path, bytes)?;
        log::debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path(name)?) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    artifacts: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names written so far, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.artifacts.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

impl ArtifactStore for MemoryStore {
    fn put(&self, name: &str, bytes: &[u8]) -> Result<()> {
        self.artifacts.lock().insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.artifacts.lock().get(name).cloned())
    }
}
