use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use common::join_relpath;

/// Flat byte store keyed by slash-separated relative paths such as
/// `uploads/covers/Song.jpg`.
pub trait MediaStorage: Send + Sync {
    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;
    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;
    fn exists(&self, path: &str) -> bool;
    fn delete(&self, path: &str) -> Result<(), StorageError>;
    fn size(&self, path: &str) -> Result<u64, StorageError>;
    fn ensure_dir(&self, path: &str) -> Result<(), StorageError>;
}

#[derive(Clone, Debug)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a relative storage path onto the filesystem. Parent-directory
    /// segments are refused so a path can never leave the root.
    pub fn local_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        if path.split(['/', '\\']).any(|part| part == "..") {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(join_relpath(&self.root, path))
    }
}

impl MediaStorage for DiskStorage {
    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        fs::write(self.local_path(path)?, bytes)?;
        Ok(())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        Ok(fs::read(self.local_path(path)?)?)
    }

    fn exists(&self, path: &str) -> bool {
        match self.local_path(path) {
            Ok(local) => local.is_file(),
            Err(_) => false,
        }
    }

    fn delete(&self, path: &str) -> Result<(), StorageError> {
        fs::remove_file(self.local_path(path)?)?;
        Ok(())
    }

    fn size(&self, path: &str) -> Result<u64, StorageError> {
        Ok(fs::metadata(self.local_path(path)?)?.len())
    }

    fn ensure_dir(&self, path: &str) -> Result<(), StorageError> {
        fs::create_dir_all(self.local_path(path)?)?;
        Ok(())
    }
}

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    InvalidPath(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::Io(err) if err.kind() == ErrorKind::NotFound)
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {}", err),
            StorageError::InvalidPath(path) => write!(f, "invalid storage path: {}", path),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(err) => Some(err),
            StorageError::InvalidPath(_) => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err)
    }
}
