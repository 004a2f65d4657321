//! JSON file storage
//!
//! Playlists and reports are written as pretty-printed JSON at explicit paths.
//! Writes go to a temporary sibling first and are renamed into place so that an
//! interrupted run never leaves a truncated file behind.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while reading or writing stored JSON
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to deserialize {path}: {source}")]
    DeserializationFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to serialize data: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Loads JSON data from a file
///
/// Returns `None` if the file does not exist. A file that exists but cannot be
/// read or parsed is an error.
pub fn read_json_file<T>(path: &Path) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
{
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).map_err(|e| StoreError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let data = serde_json::from_str(&content).map_err(|e| StoreError::DeserializationFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(Some(data))
}

/// Writes data as pretty JSON, creating parent directories as needed
pub fn write_json_file<T>(path: &Path, data: &T) -> Result<(), StoreError>
where
    T: Serialize,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StoreError::DirectoryCreationFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let content = serde_json::to_string_pretty(data)?;

    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, content).map_err(|e| StoreError::WriteFailed {
        path: temp_path.clone(),
        source: e,
    })?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        StoreError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

/// A directory of named JSON documents of one type
///
/// Used for the reports written into the download root.
pub struct JsonStore<T> {
    dir: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Opens a store in `dir`, creating the directory if needed
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir).map_err(|e| StoreError::DirectoryCreationFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

        Ok(Self {
            dir: dir.to_path_buf(),
            _phantom: PhantomData,
        })
    }

    /// Path of the document called `name`
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    pub fn load(&self, name: &str) -> Result<Option<T>, StoreError> {
        read_json_file(&self.path_for(name))
    }

    /// Stores a document and returns the path it was written to
    pub fn store(&self, name: &str, data: &T) -> Result<PathBuf, StoreError> {
        let path = self.path_for(name);
        write_json_file(&path, data)?;
        Ok(path)
    }
}
