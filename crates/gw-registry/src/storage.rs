//! JSON file persistence
//!
//! Every write goes to `<path>.tmp` first and is renamed over the target, so
//! readers never observe a partially written file.

use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Short write to {path:?}: {written} of {expected} bytes")]
    ShortWrite {
        path: PathBuf,
        written: usize,
        expected: usize,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A single JSON document on disk
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Load and parse the document
    ///
    /// Returns None if the file doesn't exist.
    pub async fn load<T>(&self) -> StorageResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        if !self.path.exists() {
            debug!("Storage file not found: {:?}", self.path);
            return Ok(None);
        }

        let content = fs::read(&self.path).await?;
        let document = serde_json::from_slice(&content)?;

        debug!("Loaded storage file: {:?}", self.path);
        Ok(Some(document))
    }

    /// Serialize and write the document
    ///
    /// With `sync` set the data is flushed to stable storage before the
    /// rename.
    pub async fn save<T>(&self, document: &T, sync: bool) -> StorageResult<()>
    where
        T: Serialize,
    {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                fs::create_dir_all(parent).await?;
                debug!("Created storage directory: {:?}", parent);
            }
        }

        let content = serde_json::to_vec(document)?;
        let temp_path = self.temp_path();

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&content).await?;
        file.flush().await?;

        let written = file.metadata().await?.len() as usize;
        if written != content.len() {
            drop(file);
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::ShortWrite {
                path: temp_path,
                written,
                expected: content.len(),
            });
        }

        if sync {
            file.sync_all().await?;
        }

        drop(file);
        fs::rename(&temp_path, &self.path).await?;

        debug!(
            "Saved storage file: {:?} ({} bytes, sync: {})",
            self.path, written, sync
        );

        Ok(())
    }
}
