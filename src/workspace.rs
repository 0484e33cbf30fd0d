//! Working-tree file access
//!
//! This module provides:
//! - The `WorkingTree` trait used by every writer and the orchestrator
//! - `LocalWorkingTree`, backed by a checkout directory on disk

use crate::error::FsError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::trace;

/// Read/write access to the repository checkout
///
/// Paths are repository-relative.
#[async_trait]
pub trait WorkingTree: Send + Sync {
    /// Read a file, `None` if it does not exist
    async fn read_file(&self, path: &str) -> Result<Option<String>, FsError>;

    /// Write a file, creating parent directories as needed
    async fn write_file(&self, path: &str, contents: &str) -> Result<(), FsError>;

    /// Delete a file; deleting a missing file succeeds
    async fn delete_file(&self, path: &str) -> Result<(), FsError>;
}

/// Working tree rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalWorkingTree {
    root: PathBuf,
}

impl LocalWorkingTree {
    /// Create a working tree rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl WorkingTree for LocalWorkingTree {
    async fn read_file(&self, path: &str) -> Result<Option<String>, FsError> {
        match tokio::fs::read_to_string(self.resolve(path)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FsError::read(path, e)),
        }
    }

    async fn write_file(&self, path: &str, contents: &str) -> Result<(), FsError> {
        trace!(path, "writing local file");
        let full_path = self.resolve(path);
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FsError::write(path, e))?;
        }
        tokio::fs::write(&full_path, contents)
            .await
            .map_err(|e| FsError::write(path, e))
    }

    async fn delete_file(&self, path: &str) -> Result<(), FsError> {
        trace!(path, "deleting local file");
        match tokio::fs::remove_file(self.resolve(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FsError::delete(path, e)),
        }
    }
}
