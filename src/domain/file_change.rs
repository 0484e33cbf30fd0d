//! File change records and per-lockfile errors emitted by a run

use serde::{Deserialize, Serialize};

/// A file to add or remove on the branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FileChange {
    /// Create or replace a file
    #[serde(rename_all = "camelCase")]
    Addition {
        path: String,
        contents: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_executable: bool,
    },
    /// Remove a file
    Deletion { path: String },
}

impl FileChange {
    /// Create an addition record
    pub fn addition(path: impl Into<String>, contents: impl Into<String>) -> Self {
        FileChange::Addition {
            path: path.into(),
            contents: contents.into(),
            is_executable: false,
        }
    }

    /// Create an addition record for an executable file
    pub fn executable(path: impl Into<String>, contents: impl Into<String>) -> Self {
        FileChange::Addition {
            path: path.into(),
            contents: contents.into(),
            is_executable: true,
        }
    }

    /// Create a deletion record
    pub fn deletion(path: impl Into<String>) -> Self {
        FileChange::Deletion { path: path.into() }
    }

    /// Path this change applies to
    pub fn path(&self) -> &str {
        match self {
            FileChange::Addition { path, .. } | FileChange::Deletion { path } => path,
        }
    }

    /// Returns true for additions
    pub fn is_addition(&self) -> bool {
        matches!(self, FileChange::Addition { .. })
    }
}

/// A lockfile that could not be regenerated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactError {
    /// Lockfile path
    pub lock_file: String,
    /// Generator output explaining the failure
    pub message: String,
}

impl ArtifactError {
    pub fn new(lock_file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            lock_file: lock_file.into(),
            message: message.into(),
        }
    }
}

/// Collected result of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactsOutput {
    /// Lockfiles that failed, in discovery order
    pub artifact_errors: Vec<ArtifactError>,
    /// File changes, in discovery order
    pub updated_artifacts: Vec<FileChange>,
}

impl ArtifactsOutput {
    /// Create an empty output
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if nothing was produced
    pub fn is_empty(&self) -> bool {
        self.artifact_errors.is_empty() && self.updated_artifacts.is_empty()
    }

    /// Returns true if any lockfile failed
    pub fn has_errors(&self) -> bool {
        !self.artifact_errors.is_empty()
    }
}
