//! Application error types using thiserror
//!
//! Error hierarchy:
//! - FsError: working-tree read/write/delete failures
//! - ScmError: failures talking to git
//! - PlanError: issues loading a run plan
//! - ArtifactsError: run-fatal errors that abort a lockfile run
//!
//! Per-lockfile generator failures are not errors at this level; they are
//! collected as [`crate::domain::ArtifactError`] values.

use std::path::PathBuf;
use thiserror::Error;

/// Errors related to working-tree file operations
#[derive(Error, Debug)]
pub enum FsError {
    /// Failed to read a file
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to delete a file
    #[error("failed to delete {path}: {source}")]
    Delete {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from git operations
#[derive(Error, Debug)]
pub enum ScmError {
    /// Failed to execute the `git` command
    #[error("failed to run git {command}: {source}")]
    Exec {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// `git` returned a non-zero exit code
    #[error("git {command} failed: {stderr}")]
    Command { command: String, stderr: String },
}

/// Errors related to loading a run plan
#[derive(Error, Debug)]
pub enum PlanError {
    /// Plan file not found
    #[error("plan file not found: {path}")]
    NotFound { path: PathBuf },

    /// Failed to read plan file
    #[error("failed to read plan file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parsing error
    #[error("failed to parse JSON in {path}: {message}")]
    JsonParse { path: PathBuf, message: String },

    /// TOML parsing error
    #[error("failed to parse TOML in {path}: {message}")]
    TomlParse { path: PathBuf, message: String },

    /// Unsupported plan format
    #[error("unsupported plan format: {path} (expected .json or .toml)")]
    UnsupportedFormat { path: PathBuf },
}

/// Errors that abort a whole lockfile run
#[derive(Error, Debug)]
pub enum ArtifactsError {
    /// Working tree failure outside generation
    #[error(transparent)]
    Fs(#[from] FsError),

    /// Git failure
    #[error(transparent)]
    Scm(#[from] ScmError),

    /// Registry configuration could not be merged into `.yarnrc.yml`
    #[error("error appending runtime configuration content to {path}: {message}")]
    RuntimeConfigAppend { path: String, message: String },
}

impl FsError {
    /// Creates a new Read error
    pub fn read(path: impl Into<String>, source: std::io::Error) -> Self {
        FsError::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a new Write error
    pub fn write(path: impl Into<String>, source: std::io::Error) -> Self {
        FsError::Write {
            path: path.into(),
            source,
        }
    }

    /// Creates a new Delete error
    pub fn delete(path: impl Into<String>, source: std::io::Error) -> Self {
        FsError::Delete {
            path: path.into(),
            source,
        }
    }
}

impl ScmError {
    /// Creates a new Exec error
    pub fn exec(command: impl Into<String>, source: std::io::Error) -> Self {
        ScmError::Exec {
            command: command.into(),
            source,
        }
    }

    /// Creates a new Command error
    pub fn command(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        ScmError::Command {
            command: command.into(),
            stderr: stderr.into(),
        }
    }
}

impl PlanError {
    /// Creates a new Read error
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PlanError::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a new JsonParse error
    pub fn json_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        PlanError::JsonParse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new TomlParse error
    pub fn toml_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        PlanError::TomlParse {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl ArtifactsError {
    /// Creates a new RuntimeConfigAppend error
    pub fn runtime_config_append(path: impl Into<String>, message: impl Into<String>) -> Self {
        ArtifactsError::RuntimeConfigAppend {
            path: path.into(),
            message: message.into(),
        }
    }
}
