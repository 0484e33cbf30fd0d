//! Access to previously committed file contents
//!
//! Shells out to `git` so the user's credentials and configuration apply.

use crate::error::ScmError;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Source of committed repository state
#[async_trait]
pub trait Scm: Send + Sync {
    /// Committed contents of `path` on `branch` (the checked-out commit when
    /// `None`); `None` if the file does not exist there
    async fn get_file(&self, path: &str, branch: Option<&str>) -> Result<Option<String>, ScmError>;

    /// Returns true if `branch` exists on the remote
    async fn branch_exists(&self, branch: &str) -> Result<bool, ScmError>;
}

/// `Scm` implementation backed by the `git` CLI
#[derive(Debug, Clone)]
pub struct GitCli {
    repo: PathBuf,
    remote: String,
}

impl GitCli {
    /// Create a git client for the checkout at `repo`
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self {
            repo: repo.into(),
            remote: "origin".to_string(),
        }
    }

    /// Use a remote other than `origin`
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    /// Object spec passed to `git show`
    fn show_spec(path: &str, branch: Option<&str>) -> String {
        format!("{}:{}", branch.unwrap_or("HEAD"), path)
    }

    /// Remote-tracking ref for a branch
    fn remote_ref(&self, branch: &str) -> String {
        format!("refs/remotes/{}/{}", self.remote, branch)
    }

    async fn git(&self, args: &[&str]) -> Result<std::process::Output, ScmError> {
        let command = args.first().copied().unwrap_or_default();
        Command::new("git")
            .args(args)
            .current_dir(&self.repo)
            .output()
            .await
            .map_err(|e| ScmError::exec(command, e))
    }
}

#[async_trait]
impl Scm for GitCli {
    #[instrument(skip(self))]
    async fn get_file(&self, path: &str, branch: Option<&str>) -> Result<Option<String>, ScmError> {
        let spec = Self::show_spec(path, branch);
        let output = self.git(&["show", &spec]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if is_missing_path(&stderr) {
                debug!(stderr, "file not found in committed state");
                return Ok(None);
            }
            return Err(ScmError::command("show", stderr));
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
    }

    #[instrument(skip(self))]
    async fn branch_exists(&self, branch: &str) -> Result<bool, ScmError> {
        let reference = self.remote_ref(branch);
        let output = self
            .git(&["rev-parse", "--verify", "--quiet", &reference])
            .await?;
        let exists = output.status.success();
        debug!(exists, "remote branch check");
        Ok(exists)
    }
}

/// Returns true if `git show` failed only because the path is absent in the revision
fn is_missing_path(stderr: &str) -> bool {
    stderr.contains("does not exist in") || stderr.contains("exists on disk, but not in")
}
