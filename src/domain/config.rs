//! Run-wide configuration for a lockfile regeneration run

use crate::domain::{FileChange, Upgrade};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Configuration for one orchestration run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    /// Regenerate lockfiles at all
    #[serde(default)]
    pub update_lock_files: bool,
    /// Compare against artifacts already committed to `branch_name`
    #[serde(default)]
    pub reuse_existing_branch: bool,
    /// Run exists only to refresh lockfiles
    #[serde(default)]
    pub is_lock_file_maintenance: bool,
    /// Seed generation with the committed lockfile instead of deleting it
    #[serde(default = "default_true")]
    pub reuse_lock_files: bool,
    /// Branch holding the update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    /// Branch the update is based on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_branch: Option<String>,
    /// Repository-wide `.npmrc`; never written in place of a package fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npmrc: Option<String>,
    /// Proposed upgrades
    #[serde(default)]
    pub upgrades: Vec<Upgrade>,
    /// Manifest and lockfile changes computed upstream
    #[serde(default)]
    pub updated_package_files: Vec<FileChange>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            update_lock_files: false,
            reuse_existing_branch: false,
            is_lock_file_maintenance: false,
            reuse_lock_files: true,
            branch_name: None,
            base_branch: None,
            npmrc: None,
            upgrades: Vec::new(),
            updated_package_files: Vec::new(),
        }
    }
}

impl RunConfig {
    /// Branch whose committed content regenerated lockfiles are compared to
    ///
    /// Only set in reuse-existing-branch mode.
    pub fn comparison_branch(&self) -> Option<&str> {
        if self.reuse_existing_branch {
            self.branch_name.as_deref()
        } else {
            None
        }
    }
}
