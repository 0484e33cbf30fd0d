//! Upgrade requests and the lockfile metadata they carry

use crate::domain::Ecosystem;
use serde::{Deserialize, Serialize};

/// Lockfile references recorded for a package file or upgrade
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerData {
    /// Path of the npm lockfile (package-lock.json or npm-shrinkwrap.json)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npm_lock: Option<String>,
    /// Path of the yarn.lock
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yarn_lock: Option<String>,
    /// Path of the pnpm-lock.yaml
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pnpm_shrinkwrap: Option<String>,
}

impl ManagerData {
    /// Lockfile path recorded for the given ecosystem, ignoring blank values
    pub fn lock_file(&self, ecosystem: Ecosystem) -> Option<&str> {
        let value = match ecosystem {
            Ecosystem::Npm => self.npm_lock.as_deref(),
            Ecosystem::Yarn => self.yarn_lock.as_deref(),
            Ecosystem::Pnpm => self.pnpm_shrinkwrap.as_deref(),
        };
        value.filter(|v| !v.trim().is_empty())
    }
}

/// Kind of update an upgrade represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdateType {
    Major,
    Minor,
    Patch,
    Pin,
    Digest,
    /// Refresh lockfiles without touching any manifest
    LockFileMaintenance,
}

/// How the manifest range was rewritten for an upgrade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RangeStrategy {
    Auto,
    Pin,
    Bump,
    Replace,
    Widen,
    UpdateLockfile,
    InRangeOnly,
}

/// One proposed dependency change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upgrade {
    /// Dependency name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dep_name: Option<String>,
    /// Manifest the dependency was found in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_file: Option<String>,
    /// Lockfile references for the manifest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_data: Option<ManagerData>,
    /// Upgrade targets a vulnerability
    #[serde(default)]
    pub is_remediation: bool,
    /// Upgrade only changes the lockfile
    #[serde(default)]
    pub is_lockfile_update: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_type: Option<UpdateType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_strategy: Option<RangeStrategy>,
    /// Lockfiles already known to be affected
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lock_files: Vec<String>,
}

impl Upgrade {
    /// Returns true for lockfile-maintenance updates
    pub fn is_lock_file_maintenance(&self) -> bool {
        self.update_type == Some(UpdateType::LockFileMaintenance)
    }

    /// Returns true if this upgrade forces its lockfiles to be regenerated
    pub fn requires_lock_file(&self) -> bool {
        self.is_lock_file_maintenance() || self.is_remediation || self.is_lockfile_update
    }

    /// Lockfile recorded in manager data for the given ecosystem
    pub fn lock_file(&self, ecosystem: Ecosystem) -> Option<&str> {
        self.manager_data.as_ref()?.lock_file(ecosystem)
    }

    /// Returns true if this upgrade affects the given lockfile
    pub fn touches_lock_file(&self, ecosystem: Ecosystem, lock_file: &str) -> bool {
        self.lock_file(ecosystem) == Some(lock_file)
            || self.lock_files.iter().any(|l| l == lock_file)
    }
}
