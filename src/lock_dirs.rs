//! Lockfile directory resolution
//!
//! Reduces the upgrade list to the set of lockfiles that must be regenerated,
//! one deduplicated set per ecosystem. Pure: no I/O.

use crate::domain::{AdditionalPackageFiles, Ecosystem, RunConfig};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::trace;

/// Lockfiles selected for regeneration, per ecosystem
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockFileDirs {
    pub npm_lock_dirs: BTreeSet<String>,
    pub yarn_lock_dirs: BTreeSet<String>,
    pub pnpm_shrinkwrap_dirs: BTreeSet<String>,
}

impl LockFileDirs {
    /// Selected lockfiles for an ecosystem
    pub fn get(&self, ecosystem: Ecosystem) -> &BTreeSet<String> {
        match ecosystem {
            Ecosystem::Npm => &self.npm_lock_dirs,
            Ecosystem::Yarn => &self.yarn_lock_dirs,
            Ecosystem::Pnpm => &self.pnpm_shrinkwrap_dirs,
        }
    }

    /// Returns true if `lock_file` is selected for `ecosystem`
    pub fn contains(&self, ecosystem: Ecosystem, lock_file: &str) -> bool {
        self.get(ecosystem).contains(lock_file)
    }

    /// Returns true if no lockfile is selected
    pub fn is_empty(&self) -> bool {
        Ecosystem::all().iter().all(|eco| self.get(*eco).is_empty())
    }

    /// Total number of selected lockfiles
    pub fn len(&self) -> usize {
        Ecosystem::all().iter().map(|eco| self.get(*eco).len()).sum()
    }

    fn insert(&mut self, ecosystem: Ecosystem, lock_file: Option<&str>) {
        let Some(lock_file) = lock_file else {
            return;
        };
        let set = match ecosystem {
            Ecosystem::Npm => &mut self.npm_lock_dirs,
            Ecosystem::Yarn => &mut self.yarn_lock_dirs,
            Ecosystem::Pnpm => &mut self.pnpm_shrinkwrap_dirs,
        };
        set.insert(lock_file.to_string());
    }
}

/// Determine which lockfiles a run must regenerate
///
/// Remediation, lockfile-update and lockfile-maintenance upgrades select the
/// lockfiles in their manager data. Every upgrade selects the lockfiles it
/// already lists. Unless every upgrade is lockfile-only, each updated
/// package file that is also a known package file selects its lockfiles.
pub fn determine_lock_file_dirs(
    config: &RunConfig,
    package_files: &AdditionalPackageFiles,
) -> LockFileDirs {
    let mut dirs = LockFileDirs::default();

    for upgrade in &config.upgrades {
        if upgrade.requires_lock_file() {
            for ecosystem in Ecosystem::all() {
                dirs.insert(*ecosystem, upgrade.lock_file(*ecosystem));
            }
        }
        for lock_file in &upgrade.lock_files {
            if let Some(ecosystem) = Ecosystem::from_lock_file(lock_file) {
                dirs.insert(ecosystem, Some(lock_file));
            }
        }
    }

    let lock_file_only = config
        .upgrades
        .iter()
        .all(|u| u.is_lock_file_maintenance() || u.is_lockfile_update);
    if lock_file_only {
        return dirs;
    }

    for updated in &config.updated_package_files {
        trace!(path = updated.path(), "checking for lock files");
        let Some(package_file) = package_files.find(updated.path()) else {
            continue;
        };
        for ecosystem in Ecosystem::all() {
            dirs.insert(*ecosystem, package_file.lock_file(*ecosystem));
        }
    }

    dirs
}
