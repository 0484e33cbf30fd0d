//! Materializing generator inputs in the working tree
//!
//! This module provides:
//! - `write_existing_files`: pre-upgrade lockfiles, manifests and `.npmrc`
//!   fragments for the package files whose lockfiles were selected
//! - `write_updated_package_files`: the upgraded files computed upstream
//! - Massaging of npm lockfiles so widened ranges get re-resolved

use crate::domain::{
    AdditionalPackageFiles, Ecosystem, FileChange, PackageFileDescriptor, RangeStrategy,
    RunConfig, Upgrade,
};
use crate::error::ArtifactsError;
use crate::lock_dirs::LockFileDirs;
use crate::paths;
use crate::scm::Scm;
use crate::workspace::WorkingTree;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Writes generator inputs into the working tree
pub struct FileWriter<'a> {
    tree: &'a dyn WorkingTree,
    scm: &'a dyn Scm,
}

/// Files touched by a writer call
#[derive(Debug, Default, PartialEq, Eq)]
pub struct WriteResult {
    /// Paths written, in order
    pub written: Vec<String>,
    /// Paths deleted, in order
    pub deleted: Vec<String>,
}

impl WriteResult {
    /// Returns true if nothing was written or deleted
    pub fn is_empty(&self) -> bool {
        self.written.is_empty() && self.deleted.is_empty()
    }
}

impl<'a> FileWriter<'a> {
    /// Create a writer over a working tree and committed state
    pub fn new(tree: &'a dyn WorkingTree, scm: &'a dyn Scm) -> Self {
        Self { tree, scm }
    }

    async fn write(&self, result: &mut WriteResult, path: &str, contents: &str) -> Result<(), ArtifactsError> {
        self.tree.write_file(path, contents).await?;
        result.written.push(path.to_string());
        Ok(())
    }

    async fn delete(&self, result: &mut WriteResult, path: &str) -> Result<(), ArtifactsError> {
        self.tree.delete_file(path).await?;
        result.deleted.push(path.to_string());
        Ok(())
    }

    /// Write pre-upgrade inputs for every package file whose lockfile is selected
    ///
    /// Package files whose lockfiles are not in `dirs` are skipped entirely.
    /// `.npmrc` content only ever comes from the package file's own fragment,
    /// never from the run-wide `config.npmrc`.
    pub async fn write_existing_files(
        &self,
        config: &RunConfig,
        package_files: &AdditionalPackageFiles,
        dirs: &LockFileDirs,
    ) -> Result<WriteResult, ArtifactsError> {
        let mut result = WriteResult::default();
        if package_files.is_empty() {
            return Ok(result);
        }
        debug!(
            package_files = ?package_files.npm.iter().map(|p| &p.package_file).collect::<Vec<_>>(),
            "writing existing package files"
        );

        let mut seen_npm_locks = HashSet::new();
        for package_file in &package_files.npm {
            if !is_selected(package_file, dirs) {
                continue;
            }

            if let Some(content) = &package_file.content {
                self.write(&mut result, &package_file.package_file, content)
                    .await?;
            }

            if let Some(npmrc) = &package_file.npmrc {
                let npmrc_path = paths::sibling(&package_file.package_file, ".npmrc");
                self.write(&mut result, &npmrc_path, &ensure_trailing_newline(npmrc))
                    .await?;
            }

            if let Some(npm_lock) = package_file.lock_file(Ecosystem::Npm) {
                if dirs.contains(Ecosystem::Npm, npm_lock)
                    && seen_npm_locks.insert(npm_lock.to_string())
                {
                    self.write_existing_npm_lock(&mut result, config, npm_lock)
                        .await?;
                }
            }

            if !config.reuse_lock_files {
                for ecosystem in [Ecosystem::Yarn, Ecosystem::Pnpm] {
                    if let Some(lock) = package_file.lock_file(ecosystem) {
                        if dirs.contains(ecosystem, lock) {
                            debug!(lock, "ensuring lock file is removed");
                            self.delete(&mut result, lock).await?;
                        }
                    }
                }
            }
        }

        Ok(result)
    }

    async fn write_existing_npm_lock(
        &self,
        result: &mut WriteResult,
        config: &RunConfig,
        npm_lock: &str,
    ) -> Result<(), ArtifactsError> {
        if !config.reuse_lock_files {
            debug!(npm_lock, "ensuring lock file is removed");
            return self.delete(result, npm_lock).await;
        }

        let existing = match self
            .scm
            .get_file(npm_lock, config.base_branch.as_deref())
            .await
        {
            Ok(Some(existing)) => existing,
            Ok(None) => {
                debug!(npm_lock, "no committed lock file to reuse");
                return Ok(());
            }
            Err(err) => {
                warn!(npm_lock, %err, "error reading committed lock file");
                return Ok(());
            }
        };

        let widens = widened_dependencies(&config.upgrades, npm_lock);
        let contents = if widens.is_empty() {
            existing
        } else {
            debug!(npm_lock, ?widens, "removing widened dependencies to force an update");
            remove_widened_dependencies(&existing, &widens).unwrap_or_else(|| {
                warn!(npm_lock, "error massaging lock file for widen");
                existing.clone()
            })
        };

        debug!(npm_lock, "writing existing lock file");
        self.write(result, npm_lock, &contents).await
    }

    /// Write every upgraded file computed upstream
    ///
    /// An empty `upgrades` list means no updates are pending for this run and
    /// nothing is written. Deletions are never re-materialized.
    pub async fn write_updated_package_files(
        &self,
        updated_package_files: &[FileChange],
        upgrades: &[Upgrade],
    ) -> Result<WriteResult, ArtifactsError> {
        let mut result = WriteResult::default();
        if upgrades.is_empty() {
            debug!("no pending upgrades, skipping updated package files");
            return Ok(result);
        }

        for file in updated_package_files {
            if let FileChange::Addition { path, contents, .. } = file {
                debug!(path, "writing updated package file");
                self.write(&mut result, path, contents).await?;
            }
        }
        Ok(result)
    }
}

/// Returns true if any of the package file's lockfiles is selected
fn is_selected(package_file: &PackageFileDescriptor, dirs: &LockFileDirs) -> bool {
    Ecosystem::all().iter().any(|eco| {
        package_file
            .lock_file(*eco)
            .is_some_and(|lock| dirs.contains(*eco, lock))
    })
}

fn ensure_trailing_newline(content: &str) -> String {
    if content.ends_with('\n') {
        content.to_string()
    } else {
        format!("{}\n", content)
    }
}

/// Dependencies upgraded with the `widen` strategy against an npm lockfile
fn widened_dependencies<'u>(upgrades: &'u [Upgrade], npm_lock: &str) -> Vec<&'u str> {
    upgrades
        .iter()
        .filter(|u| u.range_strategy == Some(RangeStrategy::Widen))
        .filter(|u| u.touches_lock_file(Ecosystem::Npm, npm_lock))
        .filter_map(|u| u.dep_name.as_deref())
        .collect()
}

/// Drop widened dependencies from an npm lockfile, keeping its indentation
///
/// Returns `None` if the lockfile is not valid JSON.
fn remove_widened_dependencies(contents: &str, widens: &[&str]) -> Option<String> {
    let mut lock: serde_json::Value = serde_json::from_str(contents).ok()?;
    let root = lock.as_object_mut()?;

    for dep_name in widens {
        if let Some(deps) = root.get_mut("dependencies").and_then(|d| d.as_object_mut()) {
            deps.remove(*dep_name);
        }
        if let Some(packages) = root.get_mut("packages").and_then(|p| p.as_object_mut()) {
            packages.remove(&format!("node_modules/{}", dep_name));
        }
    }

    let indent = detect_indent(contents);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    lock.serialize(&mut serializer).ok()?;
    let mut massaged = String::from_utf8(out).ok()?;
    if contents.ends_with('\n') {
        massaged.push('\n');
    }
    Some(massaged)
}

/// Indentation of the first indented line, two spaces by default
fn detect_indent(contents: &str) -> String {
    contents
        .lines()
        .find_map(|line| {
            let indent: String = line.chars().take_while(|c| *c == ' ' || *c == '\t').collect();
            (!indent.is_empty() && indent.len() < line.len()).then_some(indent)
        })
        .unwrap_or_else(|| "  ".to_string())
}
