//! Lockfile run orchestrator
//!
//! This module provides:
//! - Workflow coordination: resolve → write inputs → generate → reconcile
//! - Per-lockfile failure isolation (generator errors are collected)
//! - Temporary `.npmrc` and `.yarnrc.yml` registry configuration
//! - Yarn runtime binary bookkeeping after a regenerated `yarn.lock`

use crate::domain::{
    AdditionalPackageFiles, ArtifactError, ArtifactsOutput, Ecosystem, FileChange, RunConfig,
};
use crate::error::ArtifactsError;
use crate::generator::{GenerateOutcome, GenerateRequest, LockFileGenerator, SystemGenerator};
use crate::host_rules::{HostRules, HostRulesResult};
use crate::lock_dirs::determine_lock_file_dirs;
use crate::npmrc::NpmrcState;
use crate::paths;
use crate::progress::Progress;
use crate::scm::Scm;
use crate::workspace::WorkingTree;
use crate::writer::FileWriter;
use crate::yarnrc::{RuntimeBinaryUpdater, YARNRC_YML};
use regex::Regex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

/// Yarn's message for a dependency version it cannot resolve
static YARN_VERSION_NOT_FOUND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"Couldn't find any versions for "([^"]+)""#).unwrap());

/// Result of processing a single lockfile
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DirectoryOutcome {
    /// Records in discovery order: the lockfile, then any runtime binary changes
    pub artifacts: Vec<FileChange>,
    /// Generator failure for this lockfile
    pub error: Option<ArtifactError>,
}

impl DirectoryOutcome {
    fn failed(error: ArtifactError) -> Self {
        Self {
            artifacts: Vec::new(),
            error: Some(error),
        }
    }

    /// Fold this outcome into the run output
    fn merge_into(self, output: &mut ArtifactsOutput) {
        output.updated_artifacts.extend(self.artifacts);
        output.artifact_errors.extend(self.error);
    }
}

/// Coordinates lockfile regeneration across ecosystems
pub struct ArtifactOrchestrator {
    tree: Arc<dyn WorkingTree>,
    scm: Arc<dyn Scm>,
    host_rules: Arc<dyn HostRules>,
    generators: HashMap<Ecosystem, Arc<dyn LockFileGenerator>>,
    show_progress: bool,
}

impl ArtifactOrchestrator {
    /// Create an orchestrator without generators
    pub fn new(
        tree: Arc<dyn WorkingTree>,
        scm: Arc<dyn Scm>,
        host_rules: Arc<dyn HostRules>,
    ) -> Self {
        Self {
            tree,
            scm,
            host_rules,
            generators: HashMap::new(),
            show_progress: false,
        }
    }

    /// Register a generator, replacing any previous one for its ecosystem
    pub fn with_generator(mut self, generator: Arc<dyn LockFileGenerator>) -> Self {
        self.generators.insert(generator.ecosystem(), generator);
        self
    }

    /// Register the package manager CLIs for every ecosystem
    pub fn with_system_generators(mut self, root: impl Into<PathBuf>) -> Self {
        for generator in SystemGenerator::all(root) {
            self = self.with_generator(Arc::new(generator));
        }
        self
    }

    /// Show a progress bar while generators run
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Regenerate every lockfile the run touches
    ///
    /// Generator failures are collected per lockfile. Working tree failures
    /// and a failed `.yarnrc.yml` merge abort the run.
    pub async fn get_additional_files(
        &self,
        config: &RunConfig,
        package_files: &AdditionalPackageFiles,
    ) -> Result<ArtifactsOutput, ArtifactsError> {
        let mut output = ArtifactsOutput::new();

        if !config.update_lock_files {
            debug!("skipping lock file generation");
            return Ok(output);
        }
        if package_files.is_empty() {
            debug!("no package files, skipping lock file generation");
            return Ok(output);
        }
        if self.maintenance_branch_exists(config).await? {
            debug!(
                branch = config.branch_name.as_deref(),
                "lock file maintenance branch already exists, skipping lock file generation"
            );
            return Ok(output);
        }

        let dirs = determine_lock_file_dirs(config, package_files);
        if dirs.is_empty() {
            debug!("no lock files to regenerate");
            return Ok(output);
        }
        debug!(?dirs, "resolved lock files");

        let writer = FileWriter::new(self.tree.as_ref(), self.scm.as_ref());
        let existing = writer
            .write_existing_files(config, package_files, &dirs)
            .await?;
        if !existing.is_empty() {
            debug!(
                written = ?existing.written,
                deleted = ?existing.deleted,
                "wrote existing package files"
            );
        }
        let updated = writer
            .write_updated_package_files(&config.updated_package_files, &config.upgrades)
            .await?;
        if !updated.is_empty() {
            debug!(written = ?updated.written, "wrote updated package files");
        }

        let host_rules = self.host_rules.process();
        let mut progress = Progress::new(self.show_progress);
        progress.start(dirs.len() as u64);

        for ecosystem in Ecosystem::all() {
            for lock_file in dirs.get(*ecosystem) {
                progress.generating(lock_file);
                let outcome = self
                    .process_directory(*ecosystem, lock_file, config, &host_rules)
                    .await;
                let outcome = match outcome {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        progress.finish_and_clear();
                        return Err(err);
                    }
                };
                outcome.merge_into(&mut output);
                progress.inc();
            }
        }
        progress.finish_and_clear();

        info!(
            updated = output.updated_artifacts.len(),
            errors = output.artifact_errors.len(),
            "lock file generation finished"
        );
        Ok(output)
    }

    async fn maintenance_branch_exists(&self, config: &RunConfig) -> Result<bool, ArtifactsError> {
        if !(config.is_lock_file_maintenance && config.reuse_existing_branch) {
            return Ok(false);
        }
        let Some(branch) = config.branch_name.as_deref() else {
            return Ok(false);
        };
        Ok(self.scm.branch_exists(branch).await?)
    }

    /// Generate one lockfile and reconcile it against existing content
    pub async fn process_directory(
        &self,
        ecosystem: Ecosystem,
        lock_file: &str,
        config: &RunConfig,
        host_rules: &HostRulesResult,
    ) -> Result<DirectoryOutcome, ArtifactsError> {
        let tree = self.tree.as_ref();
        let request = GenerateRequest::new(ecosystem, lock_file, config, host_rules);
        let lock_file_dir = request.lock_file_dir;
        debug!(%ecosystem, lock_file, "generating lock file");

        let npmrc =
            NpmrcState::prepare(tree, lock_file_dir, &host_rules.additional_npmrc_content).await?;

        let updater = RuntimeBinaryUpdater::new(tree, self.scm.as_ref());
        let yarnrc_path = paths::join(lock_file_dir, YARNRC_YML);
        let mut existing_yarnrc = match (ecosystem, &host_rules.additional_yarnrc_yml) {
            (Ecosystem::Yarn, Some(additional)) => {
                updater.merge_registry_config(&yarnrc_path, additional).await?
            }
            _ => None,
        };

        let before = if config.reuse_existing_branch {
            tree.read_file(lock_file).await?
        } else {
            None
        };

        let generated = match self.generators.get(&ecosystem) {
            Some(generator) => generator.generate(&request).await,
            None => GenerateOutcome::failed(format!("no lock file generator for {}", ecosystem)),
        };

        let mut outcome = DirectoryOutcome::default();
        match generated {
            GenerateOutcome::Failed { .. } => {
                let message = generated
                    .error_message()
                    .unwrap_or_else(|| "unknown error".to_string());
                if ecosystem == Ecosystem::Yarn {
                    if let Some(caps) = YARN_VERSION_NOT_FOUND_RE.captures(&message) {
                        warn!(dependency = &caps[1], lock_file, "Yarn could not find dependency");
                    }
                }
                warn!(%ecosystem, lock_file, "lock file generation failed");
                outcome = DirectoryOutcome::failed(ArtifactError::new(lock_file, message));
            }
            GenerateOutcome::Generated { lock_file: None } => {
                debug!(lock_file, "generator produced no lock file");
            }
            GenerateOutcome::Generated {
                lock_file: Some(content),
            } => {
                let existing = self.existing_lock_content(config, lock_file, before).await;
                if existing.as_deref() == Some(content.as_str()) {
                    debug!(lock_file, "lock file is unchanged");
                } else {
                    debug!(lock_file, "lock file updated");
                    outcome
                        .artifacts
                        .push(FileChange::addition(lock_file, content));
                    if ecosystem == Ecosystem::Yarn {
                        existing_yarnrc = updater
                            .update_yarn_binary(
                                lock_file_dir,
                                &mut outcome.artifacts,
                                existing_yarnrc.as_deref(),
                            )
                            .await?;
                    }
                }
            }
        }

        if let Some(content) = existing_yarnrc.filter(|c| !c.is_empty()) {
            tree.write_file(&yarnrc_path, &content).await?;
        }
        npmrc.restore(tree).await?;

        Ok(outcome)
    }

    /// Content a regenerated lockfile is compared against
    ///
    /// Only reuse-existing-branch runs compare: the lockfile committed to the
    /// update branch, else the working tree content from before generation.
    async fn existing_lock_content(
        &self,
        config: &RunConfig,
        lock_file: &str,
        before: Option<String>,
    ) -> Option<String> {
        if !config.reuse_existing_branch {
            return None;
        }
        let Some(branch) = config.comparison_branch() else {
            return before;
        };
        match self.scm.get_file(lock_file, Some(branch)).await {
            Ok(Some(committed)) => Some(committed),
            Ok(None) => before,
            Err(err) => {
                warn!(lock_file, %err, "error reading committed lock file");
                before
            }
        }
    }
}
