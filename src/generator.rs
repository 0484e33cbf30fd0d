//! Lockfile generators, one per ecosystem
//!
//! This module provides:
//! - The `LockFileGenerator` seam the orchestrator drives per lockfile
//! - `SystemGenerator`, which shells out to npm, Yarn or pnpm
//! - Outcome types that carry either the regenerated lockfile or the
//!   generator's output on failure

use crate::domain::{Ecosystem, RunConfig, Upgrade};
use crate::host_rules::HostRulesResult;
use crate::paths;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Input for one lockfile regeneration
#[derive(Debug, Clone)]
pub struct GenerateRequest<'a> {
    /// Repository-relative lockfile path
    pub lock_file: &'a str,
    /// Directory holding the lockfile, `""` for the repository root
    pub lock_file_dir: &'a str,
    /// Upgrades that touch this lockfile
    pub upgrades: Vec<&'a Upgrade>,
    /// Run-wide configuration
    pub config: &'a RunConfig,
    /// Registry credentials for the run
    pub host_rules: &'a HostRulesResult,
}

impl<'a> GenerateRequest<'a> {
    /// Build a request for `lock_file` with the upgrades that touch it
    pub fn new(
        ecosystem: Ecosystem,
        lock_file: &'a str,
        config: &'a RunConfig,
        host_rules: &'a HostRulesResult,
    ) -> Self {
        Self {
            lock_file,
            lock_file_dir: paths::parent_dir(lock_file),
            upgrades: config
                .upgrades
                .iter()
                .filter(|u| u.touches_lock_file(ecosystem, lock_file))
                .collect(),
            config,
            host_rules,
        }
    }
}

/// Result of running a generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// The generator succeeded; `lock_file` is `None` if it wrote nothing
    Generated { lock_file: Option<String> },
    /// The generator failed with the given output
    Failed {
        stdout: Option<String>,
        stderr: Option<String>,
    },
}

impl GenerateOutcome {
    /// Successful outcome carrying a lockfile
    pub fn generated(lock_file: impl Into<String>) -> Self {
        GenerateOutcome::Generated {
            lock_file: Some(lock_file.into()),
        }
    }

    /// Failed outcome with only stderr output
    pub fn failed(stderr: impl Into<String>) -> Self {
        GenerateOutcome::Failed {
            stdout: None,
            stderr: Some(stderr.into()),
        }
    }

    /// Error message for a failed outcome: stderr, else stdout, else "unknown error"
    ///
    /// Blank output counts as missing.
    pub fn error_message(&self) -> Option<String> {
        let GenerateOutcome::Failed { stdout, stderr } = self else {
            return None;
        };
        let message = [stderr, stdout]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| "unknown error".to_string());
        Some(message)
    }
}

/// Regenerates one ecosystem's lockfiles
#[async_trait]
pub trait LockFileGenerator: Send + Sync {
    /// The ecosystem this generator handles
    fn ecosystem(&self) -> Ecosystem;

    /// Regenerate the lockfile described by `request`
    ///
    /// Failures are reported through `GenerateOutcome::Failed`, never as a panic.
    async fn generate(&self, request: &GenerateRequest<'_>) -> GenerateOutcome;
}

/// Generator that runs the ecosystem's package manager CLI
#[derive(Debug, Clone)]
pub struct SystemGenerator {
    /// Checkout root, lockfile paths are relative to it
    root: PathBuf,
    ecosystem: Ecosystem,
    command: Vec<String>,
}

impl SystemGenerator {
    /// Create a generator using the ecosystem's default command
    pub fn new(root: impl Into<PathBuf>, ecosystem: Ecosystem) -> Self {
        Self {
            root: root.into(),
            ecosystem,
            command: default_command(ecosystem)
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Replace the command line
    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// One generator per supported ecosystem
    pub fn all(root: impl Into<PathBuf>) -> Vec<SystemGenerator> {
        let root = root.into();
        Ecosystem::all()
            .iter()
            .map(|eco| SystemGenerator::new(root.clone(), *eco))
            .collect()
    }
}

/// Lockfile-only install command for an ecosystem
fn default_command(ecosystem: Ecosystem) -> &'static [&'static str] {
    match ecosystem {
        Ecosystem::Npm => &["npm", "install", "--package-lock-only"],
        Ecosystem::Yarn => &["yarn", "install", "--mode", "update-lockfile"],
        Ecosystem::Pnpm => &["pnpm", "install", "--lockfile-only"],
    }
}

#[async_trait]
impl LockFileGenerator for SystemGenerator {
    fn ecosystem(&self) -> Ecosystem {
        self.ecosystem
    }

    #[instrument(skip(self, request), fields(ecosystem = %self.ecosystem, lock_file = request.lock_file))]
    async fn generate(&self, request: &GenerateRequest<'_>) -> GenerateOutcome {
        let Some((program, args)) = self.command.split_first() else {
            return GenerateOutcome::failed("Empty command");
        };
        let command_str = self.command.join(" ");
        let working_dir = self.root.join(request.lock_file_dir);
        debug!(command = command_str, dir = %working_dir.display(), "running lock file generator");

        let output = match Command::new(program)
            .args(args)
            .current_dir(&working_dir)
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                return GenerateOutcome::failed(format!("Failed to execute command: {}", e));
            }
        };

        if !output.status.success() {
            return GenerateOutcome::Failed {
                stdout: Some(String::from_utf8_lossy(&output.stdout).to_string()),
                stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
            };
        }

        match tokio::fs::read_to_string(self.root.join(request.lock_file)).await {
            Ok(content) => GenerateOutcome::generated(content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(lock_file = request.lock_file, "generator did not write a lock file");
                GenerateOutcome::Generated { lock_file: None }
            }
            Err(e) => GenerateOutcome::failed(format!(
                "Failed to read {}: {}",
                request.lock_file, e
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ManagerData;
    use tempfile::TempDir;

    fn config_with_upgrades() -> RunConfig {
        RunConfig {
            upgrades: vec![
                Upgrade {
                    dep_name: Some("lodash".to_string()),
                    manager_data: Some(ManagerData {
                        npm_lock: Some("app/package-lock.json".to_string()),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                Upgrade {
                    dep_name: Some("react".to_string()),
                    lock_files: vec!["web/package-lock.json".to_string()],
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_request_selects_touching_upgrades() {
        let config = config_with_upgrades();
        let host_rules = HostRulesResult {
            additional_npmrc_content: vec!["//registry.example.com/:_authToken=abc".to_string()],
            additional_yarnrc_yml: None,
        };
        let request =
            GenerateRequest::new(Ecosystem::Npm, "app/package-lock.json", &config, &host_rules);
        assert_eq!(request.lock_file_dir, "app");
        assert_eq!(request.upgrades.len(), 1);
        assert_eq!(request.upgrades[0].dep_name.as_deref(), Some("lodash"));
        assert_eq!(
            request.host_rules.additional_npmrc_content,
            ["//registry.example.com/:_authToken=abc"]
        );

        let request =
            GenerateRequest::new(Ecosystem::Yarn, "app/package-lock.json", &config, &host_rules);
        assert!(request.upgrades.is_empty());
    }

    #[test]
    fn test_error_message_priority() {
        let outcome = GenerateOutcome::Failed {
            stdout: Some("out".to_string()),
            stderr: Some("err".to_string()),
        };
        assert_eq!(outcome.error_message().as_deref(), Some("err"));

        let outcome = GenerateOutcome::Failed {
            stdout: Some("out".to_string()),
            stderr: Some(String::new()),
        };
        assert_eq!(outcome.error_message().as_deref(), Some("out"));

        let outcome = GenerateOutcome::Failed {
            stdout: None,
            stderr: None,
        };
        assert_eq!(outcome.error_message().as_deref(), Some("unknown error"));

        assert_eq!(GenerateOutcome::generated("{}").error_message(), None);
    }

    #[test]
    fn test_default_commands() {
        assert_eq!(
            SystemGenerator::new(".", Ecosystem::Npm).command,
            ["npm", "install", "--package-lock-only"]
        );
        assert_eq!(
            SystemGenerator::new(".", Ecosystem::Yarn).command,
            ["yarn", "install", "--mode", "update-lockfile"]
        );
        assert_eq!(
            SystemGenerator::new(".", Ecosystem::Pnpm).command,
            ["pnpm", "install", "--lockfile-only"]
        );
    }

    #[test]
    fn test_all_generators() {
        let generators = SystemGenerator::all(".");
        let ecosystems: Vec<_> = generators.iter().map(|g| g.ecosystem()).collect();
        assert_eq!(ecosystems, Ecosystem::all());
    }

    #[tokio::test]
    async fn test_missing_binary_fails() {
        let dir = TempDir::new().unwrap();
        let config = RunConfig::default();
        let host_rules = HostRulesResult::default();
        let generator = SystemGenerator::new(dir.path(), Ecosystem::Npm)
            .with_command(["lockgen-test-nonexistent-binary"]);

        let outcome = generator
            .generate(&GenerateRequest::new(
                Ecosystem::Npm,
                "package-lock.json",
                &config,
                &host_rules,
            ))
            .await;
        let message = outcome.error_message().unwrap();
        assert!(message.starts_with("Failed to execute command"));
    }

    #[tokio::test]
    async fn test_empty_command_fails() {
        let dir = TempDir::new().unwrap();
        let config = RunConfig::default();
        let host_rules = HostRulesResult::default();
        let generator =
            SystemGenerator::new(dir.path(), Ecosystem::Npm).with_command(Vec::<String>::new());

        let outcome = generator
            .generate(&GenerateRequest::new(
                Ecosystem::Npm,
                "package-lock.json",
                &config,
                &host_rules,
            ))
            .await;
        assert_eq!(outcome.error_message().as_deref(), Some("Empty command"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_generate_reads_lock_file_back() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("app")).unwrap();
        let config = RunConfig::default();
        let host_rules = HostRulesResult::default();
        let generator = SystemGenerator::new(dir.path(), Ecosystem::Npm)
            .with_command(["sh", "-c", "echo '{}' > package-lock.json"]);

        let outcome = generator
            .generate(&GenerateRequest::new(
                Ecosystem::Npm,
                "app/package-lock.json",
                &config,
                &host_rules,
            ))
            .await;
        assert_eq!(outcome, GenerateOutcome::generated("{}\n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_generate_without_lock_file() {
        let dir = TempDir::new().unwrap();
        let config = RunConfig::default();
        let host_rules = HostRulesResult::default();
        let generator =
            SystemGenerator::new(dir.path(), Ecosystem::Pnpm).with_command(["sh", "-c", "true"]);

        let outcome = generator
            .generate(&GenerateRequest::new(
                Ecosystem::Pnpm,
                "pnpm-lock.yaml",
                &config,
                &host_rules,
            ))
            .await;
        assert_eq!(outcome, GenerateOutcome::Generated { lock_file: None });
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_generate_failure_captures_output() {
        let dir = TempDir::new().unwrap();
        let config = RunConfig::default();
        let host_rules = HostRulesResult::default();
        let generator = SystemGenerator::new(dir.path(), Ecosystem::Yarn)
            .with_command(["sh", "-c", "echo boom >&2; exit 1"]);

        let outcome = generator
            .generate(&GenerateRequest::new(
                Ecosystem::Yarn,
                "yarn.lock",
                &config,
                &host_rules,
            ))
            .await;
        assert_eq!(outcome.error_message().as_deref(), Some("boom\n"));
    }
}
