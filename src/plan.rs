//! Run plan loading
//!
//! A plan bundles everything one run needs: the run configuration, the
//! additional package files and the host-rule output. Plans are JSON or
//! TOML, chosen by file extension.

use crate::domain::{AdditionalPackageFiles, RunConfig};
use crate::error::PlanError;
use crate::host_rules::StaticHostRules;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Input for one lockfile run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunPlan {
    /// Run configuration, stored at the top level of the plan
    #[serde(flatten)]
    pub config: RunConfig,
    /// Package files by manager
    #[serde(default)]
    pub package_files: AdditionalPackageFiles,
    /// Registry configuration to apply during generation
    #[serde(default)]
    pub host_rules: StaticHostRules,
}

impl RunPlan {
    /// Load a plan from a `.json` or `.toml` file
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        if !path.exists() {
            return Err(PlanError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let parse: fn(&str, &Path) -> Result<Self, PlanError> = match extension.as_deref() {
            Some("json") => Self::from_json,
            Some("toml") => Self::from_toml,
            _ => {
                return Err(PlanError::UnsupportedFormat {
                    path: path.to_path_buf(),
                })
            }
        };

        let content = std::fs::read_to_string(path).map_err(|e| PlanError::read(path, e))?;
        let plan = parse(&content, path)?;
        debug!(
            path = %path.display(),
            upgrades = plan.config.upgrades.len(),
            package_files = plan.package_files.npm.len(),
            "loaded run plan"
        );
        Ok(plan)
    }

    /// Parse a JSON plan; `path` is used for error messages
    pub fn from_json(content: &str, path: &Path) -> Result<Self, PlanError> {
        serde_json::from_str(content).map_err(|e| PlanError::json_parse(path, e.to_string()))
    }

    /// Parse a TOML plan; `path` is used for error messages
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, PlanError> {
        toml::from_str(content).map_err(|e| PlanError::toml_parse(path, e.to_string()))
    }
}
