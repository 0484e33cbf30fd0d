//! Registry credentials derived from host rules
//!
//! Host rules are resolved upstream; the orchestrator only needs the
//! `.npmrc` lines and the `.yarnrc.yml` fragment they produce.

use serde::{Deserialize, Serialize};

/// Extra registry configuration for a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRulesResult {
    /// Lines appended to every `.npmrc` during generation
    #[serde(default)]
    pub additional_npmrc_content: Vec<String>,
    /// Fragment merged into `.yarnrc.yml`, typically `npmRegistries`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_yarnrc_yml: Option<serde_yaml::Mapping>,
}

/// Provider of run-wide registry configuration
pub trait HostRules: Send + Sync {
    /// Compute the extra registry configuration
    fn process(&self) -> HostRulesResult;
}

/// Host rules with fixed output, typically loaded from a plan file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticHostRules(pub HostRulesResult);

impl HostRules for StaticHostRules {
    fn process(&self) -> HostRulesResult {
        self.0.clone()
    }
}
