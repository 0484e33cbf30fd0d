//! Package file descriptors produced by extraction

use crate::domain::{Ecosystem, ManagerData};
use serde::{Deserialize, Serialize};

/// One manifest file and the lockfiles attached to it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageFileDescriptor {
    /// Repository-relative manifest path
    pub package_file: String,
    /// Lockfile references
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_data: Option<ManagerData>,
    /// Inline `.npmrc` fragment to write next to the manifest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npmrc: Option<String>,
    /// Manifest text to materialize before generation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl PackageFileDescriptor {
    /// Create a descriptor without lockfile metadata
    pub fn new(package_file: impl Into<String>) -> Self {
        Self {
            package_file: package_file.into(),
            ..Default::default()
        }
    }

    /// Attach lockfile metadata
    pub fn with_manager_data(mut self, manager_data: ManagerData) -> Self {
        self.manager_data = Some(manager_data);
        self
    }

    /// Attach an inline `.npmrc` fragment
    pub fn with_npmrc(mut self, npmrc: impl Into<String>) -> Self {
        self.npmrc = Some(npmrc.into());
        self
    }

    /// Lockfile recorded for the given ecosystem
    pub fn lock_file(&self, ecosystem: Ecosystem) -> Option<&str> {
        self.manager_data.as_ref()?.lock_file(ecosystem)
    }
}

/// Package files found outside the upgraded set, grouped by manager
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalPackageFiles {
    /// Node.js manifests (shared by npm, Yarn and pnpm)
    #[serde(default)]
    pub npm: Vec<PackageFileDescriptor>,
}

impl AdditionalPackageFiles {
    /// Create from a list of Node.js package files
    pub fn npm(files: Vec<PackageFileDescriptor>) -> Self {
        Self { npm: files }
    }

    /// Returns true if there is nothing to process
    pub fn is_empty(&self) -> bool {
        self.npm.is_empty()
    }

    /// Find a package file by path
    pub fn find(&self, package_file: &str) -> Option<&PackageFileDescriptor> {
        self.npm.iter().find(|p| p.package_file == package_file)
    }
}
