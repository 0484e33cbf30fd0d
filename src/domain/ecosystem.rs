//! Ecosystem definitions for the supported lockfile flavours

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lockfile-producing package managers handled by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    /// npm (package-lock.json / npm-shrinkwrap.json)
    Npm,
    /// Yarn (yarn.lock)
    Yarn,
    /// pnpm (pnpm-lock.yaml)
    Pnpm,
}

impl Ecosystem {
    /// Returns the lock filenames this ecosystem generates
    pub fn lock_filenames(&self) -> &'static [&'static str] {
        match self {
            Ecosystem::Npm => &["package-lock.json", "npm-shrinkwrap.json"],
            Ecosystem::Yarn => &["yarn.lock"],
            Ecosystem::Pnpm => &["pnpm-lock.yaml"],
        }
    }

    /// Returns the display name for this ecosystem
    pub fn display_name(&self) -> &'static str {
        match self {
            Ecosystem::Npm => "npm",
            Ecosystem::Yarn => "Yarn",
            Ecosystem::Pnpm => "pnpm",
        }
    }

    /// Classify a lockfile path by its file name
    ///
    /// Returns `None` for files no ecosystem generates.
    pub fn from_lock_file(path: &str) -> Option<Ecosystem> {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        Ecosystem::all()
            .iter()
            .copied()
            .find(|eco| eco.lock_filenames().contains(&file_name))
    }

    /// Returns all ecosystems in processing order
    pub fn all() -> &'static [Ecosystem] {
        &[Ecosystem::Npm, Ecosystem::Yarn, Ecosystem::Pnpm]
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
