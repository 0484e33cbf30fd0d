//! Core domain models for lockgen
//!
//! This module contains the fundamental types used throughout the crate:
//! - Ecosystems and their lockfile names
//! - Upgrade requests and lockfile metadata
//! - Package file descriptors
//! - File change records and artifact errors
//! - Run configuration

mod config;
mod ecosystem;
mod file_change;
mod package_file;
mod upgrade;

pub use config::RunConfig;
pub use ecosystem::Ecosystem;
pub use file_change::{ArtifactError, ArtifactsOutput, FileChange};
pub use package_file::{AdditionalPackageFiles, PackageFileDescriptor};
pub use upgrade::{ManagerData, RangeStrategy, UpdateType, Upgrade};
