//! lockgen - Multi-ecosystem lockfile regeneration library
//!
//! Given a set of dependency upgrades, this library decides which lockfiles
//! must be regenerated, prepares their inputs in a working tree, runs the
//! package managers and reconciles the results into file changes:
//! - npm (package-lock.json, npm-shrinkwrap.json)
//! - Yarn (yarn.lock, including the pinned Yarn release)
//! - pnpm (pnpm-lock.yaml)

pub mod cli;
pub mod domain;
pub mod error;
pub mod generator;
pub mod host_rules;
pub mod lock_dirs;
pub mod npmrc;
pub mod orchestrator;
pub mod output;
pub mod paths;
pub mod plan;
pub mod progress;
pub mod scm;
pub mod workspace;
pub mod writer;
pub mod yarnrc;
