//! JSON output formatter for machine processing

use crate::domain::{ArtifactsOutput, FileChange};
use crate::output::{OutputFormatter, Verbosity};
use serde::Serialize;
use std::io::Write;

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    /// Verbose output includes file contents
    verbosity: Verbosity,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

/// JSON representation of the full result
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonOutput<'a> {
    summary: JsonSummary,
    updated_artifacts: Vec<JsonChange<'a>>,
    artifact_errors: Vec<JsonError<'a>>,
}

#[derive(Serialize)]
struct JsonSummary {
    additions: usize,
    deletions: usize,
    errors: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonChange<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    path: &'a str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    is_executable: bool,
    /// Content length in bytes, additions only
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<usize>,
    /// Full content, verbose mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    contents: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonError<'a> {
    lock_file: &'a str,
    message: &'a str,
}

impl JsonFormatter {
    fn change_to_json<'a>(&self, change: &'a FileChange) -> JsonChange<'a> {
        match change {
            FileChange::Addition {
                path,
                contents,
                is_executable,
            } => JsonChange {
                kind: "addition",
                path,
                is_executable: *is_executable,
                size: Some(contents.len()),
                contents: (self.verbosity == Verbosity::Verbose).then_some(contents.as_str()),
            },
            FileChange::Deletion { path } => JsonChange {
                kind: "deletion",
                path,
                is_executable: false,
                size: None,
                contents: None,
            },
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, output: &ArtifactsOutput, writer: &mut dyn Write) -> std::io::Result<()> {
        let additions = output
            .updated_artifacts
            .iter()
            .filter(|c| c.is_addition())
            .count();

        let json_output = JsonOutput {
            summary: JsonSummary {
                additions,
                deletions: output.updated_artifacts.len() - additions,
                errors: output.artifact_errors.len(),
            },
            updated_artifacts: output
                .updated_artifacts
                .iter()
                .map(|c| self.change_to_json(c))
                .collect(),
            artifact_errors: output
                .artifact_errors
                .iter()
                .map(|e| JsonError {
                    lock_file: &e.lock_file,
                    message: &e.message,
                })
                .collect(),
        };

        let json = serde_json::to_string_pretty(&json_output).map_err(std::io::Error::other)?;

        writeln!(writer, "{}", json)?;

        Ok(())
    }
}
