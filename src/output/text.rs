//! Text output formatter for human-readable display
//!
//! This module provides:
//! - One line per file change, additions and deletions marked
//! - Per-lockfile generator errors
//! - A closing summary line

use crate::domain::{ArtifactsOutput, FileChange};
use crate::output::{OutputFormatter, Verbosity};
use colored::Colorize;
use std::io::Write;

/// Text formatter for human-readable output
pub struct TextFormatter {
    /// Verbosity level
    verbosity: Verbosity,
    /// Whether to use colors
    color: bool,
}

impl TextFormatter {
    /// Create a new text formatter with color option
    pub fn with_color(verbosity: Verbosity, color: bool) -> Self {
        Self { verbosity, color }
    }

    fn format_change(&self, change: &FileChange, writer: &mut dyn Write) -> std::io::Result<()> {
        let (marker, suffix) = match change {
            FileChange::Addition {
                is_executable: true,
                ..
            } => ("+", " (executable)"),
            FileChange::Addition { .. } => ("+", ""),
            FileChange::Deletion { .. } => ("-", ""),
        };

        if self.color {
            let marker = if change.is_addition() {
                marker.green()
            } else {
                marker.red()
            };
            writeln!(writer, "  {} {}{}", marker, change.path(), suffix.dimmed())
        } else {
            writeln!(writer, "  {} {}{}", marker, change.path(), suffix)
        }
    }

    /// First line of a generator message, or all of it in verbose mode
    fn error_text<'a>(&self, message: &'a str) -> &'a str {
        if self.verbosity == Verbosity::Verbose {
            message.trim_end()
        } else {
            message.lines().next().unwrap_or("").trim_end()
        }
    }

    fn format_summary(&self, output: &ArtifactsOutput, writer: &mut dyn Write) -> std::io::Result<()> {
        let changes = output.updated_artifacts.len();
        let errors = output.artifact_errors.len();

        if changes == 0 && errors == 0 {
            if self.color {
                return writeln!(writer, "{}", "No lock file changes".dimmed());
            }
            return writeln!(writer, "No lock file changes");
        }

        if self.color {
            let errors_display = if errors > 0 {
                errors.to_string().red().bold()
            } else {
                errors.to_string().dimmed()
            };
            writeln!(
                writer,
                "{} file change(s), {} error(s)",
                changes.to_string().green(),
                errors_display
            )
        } else {
            writeln!(writer, "{} file change(s), {} error(s)", changes, errors)
        }
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, output: &ArtifactsOutput, writer: &mut dyn Write) -> std::io::Result<()> {
        // In quiet mode, only show summary
        if self.verbosity == Verbosity::Quiet {
            return self.format_summary(output, writer);
        }

        if !output.updated_artifacts.is_empty() {
            if self.color {
                writeln!(writer, "{}:", "Updated artifacts".bold())?;
            } else {
                writeln!(writer, "Updated artifacts:")?;
            }
            for change in &output.updated_artifacts {
                self.format_change(change, writer)?;
            }
            writeln!(writer)?;
        }

        if !output.artifact_errors.is_empty() {
            if self.color {
                writeln!(writer, "{}:", "Errors".red().bold())?;
            } else {
                writeln!(writer, "Errors:")?;
            }
            for error in &output.artifact_errors {
                let message = self.error_text(&error.message);
                if self.color {
                    writeln!(writer, "  {} {}: {}", "✗".red(), error.lock_file.bold(), message)?;
                } else {
                    writeln!(writer, "  - {}: {}", error.lock_file, message)?;
                }
            }
            writeln!(writer)?;
        }

        self.format_summary(output, writer)
    }
}
