//! CLI argument parsing module for lockgen

use clap::Parser;
use std::path::PathBuf;

/// Multi-ecosystem lockfile regeneration
#[derive(Parser, Debug, Clone)]
#[command(
    name = "lockgen",
    version,
    about = "Regenerate npm, Yarn and pnpm lockfiles for a set of upgrades"
)]
pub struct CliArgs {
    /// Run plan (.json or .toml)
    #[arg(default_value = "lockgen.json")]
    pub plan: PathBuf,

    /// Repository checkout to work in (default: current directory)
    #[arg(short = 'C', long, default_value = ".")]
    pub dir: PathBuf,

    /// Git remote used to check for existing branches
    #[arg(long, default_value = "origin")]
    pub remote: String,

    // Output options
    /// Output results in JSON format
    #[arg(long)]
    pub json: bool,

    /// Enable quiet mode - minimal output
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable verbose output and debug logging
    #[arg(long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Whether to draw a progress bar
    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.json
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = CliArgs::parse_from(["lockgen"]);
        assert_eq!(args.plan, PathBuf::from("lockgen.json"));
        assert_eq!(args.dir, PathBuf::from("."));
        assert_eq!(args.remote, "origin");
        assert!(!args.json);
        assert!(!args.quiet);
        assert!(!args.verbose);
        assert!(args.show_progress());
    }

    #[test]
    fn test_plan_argument() {
        let args = CliArgs::parse_from(["lockgen", "plans/run.toml"]);
        assert_eq!(args.plan, PathBuf::from("plans/run.toml"));
    }

    #[test]
    fn test_dir_flags() {
        let args = CliArgs::parse_from(["lockgen", "-C", "/repo"]);
        assert_eq!(args.dir, PathBuf::from("/repo"));

        let args = CliArgs::parse_from(["lockgen", "--dir", "/repo"]);
        assert_eq!(args.dir, PathBuf::from("/repo"));
    }

    #[test]
    fn test_quiet_flags() {
        let args = CliArgs::parse_from(["lockgen", "-q"]);
        assert!(args.quiet);
        assert!(!args.show_progress());

        let args = CliArgs::parse_from(["lockgen", "--quiet"]);
        assert!(args.quiet);
    }

    #[test]
    fn test_json_disables_progress() {
        let args = CliArgs::parse_from(["lockgen", "--json"]);
        assert!(args.json);
        assert!(!args.show_progress());
    }

    #[test]
    fn test_combined_flags() {
        let args = CliArgs::parse_from([
            "lockgen",
            "plan.json",
            "--dir",
            "/path/to/repo",
            "--remote",
            "upstream",
            "--verbose",
            "--json",
        ]);
        assert_eq!(args.plan, PathBuf::from("plan.json"));
        assert_eq!(args.dir, PathBuf::from("/path/to/repo"));
        assert_eq!(args.remote, "upstream");
        assert!(args.verbose);
        assert!(args.json);
    }
}
