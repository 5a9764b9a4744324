//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use ratchet_domain::{OutputFormat, VerificationLevel};
use std::path::PathBuf;

/// CLI arguments for ratchet
#[derive(Parser, Debug)]
#[command(name = "ratchet")]
#[command(author, version, about = "Control plane for an autonomous coding agent")]
#[command(long_about = r#"
ratchet plans coding tasks, validates and verifies code edits, and previews
changes before they are written.

Configuration files are loaded from (in priority order):
1. RATCHET_* environment variables (e.g. RATCHET_AGENT__MAX_ITERATIONS=30)
2. --config <path>       Explicit config file
3. ./ratchet.toml        Project-level config (also ./.ratchet.toml)
4. ~/.config/ratchet/config.toml   Global config

Example:
  ratchet plan "Refactor the storage layer to use a trait" --files 6
  ratchet validate src/lib.rs --strict
  ratchet verify src/lib.rs src/main.rs --level standard
  ratchet diff src/lib.rs /tmp/lib.rs.proposed
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Workspace root (default: current directory)
    #[arg(short, long, value_name = "DIR", global = true)]
    pub workspace: Option<PathBuf>,

    /// Output format: text or json (overrides [output] format)
    #[arg(long, value_name = "FORMAT", global = true)]
    pub format: Option<OutputFormat>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify a task and draft its execution plan
    Plan {
        /// Task description
        description: String,

        /// Number of files the task is expected to touch
        #[arg(long, value_name = "N")]
        files: Option<usize>,

        /// Number of lines the task is expected to change
        #[arg(long, value_name = "N")]
        lines: Option<usize>,

        /// Decision for a plan that waits for approval
        #[arg(long, value_enum)]
        decision: Option<DecisionArg>,
    },

    /// Validate a file (syntax, formatting, imports; types with --strict)
    Validate {
        /// File to validate, relative to the workspace
        file: String,

        /// Also run the type checker
        #[arg(long)]
        strict: bool,

        /// Write automatically fixed content back to the file
        #[arg(long)]
        write_fixes: bool,
    },

    /// Run verification checks over changed files
    Verify {
        /// Changed files, relative to the workspace
        #[arg(required = true)]
        files: Vec<String>,

        /// Verification level: minimal, standard or thorough
        #[arg(long, value_name = "LEVEL")]
        level: Option<VerificationLevel>,
    },

    /// Preview the diff between a file and proposed content
    Diff {
        /// Workspace file to compare against
        file: String,

        /// File holding the proposed content
        proposed: PathBuf,
    },

    /// Show the effective configuration
    Config {
        /// List configuration sources and whether they were found
        #[arg(long)]
        sources: bool,
    },
}

/// Decision applied to a plan waiting for approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DecisionArg {
    Approve,
    Reject,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan_with_globals() {
        let cli = Cli::parse_from([
            "ratchet",
            "plan",
            "Add a cache",
            "--files",
            "3",
            "-vv",
            "--format",
            "json",
            "--decision",
            "approve",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.format, Some(OutputFormat::Json));
        match cli.command {
            Command::Plan {
                description,
                files,
                lines,
                decision,
            } => {
                assert_eq!(description, "Add a cache");
                assert_eq!(files, Some(3));
                assert_eq!(lines, None);
                assert_eq!(decision, Some(DecisionArg::Approve));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_verify_level() {
        let cli = Cli::parse_from(["ratchet", "verify", "a.rs", "b.rs", "--level", "thorough"]);
        match cli.command {
            Command::Verify { files, level } => {
                assert_eq!(files, vec!["a.rs", "b.rs"]);
                assert_eq!(level, Some(VerificationLevel::Thorough));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(Cli::try_parse_from(["ratchet", "verify", "a.rs", "--level", "extreme"]).is_err());
        assert!(Cli::try_parse_from(["ratchet", "verify"]).is_err());
    }
}
