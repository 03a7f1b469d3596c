//! CLI command definitions and subcommands

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Plan Pilot - turn model output into executable plans
#[derive(Parser)]
#[command(
    name = "plan-pilot",
    about = "Extract, validate and execute plans from model responses",
    version
)]
pub struct Cli {
    /// Path to config file (default: ~/.plan-pilot/config.json)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the planning-record database (default: ~/.plan-pilot/records.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Extract the plan payload from a response file
    Extract {
        /// Response file, or - for stdin
        input: PathBuf,
    },

    /// Validate the plan in a response file
    Validate {
        /// Response file, or - for stdin
        input: PathBuf,

        /// Project to check file existence against
        #[arg(short, long)]
        project: Option<PathBuf>,
    },

    /// Execute a recorded response against a project
    Run {
        /// Response file, or - for stdin
        input: PathBuf,

        /// Project root
        #[arg(short, long, default_value = ".")]
        project: PathBuf,

        /// The request the response answers
        #[arg(short, long, default_value = "")]
        request: String,

        /// Compile only, touch nothing
        #[arg(long)]
        dry_run: bool,

        /// Directory of recorded follow-up responses for clarification rounds
        #[arg(long)]
        responses: Option<PathBuf>,
    },

    /// Run the feedback loop over recorded responses
    Harden {
        /// The prompt to harden
        #[arg(short, long)]
        prompt: String,

        /// Directory of recorded responses, replayed in file-name order
        #[arg(long)]
        responses: PathBuf,

        /// Override the maximum number of iterations
        #[arg(short, long)]
        max_iterations: Option<u32>,
    },

    /// Manage saved planning records
    Records {
        #[command(subcommand)]
        command: RecordsCommand,
    },
}

/// Planning-record subcommands
#[derive(Subcommand)]
pub enum RecordsCommand {
    /// List the records of a project, newest first
    List {
        #[arg(short, long, default_value = ".")]
        project: PathBuf,
    },

    /// Show one record as JSON
    Show {
        id: String,

        #[arg(short, long, default_value = ".")]
        project: PathBuf,
    },

    /// Delete one record
    Delete {
        id: String,

        #[arg(short, long, default_value = ".")]
        project: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_dry_run() {
        let cli = Cli::parse_from(["plan-pilot", "run", "resp.md", "--project", "/tmp/p", "--dry-run"]);
        match cli.command {
            Command::Run {
                dry_run, project, ..
            } => {
                assert!(dry_run);
                assert_eq!(project, PathBuf::from("/tmp/p"));
            }
            _ => panic!("expected run"),
        }
        assert_eq!(cli.log_level, "warn");
    }

    #[test]
    fn test_parse_records_show() {
        let cli = Cli::parse_from(["plan-pilot", "--log-level", "debug", "records", "show", "abc"]);
        assert!(matches!(
            cli.command,
            Command::Records {
                command: RecordsCommand::Show { .. }
            }
        ));
        assert_eq!(cli.log_level, "debug");
    }
}
