//! CLI argument parsing for the version ledger commands.
//!
//! The CLI is intentionally thin: it wires per-port pipelines without
//! embedding policy, so the same checking logic stays testable on its own.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint for the registry version tools.
#[derive(Parser, Debug)]
#[command(
    name = "portv",
    version,
    about = "Version ledger maintenance for a git-backed port registry",
    after_help = "Commands:\n  add-version <port>      Record the port's current version in its versions file and the baseline\n  add-version --all       Record versions for every port, reporting all conflicts\n  verify-versions         Check every port's declaration against its versions file and the baseline\n\nExamples:\n  portv add-version curl\n  portv add-version --all --verbose\n  portv verify-versions --exclude curl,zlib\n  portv verify-versions curl --verify-git-trees",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    AddVersion(AddVersionArgs),
    VerifyVersions(VerifyVersionsArgs),
}

/// Inputs for recording a port's current version.
#[derive(Parser, Debug)]
#[command(about = "Record a port's current version in the ledger")]
pub struct AddVersionArgs {
    /// Port to record (omit when using --all)
    #[arg(value_name = "PORT")]
    pub port: Option<String>,

    /// Registry root (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub registry_root: Option<PathBuf>,

    /// Process versions for all ports, reporting every conflict
    #[arg(long, conflicts_with = "port")]
    pub all: bool,

    /// Overwrite the recorded tree of an existing version
    #[arg(long)]
    pub overwrite_version: bool,

    /// Skip the canonical-formatting check of port manifests
    #[arg(long)]
    pub skip_formatting_check: bool,

    /// Print success messages instead of just errors
    #[arg(long)]
    pub verbose: bool,
}

/// Inputs for the read-only consistency check.
#[derive(Parser, Debug)]
#[command(about = "Verify ports against their versions files and the baseline")]
pub struct VerifyVersionsArgs {
    /// Ports to verify (defaults to every port in the registry)
    #[arg(value_name = "PORT")]
    pub ports: Vec<String>,

    /// Registry root (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub registry_root: Option<PathBuf>,

    /// Print a result line for each port instead of just errors
    #[arg(long)]
    pub verbose: bool,

    /// Verify that each stored tree still matches its recorded version (slow)
    #[arg(long)]
    pub verify_git_trees: bool,

    /// Comma-separated list of ports to skip
    #[arg(long, value_name = "PORTS")]
    pub exclude: Option<String>,
}
