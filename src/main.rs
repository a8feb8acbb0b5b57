use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;

mod add_version;
mod atomic;
mod baseline;
mod cli;
mod error;
mod git;
mod history;
mod manifest;
mod registry;
mod verify;
mod version;

use cli::{Command, RootArgs};

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = RootArgs::parse();
    match args.command {
        Command::AddVersion(args) => add_version::run_add_version(args),
        Command::VerifyVersions(args) => verify::run_verify_versions(args),
    }
}
