use crate::baseline::{load_baseline, update_baseline, BaselineMap, BaselineOutcome};
use crate::cli::AddVersionArgs;
use crate::error::PortError;
use crate::git::committed_tree_sha;
use crate::history::{update_history, UpdateOutcome};
use crate::manifest::{check_formatting, load_manifest};
use crate::registry::{is_valid_port_name, RegistryPaths};
use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::process::ExitCode;

pub fn run_add_version(args: AddVersionArgs) -> Result<ExitCode> {
    let root = args
        .registry_root
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let paths = RegistryPaths::new(root);

    let ports = match (&args.port, args.all) {
        (Some(port), false) => vec![port.clone()],
        (None, true) => paths.list_ports()?,
        (None, false) => return Err(anyhow!("specify a port name or pass --all")),
        (Some(_), true) => unreachable!("clap rejects --all with a port name"),
    };

    // One baseline snapshot per invocation; each port's update folds into
    // it and persists at most once per port.
    let baseline_path = paths.baseline_path();
    let mut baseline = load_baseline(&baseline_path).map_err(anyhow::Error::from)?;

    let mut failed = 0usize;
    for port in &ports {
        match add_one(port, &paths, &mut baseline, &args) {
            Ok(()) => {}
            Err(PortError::Io(err)) => return Err(err),
            Err(err) => {
                eprintln!("{err}");
                failed += 1;
                if !args.all {
                    break;
                }
            }
        }
    }

    if failed > 0 {
        tracing::debug!(failed, total = ports.len(), "add-version finished with failures");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn add_one(
    port: &str,
    paths: &RegistryPaths,
    baseline: &mut BaselineMap,
    args: &AddVersionArgs,
) -> Result<(), PortError> {
    if !is_valid_port_name(port) {
        return Err(PortError::parse(format!(
            "error: `{port}` is not a valid port name"
        )));
    }

    let port_dir = paths.port_dir(port);
    let (manifest, raw_bytes) = load_manifest(&port_dir, port)?;
    if !args.skip_formatting_check {
        check_formatting(&raw_bytes, port, &port_dir.join("port.json"))?;
    }

    let rel_dir = format!("ports/{port}");
    let git_tree = committed_tree_sha(paths.root(), &rel_dir)?.ok_or_else(|| {
        PortError::missing(format!(
            "error: no committed state found for port `{port}` (HEAD:{rel_dir})\n\
             Commit the port directory before recording a version."
        ))
    })?;

    let history_path = paths.history_path(port);
    let outcome = update_history(
        port,
        &manifest.version,
        &git_tree,
        &history_path,
        args.overwrite_version,
    )?;
    if args.verbose {
        let version = &manifest.version.version;
        match outcome {
            UpdateOutcome::AddedFile => {
                println!(
                    "Added version `{version}` to `{}` (new file).",
                    history_path.display()
                );
            }
            UpdateOutcome::Added | UpdateOutcome::Overwrote => {
                println!("Added version `{version}` to `{}`.", history_path.display());
            }
            UpdateOutcome::Unchanged => {
                println!(
                    "Version `{version}` is already in `{}`",
                    history_path.display()
                );
            }
        }
    }

    let baseline_path = paths.baseline_path();
    let outcome = update_baseline(port, &manifest.version.version, &baseline_path, baseline)?;
    if args.verbose {
        let version = &manifest.version.version;
        match outcome {
            BaselineOutcome::Added => {
                println!("Added version `{version}` to `{}`.", baseline_path.display());
            }
            BaselineOutcome::Unchanged => {
                println!(
                    "Version `{version}` is already in `{}`",
                    baseline_path.display()
                );
            }
        }
    }

    Ok(())
}
