//! Read-only consistency checks between a port's local declaration, its
//! version ledger, the baseline, and the content store.
//!
//! ## Pipeline summary
//! Checks run in order and the first failure ends that port's
//! verification; ports are independent, and a registry-wide scan always
//! continues past a failing port so CI reports every problem at once.
//! - **History**: the versions file parses and is non-empty.
//! - **Content** (opt-in, slow): every recorded tree resolves in the
//!   store and its manifest agrees with the recorded version.
//! - **Declaration**: the local version is the first history entry, with
//!   the same scheme and the same committed tree.
//! - **Baseline**: an entry exists and equals the first history entry.

use crate::baseline::{load_baseline, BaselineMap};
use crate::cli::VerifyVersionsArgs;
use crate::error::PortError;
use crate::git::{committed_tree_sha, ContentStore, GitContentStore};
use crate::history::load_history;
use crate::manifest::{self, MANIFEST_CANDIDATES};
use crate::registry::RegistryPaths;
use crate::version::{HistoryEntry, SchemedVersion, Version};
use anyhow::Result;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Payload of a passing verification, used for the one-line report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOk {
    pub git_tree: String,
    pub version: Version,
}

/// Everything needed to verify one port against already-loaded state.
pub struct PortCheck<'a> {
    pub port: &'a str,
    pub history_path: &'a Path,
    pub history: &'a [HistoryEntry],
    pub local: &'a SchemedVersion,
    pub local_tree: &'a str,
    pub baseline: &'a BaselineMap,
    pub store: &'a dyn ContentStore,
    pub verify_trees: bool,
}

impl PortCheck<'_> {
    pub fn run(&self) -> Result<VerifyOk, PortError> {
        let port = self.port;
        if self.history.is_empty() {
            return Err(PortError::missing(format!(
                "error: versions file for `{port}` contains no versions: {}",
                self.history_path.display()
            )));
        }

        if self.verify_trees {
            // Older entries are expected to stay retrievable and
            // accurate, so the scan covers the whole ledger.
            for entry in self.history {
                self.check_stored_tree(entry)?;
            }
        }

        let top = &self.history[0];
        let local = &self.local.version;
        if top.version.version != *local {
            if self.history.iter().any(|e| e.version.version == *local) {
                return Err(PortError::conflict(format!(
                    "error: local version `{local}` of `{port}` exists in the versions file \
                     but is not the first entry: {}",
                    self.history_path.display()
                )));
            }
            return Err(PortError::missing(format!(
                "error: version `{local}` was not found in the versions file for `{port}`: {}\n{}",
                self.history_path.display(),
                run_hint(
                    &format!("portv add-version {port}"),
                    "to add the new port version."
                )
            )));
        }

        if top.version.scheme != self.local.scheme {
            return Err(PortError::conflict(format!(
                "error: versions file for `{port}` declares `{local}` with scheme `{}`, but the \
                 local port declares the same version with scheme `{}`: {}\n\
                 A version string must be unique even across schemes.\n{}",
                top.version.scheme.tag(),
                self.local.scheme.tag(),
                self.history_path.display(),
                run_hint(
                    &format!("portv add-version {port} --overwrite-version"),
                    "to deliberately overwrite the recorded scheme."
                )
            )));
        }

        if top.git_tree != self.local_tree {
            return Err(PortError::conflict(format!(
                "error: versions file for `{port}` declares `{local}` with SHA {}, but the local \
                 port content is {}: {}\n\
                 The port content changed without a version update.\n\
                 Update the version fields, then run:\n\n    portv add-version {port}\n\n\
                 to add a new version.",
                top.git_tree,
                self.local_tree,
                self.history_path.display()
            )));
        }

        let Some(baseline_version) = self.baseline.get(port) else {
            return Err(PortError::missing(format!(
                "error: no baseline version found for `{port}`.\n{}",
                run_hint(
                    &format!("portv add-version {port}"),
                    &format!("to set version {local} as the baseline.")
                )
            )));
        };
        if *baseline_version != top.version.version {
            return Err(PortError::conflict(format!(
                "error: the baseline declares version {baseline_version} for `{port}`, but the \
                 first version in {} is {local}\n{}",
                self.history_path.display(),
                run_hint(
                    &format!("portv add-version {port}"),
                    "to update the baseline."
                )
            )));
        }

        Ok(VerifyOk {
            git_tree: top.git_tree.clone(),
            version: top.version.version.clone(),
        })
    }

    /// Fetch `entry`'s manifest from the store and make sure it still
    /// declares the recorded version.
    fn check_stored_tree(&self, entry: &HistoryEntry) -> Result<(), PortError> {
        let port = self.port;
        let recorded = &entry.version.version;
        for candidate in MANIFEST_CANDIDATES {
            let treeish = format!("{}:{candidate}", entry.git_tree);
            let Some(bytes) = self.store.fetch(&treeish)? else {
                continue;
            };
            let stored = manifest::parse_manifest(&bytes, &treeish).map_err(|err| {
                PortError::parse(format!(
                    "error: while validating version `{recorded}` for `{port}`: {err}"
                ))
            })?;
            if stored.version.version != *recorded {
                return Err(PortError::conflict(format!(
                    "error: while validating version `{recorded}` for `{port}`: the manifest \
                     stored at tree {} declares version `{}`",
                    entry.git_tree, stored.version.version
                )));
            }
            return Ok(());
        }
        Err(PortError::missing(format!(
            "error: while validating version `{recorded}` for `{port}`: the checked-out tree {} \
             contains no readable manifest (tried {})",
            entry.git_tree,
            MANIFEST_CANDIDATES.join(", ")
        )))
    }
}

fn run_hint(command: &str, purpose: &str) -> String {
    format!("Run:\n\n    {command}\n\n{purpose}")
}

/// Load everything for one port and run the check pipeline. Never
/// mutates registry state.
pub fn verify_port(
    port: &str,
    paths: &RegistryPaths,
    baseline: &BaselineMap,
    store: &dyn ContentStore,
    verify_trees: bool,
) -> Result<VerifyOk, PortError> {
    let history_path = paths.history_path(port);
    let Some(history) = load_history(&history_path, port)? else {
        return Err(PortError::missing(format!(
            "error: no versions file found for `{port}` at {}\n{}",
            history_path.display(),
            run_hint(&format!("portv add-version {port}"), "to create it.")
        )));
    };
    let (local_manifest, _) = manifest::load_manifest(&paths.port_dir(port), port)?;
    let rel_dir = format!("ports/{port}");
    let local_tree = committed_tree_sha(paths.root(), &rel_dir)?.ok_or_else(|| {
        PortError::missing(format!(
            "error: no committed state found for port `{port}` (HEAD:{rel_dir})\n\
             Commit the port directory before verifying versions."
        ))
    })?;
    PortCheck {
        port,
        history_path: &history_path,
        history: &history,
        local: &local_manifest.version,
        local_tree: &local_tree,
        baseline,
        store,
        verify_trees,
    }
    .run()
}

pub fn run_verify_versions(args: VerifyVersionsArgs) -> Result<ExitCode> {
    let root = args
        .registry_root
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let paths = RegistryPaths::new(root);
    let ports = if args.ports.is_empty() {
        paths.list_ports()?
    } else {
        args.ports.clone()
    };
    let exclude: BTreeSet<&str> = args
        .exclude
        .as_deref()
        .map(|list| list.split(',').map(str::trim).filter(|p| !p.is_empty()))
        .into_iter()
        .flatten()
        .collect();

    // A malformed baseline invalidates the whole scan, not one port.
    let baseline = load_baseline(&paths.baseline_path()).map_err(anyhow::Error::from)?;
    let store = GitContentStore::new(paths.root());

    let mut verified = 0usize;
    let mut failed = 0usize;
    let mut skipped = 0usize;
    for port in &ports {
        if exclude.contains(port.as_str()) {
            skipped += 1;
            if args.verbose {
                println!("SKIP: {port}");
            }
            continue;
        }
        match verify_port(port, &paths, &baseline, &store, args.verify_git_trees) {
            Ok(ok) => {
                verified += 1;
                if args.verbose {
                    println!("OK: {}\t{port} -> {}", ok.git_tree, ok.version);
                }
            }
            Err(PortError::Io(err)) => return Err(err),
            Err(err) => {
                failed += 1;
                eprintln!("{err}");
            }
        }
    }

    println!("{verified} ports verified, {failed} failed, {skipped} skipped");
    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
