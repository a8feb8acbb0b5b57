//! The per-port version ledger: file codec and update rules.
//!
//! A history file is `{"versions": [...]}` with the newest entry first.
//! Updates are decided strictly before the single atomic rewrite, so a
//! rejected mutation never leaves a partially-written file. Single-writer
//! contract: the caller loads, mutates, and persists within one
//! invocation; there is no cross-process locking.

use crate::atomic::write_atomic;
use crate::error::PortError;
use crate::git::is_tree_sha;
use crate::version::{HistoryEntry, SchemedVersion, VersionFields};
use anyhow::{Context, Result};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// What `update_history` did, so callers can phrase the success line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// No history existed; a new file was created.
    AddedFile,
    /// A new entry was inserted at the front.
    Added,
    /// An existing entry was rewritten in place.
    Overwrote,
    /// The entry was already recorded; nothing was written.
    Unchanged,
}

impl Serialize for HistoryEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Field order is part of the interchange format: git-tree, the
        // scheme-tagged version, port-version.
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("git-tree", &self.git_tree)?;
        map.serialize_entry(self.version.scheme.tag(), &self.version.version.text)?;
        map.serialize_entry("port-version", &self.version.version.port_version)?;
        map.end()
    }
}

#[derive(Serialize)]
struct HistoryFileOut<'a> {
    versions: &'a [HistoryEntry],
}

#[derive(Deserialize)]
struct RawHistoryFile {
    versions: Vec<RawEntry>,
}

#[derive(Deserialize)]
struct RawEntry {
    #[serde(rename = "git-tree")]
    git_tree: String,
    #[serde(flatten)]
    version: VersionFields,
    #[serde(rename = "port-version", default)]
    port_version: u32,
}

/// Parse a history file, or `None` when no file exists for the port.
/// A present-but-malformed file is never skipped.
pub fn load_history(path: &Path, port: &str) -> Result<Option<Vec<HistoryEntry>>, PortError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(PortError::Io(anyhow::Error::new(err).context(format!(
                "read versions file for port `{port}` at {}",
                path.display()
            ))));
        }
    };
    let raw: RawHistoryFile = serde_json::from_slice(&bytes).map_err(|err| {
        PortError::parse(format!(
            "error: failed to parse versions file for port `{port}`: {}\n{err}",
            path.display()
        ))
    })?;
    let mut entries = Vec::with_capacity(raw.versions.len());
    for (index, raw_entry) in raw.versions.into_iter().enumerate() {
        let version = raw_entry
            .version
            .into_schemed(raw_entry.port_version)
            .map_err(|err| {
                PortError::parse(format!(
                    "error: invalid entry {index} in versions file for port `{port}`: {}\n{err}",
                    path.display()
                ))
            })?;
        if !is_tree_sha(&raw_entry.git_tree) {
            return Err(PortError::parse(format!(
                "error: invalid entry {index} in versions file for port `{port}`: {}\n\
                 `git-tree` must be 40 hex characters, got `{}`",
                path.display(),
                raw_entry.git_tree
            )));
        }
        entries.push(HistoryEntry {
            version,
            git_tree: raw_entry.git_tree,
        });
    }
    Ok(Some(entries))
}

pub fn serialize_history(entries: &[HistoryEntry]) -> Result<String> {
    let mut text = serde_json::to_string_pretty(&HistoryFileOut { versions: entries })
        .context("serialize versions file")?;
    text.push('\n');
    Ok(text)
}

fn write_history(path: &Path, entries: &[HistoryEntry]) -> Result<(), PortError> {
    let text = serialize_history(entries)?;
    write_atomic(path, &text)?;
    Ok(())
}

/// Record `(new_version, git_tree)` for `port`, deciding between a fresh
/// front insertion, an in-place overwrite, an idempotent no-op, and the
/// two conflict signatures.
///
/// The overwrite branch rewrites the matching entry at its existing
/// position; it never relocates the entry to the front. The escape hatch
/// exists to repair the recorded tree or scheme of an already-published
/// version, historical ones included, and relocating a historical entry
/// would falsify the newest-first reading of the ledger.
pub fn update_history(
    port: &str,
    new_version: &SchemedVersion,
    git_tree: &str,
    path: &Path,
    overwrite: bool,
) -> Result<UpdateOutcome, PortError> {
    let Some(mut entries) = load_history(path, port)? else {
        let entries = vec![HistoryEntry {
            version: new_version.clone(),
            git_tree: git_tree.to_string(),
        }];
        write_history(path, &entries)?;
        return Ok(UpdateOutcome::AddedFile);
    };

    if let Some(found) = entries.iter().find(|entry| entry.git_tree == git_tree) {
        if found.version.version == new_version.version {
            return Ok(UpdateOutcome::Unchanged);
        }
        return Err(PortError::conflict(format!(
            "error: local files for port `{port}` are identical to version `{}` in {}\n\
             -- SHA: {git_tree}\n\
             -- Did you remember to commit your changes?\n\
             ***No files were updated.***",
            found.version.version,
            path.display()
        )));
    }

    if let Some(found) = entries
        .iter_mut()
        .find(|entry| entry.version.version == new_version.version)
    {
        if !overwrite {
            return Err(PortError::conflict(format!(
                "error: local changes detected for `{port}` but no changes to version or port version\n\
                 -- Version: {}\n\
                 -- Old SHA: {}\n\
                 -- New SHA: {git_tree}\n\
                 -- Did you remember to update the version or port version?\n\
                 -- Pass `--overwrite-version` to bypass this check.\n\
                 ***No files were updated.***",
                new_version.version, found.git_tree
            )));
        }
        found.version = new_version.clone();
        found.git_tree = git_tree.to_string();
        write_history(path, &entries)?;
        return Ok(UpdateOutcome::Overwrote);
    }

    entries.insert(
        0,
        HistoryEntry {
            version: new_version.clone(),
            git_tree: git_tree.to_string(),
        },
    );
    write_history(path, &entries)?;
    Ok(UpdateOutcome::Added)
}
