//! Registry on-disk layout and port discovery.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Derives every path the tool touches from the registry root, so the
/// layout lives in exactly one place.
///
/// ```text
/// <root>/ports/<port>/port.json        port manifest
/// <root>/versions/baseline.json        registry-wide default versions
/// <root>/versions/<letter>-/<port>.json  per-port version history
/// ```
pub struct RegistryPaths {
    root: PathBuf,
}

impl RegistryPaths {
    pub fn new(root: PathBuf) -> Self {
        RegistryPaths { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ports_dir(&self) -> PathBuf {
        self.root.join("ports")
    }

    pub fn port_dir(&self, port: &str) -> PathBuf {
        self.ports_dir().join(port)
    }

    pub fn baseline_path(&self) -> PathBuf {
        self.root.join("versions").join("baseline.json")
    }

    /// History files are sharded by the port's first letter to keep any
    /// one directory small: `versions/c-/curl.json`.
    pub fn history_path(&self, port: &str) -> PathBuf {
        let letter = port
            .chars()
            .next()
            .map(|c| c.to_ascii_lowercase())
            .unwrap_or('_');
        self.root
            .join("versions")
            .join(format!("{letter}-"))
            .join(format!("{port}.json"))
    }

    /// Every port in the registry, sorted by name.
    pub fn list_ports(&self) -> Result<Vec<String>> {
        let ports_dir = self.ports_dir();
        let entries = fs::read_dir(&ports_dir)
            .with_context(|| format!("read ports directory {}", ports_dir.display()))?;
        let mut ports = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| format!("read entry in {}", ports_dir.display()))?;
            if !entry.path().is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                ports.push(name.to_string());
            }
        }
        ports.sort();
        Ok(ports)
    }
}

/// Port names are lowercase alphanumerics with interior dashes, same as
/// the directory names under `ports/`.
pub fn is_valid_port_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && !name.ends_with('-')
        && name
            .bytes()
            .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'-'))
}
