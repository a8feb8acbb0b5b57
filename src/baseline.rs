//! The registry-wide baseline: default selected version per port.

use crate::atomic::write_atomic;
use crate::error::PortError;
use crate::version::Version;
use anyhow::{Context, Result};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

pub type BaselineMap = BTreeMap<String, Version>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineOutcome {
    Added,
    Unchanged,
}

// The baseline records no scheme, only the generic `baseline` tag.
struct BaselineVersionOut<'a>(&'a Version);

impl Serialize for BaselineVersionOut<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("baseline", &self.0.text)?;
        map.serialize_entry("port-version", &self.0.port_version)?;
        map.end()
    }
}

struct BaselineFileOut<'a>(&'a BaselineMap);

impl Serialize for BaselineFileOut<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut outer = serializer.serialize_map(Some(1))?;
        let ports: BTreeMap<&str, BaselineVersionOut<'_>> = self
            .0
            .iter()
            .map(|(port, version)| (port.as_str(), BaselineVersionOut(version)))
            .collect();
        outer.serialize_entry("default", &ports)?;
        outer.end()
    }
}

#[derive(Deserialize)]
struct RawBaselineFile {
    default: BTreeMap<String, RawBaselineEntry>,
}

#[derive(Deserialize)]
struct RawBaselineEntry {
    baseline: String,
    #[serde(rename = "port-version", default)]
    port_version: u32,
}

/// Load the baseline document. A missing file is an empty baseline, not
/// an error; the first update creates it.
pub fn load_baseline(path: &Path) -> Result<BaselineMap, PortError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BaselineMap::new()),
        Err(err) => {
            return Err(PortError::Io(anyhow::Error::new(err).context(format!(
                "read baseline file {}",
                path.display()
            ))));
        }
    };
    let raw: RawBaselineFile = serde_json::from_slice(&bytes).map_err(|err| {
        PortError::parse(format!(
            "error: failed to parse baseline file {}\n{err}",
            path.display()
        ))
    })?;
    Ok(raw
        .default
        .into_iter()
        .map(|(port, entry)| (port, Version::new(entry.baseline, entry.port_version)))
        .collect())
}

pub fn serialize_baseline(map: &BaselineMap) -> Result<String> {
    let mut text =
        serde_json::to_string_pretty(&BaselineFileOut(map)).context("serialize baseline file")?;
    text.push('\n');
    Ok(text)
}

/// Bring the baseline entry for `port` up to `version`, rewriting the
/// document only when something actually changed. Same single-writer
/// contract as the history updater: one snapshot per invocation, last
/// writer wins.
pub fn update_baseline(
    port: &str,
    version: &Version,
    path: &Path,
    map: &mut BaselineMap,
) -> Result<BaselineOutcome, PortError> {
    if map.get(port) == Some(version) {
        return Ok(BaselineOutcome::Unchanged);
    }
    map.insert(port.to_string(), version.clone());
    let text = serialize_baseline(map)?;
    write_atomic(path, &text)?;
    Ok(BaselineOutcome::Added)
}
