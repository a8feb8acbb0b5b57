//! Port manifest loading and the canonical-formatting gate.

use crate::error::PortError;
use crate::version::{SchemedVersion, VersionFields};
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Manifest filenames probed inside a stored tree, newest layout first.
/// `manifest.json` is the pre-rename name still present in old trees.
pub const MANIFEST_CANDIDATES: [&str; 2] = ["port.json", "manifest.json"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortManifest {
    pub name: String,
    pub version: SchemedVersion,
}

#[derive(Deserialize)]
struct RawManifest {
    name: String,
    #[serde(flatten)]
    version: VersionFields,
    #[serde(rename = "port-version", default)]
    port_version: u32,
}

/// Parse manifest bytes fetched from disk or from the content store.
/// `origin` names the source in diagnostics (a path or a `<sha>:<file>`
/// treeish).
pub fn parse_manifest(bytes: &[u8], origin: &str) -> Result<PortManifest, PortError> {
    let raw: RawManifest = serde_json::from_slice(bytes)
        .map_err(|err| PortError::parse(format!("failed to parse manifest {origin}: {err}")))?;
    let version = raw
        .version
        .into_schemed(raw.port_version)
        .map_err(|err| PortError::parse(format!("invalid manifest {origin}: {err}")))?;
    Ok(PortManifest {
        name: raw.name,
        version,
    })
}

/// Load and parse `ports/<port>/port.json`, returning the raw bytes as
/// well so callers can run the formatting gate on them.
pub fn load_manifest(port_dir: &Path, port: &str) -> Result<(PortManifest, Vec<u8>), PortError> {
    let path = port_dir.join(MANIFEST_CANDIDATES[0]);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(PortError::missing(format!(
                "error: no manifest found for port `{port}` at {}",
                path.display()
            )));
        }
        Err(err) => {
            return Err(PortError::missing(format!(
                "error: failed to read manifest for port `{port}` at {}: {err}",
                path.display()
            )));
        }
    };
    let manifest = parse_manifest(&bytes, &path.display().to_string())?;
    if manifest.name != port {
        return Err(PortError::parse(format!(
            "error: manifest at {} names port `{}` but lives under `ports/{port}`",
            path.display(),
            manifest.name
        )));
    }
    Ok((manifest, bytes))
}

/// The canonical form every manifest is expected to be committed in:
/// sorted keys, 2-space indentation, trailing newline.
pub fn canonical_manifest_text(bytes: &[u8], origin: &str) -> Result<String, PortError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|err| PortError::parse(format!("failed to parse manifest {origin}: {err}")))?;
    let mut text = serde_json::to_string_pretty(&value)
        .map_err(|err| PortError::parse(format!("failed to reserialize manifest {origin}: {err}")))?;
    text.push('\n');
    Ok(text)
}

/// Reject manifests that are not committed in canonical form, so ledger
/// diffs stay mechanical.
pub fn check_formatting(bytes: &[u8], port: &str, path: &Path) -> Result<(), PortError> {
    let canonical = canonical_manifest_text(bytes, &path.display().to_string())?;
    if bytes != canonical.as_bytes() {
        return Err(PortError::conflict(format!(
            "error: the manifest for `{port}` is not in canonical form: {}\n\
             Reformat it with 2-space indentation and sorted keys, or pass \
             `--skip-formatting-check`.",
            path.display()
        )));
    }
    Ok(())
}
