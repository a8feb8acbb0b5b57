//! Value types for port versions and their comparison schemes.

use serde::Deserialize;
use std::fmt;

/// A declared port version: the display text plus the registry-local
/// revision counter bumped for recipe-only changes.
///
/// Equality is structural. No ordering across version texts is defined
/// here; callers only ever test identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub text: String,
    pub port_version: u32,
}

impl Version {
    pub fn new(text: impl Into<String>, port_version: u32) -> Self {
        Version {
            text: text.into(),
            port_version,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.port_version == 0 {
            write!(f, "{}", self.text)
        } else {
            write!(f, "{}#{}", self.text, self.port_version)
        }
    }
}

/// The version-comparison discipline a port declares. This tool never
/// orders versions by scheme; the tag only has to round-trip and compare
/// equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Relaxed,
    Semver,
    Date,
    String,
}

impl Scheme {
    pub const ALL: [Scheme; 4] = [Scheme::Relaxed, Scheme::Semver, Scheme::Date, Scheme::String];

    /// Serialized field tag for this scheme.
    pub fn tag(self) -> &'static str {
        match self {
            Scheme::Relaxed => "version",
            Scheme::Semver => "version-semver",
            Scheme::Date => "version-date",
            Scheme::String => "version-string",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemedVersion {
    pub version: Version,
    pub scheme: Scheme,
}

impl SchemedVersion {
    pub fn new(version: Version, scheme: Scheme) -> Self {
        SchemedVersion { version, scheme }
    }
}

/// One ledger row: a recorded version and the tree object it was recorded
/// against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub version: SchemedVersion,
    pub git_tree: String,
}

/// The optional scheme-tagged version fields as they appear in manifests
/// and history entries. Exactly one must be present; anything else is a
/// document error, caught before the value reaches the rest of the tool.
#[derive(Debug, Default, Deserialize)]
pub struct VersionFields {
    pub version: Option<String>,
    #[serde(rename = "version-semver")]
    pub version_semver: Option<String>,
    #[serde(rename = "version-date")]
    pub version_date: Option<String>,
    #[serde(rename = "version-string")]
    pub version_string: Option<String>,
}

impl VersionFields {
    pub fn into_schemed(self, port_version: u32) -> Result<SchemedVersion, String> {
        let mut found: Vec<(Scheme, String)> = Vec::new();
        for (scheme, text) in [
            (Scheme::Relaxed, self.version),
            (Scheme::Semver, self.version_semver),
            (Scheme::Date, self.version_date),
            (Scheme::String, self.version_string),
        ] {
            if let Some(text) = text {
                found.push((scheme, text));
            }
        }
        match found.len() {
            1 => {
                let (scheme, text) = found.remove(0);
                Ok(SchemedVersion::new(Version::new(text, port_version), scheme))
            }
            0 => Err(format!(
                "expected one version field ({})",
                all_tags().join(", ")
            )),
            _ => Err(format!(
                "multiple version fields present ({}); exactly one is allowed",
                found
                    .iter()
                    .map(|(scheme, _)| scheme.tag())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

fn all_tags() -> Vec<&'static str> {
    Scheme::ALL.iter().map(|scheme| scheme.tag()).collect()
}
