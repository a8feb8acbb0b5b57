//! Per-port failure taxonomy.

use thiserror::Error;

/// A failure scoped to a single port.
///
/// The checking code only ever constructs these; the orchestrating loop
/// owns the policy of stopping at the first failure versus collecting
/// every failure for one aggregate report. The one exception is `Io`:
/// a filesystem or subprocess failure means the persistence guarantee
/// itself is suspect, so callers must abort the whole run instead of
/// skipping to the next port.
#[derive(Debug, Error)]
pub enum PortError {
    /// Malformed history, baseline, or manifest document.
    #[error("{0}")]
    Parse(String),

    /// The requested mutation or the on-disk state contradicts the ledger.
    #[error("{0}")]
    Conflict(String),

    /// Ledger or store data that should exist does not.
    #[error("{0}")]
    MissingData(String),

    /// Filesystem or subprocess failure. Always fatal for the run.
    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

impl PortError {
    pub fn parse(message: impl Into<String>) -> Self {
        PortError::Parse(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        PortError::Conflict(message.into())
    }

    pub fn missing(message: impl Into<String>) -> Self {
        PortError::MissingData(message.into())
    }
}
