//! Manifest load errors.

use std::fmt;

/// A single semantic problem found in a parsed manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestIssue {
    /// Location within the document (e.g., `actions[2].inputs[0]`).
    pub location: String,
    pub message: String,
}

impl ManifestIssue {
    pub fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ManifestIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Error type for manifest loading.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Manifest not found: {0}")]
    NotFound(String),

    #[error("Failed to read manifest {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fetch manifest from {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Malformed manifest: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid manifest: {}", join_issues(.0))]
    Invalid(Vec<ManifestIssue>),
}

impl ManifestError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ManifestError::NotFound(_))
    }
}

fn join_issues(issues: &[ManifestIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
