//! Error taxonomy shared by the remote source, the store and the driver.

use std::io;
use std::path::PathBuf;

/// Failure of a single remote request, already classified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Network or server-side trouble. Worth retrying.
    #[error("transient fetch failure: {message}")]
    Transient { message: String, rate_limited: bool },
    /// Credentials missing, rejected or expired beyond refresh. Fatal.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// The source refused the request for good (unknown group, bad payload).
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl FetchError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient { message: message.into(), rate_limited: false }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::Transient { message: message.into(), rate_limited: true }
    }

    /// Map an HTTP status to the taxonomy. Success codes never reach here.
    pub fn from_status(status: u16, context: &str) -> Self {
        match status {
            401 | 403 => Self::Auth(format!("{context}: HTTP {status}")),
            429 => Self::rate_limited(format!("{context}: HTTP 429")),
            500..=599 | 408 => Self::transient(format!("{context}: HTTP {status}")),
            _ => Self::Rejected(format!("{context}: HTTP {status}")),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// A listing item that lacks a field every output row needs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed candidate {}: missing {field}", .id.as_deref().unwrap_or("<no id>"))]
pub struct MalformedCandidate {
    pub id: Option<String>,
    pub field: &'static str,
}

/// Errors that abort a collection run.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("output schema mismatch in {}: {message}", .path.display())]
    Schema { path: PathBuf, message: String },
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CollectError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub(crate) fn schema(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Schema { path: path.into(), message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(FetchError::from_status(401, "search"), FetchError::Auth(_)));
        assert!(matches!(FetchError::from_status(403, "search"), FetchError::Auth(_)));
        assert_eq!(
            FetchError::from_status(429, "search"),
            FetchError::Transient { message: "search: HTTP 429".into(), rate_limited: true }
        );
        assert!(FetchError::from_status(503, "search").is_retryable());
        assert!(!FetchError::from_status(404, "search").is_retryable());
        assert!(matches!(FetchError::from_status(404, "search"), FetchError::Rejected(_)));
    }
}
