//! Error types for driver operations

use thiserror::Error;

/// Errors surfaced by a browser driver implementation.
#[derive(Debug, Error, Clone)]
pub enum DriverError {
    /// No element matched the query.
    #[error("no element matches: {0}")]
    NotFound(String),

    /// The element exists but is not visible.
    #[error("element not visible: {0}")]
    NotVisible(String),

    /// The element exists but is not enabled.
    #[error("element not enabled: {0}")]
    NotEnabled(String),

    /// A wait or navigation exceeded its bound.
    #[error("driver timeout: {0}")]
    Timeout(String),

    /// Navigation failed (bad URL, network error, ...).
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Script evaluation threw or was rejected.
    #[error("script evaluation failed: {0}")]
    Script(String),

    /// A download could not be completed.
    #[error("download failed: {0}")]
    Download(String),

    /// File or filesystem error while persisting an artifact.
    #[error("driver I/O error: {0}")]
    Io(String),

    /// The page or session has already been closed.
    #[error("session closed")]
    Closed,

    /// The driver does not support the requested capability.
    #[error("unsupported driver capability: {0}")]
    Unsupported(String),
}

impl DriverError {
    /// Whether a retry of the same call could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DriverError::NotFound(_)
                | DriverError::NotVisible(_)
                | DriverError::Timeout(_)
                | DriverError::Navigation(_)
        )
    }
}
