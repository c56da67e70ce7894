//! Error types for the verification server.
//!
//! A rejected segment is not an error: it is a normal verdict. These cover
//! requests the server cannot act on at all.

use thiserror::Error;

/// Result type alias using [`ServerError`].
pub type Result<T> = std::result::Result<T, ServerError>;

/// Server error.
#[derive(Debug, Error)]
pub enum ServerError {
    /// No open session with this id.
    #[error("Unknown session: {0}")]
    UnknownSession(String),

    /// A session with this id is already open.
    #[error("Session already open: {0}")]
    SessionExists(String),

    /// Request line is not valid protocol JSON.
    #[error("Malformed request: {0}")]
    MalformedRequest(#[from] serde_json::Error),

    /// Server configuration is invalid.
    #[error("Invalid server config: {0}")]
    InvalidConfig(String),

    /// A verification worker died before reporting.
    #[error("Verification worker failed: {0}")]
    WorkerFailed(String),

    /// Engine-level failure (bad loadout, corrupt resume point).
    #[error(transparent)]
    Sim(#[from] sim_core::error::SimError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ron::error::SpannedError> for ServerError {
    fn from(e: ron::error::SpannedError) -> Self {
        Self::InvalidConfig(e.to_string())
    }
}
