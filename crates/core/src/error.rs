//! Error types for minx-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.

use thiserror::Error;

/// Result type alias for minx-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for minx-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid or unresolvable virtual path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// No active session, or a named session does not exist
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Remote object or directory does not exist
    #[error("Not found: {0}")]
    ObjectNotFound(String),

    /// Destination already exists and overwrite was not forced
    #[error("Already exists: {0}")]
    ObjectExists(String),

    /// Local or remote I/O failed while moving bytes
    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    /// Enumeration could not start or was aborted mid-stream
    #[error("Listing failed: {0}")]
    ListingFailed(String),

    /// Copy succeeded but the source could not be removed
    #[error("Move incomplete: copied {source_key} to {destination}, but removing the source failed: {reason}")]
    MoveIncomplete {
        source_key: String,
        destination: String,
        reason: String,
    },

    /// Operation stopped by a cancellation request
    #[error("Operation cancelled")]
    Cancelled,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Network error (retryable)
    #[error("Network error: {0}")]
    Network(String),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) => 2,                                  // UsageError
            Error::Config(_) => 2,                                       // UsageError
            Error::Network(_) => 3,                                      // NetworkError
            Error::SessionNotFound(_) => 4,                              // SessionError
            Error::ObjectNotFound(_) => 5,                               // NotFound
            Error::ObjectExists(_) | Error::MoveIncomplete { .. } => 6,  // Conflict
            Error::Cancelled => 130,                                     // Interrupted
            _ => 1,                                                      // GeneralError
        }
    }

    /// Whether this error means the remote object is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ObjectNotFound(_))
    }
}
