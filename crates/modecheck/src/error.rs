//! Error types for the permission engine

use thiserror::Error;

/// Result type for permission engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while verifying permissions
///
/// A path whose parent chain cannot be traversed is *not* an error: its raw
/// mode reads as zero and every check on it answers `false`.
#[derive(Error, Debug)]
pub enum Error {
    /// No identity provider could answer for the current process
    #[error("No {fact} provider available")]
    Environment { fact: &'static str },

    /// A mode mask came out empty; the caller passed a bad class or level
    #[error("Invalid mode mask: {0}")]
    InvalidModeMask(String),

    #[error("Invalid visibility: {0}")]
    InvalidVisibility(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when the error means the process identity could not be determined
    pub fn is_environment(&self) -> bool {
        matches!(self, Error::Environment { .. })
    }
}
