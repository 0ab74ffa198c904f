//! IO collaborator error types.

use thiserror::Error;

/// Result type for building IO collaborators.
pub type IoResult<T> = Result<T, IoError>;

/// Errors that can occur while setting up decoders and fetchers.
///
/// Failures of individual fetches are reported as
/// [`emoji_art_core::FetchError`] instead.
#[derive(Debug, Error)]
pub enum IoError {
    /// The HTTP client could not be built.
    #[error("HTTP client setup failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A configuration value was out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
