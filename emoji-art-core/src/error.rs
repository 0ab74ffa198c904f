//! Error types for document operations.

use thiserror::Error;

/// Result type for document operations.
pub type CoreResult<T> = Result<T, EmojiArtError>;

/// Errors that can occur in document operations.
///
/// Stale emoji ids are deliberately absent: mutating a vanished emoji is a
/// no-op, reported through the operation's return value instead.
#[derive(Debug, Error)]
pub enum EmojiArtError {
    /// Snapshot bytes could not be turned into a document.
    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// Snapshot serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem access failed while saving or loading.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A named document or palette store does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Image bytes could not be decoded into a displayable image.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Failed to decode image: {0}")]
pub struct DecodeError(pub String);

/// Fetching background bytes failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Connection, TLS, or timeout failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    /// Reading a local file failed.
    #[error("IO error: {0}")]
    Io(String),

    /// A `data:` URL was malformed.
    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),

    /// No fetch strategy exists for this URL scheme.
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// No async runtime was available to run the fetch on.
    #[error("No async runtime available for background fetch")]
    NoRuntime,
}
