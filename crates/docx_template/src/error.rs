//! Error types for template filling

use thiserror::Error;
use zip::result::ZipError;

/// Errors that can occur while filling a DOCX template
#[derive(Debug, Error)]
pub enum FillError {
    /// The source archive could not be opened (corrupt or not a ZIP file)
    #[error("Failed to open archive: {0}")]
    ArchiveOpen(#[source] ZipError),

    /// An entry of the source archive could not be read
    #[error("Failed to read entry {entry}: {source}")]
    ArchiveRead {
        entry: String,
        #[source]
        source: ZipError,
    },

    /// The target part is not present in the archive
    #[error("Missing target entry: {0} not found in the archive")]
    MissingTargetEntry(String),

    /// Malformed XML or a read failure in the middle of the target part
    #[error("XML decode error at byte {position}: {message}")]
    Decode { position: u64, message: String },

    /// The target part could not be re-encoded or written
    #[error("XML encode error: {0}")]
    Encode(String),

    /// The destination archive rejected a write
    #[error("Failed to write archive: {0}")]
    Write(#[source] ZipError),

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// IO error (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for template filling
pub type FillResult<T> = std::result::Result<T, FillError>;
