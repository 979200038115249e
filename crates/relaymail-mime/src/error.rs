//! Error types for message parsing.

use std::str::Utf8Error;

/// Result type alias for message operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Message parsing error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed header line.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Address that does not name a mailbox.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Header block is not UTF-8.
    #[error("UTF-8 decode error: {0}")]
    Utf8Decode(#[from] Utf8Error),

    /// Parse error.
    #[error("Parse error: {0}")]
    Parse(String),
}
