//! Error types for the delivery pipeline.

use crate::config::ConfigError;
use std::fmt;
use thiserror::Error;

/// Which half of the data transfer failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmissionPhase {
    /// Writing headers and body.
    Write,
    /// Sending the final `.` and reading the relay's verdict.
    Close,
}

impl fmt::Display for TransmissionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Write => f.write_str("sending message"),
            Self::Close => f.write_str("closing message"),
        }
    }
}

/// Fatal pipeline errors. Each kind maps to its own exit status.
#[derive(Debug, Error)]
pub enum Error {
    /// Config file unreadable or structurally broken.
    #[error("parsing configuration: {0}")]
    ConfigParse(#[from] ConfigError),

    /// Message unparsable while scan mode needs its headers.
    #[error("cannot parse message: {0}")]
    Compose(#[from] relaymail_mime::Error),

    /// Dial or greeting failed.
    #[error("{context}: {source}")]
    Connect {
        /// What was being attempted.
        context: String,
        /// Underlying SMTP error.
        #[source]
        source: relaymail_smtp::Error,
    },

    /// STARTTLS failed, or is required but not offered.
    #[error("{0}")]
    Tls(String),

    /// Authentication refused.
    #[error("while authenticating: {0}")]
    Auth(#[source] relaymail_smtp::Error),

    /// Sender or a recipient rejected, or no recipients at all.
    #[error("{0}")]
    Envelope(String),

    /// Data transfer failed.
    #[error("while {phase}: {source}")]
    Transmission {
        /// Write or close.
        phase: TransmissionPhase,
        /// Underlying SMTP error.
        #[source]
        source: relaymail_smtp::Error,
    },

    /// `QUIT` failed after the message was handed over.
    #[error("while closing connection: {0}")]
    SessionClose(#[source] relaymail_smtp::Error),

    /// Invalid invocation.
    #[error("{0}")]
    Usage(String),

    /// Standard input could not be read.
    #[error("reading message: {0}")]
    Input(#[source] std::io::Error),
}

impl Error {
    /// Exit status per `sysexits.h`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) => 64,
            Self::Compose(_) => 65,
            Self::Envelope(_) => 67,
            Self::Connect { .. } => 69,
            Self::Transmission { .. } | Self::Input(_) => 74,
            Self::SessionClose(_) => 75,
            Self::Tls(_) => 76,
            Self::Auth(_) => 77,
            Self::ConfigParse(_) => 78,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
