//! Error types for the roster-dl library.

use thiserror::Error;

/// Errors that can occur while driving a dashboard session.
#[derive(Error, Debug)]
pub enum Error {
    /// A required setting (the API base URL) is missing or unusable.
    #[error("{0}")]
    Configuration(String),

    /// The extraction service rejected the login.
    #[error("{0}")]
    Authentication(String),

    /// Network failure or non-2xx response from the extraction service.
    #[error("{message}")]
    Transport {
        /// Human-readable detail, taken from the server when available.
        message: String,
        /// HTTP status code, absent for network-level failures.
        status: Option<u16>,
    },

    /// A payload from the service was not valid base64.
    #[error("Could not decode {filename}: {reason}")]
    Decoding {
        /// Server-provided filename of the broken payload.
        filename: String,
        /// Decoder message.
        reason: String,
    },

    /// The action requires an active session.
    #[error("Please log in first.")]
    NotAuthenticated,

    /// The control for this action is disabled while a request is in flight.
    #[error("Another request is already in progress.")]
    Busy,

    /// The response arrived after the session it was issued for ended.
    #[error("Discarded a response for a session that has ended.")]
    StaleResponse,

    /// The artifact's payload was already released.
    #[error("Download {0} is no longer available.")]
    Released(String),

    /// File already exists and force overwrite is disabled.
    #[error("File already exists: {path}")]
    FileExists {
        /// Path to the existing file.
        path: String,
    },

    /// I/O error while saving an artifact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Builds a transport error with an optional status code.
    pub fn transport(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Transport {
            message: message.into(),
            status,
        }
    }

    /// Returns the HTTP status attached to this error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "The server took too long to respond.".to_string()
        } else if err.is_connect() {
            "Could not reach the server.".to_string()
        } else {
            err.to_string()
        };
        Self::Transport {
            message,
            status: err.status().map(|s| s.as_u16()),
        }
    }
}

/// A specialized `Result` type for roster-dl operations.
pub type Result<T> = std::result::Result<T, Error>;
