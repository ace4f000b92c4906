//! Error types for gpt-session

use thiserror::Error;

/// Result type alias for gpt-session operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while authenticating or streaming an answer
#[derive(Error, Debug)]
pub enum Error {
    /// The session exchange produced no usable access token.
    #[error("Unauthorized")]
    Unauthorized,

    /// The conversation endpoint answered with a non-2xx status.
    #[error("{status}")]
    Transport { status: String, body: String },

    /// An event payload could not be decoded.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// No complete answer arrived within the caller's deadline.
    #[error("Timed out after {0:?} waiting for an answer")]
    Timeout(std::time::Duration),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Raw response body attached to a transport failure, if any
    pub fn details(&self) -> Option<&str> {
        match self {
            Error::Transport { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Whether re-prompting for credentials could fix this error
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized)
    }
}
