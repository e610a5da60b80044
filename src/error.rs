//! Errors reported by media server clients

use thiserror::Error;

/// Failure of a single server query.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Connection could not be made or was dropped mid-response
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Server returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The server answered but the body was not what we expected
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ServerError {
    pub fn from_status_code(status: u16, message: impl Into<String>) -> Self {
        match status {
            401 | 403 => Self::Unauthorized(message.into()),
            _ => Self::Status {
                status,
                message: message.into(),
            },
        }
    }

    /// Whether repeating the same query might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ServerError::Transport(_) => true,
            ServerError::Status { status, .. } => *status == 429 || *status >= 500,
            ServerError::Unauthorized(_) | ServerError::Decode(_) => false,
        }
    }
}
