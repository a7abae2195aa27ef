/// Structured error handling for the vitals relay
///
/// Every failure the relay can observe maps onto one of these variants. None of
/// them is fatal to a running process: rejected frames are dropped, transport
/// faults stay with the peer that caused them, a lost bridge link reconnects and
/// persistence failures never block the relay path. Only configuration and
/// startup errors end the process, and those surface through the binaries.
use thiserror::Error;

pub type RelayResult<T> = Result<T, RelayError>;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Rejected frame: {reason}")]
    RejectedFrame { reason: String },

    #[error("Transport fault on peer {peer}: {reason}")]
    Transport { peer: u64, reason: String },

    #[error("Link lost: {0}")]
    LinkLost(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Invalid sample: {0}")]
    InvalidSample(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Timeout error: operation timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Hub unavailable: {0}")]
    HubUnavailable(String),
}

impl RelayError {
    /// Errors after which the caller simply carries on with the next event
    pub fn is_recoverable(&self) -> bool {
        match self {
            RelayError::RejectedFrame { .. } => true,
            RelayError::Transport { .. } => true,
            RelayError::LinkLost(_) => true,
            RelayError::Persistence(_) => true,
            RelayError::MalformedMessage(_) => true,
            RelayError::InvalidSample(_) => true,
            RelayError::Http(_) => true,
            RelayError::Timeout { .. } => true,
            _ => false,
        }
    }

    pub fn persistence(err: impl std::fmt::Display) -> Self {
        RelayError::Persistence(err.to_string())
    }

    pub fn malformed(err: impl std::fmt::Display) -> Self {
        RelayError::MalformedMessage(err.to_string())
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RelayError::Http(format!("request timed out: {}", err))
        } else {
            RelayError::Http(err.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RelayError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        RelayError::LinkLost(err.to_string())
    }
}
