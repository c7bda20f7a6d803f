//! Gateway error types

use crate::protocol::CloseCode;

/// Result alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Result alias for control-channel requests
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors surfaced by the gateway runtime
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Gateway endpoint discovery failed
    #[error("Gateway discovery failed: {0}")]
    Discovery(String),

    /// The websocket could not be opened
    #[error("Failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The server closed the connection with a code that forbids reconnecting
    #[error("Gateway closed: {0}")]
    Closed(CloseCode),

    #[error("Gave up reconnecting after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    /// Command registration was rejected
    #[error("Failed to register command {command}: {status} {message}")]
    Registration {
        command: String,
        status: u16,
        message: String,
    },

    /// The session is not connected or was not bootstrapped yet
    #[error("Gateway connection is not available")]
    ChannelClosed,
}

/// Control-channel request errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status code
    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

impl GatewayError {
    /// Close code carried by the error, if any
    pub fn close_code(&self) -> Option<CloseCode> {
        match self {
            Self::Closed(code) => Some(*code),
            _ => None,
        }
    }
}
