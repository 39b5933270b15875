//! Error types for the backend link.

use thiserror::Error;

/// Errors produced by the backend link.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The backend connection capability is absent (capability gate).
    #[error("not connected to the word-game backend")]
    BackendUnavailable,

    /// `WebSocket` transport error.
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend closed the connection with a code.
    #[error("connection closed with code {0}")]
    Closed(u16),

    /// The connection task has gone away; the outbound channel is closed.
    #[error("outbound channel closed")]
    ChannelClosed,

    /// Protocol violation (ours or the backend's).
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for LinkError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}
