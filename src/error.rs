use thiserror::Error;

use crate::state::session::InvalidTransition;

/// Convenience alias for fallible synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced by the synchronization core.
///
/// Request/response actions (join, set-words, leave) return these directly so
/// the caller can react. Failures on the push channel never show up here; they
/// surface as a [`ConnectionState`](crate::state::session::ConnectionState)
/// transition instead. Malformed inbound payloads are logged and dropped at
/// the decode boundary and never propagate at all.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Connect, timeout, or IO failure on the REST channel.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Connect or IO failure on the persistent channel.
    #[error("websocket error: {0}")]
    Socket(Box<tokio_tungstenite::tungstenite::Error>),
    /// Non-2xx response from the game server.
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status code returned by the server.
        status: u16,
        /// Message extracted from the response body, or the raw body.
        message: String,
    },
    /// Operation attempted in the wrong session state; rejected locally
    /// without a network call.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Send attempted while the persistent channel is closed. Non-fatal for
    /// best-effort sends such as cell marks.
    #[error("not connected")]
    NotConnected,
    /// Payload could not be serialized for the wire.
    #[error("protocol error: {0}")]
    Protocol(#[from] serde_json::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for SyncError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        SyncError::Socket(Box::new(err))
    }
}

impl From<InvalidTransition> for SyncError {
    fn from(err: InvalidTransition) -> Self {
        SyncError::InvalidState(err.to_string())
    }
}
