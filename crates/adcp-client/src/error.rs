//! Error types for the AdCP task execution client

use thiserror::Error;

/// Errors raised before a task result could be produced.
///
/// A protocol-level rejection reported by the agent is NOT an error: it is
/// returned as [`crate::TaskResult::Failure`].
#[derive(Error, Debug)]
pub enum ClientError {
    /// Client configuration is unusable (bad URL, bad header value)
    #[error("client config error: {0}")]
    Config(String),

    /// Network-level failure (connect, timeout, body read)
    #[error("transport error: {0}")]
    Transport(String),

    /// Agent answered with a non-success HTTP status
    #[error("agent returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Response envelope did not follow the wire protocol
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Success payload did not match the operation's response shape
    #[error("response for {operation} did not match the expected shape: {source}")]
    Decode {
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    /// JSON encoding/decoding error outside of payload decoding
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            ClientError::Http {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
