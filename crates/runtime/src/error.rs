//! Error types for the skybridge runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the skybridge runtime.
#[derive(Debug, Error)]
pub enum Error {
    /// Channel establishment exhausted its retry budget.
    #[error("handshake timed out after {attempts} attempts")]
    HandshakeTimeout {
        /// Number of SYN attempts made before giving up.
        attempts: u32,
    },

    /// Channel closed (peer gone or `close()` called).
    #[error("channel closed")]
    ChannelClosed,

    /// Transport-level failure (cross-context messaging).
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed or unexpected wire message.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The remote side answered a call with an error.
    #[error("{name}: {message}")]
    Remote {
        /// Error kind reported by the remote side.
        name: String,
        /// Human-readable message.
        message: String,
    },

    /// Failed to create a provider frame.
    #[error("frame creation failed: {0}")]
    FrameCreate(String),

    /// Timeout waiting for an operation.
    #[error("timeout: {0}")]
    Timeout(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if this error is a timeout of any kind.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Timeout(_) | Error::HandshakeTimeout { .. }
        )
    }

    /// Returns the remote error name, if this is a remote error.
    pub fn remote_name(&self) -> Option<&str> {
        match self {
            Error::Remote { name, .. } => Some(name),
            _ => None,
        }
    }
}
