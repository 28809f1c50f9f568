//! Bridge error taxonomy.
//!
//! Preconditions fail fast with no side effects; router-protocol outcomes
//! are distinguished by kind so the host can tailor its message ("cancelled"
//! vs "timed out"); silent login deliberately collapses every failure mode
//! into one opaque error.

use skybridge_protocol::InterfaceName;
use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors surfaced by bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Host identity was never recorded; `getBridgeMetadata` must run first.
    #[error("host identity not set: call getBridgeMetadata before logging in")]
    SkappNotSet,

    /// The interface already has a session (or a login in flight).
    #[error("interface '{name}' is already loaded")]
    AlreadyLoaded { name: InterfaceName },

    /// No session exists for the interface.
    #[error("interface '{name}' not found")]
    NotFound { name: InterfaceName },

    /// A session slot exists but the provider has not finished connecting.
    #[error("provider for interface '{name}' not connected")]
    NotConnected { name: InterfaceName },

    /// The user closed the router without choosing a provider.
    #[error("router closed before a provider was chosen")]
    RouterClosed,

    /// The router reported an internal error.
    #[error("router error: {0}")]
    RouterError(String),

    /// The router stopped answering liveness pings.
    #[error("router stopped responding (no answer within {ms}ms)")]
    RouterTimeout { ms: u64 },

    /// Interactive connect failed after the provider was launched.
    #[error("could not log in with user input: {source}")]
    PopupLogin {
        #[source]
        source: Box<BridgeError>,
    },

    /// Silent login failed; detail is intentionally collapsed.
    #[error("could not log in silently")]
    SilentLogin,

    #[error(transparent)]
    Runtime(#[from] skybridge_runtime::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl BridgeError {
    /// True when the user abandoned the flow rather than anything failing.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BridgeError::RouterClosed)
    }

    /// True for timeouts of any kind (router liveness, handshake).
    pub fn is_timeout(&self) -> bool {
        match self {
            BridgeError::RouterTimeout { .. } => true,
            BridgeError::Runtime(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Stable kind name carried to remote callers so they can classify
    /// failures without parsing messages.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::SkappNotSet => "PreconditionError",
            BridgeError::AlreadyLoaded { .. } => "AlreadyLoadedError",
            BridgeError::NotFound { .. } => "NotFoundError",
            BridgeError::NotConnected { .. } => "NotConnectedError",
            BridgeError::RouterClosed => "RouterClosedError",
            BridgeError::RouterError(_) => "RouterError",
            BridgeError::RouterTimeout { .. } => "TimeoutError",
            BridgeError::PopupLogin { .. } => "LoginError",
            BridgeError::SilentLogin => "SilentLoginError",
            BridgeError::Runtime(e) if e.is_timeout() => "TimeoutError",
            BridgeError::Runtime(_) => "RuntimeError",
            BridgeError::Json(_) => "ProtocolError",
        }
    }
}
