//! Error types for redwire
//!
//! Provides a unified error type for all client operations.
//!
//! ## Taxonomy
//! - `Connection`: socket/DNS/connect failure. Fatal to the connection.
//! - `Protocol`: the byte stream no longer makes sense. Fatal to the connection.
//! - `Server`: a well-formed `-` reply. The connection stays usable.
//! - `Usage`: the caller broke a state invariant. Raised before any I/O.
//! - `Decode`: a reply could not be converted into the requested type.
//! - `Config`: bad URL or builder input.

use thiserror::Error;

/// Result type alias using RedwireError
pub type Result<T> = std::result::Result<T, RedwireError>;

/// Unified error type for redwire operations
#[derive(Debug, Error)]
pub enum RedwireError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Reply Errors
    // -------------------------------------------------------------------------
    #[error("server error: {0}")]
    Server(String),

    #[error("decode error: {0}")]
    Decode(String),

    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    #[error("usage error: {0}")]
    Usage(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl RedwireError {
    /// True when the error leaves the connection's read position untrustworthy.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RedwireError::Connection(_) | RedwireError::Protocol(_))
    }

    /// True for a `-` reply sent by the server.
    pub fn is_server(&self) -> bool {
        matches!(self, RedwireError::Server(_))
    }

    /// True when the caller violated a connection or batch invariant.
    pub fn is_usage(&self) -> bool {
        matches!(self, RedwireError::Usage(_))
    }

    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        RedwireError::Protocol(msg.into())
    }

    pub(crate) fn usage(msg: impl Into<String>) -> Self {
        RedwireError::Usage(msg.into())
    }

    pub(crate) fn decode(msg: impl Into<String>) -> Self {
        RedwireError::Decode(msg.into())
    }
}
