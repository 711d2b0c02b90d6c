//! Error types for endpoints and addresses.

use std::time::Duration;

use crate::address::TransportKind;

/// Result type alias for endpoint operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or using an endpoint.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Address string could not be parsed
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// Transport scheme is known but not available on this endpoint
    #[error("transport '{0}' is not supported by this endpoint")]
    UnsupportedTransport(TransportKind),

    /// Option value rejected at construction
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// Operation not allowed in the endpoint's current state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Deadline elapsed before the operation completed
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Endpoint or its peer connection is closed
    #[error("endpoint closed")]
    Closed,

    /// Failure reported by the messaging library
    #[error("messaging library: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Underlying I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for building an `InvalidAddress` error.
    pub fn invalid_address(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidAddress {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an error from the messaging library.
    pub fn transport(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Transport(Box::new(source))
    }

    /// True when the error is a receive or send deadline expiring.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}
