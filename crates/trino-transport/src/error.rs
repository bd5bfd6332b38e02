//! Transport error types.

use thiserror::Error;

/// Errors from sending a single HTTP request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request or response exceeded its time budget.
    #[error("request timed out")]
    Timeout,

    /// The request was rejected before it was sent, e.g. a bad URL.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Any other failure while sending or reading the response.
    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// Whether the request may succeed if sent again.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Timeout)
    }
}

/// Errors from the transport registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// A transport was registered after the registry was first used.
    #[error("transport {name:?} registered after the registry was first used")]
    Sealed {
        /// Rejected name.
        name: String,
    },

    /// A transport with this name already exists.
    #[error("transport {name:?} is already registered")]
    Duplicate {
        /// Rejected name.
        name: String,
    },

    /// No transport with this name exists.
    #[error("no transport registered as {name:?}")]
    NotFound {
        /// Requested name.
        name: String,
    },
}
