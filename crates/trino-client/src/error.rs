//! Client error types.

use std::time::Duration;

use thiserror::Error;
use trino_protocol::{ProtocolError, QueryError};
use trino_transport::{RegistryError, TransportError};
use trino_types::TypeError;

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The engine reported that the query failed.
    #[error("query failed (200 OK): \"{}\"", failure_summary(.error))]
    QueryFailed {
        /// Query that failed.
        query_id: String,
        /// Engine error details.
        error: Box<QueryError>,
    },

    /// The coordinator asked for a session change the client refuses.
    #[error("coordinator response contains unsupported header {header}")]
    UnsupportedHeader {
        /// Header name as received.
        header: String,
    },

    /// The statement could not be delivered to the coordinator.
    #[error("failed to submit query: {0}")]
    Submit(#[source] TransportError),

    /// A continuation request failed after retries.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The coordinator answered with a non-200 status.
    #[error("query failed ({status} {reason}): {message:?}")]
    Http {
        /// Status code.
        status: u16,
        /// Reason phrase.
        reason: String,
        /// Response text.
        message: String,
    },

    /// The query was canceled by the caller.
    #[error("query canceled")]
    Canceled,

    /// The query outlived its deadline.
    #[error("query deadline exceeded after {timeout:?}")]
    DeadlineExceeded {
        /// The budget that ran out.
        timeout: Duration,
    },

    /// A value could not be decoded or converted.
    #[error("type error: {0}")]
    Type(#[from] TypeError),

    /// The coordinator sent something the protocol does not allow.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A transport could not be resolved by name.
    #[error("transport registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Network or gateway failure; retried internally before surfacing.
    Transport,
    /// The engine or coordinator rejected the query.
    QueryFailure,
    /// The coordinator asked for an unsupported session change.
    Unsupported,
    /// Canceled by the caller or by a deadline.
    Canceled,
    /// A result value did not match its declared type.
    Decode,
    /// The coordinator violated the protocol.
    Protocol,
    /// Invalid client configuration.
    Config,
}

fn failure_summary(error: &QueryError) -> String {
    match error.failure_type() {
        Some(failure_type) => format!("{failure_type}: {}", error.message),
        None => error.message.clone(),
    }
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::QueryFailed { .. } | Self::Http { .. } => ErrorKind::QueryFailure,
            Self::UnsupportedHeader { .. } => ErrorKind::Unsupported,
            Self::Submit(_) | Self::Transport(_) => ErrorKind::Transport,
            Self::Canceled | Self::DeadlineExceeded { .. } => ErrorKind::Canceled,
            Self::Type(_) => ErrorKind::Decode,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Registry(_) | Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Check if the caller canceled the query.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Check if the query ran out of time.
    #[must_use]
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded { .. })
    }

    /// Check if the engine or coordinator failed the query.
    #[must_use]
    pub fn is_query_failure(&self) -> bool {
        self.kind() == ErrorKind::QueryFailure
    }

    /// Check if this is an unsupported response header.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedHeader { .. })
    }

    /// Check if a result value failed to decode.
    #[must_use]
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::Type(_))
    }

    /// Check if this error is transient and may succeed on retry.
    ///
    /// Connection failures, timeouts and gateway statuses (502, 503, 504)
    /// are transient. Engine failures are not, even when the engine marks
    /// them retriable; use [`Error::query_error`] to inspect that flag.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Submit(e) | Self::Transport(e) => e.is_transient(),
            Self::Http { status, .. } => matches!(status, 502..=504),
            _ => false,
        }
    }

    /// Check if this error indicates a protocol/client bug.
    #[must_use]
    pub fn is_client_bug(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }

    /// The engine's numeric error code, for query failures.
    #[must_use]
    pub fn error_code(&self) -> Option<i32> {
        self.query_error().map(|e| e.error_code)
    }

    /// The engine's error name, e.g. `MISSING_SCHEMA_NAME`.
    #[must_use]
    pub fn error_name(&self) -> Option<&str> {
        self.query_error().map(|e| e.error_name.as_str())
    }

    /// Full engine error details, for query failures.
    #[must_use]
    pub fn query_error(&self) -> Option<&QueryError> {
        match self {
            Self::QueryFailed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
