//! Type conversion error types.

use thiserror::Error;

/// Errors that can occur while parsing signatures, decoding wire values
/// or converting values to Rust types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeError {
    /// Value is null when non-null was expected.
    #[error("unexpected null value")]
    UnexpectedNull,

    /// Type mismatch during conversion.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type name.
        expected: &'static str,
        /// Actual type name.
        actual: String,
    },

    /// Value is out of range for target type.
    #[error("value out of range for {target_type}")]
    OutOfRange {
        /// Target type name.
        target_type: &'static str,
    },

    /// A type signature could not be parsed or names an unknown type.
    #[error("invalid type signature {signature:?}: {reason}")]
    InvalidSignature {
        /// The offending signature text.
        signature: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A raw JSON fragment does not match its declared signature.
    #[error("cannot decode {fragment} as {signature}: {reason}")]
    Decode {
        /// Canonical signature the value was decoded against.
        signature: String,
        /// The raw JSON fragment, truncated for display.
        fragment: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Invalid date/time value.
    #[error("invalid date/time: {0}")]
    InvalidDateTime(String),

    /// Invalid decimal value.
    #[error("invalid decimal: {0}")]
    InvalidDecimal(String),

    /// Invalid UUID value.
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    /// Unsupported type conversion.
    #[error("unsupported conversion from {from} to {to}")]
    UnsupportedConversion {
        /// Source type.
        from: String,
        /// Target type.
        to: &'static str,
    },
}

/// Longest raw fragment echoed back in a [`TypeError::Decode`].
const MAX_FRAGMENT_LEN: usize = 120;

impl TypeError {
    /// Build a decode error for `fragment` against `signature`.
    pub fn decode(
        signature: impl ToString,
        fragment: &serde_json::Value,
        reason: impl Into<String>,
    ) -> Self {
        let mut text = fragment.to_string();
        if text.len() > MAX_FRAGMENT_LEN {
            let mut cut = MAX_FRAGMENT_LEN;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
            text.push_str("...");
        }
        Self::Decode {
            signature: signature.to_string(),
            fragment: text,
            reason: reason.into(),
        }
    }

    /// Build an invalid signature error.
    pub fn signature(signature: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSignature {
            signature: signature.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error came from the wire decoder rather than a
    /// caller-side conversion.
    #[must_use]
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::InvalidSignature { .. })
    }
}
