//! Protocol-level error types.

use thiserror::Error;

/// Errors raised while interpreting coordinator responses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// The response body is not a valid result page.
    #[error("malformed result page: {reason}")]
    MalformedPage {
        /// Parser message.
        reason: String,
    },

    /// A page carried both a continuation URI and an error.
    #[error("result page for query {query_id} has both nextUri and error")]
    ContinuationWithError {
        /// Query the page belongs to.
        query_id: String,
    },

    /// A later page reported different columns than the first one.
    #[error("column descriptors changed mid-query for {query_id}")]
    ColumnsChanged {
        /// Query the page belongs to.
        query_id: String,
    },

    /// A page carried data rows before any column descriptors.
    #[error("result page for query {query_id} has data but no columns")]
    DataWithoutColumns {
        /// Query the page belongs to.
        query_id: String,
    },

    /// A row had a different number of cells than there are columns.
    #[error("row has {actual} cells, expected {expected}")]
    RowWidth {
        /// Column count.
        expected: usize,
        /// Cells in the row.
        actual: usize,
    },

    /// A response header value could not be parsed.
    #[error("invalid {header} header value {value:?}: {reason}")]
    InvalidHeader {
        /// Header name.
        header: &'static str,
        /// Raw header value.
        value: String,
        /// What was wrong with it.
        reason: &'static str,
    },
}

impl ProtocolError {
    pub(crate) fn malformed(reason: impl ToString) -> Self {
        Self::MalformedPage {
            reason: reason.to_string(),
        }
    }
}
