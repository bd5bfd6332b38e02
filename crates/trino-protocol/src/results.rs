//! Result pages returned by the statement endpoint.
//!
//! Every response to `POST /v1/statement` and to a `GET` of a `nextUri` is a
//! [`QueryResults`] document. A page without `nextUri` is the last one.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;
use crate::state::EngineState;

/// One page of a query's results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResults {
    /// Engine-assigned query ID.
    pub id: String,
    /// Web UI page for the query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_uri: Option<String>,
    /// URI that cancels the current stage only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_cancel_uri: Option<String>,
    /// Continuation URI; absent once the query is terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_uri: Option<String>,
    /// Column descriptors, present once the engine knows the output shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<Column>>,
    /// Rows of raw JSON cells.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Vec<Value>>>,
    /// Execution statistics.
    #[serde(default)]
    pub stats: StatementStats,
    /// Failure details; present only on a failed, terminal page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<QueryError>,
    /// Non-fatal warnings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
    /// Statement kind for non-query statements, e.g. `INSERT` or `USE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_type: Option<String>,
    /// Affected row count for DML statements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_count: Option<u64>,
}

impl QueryResults {
    /// Parse and validate a page from a response body.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedPage`] if the body is not a result
    /// page and [`ProtocolError::ContinuationWithError`] if it carries both
    /// a `nextUri` and an `error`.
    pub fn from_slice(body: &[u8]) -> Result<Self, ProtocolError> {
        let page: Self = serde_json::from_slice(body).map_err(ProtocolError::malformed)?;
        page.validate()?;
        Ok(page)
    }

    /// Check page-local invariants.
    ///
    /// # Errors
    ///
    /// See [`QueryResults::from_slice`].
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.next_uri.is_some() && self.error.is_some() {
            return Err(ProtocolError::ContinuationWithError {
                query_id: self.id.clone(),
            });
        }
        if self.columns.is_none() && self.data.as_ref().is_some_and(|d| !d.is_empty()) {
            return Err(ProtocolError::DataWithoutColumns {
                query_id: self.id.clone(),
            });
        }
        Ok(())
    }

    /// Whether this is the last page of the query.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.next_uri.is_none()
    }

    /// Engine state reported in the stats, if recognized.
    #[must_use]
    pub fn engine_state(&self) -> Option<EngineState> {
        EngineState::parse(&self.stats.state)
    }

    /// Number of data rows on this page.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.data.as_ref().map_or(0, Vec::len)
    }
}

/// A result column descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Textual type signature, e.g. `array(varchar)`.
    #[serde(rename = "type")]
    pub type_name: String,
}

impl Column {
    /// Create a column descriptor.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Execution statistics attached to every page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatementStats {
    /// Engine lifecycle state string, e.g. `RUNNING`.
    pub state: String,
    /// Whether the query is waiting in a resource group queue.
    pub queued: bool,
    /// Whether the query has been scheduled.
    pub scheduled: bool,
    /// Worker nodes involved.
    pub nodes: u32,
    /// Total splits.
    pub total_splits: u64,
    /// Splits waiting to run.
    pub queued_splits: u64,
    /// Splits running.
    pub running_splits: u64,
    /// Splits finished.
    pub completed_splits: u64,
    /// CPU time in milliseconds.
    pub cpu_time_millis: u64,
    /// Wall time in milliseconds.
    pub wall_time_millis: u64,
    /// Queued time in milliseconds.
    pub queued_time_millis: u64,
    /// Elapsed time in milliseconds.
    pub elapsed_time_millis: u64,
    /// Rows processed.
    pub processed_rows: u64,
    /// Bytes processed.
    pub processed_bytes: u64,
    /// Physical input bytes read.
    pub physical_input_bytes: u64,
    /// Peak memory in bytes.
    pub peak_memory_bytes: u64,
    /// Spilled bytes.
    pub spilled_bytes: u64,
    /// Completion estimate, when the engine can compute one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_percentage: Option<f64>,
}

/// Failure details of a failed query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryError {
    /// Human-readable message.
    pub message: String,
    /// SQLSTATE, when the engine provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_state: Option<String>,
    /// Numeric error code.
    pub error_code: i32,
    /// Symbolic error name, e.g. `MISSING_SCHEMA_NAME`.
    pub error_name: String,
    /// Error category, e.g. `USER_ERROR`.
    pub error_type: String,
    /// Whether the engine considers the failure retriable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retriable: Option<bool>,
    /// Position in the statement text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_location: Option<ErrorLocation>,
    /// Exception details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_info: Option<FailureInfo>,
}

impl QueryError {
    /// The failure type if present, e.g. `io.trino.spi.TrinoException`.
    #[must_use]
    pub fn failure_type(&self) -> Option<&str> {
        self.failure_info.as_ref().map(|f| f.failure_type.as_str())
    }
}

/// Line/column position of an error in the statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorLocation {
    /// 1-based line.
    pub line_number: u32,
    /// 1-based column.
    pub column_number: u32,
}

/// Exception information for a failed query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FailureInfo {
    /// Exception class.
    #[serde(rename = "type")]
    pub failure_type: String,
    /// Exception message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Underlying cause.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<FailureInfo>>,
}

/// A non-fatal warning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Warning {
    /// Warning code.
    pub warning_code: WarningCode,
    /// Warning text.
    pub message: String,
}

/// Code and name of a warning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarningCode {
    /// Numeric code.
    pub code: i32,
    /// Symbolic name.
    pub name: String,
}
