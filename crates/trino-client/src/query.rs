//! Query builder.

use std::time::Duration;

use trino_protocol::headers::PARAMETER_STATEMENT_NAME;
use trino_types::{SqlValue, ToSql, TypeError, to_sql_literal};

use crate::cancel::CancelHandle;

/// A statement ready for submission, with optional parameters, deadline and
/// cancellation handle.
///
/// Positional `?` parameters are bound by preparing the statement under a
/// reserved name and running `EXECUTE ... USING` with the values rendered
/// as SQL literals.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use trino_client::Query;
///
/// let query = Query::new("SELECT name FROM tpch.tiny.nation WHERE regionkey = ?")
///     .bind(&1_i64)
///     .timeout(Duration::from_secs(30));
/// assert_eq!(query.params().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Query {
    sql: String,
    params: Vec<SqlValue>,
    bind_error: Option<TypeError>,
    timeout: Option<Duration>,
    cancel: Option<CancelHandle>,
}

/// The wire form of a [`Query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Statement {
    /// Request body.
    pub(crate) body: String,
    /// Original SQL to register under the parameter statement name.
    pub(crate) prepared: Option<String>,
}

impl Query {
    /// Create a query from SQL text.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
            bind_error: None,
            timeout: None,
            cancel: None,
        }
    }

    /// The SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The bound parameter values.
    #[must_use]
    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    /// Bind the next positional parameter.
    ///
    /// A conversion failure is reported when the query is submitted.
    #[must_use]
    pub fn bind<T: ToSql + ?Sized>(mut self, value: &T) -> Self {
        match value.to_sql() {
            Ok(value) => self.params.push(value),
            Err(e) => {
                self.bind_error.get_or_insert(e);
            }
        }
        self
    }

    /// Bind an already converted value.
    #[must_use]
    pub fn bind_value(mut self, value: SqlValue) -> Self {
        self.params.push(value);
        self
    }

    /// Limit the whole query, from submission to the last page, to `timeout`.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a cancellation handle.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub(crate) fn deadline(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn cancel_handle(&self) -> Option<&CancelHandle> {
        self.cancel.as_ref()
    }

    /// Build the request body and the prepared statement to register.
    pub(crate) fn to_statement(&self) -> Result<Statement, TypeError> {
        if let Some(e) = &self.bind_error {
            return Err(e.clone());
        }
        if self.params.is_empty() {
            return Ok(Statement {
                body: self.sql.clone(),
                prepared: None,
            });
        }
        let literals = self
            .params
            .iter()
            .map(to_sql_literal)
            .collect::<Vec<_>>()
            .join(", ");
        Ok(Statement {
            body: format!("EXECUTE {PARAMETER_STATEMENT_NAME} USING {literals}"),
            prepared: Some(self.sql.clone()),
        })
    }
}

impl From<&str> for Query {
    fn from(sql: &str) -> Self {
        Self::new(sql)
    }
}

impl From<String> for Query {
    fn from(sql: String) -> Self {
        Self::new(sql)
    }
}
