//! Streaming query results.
//!
//! A [`QueryStream`] is the client half of one query: it buffers the rows
//! of the current page, follows `nextUri` when the buffer runs dry, folds
//! response headers into the session and tracks the lifecycle state.

use std::collections::VecDeque;
use std::sync::Arc;

use futures_core::Stream;
use parking_lot::Mutex;
use serde_json::Value;
use trino_protocol::{ProtocolError, QueryError, QueryResults, StatementStats, Warning};
use trino_transport::{Headers, HttpRequest, HttpResponse, Method, reason_phrase};
use trino_types::DecodeOptions;

use crate::cancel::CancelHandle;
use crate::error::{Error, Result};
use crate::exchange::Exchange;
use crate::row::{Column, Row};
use crate::session::{SessionState, base_headers};
use crate::state::QueryState;

/// A streaming result set from a query.
///
/// Rows are pulled with [`advance`](Self::advance); it only waits on the
/// network when the current page is exhausted. Dropping or
/// [closing](Self::close) a stream that is still running asks the
/// coordinator to cancel the query.
///
/// # Example
///
/// ```rust,ignore
/// let mut stream = client.query("SELECT * FROM tpch.sf1.orders", &[]).await?;
///
/// while let Some(row) = stream.advance().await? {
///     let orderkey: i64 = row.get(0)?;
///     process(orderkey);
/// }
/// ```
pub struct QueryStream {
    id: String,
    state: QueryState,
    next_uri: Option<String>,
    columns: Option<Arc<[Column]>>,
    raw_columns: Option<Vec<trino_protocol::Column>>,
    buffer: VecDeque<Vec<Value>>,
    stats: StatementStats,
    info_uri: Option<String>,
    update_type: Option<String>,
    update_count: Option<u64>,
    warnings: Vec<Warning>,
    session: Arc<Mutex<SessionState>>,
    submitted: SessionState,
    exchange: Exchange,
    decode: DecodeOptions,
}

impl QueryStream {
    /// Build a stream from the submission response.
    pub(crate) fn open(
        exchange: Exchange,
        session: Arc<Mutex<SessionState>>,
        submitted: SessionState,
        response: &HttpResponse,
    ) -> Result<Self> {
        let decode = DecodeOptions::new().decimal_mode(exchange.config().decimal_mode);
        let mut stream = Self {
            id: String::new(),
            state: QueryState::Created,
            next_uri: None,
            columns: None,
            raw_columns: None,
            buffer: VecDeque::new(),
            stats: StatementStats::default(),
            info_uri: None,
            update_type: None,
            update_count: None,
            warnings: Vec::new(),
            session,
            submitted,
            exchange,
            decode,
        };
        let page = match QueryResults::from_slice(&response.body) {
            Ok(page) => page,
            Err(e) => return Err(stream.fail(e.into())),
        };
        stream.id.clone_from(&page.id);
        tracing::debug!(query_id = %stream.id, info_uri = ?page.info_uri, "query submitted");
        stream.absorb(page, &response.headers)?;
        Ok(stream)
    }

    /// Get the next row.
    ///
    /// Returns `Ok(None)` once the query is drained, and on every call after
    /// that. After an error the stream is terminated and later calls return
    /// `Ok(None)` as well.
    ///
    /// A buffered row is returned without I/O, unless cancellation was
    /// signaled or the deadline passed: interruption wins over buffered rows.
    ///
    /// # Errors
    ///
    /// - [`Error::QueryFailed`] when the engine fails the query
    /// - [`Error::Canceled`] / [`Error::DeadlineExceeded`] on interruption
    /// - [`Error::Http`] / [`Error::Transport`] once retries are exhausted
    /// - [`Error::UnsupportedHeader`] for refused session changes
    /// - [`Error::Type`] / [`Error::Protocol`] for undecodable pages
    pub async fn advance(&mut self) -> Result<Option<Row>> {
        loop {
            if matches!(self.state, QueryState::Failed | QueryState::Canceled) {
                return Ok(None);
            }
            if !self.is_drained() {
                if let Some(error) = self.exchange.interruption() {
                    return Err(self.interrupt(error));
                }
            }
            if let Some(cells) = self.buffer.pop_front() {
                return self.decode_row(cells).map(Some);
            }
            let Some(uri) = self.next_uri.clone() else {
                return Ok(None);
            };
            self.fetch(uri).await?;
        }
    }

    /// Alias for [`advance`](Self::advance).
    ///
    /// # Errors
    ///
    /// See [`advance`](Self::advance).
    pub async fn next_row(&mut self) -> Result<Option<Row>> {
        self.advance().await
    }

    /// Drain the stream into memory.
    ///
    /// # Errors
    ///
    /// See [`advance`](Self::advance).
    pub async fn collect_all(mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.advance().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Read every row, keeping only the count.
    pub(crate) async fn drain(&mut self) -> Result<u64> {
        let mut count = 0;
        while self.advance().await?.is_some() {
            count += 1;
        }
        Ok(count)
    }

    /// Turn the stream into a [`Stream`] of rows. The stream ends after the
    /// first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Row>> + Send {
        futures_util::stream::unfold(Some(self), |state| async move {
            let mut stream = state?;
            match stream.advance().await {
                Ok(Some(row)) => Some((Ok(row), Some(stream))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    /// Stop reading and cancel the query if it is still running.
    ///
    /// The cancellation request is sent in the background; this never waits
    /// for the coordinator.
    pub fn close(&mut self) {
        self.buffer.clear();
        if self.state.is_terminal() {
            return;
        }
        if let Some(uri) = self.next_uri.take() {
            self.exchange.spawn_cancel(uri);
        }
        self.transition(QueryState::Canceled);
        tracing::info!(query_id = %self.id, "query closed");
    }

    /// Query ID assigned by the coordinator.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> QueryState {
        self.state
    }

    /// Column metadata; empty until the coordinator has sent it.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        self.columns.as_deref().unwrap_or_default()
    }

    /// Statistics from the latest page.
    #[must_use]
    pub fn stats(&self) -> &StatementStats {
        &self.stats
    }

    /// URI of the query in the coordinator web UI.
    #[must_use]
    pub fn info_uri(&self) -> Option<&str> {
        self.info_uri.as_deref()
    }

    /// Statement kind for DDL/DML, e.g. `INSERT` or `SET SESSION`.
    #[must_use]
    pub fn update_type(&self) -> Option<&str> {
        self.update_type.as_deref()
    }

    /// Affected row count for DML.
    #[must_use]
    pub fn update_count(&self) -> Option<u64> {
        self.update_count
    }

    /// Warnings reported by the engine so far.
    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Handle that cancels this query.
    #[must_use]
    pub fn cancel_handle(&self) -> &CancelHandle {
        self.exchange.cancel_handle()
    }

    /// Session state as it was when the query was submitted.
    #[must_use]
    pub fn submitted_session(&self) -> &SessionState {
        &self.submitted
    }

    /// Whether the stream has completed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.is_terminal() && self.buffer.is_empty()
    }

    fn is_drained(&self) -> bool {
        self.buffer.is_empty() && self.next_uri.is_none()
    }

    fn transition(&mut self, next: QueryState) {
        if self.state == next {
            return;
        }
        if self.state.can_transition_to(next) {
            tracing::trace!(query_id = %self.id, from = %self.state, to = %next, "state change");
            self.state = next;
        } else {
            tracing::trace!(query_id = %self.id, from = %self.state, to = %next, "ignored state change");
        }
    }

    /// Terminate with `error`: drop buffered rows, cancel server-side if the
    /// query is still running and move to `Failed`.
    fn fail(&mut self, error: Error) -> Error {
        self.buffer.clear();
        if let Some(uri) = self.next_uri.take() {
            self.exchange.spawn_cancel(uri);
        }
        self.transition(QueryState::Failed);
        error
    }

    /// Terminate after cancellation or deadline.
    fn interrupt(&mut self, error: Error) -> Error {
        self.buffer.clear();
        if let Some(uri) = self.next_uri.take() {
            self.exchange.spawn_cancel(uri);
        }
        self.transition(QueryState::Canceled);
        tracing::info!(query_id = %self.id, reason = %error, "query interrupted");
        error
    }

    fn decode_row(&mut self, cells: Vec<Value>) -> Result<Row> {
        let Some(columns) = self.columns.clone() else {
            let error = ProtocolError::DataWithoutColumns {
                query_id: self.id.clone(),
            };
            return Err(self.fail(error.into()));
        };
        Row::decode(columns, cells, &self.decode).map_err(|e| self.fail(e))
    }

    async fn fetch(&mut self, uri: String) -> Result<()> {
        tracing::debug!(query_id = %self.id, uri = %uri, "fetching next page");
        let request =
            HttpRequest::new(Method::Get, uri).with_headers(base_headers(self.exchange.config()));
        let response = match self.exchange.send(request).await {
            Ok(response) => response,
            Err(e @ (Error::Canceled | Error::DeadlineExceeded { .. })) => {
                return Err(self.interrupt(e));
            }
            Err(e) => return Err(self.fail(e)),
        };
        if !response.is_ok() {
            return Err(self.fail(http_error(&response)));
        }
        let page = match QueryResults::from_slice(&response.body) {
            Ok(page) => page,
            Err(e) => return Err(self.fail(e.into())),
        };
        self.absorb(page, &response.headers)
    }

    /// Fold one page into the stream.
    fn absorb(&mut self, page: QueryResults, headers: &Headers) -> Result<()> {
        let reported = page.engine_state().map(QueryState::from);
        self.next_uri = page.next_uri;

        let applied = self
            .session
            .lock()
            .apply_response_headers(headers, &self.exchange.config().header_policy);
        if let Err(e) = applied {
            return Err(self.fail(e));
        }

        self.stats = page.stats;
        if page.info_uri.is_some() {
            self.info_uri = page.info_uri;
        }
        if page.update_type.is_some() {
            self.update_type = page.update_type;
        }
        if page.update_count.is_some() {
            self.update_count = page.update_count;
        }
        for warning in page.warnings {
            if !self.warnings.contains(&warning) {
                tracing::warn!(
                    query_id = %self.id,
                    code = %warning.warning_code.name,
                    message = %warning.message,
                    "engine warning"
                );
                self.warnings.push(warning);
            }
        }

        if let Some(columns) = page.columns {
            if let Err(e) = self.set_columns(columns) {
                return Err(self.fail(e));
            }
        }

        if let Some(data) = page.data {
            let width = self.columns().len();
            if let Some(row) = data.iter().find(|row| row.len() != width) {
                let error = ProtocolError::RowWidth {
                    expected: width,
                    actual: row.len(),
                };
                return Err(self.fail(error.into()));
            }
            tracing::debug!(query_id = %self.id, rows = data.len(), "page received");
            self.buffer.extend(data);
        }

        if let Some(error) = page.error {
            return Err(self.fail(Error::QueryFailed {
                query_id: self.id.clone(),
                error: Box::new(error),
            }));
        }

        if self.next_uri.is_none() {
            if reported == Some(QueryState::Failed) {
                let error = QueryError {
                    message: format!("query {} failed without error details", self.id),
                    error_name: "GENERIC_INTERNAL_ERROR".to_string(),
                    error_type: "INTERNAL_ERROR".to_string(),
                    ..QueryError::default()
                };
                return Err(self.fail(Error::QueryFailed {
                    query_id: self.id.clone(),
                    error: Box::new(error),
                }));
            }
            self.transition(QueryState::Finished);
            tracing::debug!(
                query_id = %self.id,
                processed_rows = self.stats.processed_rows,
                "query finished"
            );
        } else if let Some(state) = reported {
            // The engine reports FINISHED before the client has read the last page.
            let state = if state.is_terminal() {
                QueryState::Running
            } else {
                state
            };
            self.transition(state);
        }
        Ok(())
    }

    fn set_columns(&mut self, columns: Vec<trino_protocol::Column>) -> Result<()> {
        if let Some(existing) = &self.raw_columns {
            if *existing != columns {
                return Err(ProtocolError::ColumnsChanged {
                    query_id: self.id.clone(),
                }
                .into());
            }
            return Ok(());
        }
        let parsed = columns
            .iter()
            .enumerate()
            .map(|(index, c)| Column::new(c.name.as_str(), index, c.type_name.as_str()))
            .collect::<std::result::Result<Arc<[Column]>, _>>()?;
        self.columns = Some(parsed);
        self.raw_columns = Some(columns);
        Ok(())
    }
}

impl Drop for QueryStream {
    fn drop(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        if let Some(uri) = self.next_uri.take() {
            tracing::info!(query_id = %self.id, "query stream dropped while running, canceling");
            self.exchange.spawn_cancel(uri);
        }
    }
}

impl std::fmt::Debug for QueryStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryStream")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("columns", &self.columns().len())
            .field("buffered", &self.buffer.len())
            .field("next_uri", &self.next_uri)
            .finish()
    }
}

/// Map a non-200 response to an error carrying its status and text.
pub(crate) fn http_error(response: &HttpResponse) -> Error {
    Error::Http {
        status: response.status,
        reason: reason_phrase(response.status).to_string(),
        message: response.text(),
    }
}

/// Result of a statement executed for its effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteResult {
    /// Query ID assigned by the coordinator.
    pub query_id: String,
    /// Statement kind, e.g. `CREATE TABLE` or `INSERT`.
    pub update_type: Option<String>,
    /// Affected row count, when the engine reports one.
    pub rows_affected: Option<u64>,
    /// Rows returned by the statement, if any.
    pub rows_returned: u64,
}
