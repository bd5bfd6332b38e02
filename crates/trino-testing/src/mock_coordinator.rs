//! In-process mock coordinator for unit testing.
//!
//! [`MockCoordinator`] implements [`Transport`], so a client can be pointed
//! at it directly without any sockets. It speaks the statement protocol:
//! `POST /v1/statement` starts a scripted query and returns the first page,
//! each `GET` of a `nextUri` returns the following page, and `DELETE`
//! cancels the query.
//!
//! ## Features
//!
//! - Scripted responses keyed by statement text
//! - Multi-page results with a configurable page size
//! - Engine failures, update counts and session response headers
//! - Transient gateway errors, slow pages and pages that never arrive
//! - Request recording, including cancellation `DELETE`s
//!
//! ## Example
//!
//! ```rust
//! use trino_protocol::Column;
//! use trino_testing::{MockCoordinator, MockResponse};
//!
//! let coordinator = MockCoordinator::builder()
//!     .with_query(
//!         "SELECT 1",
//!         MockResponse::rows(vec![Column::new("_col0", "integer")], vec![vec![1.into()]]),
//!     )
//!     .build();
//! assert_eq!(coordinator.base_url(), "http://mock-coordinator:8080");
//! ```

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use trino_protocol::headers::STATEMENT_PATH;
use trino_protocol::{Column, FailureInfo, QueryError, QueryResults, StatementStats};
use trino_transport::{
    Headers, HttpRequest, HttpResponse, Method, Transport, TransportError, reason_phrase,
};

/// Default base URL of a mock coordinator.
pub const DEFAULT_BASE_URL: &str = "http://mock-coordinator:8080";

/// Default number of rows per data page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

type Handler = Arc<dyn Fn(&HttpRequest) -> MockResponse + Send + Sync>;

/// What a scripted statement produces.
#[derive(Clone)]
pub enum MockResponse {
    /// Return rows.
    Rows {
        /// Column descriptors.
        columns: Vec<Column>,
        /// Row data as wire JSON cells.
        rows: Vec<Vec<Value>>,
    },

    /// Return an update result (DDL, DML, `USE`, `SET SESSION`).
    Update {
        /// Statement kind, e.g. `INSERT`.
        update_type: String,
        /// Affected rows, if the statement reports them.
        update_count: Option<u64>,
    },

    /// Fail the query.
    Error(QueryError),

    /// Compute the response from the submission request.
    Custom(Handler),
}

impl fmt::Debug for MockResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rows { columns, rows } => f
                .debug_struct("Rows")
                .field("columns", columns)
                .field("rows", &rows.len())
                .finish(),
            Self::Update {
                update_type,
                update_count,
            } => f
                .debug_struct("Update")
                .field("update_type", update_type)
                .field("update_count", update_count)
                .finish(),
            Self::Error(error) => f.debug_tuple("Error").field(&error.error_name).finish(),
            Self::Custom(_) => f.debug_tuple("Custom").field(&"<fn>").finish(),
        }
    }
}

impl MockResponse {
    /// Rows with the given columns.
    pub fn rows(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Self {
        Self::Rows { columns, rows }
    }

    /// Columns but no rows, like `SELECT 1 LIMIT 0`.
    pub fn empty(columns: Vec<Column>) -> Self {
        Self::Rows {
            columns,
            rows: Vec::new(),
        }
    }

    /// An update result.
    pub fn update(update_type: impl Into<String>, update_count: Option<u64>) -> Self {
        Self::Update {
            update_type: update_type.into(),
            update_count,
        }
    }

    /// A `USER_ERROR` failure with the given name and message.
    pub fn user_error(error_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::error(1, error_name, "USER_ERROR", message)
    }

    /// A failure with full engine error details.
    pub fn error(
        error_code: i32,
        error_name: impl Into<String>,
        error_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        Self::Error(QueryError {
            message: message.clone(),
            error_code,
            error_name: error_name.into(),
            error_type: error_type.into(),
            failure_info: Some(FailureInfo {
                failure_type: "io.trino.spi.TrinoException".to_string(),
                message: Some(message),
                cause: None,
            }),
            ..QueryError::default()
        })
    }

    /// Compute the response from the submission request.
    pub fn custom<F>(handler: F) -> Self
    where
        F: Fn(&HttpRequest) -> MockResponse + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(handler))
    }
}

/// A scripted statement: its response plus how the coordinator delivers it.
#[derive(Debug, Clone)]
pub struct MockQuery {
    response: MockResponse,
    response_headers: Vec<(String, String)>,
    queued_pages: usize,
    eager: bool,
    transient_failures: VecDeque<u16>,
    page_delay: Option<Duration>,
    hang: bool,
}

impl MockQuery {
    /// Deliver `response` with default pacing.
    pub fn new(response: MockResponse) -> Self {
        Self {
            response,
            response_headers: Vec::new(),
            queued_pages: 0,
            eager: false,
            transient_failures: VecDeque::new(),
            page_delay: None,
            hang: false,
        }
    }

    /// Send a response header with the final page.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.response_headers.push((name.into(), value.into()));
        self
    }

    /// Insert `count` extra `QUEUED` pages before any data.
    #[must_use]
    pub fn with_queued_pages(mut self, count: usize) -> Self {
        self.queued_pages = count;
        self
    }

    /// Return the first data page directly from the submission.
    #[must_use]
    pub fn eager(mut self) -> Self {
        self.eager = true;
        self
    }

    /// Answer the next `count` continuation requests with `status`.
    #[must_use]
    pub fn with_transient_failures(mut self, status: u16, count: usize) -> Self {
        self.transient_failures.extend(std::iter::repeat_n(status, count));
        self
    }

    /// Delay every continuation response.
    #[must_use]
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = Some(delay);
        self
    }

    /// Never answer continuation requests.
    #[must_use]
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }
}

impl From<MockResponse> for MockQuery {
    fn from(response: MockResponse) -> Self {
        Self::new(response)
    }
}

/// Configuration for a mock coordinator.
#[derive(Debug, Clone)]
pub struct MockCoordinatorConfig {
    /// Base URL used in generated URIs.
    pub base_url: String,
    /// Rows per data page.
    pub page_size: usize,
    /// Scripted statements by text.
    pub queries: HashMap<String, MockQuery>,
    /// Script for statements without an entry.
    pub default_query: Option<MockQuery>,
    /// Fail every request with a connection error.
    pub unreachable: bool,
}

impl Default for MockCoordinatorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            queries: HashMap::new(),
            default_query: None,
            unreachable: false,
        }
    }
}

/// Builder for a mock coordinator.
#[derive(Debug, Default)]
pub struct MockCoordinatorBuilder {
    config: MockCoordinatorConfig,
}

impl MockCoordinatorBuilder {
    /// Create a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the response to a statement.
    #[must_use]
    pub fn with_query(mut self, sql: impl Into<String>, query: impl Into<MockQuery>) -> Self {
        self.config
            .queries
            .insert(sql.into().trim().to_string(), query.into());
        self
    }

    /// Script the response to any statement without its own entry.
    #[must_use]
    pub fn with_default(mut self, query: impl Into<MockQuery>) -> Self {
        self.config.default_query = Some(query.into());
        self
    }

    /// Set the rows per data page.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.config.page_size = page_size.max(1);
        self
    }

    /// Set the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Refuse every connection.
    #[must_use]
    pub fn unreachable(mut self) -> Self {
        self.config.unreachable = true;
        self
    }

    /// Build the coordinator.
    #[must_use]
    pub fn build(self) -> MockCoordinator {
        MockCoordinator {
            inner: Arc::new(Inner {
                config: self.config,
                state: Mutex::new(State::default()),
            }),
        }
    }
}

/// A scriptable coordinator that runs inside the test process.
///
/// Clones share state, so a test can keep one handle for assertions while
/// the client owns another as its transport.
#[derive(Debug, Clone)]
pub struct MockCoordinator {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: MockCoordinatorConfig,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    queries: HashMap<String, RunningQuery>,
    requests: Vec<HttpRequest>,
}

#[derive(Debug)]
struct RunningQuery {
    pages: Vec<QueryResults>,
    final_headers: Vec<(String, String)>,
    transient_failures: VecDeque<u16>,
    page_delay: Option<Duration>,
    hang: bool,
    canceled: bool,
}

enum Step {
    Page {
        page: Box<QueryResults>,
        headers: Vec<(String, String)>,
        delay: Option<Duration>,
    },
    Status(u16),
    Hang,
}

impl MockCoordinator {
    /// Create a builder.
    #[must_use]
    pub fn builder() -> MockCoordinatorBuilder {
        MockCoordinatorBuilder::new()
    }

    /// Base URL to configure the client with.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.config.base_url
    }

    /// Every request received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.inner.state.lock().requests.clone()
    }

    /// Number of requests received with `method`.
    #[must_use]
    pub fn request_count(&self, method: Method) -> usize {
        self.inner
            .state
            .lock()
            .requests
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    /// Statement texts submitted so far.
    #[must_use]
    pub fn submitted_statements(&self) -> Vec<String> {
        self.inner
            .state
            .lock()
            .requests
            .iter()
            .filter(|r| r.method == Method::Post)
            .filter_map(|r| r.body_text().map(str::to_string))
            .collect()
    }

    /// The most recent submission request.
    #[must_use]
    pub fn last_submission(&self) -> Option<HttpRequest> {
        self.inner
            .state
            .lock()
            .requests
            .iter()
            .rev()
            .find(|r| r.method == Method::Post)
            .cloned()
    }

    /// IDs of queries that received a `DELETE`.
    #[must_use]
    pub fn canceled_queries(&self) -> Vec<String> {
        let state = self.inner.state.lock();
        let mut ids: Vec<String> = state
            .queries
            .iter()
            .filter(|(_, q)| q.canceled)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Wait until at least `count` `DELETE` requests have arrived, or the
    /// timeout passes. Returns whether the count was reached.
    pub async fn wait_for_deletes(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.request_count(Method::Delete) >= count {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn submit(&self, request: &HttpRequest) -> HttpResponse {
        let config = &self.inner.config;
        if request.url != format!("{}{STATEMENT_PATH}", config.base_url) {
            return status_response(404);
        }
        let sql = request.body_text().unwrap_or_default().trim().to_string();
        let mut script = config
            .queries
            .get(&sql)
            .or(config.default_query.as_ref())
            .cloned()
            .unwrap_or_else(|| {
                MockQuery::new(MockResponse::user_error(
                    "NOT_SUPPORTED",
                    format!("mock coordinator has no response for {sql:?}"),
                ))
            });
        if let MockResponse::Custom(handler) = &script.response {
            script.response = handler(request);
        }

        let mut state = self.inner.state.lock();
        state.next_id += 1;
        let id = format!("20261015_000000_{:05}_mock0", state.next_id);
        tracing::debug!(query_id = %id, sql = %sql, "mock coordinator accepted statement");

        let pages = build_pages(&id, &script, config);
        let running = RunningQuery {
            pages,
            final_headers: script.response_headers,
            transient_failures: script.transient_failures,
            page_delay: script.page_delay,
            hang: script.hang,
            canceled: false,
        };
        let (first, headers) = running.page(0);
        state.queries.insert(id, running);
        json_response(&first, headers)
    }

    fn step(&self, request: &HttpRequest) -> Step {
        let Some((id, token)) = parse_continuation(&request.url) else {
            return Step::Status(404);
        };
        let mut state = self.inner.state.lock();
        let Some(query) = state.queries.get_mut(id) else {
            return Step::Status(404);
        };
        if query.canceled {
            return Step::Status(410);
        }
        if let Some(status) = query.transient_failures.pop_front() {
            return Step::Status(status);
        }
        if query.hang {
            return Step::Hang;
        }
        if token >= query.pages.len() {
            return Step::Status(404);
        }
        let (page, headers) = query.page(token);
        Step::Page {
            page: Box::new(page),
            headers,
            delay: query.page_delay,
        }
    }

    fn cancel(&self, request: &HttpRequest) -> HttpResponse {
        let Some((id, _)) = parse_continuation(&request.url) else {
            return status_response(404);
        };
        let mut state = self.inner.state.lock();
        match state.queries.get_mut(id) {
            Some(query) => {
                query.canceled = true;
                tracing::debug!(query_id = %id, "mock coordinator canceled query");
                status_response(204)
            }
            None => status_response(404),
        }
    }
}

impl RunningQuery {
    fn page(&self, token: usize) -> (QueryResults, Vec<(String, String)>) {
        let page = self.pages[token].clone();
        let headers = if page.next_uri.is_none() {
            self.final_headers.clone()
        } else {
            Vec::new()
        };
        (page, headers)
    }
}

#[async_trait]
impl Transport for MockCoordinator {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.inner.state.lock().requests.push(request.clone());
        if self.inner.config.unreachable {
            return Err(TransportError::Connect(format!(
                "connection refused: {}",
                self.inner.config.base_url
            )));
        }

        match request.method {
            Method::Post => Ok(self.submit(&request)),
            Method::Delete => Ok(self.cancel(&request)),
            Method::Get => match self.step(&request) {
                Step::Page {
                    page,
                    headers,
                    delay,
                } => {
                    if let Some(delay) = delay {
                        tokio::time::sleep(delay).await;
                    }
                    Ok(json_response(&page, headers))
                }
                Step::Status(status) => Ok(status_response(status)),
                Step::Hang => {
                    std::future::pending::<()>().await;
                    Ok(status_response(504))
                }
            },
        }
    }
}

fn build_pages(id: &str, script: &MockQuery, config: &MockCoordinatorConfig) -> Vec<QueryResults> {
    let page = |state: &str| QueryResults {
        id: id.to_string(),
        info_uri: Some(format!("{}/ui/query.html?{id}", config.base_url)),
        partial_cancel_uri: None,
        next_uri: None,
        columns: None,
        data: None,
        stats: StatementStats {
            state: state.to_string(),
            queued: state == "QUEUED",
            scheduled: state != "QUEUED",
            ..StatementStats::default()
        },
        error: None,
        warnings: Vec::new(),
        update_type: None,
        update_count: None,
    };

    let mut pages = Vec::new();
    if !script.eager {
        pages.push(page("QUEUED"));
    }
    pages.extend(std::iter::repeat_with(|| page("QUEUED")).take(script.queued_pages));

    match &script.response {
        MockResponse::Rows { columns, rows } => {
            let mut processed = 0;
            for chunk in rows.chunks(config.page_size) {
                processed += chunk.len() as u64;
                let mut data_page = page("RUNNING");
                data_page.columns = Some(columns.clone());
                data_page.data = Some(chunk.to_vec());
                data_page.stats.processed_rows = processed;
                pages.push(data_page);
            }
            let mut last = page("FINISHED");
            last.columns = Some(columns.clone());
            last.stats.processed_rows = processed;
            last.stats.progress_percentage = Some(100.0);
            pages.push(last);
        }
        MockResponse::Update {
            update_type,
            update_count,
        } => {
            let mut last = page("FINISHED");
            last.update_type = Some(update_type.clone());
            last.update_count = *update_count;
            pages.push(last);
        }
        MockResponse::Error(error) => {
            let mut last = page("FAILED");
            last.error = Some(error.clone());
            pages.push(last);
        }
        MockResponse::Custom(_) => {
            let mut last = page("FAILED");
            last.error = Some(QueryError {
                message: "custom handler returned another custom handler".to_string(),
                error_name: "GENERIC_INTERNAL_ERROR".to_string(),
                error_type: "INTERNAL_ERROR".to_string(),
                ..QueryError::default()
            });
            pages.push(last);
        }
    }

    let count = pages.len();
    for (token, page) in pages.iter_mut().enumerate().take(count - 1) {
        let next = token + 1;
        let kind = if next <= script.queued_pages && !script.eager {
            "queued"
        } else {
            "executing"
        };
        page.next_uri = Some(format!(
            "{}{STATEMENT_PATH}/{kind}/{id}/y{next}/{next}",
            config.base_url
        ));
    }
    pages
}

/// Extract the query ID and page token from a continuation URI.
fn parse_continuation(url: &str) -> Option<(&str, usize)> {
    let mut segments = url.rsplit('/');
    let token = segments.next()?.parse().ok()?;
    let _slug = segments.next()?;
    let id = segments.next()?;
    Some((id, token))
}

fn json_response(page: &QueryResults, headers: Vec<(String, String)>) -> HttpResponse {
    match serde_json::to_vec(page) {
        Ok(body) => {
            let mut response = HttpResponse::new(200, body);
            response.headers = headers.into_iter().collect::<Headers>();
            response
                .headers
                .insert("Content-Type", "application/json");
            response
        }
        Err(e) => HttpResponse::new(500, e.to_string()),
    }
}

fn status_response(status: u16) -> HttpResponse {
    HttpResponse::new(
        status,
        format!("<html><body>{status} {}</body></html>", reason_phrase(status)),
    )
}
