//! Trino client implementation.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use trino_transport::{HttpRequest, Method, ReqwestTransport, Transport, TransportRegistry};
use trino_types::ToSql;

use crate::cancel::CancelHandle;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::exchange::Exchange;
use crate::query::Query;
use crate::session::SessionState;
use crate::stream::{ExecuteResult, QueryStream, http_error};

/// A client bound to one coordinator and one session.
///
/// The client is cheap to clone; clones share the transport and the session
/// state, so a `USE` or `SET SESSION` run through one clone is seen by the
/// others. Queries are independent: each [`QueryStream`] can be driven from
/// its own task.
///
/// # Example
///
/// ```rust,ignore
/// use trino_client::{Client, Config};
///
/// let client = Client::new(Config::new().server("http://localhost:8080").user("analyst"))?;
/// let mut stream = client.query("SELECT * FROM system.runtime.nodes", &[]).await?;
/// while let Some(row) = stream.advance().await? {
///     let node_id: String = row.get_by_name("node_id")?;
///     println!("{node_id}");
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: Arc<Config>,
    transport: Arc<dyn Transport>,
    session: Arc<Mutex<SessionState>>,
}

impl Client {
    /// Create a client using the default HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an invalid configuration and
    /// [`Error::Transport`] if the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(
            config.timeouts.connect_timeout,
            config.timeouts.request_timeout,
        )?;
        Self::build(config, Arc::new(transport))
    }

    /// Create a client on top of a caller-supplied transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an invalid configuration.
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        Self::build(config, transport)
    }

    /// Create a client using the transport named by [`Config::transport`],
    /// or the default HTTP transport when none is named.
    ///
    /// The lookup seals `registry` against further registrations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Registry`] if no transport is registered under the
    /// configured name.
    pub fn with_registry(config: Config, registry: &TransportRegistry) -> Result<Self> {
        match config.transport.clone() {
            Some(name) => {
                let transport = registry.get(&name)?;
                tracing::debug!(transport = %name, "using registered transport");
                Self::with_transport(config, transport)
            }
            None => Self::new(config),
        }
    }

    fn build(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        let session = SessionState::from_config(&config);
        Ok(Self {
            inner: Arc::new(ClientInner {
                config: Arc::new(config),
                transport,
                session: Arc::new(Mutex::new(session)),
            }),
        })
    }

    /// The client configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// A snapshot of the current session state.
    #[must_use]
    pub fn session(&self) -> SessionState {
        self.inner.session.lock().clone()
    }

    /// Submit a query and return its result stream.
    ///
    /// The stream has absorbed the first page; no rows have been read yet.
    ///
    /// # Errors
    ///
    /// - [`Error::Submit`] if the statement could not be delivered
    /// - [`Error::Http`] if the coordinator refused it
    /// - [`Error::Canceled`] / [`Error::DeadlineExceeded`] on interruption
    /// - [`Error::Type`] if a parameter could not be bound
    pub async fn submit(&self, query: Query) -> Result<QueryStream> {
        let config = &self.inner.config;
        let statement = query.to_statement()?;
        let cancel = query.cancel_handle().cloned().unwrap_or_else(CancelHandle::new);
        let timeout = query.deadline().or(config.timeouts.query_timeout);
        let exchange = Exchange::new(
            Arc::clone(&self.inner.transport),
            Arc::clone(config),
            cancel,
            timeout,
        );

        let submitted = self.session();
        let headers = submitted.request_headers(config, statement.prepared.as_deref());
        tracing::debug!(
            sql = %query.sql(),
            params_count = query.params().len(),
            timeout_ms = timeout.map(|t| t.as_millis() as u64),
            "submitting query"
        );
        let request = HttpRequest::new(Method::Post, config.statement_url())
            .with_headers(headers)
            .with_body(statement.body);

        let response = match exchange.send(request).await {
            Ok(response) => response,
            Err(Error::Transport(e)) => return Err(Error::Submit(e)),
            Err(e) => return Err(e),
        };
        if !response.is_ok() {
            return Err(http_error(&response));
        }
        QueryStream::open(exchange, Arc::clone(&self.inner.session), submitted, &response)
    }

    /// Execute a query with positional parameters.
    ///
    /// # Errors
    ///
    /// See [`Client::submit`].
    pub async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<QueryStream> {
        self.submit(bind_all(Query::new(sql), params)).await
    }

    /// Execute a query whose whole lifetime, from submission to the last
    /// page, is limited to `timeout`.
    ///
    /// # Errors
    ///
    /// See [`Client::submit`]; reading the stream past the deadline fails
    /// with [`Error::DeadlineExceeded`].
    pub async fn query_with_timeout(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
        timeout: Duration,
    ) -> Result<QueryStream> {
        self.submit(bind_all(Query::new(sql), params).timeout(timeout))
            .await
    }

    /// Execute a statement, reading and discarding any rows.
    ///
    /// # Errors
    ///
    /// See [`QueryStream::advance`].
    pub async fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<ExecuteResult> {
        let mut stream = self.query(sql, params).await?;
        let rows_returned = stream.drain().await?;
        Ok(ExecuteResult {
            query_id: stream.id().to_string(),
            update_type: stream.update_type().map(str::to_string),
            rows_affected: stream.update_count(),
            rows_returned,
        })
    }

    /// Execute a statement without parameters, discarding the result.
    ///
    /// # Errors
    ///
    /// See [`QueryStream::advance`].
    pub async fn simple_query(&self, sql: &str) -> Result<()> {
        tracing::debug!(sql = sql, "executing simple query");
        self.execute(sql, &[]).await.map(|_| ())
    }
}

fn bind_all(query: Query, params: &[&(dyn ToSql + Sync)]) -> Query {
    params.iter().fold(query, |query, param| query.bind(*param))
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("server", &self.inner.config.server)
            .field("user", &self.inner.config.user)
            .field("transport", &self.inner.transport)
            .finish()
    }
}
