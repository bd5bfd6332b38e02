//! Client configuration.

use std::time::Duration;

use trino_protocol::headers;
use trino_types::DecimalMode;

use crate::error::{Error, Result};

/// Default coordinator URL.
pub const DEFAULT_SERVER: &str = "http://localhost:8080";

/// Default value of the `X-Trino-Source` header.
pub const DEFAULT_SOURCE: &str = "trino-rust-client";

/// Timeout configuration for the phases of a query.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Time to establish a connection to the coordinator (default: 10s).
    pub connect_timeout: Duration,
    /// Time for a single HTTP exchange (default: 60s).
    pub request_timeout: Duration,
    /// Default budget for a whole query, from submission to the last page
    /// (default: none).
    pub query_timeout: Option<Duration>,
    /// Time allowed for a cancellation `DELETE` (default: 5s).
    pub cancel_timeout: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            query_timeout: None,
            cancel_timeout: Duration::from_secs(5),
        }
    }
}

impl TimeoutConfig {
    /// Create a new timeout configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the default query budget.
    #[must_use]
    pub fn query_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Set the cancellation request timeout.
    #[must_use]
    pub fn cancel_timeout(mut self, timeout: Duration) -> Self {
        self.cancel_timeout = timeout;
        self
    }
}

/// Retry policy for transient HTTP failures.
///
/// Connection failures, request timeouts and gateway statuses (502, 503,
/// 504) are retried with exponential backoff. Engine failures are never
/// retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (default: 3).
    pub max_retries: u32,
    /// Initial backoff duration before first retry (default: 100ms).
    pub initial_backoff: Duration,
    /// Maximum backoff duration between retries (default: 30s).
    pub max_backoff: Duration,
    /// Multiplier for exponential backoff (default: 2.0).
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of retry attempts.
    #[must_use]
    pub fn max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Set the initial backoff duration.
    #[must_use]
    pub fn initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Set the maximum backoff duration.
    #[must_use]
    pub fn max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    /// Set the backoff multiplier for exponential backoff.
    #[must_use]
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Disable automatic retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Calculate the backoff duration for a given retry attempt (1-based).
    #[must_use]
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let base = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = base.min(self.max_backoff.as_secs_f64());
        Duration::try_from_secs_f64(capped).unwrap_or(self.max_backoff)
    }

    /// Check if more retries are allowed after `attempt` retries.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// Which session-changing response headers the client refuses.
///
/// A refused header fails the query with
/// [`Error::UnsupportedHeader`](crate::Error::UnsupportedHeader) instead of
/// silently diverging from what the coordinator believes the session is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPolicy {
    rejected: Vec<String>,
}

impl Default for HeaderPolicy {
    fn default() -> Self {
        Self {
            rejected: headers::DEFAULT_REJECTED
                .iter()
                .map(|h| (*h).to_string())
                .collect(),
        }
    }
}

impl HeaderPolicy {
    /// Create the default policy: path, role and authorization-user changes
    /// are refused.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse an additional header.
    #[must_use]
    pub fn reject(mut self, header: impl Into<String>) -> Self {
        let header = header.into();
        if !self.is_rejected(&header) {
            self.rejected.push(header);
        }
        self
    }

    /// Stop refusing a header.
    #[must_use]
    pub fn allow(mut self, header: &str) -> Self {
        self.rejected.retain(|h| !h.eq_ignore_ascii_case(header));
        self
    }

    /// Also refuse `SET SESSION` and `RESET SESSION` results.
    #[must_use]
    pub fn reject_session_updates(self) -> Self {
        self.reject(headers::SET_SESSION)
            .reject(headers::CLEAR_SESSION)
    }

    /// Whether `header` is refused.
    #[must_use]
    pub fn is_rejected(&self, header: &str) -> bool {
        self.rejected.iter().any(|h| h.eq_ignore_ascii_case(header))
    }

    /// The refused header names.
    #[must_use]
    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }
}

/// Configuration for talking to a Trino coordinator.
///
/// This struct is marked `#[non_exhaustive]` to allow adding new fields
/// in future releases without breaking semver. Use [`Config::new()`] and
/// the builder methods to construct instances.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Coordinator base URL.
    pub server: String,

    /// User the queries run as.
    pub user: String,

    /// Source name reported to the coordinator.
    pub source: String,

    /// Initial session catalog.
    pub catalog: Option<String>,

    /// Initial session schema.
    pub schema: Option<String>,

    /// Session time zone, e.g. `UTC` or `Europe/Paris`.
    pub time_zone: Option<String>,

    /// Client tags for resource group selection.
    pub client_tags: Vec<String>,

    /// Free-form client information.
    pub client_info: Option<String>,

    /// Initial session properties.
    pub session_properties: Vec<(String, String)>,

    /// Extra request headers sent verbatim.
    pub extra_headers: Vec<(String, String)>,

    /// Name of a registered transport to use instead of the default.
    pub transport: Option<String>,

    /// How decimal columns are decoded.
    pub decimal_mode: DecimalMode,

    /// Which session-changing response headers are refused.
    pub header_policy: HeaderPolicy,

    /// Retry policy for transient HTTP failures.
    pub retry: RetryPolicy,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            user: "trino".to_string(),
            source: DEFAULT_SOURCE.to_string(),
            catalog: None,
            schema: None,
            time_zone: None,
            client_tags: Vec::new(),
            client_info: None,
            session_properties: Vec::new(),
            extra_headers: Vec::new(),
            transport: None,
            decimal_mode: DecimalMode::default(),
            header_policy: HeaderPolicy::default(),
            retry: RetryPolicy::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the coordinator base URL.
    #[must_use]
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the user.
    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the source name.
    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Set the initial catalog.
    #[must_use]
    pub fn catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    /// Set the initial schema.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Set the session time zone.
    #[must_use]
    pub fn time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = Some(time_zone.into());
        self
    }

    /// Add a client tag.
    #[must_use]
    pub fn client_tag(mut self, tag: impl Into<String>) -> Self {
        self.client_tags.push(tag.into());
        self
    }

    /// Set the client information string.
    #[must_use]
    pub fn client_info(mut self, info: impl Into<String>) -> Self {
        self.client_info = Some(info.into());
        self
    }

    /// Set an initial session property.
    #[must_use]
    pub fn session_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.session_properties.retain(|(n, _)| *n != name);
        self.session_properties.push((name, value.into()));
        self
    }

    /// Add a request header sent with every request.
    #[must_use]
    pub fn extra_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    /// Use a transport registered under `name`.
    #[must_use]
    pub fn transport(mut self, name: impl Into<String>) -> Self {
        self.transport = Some(name.into());
        self
    }

    /// Set how decimal columns are decoded.
    #[must_use]
    pub fn decimal_mode(mut self, mode: DecimalMode) -> Self {
        self.decimal_mode = mode;
        self
    }

    /// Set the response header policy.
    #[must_use]
    pub fn header_policy(mut self, policy: HeaderPolicy) -> Self {
        self.header_policy = policy;
        self
    }

    /// Refuse `SET SESSION`/`RESET SESSION` results from the coordinator.
    #[must_use]
    pub fn reject_session_updates(mut self) -> Self {
        self.header_policy = self.header_policy.reject_session_updates();
        self
    }

    /// Set the retry policy for transient error handling.
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the maximum number of retry attempts.
    #[must_use]
    pub fn max_retries(mut self, max: u32) -> Self {
        self.retry.max_retries = max;
        self
    }

    /// Set the timeout configuration.
    #[must_use]
    pub fn timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set the default budget for every query.
    #[must_use]
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.query_timeout = Some(timeout);
        self
    }

    /// URL of the statement endpoint.
    #[must_use]
    pub fn statement_url(&self) -> String {
        format!("{}{}", self.server, headers::STATEMENT_PATH)
    }

    /// Check the configuration for values the client cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the server URL does not parse or is not
    /// `http`/`https`, the user is empty, or the retry multiplier is below 1.
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.server)
            .map_err(|e| Error::Config(format!("invalid server URL {:?}: {e}", self.server)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "unsupported server URL scheme {:?}",
                url.scheme()
            )));
        }
        if self.user.trim().is_empty() {
            return Err(Error::Config("user must not be empty".into()));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(Error::Config(format!(
                "backoff multiplier must be at least 1.0, got {}",
                self.retry.backoff_multiplier
            )));
        }
        Ok(())
    }
}
