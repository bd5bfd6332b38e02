//! Connection-scoped session state.
//!
//! Trino keeps no session on the server. The client carries catalog,
//! schema, session properties, prepared statements and the open
//! transaction in request headers, and the coordinator asks for changes
//! through response headers. [`SessionState`] is the client's copy.

use std::collections::BTreeMap;

use trino_protocol::headers::{self, parse_property};
use trino_transport::Headers;
use url::form_urlencoded;

use crate::config::{Config, HeaderPolicy};
use crate::error::{Error, Result};

/// Session state shared by all queries of one [`Client`](crate::Client).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Current catalog.
    pub catalog: Option<String>,
    /// Current schema.
    pub schema: Option<String>,
    /// Session properties.
    pub properties: BTreeMap<String, String>,
    /// Prepared statements by name.
    pub prepared_statements: BTreeMap<String, String>,
    /// Open transaction, if any.
    pub transaction_id: Option<String>,
    /// Refused response headers seen so far.
    pub rejected_headers: Vec<String>,
}

impl SessionState {
    /// Initial state from the configured catalog, schema and properties.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            catalog: config.catalog.clone(),
            schema: config.schema.clone(),
            properties: config.session_properties.iter().cloned().collect(),
            ..Self::default()
        }
    }

    /// Fold the session-changing headers of one response into the state.
    ///
    /// Refused headers are checked first; if any is present nothing is
    /// applied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedHeader`] for the first refused header and
    /// [`Error::Protocol`] for a malformed header value.
    pub fn apply_response_headers(
        &mut self,
        response: &Headers,
        policy: &HeaderPolicy,
    ) -> Result<()> {
        if let Some((name, _)) = response.iter().find(|(name, _)| policy.is_rejected(name)) {
            tracing::warn!(header = %name, "coordinator requested an unsupported session change");
            self.rejected_headers.push(name.to_string());
            return Err(Error::UnsupportedHeader {
                header: name.to_string(),
            });
        }

        if let Some(catalog) = response.get(headers::SET_CATALOG) {
            tracing::info!(catalog, "session catalog changed");
            self.catalog = Some(catalog.to_string());
        }
        if let Some(schema) = response.get(headers::SET_SCHEMA) {
            tracing::info!(schema, "session schema changed");
            self.schema = Some(schema.to_string());
        }
        for raw in response.get_all(headers::SET_SESSION) {
            let (name, value) = parse_property(headers::SET_SESSION, raw)?;
            tracing::info!(property = %name, value = %value, "session property set");
            self.properties.insert(name, value);
        }
        for raw in response.get_all(headers::CLEAR_SESSION) {
            let name = raw.trim();
            tracing::info!(property = %name, "session property reset");
            self.properties.remove(name);
        }
        for raw in response.get_all(headers::ADDED_PREPARE) {
            let (name, sql) = parse_property(headers::ADDED_PREPARE, raw)?;
            tracing::debug!(statement = %name, "prepared statement added");
            self.prepared_statements.insert(name, sql);
        }
        for raw in response.get_all(headers::DEALLOCATED_PREPARE) {
            let name = url_decode(raw.trim());
            tracing::debug!(statement = %name, "prepared statement deallocated");
            self.prepared_statements.remove(&name);
        }
        if let Some(id) = response.get(headers::STARTED_TRANSACTION_ID) {
            tracing::info!(transaction_id = id, "transaction started");
            self.transaction_id = Some(id.to_string());
        }
        if response.contains(headers::CLEAR_TRANSACTION_ID) {
            tracing::info!("transaction cleared");
            self.transaction_id = None;
        }
        Ok(())
    }

    /// Request headers for a statement submission.
    ///
    /// `parameterized` is the original SQL when the statement was rewritten
    /// to `EXECUTE ... USING`.
    pub(crate) fn request_headers(&self, config: &Config, parameterized: Option<&str>) -> Headers {
        let mut out = base_headers(config);
        out.insert(headers::SOURCE, config.source.as_str());
        if let Some(catalog) = &self.catalog {
            out.insert(headers::CATALOG, catalog.as_str());
        }
        if let Some(schema) = &self.schema {
            out.insert(headers::SCHEMA, schema.as_str());
        }
        if let Some(time_zone) = &config.time_zone {
            out.insert(headers::TIME_ZONE, time_zone.as_str());
        }
        if !config.client_tags.is_empty() {
            out.insert(
                headers::CLIENT_TAGS,
                headers::encode_list(config.client_tags.iter().map(String::as_str)),
            );
        }
        if let Some(info) = &config.client_info {
            out.insert(headers::CLIENT_INFO, info.as_str());
        }
        if !self.properties.is_empty() {
            out.insert(
                headers::SESSION,
                headers::encode_properties(
                    self.properties.iter().map(|(n, v)| (n.as_str(), v.as_str())),
                ),
            );
        }

        let prepared = self
            .prepared_statements
            .iter()
            .filter(|(name, _)| parameterized.is_none() || *name != headers::PARAMETER_STATEMENT_NAME)
            .map(|(n, v)| (n.as_str(), v.as_str()))
            .chain(parameterized.map(|sql| (headers::PARAMETER_STATEMENT_NAME, sql)));
        let prepared = headers::encode_properties(prepared);
        if !prepared.is_empty() {
            out.insert(headers::PREPARED_STATEMENT, prepared);
        }

        if let Some(id) = &self.transaction_id {
            out.insert(headers::TRANSACTION_ID, id.as_str());
        }
        for (name, value) in &config.extra_headers {
            out.insert(name.as_str(), value.as_str());
        }
        out
    }
}

/// Headers sent with every request, including continuations.
pub(crate) fn base_headers(config: &Config) -> Headers {
    let mut out = Headers::new();
    out.insert(
        headers::USER_AGENT,
        concat!("trino-rust-client/", env!("CARGO_PKG_VERSION")),
    );
    out.insert(headers::USER, config.user.as_str());
    out
}

fn url_decode(value: &str) -> String {
    form_urlencoded::parse(format!("v={value}").as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn response(pairs: &[(&str, &str)]) -> Headers {
        pairs.iter().map(|(n, v)| (*n, *v)).collect()
    }

    #[test]
    fn test_use_updates_catalog_and_schema() {
        let mut session = SessionState::default();
        session
            .apply_response_headers(
                &response(&[(headers::SET_CATALOG, "tpch"), (headers::SET_SCHEMA, "sf1")]),
                &HeaderPolicy::default(),
            )
            .unwrap();
        assert_eq!(session.catalog.as_deref(), Some("tpch"));
        assert_eq!(session.schema.as_deref(), Some("sf1"));
    }

    #[test]
    fn test_session_properties_set_and_cleared() {
        let mut session = SessionState::default();
        let policy = HeaderPolicy::default();
        session
            .apply_response_headers(
                &response(&[
                    (headers::SET_SESSION, "query_max_run_time=10m"),
                    (headers::SET_SESSION, "join_distribution_type=BROADCAST"),
                ]),
                &policy,
            )
            .unwrap();
        assert_eq!(session.properties.len(), 2);

        session
            .apply_response_headers(&response(&[(headers::CLEAR_SESSION, "query_max_run_time")]), &policy)
            .unwrap();
        assert_eq!(
            session.properties.keys().collect::<Vec<_>>(),
            vec!["join_distribution_type"]
        );
    }

    #[test]
    fn test_rejected_header_applies_nothing() {
        let mut session = SessionState::default();
        let err = session
            .apply_response_headers(
                &response(&[(headers::SET_CATALOG, "hive"), (headers::SET_ROLE, "admin")]),
                &HeaderPolicy::default(),
            )
            .unwrap_err();
        assert!(err.is_unsupported());
        assert!(session.catalog.is_none());
        assert_eq!(session.rejected_headers, vec![headers::SET_ROLE.to_string()]);
    }

    #[test]
    fn test_session_updates_rejected_on_request() {
        let mut session = SessionState::default();
        let policy = HeaderPolicy::default().reject_session_updates();
        let err = session
            .apply_response_headers(&response(&[(headers::SET_SESSION, "a=b")]), &policy)
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedHeader { header } if header == headers::SET_SESSION));
    }

    #[test]
    fn test_prepare_and_transaction_tracking() {
        let mut session = SessionState::default();
        let policy = HeaderPolicy::default();
        session
            .apply_response_headers(
                &response(&[
                    (headers::ADDED_PREPARE, "q1=SELECT+%3F"),
                    (headers::STARTED_TRANSACTION_ID, "tx-1"),
                ]),
                &policy,
            )
            .unwrap();
        assert_eq!(session.prepared_statements["q1"], "SELECT ?");
        assert_eq!(session.transaction_id.as_deref(), Some("tx-1"));

        session
            .apply_response_headers(
                &response(&[
                    (headers::DEALLOCATED_PREPARE, "q1"),
                    (headers::CLEAR_TRANSACTION_ID, "true"),
                ]),
                &policy,
            )
            .unwrap();
        assert!(session.prepared_statements.is_empty());
        assert!(session.transaction_id.is_none());
    }

    #[test]
    fn test_request_headers() {
        let config = Config::new()
            .user("alice")
            .catalog("tpch")
            .time_zone("Europe/Paris")
            .client_tag("etl")
            .client_tag("nightly")
            .session_property("query_max_run_time", "10m")
            .extra_header("X-Trino-Trace-Token", "abc");
        let session = SessionState::from_config(&config);
        let out = session.request_headers(&config, Some("SELECT ? + 1"));

        assert_eq!(out.get(headers::USER), Some("alice"));
        assert_eq!(out.get(headers::SOURCE), Some("trino-rust-client"));
        assert_eq!(out.get(headers::CATALOG), Some("tpch"));
        assert!(!out.contains(headers::SCHEMA));
        assert_eq!(out.get(headers::TIME_ZONE), Some("Europe/Paris"));
        assert_eq!(out.get(headers::CLIENT_TAGS), Some("etl,nightly"));
        assert_eq!(out.get(headers::SESSION), Some("query_max_run_time=10m"));
        assert_eq!(
            out.get(headers::PREPARED_STATEMENT),
            Some("_trino_rs=SELECT+%3F+%2B+1")
        );
        assert_eq!(out.get("x-trino-trace-token"), Some("abc"));
        assert!(out.get(headers::USER_AGENT).unwrap().starts_with("trino-rust-client/"));
    }
}
