//! Header names and header value codecs.
//!
//! Session state travels in `X-Trino-*` request headers; the coordinator
//! asks the client to change it through `X-Trino-Set-*`/`X-Trino-Clear-*`
//! response headers.

use url::form_urlencoded;

use crate::error::ProtocolError;

/// Path of the statement submission endpoint.
pub const STATEMENT_PATH: &str = "/v1/statement";

/// Name of the prepared statement used for positional parameters.
pub const PARAMETER_STATEMENT_NAME: &str = "_trino_rs";

// Request headers

/// Authenticated user.
pub const USER: &str = "X-Trino-User";
/// Client application name.
pub const SOURCE: &str = "X-Trino-Source";
/// Default catalog.
pub const CATALOG: &str = "X-Trino-Catalog";
/// Default schema.
pub const SCHEMA: &str = "X-Trino-Schema";
/// Session time zone.
pub const TIME_ZONE: &str = "X-Trino-Time-Zone";
/// Comma-separated client tags.
pub const CLIENT_TAGS: &str = "X-Trino-Client-Tags";
/// Free-form client information.
pub const CLIENT_INFO: &str = "X-Trino-Client-Info";
/// Comma-separated `name=value` session properties.
pub const SESSION: &str = "X-Trino-Session";
/// Comma-separated `name=sql` prepared statements.
pub const PREPARED_STATEMENT: &str = "X-Trino-Prepared-Statement";
/// Open transaction ID.
pub const TRANSACTION_ID: &str = "X-Trino-Transaction-Id";
/// User agent.
pub const USER_AGENT: &str = "User-Agent";

// Response headers

/// Switch the session catalog (`USE`).
pub const SET_CATALOG: &str = "X-Trino-Set-Catalog";
/// Switch the session schema (`USE`).
pub const SET_SCHEMA: &str = "X-Trino-Set-Schema";
/// Switch the SQL path (`SET PATH`).
pub const SET_PATH: &str = "X-Trino-Set-Path";
/// Set a session property (`SET SESSION`).
pub const SET_SESSION: &str = "X-Trino-Set-Session";
/// Reset a session property (`RESET SESSION`).
pub const CLEAR_SESSION: &str = "X-Trino-Clear-Session";
/// Switch the active role (`SET ROLE`).
pub const SET_ROLE: &str = "X-Trino-Set-Role";
/// Register a prepared statement (`PREPARE`).
pub const ADDED_PREPARE: &str = "X-Trino-Added-Prepare";
/// Drop a prepared statement (`DEALLOCATE PREPARE`).
pub const DEALLOCATED_PREPARE: &str = "X-Trino-Deallocated-Prepare";
/// A transaction was started.
pub const STARTED_TRANSACTION_ID: &str = "X-Trino-Started-Transaction-Id";
/// The transaction ended.
pub const CLEAR_TRANSACTION_ID: &str = "X-Trino-Clear-Transaction-Id";
/// Switch the authorization user (`SET SESSION AUTHORIZATION`).
pub const SET_AUTHORIZATION_USER: &str = "X-Trino-Set-Authorization-User";
/// Reset the authorization user (`RESET SESSION AUTHORIZATION`).
pub const RESET_AUTHORIZATION_USER: &str = "X-Trino-Reset-Authorization-User";

/// Response headers a client cannot honor by default.
pub const DEFAULT_REJECTED: [&str; 4] = [
    SET_PATH,
    SET_ROLE,
    SET_AUTHORIZATION_USER,
    RESET_AUTHORIZATION_USER,
];

/// URL-encode a header value component.
#[must_use]
pub fn url_encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Encode `name=value` pairs as a comma-separated header value, with
/// values URL-encoded.
pub fn encode_properties<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(name, value)| format!("{name}={}", url_encode(value)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse a single `name=url-encoded value` response header value.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidHeader`] if there is no `=` or the name
/// is empty.
pub fn parse_property(header: &'static str, raw: &str) -> Result<(String, String), ProtocolError> {
    let invalid = |reason| ProtocolError::InvalidHeader {
        header,
        value: raw.to_string(),
        reason,
    };
    let (name, value) = raw.trim().split_once('=').ok_or_else(|| invalid("expected name=value"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid("empty name"));
    }
    let value = form_urlencoded::parse(format!("v={value}").as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default();
    Ok((name.to_string(), value))
}

/// Join plain items (client tags) into a comma-separated header value.
pub fn encode_list<'a, I>(items: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    items.into_iter().collect::<Vec<_>>().join(",")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_encode_properties() {
        let encoded = encode_properties([("query_max_run_time", "10m"), ("x", "a b,c=d")]);
        assert_eq!(encoded, "query_max_run_time=10m,x=a+b%2Cc%3Dd");
    }

    #[test]
    fn test_parse_property() {
        assert_eq!(
            parse_property(SET_SESSION, "query_priority=2").unwrap(),
            ("query_priority".to_string(), "2".to_string())
        );
        assert_eq!(
            parse_property(ADDED_PREPARE, "stmt=SELECT+%3F+FROM+t").unwrap(),
            ("stmt".to_string(), "SELECT ? FROM t".to_string())
        );
        assert!(parse_property(SET_SESSION, "no-equals").is_err());
        assert!(parse_property(SET_SESSION, "=value").is_err());
    }

    proptest! {
        #[test]
        fn property_values_survive_encoding(name in "[a-z_]{1,16}", value in ".*") {
            let encoded = encode_properties([(name.as_str(), value.as_str())]);
            let (n, v) = parse_property(SET_SESSION, &encoded).unwrap();
            prop_assert_eq!(n, name);
            prop_assert_eq!(v, value);
        }
    }
}
