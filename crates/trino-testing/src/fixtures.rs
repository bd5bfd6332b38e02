//! Canned statements and data for client tests.
//!
//! The scripts mirror what a stock coordinator with the `tpch` and `system`
//! catalogs returns for the same statements.

use serde_json::{Value, json};
use trino_protocol::Column;
use trino_protocol::headers;

use crate::mock_coordinator::{MockQuery, MockResponse};

/// Environment variable naming a live coordinator for ignored tests.
pub const SERVER_URL_ENV: &str = "TRINO_SERVER_URL";

/// The live coordinator URL, if configured.
#[must_use]
pub fn server_url_from_env() -> Option<String> {
    std::env::var(SERVER_URL_ENV).ok().filter(|s| !s.is_empty())
}

/// Shorthand for a column descriptor.
pub fn column(name: &str, type_name: &str) -> Column {
    Column::new(name, type_name)
}

/// Statement listing cluster nodes.
pub const NODES_SQL: &str = "SELECT * FROM system.runtime.nodes";

/// One coordinator node, as `system.runtime.nodes` reports it.
#[must_use]
pub fn nodes() -> MockResponse {
    MockResponse::rows(
        vec![
            column("node_id", "varchar"),
            column("http_uri", "varchar"),
            column("node_version", "varchar"),
            column("coordinator", "boolean"),
            column("state", "varchar"),
        ],
        vec![vec![
            json!("mock-coordinator"),
            json!("http://mock-coordinator:8080"),
            json!("476"),
            json!(true),
            json!("active"),
        ]],
    )
}

/// `n` rows of `(orderkey bigint, comment varchar)`.
#[must_use]
pub fn orders(n: usize) -> MockResponse {
    MockResponse::rows(
        vec![column("orderkey", "bigint"), column("comment", "varchar")],
        (1..=n)
            .map(|i| vec![json!(i), json!(format!("order {i}"))])
            .collect(),
    )
}

/// The failure a coordinator reports for DDL without a session schema.
#[must_use]
pub fn missing_schema() -> MockResponse {
    MockResponse::error(
        13,
        "MISSING_SCHEMA_NAME",
        "USER_ERROR",
        "line 1:14: Schema must be specified when session schema is not set",
    )
}

/// `USE catalog.schema`, answered with the matching set headers.
#[must_use]
pub fn use_schema(catalog: &str, schema: &str) -> MockQuery {
    MockQuery::new(MockResponse::update("USE", None))
        .with_header(headers::SET_CATALOG, catalog)
        .with_header(headers::SET_SCHEMA, schema)
}

/// `SET SESSION name = value`, answered with a set-session header.
#[must_use]
pub fn set_session(name: &str, value: &str) -> MockQuery {
    MockQuery::new(MockResponse::update("SET SESSION", None)).with_header(
        headers::SET_SESSION,
        format!("{name}={}", headers::url_encode(value)),
    )
}

/// `RESET SESSION name`, answered with a clear-session header.
#[must_use]
pub fn reset_session(name: &str) -> MockQuery {
    MockQuery::new(MockResponse::update("RESET SESSION", None))
        .with_header(headers::CLEAR_SESSION, name)
}

/// `SET ROLE`, answered with a set-role header.
#[must_use]
pub fn set_role(role: &str) -> MockQuery {
    MockQuery::new(MockResponse::update("SET ROLE", None))
        .with_header(headers::SET_ROLE, format!("system=ROLE{{{role}}}"))
}

/// Echo the `X-Trino-Session` request header back as one varchar row.
#[must_use]
pub fn echo_session() -> MockResponse {
    MockResponse::custom(|request| {
        let session = request.headers.get(headers::SESSION).unwrap_or_default();
        MockResponse::rows(
            vec![column("session", "varchar")],
            vec![vec![Value::from(session)]],
        )
    })
}

/// Nested array cells of depth 1 to 3 with nulls at every level.
#[must_use]
pub fn nested_arrays() -> Vec<(&'static str, Value)> {
    vec![
        ("array(varchar)", json!(["a", null, "c"])),
        ("array(array(bigint))", json!([[1, null], null, [], [3]])),
        (
            "array(array(array(double)))",
            json!([[[1.5, null]], [null, [2.0]], null]),
        ),
    ]
}

/// A row exercising nested maps and rows, plus a null map.
#[must_use]
pub fn nested_types() -> MockResponse {
    MockResponse::rows(
        vec![
            column("tags", "map(varchar, array(integer))"),
            column("point", "row(x double, y double)"),
            column("missing", "map(varchar, varchar)"),
            column("empty", "map(varchar, varchar)"),
        ],
        vec![vec![
            json!({"a": [1, 2], "b": null}),
            json!([1.0, -2.5]),
            Value::Null,
            json!({}),
        ]],
    )
}
