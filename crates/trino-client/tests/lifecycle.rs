//! Query lifecycle tests against the in-process mock coordinator.
//!
//! These tests drive the full client (submission, page following,
//! cancellation, retries and session tracking) without a network.
//!
//! Run them with:
//! ```bash
//! cargo test -p trino-client --test lifecycle
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use trino_client::{
    CancelHandle, Client, Config, Error, HttpRequest, HttpResponse, Query, QueryState,
    RetryPolicy, Transport, TransportError, TransportRegistry,
};
use trino_protocol::headers;
use trino_testing::{MockCoordinator, MockQuery, MockResponse, fixtures};
use trino_transport::Method;

const WAIT: Duration = Duration::from_secs(2);

fn config(coordinator: &MockCoordinator) -> Config {
    Config::new()
        .server(coordinator.base_url())
        .retry(RetryPolicy::new().initial_backoff(Duration::from_millis(1)))
}

fn client_with(coordinator: &MockCoordinator, config: Config) -> Client {
    Client::with_transport(config, Arc::new(coordinator.clone())).unwrap()
}

fn client(coordinator: &MockCoordinator) -> Client {
    client_with(coordinator, config(coordinator))
}

#[tokio::test]
async fn test_nodes_query() {
    let coordinator = MockCoordinator::builder()
        .with_query(fixtures::NODES_SQL, fixtures::nodes())
        .build();
    let client = client(&coordinator);

    let mut stream = client.query(fixtures::NODES_SQL, &[]).await.unwrap();
    assert_eq!(stream.state(), QueryState::Queued);
    assert!(stream.info_uri().unwrap().contains(stream.id()));

    let row = stream.advance().await.unwrap().unwrap();
    assert_eq!(row.get_by_name::<String>("node_id").unwrap(), "mock-coordinator");
    assert!(row.get_by_name::<bool>("coordinator").unwrap());
    assert_eq!(stream.columns().len(), 5);
    assert!(stream.advance().await.unwrap().is_none());
    assert_eq!(stream.state(), QueryState::Finished);
}

#[tokio::test]
async fn test_thousand_rows_across_pages() {
    let sql = "SELECT orderkey, comment FROM tpch.sf1.orders LIMIT 1000";
    let coordinator = MockCoordinator::builder()
        .with_page_size(128)
        .with_query(sql, fixtures::orders(1000))
        .build();
    let client = client(&coordinator);

    let mut stream = client.query(sql, &[]).await.unwrap();
    let mut seen = 0_i64;
    while let Some(row) = stream.advance().await.unwrap() {
        seen += 1;
        assert_eq!(row.len(), 2);
        assert_eq!(row.columns()[0].name, "orderkey");
        assert_eq!(row.get::<i64>(0).unwrap(), seen);
    }
    assert_eq!(seen, 1000);
    assert_eq!(stream.stats().processed_rows, 1000);
    assert!(stream.is_finished());
    // 1 queued page, 8 data pages, 1 final page; the first came from the POST.
    assert_eq!(coordinator.request_count(Method::Get), 9);
}

#[tokio::test]
async fn test_limit_zero_has_columns_but_no_rows() {
    let coordinator = MockCoordinator::builder()
        .with_query(
            "SELECT 1 LIMIT 0",
            MockResponse::empty(vec![fixtures::column("_col0", "integer")]),
        )
        .build();
    let client = client(&coordinator);

    let mut stream = client.query("SELECT 1 LIMIT 0", &[]).await.unwrap();
    assert!(stream.advance().await.unwrap().is_none());
    assert_eq!(stream.columns().len(), 1);
    assert_eq!(stream.columns()[0].type_name, "integer");
    assert_eq!(stream.state(), QueryState::Finished);
}

#[tokio::test]
async fn test_advance_after_drain_is_idempotent() {
    let coordinator = MockCoordinator::builder()
        .with_query("SELECT 2", fixtures::orders(2))
        .build();
    let client = client(&coordinator);

    let mut stream = client.query("SELECT 2", &[]).await.unwrap();
    assert!(stream.advance().await.unwrap().is_some());
    assert!(stream.advance().await.unwrap().is_some());
    assert!(stream.advance().await.unwrap().is_none());
    let requests = coordinator.requests().len();
    for _ in 0..3 {
        assert!(stream.advance().await.unwrap().is_none());
    }
    assert_eq!(coordinator.requests().len(), requests);
}

#[tokio::test]
async fn test_engine_failure_surfaces_diagnostic() {
    let sql = "CREATE TABLE orders_copy AS SELECT * FROM orders";
    let coordinator = MockCoordinator::builder()
        .with_query(sql, fixtures::missing_schema())
        .build();
    let client = client(&coordinator);

    let mut stream = client.query(sql, &[]).await.unwrap();
    let err = stream.advance().await.unwrap_err();
    assert!(err.is_query_failure());
    assert!(
        err.to_string()
            .contains("Schema must be specified when session schema is not set"),
        "{err}"
    );
    assert!(err.to_string().starts_with("query failed (200 OK)"));
    assert_eq!(err.error_code(), Some(13));
    assert_eq!(stream.state(), QueryState::Failed);
    assert!(stream.advance().await.unwrap().is_none());
}

#[tokio::test]
async fn test_unscripted_statement_fails() {
    let coordinator = MockCoordinator::builder().build();
    let client = client(&coordinator);

    let err = client.execute("SELECT nope", &[]).await.unwrap_err();
    assert_eq!(err.error_name(), Some("NOT_SUPPORTED"));
}

#[tokio::test]
async fn test_cancel_wins_over_buffered_rows() {
    let coordinator = MockCoordinator::builder()
        .with_query("SELECT big", MockQuery::new(fixtures::orders(10)).eager().hanging())
        .build();
    let client = client(&coordinator);
    let cancel = CancelHandle::new();

    let mut stream = client
        .submit(Query::new("SELECT big").with_cancel(cancel.clone()))
        .await
        .unwrap();
    cancel.cancel();

    let err = stream.advance().await.unwrap_err();
    assert!(err.is_canceled());
    assert!(err.to_string().contains("canceled"));
    assert_eq!(stream.state(), QueryState::Canceled);
    assert!(stream.advance().await.unwrap().is_none());

    assert!(coordinator.wait_for_deletes(1, WAIT).await);
    assert_eq!(coordinator.canceled_queries(), vec![stream.id().to_string()]);
}

#[tokio::test]
async fn test_cancel_interrupts_pending_fetch() {
    let coordinator = MockCoordinator::builder()
        .with_query("SELECT slow", MockQuery::new(fixtures::orders(1)).hanging())
        .build();
    let client = client(&coordinator);
    let cancel = CancelHandle::new();

    let mut stream = client
        .submit(Query::new("SELECT slow").with_cancel(cancel.clone()))
        .await
        .unwrap();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let err = stream.advance().await.unwrap_err();
    assert!(matches!(err, Error::Canceled));
    assert!(coordinator.wait_for_deletes(1, WAIT).await);
}

#[tokio::test]
async fn test_cancel_targets_latest_continuation() {
    let coordinator = MockCoordinator::builder()
        .with_query("SELECT pages", fixtures::orders(10))
        .with_page_size(2)
        .build();
    let client = client(&coordinator);
    let cancel = CancelHandle::new();

    let mut stream = client
        .submit(Query::new("SELECT pages").with_cancel(cancel.clone()))
        .await
        .unwrap();
    for _ in 0..3 {
        assert!(stream.advance().await.unwrap().is_some());
    }
    assert_eq!(coordinator.request_count(Method::Get), 2);

    cancel.cancel();
    assert!(stream.advance().await.unwrap_err().is_canceled());
    assert!(coordinator.wait_for_deletes(1, WAIT).await);

    let deletes: Vec<String> = coordinator
        .requests()
        .into_iter()
        .filter(|r| r.method == Method::Delete)
        .map(|r| r.url)
        .collect();
    let expected = format!(
        "{}{}/executing/{}/y3/3",
        coordinator.base_url(),
        headers::STATEMENT_PATH,
        stream.id()
    );
    assert_eq!(deletes, vec![expected]);
}

#[tokio::test]
async fn test_cancel_after_drain_is_noop() {
    let coordinator = MockCoordinator::builder()
        .with_query("SELECT 3", fixtures::orders(3))
        .build();
    let client = client(&coordinator);
    let cancel = CancelHandle::new();

    let mut stream = client
        .submit(Query::new("SELECT 3").with_cancel(cancel.clone()))
        .await
        .unwrap();
    while stream.advance().await.unwrap().is_some() {}
    cancel.cancel();

    assert!(stream.advance().await.unwrap().is_none());
    assert_eq!(stream.state(), QueryState::Finished);
    assert_eq!(coordinator.request_count(Method::Delete), 0);
}

#[tokio::test]
async fn test_deadline_exceeded() {
    let coordinator = MockCoordinator::builder()
        .with_query("SELECT sleep", MockQuery::new(fixtures::orders(1)).hanging())
        .build();
    let client = client(&coordinator);

    let mut stream = client
        .query_with_timeout("SELECT sleep", &[], Duration::from_millis(50))
        .await
        .unwrap();
    let err = stream.advance().await.unwrap_err();
    assert!(err.is_deadline_exceeded());
    assert!(err.to_string().contains("deadline"));
    assert_eq!(stream.state(), QueryState::Canceled);
    assert!(coordinator.wait_for_deletes(1, WAIT).await);
}

#[tokio::test]
async fn test_configured_query_timeout_applies() {
    let coordinator = MockCoordinator::builder()
        .with_query("SELECT sleep", MockQuery::new(fixtures::orders(1)).hanging())
        .build();
    let client = client_with(
        &coordinator,
        config(&coordinator).query_timeout(Duration::from_millis(50)),
    );

    let err = client.execute("SELECT sleep", &[]).await.unwrap_err();
    assert!(err.is_deadline_exceeded());
}

#[tokio::test]
async fn test_close_cancels_running_query() {
    let coordinator = MockCoordinator::builder()
        .with_query("SELECT slow", MockQuery::new(fixtures::orders(1)).hanging())
        .build();
    let client = client(&coordinator);

    let mut stream = client.query("SELECT slow", &[]).await.unwrap();
    stream.close();
    assert_eq!(stream.state(), QueryState::Canceled);
    assert!(stream.advance().await.unwrap().is_none());
    assert!(coordinator.wait_for_deletes(1, WAIT).await);
}

#[tokio::test]
async fn test_drop_cancels_running_query() {
    let coordinator = MockCoordinator::builder()
        .with_query("SELECT slow", MockQuery::new(fixtures::orders(1)).hanging())
        .build();
    let client = client(&coordinator);

    let stream = client.query("SELECT slow", &[]).await.unwrap();
    let id = stream.id().to_string();
    drop(stream);
    assert!(coordinator.wait_for_deletes(1, WAIT).await);
    assert_eq!(coordinator.canceled_queries(), vec![id]);
}

#[tokio::test]
async fn test_gateway_errors_are_retried() {
    let coordinator = MockCoordinator::builder()
        .with_query(
            "SELECT 3",
            MockQuery::new(fixtures::orders(3)).with_transient_failures(503, 2),
        )
        .build();
    let client = client(&coordinator);

    let rows = client
        .query("SELECT 3", &[])
        .await
        .unwrap()
        .collect_all()
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(coordinator.request_count(Method::Get), 4);
}

#[tokio::test]
async fn test_retry_budget_exhausted() {
    let coordinator = MockCoordinator::builder()
        .with_query(
            "SELECT 3",
            MockQuery::new(fixtures::orders(3)).with_transient_failures(502, 10),
        )
        .build();
    let client = client_with(&coordinator, config(&coordinator).max_retries(2));

    let mut stream = client.query("SELECT 3", &[]).await.unwrap();
    let err = stream.advance().await.unwrap_err();
    match &err {
        Error::Http { status, reason, .. } => {
            assert_eq!(*status, 502);
            assert_eq!(reason, "Bad Gateway");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_transient());
    assert_eq!(stream.state(), QueryState::Failed);
    assert_eq!(coordinator.request_count(Method::Get), 3);
}

/// Accepts every request and never answers in time.
#[derive(Debug, Default)]
struct TimingOut {
    posts: AtomicUsize,
    gets: AtomicUsize,
}

#[async_trait::async_trait]
impl Transport for TimingOut {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        match request.method {
            Method::Post => self.posts.fetch_add(1, Ordering::SeqCst),
            _ => self.gets.fetch_add(1, Ordering::SeqCst),
        };
        Err(TransportError::Timeout)
    }
}

#[tokio::test]
async fn test_timed_out_submission_is_not_resent() {
    let transport = Arc::new(TimingOut::default());
    let config =
        Config::new().retry(RetryPolicy::new().initial_backoff(Duration::from_millis(1)));
    let client = Client::with_transport(config, transport.clone()).unwrap();

    let err = client
        .execute("INSERT INTO memory.default.t VALUES (1)", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Submit(TransportError::Timeout)));
    assert_eq!(transport.posts.load(Ordering::SeqCst), 1);
    assert_eq!(transport.gets.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unreachable_coordinator() {
    let coordinator = MockCoordinator::builder().unreachable().build();
    let client = client_with(&coordinator, config(&coordinator).max_retries(2));

    let err = client.query(fixtures::NODES_SQL, &[]).await.unwrap_err();
    assert!(matches!(err, Error::Submit(_)));
    assert!(err.is_transient());
    assert_eq!(coordinator.requests().len(), 3);
}

#[tokio::test]
async fn test_use_updates_session() {
    let coordinator = MockCoordinator::builder()
        .with_query("USE tpch.sf100", fixtures::use_schema("tpch", "sf100"))
        .with_query(fixtures::NODES_SQL, fixtures::nodes())
        .build();
    let client = client(&coordinator);

    let result = client.execute("USE tpch.sf100", &[]).await.unwrap();
    assert_eq!(result.update_type.as_deref(), Some("USE"));
    let session = client.session();
    assert_eq!(session.catalog.as_deref(), Some("tpch"));
    assert_eq!(session.schema.as_deref(), Some("sf100"));

    client.simple_query(fixtures::NODES_SQL).await.unwrap();
    let submission = coordinator.last_submission().unwrap();
    assert_eq!(submission.headers.get(headers::CATALOG), Some("tpch"));
    assert_eq!(submission.headers.get(headers::SCHEMA), Some("sf100"));
}

#[tokio::test]
async fn test_session_properties_round_trip() {
    let coordinator = MockCoordinator::builder()
        .with_query(
            "SET SESSION query_max_run_time = '10m'",
            fixtures::set_session("query_max_run_time", "10m"),
        )
        .with_query("SHOW SESSION", fixtures::echo_session())
        .with_query("RESET SESSION query_max_run_time", fixtures::reset_session("query_max_run_time"))
        .build();
    let client = client(&coordinator);

    client
        .simple_query("SET SESSION query_max_run_time = '10m'")
        .await
        .unwrap();
    let rows = client
        .query("SHOW SESSION", &[])
        .await
        .unwrap()
        .collect_all()
        .await
        .unwrap();
    assert_eq!(rows[0].get::<String>(0).unwrap(), "query_max_run_time=10m");

    client
        .simple_query("RESET SESSION query_max_run_time")
        .await
        .unwrap();
    assert!(client.session().properties.is_empty());
}

#[tokio::test]
async fn test_rejected_session_update() {
    let sql = "SET SESSION query_max_run_time = '10m'";
    let coordinator = MockCoordinator::builder()
        .with_query(sql, fixtures::set_session("query_max_run_time", "10m"))
        .build();
    let client = client_with(&coordinator, config(&coordinator).reject_session_updates());

    let err = client.execute(sql, &[]).await.unwrap_err();
    assert!(err.is_unsupported());
    assert!(err.to_string().contains(headers::SET_SESSION));
    let session = client.session();
    assert!(session.properties.is_empty());
    assert_eq!(session.rejected_headers, vec![headers::SET_SESSION.to_string()]);
}

#[tokio::test]
async fn test_set_role_unsupported_by_default() {
    let coordinator = MockCoordinator::builder()
        .with_query("SET ROLE admin", fixtures::set_role("admin"))
        .build();
    let client = client(&coordinator);

    let err = client.simple_query("SET ROLE admin").await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedHeader { header } if header == headers::SET_ROLE));
}

#[tokio::test]
async fn test_positional_parameters() {
    let coordinator = MockCoordinator::builder()
        .with_query(
            "EXECUTE _trino_rs USING 'GERMANY', 3",
            MockResponse::rows(
                vec![fixtures::column("nationkey", "bigint")],
                vec![vec![serde_json::json!(7)]],
            ),
        )
        .build();
    let client = client(&coordinator);
    let sql = "SELECT nationkey FROM tpch.tiny.nation WHERE name = ? AND regionkey = ?";

    let rows = client
        .query(sql, &[&"GERMANY", &3_i32])
        .await
        .unwrap()
        .collect_all()
        .await
        .unwrap();
    assert_eq!(rows[0].get::<i64>(0).unwrap(), 7);

    let submission = coordinator.last_submission().unwrap();
    let (name, prepared) = headers::parse_property(
        headers::PREPARED_STATEMENT,
        submission.headers.get(headers::PREPARED_STATEMENT).unwrap(),
    )
    .unwrap();
    assert_eq!(name, "_trino_rs");
    assert_eq!(prepared, sql);
}

#[tokio::test]
async fn test_update_count() {
    let sql = "INSERT INTO memory.default.t VALUES (1), (2)";
    let coordinator = MockCoordinator::builder()
        .with_query(sql, MockResponse::update("INSERT", Some(2)))
        .build();
    let client = client(&coordinator);

    let result = client.execute(sql, &[]).await.unwrap();
    assert_eq!(result.update_type.as_deref(), Some("INSERT"));
    assert_eq!(result.rows_affected, Some(2));
    assert_eq!(result.rows_returned, 0);
}

#[tokio::test]
async fn test_nested_types_decode() {
    let coordinator = MockCoordinator::builder()
        .with_query("SELECT nested", fixtures::nested_types())
        .build();
    let client = client(&coordinator);

    let mut stream = client.query("SELECT nested", &[]).await.unwrap();
    let row = stream.advance().await.unwrap().unwrap();

    let tags: HashMap<String, Option<Vec<i32>>> = row.get(0).unwrap();
    assert_eq!(tags["a"], Some(vec![1, 2]));
    assert_eq!(tags["b"], None);
    let (x, y): (f64, f64) = row.get_by_name("point").unwrap();
    assert_eq!((x, y), (1.0, -2.5));

    let missing: Option<HashMap<String, String>> = row.get_opt(2).unwrap();
    let empty: Option<HashMap<String, String>> = row.get_opt(3).unwrap();
    assert!(missing.is_none());
    assert_eq!(empty, Some(HashMap::new()));
}

#[tokio::test]
async fn test_decimal_mode_per_client() {
    let coordinator = MockCoordinator::builder()
        .with_query(
            "SELECT price",
            MockResponse::rows(
                vec![fixtures::column("price", "decimal(10,2)")],
                vec![vec![serde_json::json!("12.34")]],
            ),
        )
        .build();

    let exact = client(&coordinator);
    let row = exact
        .query("SELECT price", &[])
        .await
        .unwrap()
        .advance()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        row.get::<rust_decimal::Decimal>(0).unwrap(),
        rust_decimal::Decimal::new(1234, 2)
    );

    let lossy = client_with(
        &coordinator,
        config(&coordinator).decimal_mode(trino_client::DecimalMode::Double),
    );
    let row = lossy
        .query("SELECT price", &[])
        .await
        .unwrap()
        .advance()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.get_raw(0), Some(&trino_client::SqlValue::Double(12.34)));
}

#[tokio::test]
async fn test_timestamp_columns() {
    let coordinator = MockCoordinator::builder()
        .with_query(
            "SELECT ts",
            MockResponse::rows(
                vec![fixtures::column("ts", "timestamp(3)")],
                vec![vec![serde_json::json!("2026-10-15 10:15:00.123")]],
            ),
        )
        .build();
    let client = client(&coordinator);

    let rows = client
        .query("SELECT ts", &[])
        .await
        .unwrap()
        .collect_all()
        .await
        .unwrap();
    let ts: chrono::NaiveDateTime = rows[0].get(0).unwrap();
    assert_eq!(ts.to_string(), "2026-10-15 10:15:00.123");
}

#[tokio::test]
async fn test_into_stream() {
    let coordinator = MockCoordinator::builder()
        .with_page_size(4)
        .with_query("SELECT 10", fixtures::orders(10))
        .build();
    let client = client(&coordinator);

    let rows: Vec<_> = client
        .query("SELECT 10", &[])
        .await
        .unwrap()
        .into_stream()
        .collect()
        .await;
    assert_eq!(rows.len(), 10);
    assert!(rows.iter().all(Result::is_ok));
}

#[tokio::test]
async fn test_registered_transport_with_cancellation() {
    let coordinator = MockCoordinator::builder()
        .with_query("SELECT slow", MockQuery::new(fixtures::orders(5)).eager().hanging())
        .build();
    let registry = TransportRegistry::new();
    registry
        .register("uncompressed", Arc::new(coordinator.clone()))
        .unwrap();

    let client = Client::with_registry(
        config(&coordinator).transport("uncompressed"),
        &registry,
    )
    .unwrap();
    assert!(registry.is_sealed());
    assert!(
        registry
            .register("late", Arc::new(coordinator.clone()))
            .is_err()
    );

    let cancel = CancelHandle::new();
    let mut stream = client
        .submit(Query::new("SELECT slow").with_cancel(cancel.clone()))
        .await
        .unwrap();
    let first = stream.advance().await.unwrap().unwrap();
    assert_eq!(first.get::<i64>(0).unwrap(), 1);

    cancel.cancel();
    assert!(stream.advance().await.unwrap_err().is_canceled());
    assert!(coordinator.wait_for_deletes(1, WAIT).await);
}

#[tokio::test]
async fn test_queued_pages_move_to_running() {
    let coordinator = MockCoordinator::builder()
        .with_query("SELECT 1", MockQuery::new(fixtures::orders(1)).with_queued_pages(3))
        .build();
    let client = client(&coordinator);

    let mut stream = client.query("SELECT 1", &[]).await.unwrap();
    assert_eq!(stream.state(), QueryState::Queued);
    let row = stream.advance().await.unwrap();
    assert!(row.is_some());
    assert_eq!(stream.state(), QueryState::Running);
    assert!(stream.advance().await.unwrap().is_none());
    assert_eq!(stream.state(), QueryState::Finished);
}
