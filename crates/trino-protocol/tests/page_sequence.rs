//! Parsing a full page sequence as a coordinator produces it.
//!
//! These tests walk the bodies of one query from submission to the final
//! page and check the facts a client relies on at each step.

#![allow(clippy::unwrap_used)]

use trino_protocol::headers::{self, parse_property};
use trino_protocol::{EngineState, Phase, QueryResults};

const SUBMITTED: &str = r#"{
    "id": "20261015_101500_00042_mock0",
    "infoUri": "http://coordinator:8080/ui/query.html?20261015_101500_00042_mock0",
    "nextUri": "http://coordinator:8080/v1/statement/queued/20261015_101500_00042_mock0/ya1/1",
    "stats": {"state": "QUEUED", "queued": true, "scheduled": false}
}"#;

const PLANNING: &str = r#"{
    "id": "20261015_101500_00042_mock0",
    "nextUri": "http://coordinator:8080/v1/statement/executing/20261015_101500_00042_mock0/yb2/2",
    "stats": {"state": "PLANNING"}
}"#;

const FIRST_DATA: &str = r#"{
    "id": "20261015_101500_00042_mock0",
    "nextUri": "http://coordinator:8080/v1/statement/executing/20261015_101500_00042_mock0/yc3/3",
    "columns": [
        {"name": "node_id", "type": "varchar"},
        {"name": "tags", "type": "array(varchar)"}
    ],
    "data": [["a", ["x", null]], ["b", null]],
    "stats": {"state": "RUNNING", "nodes": 2, "processedRows": 2, "progressPercentage": 50.0}
}"#;

const LAST: &str = r#"{
    "id": "20261015_101500_00042_mock0",
    "columns": [
        {"name": "node_id", "type": "varchar"},
        {"name": "tags", "type": "array(varchar)"}
    ],
    "stats": {"state": "FINISHED", "processedRows": 2},
    "warnings": [{"warningCode": {"code": 1, "name": "DEPRECATED_FUNCTION"}, "message": "old"}]
}"#;

#[test]
fn test_sequence_phases() {
    let phases: Vec<Phase> = [SUBMITTED, PLANNING, FIRST_DATA, LAST]
        .iter()
        .map(|body| {
            QueryResults::from_slice(body.as_bytes())
                .unwrap()
                .engine_state()
                .unwrap()
                .phase()
        })
        .collect();
    assert_eq!(
        phases,
        vec![Phase::Queued, Phase::Queued, Phase::Running, Phase::Finished]
    );
}

#[test]
fn test_only_last_page_is_terminal() {
    let pages: Vec<QueryResults> = [SUBMITTED, PLANNING, FIRST_DATA, LAST]
        .iter()
        .map(|body| QueryResults::from_slice(body.as_bytes()).unwrap())
        .collect();
    let terminal: Vec<bool> = pages.iter().map(QueryResults::is_terminal).collect();
    assert_eq!(terminal, vec![false, false, false, true]);
    assert!(pages.iter().all(|p| p.id == pages[0].id));
}

#[test]
fn test_data_page_contents() {
    let page = QueryResults::from_slice(FIRST_DATA.as_bytes()).unwrap();
    let columns = page.columns.as_ref().unwrap();
    assert_eq!(columns[1].type_name, "array(varchar)");
    let data = page.data.as_ref().unwrap();
    assert!(data[1][1].is_null());
    assert_eq!(page.stats.progress_percentage, Some(50.0));
}

#[test]
fn test_warnings_on_final_page() {
    let page = QueryResults::from_slice(LAST.as_bytes()).unwrap();
    assert_eq!(page.warnings.len(), 1);
    assert_eq!(page.warnings[0].warning_code.name, "DEPRECATED_FUNCTION");
    assert_eq!(page.row_count(), 0);
}

#[test]
fn test_unknown_state_is_unrecognized() {
    let body = r#"{"id": "q", "nextUri": "http://x/1", "stats": {"state": "RESCHEDULING"}}"#;
    let page = QueryResults::from_slice(body.as_bytes()).unwrap();
    assert_eq!(page.engine_state(), None);
    assert_eq!(EngineState::parse("BLOCKED").map(EngineState::phase), Some(Phase::Running));
}

#[test]
fn test_prepared_statement_header_round_trip() {
    let sql = "SELECT * FROM nation WHERE name = ? AND regionkey > ?";
    let header = format!(
        "{}={}",
        headers::PARAMETER_STATEMENT_NAME,
        headers::url_encode(sql)
    );
    let (name, decoded) = parse_property(headers::ADDED_PREPARE, &header).unwrap();
    assert_eq!(name, headers::PARAMETER_STATEMENT_NAME);
    assert_eq!(decoded, sql);
}
