//! Rendering and export behavior.

use std::sync::Arc;

use duneq::api::MockExecutionApi;
use duneq::commands;
use duneq::output::{self, OutputFormat};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn csv_export_contains_every_row() {
    let mock = Arc::new(MockExecutionApi::new());
    let results = commands::latest_results(mock, 42, None).await.unwrap();

    // A display cap of 1 must not affect exports.
    let csv = output::render(&results, OutputFormat::Csv, 1).unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "blockchain,trade_count");
    assert!(lines[1].starts_with("ethereum,"));
    assert!(lines[2].starts_with("base,"));
}

#[tokio::test]
async fn table_render_caps_rows_and_says_so() {
    let mock = Arc::new(MockExecutionApi::new());
    let results = commands::latest_results(mock, 42, None).await.unwrap();

    let table = output::render(&results, OutputFormat::Table, 1).unwrap();
    assert!(table.contains("ethereum"));
    assert!(!table.contains("base"));
    assert!(table.contains("Showing first 1 of 2 rows"));
}

#[tokio::test]
async fn json_export_roundtrips() {
    let mock = Arc::new(MockExecutionApi::new());
    let results = commands::latest_results(mock, 42, None).await.unwrap();

    let json = output::render(&results, OutputFormat::Json, 1).unwrap();
    let rows: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["blockchain"], "ethereum");
    assert_eq!(rows[0]["trade_count"], 1042);
}

#[tokio::test]
async fn metadata_block_lists_execution_identity() {
    let mock = Arc::new(MockExecutionApi::new());
    let results = commands::latest_results(mock, 42, None).await.unwrap();

    let metadata = output::format_metadata(&results);
    assert!(metadata.contains("Execution ID: mock-latest-42"));
    assert!(metadata.contains("Query ID:     42"));
    assert!(metadata.contains("State:        completed"));
}

#[tokio::test]
async fn output_file_receives_rendered_content() {
    let mock = Arc::new(MockExecutionApi::new());
    let results = commands::latest_results(mock, 42, None).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.csv");

    let csv = output::render(&results, OutputFormat::Csv, 1000).unwrap();
    output::write_output(&csv, Some(&path)).unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), csv);
}
