//! Integration tests for the signal registry, signal loading, and annotator
//! validation endpoints.

mod common;

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use axum::http::StatusCode;
use common::{expect_json, get, TestEnv};
use parquet::arrow::ArrowWriter;
use serde_json::json;

fn write_signal(env: &TestEnv, signal_id: &str, samples: &[f64]) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("TIMESTAMP", DataType::Int64, false),
        Field::new("PPG", DataType::Float64, false),
    ]));
    let timestamps: Vec<i64> = (0..samples.len() as i64).map(|t| t * 8).collect();
    let batch = RecordBatch::try_new(
        Arc::clone(&schema),
        vec![
            Arc::new(Int64Array::from(timestamps)) as ArrayRef,
            Arc::new(Float64Array::from(samples.to_vec())) as ArrayRef,
        ],
    )
    .unwrap();

    let file = std::fs::File::create(env.layout().signal_table(signal_id)).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

// ---------------------------------------------------------------------------
// Test: GET /signals returns the registry document
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_signals_returns_registry() {
    let env = TestEnv::new();

    let json = expect_json(get(env.app(), "/signals").await, StatusCode::OK).await;
    assert_eq!(json, json!({ "signals": [] }));

    let doc = json!({ "signals": [{ "id": "sig-1" }, { "id": "sig-2" }] });
    std::fs::write(&env.layout().signal_registry, doc.to_string()).unwrap();

    let json = expect_json(get(env.app(), "/signals").await, StatusCode::OK).await;
    assert_eq!(json, doc);
}

// ---------------------------------------------------------------------------
// Test: GET /load_signal returns one object per row
// ---------------------------------------------------------------------------

#[tokio::test]
async fn load_signal_returns_rows() {
    let env = TestEnv::new();
    write_signal(&env, "sig-1", &[0.25, 0.5]);

    let rows = expect_json(get(env.app(), "/load_signal/sig-1/alice").await, StatusCode::OK).await;
    assert_eq!(
        rows,
        json!([
            { "TIMESTAMP": 0, "PPG": 0.25 },
            { "TIMESTAMP": 8, "PPG": 0.5 },
        ])
    );
}

// ---------------------------------------------------------------------------
// Test: loading a signal requires an allowed annotator
// ---------------------------------------------------------------------------

#[tokio::test]
async fn load_signal_rejects_unknown_annotator() {
    let env = TestEnv::new();
    write_signal(&env, "sig-1", &[0.25]);

    let response = get(env.app(), "/load_signal/sig-1/mallory").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Test: loading a missing signal is 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn load_missing_signal_returns_404() {
    let env = TestEnv::new();

    let json = expect_json(
        get(env.app(), "/load_signal/nope/alice").await,
        StatusCode::NOT_FOUND,
    )
    .await;
    assert_eq!(json["code"], "NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Test: GET /validate_annotator follows the allow-list file
// ---------------------------------------------------------------------------

#[tokio::test]
async fn validate_annotator_follows_allow_list() {
    let env = TestEnv::new();

    let json = expect_json(get(env.app(), "/validate_annotator/alice").await, StatusCode::OK).await;
    assert_eq!(json, json!({ "status": "ok" }));

    let response = get(env.app(), "/validate_annotator/carol").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Edits take effect without a restart.
    std::fs::write(
        &env.layout().annotators_file,
        json!({ "annotators": ["alice", "bob", "carol"] }).to_string(),
    )
    .unwrap();
    let response = get(env.app(), "/validate_annotator/carol").await;
    assert_eq!(response.status(), StatusCode::OK);
}
