//! Integration tests for the annotation upload, flush, and read endpoints.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{expect_json, get, post_json, record, upload, TestEnv};
use serde_json::json;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Test: upload buffers without writing; flush makes the records readable
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upload_is_buffered_until_flush() {
    let env = TestEnv::new();

    let body = upload("alice", "sig-1", vec![record(0, "alice", 1.0), record(1, "alice", 0.0)]);
    let json = expect_json(
        post_json(env.app(), "/upload_annotations", &body).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json, json!({ "status": "buffered", "buffer_length": 2 }));

    let response = get(env.app(), "/get_annotations/alice/sig-1").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = expect_json(
        post_json(env.app(), "/flush_annotations", &upload("alice", "sig-1", vec![])).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json, json!({ "status": "flushed", "count": 2 }));

    let rows = expect_json(
        get(env.app(), "/get_annotations/alice/sig-1").await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(rows, json!([record(0, "alice", 1.0), record(1, "alice", 0.0)]));
}

// ---------------------------------------------------------------------------
// Test: buffer_length accumulates across uploads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn buffer_length_accumulates() {
    let env = TestEnv::new();

    for (i, expected) in [(0u64, 1), (1, 2), (2, 3)] {
        let body = upload("alice", "sig-1", vec![record(i, "alice", 1.0)]);
        let json = expect_json(
            post_json(env.app(), "/upload_annotations", &body).await,
            StatusCode::OK,
        )
        .await;
        assert_eq!(json["buffer_length"], expected);
    }
}

// ---------------------------------------------------------------------------
// Test: flush with records in the body appends and merges in one step
// ---------------------------------------------------------------------------

#[tokio::test]
async fn flush_with_body_appends_then_merges() {
    let env = TestEnv::new();

    let body = upload("alice", "sig-1", vec![record(0, "alice", 0.5)]);
    post_json(env.app(), "/upload_annotations", &body).await;

    let body = upload("alice", "sig-1", vec![record(0, "alice", 0.9)]);
    let json = expect_json(
        post_json(env.app(), "/flush_annotations", &body).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json, json!({ "status": "flushed", "count": 2 }));

    let rows = expect_json(
        get(env.app(), "/get_annotations/alice/sig-1").await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(rows, json!([record(0, "alice", 0.9)]));
}

// ---------------------------------------------------------------------------
// Test: flushing an empty key reports nothing to flush and writes nothing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn flush_of_empty_key_writes_nothing() {
    let env = TestEnv::new();

    let json = expect_json(
        post_json(env.app(), "/flush_annotations", &upload("alice", "sig-1", vec![])).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json, json!({ "status": "nothing to flush" }));

    let key = siglabel_core::BufferKey::new("alice", "sig-1").unwrap();
    assert!(!env.layout().annotator_table(&key).exists());
    assert!(!env.layout().compiled_table("sig-1").exists());
}

// ---------------------------------------------------------------------------
// Test: annotators outside the allow-list are rejected with 403
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_annotator_is_forbidden() {
    let env = TestEnv::new();

    let body = upload("mallory", "sig-1", vec![record(0, "mallory", 1.0)]);
    let json = expect_json(
        post_json(env.app(), "/upload_annotations", &body).await,
        StatusCode::FORBIDDEN,
    )
    .await;
    assert_eq!(json["code"], "FORBIDDEN");

    let response = post_json(env.app(), "/flush_annotations", &body).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get(env.app(), "/get_annotations/mallory/sig-1").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    assert!(env.state.pipeline.buffer().is_empty());
}

// ---------------------------------------------------------------------------
// Test: a malformed record rejects the whole upload with its index
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_record_rejects_whole_upload() {
    let env = TestEnv::new();

    let mut bad = record(1, "alice", 1.0);
    bad["snorkel_confidence"] = json!(1.5);
    let body = upload("alice", "sig-1", vec![record(0, "alice", 1.0), bad]);

    let json = expect_json(
        post_json(env.app(), "/upload_annotations", &body).await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["error"].as_str().unwrap().contains("annotations[1]"));
    assert!(env.state.pipeline.buffer().is_empty());
}

// ---------------------------------------------------------------------------
// Test: records must belong to the uploading annotator
// ---------------------------------------------------------------------------

#[tokio::test]
async fn foreign_annotator_record_is_rejected() {
    let env = TestEnv::new();

    let body = upload("alice", "sig-1", vec![record(0, "bob", 1.0)]);
    let response = post_json(env.app(), "/upload_annotations", &body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Test: identifiers that are not safe file names are rejected
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unsafe_signal_id_is_rejected() {
    let env = TestEnv::new();

    let body = upload("alice", "../escape", vec![record(0, "alice", 1.0)]);
    let json = expect_json(
        post_json(env.app(), "/upload_annotations", &body).await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let response = get(env.app(), "/get_compiled/.hidden").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Test: two annotators of one signal share the compiled table
// ---------------------------------------------------------------------------

#[tokio::test]
async fn compiled_table_holds_every_annotator() {
    let env = TestEnv::new();

    for annotator in ["alice", "bob"] {
        let label = if annotator == "alice" { 1.0 } else { 0.0 };
        let body = upload(annotator, "sig-1", vec![record(0, annotator, label)]);
        let response = post_json(env.app(), "/flush_annotations", &body).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let rows = expect_json(get(env.app(), "/get_compiled/sig-1").await, StatusCode::OK).await;
    assert_eq!(
        rows,
        json!([record(0, "alice", 1.0), record(0, "bob", 0.0)])
    );

    let alice = expect_json(
        get(env.app(), "/get_annotations/alice/sig-1").await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(alice, json!([record(0, "alice", 1.0)]));
}

// ---------------------------------------------------------------------------
// Test: missing compiled table is 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_compiled_table_returns_404() {
    let env = TestEnv::new();

    let json = expect_json(
        get(env.app(), "/get_compiled/sig-1").await,
        StatusCode::NOT_FOUND,
    )
    .await;
    assert_eq!(json["code"], "NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Test: a body missing required fields gets the JSON error body
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_fields_are_rejected() {
    let env = TestEnv::new();

    let json = expect_json(
        post_json(env.app(), "/upload_annotations", &json!({ "signal_id": "sig-1" })).await,
        StatusCode::BAD_REQUEST,
    )
    .await;

    assert_eq!(json["code"], "BAD_REQUEST");
    assert!(json["error"].is_string());
}

// ---------------------------------------------------------------------------
// Test: a body that is not JSON at all gets the JSON error body
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_json_body_is_rejected_with_code() {
    let env = TestEnv::new();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/upload_annotations")
        .header("content-type", "application/json")
        .body(Body::from("{\"annotator_id\": \"alice\", "))
        .unwrap();
    let response = env.app().oneshot(request).await.unwrap();

    let json = expect_json(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(json["code"], "BAD_REQUEST");
    assert!(env.state.pipeline.buffer().is_empty());
}

// ---------------------------------------------------------------------------
// Test: a body without a JSON content type gets the JSON error body
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_content_type_is_rejected_with_code() {
    let env = TestEnv::new();

    let body = upload("alice", "sig-1", vec![record(0, "alice", 1.0)]);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/flush_annotations")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = env.app().oneshot(request).await.unwrap();

    let json = expect_json(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(json["code"], "BAD_REQUEST");
}
