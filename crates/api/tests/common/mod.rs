#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use siglabel_api::config::ServerConfig;
use siglabel_api::routes;
use siglabel_api::state::AppState;
use siglabel_store::StoreLayout;

/// Annotators on the allow-list of every test store.
pub const ALLOWED: &[&str] = &["alice", "bob"];

/// A throwaway store plus the state built on top of it.
///
/// The temp directory is removed when this is dropped, so keep it alive for
/// the whole test.
pub struct TestEnv {
    pub dir: TempDir,
    pub state: AppState,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let layout = siglabel_store::open(StoreLayout::under(dir.path())).unwrap();
        std::fs::write(
            &layout.annotators_file,
            json!({ "annotators": ALLOWED }).to_string(),
        )
        .unwrap();

        let state = AppState::new(test_config(layout.clone()), layout);
        Self { dir, state }
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.state.layout
    }

    /// Full application router over this environment's state.
    pub fn app(&self) -> Router {
        routes::build_app(self.state.clone())
    }
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(storage: StoreLayout) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        flush_interval_secs: 10,
        storage,
    }
}

/// One annotation record as a client would send it.
pub fn record(segment_index: u64, annotator_id: &str, label: f64) -> Value {
    json!({
        "segment_index": segment_index,
        "start": segment_index * 125,
        "end": segment_index * 125 + 250,
        "snorkel_label": label,
        "snorkel_confidence": 1.0,
        "annotator_id": annotator_id,
    })
}

/// Body of an upload or flush request.
pub fn upload(annotator_id: &str, signal_id: &str, annotations: Vec<Value>) -> Value {
    json!({
        "annotator_id": annotator_id,
        "signal_id": signal_id,
        "annotations": annotations,
    })
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: &Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the status and return the parsed body.
pub async fn expect_json(response: Response<Body>, status: StatusCode) -> Value {
    assert_eq!(response.status(), status);
    body_json(response).await
}
