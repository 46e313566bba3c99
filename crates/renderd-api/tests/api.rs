//! API integration tests over stub render strategies.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use renderd_api::{create_router, ApiConfig, AppState};
use renderd_engine::{
    EngineError, EngineResult, Orchestrator, RenderStrategy, StrategyKind,
};
use renderd_models::RenderRequest;

const STUB_CONTENT: &[u8] = b"stub video bytes";

/// Writes a fixed-size file at the dictated path.
struct WritingStrategy {
    dir: PathBuf,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl RenderStrategy for WritingStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CliDirect
    }

    async fn attempt(&self, request: &RenderRequest) -> EngineResult<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let path = self.dir.join(&request.output_file_name);
        tokio::fs::write(&path, STUB_CONTENT).await?;
        Ok(path)
    }
}

/// Always fails.
struct FailingStrategy {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl RenderStrategy for FailingStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CliDirect
    }

    async fn attempt(&self, _request: &RenderRequest) -> EngineResult<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(EngineError::invocation_failed(
            "engine exited with non-zero status",
            None,
            Some(1),
        ))
    }
}

async fn test_app(output_dir: &Path, strategies: Vec<Box<dyn RenderStrategy>>) -> Router {
    let config = ApiConfig {
        output_dir: output_dir.to_path_buf(),
        ..ApiConfig::default()
    };
    let state = AppState::with_orchestrator(config, Orchestrator::new(strategies))
        .await
        .unwrap();
    create_router(state, None)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_render(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/render")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path(), Vec::new()).await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_malformed_body_never_reaches_orchestrator() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let app = test_app(
        dir.path(),
        vec![Box::new(FailingStrategy {
            calls: Arc::clone(&calls),
        })],
    )
    .await;

    let response = app.oneshot(post_render("not json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_input_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path(), Vec::new()).await;

    let response = app.oneshot(post_render(r#"{"id":"abc"}"#)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_render_success_envelope() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(
        dir.path(),
        vec![Box::new(WritingStrategy {
            dir: dir.path().to_path_buf(),
            calls: Arc::new(AtomicUsize::new(0)),
        })],
    )
    .await;

    let response = app.oneshot(post_render(r#"{"input":{}}"#)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "completed");
    assert_eq!(json["output"]["status"], "completed");
    assert_eq!(json["output"]["file_size"], STUB_CONTENT.len() as u64);

    // Default name was synthesized and flows through path and URL.
    let path = json["output"]["output_path"].as_str().unwrap();
    assert!(path.ends_with(".mp4"));
    assert!(path.contains("output-"));
    let url = json["output"]["output_url"].as_str().unwrap();
    assert!(url.contains("/output/output-"));
}

#[tokio::test]
async fn test_render_failure_envelope() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(
        dir.path(),
        vec![
            Box::new(FailingStrategy {
                calls: Arc::new(AtomicUsize::new(0)),
            }),
            Box::new(FailingStrategy {
                calls: Arc::new(AtomicUsize::new(0)),
            }),
        ],
    )
    .await;

    let response = app
        .oneshot(post_render(r#"{"input":{"outputFileName":"wanted.mp4"}}"#))
        .await
        .unwrap();

    // Render failures keep the 200 envelope; only intake errors are 4xx.
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "failed");
    assert_eq!(json["output"]["status"], "failed");
    assert!(!json["output"]["error"].as_str().unwrap().is_empty());
    assert!(json["output"].get("output_path").is_none());
    assert!(json["output"]["error_stack"]
        .as_str()
        .unwrap()
        .contains("cli_direct"));
}

#[tokio::test]
async fn test_root_alias_accepts_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(
        dir.path(),
        vec![Box::new(WritingStrategy {
            dir: dir.path().to_path_buf(),
            calls: Arc::new(AtomicUsize::new(0)),
        })],
    )
    .await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"input":{}}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_traversal_names_are_forbidden() {
    let dir = tempfile::tempdir().unwrap();

    for uri in [
        "/output/..%2F..%2Fetc%2Fpasswd",
        "/output/..",
        "/output/.",
        "/output/a%5Cb.mp4",
    ] {
        let app = test_app(dir.path(), Vec::new()).await;
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::FORBIDDEN,
            "expected 403 for {}",
            uri
        );
    }
}

#[tokio::test]
async fn test_missing_artifact_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path(), Vec::new()).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/output/never-rendered.mp4")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_artifact_streaming() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(dir.path().join("clip.mp4"), STUB_CONTENT)
        .await
        .unwrap();
    let app = test_app(dir.path(), Vec::new()).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/output/clip.mp4")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], STUB_CONTENT);
}
