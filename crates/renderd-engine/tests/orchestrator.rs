//! Orchestrator fallback-protocol tests against stub strategies.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use renderd_engine::{
    AttemptOutcome, EngineError, EngineResult, Orchestrator, RenderStrategy, StrategyKind,
};
use renderd_models::{JobPayload, RenderRequest};

const STUB_CONTENT: &[u8] = b"stub video bytes";

fn request(file_name: &str) -> RenderRequest {
    let payload: JobPayload = serde_json::from_str(&format!(
        r#"{{"input":{{"outputFileName":"{}"}}}}"#,
        file_name
    ))
    .unwrap();
    RenderRequest::from_payload(payload).unwrap()
}

/// Deterministic stub engine: writes a fixed-size file at the path it is
/// handed and returns that path.
struct WritingStrategy {
    kind: StrategyKind,
    dir: PathBuf,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl RenderStrategy for WritingStrategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    async fn attempt(&self, request: &RenderRequest) -> EngineResult<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let path = self.dir.join(&request.output_file_name);
        tokio::fs::write(&path, STUB_CONTENT).await?;
        Ok(path)
    }
}

/// Reports success without writing anything.
struct LyingStrategy {
    dir: PathBuf,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl RenderStrategy for LyingStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CliDirect
    }

    async fn attempt(&self, request: &RenderRequest) -> EngineResult<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.dir.join(&request.output_file_name))
    }
}

/// Always fails with an invocation error.
struct FailingStrategy {
    kind: StrategyKind,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl RenderStrategy for FailingStrategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    async fn attempt(&self, _request: &RenderRequest) -> EngineResult<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(EngineError::invocation_failed(
            "engine exited with non-zero status",
            Some("boom".to_string()),
            Some(1),
        ))
    }
}

#[tokio::test]
async fn first_success_stops_iteration() {
    let dir = tempfile::tempdir().unwrap();
    let first_calls = Arc::new(AtomicUsize::new(0));
    let second_calls = Arc::new(AtomicUsize::new(0));

    let orchestrator = Orchestrator::new(vec![
        Box::new(WritingStrategy {
            kind: StrategyKind::CliDirect,
            dir: dir.path().to_path_buf(),
            calls: Arc::clone(&first_calls),
        }),
        Box::new(FailingStrategy {
            kind: StrategyKind::CliPackageRunner,
            calls: Arc::clone(&second_calls),
        }),
    ]);

    let report = orchestrator.render(&request("clip.mp4")).await;

    assert!(report.outcome.is_ok());
    assert_eq!(report.attempts.len(), 1);
    assert_eq!(report.attempts[0].outcome, AttemptOutcome::Succeeded);
    assert_eq!(first_calls.load(Ordering::SeqCst), 1);
    assert_eq!(second_calls.load(Ordering::SeqCst), 0, "later strategy must not run");
}

#[tokio::test]
async fn exhaustion_reports_failure() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(vec![
        Box::new(FailingStrategy {
            kind: StrategyKind::CliDirect,
            calls: Arc::new(AtomicUsize::new(0)),
        }),
        Box::new(LyingStrategy {
            dir: dir.path().to_path_buf(),
            calls: Arc::new(AtomicUsize::new(0)),
        }),
    ]);

    let report = orchestrator.render(&request("clip.mp4")).await;

    let err = report.outcome.unwrap_err();
    assert!(matches!(err, EngineError::Exhausted(_)));
    assert!(!err.to_string().is_empty());
    assert_eq!(report.attempts.len(), 2);
    assert!(report
        .attempts
        .iter()
        .all(|a| a.outcome == AttemptOutcome::Failed));
}

#[tokio::test]
async fn clean_return_with_missing_file_advances() {
    let dir = tempfile::tempdir().unwrap();
    let liar_calls = Arc::new(AtomicUsize::new(0));
    let writer_calls = Arc::new(AtomicUsize::new(0));

    let orchestrator = Orchestrator::new(vec![
        Box::new(LyingStrategy {
            dir: dir.path().to_path_buf(),
            calls: Arc::clone(&liar_calls),
        }),
        Box::new(WritingStrategy {
            kind: StrategyKind::SpawnServe,
            dir: dir.path().to_path_buf(),
            calls: Arc::clone(&writer_calls),
        }),
    ]);

    let report = orchestrator.render(&request("clip.mp4")).await;

    assert!(report.outcome.is_ok());
    assert_eq!(report.attempts[0].outcome, AttemptOutcome::Failed);
    assert_eq!(report.attempts[1].outcome, AttemptOutcome::Succeeded);
    assert_eq!(liar_calls.load(Ordering::SeqCst), 1);
    assert_eq!(writer_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stub_round_trip_captures_size_and_path() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(vec![Box::new(WritingStrategy {
        kind: StrategyKind::LibraryCall,
        dir: dir.path().to_path_buf(),
        calls: Arc::new(AtomicUsize::new(0)),
    })]);

    let report = orchestrator.render(&request("round-trip.mp4")).await;

    let artifact = report.outcome.unwrap();
    assert_eq!(artifact.path, dir.path().join("round-trip.mp4"));
    assert_eq!(artifact.size_bytes, STUB_CONTENT.len() as u64);
}

#[tokio::test]
async fn empty_strategy_list_is_exhausted() {
    let orchestrator = Orchestrator::new(Vec::new());
    let report = orchestrator.render(&request("clip.mp4")).await;
    assert!(matches!(report.outcome, Err(EngineError::Exhausted(_))));
    assert!(report.attempts.is_empty());
}
