//! Strategy iteration: one request in, exactly one outcome out.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use metrics::counter;
use tracing::{error, info, warn};

use renderd_models::RenderRequest;

use crate::artifact::OutputArtifact;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::strategies::{
    CliDirectStrategy, CliPackageRunnerStrategy, LibraryCallStrategy, NodeRendererLibrary,
    SpawnServeStrategy,
};
use crate::strategy::{AttemptOutcome, AttemptRecord, RenderStrategy};

/// Outcome of a full orchestration run, with the per-strategy trail.
#[derive(Debug)]
pub struct RenderReport {
    pub attempts: Vec<AttemptRecord>,
    pub outcome: EngineResult<OutputArtifact>,
}

/// Tries strategies in fixed priority order until one produces a file.
///
/// Strategies are tried at most once each per job; there is no cross-job
/// retry or backoff. Success is always confirmed on disk, never inferred
/// from a clean return alone.
pub struct Orchestrator {
    strategies: Vec<Box<dyn RenderStrategy>>,
}

impl Orchestrator {
    /// Build an orchestrator over an explicit ordered strategy list.
    pub fn new(strategies: Vec<Box<dyn RenderStrategy>>) -> Self {
        Self { strategies }
    }

    /// Build the default strategy chain: CLI, package-runner fallback,
    /// library call, spawn-serve.
    pub fn from_config(config: EngineConfig) -> Self {
        let library = Arc::new(NodeRendererLibrary::new(config.child_env.clone()));
        Self::new(vec![
            Box::new(CliDirectStrategy::new(config.clone())),
            Box::new(CliPackageRunnerStrategy::new(config.clone())),
            Box::new(LibraryCallStrategy::new(library, config.clone())),
            Box::new(SpawnServeStrategy::new(config)),
        ])
    }

    /// Run one job to its single terminal outcome.
    pub async fn render(&self, request: &RenderRequest) -> RenderReport {
        let mut attempts = Vec::new();
        let mut last_error: Option<EngineError> = None;

        for strategy in &self.strategies {
            let kind = strategy.kind();
            let started_at = Utc::now();
            let start = Instant::now();

            info!(
                job_id = %request.job_id,
                strategy = %kind,
                output_file = %request.output_file_name,
                "Attempting render strategy"
            );

            let result = match strategy.attempt(request).await {
                // The filesystem, not the invocation's own report, decides
                // success.
                Ok(claimed_path) => OutputArtifact::verify(&claimed_path).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(artifact) => {
                    let record = AttemptRecord {
                        kind,
                        started_at,
                        elapsed: start.elapsed(),
                        outcome: AttemptOutcome::Succeeded,
                    };
                    counter!(
                        "renderd_strategy_attempts_total",
                        "strategy" => kind.as_str(),
                        "outcome" => AttemptOutcome::Succeeded.as_str()
                    )
                    .increment(1);
                    info!(
                        job_id = %request.job_id,
                        strategy = %kind,
                        path = %artifact.path.display(),
                        size_bytes = artifact.size_bytes,
                        elapsed_ms = record.elapsed.as_millis() as u64,
                        "Render complete"
                    );
                    attempts.push(record);
                    return RenderReport {
                        attempts,
                        outcome: Ok(artifact),
                    };
                }
                Err(err) => {
                    let outcome = AttemptOutcome::from_error(&err);
                    counter!(
                        "renderd_strategy_attempts_total",
                        "strategy" => kind.as_str(),
                        "outcome" => outcome.as_str()
                    )
                    .increment(1);
                    warn!(
                        job_id = %request.job_id,
                        strategy = %kind,
                        error = %err,
                        "Render strategy failed, advancing to next"
                    );
                    attempts.push(AttemptRecord {
                        kind,
                        started_at,
                        elapsed: start.elapsed(),
                        outcome,
                    });
                    last_error = Some(err);
                }
            }
        }

        let message = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no render strategies configured".to_string());
        error!(
            job_id = %request.job_id,
            error = %message,
            "All render strategies exhausted"
        );
        RenderReport {
            attempts,
            outcome: Err(EngineError::Exhausted(message)),
        }
    }
}
