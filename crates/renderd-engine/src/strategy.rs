//! Strategy abstraction for engine invocation.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use renderd_models::RenderRequest;

use crate::error::{EngineError, EngineResult};

/// One specific way of invoking the rendering engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Engine CLI on the local search path
    CliDirect,
    /// Same invocation through the on-demand package runner
    CliPackageRunner,
    /// Engine render entry point called in-process, raced against a timer
    LibraryCall,
    /// Engine serve mode spawned locally and triggered over HTTP
    SpawnServe,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::CliDirect => "cli_direct",
            StrategyKind::CliPackageRunner => "cli_package_runner",
            StrategyKind::LibraryCall => "library_call",
            StrategyKind::SpawnServe => "spawn_serve",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A render strategy attempts to make the engine produce the requested
/// artifact and returns the path it claims to have written.
///
/// The orchestrator, not the strategy, performs the on-disk existence
/// check; a strategy that returns `Ok` with no file behind the path is
/// still counted as failed.
#[async_trait]
pub trait RenderStrategy: Send + Sync {
    /// Which invocation mode this is.
    fn kind(&self) -> StrategyKind;

    /// Try to produce the artifact for `request` once.
    async fn attempt(&self, request: &RenderRequest) -> EngineResult<PathBuf>;
}

/// Terminal outcome of one strategy attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    Failed,
    TimedOut,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Succeeded => "succeeded",
            AttemptOutcome::Failed => "failed",
            AttemptOutcome::TimedOut => "timed_out",
        }
    }

    pub(crate) fn from_error(err: &EngineError) -> Self {
        if err.is_timeout() {
            AttemptOutcome::TimedOut
        } else {
            AttemptOutcome::Failed
        }
    }
}

/// Record of one strategy attempt, kept for logging and metrics.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub kind: StrategyKind,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub outcome: AttemptOutcome,
}
