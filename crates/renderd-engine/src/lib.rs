//! Render orchestration for the renderd service.
//!
//! Turns one canonical render request into exactly one result by trying
//! engine invocation strategies in fixed priority order: direct CLI,
//! CLI via the package runner, in-process library call, and finally a
//! spawned render server triggered over local HTTP. The on-disk output
//! file is the sole success signal for every strategy.

mod artifact;
mod command;
mod config;
mod error;
mod orchestrator;
pub mod strategies;
mod strategy;

pub use artifact::OutputArtifact;
pub use command::{CommandOutput, CommandRunner, EngineCommand};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use orchestrator::{Orchestrator, RenderReport};
pub use strategy::{AttemptOutcome, AttemptRecord, RenderStrategy, StrategyKind};
