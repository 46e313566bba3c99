//! Application state.

use std::sync::Arc;

use renderd_engine::{EngineConfig, Orchestrator};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    /// Create application state with the default strategy chain.
    ///
    /// Ensures the output directory exists (idempotent, recursive) before
    /// any render attempt can run.
    pub async fn new(config: ApiConfig, engine_config: EngineConfig) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(&config.output_dir).await?;
        Ok(Self {
            config: Arc::new(config),
            orchestrator: Arc::new(Orchestrator::from_config(engine_config)),
        })
    }

    /// Create application state over an explicit orchestrator (tests).
    pub async fn with_orchestrator(
        config: ApiConfig,
        orchestrator: Orchestrator,
    ) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(&config.output_dir).await?;
        Ok(Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
        })
    }
}
