//! CLI subprocess strategies.

use std::path::PathBuf;

use async_trait::async_trait;

use renderd_models::RenderRequest;

use crate::command::{CommandRunner, EngineCommand};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::strategy::{RenderStrategy, StrategyKind};

fn variables_json(request: &RenderRequest) -> EngineResult<Option<String>> {
    if request.variables.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(&request.variables)?))
    }
}

/// Invoke the engine CLI from the local search path.
///
/// No orchestrator-level timer in this mode; the process wait is the only
/// bound, and the on-disk existence check still guards the result.
pub struct CliDirectStrategy {
    config: EngineConfig,
}

impl CliDirectStrategy {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl RenderStrategy for CliDirectStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CliDirect
    }

    async fn attempt(&self, request: &RenderRequest) -> EngineResult<PathBuf> {
        CommandRunner::check_available(&self.config.cli_bin)?;

        let output_path = self.config.output_path(&request.output_file_name);
        let vars = variables_json(request)?;
        let cmd = EngineCommand::render(
            &self.config.cli_bin,
            &self.config.project_file,
            &output_path,
            vars.as_deref(),
        )
        .envs(self.config.child_env.iter().cloned());

        CommandRunner::run(&cmd).await?;
        Ok(output_path)
    }
}

/// Re-issue the CLI invocation through the on-demand package runner when
/// the engine CLI is not installed locally.
pub struct CliPackageRunnerStrategy {
    config: EngineConfig,
}

impl CliPackageRunnerStrategy {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl RenderStrategy for CliPackageRunnerStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CliPackageRunner
    }

    async fn attempt(&self, request: &RenderRequest) -> EngineResult<PathBuf> {
        CommandRunner::check_available(&self.config.runner_bin)?;

        let output_path = self.config.output_path(&request.output_file_name);
        let vars = variables_json(request)?;
        let cmd = EngineCommand::render(
            &self.config.cli_bin,
            &self.config.project_file,
            &output_path,
            vars.as_deref(),
        )
        .via_runner(&self.config.runner_bin, &self.config.runner_package)
        .envs(self.config.child_env.iter().cloned());

        CommandRunner::run(&cmd).await?;
        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderd_models::{JobPayload, RenderRequest};

    fn request(json: &str) -> RenderRequest {
        let payload: JobPayload = serde_json::from_str(json).unwrap();
        RenderRequest::from_payload(payload).unwrap()
    }

    #[test]
    fn test_variables_json_empty_is_none() {
        let req = request(r#"{"input":{}}"#);
        assert!(variables_json(&req).unwrap().is_none());
    }

    #[test]
    fn test_variables_json_passthrough() {
        let req = request(r#"{"input":{"variables":{"headline":"Hi"}}}"#);
        let json = variables_json(&req).unwrap().unwrap();
        assert_eq!(json, r#"{"headline":"Hi"}"#);
    }

    #[tokio::test]
    async fn test_missing_cli_is_tool_unavailable() {
        let config = EngineConfig {
            cli_bin: "renderd-test-no-such-binary".to_string(),
            ..EngineConfig::default()
        };
        let strategy = CliDirectStrategy::new(config);
        let err = strategy.attempt(&request(r#"{"input":{}}"#)).await.unwrap_err();
        assert!(matches!(err, crate::error::EngineError::ToolUnavailable(_)));
    }
}
