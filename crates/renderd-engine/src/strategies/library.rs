//! In-process library-call strategy.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{info, warn};

use renderd_models::RenderRequest;

use crate::command::{CommandRunner, EngineCommand};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::strategy::{RenderStrategy, StrategyKind};

/// The engine's importable render entry point.
///
/// Implementations receive the project definition, the substitution
/// variables, and the path the orchestrator wants the artifact at. They
/// may resolve to a different path of their own choosing; that path is
/// then authoritative and re-verified on disk by the orchestrator.
#[async_trait]
pub trait EngineLibrary: Send + Sync {
    async fn render(
        &self,
        project_file: &Path,
        variables: &Map<String, Value>,
        output_path: &Path,
    ) -> EngineResult<PathBuf>;
}

/// Call the engine library, racing it against a wall-clock timeout.
///
/// While the call is outstanding a heartbeat log line fires periodically
/// so an operator can tell the job is alive. The heartbeat is purely an
/// observability side channel; it never affects the outcome. On timeout
/// the call is abandoned and any late result is discarded.
pub struct LibraryCallStrategy {
    library: Arc<dyn EngineLibrary>,
    config: EngineConfig,
}

impl LibraryCallStrategy {
    pub fn new(library: Arc<dyn EngineLibrary>, config: EngineConfig) -> Self {
        Self { library, config }
    }
}

#[async_trait]
impl RenderStrategy for LibraryCallStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LibraryCall
    }

    async fn attempt(&self, request: &RenderRequest) -> EngineResult<PathBuf> {
        let output_path = self.config.output_path(&request.output_file_name);
        let render = self
            .library
            .render(&self.config.project_file, &request.variables, &output_path);
        tokio::pin!(render);

        let timeout_secs = self.config.library_timeout.as_secs();
        let deadline = tokio::time::sleep(self.config.library_timeout);
        tokio::pin!(deadline);

        let mut heartbeat = tokio::time::interval_at(
            tokio::time::Instant::now() + self.config.heartbeat_interval,
            self.config.heartbeat_interval,
        );

        loop {
            tokio::select! {
                result = &mut render => return result,
                _ = &mut deadline => {
                    warn!(
                        job_id = %request.job_id,
                        timeout_secs,
                        "Library render call timed out, abandoning"
                    );
                    return Err(EngineError::Timeout(timeout_secs));
                }
                _ = heartbeat.tick() => {
                    info!(
                        job_id = %request.job_id,
                        "Library render call still in progress"
                    );
                }
            }
        }
    }
}

/// Script handed to `node -e`: loads the engine's renderer package and
/// calls its render function with argv-supplied paths and variables,
/// printing the resolved artifact path as the last stdout line.
const RENDER_SCRIPT: &str = r#"
const { renderVideo } = require('@revideo/renderer');
const [projectFile, outDir, outFile, variables] = process.argv.slice(1);
renderVideo({
  projectFile,
  variables: JSON.parse(variables),
  settings: { outDir, outFile },
}).then((path) => {
  console.log(path);
  process.exit(0);
}).catch((err) => {
  console.error(err && err.stack ? err.stack : String(err));
  process.exit(1);
});
"#;

/// `EngineLibrary` backed by the engine's Node renderer API.
///
/// Carries the engine's child-only environment map (browser-automation
/// flags and the like) so the renderer subprocess runs with the same
/// flags as the CLI and serve children.
pub struct NodeRendererLibrary {
    node_bin: String,
    child_env: Vec<(String, String)>,
}

impl NodeRendererLibrary {
    pub fn new(child_env: Vec<(String, String)>) -> Self {
        Self {
            node_bin: "node".to_string(),
            child_env,
        }
    }

    /// Build the renderer invocation for one request.
    fn build_command(
        &self,
        project_file: &Path,
        variables: &Map<String, Value>,
        output_path: &Path,
    ) -> EngineResult<EngineCommand> {
        let out_dir = output_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_string_lossy()
            .into_owned();
        let out_file = output_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| EngineError::OutputMissing(output_path.to_path_buf()))?;

        Ok(EngineCommand::new(&self.node_bin)
            .arg("-e")
            .arg(RENDER_SCRIPT)
            .arg(project_file.to_string_lossy())
            .arg(out_dir)
            .arg(out_file)
            .arg(serde_json::to_string(variables)?)
            .envs(self.child_env.iter().cloned()))
    }
}

impl Default for NodeRendererLibrary {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl EngineLibrary for NodeRendererLibrary {
    async fn render(
        &self,
        project_file: &Path,
        variables: &Map<String, Value>,
        output_path: &Path,
    ) -> EngineResult<PathBuf> {
        CommandRunner::check_available(&self.node_bin)?;

        let cmd = self.build_command(project_file, variables, output_path)?;
        let output = CommandRunner::run(&cmd).await?;

        // Last non-empty stdout line is the resolved path; fall back to
        // the dictated path when the script printed nothing usable.
        let resolved = output
            .stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| output_path.to_path_buf());

        Ok(resolved)
    }
}
