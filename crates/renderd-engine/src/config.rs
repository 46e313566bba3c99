//! Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the external rendering engine.
///
/// Environment flags for spawned engine processes are carried here
/// explicitly and applied per child, never written to the parent process
/// environment, so concurrent jobs cannot interfere through ambient state.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Path to the declarative project definition fed to the engine
    pub project_file: PathBuf,
    /// Directory artifacts are written to
    pub output_dir: PathBuf,
    /// Engine CLI binary name
    pub cli_bin: String,
    /// On-demand package runner binary (used when the CLI is not on PATH)
    pub runner_bin: String,
    /// Package the runner fetches to obtain the CLI
    pub runner_package: String,
    /// Local port for the engine's serve mode
    pub serve_port: u16,
    /// Stdout marker indicating the serve-mode HTTP listener is up
    pub serve_ready_marker: String,
    /// Wall-clock budget for the library-call strategy
    pub library_timeout: Duration,
    /// Overall budget for the spawn-serve strategy
    pub serve_timeout: Duration,
    /// Wait after the HTTP trigger before checking for the output file
    pub settle_delay: Duration,
    /// Grace window between SIGTERM and SIGKILL for spawned children
    pub kill_grace: Duration,
    /// Interval for liveness heartbeat logs during long waits
    pub heartbeat_interval: Duration,
    /// Environment variables applied to spawned engine processes
    pub child_env: Vec<(String, String)>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            project_file: PathBuf::from("./project/project.ts"),
            output_dir: PathBuf::from("./output"),
            cli_bin: "revideo".to_string(),
            runner_bin: "npx".to_string(),
            runner_package: "@revideo/cli".to_string(),
            serve_port: 4000,
            serve_ready_marker: "Server listening".to_string(),
            library_timeout: Duration::from_secs(120),
            serve_timeout: Duration::from_secs(300),
            settle_delay: Duration::from_secs(2),
            kill_grace: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(10),
            child_env: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            project_file: std::env::var("ENGINE_PROJECT_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.project_file),
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            cli_bin: std::env::var("ENGINE_CLI_BIN").unwrap_or(defaults.cli_bin),
            runner_bin: std::env::var("ENGINE_RUNNER_BIN").unwrap_or(defaults.runner_bin),
            runner_package: std::env::var("ENGINE_RUNNER_PACKAGE").unwrap_or(defaults.runner_package),
            serve_port: std::env::var("ENGINE_SERVE_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.serve_port),
            serve_ready_marker: std::env::var("ENGINE_SERVE_READY_MARKER")
                .unwrap_or(defaults.serve_ready_marker),
            library_timeout: Duration::from_secs(
                std::env::var("ENGINE_LIBRARY_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            serve_timeout: Duration::from_secs(
                std::env::var("ENGINE_SERVE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            settle_delay: Duration::from_secs(
                std::env::var("ENGINE_SETTLE_DELAY_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            ),
            kill_grace: Duration::from_secs(
                std::env::var("ENGINE_KILL_GRACE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            heartbeat_interval: Duration::from_secs(
                std::env::var("ENGINE_HEARTBEAT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
            child_env: std::env::var("ENGINE_CHILD_ENV")
                .map(|s| parse_env_pairs(&s))
                .unwrap_or_default(),
        }
    }

    /// Absolute-or-relative artifact path the orchestrator dictates for a
    /// given output file name.
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}

/// Parse `KEY=VALUE,KEY2=VALUE2` pairs (e.g. browser-automation flags).
fn parse_env_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}
