//! Spawn-server-and-request strategy.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use renderd_models::RenderRequest;

use crate::command::{CommandRunner, EngineCommand};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::strategy::{RenderStrategy, StrategyKind};

/// Interval between output-file existence polls after the trigger.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How many trailing stderr lines from the serve child are retained for
/// error reporting.
const STDERR_TAIL_LINES: usize = 20;

/// Start the engine in serve mode, trigger the render over local HTTP,
/// and poll for the artifact.
///
/// The child is terminated gracefully (SIGTERM, then SIGKILL after the
/// grace window) regardless of outcome; no job returns while its server
/// process is still alive. The whole attempt shares one deadline.
pub struct SpawnServeStrategy {
    config: EngineConfig,
    client: reqwest::Client,
}

impl SpawnServeStrategy {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn render_url(&self) -> String {
        format!("http://127.0.0.1:{}/render", self.config.serve_port)
    }

    /// Read child stdout until the readiness marker appears or the
    /// deadline passes. Once ready, the remaining output is drained in
    /// the background so the child never blocks on a full pipe.
    async fn wait_for_ready(&self, child: &mut Child, deadline: Instant) -> EngineResult<()> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::ServeNotReady("stdout not captured".to_string()))?;
        let mut lines = BufReader::new(stdout).lines();

        loop {
            let remaining = deadline
                .checked_duration_since(Instant::now())
                .ok_or(EngineError::Timeout(self.config.serve_timeout.as_secs()))?;

            match tokio::time::timeout(remaining, lines.next_line()).await {
                Ok(Ok(Some(line))) => {
                    debug!("Engine serve output: {}", line);
                    if line.contains(&self.config.serve_ready_marker) {
                        tokio::spawn(async move {
                            while let Ok(Some(line)) = lines.next_line().await {
                                debug!("Engine serve output: {}", line);
                            }
                        });
                        return Ok(());
                    }
                }
                Ok(Ok(None)) => {
                    return Err(EngineError::ServeNotReady(
                        "server exited before becoming ready".to_string(),
                    ));
                }
                Ok(Err(e)) => return Err(EngineError::Io(e)),
                Err(_) => {
                    return Err(EngineError::Timeout(self.config.serve_timeout.as_secs()))
                }
            }
        }
    }

    /// POST the render variables to the local render endpoint.
    async fn trigger_render(
        &self,
        request: &RenderRequest,
        deadline: Instant,
    ) -> EngineResult<()> {
        let remaining = deadline
            .checked_duration_since(Instant::now())
            .ok_or(EngineError::Timeout(self.config.serve_timeout.as_secs()))?;

        let body = json!({
            "variables": request.variables,
            "outputFileName": request.output_file_name,
        });

        let response = self
            .client
            .post(self.render_url())
            .timeout(remaining)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(EngineError::invocation_failed(
                format!("render trigger returned HTTP {}", response.status()),
                None,
                None,
            ));
        }
        Ok(())
    }

    /// Poll for the output file after the settle delay.
    async fn await_output(&self, output_path: &PathBuf, deadline: Instant) -> EngineResult<()> {
        tokio::time::sleep(self.config.settle_delay).await;

        loop {
            if tokio::fs::try_exists(output_path).await.unwrap_or(false) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(EngineError::Timeout(self.config.serve_timeout.as_secs()));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Drain child stderr in the background, keeping the last few lines
    /// so a failed startup can report what the engine printed.
    fn drain_stderr(
        stderr: ChildStderr,
    ) -> (Arc<Mutex<VecDeque<String>>>, tokio::task::JoinHandle<()>) {
        let tail = Arc::new(Mutex::new(VecDeque::with_capacity(STDERR_TAIL_LINES)));
        let sink = Arc::clone(&tail);
        let handle = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Ok(mut buf) = sink.lock() {
                    if buf.len() == STDERR_TAIL_LINES {
                        buf.pop_front();
                    }
                    buf.push_back(line);
                }
            }
        });
        (tail, handle)
    }

    /// Terminate the child: graceful signal first, forced kill after the
    /// grace window.
    async fn shutdown(&self, mut child: Child) {
        #[cfg(unix)]
        if let Some(pid) = child.id() {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            match tokio::time::timeout(self.config.kill_grace, child.wait()).await {
                Ok(_) => return,
                Err(_) => {
                    warn!(
                        grace_secs = self.config.kill_grace.as_secs(),
                        "Engine server still alive after termination signal, killing"
                    );
                }
            }
        }

        let _ = child.kill().await;
        let _ = child.wait().await;
    }
}

#[async_trait]
impl RenderStrategy for SpawnServeStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SpawnServe
    }

    async fn attempt(&self, request: &RenderRequest) -> EngineResult<PathBuf> {
        CommandRunner::check_available(&self.config.cli_bin)?;

        let output_path = self.config.output_path(&request.output_file_name);
        let deadline = Instant::now() + self.config.serve_timeout;

        let mut child = EngineCommand::serve(
            &self.config.cli_bin,
            &self.config.project_file,
            self.config.serve_port,
        )
        .envs(self.config.child_env.iter().cloned())
        .to_tokio()
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

        let stderr_tail = child.stderr.take().map(Self::drain_stderr);

        info!(
            job_id = %request.job_id,
            port = self.config.serve_port,
            "Spawned engine render server"
        );

        let result = async {
            self.wait_for_ready(&mut child, deadline).await?;
            info!(job_id = %request.job_id, "Engine render server ready, triggering render");
            self.trigger_render(request, deadline).await?;
            self.await_output(&output_path, deadline).await?;
            Ok(output_path.clone())
        }
        .await;

        self.shutdown(child).await;

        match result {
            Err(EngineError::ServeNotReady(message)) => {
                // The child is dead, so the drain task finishes as soon
                // as it sees EOF on the pipe.
                let tail = match stderr_tail {
                    Some((tail, drain)) => {
                        let _ = tokio::time::timeout(Duration::from_secs(1), drain).await;
                        tail.lock()
                            .ok()
                            .map(|buf| buf.iter().cloned().collect::<Vec<_>>().join(" | "))
                            .unwrap_or_default()
                    }
                    None => String::new(),
                };
                if tail.is_empty() {
                    Err(EngineError::ServeNotReady(message))
                } else {
                    Err(EngineError::ServeNotReady(format!(
                        "{message}; stderr: {tail}"
                    )))
                }
            }
            other => other,
        }
    }
}
