//! Engine command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};

/// How many trailing stderr bytes to keep for diagnostics.
const STDERR_TAIL_BYTES: usize = 4096;

/// Builder for engine CLI invocations.
#[derive(Debug, Clone)]
pub struct EngineCommand {
    /// Program to execute
    program: String,
    /// Arguments in order
    args: Vec<String>,
    /// Environment applied to the child only
    env: Vec<(String, String)>,
}

impl EngineCommand {
    /// Create a bare command.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Build a `render` invocation of the engine CLI.
    pub fn render(
        cli_bin: impl Into<String>,
        project_file: &Path,
        output_path: &Path,
        variables_json: Option<&str>,
    ) -> Self {
        let mut cmd = Self::new(cli_bin)
            .arg("render")
            .arg(project_file.to_string_lossy())
            .arg("--output")
            .arg(output_path.to_string_lossy());
        if let Some(vars) = variables_json {
            cmd = cmd.arg("--variables").arg(vars);
        }
        cmd
    }

    /// Build a `serve` invocation of the engine CLI.
    pub fn serve(cli_bin: impl Into<String>, project_file: &Path, port: u16) -> Self {
        Self::new(cli_bin)
            .arg("serve")
            .arg(project_file.to_string_lossy())
            .arg("--port")
            .arg(port.to_string())
    }

    /// Re-issue this invocation through the on-demand package runner
    /// (`npx -p <package> <original command...>`).
    pub fn via_runner(self, runner_bin: impl Into<String>, package: impl Into<String>) -> Self {
        let mut wrapped = Self::new(runner_bin)
            .arg("-y")
            .arg("-p")
            .arg(package)
            .arg(self.program);
        wrapped.args.extend(self.args);
        wrapped.env = self.env;
        wrapped
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Apply child-only environment variables.
    pub fn envs<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.env.extend(vars);
        self
    }

    /// Program name.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Child-only environment variables.
    pub fn env_vars(&self) -> &[(String, String)] {
        &self.env
    }

    /// Built argument list.
    pub fn build_args(&self) -> &[String] {
        &self.args
    }

    /// Convert into a spawnable `tokio::process::Command`.
    pub fn to_tokio(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null());
        cmd
    }
}

/// Outcome of a completed subprocess run.
#[derive(Debug)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runner for engine commands.
pub struct CommandRunner;

impl CommandRunner {
    /// Check that a program exists on the search path.
    pub fn check_available(program: &str) -> EngineResult<PathBuf> {
        which::which(program).map_err(|_| EngineError::ToolUnavailable(program.to_string()))
    }

    /// Run a command to completion, capturing output.
    ///
    /// A non-zero exit is an invocation failure carrying the stderr tail.
    /// The wait itself is unbounded; callers that need a deadline wrap the
    /// whole attempt in a timer.
    pub async fn run(cmd: &EngineCommand) -> EngineResult<CommandOutput> {
        debug!(
            program = %cmd.program(),
            args = %cmd.build_args().join(" "),
            "Running engine command"
        );

        // kill_on_drop so a caller abandoning the wait (timeout race)
        // does not leave an orphaned engine process behind
        let output = cmd
            .to_tokio()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !stderr.is_empty() {
            debug!(program = %cmd.program(), "Engine stderr: {}", tail(&stderr));
        }

        if output.status.success() {
            Ok(CommandOutput { stdout, stderr })
        } else {
            warn!(
                program = %cmd.program(),
                exit_code = ?output.status.code(),
                "Engine command exited with non-zero status"
            );
            Err(EngineError::invocation_failed(
                format!("{} exited with non-zero status", cmd.program()),
                Some(tail(&stderr).to_string()),
                output.status.code(),
            ))
        }
    }
}

/// Trailing slice of a diagnostic string, kept on a char boundary.
fn tail(s: &str) -> &str {
    if s.len() <= STDERR_TAIL_BYTES {
        return s;
    }
    let mut start = s.len() - STDERR_TAIL_BYTES;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_command_args() {
        let cmd = EngineCommand::render(
            "revideo",
            Path::new("project/project.ts"),
            Path::new("output/clip.mp4"),
            Some(r#"{"headline":"Hi"}"#),
        );
        assert_eq!(cmd.program(), "revideo");
        let args = cmd.build_args();
        assert_eq!(args[0], "render");
        assert!(args.contains(&"--output".to_string()));
        assert!(args.contains(&"output/clip.mp4".to_string()));
        assert!(args.contains(&"--variables".to_string()));
    }

    #[test]
    fn test_runner_wrapping() {
        let cmd = EngineCommand::render(
            "revideo",
            Path::new("project/project.ts"),
            Path::new("output/clip.mp4"),
            None,
        )
        .via_runner("npx", "@revideo/cli");
        assert_eq!(cmd.program(), "npx");
        let args = cmd.build_args();
        let head: Vec<&str> = args[..4].iter().map(String::as_str).collect();
        assert_eq!(head, vec!["-y", "-p", "@revideo/cli", "revideo"]);
        assert_eq!(args[4], "render");
    }

    #[test]
    fn test_serve_command_args() {
        let cmd = EngineCommand::serve("revideo", Path::new("project/project.ts"), 4000);
        let args = cmd.build_args();
        assert_eq!(args[0], "serve");
        assert!(args.contains(&"--port".to_string()));
        assert!(args.contains(&"4000".to_string()));
    }

    #[test]
    fn test_tail_keeps_short_strings() {
        assert_eq!(tail("boom"), "boom");
    }
}
