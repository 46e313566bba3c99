//! Error types for engine invocation.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while invoking the rendering engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine tool not found in PATH: {0}")]
    ToolUnavailable(String),

    #[error("engine invocation failed: {message}")]
    InvocationFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("engine reported success but output file is missing: {0}")]
    OutputMissing(PathBuf),

    #[error("strategy timed out after {0} seconds")]
    Timeout(u64),

    #[error("render server never became ready: {0}")]
    ServeNotReady(String),

    #[error("render trigger request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("all render strategies exhausted; last error: {0}")]
    Exhausted(String),
}

impl EngineError {
    /// Create an invocation failure error.
    pub fn invocation_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::InvocationFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Whether this error was an explicit deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
