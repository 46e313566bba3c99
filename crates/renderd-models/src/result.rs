//! Job outcome types returned to the caller.

use serde::{Deserialize, Serialize};

/// Terminal status of a render job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStatus {
    Completed,
    Failed,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::Completed => "completed",
            RenderStatus::Failed => "failed",
        }
    }
}

/// Metadata of a successfully produced artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderOutput {
    pub output_path: String,
    pub output_url: String,
    pub file_size: u64,
}

/// Final outcome of one render job. Exactly one per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderResult {
    pub status: RenderStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(flatten)]
    pub output: Option<RenderOutput>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_stack: Option<String>,
}

impl RenderResult {
    /// Build a success result from artifact metadata.
    pub fn completed(output: RenderOutput) -> Self {
        Self {
            status: RenderStatus::Completed,
            message: Some("Video rendered successfully".to_string()),
            output: Some(output),
            error: None,
            error_stack: None,
        }
    }

    /// Build a failure result with a human-readable error string.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: RenderStatus::Failed,
            message: None,
            output: None,
            error: Some(error.into()),
            error_stack: None,
        }
    }

    /// Attach a diagnostic stack/detail string to a failure.
    pub fn with_error_stack(mut self, stack: impl Into<String>) -> Self {
        self.error_stack = Some(stack.into());
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == RenderStatus::Completed
    }
}

/// HTTP response envelope: `{ "status": ..., "output": RenderResult }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub status: RenderStatus,
    pub output: RenderResult,
}

impl ResponseEnvelope {
    pub fn new(result: RenderResult) -> Self {
        Self {
            status: result.status,
            output: result,
        }
    }
}
