//! Inbound job payload and its canonical form.

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::JobId;

/// Errors raised while canonicalizing a job payload.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request has no usable input object")]
    MissingInput,

    #[error("output file name is not allowed: {0}")]
    UnsafeFileName(String),
}

/// Raw wire payload of a render job.
///
/// `{ "input": { "variables": {...}, "outputFileName": "clip.mp4" }, "id": "..." }`
#[derive(Debug, Clone, Deserialize)]
pub struct JobPayload {
    pub input: Option<RenderInput>,
    #[serde(default)]
    pub id: Option<String>,
}

/// The `input` object of a job payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderInput {
    /// Template substitution values forwarded verbatim to the engine.
    #[serde(default)]
    pub variables: Option<Map<String, Value>>,
    /// Desired artifact file name, relative to the output directory.
    #[serde(default)]
    pub output_file_name: Option<String>,
}

/// Canonicalized render request. Built once per job, immutable thereafter.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub job_id: JobId,
    pub variables: Map<String, Value>,
    pub output_file_name: String,
}

impl RenderRequest {
    /// Canonicalize a raw payload: apply defaults and validate the file name.
    pub fn from_payload(payload: JobPayload) -> Result<Self, RequestError> {
        let input = payload.input.ok_or(RequestError::MissingInput)?;

        let output_file_name = match input.output_file_name {
            Some(name) => {
                if !is_safe_file_name(&name) {
                    return Err(RequestError::UnsafeFileName(name));
                }
                ensure_video_extension(name)
            }
            None => default_output_file_name(),
        };

        Ok(Self {
            job_id: payload
                .id
                .map(JobId::from_string)
                .unwrap_or_default(),
            variables: input.variables.unwrap_or_default(),
            output_file_name,
        })
    }
}

/// Synthesize a timestamp-derived default artifact name.
pub fn default_output_file_name() -> String {
    format!("output-{}.mp4", Utc::now().timestamp_millis())
}

/// Append the video extension when the client-supplied name has none.
pub fn ensure_video_extension(name: String) -> String {
    if name.contains('.') {
        name
    } else {
        format!("{}.mp4", name)
    }
}

/// A file name is safe when it cannot resolve outside the output directory.
pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
}
