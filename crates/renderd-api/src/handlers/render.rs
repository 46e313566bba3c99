//! Render job intake handler.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use tracing::info;

use renderd_models::{
    JobPayload, RenderOutput, RenderRequest, RenderResult, ResponseEnvelope,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// `POST /render` (and `POST /`): parse a job payload, run the
/// orchestrator to its single terminal outcome, and return the envelope.
///
/// Render failures are still HTTP 200 with `status: "failed"` in the
/// body; only intake-level errors (bad JSON, unusable input) use 4xx.
pub async fn submit_render(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<ResponseEnvelope>> {
    let payload: JobPayload = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("Malformed JSON body: {}", e)))?;

    let request =
        RenderRequest::from_payload(payload).map_err(|e| ApiError::bad_request(e.to_string()))?;

    info!(
        job_id = %request.job_id,
        output_file = %request.output_file_name,
        variable_count = request.variables.len(),
        "Received render job"
    );

    let report = state.orchestrator.render(&request).await;

    let result = match report.outcome {
        Ok(artifact) => {
            let file_name = artifact
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| request.output_file_name.clone());
            RenderResult::completed(RenderOutput {
                output_path: artifact.path.display().to_string(),
                output_url: state.config.artifact_url(&file_name),
                file_size: artifact.size_bytes,
            })
        }
        Err(err) => {
            RenderResult::failed(err.to_string()).with_error_stack(attempt_trail(&report.attempts))
        }
    };

    Ok(Json(ResponseEnvelope::new(result)))
}

/// Human-readable per-strategy trail for failure diagnostics.
fn attempt_trail(attempts: &[renderd_engine::AttemptRecord]) -> String {
    attempts
        .iter()
        .map(|a| {
            format!(
                "{}: {} after {}ms",
                a.kind,
                a.outcome.as_str(),
                a.elapsed.as_millis()
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}
