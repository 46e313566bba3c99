//! Artifact serving handler.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use tokio_util::io::ReaderStream;

use renderd_models::is_safe_file_name;

use crate::error::ApiError;
use crate::state::AppState;

/// `GET /output/:file_name` — stream a previously produced artifact.
///
/// Traversal attempts are rejected before touching the filesystem, so a
/// forbidden name is 403 whether or not such a file exists.
pub async fn serve_artifact(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Response, ApiError> {
    if !is_safe_file_name(&file_name) {
        return Err(ApiError::forbidden("Invalid artifact name"));
    }

    let path = state.config.output_dir.join(&file_name);
    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| ApiError::not_found("Artifact not found"))?;
    let size = file
        .metadata()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to stat artifact: {}", e)))?
        .len();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::CONTENT_LENGTH, size)
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
}
