//! Produced artifact metadata.

use std::path::{Path, PathBuf};

use crate::error::{EngineError, EngineResult};

/// The produced video file on durable storage.
///
/// Existence on disk is the sole success signal for a render job; a clean
/// engine exit with no file is still a failure. The orchestrator never
/// deletes artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl OutputArtifact {
    /// Verify that the claimed output path materialized, capturing its size.
    pub async fn verify(path: &Path) -> EngineResult<Self> {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => Ok(Self {
                path: path.to_path_buf(),
                size_bytes: meta.len(),
            }),
            _ => Err(EngineError::OutputMissing(path.to_path_buf())),
        }
    }
}
