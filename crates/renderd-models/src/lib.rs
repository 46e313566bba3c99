//! Shared data models for the renderd render service.

mod job;
mod request;
mod result;

pub use job::JobId;
pub use request::{
    default_output_file_name, ensure_video_extension, is_safe_file_name, JobPayload, RenderInput,
    RenderRequest, RequestError,
};
pub use result::{RenderOutput, RenderResult, RenderStatus, ResponseEnvelope};
