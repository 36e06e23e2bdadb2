use serde::{Deserialize, Serialize};
use validator::Validate;

use super::models::{AspectRatio, DurationSecs, JobRecord, Motion, SizeTier, Style};

/// Request body for submitting a new generation job.
///
/// Parameters left out fall back to their defaults; out-of-enum values are
/// rejected during deserialization.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitJobRequest {
    #[validate(length(min = 1, max = 2000, message = "Prompt must be between 1 and 2000 characters"))]
    pub prompt: String,
    pub aspect_ratio: Option<AspectRatio>,
    pub duration: Option<DurationSecs>,
    pub size: Option<SizeTier>,
    pub style: Option<Style>,
    pub motion: Option<Motion>,
}

/// Response for a job submission
#[derive(Serialize)]
pub struct JobResponse {
    pub message: String,
    pub job: JobRecord,
}
