//! Client for the remote video generation service.
//!
//! All vendor protocol knowledge lives behind [`GenerationClient`]; the
//! orchestration layer only ever sees normalized results and never branches
//! on vendor status codes or payload shapes.

pub mod http;

use std::fmt;

use async_trait::async_trait;

use crate::api::job::models::{AspectRatio, DurationSecs, SizeTier};

/// Reason string persisted when the remote service no longer knows the job.
pub const TASK_NOT_FOUND_REASON: &str = "task not found";

/// Normalized remote job status, as reported by a status poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteJobStatus {
    Running { progress: u8 },
    Succeeded { result_url: String },
    Failed { reason: String },
}

/// Errors crossing the remote-service boundary.
///
/// During polling every variant is treated as transient and retried; at
/// submission time any variant fails the job. `Remote` displays the remote
/// message alone because it is persisted verbatim as the job's error text.
#[derive(Debug)]
pub enum GenerationError {
    /// Connection, DNS or timeout failure before a response arrived
    Transport(reqwest::Error),
    /// Non-success HTTP status from the remote service
    Http(u16),
    /// Remote service answered with a non-zero application code
    Remote { code: i64, msg: String },
    /// Response parsed but violated the documented shape
    Malformed(String),
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::Transport(e) => write!(f, "transport error: {}", e),
            GenerationError::Http(status) => write!(f, "remote service returned HTTP {}", status),
            GenerationError::Remote { msg, .. } => write!(f, "{}", msg),
            GenerationError::Malformed(detail) => write!(f, "malformed remote response: {}", detail),
        }
    }
}

impl std::error::Error for GenerationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenerationError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

/// Stateless wrapper over the remote generation API.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Submit a generation request; returns the remote-assigned external id.
    async fn submit(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
        duration: DurationSecs,
        size: SizeTier,
    ) -> Result<String, GenerationError>;

    /// Fetch the current status of a previously submitted job.
    ///
    /// A remote "job not found" answer maps to `Ok(Failed)` with
    /// [`TASK_NOT_FOUND_REASON`]; transport problems stay `Err` so callers
    /// can retry them.
    async fn fetch_status(&self, external_id: &str) -> Result<RemoteJobStatus, GenerationError>;
}
