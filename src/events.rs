use tracing::info;

/// Lifecycle events emitted by the orchestration layer.
///
/// Events are fire-and-forget: they are emitted before the corresponding
/// state is persisted, so observers see progress without waiting on storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// Job accepted by the remote service, polling started
    Submitted { job_id: i64, owner_id: String },
    /// Remote service rejected the submission
    Rejected { job_id: i64, reason: String },
    /// Remote service reported intermediate progress
    Progress { job_id: i64, progress: u8 },
    /// Job finished with a result
    Completed { job_id: i64, result_url: String },
    /// Job finished in failure
    Failed { job_id: i64, reason: String },
}

/// Notification/analytics sink. Implementations must never fail the caller.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &JobEvent);
}

/// Sink that writes events to the tracing pipeline.
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&self, event: &JobEvent) {
        match event {
            JobEvent::Submitted { job_id, owner_id } => {
                info!(job_id, owner_id = %owner_id, "event: job submitted");
            }
            JobEvent::Rejected { job_id, reason } => {
                info!(job_id, reason = %reason, "event: job rejected at submission");
            }
            JobEvent::Progress { job_id, progress } => {
                info!(job_id, progress, "event: job progress");
            }
            JobEvent::Completed { job_id, result_url } => {
                info!(job_id, result_url = %result_url, "event: job completed");
            }
            JobEvent::Failed { job_id, reason } => {
                info!(job_id, reason = %reason, "event: job failed");
            }
        }
    }
}
