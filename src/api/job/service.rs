use std::fmt;
use std::sync::Arc;

use actix_web::{HttpResponse, ResponseError};
use tracing::{error, info, warn};

use crate::api::validation::ErrorResponse;
use crate::db::job_store::{JobPatch, JobStore, NewJob, StoreError};
use crate::events::{EventSink, JobEvent};
use crate::remote::GenerationClient;
use crate::worker::PollCoordinator;

use super::dto::SubmitJobRequest;
use super::models::{JobParameters, JobRecord};

/// Service-level errors
#[derive(Debug)]
pub enum ServiceError {
    /// Job store operation failed
    Store(StoreError),

    /// Request rejected before any store or remote call
    Validation(String),

    /// Job missing, or owned by a different caller. Ownership violations
    /// deliberately look identical to a missing job.
    NotFound(i64),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Store(e) => write!(f, "store error: {}", e),
            ServiceError::Validation(msg) => write!(f, "validation error: {}", msg),
            ServiceError::NotFound(id) => write!(f, "job not found: {}", id),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        ServiceError::Store(e)
    }
}

impl ResponseError for ServiceError {
    fn error_response(&self) -> HttpResponse {
        match self {
            ServiceError::Store(e) => {
                error!("Store error: {}", e);
                HttpResponse::InternalServerError().json(ErrorResponse {
                    error: "Failed to process request".to_string(),
                    fields: serde_json::json!({"message": "Storage error occurred"}),
                })
            }
            ServiceError::Validation(msg) => {
                warn!("Validation error: {}", msg);
                HttpResponse::BadRequest().json(ErrorResponse {
                    error: "Validation failed".to_string(),
                    fields: serde_json::json!({"message": msg}),
                })
            }
            ServiceError::NotFound(id) => {
                warn!("Job not found: {}", id);
                HttpResponse::NotFound().json(ErrorResponse {
                    error: "Not found".to_string(),
                    fields: serde_json::json!({"message": format!("Job with id {} not found", id)}),
                })
            }
        }
    }
}

/// The submission service: the only externally callable surface of the
/// orchestration core.
pub struct JobService {
    store: Arc<dyn JobStore>,
    client: Arc<dyn GenerationClient>,
    events: Arc<dyn EventSink>,
    coordinator: Arc<PollCoordinator>,
}

impl JobService {
    pub fn new(
        store: Arc<dyn JobStore>,
        client: Arc<dyn GenerationClient>,
        events: Arc<dyn EventSink>,
        coordinator: Arc<PollCoordinator>,
    ) -> Self {
        Self {
            store,
            client,
            events,
            coordinator,
        }
    }

    /// Create a job, submit it to the remote service and start polling.
    ///
    /// Returns the record as of this call; generation continues in the
    /// background and callers follow it via [`JobService::get_job`]. A remote
    /// rejection still answers with the (failed) record, never an error:
    /// once the job exists, failures land on the record.
    pub async fn submit_job(
        &self,
        owner_id: &str,
        request: SubmitJobRequest,
    ) -> Result<JobRecord, ServiceError> {
        if request.prompt.trim().is_empty() {
            return Err(ServiceError::Validation("Prompt must not be empty".to_string()));
        }

        let params = JobParameters {
            aspect_ratio: request.aspect_ratio.unwrap_or_default(),
            duration: request.duration.unwrap_or_default(),
            size: request.size.unwrap_or_default(),
            style: request.style.unwrap_or_default(),
            motion: request.motion.unwrap_or_default(),
        };

        let record = self
            .store
            .create(NewJob {
                owner_id: owner_id.to_string(),
                prompt: request.prompt,
                params,
            })
            .await?;

        info!(job_id = record.id, owner_id = %owner_id, "job created, submitting to remote service");

        match self
            .client
            .submit(&record.prompt, params.aspect_ratio, params.duration, params.size)
            .await
        {
            Ok(external_id) => {
                let updated = self
                    .store
                    .update(record.id, JobPatch::processing(external_id.clone()))
                    .await?;
                let record = match updated {
                    Some(record) => record,
                    None => {
                        // Job vanished or turned terminal between create and
                        // update; nothing to poll.
                        warn!(job_id = record.id, "job not updatable after submission");
                        return self
                            .store
                            .get(record.id)
                            .await?
                            .ok_or(ServiceError::NotFound(record.id));
                    }
                };

                self.events.emit(&JobEvent::Submitted {
                    job_id: record.id,
                    owner_id: owner_id.to_string(),
                });
                self.coordinator.clone().start(record.id, external_id).await;
                Ok(record)
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(job_id = record.id, reason = %reason, "remote submission rejected");
                self.events.emit(&JobEvent::Rejected {
                    job_id: record.id,
                    reason: reason.clone(),
                });
                let failed = self.store.update(record.id, JobPatch::failed(reason)).await?;
                Ok(failed.unwrap_or(record))
            }
        }
    }

    /// Fetch one job, scoped to its owner.
    pub async fn get_job(&self, owner_id: &str, id: i64) -> Result<JobRecord, ServiceError> {
        match self.store.get(id).await? {
            Some(record) if record.owner_id == owner_id => Ok(record),
            _ => Err(ServiceError::NotFound(id)),
        }
    }

    /// All jobs of one owner, newest first.
    pub async fn list_jobs(&self, owner_id: &str) -> Result<Vec<JobRecord>, ServiceError> {
        Ok(self.store.list_by_owner(owner_id).await?)
    }

    /// Restart poll loops for jobs that were in flight when the process
    /// last stopped. Returns the number of loops started.
    pub async fn resume_in_flight(&self) -> Result<usize, ServiceError> {
        let jobs = self.store.list_in_flight().await?;
        let mut started = 0;
        for job in jobs {
            let Some(external_id) = job.external_id else {
                continue;
            };
            if self.coordinator.clone().start(job.id, external_id).await {
                started += 1;
            }
        }
        if started > 0 {
            info!(count = started, "resumed poll loops for in-flight jobs");
        }
        Ok(started)
    }
}
