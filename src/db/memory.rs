use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::api::job::models::{JobRecord, JobStatus};
use crate::db::job_store::{JobPatch, JobStore, NewJob, StoreError};

/// In-memory job store with the same semantics as the Postgres store,
/// including terminal-write protection. Used by the test suite and as a
/// store-less development backend.
pub struct MemoryJobStore {
    inner: Mutex<Inner>,
}

struct Inner {
    next_id: i64,
    jobs: HashMap<i64, JobRecord>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 1,
                jobs: HashMap::new(),
            }),
        }
    }
}

impl Default for MemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: NewJob) -> Result<JobRecord, StoreError> {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id;
        inner.next_id += 1;

        let now = chrono::Utc::now().naive_utc();
        let record = JobRecord {
            id,
            owner_id: job.owner_id,
            prompt: job.prompt,
            aspect_ratio: job.params.aspect_ratio,
            duration: job.params.duration,
            size: job.params.size,
            style: job.params.style,
            motion: job.params.motion,
            external_id: None,
            status: JobStatus::Pending,
            progress: 0,
            result_url: None,
            error: None,
            created_at: now,
            updated_at: now,
        };
        inner.jobs.insert(id, record.clone());
        Ok(record)
    }

    async fn update(&self, id: i64, patch: JobPatch) -> Result<Option<JobRecord>, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(record) = inner.jobs.get_mut(&id) else {
            return Ok(None);
        };
        // Terminal rows are immutable, matching the Postgres status guard.
        if record.status.is_terminal() {
            return Ok(None);
        }

        if let Some(status) = patch.status {
            record.status = status;
        }
        if let Some(progress) = patch.progress {
            record.progress = progress.min(100);
        }
        if let Some(external_id) = patch.external_id {
            record.external_id = Some(external_id);
        }
        if let Some(result_url) = patch.result_url {
            record.result_url = Some(result_url);
        }
        if let Some(error) = patch.error {
            record.error = Some(error);
        }
        record.updated_at = chrono::Utc::now().naive_utc();

        Ok(Some(record.clone()))
    }

    async fn get(&self, id: i64) -> Result<Option<JobRecord>, StoreError> {
        Ok(self.inner.lock().await.jobs.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<JobRecord>, StoreError> {
        let inner = self.inner.lock().await;
        let mut jobs: Vec<JobRecord> = inner
            .jobs
            .values()
            .filter(|j| j.owner_id == owner_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(jobs)
    }

    async fn list_in_flight(&self) -> Result<Vec<JobRecord>, StoreError> {
        let inner = self.inner.lock().await;
        let mut jobs: Vec<JobRecord> = inner
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Processing && j.external_id.is_some())
            .cloned()
            .collect();
        jobs.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(jobs)
    }
}
