use std::fmt;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use tracing::debug;

use crate::api::job::models::{JobParameters, JobRecord, JobStatus};
use crate::db::models::JobRow;

/// Job store failures
#[derive(Debug)]
pub enum StoreError {
    /// Database operation failed
    Database(sqlx::Error),
    /// A stored row could not be decoded into a job record
    Decode(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Database(e) => write!(f, "database error: {}", e),
            StoreError::Decode(msg) => write!(f, "corrupt job row: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Database(e) => Some(e),
            StoreError::Decode(_) => None,
        }
    }
}

/// Fields of a new job, before the store assigns id and timestamps
#[derive(Debug, Clone)]
pub struct NewJob {
    pub owner_id: String,
    pub prompt: String,
    pub params: JobParameters,
}

/// Partial mutation applied through [`JobStore::update`].
///
/// The constructors are the only legal write shapes; orchestration code
/// never assembles a patch field by field.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub external_id: Option<String>,
    pub result_url: Option<String>,
    pub error: Option<String>,
}

impl JobPatch {
    /// Submission succeeded: record the remote id and start processing.
    pub fn processing(external_id: String) -> Self {
        JobPatch {
            status: Some(JobStatus::Processing),
            external_id: Some(external_id),
            ..Default::default()
        }
    }

    /// Intermediate progress report.
    pub fn progress(progress: u8) -> Self {
        JobPatch {
            progress: Some(progress.min(100)),
            ..Default::default()
        }
    }

    /// Terminal success with the generated asset.
    pub fn completed(result_url: String) -> Self {
        JobPatch {
            status: Some(JobStatus::Completed),
            progress: Some(100),
            result_url: Some(result_url),
            ..Default::default()
        }
    }

    /// Terminal failure with a human-readable reason.
    pub fn failed(reason: String) -> Self {
        JobPatch {
            status: Some(JobStatus::Failed),
            error: Some(reason),
            ..Default::default()
        }
    }
}

/// Durable CRUD for job records.
///
/// `update` only touches live jobs: a write against a terminal job answers
/// `Ok(None)`, so a poll result arriving after the terminal transition can
/// never overwrite it.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job in `pending` with progress 0; assigns id and stamps
    /// both timestamps.
    async fn create(&self, job: NewJob) -> Result<JobRecord, StoreError>;

    /// Apply a partial mutation to a non-terminal job and stamp `updated_at`.
    /// Returns `Ok(None)` when no live job with that id exists.
    async fn update(&self, id: i64, patch: JobPatch) -> Result<Option<JobRecord>, StoreError>;

    async fn get(&self, id: i64) -> Result<Option<JobRecord>, StoreError>;

    /// All jobs of one owner, newest first.
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<JobRecord>, StoreError>;

    /// Processing jobs that already have an external id, oldest first.
    /// Feeds the startup resume sweep.
    async fn list_in_flight(&self) -> Result<Vec<JobRecord>, StoreError>;
}

/// PostgreSQL-backed job store
pub struct PgJobStore {
    pool: Pool<Postgres>,
}

impl PgJobStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, job: NewJob) -> Result<JobRecord, StoreError> {
        debug!(owner_id = %job.owner_id, "creating job");

        let row = sqlx::query_as::<_, JobRow>(
            r#"
            INSERT INTO jobs (owner_id, prompt, aspect_ratio, duration, size, style, motion, status, progress)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', 0)
            RETURNING *
            "#,
        )
        .bind(&job.owner_id)
        .bind(&job.prompt)
        .bind(job.params.aspect_ratio.as_str())
        .bind(job.params.duration.secs() as i16)
        .bind(job.params.size.as_str())
        .bind(job.params.style.as_str())
        .bind(job.params.motion.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::Database)?;

        debug!(id = row.id, "job created");
        row.try_into()
    }

    async fn update(&self, id: i64, patch: JobPatch) -> Result<Option<JobRecord>, StoreError> {
        // The status guard makes terminal rows immutable at the database
        // level, regardless of what the caller sends.
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE jobs
            SET status = COALESCE($2, status),
                progress = COALESCE($3, progress),
                external_id = COALESCE($4, external_id),
                result_url = COALESCE($5, result_url),
                error = COALESCE($6, error),
                updated_at = NOW()
            WHERE id = $1 AND status NOT IN ('completed', 'failed')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.progress.map(|p| p as i16))
        .bind(patch.external_id)
        .bind(patch.result_url)
        .bind(patch.error)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::Database)?;

        row.map(JobRecord::try_from).transpose()
    }

    async fn get(&self, id: i64) -> Result<Option<JobRecord>, StoreError> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::Database)?;

        row.map(JobRecord::try_from).transpose()
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<JobRecord>, StoreError> {
        let rows = sqlx::query_as::<_, JobRow>(
            "SELECT * FROM jobs WHERE owner_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Database)?;

        rows.into_iter().map(JobRecord::try_from).collect()
    }

    async fn list_in_flight(&self) -> Result<Vec<JobRecord>, StoreError> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT * FROM jobs
            WHERE status = 'processing' AND external_id IS NOT NULL
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Database)?;

        rows.into_iter().map(JobRecord::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processing_patch_sets_status_and_external_id() {
        let patch = JobPatch::processing("ext-1".to_string());
        assert_eq!(patch.status, Some(JobStatus::Processing));
        assert_eq!(patch.external_id.as_deref(), Some("ext-1"));
        assert!(patch.progress.is_none());
        assert!(patch.result_url.is_none());
        assert!(patch.error.is_none());
    }

    #[test]
    fn progress_patch_is_clamped() {
        assert_eq!(JobPatch::progress(240).progress, Some(100));
        assert_eq!(JobPatch::progress(55).progress, Some(55));
    }

    #[test]
    fn completed_patch_forces_full_progress() {
        let patch = JobPatch::completed("https://cdn.example.com/v.mp4".to_string());
        assert_eq!(patch.status, Some(JobStatus::Completed));
        assert_eq!(patch.progress, Some(100));
        assert!(patch.error.is_none());
    }

    #[test]
    fn failed_patch_carries_only_the_reason() {
        let patch = JobPatch::failed("quota exceeded".to_string());
        assert_eq!(patch.status, Some(JobStatus::Failed));
        assert_eq!(patch.error.as_deref(), Some("quota exceeded"));
        assert!(patch.result_url.is_none());
        assert!(patch.progress.is_none());
    }
}
