use chrono::NaiveDateTime;
use sqlx::FromRow;

use crate::api::job::models::{
    AspectRatio, DurationSecs, JobRecord, JobStatus, Motion, SizeTier, Style,
};
use crate::db::job_store::StoreError;

/// Database representation of a job with all fields
#[derive(Debug, FromRow)]
pub struct JobRow {
    pub id: i64,
    pub owner_id: String,
    pub prompt: String,
    pub aspect_ratio: String,
    pub duration: i16,
    pub size: String,
    pub style: String,
    pub motion: String,
    pub external_id: Option<String>,
    pub status: String,
    pub progress: i16,
    pub result_url: Option<String>,
    pub error: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<JobRow> for JobRecord {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(JobRecord {
            id: row.id,
            owner_id: row.owner_id,
            prompt: row.prompt,
            aspect_ratio: AspectRatio::parse(&row.aspect_ratio)
                .ok_or_else(|| decode("aspect_ratio", &row.aspect_ratio))?,
            duration: DurationSecs::parse(row.duration as u16)
                .ok_or_else(|| decode("duration", &row.duration.to_string()))?,
            size: SizeTier::parse(&row.size).ok_or_else(|| decode("size", &row.size))?,
            style: Style::parse(&row.style).ok_or_else(|| decode("style", &row.style))?,
            motion: Motion::parse(&row.motion).ok_or_else(|| decode("motion", &row.motion))?,
            external_id: row.external_id,
            status: JobStatus::parse(&row.status).ok_or_else(|| decode("status", &row.status))?,
            progress: row.progress.clamp(0, 100) as u8,
            result_url: row.result_url,
            error: row.error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn decode(column: &str, value: &str) -> StoreError {
    StoreError::Decode(format!("unexpected {} value: {}", column, value))
}
