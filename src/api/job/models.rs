use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Job status enum representing the state of a generation job
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Terminal jobs never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

/// Output aspect ratio accepted by the generation service
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Wide,
    #[serde(rename = "9:16")]
    Tall,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Wide => "16:9",
            AspectRatio::Tall => "9:16",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "16:9" => Some(AspectRatio::Wide),
            "9:16" => Some(AspectRatio::Tall),
            _ => None,
        }
    }
}

/// Clip duration in seconds. Serialized as a bare number; only the
/// enumerated values are accepted.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(try_from = "u16", into = "u16")]
pub enum DurationSecs {
    #[default]
    Five,
    Ten,
}

impl DurationSecs {
    pub fn secs(&self) -> u16 {
        (*self).into()
    }

    pub fn parse(secs: u16) -> Option<Self> {
        Self::try_from(secs).ok()
    }
}

impl From<DurationSecs> for u16 {
    fn from(d: DurationSecs) -> u16 {
        match d {
            DurationSecs::Five => 5,
            DurationSecs::Ten => 10,
        }
    }
}

impl TryFrom<u16> for DurationSecs {
    type Error = String;

    fn try_from(secs: u16) -> Result<Self, Self::Error> {
        match secs {
            5 => Ok(DurationSecs::Five),
            10 => Ok(DurationSecs::Ten),
            other => Err(format!("duration must be 5 or 10 seconds, got {}", other)),
        }
    }
}

/// Output size/quality tier
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SizeTier {
    #[default]
    Small,
    Large,
}

impl SizeTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeTier::Small => "small",
            SizeTier::Large => "large",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "small" => Some(SizeTier::Small),
            "large" => Some(SizeTier::Large),
            _ => None,
        }
    }
}

/// Visual style preset
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    #[default]
    Natural,
    Anime,
    Cinematic,
}

impl Style {
    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Natural => "natural",
            Style::Anime => "anime",
            Style::Cinematic => "cinematic",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "natural" => Some(Style::Natural),
            "anime" => Some(Style::Anime),
            "cinematic" => Some(Style::Cinematic),
            _ => None,
        }
    }
}

/// Camera/subject motion intensity
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Motion {
    Low,
    #[default]
    Medium,
    High,
}

impl Motion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Motion::Low => "low",
            Motion::Medium => "medium",
            Motion::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Motion::Low),
            "medium" => Some(Motion::Medium),
            "high" => Some(Motion::High),
            _ => None,
        }
    }
}

/// Generation parameters, immutable after job creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JobParameters {
    pub aspect_ratio: AspectRatio,
    pub duration: DurationSecs,
    pub size: SizeTier,
    pub style: Style,
    pub motion: Motion,
}

/// One generation job as persisted by the job store
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct JobRecord {
    pub id: i64,
    pub owner_id: String,
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub duration: DurationSecs,
    pub size: SizeTier,
    pub style: Style,
    pub motion: Motion,
    pub external_id: Option<String>,
    pub status: JobStatus,
    pub progress: u8,
    pub result_url: Option<String>,
    pub error: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
