use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::job::models::{AspectRatio, DurationSecs, SizeTier};

use super::{GenerationClient, GenerationError, RemoteJobStatus, TASK_NOT_FOUND_REASON};

const CODE_OK: i64 = 0;
const CODE_TASK_NOT_FOUND: i64 = -22;

/// Configuration for the HTTP generation client.
#[derive(Debug, Clone)]
pub struct RemoteApiConfig {
    /// Remote API base URL, without trailing slash.
    pub base_url: String,
    /// Bearer token sent with every request.
    pub api_key: String,
    /// Model name, part of the submit URL path.
    pub model: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for RemoteApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.example.com".to_string(),
            api_key: String::new(),
            model: "video-std".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Production [`GenerationClient`] speaking the remote JSON protocol.
pub struct HttpGenerationClient {
    http: reqwest::Client,
    config: RemoteApiConfig,
}

impl HttpGenerationClient {
    pub fn new(config: RemoteApiConfig) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(GenerationError::Transport)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &RemoteApiConfig {
        &self.config
    }
}

#[async_trait]
impl GenerationClient for HttpGenerationClient {
    async fn submit(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
        duration: DurationSecs,
        size: SizeTier,
    ) -> Result<String, GenerationError> {
        let url = format!("{}/v1/video/{}", self.config.base_url, self.config.model);
        let body = SubmitBody {
            model: &self.config.model,
            prompt,
            aspect_ratio,
            duration: duration.secs(),
            size,
            // Webhook delivery disabled; this service only polls.
            web_hook: "-1",
            shut_progress: false,
        };

        debug!(model = %self.config.model, "submitting generation request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(GenerationError::Transport)?;

        if !response.status().is_success() {
            return Err(GenerationError::Http(response.status().as_u16()));
        }

        let envelope: ApiEnvelope<SubmitData> =
            response.json().await.map_err(GenerationError::Transport)?;
        map_submit(envelope)
    }

    async fn fetch_status(&self, external_id: &str) -> Result<RemoteJobStatus, GenerationError> {
        let url = format!("{}/v1/draw/result", self.config.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&StatusBody { id: external_id })
            .send()
            .await
            .map_err(GenerationError::Transport)?;

        if !response.status().is_success() {
            return Err(GenerationError::Http(response.status().as_u16()));
        }

        let envelope: ApiEnvelope<StatusData> =
            response.json().await.map_err(GenerationError::Transport)?;
        map_status(envelope)
    }
}

// Wire types. The remote API uses camelCase keys on the submit body.

#[derive(Serialize)]
struct SubmitBody<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(rename = "aspectRatio")]
    aspect_ratio: AspectRatio,
    duration: u16,
    size: SizeTier,
    #[serde(rename = "webHook")]
    web_hook: &'a str,
    #[serde(rename = "shutProgress")]
    shut_progress: bool,
}

#[derive(Serialize)]
struct StatusBody<'a> {
    id: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct SubmitData {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StatusData {
    #[allow(dead_code)]
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    progress: i64,
    results: Option<Vec<ResultItem>>,
    error: Option<String>,
    failure_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultItem {
    url: String,
}

fn map_submit(envelope: ApiEnvelope<SubmitData>) -> Result<String, GenerationError> {
    if envelope.code != CODE_OK {
        return Err(GenerationError::Remote {
            code: envelope.code,
            msg: envelope.msg,
        });
    }
    match envelope.data {
        Some(data) if !data.id.is_empty() => Ok(data.id),
        _ => Err(GenerationError::Malformed(
            "submit response missing external id".to_string(),
        )),
    }
}

fn map_status(envelope: ApiEnvelope<StatusData>) -> Result<RemoteJobStatus, GenerationError> {
    if envelope.code == CODE_TASK_NOT_FOUND {
        // The remote forgot the job; terminal, not retryable.
        return Ok(RemoteJobStatus::Failed {
            reason: TASK_NOT_FOUND_REASON.to_string(),
        });
    }
    if envelope.code != CODE_OK {
        return Err(GenerationError::Remote {
            code: envelope.code,
            msg: envelope.msg,
        });
    }

    let msg = envelope.msg;
    let data = envelope
        .data
        .ok_or_else(|| GenerationError::Malformed("status response missing data".to_string()))?;

    match data.status.to_ascii_lowercase().as_str() {
        "succeeded" | "success" | "completed" => {
            let url = data
                .results
                .into_iter()
                .flatten()
                .map(|r| r.url)
                .find(|u| !u.is_empty());
            match url {
                Some(result_url) => Ok(RemoteJobStatus::Succeeded { result_url }),
                // Persisting completed without a URL would break the
                // result/status pairing; treat as transient and repoll.
                None => Err(GenerationError::Malformed(
                    "succeeded status without result url".to_string(),
                )),
            }
        }
        "failed" | "error" => {
            let reason = data
                .failure_reason
                .or(data.error)
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| {
                    if msg.is_empty() {
                        "generation failed".to_string()
                    } else {
                        msg
                    }
                });
            Ok(RemoteJobStatus::Failed { reason })
        }
        _ => Ok(RemoteJobStatus::Running {
            progress: data.progress.clamp(0, 100) as u8,
        }),
    }
}
