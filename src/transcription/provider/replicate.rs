//! Prediction API backend for a hosted Whisper model.
//!
//! The API takes JSON only, so the video travels inline as a base64 data
//! URI. Predictions move through `starting`, `processing` and one of the
//! terminal states.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::{JobHandle, TranscriptionProvider, error_message, read_json};
use crate::transcription::error::CaptionError;
use crate::transcription::job::{JobStatus, JobUpdate};
use crate::transcription::request::{MediaFile, ProviderRequest, Task, WhisperTask};
use crate::transcription::segment::{RawSegment, normalize_segments};

pub const DEFAULT_BASE_URL: &str = "https://api.replicate.com/v1";

/// Configuration for the prediction API.
#[derive(Debug, Clone)]
pub struct ReplicateConfig {
    pub base_url: String,
    pub api_token: String,
    /// Model version the predictions run against
    pub version: String,
    pub timeout: Duration,
}

impl ReplicateConfig {
    pub fn new(api_token: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token: api_token.into(),
            version: version.into(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct PredictionInput {
    audio: String,
    language: &'static str,
    translate: bool,
    transcription: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    initial_prompt: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct CreatePrediction {
    version: String,
    input: PredictionInput,
}

#[derive(Debug, Deserialize)]
struct PredictionOutput {
    #[serde(default)]
    segments: Vec<RawSegment>,
    #[serde(default)]
    detected_language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: JobStatus,
    #[serde(default)]
    output: Option<PredictionOutput>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl From<Prediction> for JobUpdate {
    fn from(prediction: Prediction) -> Self {
        let (output, language) = match prediction.output {
            Some(out) => (Some(normalize_segments(out.segments)), out.detected_language),
            None => (None, None),
        };
        JobUpdate {
            id: prediction.id,
            status: prediction.status,
            output,
            language,
            duration: None,
            error: prediction.error.as_ref().and_then(error_message),
        }
    }
}

/// `data:<mime>;base64,<payload>`
pub fn data_uri(file: &MediaFile) -> String {
    format!("data:{};base64,{}", file.mime(), STANDARD.encode(&file.bytes))
}

fn build_prediction(version: &str, request: &ProviderRequest) -> CreatePrediction {
    let params = &request.params;
    CreatePrediction {
        version: version.to_string(),
        input: PredictionInput {
            audio: data_uri(&request.file),
            language: params.source_language.code(),
            translate: params.whisper_task == WhisperTask::Translate,
            transcription: "plain text",
            initial_prompt: params.initial_prompt,
        },
    }
}

pub struct ReplicateProvider {
    client: reqwest::Client,
    config: ReplicateConfig,
}

impl ReplicateProvider {
    pub fn new(config: ReplicateConfig) -> Result<Self, CaptionError> {
        if config.api_token.trim().is_empty() {
            return Err(CaptionError::Validation(
                "Prediction API token is not configured".to_string(),
            ));
        }
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }
}

#[async_trait]
impl TranscriptionProvider for ReplicateProvider {
    fn name(&self) -> &'static str {
        "replicate"
    }

    async fn start(&self, request: ProviderRequest) -> Result<JobHandle, CaptionError> {
        let body = build_prediction(&self.config.version, &request);
        drop(request);

        let response = self
            .client
            .post(self.url("/predictions"))
            .bearer_auth(&self.config.api_token)
            .json(&body)
            .send()
            .await?;

        let prediction: Prediction = read_json(self.name(), response).await?;
        info!(job_id = %prediction.id, status = %prediction.status, "Prediction created");

        Ok(JobHandle {
            id: prediction.id,
            status: prediction.status,
        })
    }

    async fn poll(&self, job_id: &str, _task: Task) -> Result<JobUpdate, CaptionError> {
        let response = self
            .client
            .get(self.url(&format!("/predictions/{}", job_id)))
            .bearer_auth(&self.config.api_token)
            .send()
            .await?;

        let prediction: Prediction = read_json(self.name(), response).await?;
        debug!(job_id, status = %prediction.status, "Prediction status");

        Ok(prediction.into())
    }
}
