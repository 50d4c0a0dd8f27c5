//! Caption REST API backend.
//!
//! `POST /transcriptions` takes the video as multipart form data and answers
//! `202 Accepted` with a job id; `GET /transcriptions/{id}` reports progress.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{JobHandle, TranscriptionProvider, error_message, read_json};
use crate::transcription::error::CaptionError;
use crate::transcription::job::{JobStatus, JobUpdate};
use crate::transcription::request::{ProviderRequest, Task};
use crate::transcription::segment::{RawSegment, normalize_segments};

/// Configuration for the caption API.
#[derive(Debug, Clone)]
pub struct CaptionApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl CaptionApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Deserialize)]
struct AcceptedBody {
    id: String,
    status: JobStatus,
}

#[derive(Debug, Deserialize)]
struct OutputBody {
    #[serde(default)]
    segments: Vec<RawSegment>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration_seconds: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    id: String,
    status: JobStatus,
    #[serde(default)]
    output: Option<OutputBody>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl From<StatusBody> for JobUpdate {
    fn from(body: StatusBody) -> Self {
        let (output, language, duration) = match body.output {
            Some(out) => (
                Some(normalize_segments(out.segments)),
                out.language,
                out.duration_seconds,
            ),
            None => (None, None, None),
        };
        JobUpdate {
            id: body.id,
            status: body.status,
            output,
            language,
            duration,
            error: body.error.as_ref().and_then(error_message),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HealthBody {
    status: String,
}

pub struct CaptionApiProvider {
    client: reqwest::Client,
    config: CaptionApiConfig,
}

impl CaptionApiProvider {
    pub fn new(config: CaptionApiConfig) -> Result<Self, CaptionError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn status_request(&self, job_id: &str, task: Task) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(&format!("/transcriptions/{}", job_id)))
            .query(&[("task", task.as_str())])
    }

    /// `GET /healthz`; true when the service answers `{"status": "ok"}`.
    pub async fn health(&self) -> Result<bool, CaptionError> {
        let response = self.client.get(self.url("/healthz")).send().await?;
        let body: HealthBody = read_json(self.name(), response).await?;
        Ok(body.status == "ok")
    }
}

/// Multipart form for a submission.
fn build_form(request: ProviderRequest) -> Result<reqwest::multipart::Form, CaptionError> {
    let mime = request.file.mime().to_string();
    let part = reqwest::multipart::Part::bytes(request.file.bytes)
        .file_name(request.file.filename)
        .mime_str(&mime)
        .map_err(|e| CaptionError::Validation(format!("Invalid content type {}: {}", mime, e)))?;

    Ok(reqwest::multipart::Form::new()
        .part("file", part)
        .text("language", request.params.source_language.code())
        .text("task", request.params.task.as_str()))
}

#[async_trait]
impl TranscriptionProvider for CaptionApiProvider {
    fn name(&self) -> &'static str {
        "caption-api"
    }

    async fn start(&self, request: ProviderRequest) -> Result<JobHandle, CaptionError> {
        let task = request.params.task;
        let form = build_form(request)?;

        let response = self
            .client
            .post(self.url("/transcriptions"))
            .multipart(form)
            .send()
            .await?;

        let body: AcceptedBody = read_json(self.name(), response).await?;
        info!(job_id = %body.id, status = %body.status, %task, "Caption API accepted job");

        Ok(JobHandle {
            id: body.id,
            status: body.status,
        })
    }

    async fn poll(&self, job_id: &str, task: Task) -> Result<JobUpdate, CaptionError> {
        let response = self.status_request(job_id, task).send().await?;

        let body: StatusBody = read_json(self.name(), response).await?;
        if body.id != job_id {
            warn!(requested = job_id, returned = %body.id, "Caption API answered for a different job");
        }
        debug!(job_id, status = %body.status, "Caption API status");

        Ok(body.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::segment::Segment;

    #[test]
    fn test_status_body_success() {
        let body: StatusBody = serde_json::from_str(
            r#"{"id":"job-1","status":"succeeded",
                "output":{"language":"en","duration_seconds":10.0,"segments":[{"index":1,"start":0.0,"end":2.5,"text":" Hello "}]}}"#,
        )
        .unwrap();
        let update: JobUpdate = body.into();
        assert_eq!(update.status, JobStatus::Succeeded);
        assert_eq!(update.language.as_deref(), Some("en"));
        assert_eq!(update.duration, Some(10.0));
        assert_eq!(update.output, Some(vec![Segment::new(1, 0.0, 2.5, "Hello")]));
        assert_eq!(update.error, None);
    }

    #[test]
    fn test_status_body_failure_and_pending() {
        let failed: JobUpdate = serde_json::from_str::<StatusBody>(
            r#"{"id":"job-2","status":"failed","error":"unsupported audio codec"}"#,
        )
        .unwrap()
        .into();
        assert_eq!(failed.error.as_deref(), Some("unsupported audio codec"));

        let pending: JobUpdate =
            serde_json::from_str::<StatusBody>(r#"{"id":"job-3","status":"processing","error":null}"#)
                .unwrap()
                .into();
        assert_eq!(pending.status, JobStatus::Processing);
        assert_eq!(pending.output, None);
    }

    #[test]
    fn test_config_trims_base_url() {
        let config = CaptionApiConfig::new(" http://localhost:8000/ ");
        assert_eq!(config.base_url, "http://localhost:8000");
        let provider = CaptionApiProvider::new(config).unwrap();
        assert_eq!(provider.url("/transcriptions"), "http://localhost:8000/transcriptions");
    }

    #[test]
    fn test_status_request_carries_task_query() {
        let provider = CaptionApiProvider::new(CaptionApiConfig::new("http://localhost:8000")).unwrap();
        let request = provider
            .status_request("job-1", Task::Transliterate)
            .build()
            .unwrap();
        assert_eq!(request.method(), reqwest::Method::GET);
        assert_eq!(
            request.url().as_str(),
            "http://localhost:8000/transcriptions/job-1?task=transliterate"
        );
    }

    #[tokio::test]
    async fn test_status_response_decodes_into_update() {
        let response = reqwest::Response::from(
            http::Response::builder()
                .status(200)
                .body(r#"{"id":"job-1","status":"processing"}"#.to_string())
                .unwrap(),
        );
        let body: StatusBody = read_json("caption-api", response).await.unwrap();
        let update: JobUpdate = body.into();
        assert_eq!(update, JobUpdate::new("job-1", JobStatus::Processing));
    }
}
