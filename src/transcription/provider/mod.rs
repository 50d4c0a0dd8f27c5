//! External transcription services.
//!
//! A provider starts a job and answers status reads. It keeps no state of
//! its own between calls.

pub mod caption_api;
pub mod replicate;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use super::error::{CaptionError, UNKNOWN_ERROR};
use super::job::{JobStatus, JobUpdate};
use super::request::{ProviderRequest, Task};

pub use caption_api::CaptionApiProvider;
pub use replicate::ReplicateProvider;

/// Handle returned once a job has been accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub id: String,
    pub status: JobStatus,
}

#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Start one job. Never retried: job creation is not idempotent.
    async fn start(&self, request: ProviderRequest) -> Result<JobHandle, CaptionError>;

    /// Read the current status of a job. Safe to repeat.
    async fn poll(&self, job_id: &str, task: Task) -> Result<JobUpdate, CaptionError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Readable message from an error value, which may be a plain string or a
/// structured list as FastAPI emits for validation failures.
pub(crate) fn error_message(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.trim().is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Pull `detail` (or `error`) out of a non-2xx body.
pub(crate) fn parse_error_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .detail
        .as_ref()
        .and_then(error_message)
        .or_else(|| parsed.error.as_ref().and_then(error_message))
}

/// Map a non-2xx response to a provider or transport error.
pub(crate) async fn error_from_response(provider: &str, response: reqwest::Response) -> CaptionError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match parse_error_detail(&body) {
        Some(detail) => {
            warn!(provider, %status, %detail, "Provider rejected request");
            CaptionError::Provider(detail)
        }
        None => {
            warn!(provider, %status, "Provider returned an unreadable error response");
            CaptionError::Transport(UNKNOWN_ERROR.to_string())
        }
    }
}

/// Decode a 2xx body, or map the failure.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    provider: &str,
    response: reqwest::Response,
) -> Result<T, CaptionError> {
    if !response.status().is_success() {
        return Err(error_from_response(provider, response).await);
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        warn!(provider, "Failed to decode provider response: {}", e);
        CaptionError::Transport(format!("Invalid response from {}: {}", provider, e))
    })
}
