use std::sync::Arc;
use tracing::{error, info};

use super::error::CaptionError;
use super::job::Job;
use super::provider::TranscriptionProvider;
use super::request::{ProviderRequest, TranscriptionRequest};

/// Starts one external job per call and returns without waiting for it.
#[derive(Clone)]
pub struct UploadSubmitter {
    provider: Arc<dyn TranscriptionProvider>,
    max_upload_bytes: u64,
}

impl UploadSubmitter {
    pub fn new(provider: Arc<dyn TranscriptionProvider>, max_upload_bytes: u64) -> Self {
        Self {
            provider,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    pub fn validate(&self, request: &TranscriptionRequest) -> Result<(), CaptionError> {
        request.validate(self.max_upload_bytes).map(|_| ())
    }

    /// Validate, apply the task overrides and start the job.
    ///
    /// A failed start is returned as is; job creation is never retried.
    pub async fn submit(&self, request: TranscriptionRequest) -> Result<Job, CaptionError> {
        self.validate(&request)?;

        let params = request.effective_params();
        let Some(file) = request.file else {
            return Err(CaptionError::Validation("No file provided".to_string()));
        };

        info!(
            provider = self.provider.name(),
            file = %file.filename,
            bytes = file.bytes.len(),
            task = %params.task,
            source_language = params.source_language.code(),
            output_language = params.output_language.code(),
            "Submitting transcription job"
        );

        let task = params.task;
        let handle = self
            .provider
            .start(ProviderRequest { file, params })
            .await
            .map_err(|e| {
                error!(provider = self.provider.name(), "Failed to start job: {}", e);
                e
            })?;

        info!(job_id = %handle.id, status = %handle.status, "Transcription job accepted");
        Ok(Job::new(handle.id, handle.status, task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::job::JobStatus;
    use crate::transcription::provider::fake::FakeProvider;
    use crate::transcription::request::{Language, MediaFile, Task, WhisperTask};

    fn submitter(provider: Arc<FakeProvider>) -> UploadSubmitter {
        UploadSubmitter::new(provider, 1024 * 1024)
    }

    fn video() -> Option<MediaFile> {
        Some(MediaFile::new("clip.mp4", vec![7u8; 32]))
    }

    #[tokio::test]
    async fn test_missing_file_makes_no_call() {
        let provider = Arc::new(FakeProvider::new());
        let err = submitter(provider.clone())
            .submit(TranscriptionRequest::new(None, Language::English, Task::Transcribe))
            .await
            .unwrap_err();

        assert!(matches!(err, CaptionError::Validation(_)));
        assert_eq!(provider.start_count(), 0);
    }

    #[tokio::test]
    async fn test_submit_returns_accepted_job() {
        let provider = Arc::new(FakeProvider::new());
        provider.accept("job-1");

        let job = submitter(provider.clone())
            .submit(TranscriptionRequest::new(video(), Language::French, Task::Transcribe))
            .await
            .unwrap();

        assert_eq!(job.id, "job-1");
        assert_eq!(job.status, JobStatus::Starting);
        assert_eq!(job.task, Task::Transcribe);
        assert_eq!(provider.start_count(), 1);
    }

    #[tokio::test]
    async fn test_translate_sends_english_output_for_every_language() {
        for language in Language::ALL {
            let provider = Arc::new(FakeProvider::new());
            provider.accept("job");
            submitter(provider.clone())
                .submit(TranscriptionRequest::new(video(), language, Task::Translate))
                .await
                .unwrap();

            let started = provider.started.lock().unwrap();
            assert_eq!(started[0].params.output_language, Language::English);
            assert_eq!(started[0].params.whisper_task, WhisperTask::Translate);
        }
    }

    #[tokio::test]
    async fn test_transliterate_forces_source_language() {
        for language in Language::ALL {
            let provider = Arc::new(FakeProvider::new());
            provider.accept("job");
            submitter(provider.clone())
                .submit(TranscriptionRequest::new(video(), language, Task::Transliterate))
                .await
                .unwrap();

            let started = provider.started.lock().unwrap();
            assert_eq!(started[0].params.source_language, Language::Hindi);
            assert!(started[0].params.initial_prompt.is_some());
        }
    }

    #[tokio::test]
    async fn test_start_failure_is_not_retried() {
        let provider = Arc::new(FakeProvider::new());
        provider.on_start(Err(CaptionError::Provider("quota exceeded".to_string())));
        provider.accept("never-used");

        let err = submitter(provider.clone())
            .submit(TranscriptionRequest::new(video(), Language::English, Task::Transcribe))
            .await
            .unwrap_err();

        assert_eq!(err, CaptionError::Provider("quota exceeded".to_string()));
        assert_eq!(provider.start_count(), 1);
    }
}
