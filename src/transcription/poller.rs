use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::CaptionError;
use super::job::{Job, JobStatus};
use super::provider::TranscriptionProvider;
use super::request::Task;
use super::segment::Segment;
use super::transliterate::{Scheme, Transliterator};

/// Reads job status; romanizes finished captions for the transliterate task.
#[derive(Clone)]
pub struct StatusPoller {
    provider: Arc<dyn TranscriptionProvider>,
    transliterator: Arc<dyn Transliterator>,
}

impl StatusPoller {
    pub fn new(
        provider: Arc<dyn TranscriptionProvider>,
        transliterator: Arc<dyn Transliterator>,
    ) -> Self {
        Self {
            provider,
            transliterator,
        }
    }

    /// One status read. Does not change anything on the provider side.
    pub async fn poll(&self, job_id: &str, task: Task) -> Result<Job, CaptionError> {
        let update = self.provider.poll(job_id, task).await?;
        let mut job = Job::from_update(update, task);

        debug!(job_id, status = %job.status, "Polled transcription job");

        match job.status {
            JobStatus::Succeeded => {
                if task == Task::Transliterate {
                    if let Some(segments) = job.output.take() {
                        job.output = Some(self.romanize(job_id, segments));
                    }
                }
                info!(
                    job_id,
                    segments = job.output.as_ref().map_or(0, Vec::len),
                    "Transcription job succeeded"
                );
            }
            JobStatus::Failed => {
                warn!(job_id, error = job.error.as_deref().unwrap_or(""), "Transcription job failed");
            }
            JobStatus::Canceled => {
                warn!(job_id, "Transcription job was canceled by the provider");
            }
            JobStatus::Starting | JobStatus::Processing => {}
        }

        Ok(job)
    }

    fn romanize(&self, job_id: &str, segments: Vec<Segment>) -> Vec<Segment> {
        if !self.transliterator.is_available() {
            warn!(
                job_id,
                transliterator = self.transliterator.name(),
                "Transliteration capability unavailable, keeping Devanagari text"
            );
            return segments;
        }

        segments
            .into_iter()
            .map(|mut segment| {
                segment.text = self.transliterator.transliterate(
                    &segment.text,
                    Scheme::Devanagari,
                    Scheme::Roman,
                );
                segment
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::job::JobUpdate;
    use crate::transcription::provider::fake::FakeProvider;
    use crate::transcription::transliterate::{DevanagariRomanizer, NoopTransliterator};

    fn hindi() -> Vec<Segment> {
        vec![
            Segment::new(1, 0.0, 1.5, "नमस्ते"),
            Segment::new(2, 1.5, 3.0, "आज"),
        ]
    }

    fn poller(provider: Arc<FakeProvider>, transliterator: Arc<dyn Transliterator>) -> StatusPoller {
        StatusPoller::new(provider, transliterator)
    }

    #[tokio::test]
    async fn test_pending_job_is_returned_as_is() {
        let provider = Arc::new(FakeProvider::new());
        provider.on_poll("job", Ok(JobUpdate::new("job", JobStatus::Processing)));

        let job = poller(provider, Arc::new(DevanagariRomanizer))
            .poll("job", Task::Transcribe)
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert!(job.output.is_none());
    }

    #[tokio::test]
    async fn test_transliterate_romanizes_segments() {
        let provider = Arc::new(FakeProvider::new());
        provider.on_poll("job", Ok(JobUpdate::new("job", JobStatus::Succeeded).with_output(hindi())));

        let job = poller(provider, Arc::new(DevanagariRomanizer))
            .poll("job", Task::Transliterate)
            .await
            .unwrap();
        let texts: Vec<String> = job.output.unwrap().into_iter().map(|s| s.text).collect();
        assert_eq!(texts, vec!["namaste", "aaj"]);
    }

    #[tokio::test]
    async fn test_transcribe_leaves_text_alone() {
        let provider = Arc::new(FakeProvider::new());
        provider.on_poll("job", Ok(JobUpdate::new("job", JobStatus::Succeeded).with_output(hindi())));

        let job = poller(provider, Arc::new(DevanagariRomanizer))
            .poll("job", Task::Transcribe)
            .await
            .unwrap();
        assert_eq!(job.output.unwrap(), hindi());
    }

    #[tokio::test]
    async fn test_missing_transliterator_passes_text_through() {
        let provider = Arc::new(FakeProvider::new());
        provider.on_poll("job", Ok(JobUpdate::new("job", JobStatus::Succeeded).with_output(hindi())));

        let job = poller(provider, Arc::new(NoopTransliterator))
            .poll("job", Task::Transliterate)
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.output.unwrap(), hindi());
    }

    #[tokio::test]
    async fn test_repeated_polls_are_stable() {
        let provider = Arc::new(FakeProvider::new());
        provider.on_poll("job", Ok(JobUpdate::new("job", JobStatus::Succeeded).with_output(hindi())));
        let poller = poller(provider, Arc::new(DevanagariRomanizer));

        let first = poller.poll("job", Task::Transliterate).await.unwrap();
        let second = poller.poll("job", Task::Transliterate).await.unwrap();
        assert_eq!(first.output, second.output);
    }

    #[tokio::test]
    async fn test_failure_message_is_preserved() {
        let provider = Arc::new(FakeProvider::new());
        provider.on_poll(
            "job",
            Ok(JobUpdate::new("job", JobStatus::Failed).with_error("unsupported audio codec")),
        );

        let job = poller(provider, Arc::new(NoopTransliterator))
            .poll("job", Task::Translate)
            .await
            .unwrap();
        assert_eq!(job.error.as_deref(), Some("unsupported audio codec"));
        assert_eq!(
            job.outcome(),
            Err(CaptionError::Provider("unsupported audio codec".to_string()))
        );
    }

    #[tokio::test]
    async fn test_transport_errors_propagate() {
        let provider = Arc::new(FakeProvider::new());
        provider.on_poll("job", Err(CaptionError::transport("")));

        let err = poller(provider, Arc::new(NoopTransliterator))
            .poll("job", Task::Transcribe)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "unknown error");
    }
}
