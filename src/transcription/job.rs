//! Job lifecycle for one external transcription attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{CaptionError, UNKNOWN_ERROR};
use super::request::Task;
use super::segment::Segment;

/// Provider-side status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Canceled
        )
    }

    /// Whether a job in `self` may move to `next`.
    ///
    /// Terminal states accept nothing, and a job never goes back to
    /// `starting` once it is processing.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        match self {
            JobStatus::Starting => true,
            JobStatus::Processing => next != JobStatus::Starting,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Canceled => false,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Starting => write!(f, "starting"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Succeeded => write!(f, "succeeded"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Canceled => write!(f, "canceled"),
        }
    }
}

/// Status read returned by a provider
#[derive(Debug, Clone, PartialEq)]
pub struct JobUpdate {
    pub id: String,
    pub status: JobStatus,
    pub output: Option<Vec<Segment>>,
    pub language: Option<String>,
    /// Media length in seconds, when the provider measured it
    pub duration: Option<f64>,
    pub error: Option<String>,
}

impl JobUpdate {
    pub fn new(id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            status,
            output: None,
            language: None,
            duration: None,
            error: None,
        }
    }

    pub fn with_output(mut self, segments: Vec<Segment>) -> Self {
        self.output = Some(segments);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }
}

impl From<Job> for JobUpdate {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            status: job.status,
            output: job.output,
            language: job.language,
            duration: job.duration,
            error: job.error,
        }
    }
}

/// One transcription attempt
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub task: Task,
    pub output: Option<Vec<Segment>>,
    pub language: Option<String>,
    pub duration: Option<f64>,
    pub error: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl Job {
    pub fn new(id: impl Into<String>, status: JobStatus, task: Task) -> Self {
        Self {
            id: id.into(),
            status,
            task,
            output: None,
            language: None,
            duration: None,
            error: None,
            submitted_at: Utc::now(),
        }
    }

    pub fn from_update(update: JobUpdate, task: Task) -> Self {
        let mut job = Self::new(update.id.clone(), JobStatus::Starting, task);
        job.apply(update);
        job
    }

    /// Merge a status read into this job.
    ///
    /// Returns `false` and leaves the job untouched when the update belongs
    /// to another job or the transition is not allowed.
    pub fn apply(&mut self, update: JobUpdate) -> bool {
        if update.id != self.id {
            return false;
        }
        if update.status != self.status && !self.status.can_transition_to(update.status) {
            return false;
        }
        if self.status.is_terminal() {
            return false;
        }

        self.status = update.status;
        if update.output.is_some() {
            self.output = update.output;
        }
        if update.language.is_some() {
            self.language = update.language;
        }
        if update.duration.is_some() {
            self.duration = update.duration;
        }
        if update.error.is_some() {
            self.error = update.error;
        }
        true
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Seconds since the job was submitted
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.submitted_at
    }

    /// Segments for a succeeded job, or the error a terminal failure maps to.
    ///
    /// Returns `Ok(None)` while the job is still running.
    pub fn outcome(&self) -> Result<Option<Vec<Segment>>, CaptionError> {
        match self.status {
            JobStatus::Starting | JobStatus::Processing => Ok(None),
            JobStatus::Succeeded => Ok(Some(self.output.clone().unwrap_or_default())),
            JobStatus::Failed => Err(CaptionError::Provider(
                self.error
                    .clone()
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
            )),
            JobStatus::Canceled => Err(CaptionError::Provider(
                self.error
                    .clone()
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| "Transcription job was canceled".to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [JobStatus; 5] = [
        JobStatus::Starting,
        JobStatus::Processing,
        JobStatus::Succeeded,
        JobStatus::Failed,
        JobStatus::Canceled,
    ];

    #[test]
    fn test_processing_reachability() {
        let reachable: Vec<JobStatus> = ALL
            .into_iter()
            .filter(|next| JobStatus::Processing.can_transition_to(*next))
            .collect();
        assert_eq!(
            reachable,
            vec![
                JobStatus::Processing,
                JobStatus::Succeeded,
                JobStatus::Failed,
                JobStatus::Canceled
            ]
        );
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in ALL.into_iter().filter(|s| s.is_terminal()) {
            for next in ALL {
                assert!(!terminal.can_transition_to(next));

                let mut job = Job::new("job-1", terminal, Task::Transcribe);
                let before = job.clone();
                assert!(!job.apply(JobUpdate::new("job-1", next).with_error("late")));
                assert_eq!(job, before);
            }
        }
    }

    #[test]
    fn test_apply_ignores_other_jobs() {
        let mut job = Job::new("job-1", JobStatus::Processing, Task::Transcribe);
        assert!(!job.apply(JobUpdate::new("job-2", JobStatus::Succeeded)));
        assert_eq!(job.status, JobStatus::Processing);
    }

    #[test]
    fn test_apply_rejects_regression_to_starting() {
        let mut job = Job::new("job-1", JobStatus::Processing, Task::Transcribe);
        assert!(!job.apply(JobUpdate::new("job-1", JobStatus::Starting)));
        assert_eq!(job.status, JobStatus::Processing);
    }

    #[test]
    fn test_outcome_mapping() {
        let segments = vec![Segment::new(1, 0.0, 1.0, "hi")];
        let done = Job::from_update(
            JobUpdate::new("a", JobStatus::Succeeded).with_output(segments.clone()),
            Task::Transcribe,
        );
        assert_eq!(done.outcome(), Ok(Some(segments)));

        let failed = Job::from_update(
            JobUpdate::new("b", JobStatus::Failed).with_error("unsupported audio codec"),
            Task::Translate,
        );
        assert_eq!(
            failed.outcome(),
            Err(CaptionError::Provider("unsupported audio codec".to_string()))
        );

        let running = Job::new("c", JobStatus::Processing, Task::Transcribe);
        assert_eq!(running.outcome(), Ok(None));
    }

    #[test]
    fn test_blank_errors_fall_back_to_default_messages() {
        let canceled = Job::from_update(
            JobUpdate::new("a", JobStatus::Canceled).with_error("  "),
            Task::Transcribe,
        );
        assert_eq!(
            canceled.outcome(),
            Err(CaptionError::Provider("Transcription job was canceled".to_string()))
        );

        let failed = Job::from_update(
            JobUpdate::new("b", JobStatus::Failed).with_error(""),
            Task::Transcribe,
        );
        assert_eq!(failed.outcome(), Err(CaptionError::Provider(UNKNOWN_ERROR.to_string())));
    }

    #[test]
    fn test_apply_keeps_reported_duration() {
        let mut job = Job::new("a", JobStatus::Processing, Task::Transcribe);
        assert!(job.apply(JobUpdate::new("a", JobStatus::Succeeded).with_duration(12.5)));
        assert_eq!(job.duration, Some(12.5));
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_string(&JobStatus::Succeeded).unwrap(), "\"succeeded\"");
        let status: JobStatus = serde_json::from_str("\"canceled\"").unwrap();
        assert_eq!(status, JobStatus::Canceled);
    }
}
