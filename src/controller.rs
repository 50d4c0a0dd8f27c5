//! Per-user caption session: submit, poll until the job settles, keep the
//! resulting segments for export.
//!
//! A new submission supersedes the previous one. Every asynchronous result
//! is tagged with the submission generation and job id it belongs to, and
//! is dropped unless that tag is still the active one.

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use crate::transcription::{
    CaptionError, ErrorKind, ExportFormat, Job, Segment, StatusPoller, Task,
    TranscriptionRequest, UploadSubmitter,
};

/// Poll cadence and budget
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    /// Delay before the first status read
    pub interval: Duration,
    /// Upper bound for the delay once back-off kicks in
    pub max_interval: Duration,
    /// Delay multiplier applied after every attempt (1.0 = fixed interval)
    pub backoff: f64,
    /// Status reads allowed before giving up
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_interval: Duration::from_secs(3),
            backoff: 1.0,
            max_attempts: 100, // 5 minutes at the default interval
        }
    }
}

impl PollConfig {
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_interval: interval,
            backoff: 1.0,
            max_attempts,
        }
    }

    /// Delay before status read number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff.max(1.0).powi(attempt.saturating_sub(1) as i32);
        let delay = self.interval.as_secs_f64() * factor;
        let cap = self.max_interval.max(self.interval).as_secs_f64();
        Duration::from_secs_f64(delay.min(cap))
    }
}

/// Where the session is in its submit/poll cycle
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Idle,
    Submitting,
    Polling { job_id: String, attempt: u32 },
    Done,
    Error { kind: ErrorKind, message: String },
}

impl Phase {
    pub fn is_busy(&self) -> bool {
        matches!(self, Phase::Submitting | Phase::Polling { .. })
    }
}

/// Everything the UI renders
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerState {
    /// Submission counter; bumped by every accepted submission and cancel
    pub generation: u64,
    pub phase: Phase,
    pub job: Option<Job>,
    pub segments: Vec<Segment>,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            generation: 0,
            phase: Phase::Idle,
            job: None,
            segments: Vec::new(),
        }
    }
}

impl ControllerState {
    fn is_current(&self, generation: u64, job_id: Option<&str>) -> bool {
        self.generation == generation
            && match job_id {
                Some(id) => self.job.as_ref().is_some_and(|job| job.id == id),
                None => true,
            }
    }
}

/// Result of a succeeded job
#[derive(Debug, Clone, PartialEq)]
pub struct Captions {
    pub segments: Vec<Segment>,
    /// Language the provider detected or produced
    pub language: Option<String>,
}

/// How one `generate` call ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed(Captions),
    Failed(CaptionError),
    /// A newer submission or a cancel took over; nothing was applied.
    Superseded,
}

/// Owns the session state; the only writer to it.
pub struct CaptionController {
    submitter: UploadSubmitter,
    poller: StatusPoller,
    config: PollConfig,
    state: watch::Sender<ControllerState>,
    /// Fires (or drops) to abandon the in-flight cycle of that generation
    cancel: Mutex<Option<(u64, oneshot::Sender<()>)>>,
}

impl CaptionController {
    pub fn new(submitter: UploadSubmitter, poller: StatusPoller, config: PollConfig) -> Self {
        let (state, _) = watch::channel(ControllerState::default());
        Self {
            submitter,
            poller,
            config,
            state,
            cancel: Mutex::new(None),
        }
    }

    pub fn snapshot(&self) -> ControllerState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ControllerState> {
        self.state.subscribe()
    }

    pub fn segments(&self) -> Vec<Segment> {
        self.state.borrow().segments.clone()
    }

    /// Render the current segments; `None` until a job has succeeded.
    pub fn export(&self, format: ExportFormat) -> Option<String> {
        let state = self.state.borrow();
        match state.phase {
            Phase::Done => Some(format.render(&state.segments)),
            _ => None,
        }
    }

    /// Abandon whatever is in flight and return to idle. The provider job is
    /// left to finish on its own.
    pub fn cancel(&self) -> bool {
        let mut slot = self.lock_cancel();
        if let Some((_, previous)) = slot.take() {
            let _ = previous.send(());
        }

        let mut generation = 0;
        let mut had_job = false;
        self.state.send_modify(|state| {
            had_job = state.phase.is_busy();
            state.generation += 1;
            generation = state.generation;
            state.phase = Phase::Idle;
            state.job = None;
            state.segments.clear();
        });
        drop(slot);

        if had_job {
            info!(generation, "Caption job abandoned");
        }
        had_job
    }

    /// Run one full submit/poll cycle.
    ///
    /// An invalid request fails before any network call and leaves the
    /// current state alone.
    pub async fn generate(&self, request: TranscriptionRequest) -> Outcome {
        if let Err(e) = self.submitter.validate(&request) {
            warn!("Rejected caption request: {}", e);
            return Outcome::Failed(e);
        }

        let task = request.task;
        let (generation, cancel_rx) = self.begin();
        let _guard = CycleGuard {
            controller: self,
            generation,
        };

        self.run_cycle(generation, request, task, cancel_rx).await
    }

    async fn run_cycle(
        &self,
        generation: u64,
        request: TranscriptionRequest,
        task: Task,
        mut cancel_rx: oneshot::Receiver<()>,
    ) -> Outcome {
        let submitted = tokio::select! {
            _ = &mut cancel_rx => return self.superseded(generation, None),
            result = self.submitter.submit(request) => result,
        };

        let job = match submitted {
            Ok(job) => job,
            Err(e) => return self.fail(generation, None, e),
        };
        let job_id = job.id.clone();

        let accepted = self.state.send_if_modified(|state| {
            if !state.is_current(generation, None) {
                return false;
            }
            state.phase = Phase::Polling {
                job_id: job_id.clone(),
                attempt: 0,
            };
            state.job = Some(job.clone());
            true
        });
        if !accepted {
            return self.superseded(generation, Some(&job_id));
        }

        self.poll_until_settled(generation, job, task, cancel_rx).await
    }

    async fn poll_until_settled(
        &self,
        generation: u64,
        mut job: Job,
        task: Task,
        mut cancel_rx: oneshot::Receiver<()>,
    ) -> Outcome {
        let job_id = job.id.clone();

        for attempt in 1..=self.config.max_attempts {
            if job.is_terminal() {
                break;
            }

            let delay = self.config.delay_for(attempt);
            tokio::select! {
                _ = &mut cancel_rx => return self.superseded(generation, Some(&job_id)),
                _ = tokio::time::sleep(delay) => {}
            }

            let polled = tokio::select! {
                _ = &mut cancel_rx => return self.superseded(generation, Some(&job_id)),
                result = self.poller.poll(&job_id, task) => result,
            };

            let polled_job = match polled {
                Ok(polled_job) => polled_job,
                Err(e) => return self.fail(generation, Some(&job_id), e),
            };

            let status = polled_job.status;
            if !job.apply(polled_job.into()) {
                debug!(job_id = %job_id, %status, "Ignored status update");
            }

            let applied = self.state.send_if_modified(|state| {
                if !state.is_current(generation, Some(&job_id)) {
                    return false;
                }
                state.job = Some(job.clone());
                if !job.is_terminal() {
                    state.phase = Phase::Polling {
                        job_id: job_id.clone(),
                        attempt,
                    };
                }
                true
            });
            if !applied {
                return self.superseded(generation, Some(&job_id));
            }
        }

        match job.outcome() {
            Ok(Some(segments)) => self.complete(
                generation,
                &job_id,
                Captions {
                    segments,
                    language: job.language.clone(),
                },
            ),
            Ok(None) => {
                warn!(job_id = %job_id, attempts = self.config.max_attempts, "Gave up waiting for job");
                self.fail(
                    generation,
                    Some(&job_id),
                    CaptionError::Timeout {
                        attempts: self.config.max_attempts,
                    },
                )
            }
            Err(e) => self.fail(generation, Some(&job_id), e),
        }
    }

    /// Start a new generation: cancel the previous cycle and clear its output.
    fn begin(&self) -> (u64, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        let mut slot = self.lock_cancel();
        if let Some((_, previous)) = slot.take() {
            let _ = previous.send(());
        }

        let mut generation = 0;
        self.state.send_modify(|state| {
            state.generation += 1;
            generation = state.generation;
            state.phase = Phase::Submitting;
            state.job = None;
            state.segments.clear();
        });
        *slot = Some((generation, tx));
        drop(slot);

        debug!(generation, "Caption submission started");
        (generation, rx)
    }

    fn lock_cancel(&self) -> std::sync::MutexGuard<'_, Option<(u64, oneshot::Sender<()>)>> {
        self.cancel.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn finish(&self, generation: u64) {
        let mut slot = self.lock_cancel();
        if slot.as_ref().is_some_and(|(g, _)| *g == generation) {
            *slot = None;
        }
    }

    /// Apply a terminal result if its tag is still current.
    fn commit(&self, generation: u64, job_id: Option<&str>, phase: Phase, segments: Vec<Segment>) -> bool {
        let committed = self.state.send_if_modified(|state| {
            if !state.is_current(generation, job_id) {
                return false;
            }
            state.phase = phase;
            state.segments = segments;
            true
        });
        if committed {
            self.finish(generation);
        }
        committed
    }

    fn complete(&self, generation: u64, job_id: &str, captions: Captions) -> Outcome {
        if self.commit(generation, Some(job_id), Phase::Done, captions.segments.clone()) {
            info!(job_id, segments = captions.segments.len(), "Captions ready");
            Outcome::Completed(captions)
        } else {
            self.superseded(generation, Some(job_id))
        }
    }

    fn fail(&self, generation: u64, job_id: Option<&str>, error: CaptionError) -> Outcome {
        let phase = Phase::Error {
            kind: error.kind(),
            message: error.to_string(),
        };
        if self.commit(generation, job_id, phase, Vec::new()) {
            warn!(job_id = job_id.unwrap_or("-"), kind = %error.kind(), "Caption job failed: {}", error);
            Outcome::Failed(error)
        } else {
            self.superseded(generation, job_id)
        }
    }

    fn superseded(&self, generation: u64, job_id: Option<&str>) -> Outcome {
        info!(generation, job_id = job_id.unwrap_or("-"), "Dropping result of superseded submission");
        Outcome::Superseded
    }

    /// Return a still-busy generation to idle when its cycle was dropped
    /// before settling.
    fn abandon(&self, generation: u64) {
        let reset = self.state.send_if_modified(|state| {
            if state.generation != generation || !state.phase.is_busy() {
                return false;
            }
            state.phase = Phase::Idle;
            state.job = None;
            state.segments.clear();
            true
        });
        self.finish(generation);
        if reset {
            warn!(generation, "Caption cycle dropped before it settled, session reset");
        }
    }
}

/// Resets the session if a `generate` future is dropped mid-cycle.
struct CycleGuard<'a> {
    controller: &'a CaptionController,
    generation: u64,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.controller.abandon(self.generation);
    }
}
