//! Remote transcription jobs and caption output.
//!
//! Submits videos to a hosted Whisper service, reads job status until it
//! settles and formats the returned segments.

pub mod error;
pub mod job;
pub mod poller;
pub mod provider;
pub mod request;
pub mod segment;
pub mod submitter;
pub mod transliterate;

pub use error::{CaptionError, ErrorKind};
pub use job::{Job, JobStatus, JobUpdate};
pub use poller::StatusPoller;
pub use provider::{CaptionApiProvider, JobHandle, ReplicateProvider, TranscriptionProvider};
pub use request::{EffectiveParams, Language, MediaFile, ProviderRequest, Task, TranscriptionRequest};
pub use segment::{ExportFormat, Segment, format_timestamp, to_plain_text, to_srt};
pub use submitter::UploadSubmitter;
pub use transliterate::{DevanagariRomanizer, NoopTransliterator, Scheme, Transliterator};
