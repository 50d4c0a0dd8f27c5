//! Message text for the caption commands.

use std::path::Path;

use crate::controller::{ControllerState, Phase};
use crate::transcription::{ExportFormat, Segment, to_plain_text};

/// Discord's per-message character limit
pub const MESSAGE_LIMIT: usize = 2000;

/// Room kept for the header and code fence around a preview
const PREVIEW_BUDGET: usize = MESSAGE_LIMIT - 200;

pub fn progress(state: &ControllerState) -> String {
    match &state.phase {
        Phase::Idle => "No caption job in progress.".to_string(),
        Phase::Submitting => "**Uploading video...**".to_string(),
        Phase::Polling { job_id, attempt } => {
            let status = state
                .job
                .as_ref()
                .map(|job| job.status.to_string())
                .unwrap_or_else(|| "starting".to_string());
            if *attempt == 0 {
                format!("**Transcribing...**\nJob: `{}` ({})", job_id, status)
            } else {
                format!(
                    "**Transcribing...**\nJob: `{}` ({}, check {})",
                    job_id, status, attempt
                )
            }
        }
        Phase::Done => format!("**Captions ready!** {} segments", state.segments.len()),
        Phase::Error { message, .. } => format!("**Captioning failed:** {}", message),
    }
}

/// Progress line plus job details, for `/captions-status`.
pub fn status(state: &ControllerState) -> String {
    let mut out = progress(state);
    if let Some(job) = &state.job {
        out.push_str(&format!(
            "\nTask: {}\nElapsed: {}",
            job.task,
            format_duration(job.elapsed())
        ));
        if let Some(language) = &job.language {
            out.push_str(&format!("\nLanguage: {}", language));
        }
        if let Some(seconds) = job.duration.filter(|s| s.is_finite() && *s >= 0.0) {
            let length = chrono::Duration::milliseconds((seconds * 1000.0).round() as i64);
            out.push_str(&format!("\nVideo length: {}", format_duration(length)));
        }
    }
    out
}

/// Plain-text captions in a code block, cut to fit one message.
pub fn preview(segments: &[Segment]) -> String {
    let text = to_plain_text(segments);
    let text = text.trim_end().replace("```", "'''");
    if text.trim().is_empty() {
        return "_(no speech detected)_".to_string();
    }

    match text.char_indices().nth(PREVIEW_BUDGET) {
        Some((cut, _)) => format!("```\n{}\n```\n_(truncated, see the attached files)_", &text[..cut]),
        None => format!("```\n{}\n```", text),
    }
}

/// Attachment name derived from the uploaded video, e.g. `talk.mp4` -> `talk.srt`.
pub fn export_filename(upload: &str, format: ExportFormat) -> String {
    let stem = Path::new(upload)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("captions");
    format!("{}.{}", stem, format.extension())
}

pub fn format_duration(duration: chrono::Duration) -> String {
    let total_secs = duration.num_seconds().max(0);
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::{ErrorKind, Job, JobStatus, Task};

    fn state(phase: Phase) -> ControllerState {
        ControllerState {
            phase,
            ..ControllerState::default()
        }
    }

    #[test]
    fn test_progress_lines() {
        assert_eq!(progress(&state(Phase::Submitting)), "**Uploading video...**");

        let mut polling = state(Phase::Polling {
            job_id: "abc".to_string(),
            attempt: 4,
        });
        polling.job = Some(Job::new("abc", JobStatus::Processing, Task::Translate));
        assert_eq!(
            progress(&polling),
            "**Transcribing...**\nJob: `abc` (processing, check 4)"
        );

        let failed = state(Phase::Error {
            kind: ErrorKind::Provider,
            message: "unsupported audio codec".to_string(),
        });
        assert_eq!(progress(&failed), "**Captioning failed:** unsupported audio codec");
    }

    #[test]
    fn test_status_includes_task() {
        let mut done = state(Phase::Done);
        done.job = Some(Job::new("abc", JobStatus::Succeeded, Task::Transliterate));
        done.segments = vec![Segment::new(1, 0.0, 1.0, "namaste")];

        let text = status(&done);
        assert!(text.starts_with("**Captions ready!** 1 segments"));
        assert!(text.contains("Task: transliterate"));
        assert!(!text.contains("Video length"));
    }

    #[test]
    fn test_status_shows_language_and_length() {
        let mut job = Job::new("abc", JobStatus::Succeeded, Task::Transcribe);
        job.language = Some("hi".to_string());
        job.duration = Some(125.4);
        let mut done = state(Phase::Done);
        done.job = Some(job);

        let text = status(&done);
        assert!(text.contains("\nLanguage: hi\nVideo length: 2m 5s"));
    }

    #[test]
    fn test_preview_fits_in_one_message() {
        let segments: Vec<Segment> = (1..=500)
            .map(|i| Segment::new(i, i as f64, i as f64 + 1.0, "a fairly long caption line"))
            .collect();
        let text = preview(&segments);
        assert!(text.chars().count() <= MESSAGE_LIMIT);
        assert!(text.ends_with("_(truncated, see the attached files)_"));
    }

    #[test]
    fn test_preview_short_and_empty() {
        let segments = vec![Segment::new(1, 0.0, 2.5, "Hello")];
        assert_eq!(preview(&segments), "```\nHello\n```");
        assert_eq!(preview(&[]), "_(no speech detected)_");
    }

    #[test]
    fn test_export_filename() {
        assert_eq!(export_filename("talk.mp4", ExportFormat::Srt), "talk.srt");
        assert_eq!(export_filename("my.clip.webm", ExportFormat::Text), "my.clip.txt");
        assert_eq!(export_filename("", ExportFormat::Vtt), "captions.vtt");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(chrono::Duration::seconds(42)), "42s");
        assert_eq!(format_duration(chrono::Duration::seconds(125)), "2m 5s");
        assert_eq!(format_duration(chrono::Duration::seconds(3725)), "1h 2m 5s");
    }
}
