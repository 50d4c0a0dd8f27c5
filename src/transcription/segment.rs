//! Caption segments and export formatters.
//!
//! Supports SRT, WebVTT, plain text and JSON output. Every formatter keeps
//! the input order; overlapping segments are emitted as they are.

use serde::{Deserialize, Serialize};
use std::fmt::Write as FmtWrite;

/// One timestamped unit of transcribed text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// 1-based position in the caption track
    pub index: u32,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Caption text
    pub text: String,
}

impl Segment {
    pub fn new(index: u32, start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            index,
            start,
            end,
            text: text.into(),
        }
    }

    /// Duration of the segment in seconds
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Segment as reported by a provider. Provider indices are ignored and
/// reassigned by [`normalize_segments`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawSegment {
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub text: String,
}

/// Assign contiguous 1-based indices in received order and trim text.
pub fn normalize_segments(raw: Vec<RawSegment>) -> Vec<Segment> {
    raw.into_iter()
        .enumerate()
        .map(|(i, seg)| Segment {
            index: i as u32 + 1,
            start: seg.start.max(0.0),
            end: seg.end,
            text: seg.text.trim().to_string(),
        })
        .collect()
}

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// SubRip subtitle format
    Srt,
    /// WebVTT subtitle format
    Vtt,
    /// Plain text, one line per segment
    Text,
    /// Pretty-printed JSON
    Json,
}

impl ExportFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Srt => "srt",
            ExportFormat::Vtt => "vtt",
            ExportFormat::Text => "txt",
            ExportFormat::Json => "json",
        }
    }

    pub fn render(&self, segments: &[Segment]) -> String {
        match self {
            ExportFormat::Srt => to_srt(segments),
            ExportFormat::Vtt => to_vtt(segments),
            ExportFormat::Text => to_plain_text(segments),
            ExportFormat::Json => to_json(segments),
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "srt" => Ok(ExportFormat::Srt),
            "vtt" | "webvtt" => Ok(ExportFormat::Vtt),
            "txt" | "text" => Ok(ExportFormat::Text),
            "json" => Ok(ExportFormat::Json),
            _ => Err(format!("Unknown export format: {}. Use srt, vtt, txt or json", s)),
        }
    }
}

/// Split seconds into (hours, minutes, seconds, milliseconds).
///
/// Fractional milliseconds are truncated. The small tolerance keeps values
/// like `65.123` from landing on `65122.999…` ms.
fn split_millis(seconds: f64) -> (u64, u64, u64, u64) {
    let total_ms = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0 + 1e-6).trunc() as u64
    } else {
        0
    };
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;
    (hours, mins, secs, ms)
}

/// Format time for SRT (HH:MM:SS,mmm)
pub fn format_timestamp(seconds: f64) -> String {
    let (hours, mins, secs, ms) = split_millis(seconds);
    format!("{:02}:{:02}:{:02},{:03}", hours, mins, secs, ms)
}

/// Format time for VTT (HH:MM:SS.mmm)
fn format_vtt_time(seconds: f64) -> String {
    let (hours, mins, secs, ms) = split_millis(seconds);
    format!("{:02}:{:02}:{:02}.{:03}", hours, mins, secs, ms)
}

/// Export to SRT format
pub fn to_srt(segments: &[Segment]) -> String {
    let mut output = String::new();

    for segment in segments {
        let _ = writeln!(output, "{}", segment.index);
        let _ = writeln!(
            output,
            "{} --> {}",
            format_timestamp(segment.start),
            format_timestamp(segment.end)
        );
        let _ = writeln!(output, "{}", segment.text);
        let _ = writeln!(output);
    }

    output
}

/// Export to WebVTT format
pub fn to_vtt(segments: &[Segment]) -> String {
    let mut output = String::from("WEBVTT\n\n");

    for segment in segments {
        let _ = writeln!(output, "{}", segment.index);
        let _ = writeln!(
            output,
            "{} --> {}",
            format_vtt_time(segment.start),
            format_vtt_time(segment.end)
        );
        let _ = writeln!(output, "{}", segment.text);
        let _ = writeln!(output);
    }

    output
}

/// Export to plain text, dropping timestamps.
///
/// Every segment gets exactly one newline-terminated line, empty text
/// included, so the line count always equals the segment count.
pub fn to_plain_text(segments: &[Segment]) -> String {
    let mut output = String::new();
    for segment in segments {
        let line = segment
            .text
            .lines()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(output, "{}", line);
    }
    output
}

/// Export to pretty-printed JSON
pub fn to_json(segments: &[Segment]) -> String {
    serde_json::to_string_pretty(segments).unwrap_or_default()
}
