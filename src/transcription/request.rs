//! Transcription requests and the task/language override rules.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::CaptionError;

/// Video containers accepted for upload
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm"];

/// Seed prompt that nudges the model into writing Hindi in Devanagari script.
pub const TRANSLITERATION_SEED_PROMPT: &str =
    "नमस्ते, आज हम हिंदी में बात करेंगे। यह वीडियो हिंदी भाषा में है।";

/// Source language forced for the transliterate task
pub const TRANSLITERATION_SOURCE: Language = Language::Hindi;

/// Languages offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "hi")]
    Hindi,
    #[serde(rename = "es")]
    Spanish,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "de")]
    German,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::English,
        Language::Hindi,
        Language::Spanish,
        Language::French,
        Language::German,
    ];

    /// ISO 639-1 code sent to providers
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
            Language::Spanish => "es",
            Language::French => "fr",
            Language::German => "de",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::English => write!(f, "English"),
            Language::Hindi => write!(f, "Hindi"),
            Language::Spanish => write!(f, "Spanish"),
            Language::French => write!(f, "French"),
            Language::German => write!(f, "German"),
        }
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "en" | "english" => Ok(Language::English),
            "hi" | "hindi" => Ok(Language::Hindi),
            "es" | "spanish" => Ok(Language::Spanish),
            "fr" | "french" => Ok(Language::French),
            "de" | "german" => Ok(Language::German),
            _ => Err(format!("Unknown language: {}. Use en, hi, es, fr or de", s)),
        }
    }
}

/// What the user wants done with the speech
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    /// Captions in the spoken language
    Transcribe,
    /// Captions translated to English
    Translate,
    /// Hindi speech, captions romanized from Devanagari
    Transliterate,
}

impl Task {
    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Transcribe => "transcribe",
            Task::Translate => "translate",
            Task::Transliterate => "transliterate",
        }
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Task {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "transcribe" => Ok(Task::Transcribe),
            "translate" => Ok(Task::Translate),
            "transliterate" => Ok(Task::Transliterate),
            _ => Err(format!(
                "Invalid task: {}. Must be transcribe, translate or transliterate",
                s
            )),
        }
    }
}

/// Uploaded media payload
#[derive(Clone)]
pub struct MediaFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for MediaFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaFile")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl MediaFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    fn extension(&self) -> Option<String> {
        Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    /// MIME type to declare on the wire. Falls back to the extension when
    /// the uploader did not provide one.
    pub fn mime(&self) -> &str {
        if let Some(ref ct) = self.content_type {
            return ct;
        }
        match self.extension().as_deref() {
            Some("mp4") => "video/mp4",
            Some("mov") => "video/quicktime",
            Some("avi") => "video/x-msvideo",
            Some("mkv") => "video/x-matroska",
            Some("webm") => "video/webm",
            _ => "application/octet-stream",
        }
    }
}

/// A user's request to caption one video
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub file: Option<MediaFile>,
    pub language: Language,
    pub task: Task,
}

impl TranscriptionRequest {
    pub fn new(file: Option<MediaFile>, language: Language, task: Task) -> Self {
        Self { file, language, task }
    }

    /// Check the file before any network call is made.
    pub fn validate(&self, max_upload_bytes: u64) -> Result<&MediaFile, CaptionError> {
        let file = self
            .file
            .as_ref()
            .ok_or_else(|| CaptionError::Validation("No file provided".to_string()))?;

        if file.bytes.is_empty() {
            return Err(CaptionError::Validation(format!(
                "File {} is empty",
                file.filename
            )));
        }

        match file.extension() {
            Some(ext) if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) => {}
            _ => {
                return Err(CaptionError::Validation(format!(
                    "Unsupported file type: {}. Use {}",
                    file.filename,
                    SUPPORTED_EXTENSIONS.join(", ")
                )));
            }
        }

        if file.bytes.len() as u64 > max_upload_bytes {
            return Err(CaptionError::Validation(format!(
                "File is too large ({:.1} MB, limit {:.1} MB)",
                file.bytes.len() as f64 / 1_048_576.0,
                max_upload_bytes as f64 / 1_048_576.0
            )));
        }

        Ok(file)
    }

    /// Parameters actually sent to the provider
    pub fn effective_params(&self) -> EffectiveParams {
        EffectiveParams::resolve(self.language, self.task)
    }
}

/// Whisper decoding mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhisperTask {
    Transcribe,
    Translate,
}

/// Provider-facing parameters after the task overrides are applied
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveParams {
    /// The task the user asked for
    pub task: Task,
    /// Spoken language hint
    pub source_language: Language,
    /// Language the captions come back in
    pub output_language: Language,
    /// Mode the model runs in
    pub whisper_task: WhisperTask,
    /// Prompt biasing the model's output script
    pub initial_prompt: Option<&'static str>,
}

impl EffectiveParams {
    pub fn resolve(language: Language, task: Task) -> Self {
        match task {
            Task::Transcribe => Self {
                task,
                source_language: language,
                output_language: language,
                whisper_task: WhisperTask::Transcribe,
                initial_prompt: None,
            },
            Task::Translate => Self {
                task,
                source_language: language,
                output_language: Language::English,
                whisper_task: WhisperTask::Translate,
                initial_prompt: None,
            },
            // The user's language is ignored on purpose: transliteration
            // only exists for Hindi speech.
            Task::Transliterate => Self {
                task,
                source_language: TRANSLITERATION_SOURCE,
                output_language: TRANSLITERATION_SOURCE,
                whisper_task: WhisperTask::Transcribe,
                initial_prompt: Some(TRANSLITERATION_SEED_PROMPT),
            },
        }
    }
}

/// What a provider receives from the submitter
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub file: MediaFile,
    pub params: EffectiveParams,
}
