use crate::transcription::{ExportFormat, Language, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum LanguageChoice {
    #[name = "English"]
    English,
    #[name = "Hindi"]
    Hindi,
    #[name = "Spanish"]
    Spanish,
    #[name = "French"]
    French,
    #[name = "German"]
    German,
}

impl From<LanguageChoice> for Language {
    fn from(choice: LanguageChoice) -> Self {
        match choice {
            LanguageChoice::English => Language::English,
            LanguageChoice::Hindi => Language::Hindi,
            LanguageChoice::Spanish => Language::Spanish,
            LanguageChoice::French => Language::French,
            LanguageChoice::German => Language::German,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum TaskChoice {
    #[name = "Transcribe"]
    Transcribe,
    #[name = "Translate to English"]
    Translate,
    #[name = "Transliterate Hindi (Hinglish)"]
    Transliterate,
}

impl From<TaskChoice> for Task {
    fn from(choice: TaskChoice) -> Self {
        match choice {
            TaskChoice::Transcribe => Task::Transcribe,
            TaskChoice::Translate => Task::Translate,
            TaskChoice::Transliterate => Task::Transliterate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum FormatChoice {
    #[name = "SRT"]
    Srt,
    #[name = "WebVTT"]
    Vtt,
    #[name = "Plain text"]
    Text,
    #[name = "JSON"]
    Json,
}

impl From<FormatChoice> for ExportFormat {
    fn from(choice: FormatChoice) -> Self {
        match choice {
            FormatChoice::Srt => ExportFormat::Srt,
            FormatChoice::Vtt => ExportFormat::Vtt,
            FormatChoice::Text => ExportFormat::Text,
            FormatChoice::Json => ExportFormat::Json,
        }
    }
}
