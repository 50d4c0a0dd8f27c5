use thiserror::Error;

/// Message used when a failure carries nothing readable
pub const UNKNOWN_ERROR: &str = "unknown error";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptionError {
    /// Rejected before any network call
    #[error("{0}")]
    Validation(String),
    /// Network failure or an unreadable error response
    #[error("{0}")]
    Transport(String),
    /// Error reported by the provider, shown verbatim
    #[error("{0}")]
    Provider(String),
    #[error("Transcription timed out after {attempts} status checks")]
    Timeout { attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Transport,
    Provider,
    Timeout,
}

impl CaptionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CaptionError::Validation(_) => ErrorKind::Validation,
            CaptionError::Transport(_) => ErrorKind::Transport,
            CaptionError::Provider(_) => ErrorKind::Provider,
            CaptionError::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// Transport error with the generic message when `message` is blank.
    pub fn transport(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            CaptionError::Transport(UNKNOWN_ERROR.to_string())
        } else {
            CaptionError::Transport(message)
        }
    }
}

impl From<reqwest::Error> for CaptionError {
    fn from(e: reqwest::Error) -> Self {
        CaptionError::transport(e.to_string())
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::Transport => write!(f, "transport"),
            ErrorKind::Provider => write!(f, "provider"),
            ErrorKind::Timeout => write!(f, "timeout"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_message_is_verbatim() {
        let err = CaptionError::Provider("unsupported audio codec".to_string());
        assert_eq!(err.to_string(), "unsupported audio codec");
        assert_eq!(err.kind(), ErrorKind::Provider);
    }

    #[test]
    fn test_blank_transport_message_defaults() {
        assert_eq!(CaptionError::transport("  ").to_string(), UNKNOWN_ERROR);
        assert_eq!(CaptionError::transport("connection reset").to_string(), "connection reset");
    }
}
