//! Error types for Jarvis

use thiserror::Error;

/// Result type alias for Jarvis operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Jarvis
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// No speech started within the listen window
    #[error("timed out waiting for speech")]
    CaptureTimeout,

    /// Speech was captured but could not be transcribed
    #[error("could not understand audio")]
    Unrecognized,

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text service error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Agent (LLM) error
    #[error("agent error: {0}")]
    Agent(String),

    /// Tool execution error
    #[error("tool error: {0}")]
    Tool(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Whether this error ends a listen attempt without being a fault
    ///
    /// Capture timeouts and unintelligible audio are part of normal operation
    /// and are logged as warnings rather than errors
    #[must_use]
    pub const fn is_quiet(&self) -> bool {
        matches!(self, Self::CaptureTimeout | Self::Unrecognized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_errors() {
        assert!(Error::CaptureTimeout.is_quiet());
        assert!(Error::Unrecognized.is_quiet());
        assert!(!Error::Stt("down".to_string()).is_quiet());
        assert!(!Error::Agent("boom".to_string()).is_quiet());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::Agent("model not found".to_string()).to_string(),
            "agent error: model not found"
        );
        assert_eq!(Error::CaptureTimeout.to_string(), "timed out waiting for speech");
    }
}
