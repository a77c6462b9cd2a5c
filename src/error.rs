//! Error types for the speech adapter

use std::io;
use thiserror::Error;

/// Main error type for speech adapter operations
#[derive(Error, Debug)]
pub enum SpeechError {
    /// Engine has not finished (or failed) initialization
    #[error("{0}")]
    NotReady(String),

    /// Engine rejected a speak command; the cause is kept for logs only
    #[error("Failed to speak")]
    Speak(String),

    /// Voice enumeration failed; carries the engine's message
    #[error("{0}")]
    Voices(String),

    #[error("Speech engine error: {0}")]
    Engine(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("INI parse error: {0}")]
    IniParse(String),

    #[error("{0}")]
    Other(String),
}

impl SpeechError {
    /// Rejection code reported to the host runtime
    pub fn code(&self) -> &'static str {
        match self {
            SpeechError::NotReady(_) => "TTS_NOT_READY",
            SpeechError::Speak(_) => "TTS_ERROR",
            SpeechError::Voices(_) => "GET_VOICES_ERROR",
            _ => "TTS_INTERNAL",
        }
    }
}

/// Result type alias for speech adapter operations
pub type Result<T> = std::result::Result<T, SpeechError>;

impl From<String> for SpeechError {
    fn from(s: String) -> Self {
        SpeechError::Other(s)
    }
}

impl From<&str> for SpeechError {
    fn from(s: &str) -> Self {
        SpeechError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for SpeechError {
    fn from(e: serde_json::Error) -> Self {
        SpeechError::Config(format!("JSON error: {}", e))
    }
}
