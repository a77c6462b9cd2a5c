//! Speak requests and utterance id generation

use crate::SpeechError;
use serde::Deserialize;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Parameters for a single speak call
///
/// Deserializes from the host's parameter map (`utteranceId`, `rate`,
/// `pitch`, `voice`). Rate and pitch are engine-global: once set they stay
/// in effect for later requests that omit them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakRequest {
    /// Caller-supplied id; generated when absent
    pub utterance_id: Option<String>,
    /// Speech rate multiplier (1.0 is normal)
    pub rate: Option<f32>,
    /// Pitch multiplier (1.0 is normal)
    pub pitch: Option<f32>,
    /// Voice identifier or name to switch to before speaking
    pub voice: Option<String>,
}

impl SpeakRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn utterance_id(mut self, id: impl Into<String>) -> Self {
        self.utterance_id = Some(id.into());
        self
    }

    pub fn rate(mut self, rate: f32) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn pitch(mut self, pitch: f32) -> Self {
        self.pitch = Some(pitch);
        self
    }

    pub fn voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    /// Same request with the voice dropped (system default voice)
    pub fn without_voice(&self) -> Self {
        Self {
            voice: None,
            ..self.clone()
        }
    }
}

/// How ids are generated for requests that don't carry one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UtteranceIdStrategy {
    /// Random UUID v4
    #[default]
    Uuid,
    /// Milliseconds since the epoch. Collides under rapid-fire calls.
    Timestamp,
}

impl FromStr for UtteranceIdStrategy {
    type Err = SpeechError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uuid" => Ok(Self::Uuid),
            "timestamp" => Ok(Self::Timestamp),
            other => Err(SpeechError::Config(format!(
                "Unknown utterance id strategy: {}",
                other
            ))),
        }
    }
}

/// Generates utterance ids
#[derive(Debug, Clone, Default)]
pub struct UtteranceIdGenerator {
    strategy: UtteranceIdStrategy,
}

impl UtteranceIdGenerator {
    pub fn new(strategy: UtteranceIdStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> UtteranceIdStrategy {
        self.strategy
    }

    /// Produce a fresh id
    pub fn next_id(&self) -> String {
        match self.strategy {
            UtteranceIdStrategy::Uuid => Uuid::new_v4().to_string(),
            UtteranceIdStrategy::Timestamp => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or(0)
                .to_string(),
        }
    }
}
