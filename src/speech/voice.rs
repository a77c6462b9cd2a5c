//! Voice descriptors reported by the speech engine

use serde::{Deserialize, Serialize};

/// Read-only projection of an engine voice
///
/// Serializes with the field names the host runtime expects
/// (`identifier`, `name`, `language`, `quality`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceDescriptor {
    /// Engine-specific voice identifier
    pub identifier: String,

    /// Human-readable voice name
    #[serde(rename = "name")]
    pub display_name: String,

    /// BCP-47 language tag, e.g. "en-US"
    #[serde(rename = "language")]
    pub language_tag: String,

    /// Engine-reported quality, stringified
    pub quality: String,
}

impl VoiceDescriptor {
    /// Does this voice answer to the given id?
    ///
    /// Hosts address voices by whatever they were shown, so both the
    /// identifier and the display name are accepted.
    pub fn matches(&self, voice_id: &str) -> bool {
        self.identifier == voice_id || self.display_name == voice_id
    }
}
