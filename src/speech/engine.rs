//! Speech engine abstraction
//!
//! The adapter drives the platform speech engine through this trait. The
//! engine owns synthesis, its queue, and the thread that reports progress;
//! the adapter only forwards commands and relays what the engine reports.

use crate::speech::voice::VoiceDescriptor;
use crate::{Result, SpeechError};
use log::info;
use std::sync::Arc;

/// Progress reported by the engine for one utterance
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    /// Synthesis began
    Started { utterance_id: String },
    /// Word boundary reached
    Range {
        utterance_id: String,
        start: i32,
        end: i32,
        frame: i32,
    },
    /// Playback completed
    Done { utterance_id: String },
    /// Playback failed
    Error { utterance_id: String },
}

impl Progress {
    pub fn utterance_id(&self) -> &str {
        match self {
            Progress::Started { utterance_id }
            | Progress::Range { utterance_id, .. }
            | Progress::Done { utterance_id }
            | Progress::Error { utterance_id } => utterance_id,
        }
    }
}

/// Callback the engine invokes for every progress notification
///
/// May be called from any thread the engine chooses.
pub type ProgressListener = Arc<dyn Fn(Progress) + Send + Sync>;

/// Platform speech engine
pub trait SpeechEngine: Send {
    /// Speak text, flushing anything queued or playing
    fn speak(&mut self, text: &str, utterance_id: &str) -> Result<()>;

    /// Halt speech immediately
    fn stop(&mut self) -> Result<()>;

    /// Voices the engine can use (order is not meaningful)
    fn voices(&self) -> Result<Vec<VoiceDescriptor>>;

    /// Set speech rate multiplier (1.0 is normal)
    fn set_rate(&mut self, rate: f32) -> Result<()>;

    /// Set pitch multiplier (1.0 is normal)
    fn set_pitch(&mut self, pitch: f32) -> Result<()>;

    /// Switch the active voice
    fn set_voice(&mut self, voice: &VoiceDescriptor) -> Result<()>;

    /// Attach the progress listener
    fn set_progress_listener(&mut self, listener: ProgressListener) -> Result<()>;

    /// Release engine resources. No callbacks fire afterwards.
    fn shutdown(&mut self) {}
}

/// Create the platform speech engine
///
/// The `tts` crate picks the backend for the platform:
/// Speech Dispatcher on Linux, AVFoundation on macOS, WinRT on Windows.
pub fn create_engine() -> Result<Box<dyn SpeechEngine>> {
    let platform = std::env::consts::OS;
    info!("Creating native speech engine for platform: {}", platform);

    use super::backends::native::NativeEngine;

    match NativeEngine::new() {
        Ok(engine) => {
            info!("✓ Successfully initialized native TTS backend");
            Ok(Box::new(engine))
        }
        Err(e) => Err(SpeechError::Engine(format!(
            "Failed to initialize speech backend for platform '{}': {}",
            platform, e
        ))),
    }
}
