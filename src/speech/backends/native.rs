//! Native Rust TTS backend using the tts crate
//!
//! This backend uses the `tts` crate which provides a unified interface to:
//! - Speech Dispatcher on Linux (via native bindings)
//! - AVFoundation on macOS/iOS (via native bindings)
//! - WinRT on Windows
//!
//! The `tts` crate hands out its own utterance handles; this backend maps
//! them back to the caller's utterance ids for progress reporting. It has no
//! word-boundary or error callback, so only start and done are reported.

use crate::speech::engine::{Progress, ProgressListener, SpeechEngine};
use crate::speech::voice::VoiceDescriptor;
use crate::{Result, SpeechError};
use log::{debug, error, warn};
use std::sync::{Arc, Mutex};
use tts::{Tts as TtsCrate, UtteranceId};

/// Quality reported for voices; the tts crate exposes no quality rating
const DEFAULT_QUALITY: &str = "normal";

/// Largest multiplier accepted for rate and pitch
const MAX_MULTIPLIER: f32 = 2.0;

/// Engine handles -> caller utterance ids
///
/// The engine may report on a handle before `speak` has returned it. Such
/// reports are parked until the handle is recorded.
#[derive(Debug)]
struct HandleMap<H> {
    /// Handles still playing
    playing: Vec<(H, String)>,
    /// Handles reported before they were recorded: (handle, ended)
    early: Vec<(H, bool)>,
}

impl<H: PartialEq> HandleMap<H> {
    fn new() -> Self {
        Self {
            playing: Vec::new(),
            early: Vec::new(),
        }
    }

    /// Begin reported; the caller id if the handle is known
    fn begin(&mut self, handle: H) -> Option<String> {
        match self.playing.iter().find(|(h, _)| *h == handle) {
            Some((_, id)) => Some(id.clone()),
            None => {
                if !self.early.iter().any(|(h, _)| *h == handle) {
                    self.early.push((handle, false));
                }
                None
            }
        }
    }

    /// End reported; the caller id if the handle is known
    fn end(&mut self, handle: H) -> Option<String> {
        if let Some(pos) = self.playing.iter().position(|(h, _)| *h == handle) {
            return Some(self.playing.remove(pos).1);
        }
        match self.early.iter_mut().find(|(h, _)| *h == handle) {
            Some(entry) => entry.1 = true,
            None => self.early.push((handle, true)),
        }
        None
    }

    /// Interrupted; forget the handle
    fn interrupted(&mut self, handle: H) -> Option<String> {
        let pos = self.playing.iter().position(|(h, _)| *h == handle)?;
        Some(self.playing.remove(pos).1)
    }

    /// Record the handle of a freshly spoken utterance
    ///
    /// Earlier utterances were flushed by the engine and are forgotten.
    /// Returns the notifications that arrived before the handle did.
    fn record(&mut self, handle: H, utterance_id: &str) -> Vec<Progress> {
        self.playing.clear();
        let early = self
            .early
            .iter()
            .position(|(h, _)| *h == handle)
            .map(|pos| self.early.remove(pos).1);
        self.early.clear();

        let mut missed = Vec::new();
        match early {
            Some(ended) => {
                missed.push(Progress::Started {
                    utterance_id: utterance_id.to_string(),
                });
                if ended {
                    missed.push(Progress::Done {
                        utterance_id: utterance_id.to_string(),
                    });
                } else {
                    self.playing.push((handle, utterance_id.to_string()));
                }
            }
            None => self.playing.push((handle, utterance_id.to_string())),
        }
        missed
    }

    fn clear(&mut self) {
        self.playing.clear();
        self.early.clear();
    }
}

type SharedHandles = Arc<Mutex<HandleMap<UtteranceId>>>;

/// Native TTS engine using the tts crate
pub struct NativeEngine {
    /// The tts crate's TTS instance
    tts: TtsCrate,

    /// Utterances the engine may still report on
    utterances: SharedHandles,

    /// Receives progress, also for reports replayed from `speak`
    listener: Option<ProgressListener>,
}

impl NativeEngine {
    /// Create a new native TTS engine
    ///
    /// Initializes the platform-appropriate TTS backend
    pub fn new() -> Result<Self> {
        debug!("Creating native TTS backend");

        let tts = TtsCrate::default()
            .map_err(|e| SpeechError::Engine(format!("Failed to initialize TTS: {}", e)))?;

        debug!("Native TTS backend created successfully");

        Ok(Self {
            tts,
            utterances: Arc::new(Mutex::new(HandleMap::new())),
            listener: None,
        })
    }

    fn with_handles<T>(
        utterances: &SharedHandles,
        f: impl FnOnce(&mut HandleMap<UtteranceId>) -> T,
    ) -> T {
        let mut map = utterances.lock().unwrap_or_else(|poisoned| {
            warn!("Utterance map lock poisoned, recovering");
            poisoned.into_inner()
        });
        f(&mut map)
    }
}

/// Map a multiplier (1.0 = normal) onto an engine range
///
/// 0.0 maps to `min`, 1.0 to `normal`, and `MAX_MULTIPLIER` or above to `max`.
fn scale_multiplier(multiplier: f32, min: f32, normal: f32, max: f32) -> f32 {
    let m = multiplier.clamp(0.0, MAX_MULTIPLIER);
    if m <= 1.0 {
        min + (normal - min) * m
    } else {
        normal + (max - normal) * (m - 1.0) / (MAX_MULTIPLIER - 1.0)
    }
}

impl SpeechEngine for NativeEngine {
    fn speak(&mut self, text: &str, utterance_id: &str) -> Result<()> {
        debug!("Speaking {}: {}", utterance_id, text);

        // No lock here: the engine may call back synchronously
        let handle = self.tts.speak(text, true).map_err(|e| {
            error!("Failed to speak: {}", e);
            SpeechError::Engine(format!("Speak failed: {}", e))
        })?;

        let missed = match handle {
            Some(handle) => {
                Self::with_handles(&self.utterances, |map| map.record(handle, utterance_id))
            }
            None => {
                Self::with_handles(&self.utterances, |map| map.clear());
                Vec::new()
            }
        };
        if let Some(listener) = &self.listener {
            for progress in missed {
                listener(progress);
            }
        }

        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        debug!("Stopping speech");
        self.tts.stop().map_err(|e| {
            error!("Failed to stop speech: {}", e);
            SpeechError::Engine(format!("Stop failed: {}", e))
        })?;

        Self::with_handles(&self.utterances, |map| map.clear());
        Ok(())
    }

    fn voices(&self) -> Result<Vec<VoiceDescriptor>> {
        let voices = self
            .tts
            .voices()
            .map_err(|e| SpeechError::Engine(format!("Failed to get voices: {}", e)))?;

        Ok(voices
            .into_iter()
            .map(|v| VoiceDescriptor {
                identifier: v.id().to_string(),
                display_name: v.name().to_string(),
                language_tag: v.language().to_string(),
                quality: DEFAULT_QUALITY.to_string(),
            })
            .collect())
    }

    fn set_rate(&mut self, rate: f32) -> Result<()> {
        debug!("Setting rate to {}", rate);

        let features = self.tts.supported_features();
        if !features.rate {
            warn!("Rate control not supported on this platform");
            return Ok(());
        }

        let converted = scale_multiplier(
            rate,
            self.tts.min_rate(),
            self.tts.normal_rate(),
            self.tts.max_rate(),
        );
        self.tts
            .set_rate(converted)
            .map_err(|e| SpeechError::Engine(format!("Failed to set rate: {}", e)))?;

        Ok(())
    }

    fn set_pitch(&mut self, pitch: f32) -> Result<()> {
        debug!("Setting pitch to {}", pitch);

        let features = self.tts.supported_features();
        if !features.pitch {
            warn!("Pitch control not supported on this platform");
            return Ok(());
        }

        let converted = scale_multiplier(
            pitch,
            self.tts.min_pitch(),
            self.tts.normal_pitch(),
            self.tts.max_pitch(),
        );
        self.tts
            .set_pitch(converted)
            .map_err(|e| SpeechError::Engine(format!("Failed to set pitch: {}", e)))?;

        Ok(())
    }

    fn set_voice(&mut self, voice: &VoiceDescriptor) -> Result<()> {
        debug!("Selecting voice: {}", voice.identifier);

        let voices = self
            .tts
            .voices()
            .map_err(|e| SpeechError::Engine(format!("Failed to get voices: {}", e)))?;

        match voices.iter().find(|v| v.id() == voice.identifier) {
            Some(v) => self
                .tts
                .set_voice(v)
                .map(|_| ())
                .map_err(|e| SpeechError::Engine(format!("Failed to set voice: {}", e))),
            None => Err(SpeechError::Engine(format!(
                "Voice {} is no longer available",
                voice.identifier
            ))),
        }
    }

    fn set_progress_listener(&mut self, listener: ProgressListener) -> Result<()> {
        let features = self.tts.supported_features();
        if !features.utterance_callbacks {
            return Err(SpeechError::Engine(
                "Utterance callbacks not supported on this platform".to_string(),
            ));
        }

        let begin_map = Arc::clone(&self.utterances);
        let begin_listener = Arc::clone(&listener);
        self.tts
            .on_utterance_begin(Some(Box::new(move |handle| {
                if let Some(utterance_id) = Self::with_handles(&begin_map, |m| m.begin(handle)) {
                    begin_listener(Progress::Started { utterance_id });
                }
            })))
            .map_err(|e| SpeechError::Engine(format!("Failed to attach begin callback: {}", e)))?;

        let end_map = Arc::clone(&self.utterances);
        let end_listener = Arc::clone(&listener);
        self.tts
            .on_utterance_end(Some(Box::new(move |handle| {
                if let Some(utterance_id) = Self::with_handles(&end_map, |m| m.end(handle)) {
                    end_listener(Progress::Done { utterance_id });
                }
            })))
            .map_err(|e| SpeechError::Engine(format!("Failed to attach end callback: {}", e)))?;

        let stop_map = Arc::clone(&self.utterances);
        self.tts
            .on_utterance_stop(Some(Box::new(move |handle| {
                if let Some(utterance_id) = Self::with_handles(&stop_map, |m| m.interrupted(handle))
                {
                    debug!("Utterance {} interrupted", utterance_id);
                }
            })))
            .map_err(|e| SpeechError::Engine(format!("Failed to attach stop callback: {}", e)))?;

        self.listener = Some(listener);
        Ok(())
    }

    fn shutdown(&mut self) {
        debug!("Releasing native TTS backend");
        // Detach callbacks so nothing reaches the listener after teardown
        let _ = self.tts.on_utterance_begin(None);
        let _ = self.tts.on_utterance_end(None);
        let _ = self.tts.on_utterance_stop(None);
        self.listener = None;
        Self::with_handles(&self.utterances, |map| map.clear());
    }
}
