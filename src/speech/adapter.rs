//! Speech adapter
//!
//! Owns the engine handle and its readiness, serves speak/stop/pause/voices
//! requests from the host, and relays engine progress as host events.
//!
//! Construction returns immediately; the engine starts on a background
//! thread. Requests made before it reports ready fail with
//! [`SpeechError::NotReady`]. If startup fails, an `onSpeechError` event
//! carrying `{error: "TTS Initialization failed"}` is emitted and the adapter
//! stays not-ready for good.

use crate::config::Config;
use crate::speech::engine::{create_engine, ProgressListener, SpeechEngine};
use crate::speech::events::{EventSink, SpeechEvent, INIT_FAILED_MESSAGE};
use crate::speech::relay::EventRelay;
use crate::speech::utterance::{SpeakRequest, UtteranceIdGenerator};
use crate::speech::voice::VoiceDescriptor;
use crate::{Result, SpeechError};
use log::{debug, error, info, warn};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

/// Attempts with the requested voice before falling back to the default
const VOICE_ATTEMPTS: usize = 2;

/// Engine startup progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    Pending,
    Ready,
    Failed,
}

struct Shared {
    engine: Mutex<Option<Box<dyn SpeechEngine>>>,
    init: Mutex<InitState>,
    init_changed: Condvar,
    relay: Arc<EventRelay>,
}

impl Shared {
    fn engine(&self) -> Result<MutexGuard<'_, Option<Box<dyn SpeechEngine>>>> {
        self.engine
            .lock()
            .map_err(|_| SpeechError::Engine("engine lock poisoned".to_string()))
    }

    fn init_state(&self) -> InitState {
        self.init
            .lock()
            .map(|s| *s)
            .unwrap_or(InitState::Failed)
    }

    fn set_init_state(&self, state: InitState) {
        if let Ok(mut s) = self.init.lock() {
            *s = state;
        }
        self.init_changed.notify_all();
    }

    /// Runs on the init thread
    fn start(&self, factory: impl FnOnce() -> Result<Box<dyn SpeechEngine>>) {
        let mut engine = match factory() {
            Ok(engine) => engine,
            Err(e) => {
                error!("Speech engine initialization failed: {}", e);
                self.relay.emit(SpeechEvent::InitFailed {
                    error: INIT_FAILED_MESSAGE.to_string(),
                });
                self.set_init_state(InitState::Failed);
                return;
            }
        };

        let relay = Arc::clone(&self.relay);
        let listener: ProgressListener = Arc::new(move |progress| relay.relay(progress));
        if let Err(e) = engine.set_progress_listener(listener) {
            warn!("Progress events unavailable: {}", e);
        }

        match self.engine.lock() {
            Ok(mut slot) if !self.relay.is_closed() => {
                *slot = Some(engine);
                drop(slot);
                info!("Speech engine ready");
                self.set_init_state(InitState::Ready);
            }
            _ => {
                debug!("Adapter shut down during initialization, releasing engine");
                engine.shutdown();
                self.set_init_state(InitState::Failed);
            }
        }
    }
}

/// Bridge between the host application and the platform speech engine
///
/// Construct once and share by reference. Dropping the adapter tears the
/// engine down.
pub struct SpeechAdapter {
    shared: Arc<Shared>,
    ids: UtteranceIdGenerator,
}

impl SpeechAdapter {
    /// Start the adapter with an engine built by `factory` on a background thread
    pub fn new<F>(factory: F, sink: Arc<dyn EventSink>, ids: UtteranceIdGenerator) -> Self
    where
        F: FnOnce() -> Result<Box<dyn SpeechEngine>> + Send + 'static,
    {
        let shared = Arc::new(Shared {
            engine: Mutex::new(None),
            init: Mutex::new(InitState::Pending),
            init_changed: Condvar::new(),
            relay: Arc::new(EventRelay::new(sink)),
        });

        let worker = Arc::clone(&shared);
        let spawned = thread::Builder::new()
            .name("speech-init".to_string())
            .spawn(move || worker.start(factory));
        if let Err(e) = spawned {
            error!("Failed to spawn speech init thread: {}", e);
            shared.relay.emit(SpeechEvent::InitFailed {
                error: INIT_FAILED_MESSAGE.to_string(),
            });
            shared.set_init_state(InitState::Failed);
        }

        Self { shared, ids }
    }

    /// Start the adapter on the platform's native engine
    pub fn native(config: &Config, sink: Arc<dyn EventSink>) -> Self {
        let ids = UtteranceIdGenerator::new(config.utterance_id_strategy());
        Self::new(create_engine, sink, ids)
    }

    /// Has the engine reported successful startup?
    pub fn is_ready(&self) -> bool {
        self.init_state() == InitState::Ready && !self.shared.relay.is_closed()
    }

    pub fn init_state(&self) -> InitState {
        self.shared.init_state()
    }

    /// Block until startup finishes or `timeout` passes; returns readiness
    pub fn wait_until_ready(&self, timeout: Duration) -> bool {
        let Ok(guard) = self.shared.init.lock() else {
            return false;
        };
        let result = self
            .shared
            .init_changed
            .wait_timeout_while(guard, timeout, |state| *state == InitState::Pending);
        match result {
            Ok((state, _)) => *state == InitState::Ready && !self.shared.relay.is_closed(),
            Err(_) => false,
        }
    }

    /// Speak `text`, replacing whatever is currently playing
    ///
    /// Returns the utterance id that correlates the progress events. Rate
    /// and pitch stay applied for later requests; an unknown voice is
    /// ignored.
    pub fn speak(&self, text: &str, request: SpeakRequest) -> Result<String> {
        if !self.is_ready() {
            return Err(SpeechError::NotReady(
                "TTS is not initialized yet".to_string(),
            ));
        }

        let utterance_id = request
            .utterance_id
            .clone()
            .unwrap_or_else(|| self.ids.next_id());

        let mut slot = self.shared.engine()?;
        let engine = slot
            .as_mut()
            .ok_or_else(|| SpeechError::NotReady("TTS is not initialized yet".to_string()))?;

        if let Some(rate) = request.rate {
            if let Err(e) = engine.set_rate(rate) {
                warn!("Ignoring rate {}: {}", rate, e);
            }
        }
        if let Some(pitch) = request.pitch {
            if let Err(e) = engine.set_pitch(pitch) {
                warn!("Ignoring pitch {}: {}", pitch, e);
            }
        }
        if let Some(voice_id) = request.voice.as_deref() {
            select_voice(&mut **engine, voice_id);
        }

        let relay = &self.shared.relay;
        relay.issue(&utterance_id);
        match engine.speak(text, &utterance_id) {
            Ok(()) => {
                debug!("Speaking utterance {}", utterance_id);
                Ok(utterance_id)
            }
            Err(e) => {
                relay.withdraw(&utterance_id);
                warn!("Engine rejected utterance {}: {}", utterance_id, e);
                Err(SpeechError::Speak(e.to_string()))
            }
        }
    }

    /// Speak with the requested voice, falling back to the default voice
    ///
    /// Tries the request as given twice, then once without a voice. If all
    /// attempts fail the error of the last voice attempt is returned.
    /// Not-ready is returned at once since retrying cannot help.
    pub fn speak_with_fallback(&self, text: &str, request: SpeakRequest) -> Result<String> {
        let mut last_error = None;

        for attempt in 1..=VOICE_ATTEMPTS {
            match self.speak(text, request.clone()) {
                Ok(id) => return Ok(id),
                Err(e @ SpeechError::NotReady(_)) => return Err(e),
                Err(e) => {
                    debug!("Speak attempt {} failed: {}", attempt, e);
                    last_error = Some(e);
                }
            }
        }

        match self.speak(text, request.without_voice()) {
            Ok(id) => {
                warn!("Preferred voice unavailable, using system default");
                Ok(id)
            }
            Err(e) => {
                debug!("Speak without voice failed: {}", e);
                Err(last_error.unwrap_or(e))
            }
        }
    }

    /// Halt any in-flight speech
    ///
    /// The adapter adds no event of its own for the halted utterance;
    /// whatever the engine still reports about it is relayed. Before the
    /// engine is up, or after it failed to start, there is nothing to halt.
    /// Only a shut-down adapter refuses.
    pub fn stop(&self) -> Result<()> {
        let mut slot = self.shared.engine()?;
        let Some(engine) = slot.as_mut() else {
            if self.shared.relay.is_closed() {
                return Err(SpeechError::NotReady("TTS is not initialized".to_string()));
            }
            debug!("Stop requested with no engine running ({:?})", self.init_state());
            return Ok(());
        };

        if let Err(e) = engine.stop() {
            warn!("Engine stop failed: {}", e);
        }
        debug!("Speech stopped");
        Ok(())
    }

    /// Same as [`stop`](Self::stop): platform engines offer no real pause/resume
    pub fn pause(&self) -> Result<()> {
        self.stop()
    }

    /// Voices the engine offers, in no particular order
    pub fn get_voices(&self) -> Result<Vec<VoiceDescriptor>> {
        if !self.is_ready() {
            return Err(SpeechError::NotReady("TTS is not initialized".to_string()));
        }

        let slot = self.shared.engine()?;
        let engine = slot
            .as_ref()
            .ok_or_else(|| SpeechError::NotReady("TTS is not initialized".to_string()))?;

        engine.voices().map_err(|e| match e {
            SpeechError::Engine(msg) => SpeechError::Voices(msg),
            other => SpeechError::Voices(other.to_string()),
        })
    }

    /// Host event-emitter hook; subscriptions are managed by the sink
    pub fn add_listener(&self, event_name: &str) {
        debug!("add_listener({})", event_name);
    }

    /// Host event-emitter hook; subscriptions are managed by the sink
    pub fn remove_listeners(&self, count: u32) {
        debug!("remove_listeners({})", count);
    }

    /// Stop speech and release the engine. Idempotent.
    pub fn shutdown(&self) {
        if self.shared.relay.is_closed() {
            return;
        }
        self.shared.relay.close();

        let Ok(mut slot) = self.shared.engine.lock() else {
            return;
        };
        if let Some(mut engine) = slot.take() {
            info!("Shutting down speech engine");
            if let Err(e) = engine.stop() {
                warn!("Engine stop failed during shutdown: {}", e);
            }
            engine.shutdown();
        }
    }
}

impl Drop for SpeechAdapter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Switch to the first voice answering to `voice_id`
///
/// Lookup failures and unknown voices are ignored.
fn select_voice(engine: &mut dyn SpeechEngine, voice_id: &str) {
    let voices = match engine.voices() {
        Ok(voices) => voices,
        Err(e) => {
            debug!("Voice lookup failed: {}", e);
            return;
        }
    };

    match voices.iter().find(|v| v.matches(voice_id)) {
        Some(voice) => {
            if let Err(e) = engine.set_voice(voice) {
                debug!("Failed to set voice {}: {}", voice_id, e);
            }
        }
        None => debug!("Voice {} not found, keeping current voice", voice_id),
    }
}
