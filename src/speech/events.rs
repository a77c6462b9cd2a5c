//! Progress events and the host event sink
//!
//! Events are fire-and-forget: when no subscriber is attached to the sink
//! the event is dropped. There is no queueing and no replay.

use log::debug;
use serde_json::{json, Value};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;

/// Message carried by the event emitted when the engine fails to start
pub const INIT_FAILED_MESSAGE: &str = "TTS Initialization failed";

/// Named events delivered to the host
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechEvent {
    /// Engine began synthesizing an utterance
    Start { utterance_id: String },
    /// Word boundary reached; offsets index into the spoken text
    WordRange {
        utterance_id: String,
        start: i32,
        end: i32,
        frame: i32,
    },
    /// Utterance finished playing
    Done { utterance_id: String },
    /// Utterance failed
    Error { utterance_id: String },
    /// Engine startup failed; no utterance is involved
    InitFailed { error: String },
}

impl SpeechEvent {
    /// Event name as seen by host subscribers
    pub fn name(&self) -> &'static str {
        match self {
            SpeechEvent::Start { .. } => "onSpeechStart",
            SpeechEvent::WordRange { .. } => "onWordRange",
            SpeechEvent::Done { .. } => "onSpeechDone",
            SpeechEvent::Error { .. } | SpeechEvent::InitFailed { .. } => "onSpeechError",
        }
    }

    /// Utterance this event belongs to, if any
    pub fn utterance_id(&self) -> Option<&str> {
        match self {
            SpeechEvent::Start { utterance_id }
            | SpeechEvent::WordRange { utterance_id, .. }
            | SpeechEvent::Done { utterance_id }
            | SpeechEvent::Error { utterance_id } => Some(utterance_id),
            SpeechEvent::InitFailed { .. } => None,
        }
    }

    /// Does this event end its utterance?
    pub fn is_terminal(&self) -> bool {
        matches!(self, SpeechEvent::Done { .. } | SpeechEvent::Error { .. })
    }

    /// Payload map in the host's key convention
    pub fn payload(&self) -> Value {
        match self {
            SpeechEvent::Start { utterance_id }
            | SpeechEvent::Done { utterance_id }
            | SpeechEvent::Error { utterance_id } => json!({ "utteranceId": utterance_id }),
            SpeechEvent::WordRange {
                utterance_id,
                start,
                end,
                frame,
            } => json!({
                "utteranceId": utterance_id,
                "start": start,
                "end": end,
                "frame": frame,
            }),
            SpeechEvent::InitFailed { error } => json!({ "error": error }),
        }
    }

    /// `{"event": name, "payload": {...}}`, used for line-oriented output
    pub fn to_json(&self) -> Value {
        json!({ "event": self.name(), "payload": self.payload() })
    }
}

/// Host-side receiver of speech events
pub trait EventSink: Send + Sync {
    /// Is anyone listening right now?
    fn is_active(&self) -> bool;

    /// Deliver one event
    fn emit(&self, event: SpeechEvent);
}

/// Channel-backed sink
///
/// Each `subscribe()` call hands out a receiver. Subscribers whose receiver
/// was dropped are pruned on the next emit.
#[derive(Default)]
pub struct EventChannel {
    subscribers: Mutex<Vec<Sender<SpeechEvent>>>,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new subscriber
    pub fn subscribe(&self) -> Receiver<SpeechEvent> {
        let (tx, rx) = channel();
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }
        rx
    }

    /// Number of attached subscribers (including not-yet-pruned dead ones)
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl EventSink for EventChannel {
    fn is_active(&self) -> bool {
        self.subscriber_count() > 0
    }

    fn emit(&self, event: SpeechEvent) {
        let Ok(mut subs) = self.subscribers.lock() else {
            return;
        };
        subs.retain(|tx| tx.send(event.clone()).is_ok());
        if subs.is_empty() {
            debug!("Dropped {} (no subscribers)", event.name());
        }
    }
}
