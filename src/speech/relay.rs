//! Engine progress to host event relay

use crate::speech::engine::Progress;
use crate::speech::events::{EventSink, SpeechEvent};
use crate::speech::tracker::{UtteranceTracker, Verdict};
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Turns engine notifications into host events
///
/// Each notification is relayed synchronously on the thread that delivered
/// it, as at most one event. Nothing is buffered or reordered. Once closed,
/// the relay emits nothing.
pub struct EventRelay {
    sink: Arc<dyn EventSink>,
    tracker: Mutex<UtteranceTracker>,
    closed: AtomicBool,
}

impl EventRelay {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            tracker: Mutex::new(UtteranceTracker::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Handle one engine notification
    pub fn relay(&self, progress: Progress) {
        if self.is_closed() {
            return;
        }
        if self.tracker().accept(&progress) == Verdict::Drop {
            return;
        }
        let event = match progress {
            Progress::Started { utterance_id } => SpeechEvent::Start { utterance_id },
            Progress::Range {
                utterance_id,
                start,
                end,
                frame,
            } => SpeechEvent::WordRange {
                utterance_id,
                start,
                end,
                frame,
            },
            Progress::Done { utterance_id } => SpeechEvent::Done { utterance_id },
            Progress::Error { utterance_id } => SpeechEvent::Error { utterance_id },
        };
        self.emit(event);
    }

    /// Send an event straight to the host, dropping it if nobody listens
    pub fn emit(&self, event: SpeechEvent) {
        if self.is_closed() {
            return;
        }
        if !self.sink.is_active() {
            debug!("Host sink inactive, dropping {}", event.name());
            return;
        }
        self.sink.emit(event);
    }

    pub fn issue(&self, utterance_id: &str) {
        self.tracker().issue(utterance_id);
    }

    pub fn withdraw(&self, utterance_id: &str) {
        self.tracker().withdraw(utterance_id);
    }

    /// Stop relaying for good
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn tracker(&self) -> MutexGuard<'_, UtteranceTracker> {
        self.tracker.lock().unwrap_or_else(|poisoned| {
            warn!("Utterance tracker lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}
