//! Per-utterance lifecycle tracking
//!
//! Each utterance moves `Issued -> Started -> Range* -> (Done | Errored)`.
//! The tracker decides which engine notifications reach the host: a
//! duplicate start and anything after a terminal event are dropped. Every
//! other notification is relayed, including terminal events for utterances
//! that a newer request or a stop interrupted.

use crate::speech::engine::Progress;
use log::debug;
use std::collections::VecDeque;

/// In-flight utterances remembered; the oldest is forgotten past this
const ACTIVE_CAPACITY: usize = 64;

/// Finished ids remembered for dropping notifications after the terminal one
const RETIRED_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtteranceState {
    /// Handed to the engine, nothing reported yet
    Issued,
    /// Engine reported the start
    Started,
    /// At least one word range reported
    Ranging,
}

/// What to do with a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Relay,
    Drop,
}

#[derive(Debug, Default)]
pub struct UtteranceTracker {
    active: VecDeque<ActiveUtterance>,
    retired: VecDeque<String>,
}

#[derive(Debug, Clone)]
struct ActiveUtterance {
    id: String,
    state: UtteranceState,
    last_start: Option<i32>,
}

impl UtteranceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an utterance about to be handed to the engine
    ///
    /// Registration happens before the engine call so that a start reported
    /// while the call is still in progress is not lost.
    pub fn issue(&mut self, utterance_id: &str) {
        self.forget_retired(utterance_id);
        self.active.retain(|u| u.id != utterance_id);
        self.track(utterance_id);
    }

    /// Engine rejected the utterance
    pub fn withdraw(&mut self, utterance_id: &str) {
        self.active.retain(|u| u.id != utterance_id);
    }

    /// Current state of an in-flight utterance
    pub fn state(&self, utterance_id: &str) -> Option<UtteranceState> {
        self.active
            .iter()
            .find(|u| u.id == utterance_id)
            .map(|u| u.state)
    }

    /// Number of utterances still in flight
    pub fn in_flight(&self) -> usize {
        self.active.len()
    }

    /// Apply a notification and decide whether to relay it
    pub fn accept(&mut self, progress: &Progress) -> Verdict {
        let id = progress.utterance_id();
        if self.retired.iter().any(|r| r == id) {
            debug!("Dropping notification after terminal event for {}", id);
            return Verdict::Drop;
        }

        let pos = match self.active.iter().position(|u| u.id == id) {
            Some(pos) => pos,
            None => {
                // Not issued through us, or forgotten; track it from here on
                debug!("Tracking untracked utterance {}", id);
                self.track(id)
            }
        };

        match progress {
            Progress::Started { .. } => {
                let entry = &mut self.active[pos];
                if entry.state != UtteranceState::Issued {
                    debug!("Duplicate start for {}", id);
                    return Verdict::Drop;
                }
                entry.state = UtteranceState::Started;
                Verdict::Relay
            }
            Progress::Range { start, .. } => {
                let entry = &mut self.active[pos];
                if let Some(prev) = entry.last_start {
                    if *start < prev {
                        debug!("Word range for {} moved backwards ({} < {})", id, start, prev);
                    }
                }
                entry.last_start = Some(*start);
                entry.state = UtteranceState::Ranging;
                Verdict::Relay
            }
            Progress::Done { .. } | Progress::Error { .. } => {
                self.active.remove(pos);
                self.retire(id);
                Verdict::Relay
            }
        }
    }

    /// Start tracking `utterance_id`; returns its position
    fn track(&mut self, utterance_id: &str) -> usize {
        if self.active.len() == ACTIVE_CAPACITY {
            if let Some(oldest) = self.active.pop_front() {
                debug!("Forgetting utterance {} (never finished)", oldest.id);
            }
        }
        self.active.push_back(ActiveUtterance {
            id: utterance_id.to_string(),
            state: UtteranceState::Issued,
            last_start: None,
        });
        self.active.len() - 1
    }

    fn retire(&mut self, utterance_id: &str) {
        self.forget_retired(utterance_id);
        if self.retired.len() == RETIRED_CAPACITY {
            self.retired.pop_front();
        }
        self.retired.push_back(utterance_id.to_string());
    }

    fn forget_retired(&mut self, utterance_id: &str) {
        self.retired.retain(|r| r != utterance_id);
    }
}
