//! Scripted speech engine for adapter tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tts_highlight::speech::{
    EventChannel, Progress, ProgressListener, SpeechAdapter, SpeechEngine, SpeechEvent,
    UtteranceIdGenerator, VoiceDescriptor,
};
use tts_highlight::{Result, SpeechError};

/// Calls the adapter made into the engine
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Speak { text: String, utterance_id: String },
    Stop,
    SetRate(f32),
    SetPitch(f32),
    SetVoice(String),
    Voices,
    Shutdown,
}

/// Shared view of the fake engine, kept by the test after the engine moves
#[derive(Clone, Default)]
pub struct EngineHandle {
    calls: Arc<Mutex<Vec<Call>>>,
    listener: Arc<Mutex<Option<ProgressListener>>>,
    reject_speak: Arc<Mutex<bool>>,
    rejections: Arc<Mutex<VecDeque<String>>>,
    fail_voices: Arc<Mutex<Option<String>>>,
}

impl EngineHandle {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn speak_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Speak { .. }))
            .count()
    }

    pub fn reject_speak(&self, reject: bool) {
        *self.reject_speak.lock().unwrap() = reject;
    }

    /// Reject the next speak with `reason`; queued reasons are used in order
    pub fn reject_next(&self, reason: &str) {
        self.rejections.lock().unwrap().push_back(reason.to_string());
    }

    pub fn fail_voices(&self, message: &str) {
        *self.fail_voices.lock().unwrap() = Some(message.to_string());
    }

    /// Deliver a progress notification as the engine's callback thread would
    pub fn report(&self, progress: Progress) {
        let listener = self.listener.lock().unwrap().clone();
        if let Some(listener) = listener {
            listener(progress);
        }
    }

    pub fn started(&self, id: &str) {
        self.report(Progress::Started {
            utterance_id: id.to_string(),
        });
    }

    pub fn range(&self, id: &str, start: i32, end: i32) {
        self.report(Progress::Range {
            utterance_id: id.to_string(),
            start,
            end,
            frame: 0,
        });
    }

    pub fn done(&self, id: &str) {
        self.report(Progress::Done {
            utterance_id: id.to_string(),
        });
    }

    pub fn errored(&self, id: &str) {
        self.report(Progress::Error {
            utterance_id: id.to_string(),
        });
    }
}

pub struct FakeEngine {
    handle: EngineHandle,
    voices: Vec<VoiceDescriptor>,
}

impl FakeEngine {
    pub fn new(handle: EngineHandle) -> Self {
        Self {
            handle,
            voices: default_voices(),
        }
    }

    fn record(&self, call: Call) {
        self.handle.calls.lock().unwrap().push(call);
    }
}

impl SpeechEngine for FakeEngine {
    fn speak(&mut self, text: &str, utterance_id: &str) -> Result<()> {
        self.record(Call::Speak {
            text: text.to_string(),
            utterance_id: utterance_id.to_string(),
        });
        if let Some(reason) = self.handle.rejections.lock().unwrap().pop_front() {
            return Err(SpeechError::Engine(reason));
        }
        if *self.handle.reject_speak.lock().unwrap() {
            return Err(SpeechError::Engine("synthesis queue full".to_string()));
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.record(Call::Stop);
        Ok(())
    }

    fn voices(&self) -> Result<Vec<VoiceDescriptor>> {
        self.record(Call::Voices);
        if let Some(msg) = self.handle.fail_voices.lock().unwrap().clone() {
            return Err(SpeechError::Engine(msg));
        }
        Ok(self.voices.clone())
    }

    fn set_rate(&mut self, rate: f32) -> Result<()> {
        self.record(Call::SetRate(rate));
        Ok(())
    }

    fn set_pitch(&mut self, pitch: f32) -> Result<()> {
        self.record(Call::SetPitch(pitch));
        Ok(())
    }

    fn set_voice(&mut self, voice: &VoiceDescriptor) -> Result<()> {
        self.record(Call::SetVoice(voice.identifier.clone()));
        Ok(())
    }

    fn set_progress_listener(&mut self, listener: ProgressListener) -> Result<()> {
        *self.handle.listener.lock().unwrap() = Some(listener);
        Ok(())
    }

    fn shutdown(&mut self) {
        self.record(Call::Shutdown);
        *self.handle.listener.lock().unwrap() = None;
    }
}

pub fn default_voices() -> Vec<VoiceDescriptor> {
    vec![
        VoiceDescriptor {
            identifier: "en-us-x-iol-local".to_string(),
            display_name: "en-us-x-iol-local".to_string(),
            language_tag: "en-US".to_string(),
            quality: "400".to_string(),
        },
        VoiceDescriptor {
            identifier: "fr-fr-x-frd-network".to_string(),
            display_name: "fr-fr-x-frd-network".to_string(),
            language_tag: "fr-FR".to_string(),
            quality: "300".to_string(),
        },
    ]
}

pub const READY_TIMEOUT: Duration = Duration::from_secs(5);

/// Adapter over a fake engine that has finished starting up
pub fn ready_adapter() -> (SpeechAdapter, EngineHandle, Arc<EventChannel>) {
    let fake = EngineHandle::default();
    let channel = Arc::new(EventChannel::new());
    let engine_handle = fake.clone();
    let adapter = SpeechAdapter::new(
        move || Ok(Box::new(FakeEngine::new(engine_handle)) as Box<dyn SpeechEngine>),
        channel.clone(),
        UtteranceIdGenerator::default(),
    );
    assert!(adapter.wait_until_ready(READY_TIMEOUT), "fake engine never came up");
    (adapter, fake, channel)
}

/// Adapter whose engine startup blocks until the returned sender fires
pub fn gated_adapter() -> (SpeechAdapter, EngineHandle, Arc<EventChannel>, Sender<()>) {
    let fake = EngineHandle::default();
    let channel = Arc::new(EventChannel::new());
    let (release, gate): (Sender<()>, Receiver<()>) = mpsc::channel();
    let engine_handle = fake.clone();
    let adapter = SpeechAdapter::new(
        move || {
            let _ = gate.recv();
            Ok(Box::new(FakeEngine::new(engine_handle)) as Box<dyn SpeechEngine>)
        },
        channel.clone(),
        UtteranceIdGenerator::default(),
    );
    (adapter, fake, channel, release)
}

pub fn drain(rx: &Receiver<SpeechEvent>) -> Vec<SpeechEvent> {
    rx.try_iter().collect()
}
