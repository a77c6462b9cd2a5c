//! Speech adapter and engine abstraction

pub mod adapter;
pub mod backends;
pub mod engine;
pub mod events;
pub mod relay;
pub mod tracker;
pub mod utterance;
pub mod voice;

pub use adapter::{InitState, SpeechAdapter};
pub use engine::{create_engine, Progress, ProgressListener, SpeechEngine};
pub use events::{EventChannel, EventSink, SpeechEvent};
pub use utterance::{SpeakRequest, UtteranceIdGenerator, UtteranceIdStrategy};
pub use voice::VoiceDescriptor;
