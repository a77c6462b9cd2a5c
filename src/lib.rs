//! TTS Highlight - native text-to-speech adapter
//!
//! Exposes the platform speech engine to a host application: speak/stop/pause
//! requests go in, utterance progress events (start, word range, done, error)
//! come out for highlight synchronization.

pub mod config;
pub mod error;
pub mod speech;

pub use error::{Result, SpeechError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "tts-highlight";
