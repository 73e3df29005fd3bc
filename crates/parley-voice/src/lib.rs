//! Voice infrastructure for the Parley backend.
//!
//! Bridges the chat pipeline to a remote speech service: audio in, text
//! out (transcription) and text in, audio out (synthesis). The two
//! directions are independent, independently failing operations — a
//! transcription outage never blocks synthesis and vice versa — and both
//! are deliberately decoupled from message persistence. Transcription
//! produces plain text that the caller submits through the normal message
//! path; synthesis runs against assistant text the caller already holds.

pub mod config;
pub mod error;
pub mod stt;
pub mod tts;

pub use config::AudioConfig;
pub use error::VoiceError;
pub use stt::{SttClient, Transcriber};
pub use tts::{Synthesizer, SynthesisCache, TtsClient};
