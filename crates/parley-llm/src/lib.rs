//! LLM gateway for the Parley backend.
//!
//! Turns an ordered chat history plus a role's framing into a transcript
//! for an OpenAI-compatible `/chat/completions` endpoint and returns the
//! next assistant utterance. The gateway is stateless: it holds a reused
//! HTTP connection pool and nothing else.
//!
//! The [`ChatCompleter`] trait is the seam the orchestrator depends on;
//! tests substitute a deterministic stub where production wires in
//! [`OpenAiClient`].

pub mod client;
pub mod config;
pub mod error;
pub mod transcript;

pub use client::OpenAiClient;
pub use config::LlmConfig;
pub use error::LlmError;
pub use transcript::{Transcript, TranscriptMessage};

use async_trait::async_trait;

/// The capability the chat orchestrator consumes: transcript in, next
/// assistant utterance out.
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    async fn complete(&self, transcript: &Transcript) -> Result<String, LlmError>;
}
