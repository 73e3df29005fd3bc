//! Speech-to-text transcription via the remote speech service.

use crate::{AudioConfig, VoiceError};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Maximum audio input size for transcription (10 MiB). Prevents OOM from
/// oversized payloads.
pub const MAX_STT_INPUT_BYTES: usize = 10 * 1024 * 1024;

/// The transcription capability: raw audio in, plain text out. No
/// persistence — the caller decides what to do with the transcript.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, VoiceError>;
}

#[derive(Serialize)]
struct AsrRequest<'a> {
    audio: AsrAudio<'a>,
    request: AsrOptions<'a>,
}

#[derive(Serialize)]
struct AsrAudio<'a> {
    data: String,
    encoding: &'a str,
}

#[derive(Serialize)]
struct AsrOptions<'a> {
    language: &'a str,
    profanity_filter: bool,
}

#[derive(Deserialize)]
struct AsrResponse {
    data: Option<AsrResult>,
}

#[derive(Deserialize)]
struct AsrResult {
    text: Option<String>,
}

/// HTTP transcription client.
#[derive(Debug, Clone)]
pub struct SttClient {
    http: reqwest::Client,
    config: AudioConfig,
}

impl SttClient {
    pub fn new(config: AudioConfig) -> Result<Self, VoiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VoiceError::Config(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn asr_url(&self) -> String {
        format!("{}/voice/asr", self.config.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl Transcriber for SttClient {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, VoiceError> {
        if audio.is_empty() {
            return Err(VoiceError::Transcription("audio input is empty".to_string()));
        }
        if audio.len() > MAX_STT_INPUT_BYTES {
            return Err(VoiceError::Transcription(format!(
                "audio data exceeds maximum size: {} bytes (limit: {} bytes)",
                audio.len(),
                MAX_STT_INPUT_BYTES
            )));
        }

        let request = AsrRequest {
            audio: AsrAudio {
                data: base64::engine::general_purpose::STANDARD.encode(audio),
                encoding: "webm",
            },
            request: AsrOptions {
                language: &self.config.language,
                profanity_filter: false,
            },
        };

        let response = self
            .http
            .post(self.asr_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| VoiceError::Transcription(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VoiceError::Transcription(format!(
                "transcription service returned status {}",
                status.as_u16()
            )));
        }

        let body: AsrResponse = response
            .json()
            .await
            .map_err(|e| VoiceError::Transcription(e.to_string()))?;

        let text = body
            .data
            .and_then(|d| d.text)
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            // Unintelligible input — the caller prompts for typed input.
            return Err(VoiceError::Transcription(
                "no speech recognized in audio input".to_string(),
            ));
        }

        Ok(text)
    }
}
