//! Text-to-speech synthesis via the remote speech service.

use crate::{AudioConfig, VoiceError};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Maximum text length for synthesis, in characters. Mirrors the inbound
/// API contract so the limit is enforced even for internal callers.
pub const MAX_TTS_INPUT_CHARS: usize = 2_000;

/// Entries kept in the synthesis cache before eviction.
const SYNTHESIS_CACHE_MAX_ENTRIES: usize = 256;

/// The synthesis capability: text in, encoded audio bytes out. Stateless
/// with respect to conversations; the same text always produces equivalent
/// audio, which is what makes caching by content hash safe.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError>;
}

#[derive(Serialize)]
struct TtsRequest<'a> {
    audio: TtsAudio<'a>,
    request: TtsText<'a>,
}

#[derive(Serialize)]
struct TtsAudio<'a> {
    voice_type: &'a str,
    encoding: &'a str,
    speed_ratio: f32,
}

#[derive(Serialize)]
struct TtsText<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct TtsResponse {
    data: Option<String>,
}

/// Bounded cache of synthesized audio keyed by content hash.
///
/// Synthesis is the most expensive outbound call per byte; assistant
/// replies get replayed (the user taps play again, or re-opens a chat),
/// so a small cache pays for itself. Keyed by SHA-256 of voice type plus
/// text so a voice change never serves stale audio.
#[derive(Clone, Debug, Default)]
pub struct SynthesisCache {
    entries: Arc<Mutex<HashMap<[u8; 32], Vec<u8>>>>,
}

impl SynthesisCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(voice_type: &str, text: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(voice_type.as_bytes());
        hasher.update([0]);
        hasher.update(text.as_bytes());
        hasher.finalize().into()
    }

    fn get(&self, voice_type: &str, text: &str) -> Option<Vec<u8>> {
        let entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.get(&Self::key(voice_type, text)).cloned()
    }

    fn put(&self, voice_type: &str, text: &str, audio: Vec<u8>) {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Coarse eviction: drop everything once full. The cache is a
        // latency optimization, not a correctness surface.
        if entries.len() >= SYNTHESIS_CACHE_MAX_ENTRIES {
            entries.clear();
        }
        entries.insert(Self::key(voice_type, text), audio);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }
}

/// HTTP synthesis client.
#[derive(Debug, Clone)]
pub struct TtsClient {
    http: reqwest::Client,
    config: AudioConfig,
    cache: SynthesisCache,
}

impl TtsClient {
    pub fn new(config: AudioConfig) -> Result<Self, VoiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VoiceError::Config(e.to_string()))?;
        Ok(Self {
            http,
            config,
            cache: SynthesisCache::new(),
        })
    }

    fn tts_url(&self) -> String {
        format!("{}/voice/tts", self.config.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl Synthesizer for TtsClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(VoiceError::Synthesis("text input is empty".to_string()));
        }
        if text.chars().count() > MAX_TTS_INPUT_CHARS {
            return Err(VoiceError::Synthesis(format!(
                "text exceeds maximum length: {} characters (limit: {})",
                text.chars().count(),
                MAX_TTS_INPUT_CHARS
            )));
        }

        if let Some(audio) = self.cache.get(&self.config.voice_type, text) {
            tracing::debug!(bytes = audio.len(), "synthesis cache hit");
            return Ok(audio);
        }

        let request = TtsRequest {
            audio: TtsAudio {
                voice_type: &self.config.voice_type,
                encoding: &self.config.encoding,
                speed_ratio: 1.0,
            },
            request: TtsText { text },
        };

        let response = self
            .http
            .post(self.tts_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| VoiceError::Synthesis(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VoiceError::Synthesis(format!(
                "synthesis service returned status {}",
                status.as_u16()
            )));
        }

        let body: TtsResponse = response
            .json()
            .await
            .map_err(|e| VoiceError::Synthesis(e.to_string()))?;

        let encoded = body
            .data
            .ok_or_else(|| VoiceError::Synthesis("no audio data in response".to_string()))?;

        let audio = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| VoiceError::Synthesis(format!("invalid base64 audio: {e}")))?;

        if audio.is_empty() {
            return Err(VoiceError::Synthesis("synthesis produced no audio".to_string()));
        }

        self.cache.put(&self.config.voice_type, text, audio.clone());
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> TtsClient {
        TtsClient::new(AudioConfig {
            endpoint: "https://speech.example.com".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn empty_text_is_rejected_without_a_request() {
        let err = client().synthesize("   ").await.unwrap_err();
        assert!(matches!(err, VoiceError::Synthesis(_)));
    }

    #[tokio::test]
    async fn oversized_text_is_rejected_without_a_request() {
        let too_long = "a".repeat(MAX_TTS_INPUT_CHARS + 1);
        let err = client().synthesize(&too_long).await.unwrap_err();
        assert!(err.to_string().contains("maximum length"));
    }

    #[test]
    fn tts_url_appends_path() {
        assert_eq!(client().tts_url(), "https://speech.example.com/voice/tts");
    }

    #[test]
    fn cache_keys_include_voice_type() {
        let cache = SynthesisCache::new();
        cache.put("voice-a", "hello", vec![1, 2, 3]);

        assert_eq!(cache.get("voice-a", "hello"), Some(vec![1, 2, 3]));
        assert_eq!(cache.get("voice-b", "hello"), None);
        assert_eq!(cache.get("voice-a", "other"), None);
    }

    #[test]
    fn cache_eviction_bounds_entry_count() {
        let cache = SynthesisCache::new();
        for i in 0..=SYNTHESIS_CACHE_MAX_ENTRIES {
            cache.put("v", &format!("text-{i}"), vec![0]);
        }
        assert!(cache.len() <= SYNTHESIS_CACHE_MAX_ENTRIES);
    }

    #[test]
    fn tts_response_parsing_decodes_base64() {
        let parsed: TtsResponse = serde_json::from_str(r#"{"data":"aGVsbG8="}"#).unwrap();
        let audio = base64::engine::general_purpose::STANDARD
            .decode(parsed.data.unwrap())
            .unwrap();
        assert_eq!(audio, b"hello");
    }
}
