use serde::Deserialize;
use std::fmt;

fn default_voice_type() -> String {
    "qiniu_zh_female_tmjxxy".to_string()
}

fn default_audio_encoding() -> String {
    "mp3".to_string()
}

fn default_language() -> String {
    "zh".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Configuration for the remote speech service (ASR + TTS endpoints).
#[derive(Clone, Deserialize)]
pub struct AudioConfig {
    /// Base URL of the speech service (the clients append `/voice/asr`
    /// and `/voice/tts`).
    pub endpoint: String,
    /// Bearer token for the speech service.
    #[serde(default)]
    pub api_key: String,
    /// Voice preset for synthesis.
    #[serde(default = "default_voice_type")]
    pub voice_type: String,
    /// Output audio encoding for synthesis.
    #[serde(default = "default_audio_encoding")]
    pub encoding: String,
    /// Transcription language hint.
    #[serde(default = "default_language")]
    pub language: String,
    /// Per-request timeout in seconds, applied to both directions.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            voice_type: default_voice_type(),
            encoding: default_audio_encoding(),
            language: default_language(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for AudioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("voice_type", &self.voice_type)
            .field("encoding", &self.encoding)
            .field("language", &self.language)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
