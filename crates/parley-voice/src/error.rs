use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    /// Speech-to-text failure: oversized input, unintelligible audio, or
    /// an unavailable transcription service. Callers degrade to typed
    /// input.
    #[error("transcription error: {0}")]
    Transcription(String),

    /// Text-to-speech failure: text length violation or an unavailable
    /// synthesis service. Callers fall back to text-only display.
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Invalid gateway configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}
