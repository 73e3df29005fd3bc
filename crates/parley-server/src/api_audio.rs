//! Voice bridge handlers: transcription in, synthesized speech out.
//!
//! Both endpoints are stateless with respect to chats — the client chains
//! transcribe → send message → speak itself.

use crate::api::ApiError;
use crate::AppState;
use axum::{
    extract::{Extension, Json, Multipart},
    http::header,
    response::IntoResponse,
};
use parley_voice::stt::MAX_STT_INPUT_BYTES;
use parley_voice::tts::MAX_TTS_INPUT_CHARS;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Response body for `POST /api/audio/transcribe`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscribeResponse {
    pub transcript: String,
}

/// Request body for `POST /api/audio/speak`.
#[derive(Debug, Deserialize)]
pub struct SpeakRequest {
    pub input_text: String,
}

/// Handler for `POST /api/audio/transcribe`.
///
/// Accepts a multipart upload with the audio under the `file` field and
/// returns the recognized text. Unintelligible audio (an empty transcript
/// from the gateway) is reported as a transcription failure so the client
/// can fall back to typed input.
pub async fn transcribe_handler(
    Extension(state): Extension<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<TranscribeResponse>, ApiError> {
    let mut audio: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("failed to read audio field: {e}")))?;
            audio = Some(bytes.to_vec());
            break;
        }
    }

    let audio = audio.ok_or_else(|| {
        ApiError::BadRequest("multipart field 'file' with audio data is required".to_string())
    })?;

    if audio.is_empty() {
        return Err(ApiError::BadRequest("uploaded audio is empty".to_string()));
    }
    if audio.len() > MAX_STT_INPUT_BYTES {
        return Err(ApiError::BadRequest(format!(
            "uploaded audio exceeds maximum size of {MAX_STT_INPUT_BYTES} bytes"
        )));
    }

    let transcript = state.transcriber.transcribe(&audio).await?;

    tracing::debug!(chars = transcript.chars().count(), "transcribed audio upload");
    Ok(Json(TranscribeResponse { transcript }))
}

/// Handler for `POST /api/audio/speak`.
///
/// Returns the synthesized speech as a binary `audio/mpeg` body. Repeated
/// input may be served from the synthesis cache without a gateway call.
pub async fn speak_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<SpeakRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = payload.input_text.trim();
    if text.is_empty() {
        return Err(ApiError::BadRequest("input_text is empty".to_string()));
    }
    if text.chars().count() > MAX_TTS_INPUT_CHARS {
        return Err(ApiError::BadRequest(format!(
            "input_text exceeds maximum length of {MAX_TTS_INPUT_CHARS} characters"
        )));
    }

    let audio = state.synthesizer.synthesize(text).await?;

    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio))
}
