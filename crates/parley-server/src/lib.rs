//! Parley server library logic.
//!
//! Wires the identity guard, chat store, LLM gateway, and voice bridge
//! into one axum application.

pub mod api;
pub mod api_audio;
pub mod api_chats;
pub mod api_roles;
pub mod config;
pub mod middleware;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use middleware::RateLimiter;
use parley_db::DbPool;
use parley_identity::TokenKeys;
use parley_llm::ChatCompleter;
use parley_voice::{Synthesizer, Transcriber};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Access-token signing and verification keys.
    pub token_keys: Arc<TokenKeys>,
    /// LLM gateway for assistant reply generation.
    pub completer: Arc<dyn ChatCompleter>,
    /// Speech-to-text gateway.
    pub transcriber: Arc<dyn Transcriber>,
    /// Text-to-speech gateway.
    pub synthesizer: Arc<dyn Synthesizer>,
    /// Rate limiter state.
    pub rate_limiter: RateLimiter,
    /// Fixed-window request limit per caller per minute.
    pub rate_limit_per_minute: u32,
}

/// Maximum request body size (256 KiB) for JSON routes. Audio uploads get
/// their own, larger limit.
const MAX_REQUEST_BODY_BYTES: usize = 256 * 1024;

/// Body limit for audio uploads: the transcription input cap plus headroom
/// for multipart framing.
const MAX_AUDIO_BODY_BYTES: usize = parley_voice::stt::MAX_STT_INPUT_BYTES + 64 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/users/me", get(api::me_handler))
        .route(
            "/api/roles",
            get(api_roles::list_roles_handler).post(api_roles::create_role_handler),
        )
        .route("/api/roles/{role_id}", get(api_roles::get_role_handler))
        .route(
            "/api/chats",
            post(api_chats::create_chat_handler)
                .get(api_chats::list_chats_handler)
                .delete(api_chats::delete_chats_handler),
        )
        .route(
            "/api/chats/{chat_id}/messages",
            post(api_chats::send_message_handler).get(api_chats::get_messages_handler),
        )
        .route("/api/audio/speak", post(api_audio::speak_handler))
        .layer(axum::middleware::from_fn(middleware::auth_middleware));

    // The transcription route needs a larger body limit for audio uploads.
    let audio_routes = Router::new()
        .route("/api/audio/transcribe", post(api_audio::transcribe_handler))
        .layer(DefaultBodyLimit::max(MAX_AUDIO_BODY_BYTES))
        .layer(axum::middleware::from_fn(middleware::auth_middleware));

    Router::new()
        .route("/health", get(health))
        .route("/register", post(api::register_handler))
        .route("/login", post(api::login_handler))
        .merge(protected_routes)
        .merge(audio_routes)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(axum::middleware::from_fn(middleware::rate_limit_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
