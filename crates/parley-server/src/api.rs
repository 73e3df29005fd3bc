//! Account handlers and the API error type shared by all routes.

use crate::middleware::AuthContext;
use crate::AppState;
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use parley_identity::{create_user, login, AuthError, NewUser, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// API error type mapping to HTTP status codes.
///
/// Every variant carries a stable machine-readable `code` in the response
/// body so clients can branch without parsing the human-readable message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    /// The LLM gateway failed after the user message was committed; the
    /// caller may retry generation without resubmitting.
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("transcription failed: {0}")]
    Transcription(String),
    #[error("synthesis failed: {0}")]
    Synthesis(String),
    #[error("internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "invalid_input",
            ApiError::Unauthorized => "unauthorized",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Generation(_) => "generation_failed",
            ApiError::Transcription(_) => "transcription_failed",
            ApiError::Synthesis(_) => "synthesis_failed",
            ApiError::Internal(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Generation(_) | ApiError::Transcription(_) | ApiError::Synthesis(_) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, ApiError::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        }));

        (self.status(), body).into_response()
    }
}

impl From<parley_store::StoreError> for ApiError {
    fn from(e: parley_store::StoreError) -> Self {
        match e {
            parley_store::StoreError::NotFound(msg) => ApiError::NotFound(msg),
            parley_store::StoreError::Conflict(msg) => ApiError::Conflict(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::UsernameTaken | AuthError::EmailTaken => ApiError::BadRequest(e.to_string()),
            AuthError::InvalidLogin | AuthError::InvalidCredential => ApiError::Unauthorized,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<parley_llm::LlmError> for ApiError {
    fn from(e: parley_llm::LlmError) -> Self {
        ApiError::Generation(e.to_string())
    }
}

impl From<parley_voice::VoiceError> for ApiError {
    fn from(e: parley_voice::VoiceError) -> Self {
        match e {
            parley_voice::VoiceError::Transcription(msg) => ApiError::Transcription(msg),
            parley_voice::VoiceError::Synthesis(msg) => ApiError::Synthesis(msg),
            parley_voice::VoiceError::Config(msg) => ApiError::Internal(msg),
        }
    }
}

/// Maps a blocking-task join failure to an internal error.
pub(crate) fn join_error(e: tokio::task::JoinError) -> ApiError {
    ApiError::Internal(format!("task join failed: {e}"))
}

/// Maps a pool checkout failure to an internal error.
pub(crate) fn pool_error(e: r2d2::Error) -> ApiError {
    ApiError::Internal(format!("db connection failed: {e}"))
}

/// Request body for `POST /register`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request body for `POST /login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response body for `POST /login`.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Handler for `POST /register`.
pub async fn register_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let username = payload.username.trim().to_string();
    let email = payload.email.trim().to_string();

    if username.is_empty() {
        return Err(ApiError::BadRequest("username is required".to_string()));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("a valid email is required".to_string()));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "password must be at least 8 characters".to_string(),
        ));
    }

    let user = tokio::task::spawn_blocking(move || {
        let conn = state.pool.get().map_err(pool_error)?;
        let new_user = NewUser {
            username,
            email,
            password: payload.password,
        };
        create_user(&conn, &new_user).map_err(ApiError::from)
    })
    .await
    .map_err(join_error)??;

    tracing::info!(username = %user.username, "registered new user");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Handler for `POST /login`.
pub async fn login_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let token = tokio::task::spawn_blocking(move || {
        let conn = state.pool.get().map_err(pool_error)?;
        login(
            &conn,
            &state.token_keys,
            &payload.username,
            &payload.password,
        )
        .map_err(ApiError::from)
    })
    .await
    .map_err(join_error)??;

    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}

/// Handler for `GET /users/me`.
pub async fn me_handler(Extension(auth): Extension<AuthContext>) -> Json<User> {
    Json(auth.0)
}
