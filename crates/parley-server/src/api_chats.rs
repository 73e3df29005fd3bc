//! Chat lifecycle and the message append orchestration.
//!
//! Appending a message is the one multi-stage operation in the system:
//! persist the user turn, assemble the persona-framed transcript, call the
//! LLM gateway, persist the assistant turn. The user turn commits before
//! the gateway call, so a gateway failure leaves the conversation in a
//! consistent, retryable state rather than silently dropping input.

use crate::api::{join_error, pool_error, ApiError};
use crate::middleware::AuthContext;
use crate::AppState;
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
};
use parley_llm::Transcript;
use parley_store::{Chat, Message};
use parley_types::{Sender, Utterance};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Maximum message content length, in characters.
const MAX_MESSAGE_CONTENT_CHARS: usize = 8_000;

/// Request body for `POST /api/chats`.
#[derive(Debug, Deserialize)]
pub struct CreateChatRequest {
    pub role_id: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Request body for `DELETE /api/chats`.
#[derive(Debug, Deserialize)]
pub struct DeleteChatsRequest {
    pub chat_ids: Vec<String>,
}

/// Response body for `DELETE /api/chats`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteChatsResponse {
    pub deleted: usize,
}

/// Request body for `POST /api/chats/{chat_id}/messages`.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

/// Response body for `POST /api/chats/{chat_id}/messages`: the two turns
/// this request added to the conversation.
#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub user_message: Message,
    pub assistant_message: Message,
}

/// Handler for `POST /api/chats`.
///
/// Creates a chat against an existing active role and seeds the opening
/// assistant greeting at position zero, so every conversation replays
/// from a well-defined first turn.
pub async fn create_chat_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateChatRequest>,
) -> Result<(StatusCode, Json<Chat>), ApiError> {
    let user_id = auth.0.id;
    let title = payload.title.unwrap_or_default();

    let chat = tokio::task::spawn_blocking(move || {
        let conn = state.pool.get().map_err(pool_error)?;
        let role = parley_store::get_role(&conn, &payload.role_id)?;
        let chat = parley_store::create_chat(&conn, &user_id, &role.id, &title)?;

        let greeting = format!("Hello, I am {}. How can I help you today?", role.name);
        parley_store::append_message(&conn, &chat.id, Sender::Assistant, &greeting)?;

        Ok::<_, ApiError>(chat)
    })
    .await
    .map_err(join_error)??;

    tracing::info!(chat_id = %chat.id, role_id = %chat.role_id, "created chat");
    Ok((StatusCode::CREATED, Json(chat)))
}

/// Handler for `GET /api/chats`.
pub async fn list_chats_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<Chat>>, ApiError> {
    let user_id = auth.0.id;
    let chats = tokio::task::spawn_blocking(move || {
        let conn = state.pool.get().map_err(pool_error)?;
        parley_store::list_chats(&conn, &user_id).map_err(ApiError::from)
    })
    .await
    .map_err(join_error)??;

    Ok(Json(chats))
}

/// Handler for `DELETE /api/chats`.
///
/// IDs not owned by the caller are silently skipped, so the response never
/// reveals whether someone else's chat exists.
pub async fn delete_chats_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<DeleteChatsRequest>,
) -> Result<Json<DeleteChatsResponse>, ApiError> {
    let user_id = auth.0.id;
    let deleted = tokio::task::spawn_blocking(move || {
        let conn = state.pool.get().map_err(pool_error)?;
        parley_store::delete_chats(&conn, &user_id, &payload.chat_ids).map_err(ApiError::from)
    })
    .await
    .map_err(join_error)??;

    tracing::info!(deleted, "deleted chats");
    Ok(Json(DeleteChatsResponse { deleted }))
}

/// Handler for `POST /api/chats/{chat_id}/messages`.
pub async fn send_message_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(chat_id): Path<String>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let content = payload.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::BadRequest(
            "message content is empty".to_string(),
        ));
    }
    if content.chars().count() > MAX_MESSAGE_CONTENT_CHARS {
        return Err(ApiError::BadRequest(format!(
            "message content exceeds maximum length of {MAX_MESSAGE_CONTENT_CHARS} characters"
        )));
    }

    let user_id = auth.0.id;

    // Stage one: commit the user turn and assemble the transcript. The
    // ownership check and the append run against the same connection; the
    // history read happens after the append so the transcript already
    // contains the new user turn.
    let prep_state = state.clone();
    let prep_chat_id = chat_id.clone();
    let (user_message, transcript) = tokio::task::spawn_blocking(move || {
        let conn = prep_state.pool.get().map_err(pool_error)?;
        let chat = parley_store::get_chat(&conn, &user_id, &prep_chat_id)?;
        let role = parley_store::get_role(&conn, &chat.role_id)?;
        let user_message = parley_store::append_message(&conn, &chat.id, Sender::User, &content)?;

        let history: Vec<Utterance> = parley_store::list_messages(&conn, &user_id, &chat.id)?
            .into_iter()
            .map(|m| Utterance {
                sender: m.sender,
                content: m.content,
            })
            .collect();
        let transcript =
            Transcript::for_role(&role.system_prompt, role.few_shot.as_deref(), &history);

        Ok::<_, ApiError>((user_message, transcript))
    })
    .await
    .map_err(join_error)??;

    // Stage two: generation and the assistant-turn commit run in their own
    // task. If the client disconnects, axum drops this handler future, but
    // the spawned task runs to completion and the reply still lands in the
    // chat for later replay.
    let gen_state = state.clone();
    let gen_chat_id = chat_id.clone();
    let generation = tokio::spawn(async move {
        let reply = gen_state.completer.complete(&transcript).await?;

        let persist_state = gen_state.clone();
        tokio::task::spawn_blocking(move || {
            let conn = persist_state.pool.get().map_err(pool_error)?;
            parley_store::append_message(&conn, &gen_chat_id, Sender::Assistant, &reply)
                .map_err(ApiError::from)
        })
        .await
        .map_err(join_error)?
    });

    let assistant_message = generation.await.map_err(join_error)?.map_err(|e| {
        tracing::warn!(chat_id = %chat_id, error = %e, "assistant turn failed after user commit");
        e
    })?;

    Ok(Json(SendMessageResponse {
        user_message,
        assistant_message,
    }))
}

/// Handler for `GET /api/chats/{chat_id}/messages`.
pub async fn get_messages_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(chat_id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let user_id = auth.0.id;
    let messages = tokio::task::spawn_blocking(move || {
        let conn = state.pool.get().map_err(pool_error)?;
        parley_store::list_messages(&conn, &user_id, &chat_id).map_err(ApiError::from)
    })
    .await
    .map_err(join_error)??;

    Ok(Json(messages))
}
