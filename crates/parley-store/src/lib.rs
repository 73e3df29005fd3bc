//! Ownership-scoped persistence for chats and messages.
//!
//! Implements chat CRUD, ordered message persistence, and role lookup on
//! top of SQLite. Every chat query is scoped by the owning user: a chat
//! that exists but belongs to someone else is reported exactly like a chat
//! that does not exist, so callers can never probe for other users' data.
//!
//! Message ordering is the core invariant here. `order_in_chat` is assigned
//! inside the insert statement itself (`SELECT COALESCE(MAX(..), -1) + 1`),
//! so SQLite's single-writer discipline serializes concurrent appends to
//! the same chat without any process-wide counter. The
//! `UNIQUE (chat_id, order_in_chat)` index backs this up: if the
//! serialization ever breaks, the write fails with [`StoreError::Conflict`]
//! instead of silently corrupting the replay order.

use parley_types::{FewShotExample, Sender};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// The referenced entity does not exist — or is not owned by the
    /// requesting user. The two cases are deliberately indistinguishable.
    #[error("not found: {0}")]
    NotFound(String),
    /// An ordering collision at write time. Should not occur under correct
    /// serialization; indicates a concurrency-control defect.
    #[error("ordering conflict: {0}")]
    Conflict(String),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// An AI persona. Reference data: the chat core only ever reads these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Role {
    /// Unique public ID (UUID).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Human-readable description shown when picking a persona.
    pub description: String,
    /// System framing prepended to every transcript sent to the LLM.
    pub system_prompt: String,
    /// Optional few-shot example turns reinforcing the persona.
    pub few_shot: Option<Vec<FewShotExample>>,
    /// Inactive roles are hidden and cannot start new chats.
    pub is_active: bool,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
}

/// Parameters for creating a new role.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoleParams {
    pub name: String,
    pub description: String,
    pub system_prompt: String,
    pub few_shot: Option<Vec<FewShotExample>>,
}

/// A persisted conversation between one user and one role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chat {
    /// Unique public ID (UUID).
    pub id: String,
    /// Owning user. Only this user can see or mutate the chat.
    pub user_id: String,
    /// The persona this conversation is held with.
    pub role_id: String,
    /// Display title.
    pub title: String,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
}

/// One turn of a chat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Unique public ID (UUID).
    pub id: String,
    /// Parent chat.
    pub chat_id: String,
    /// Who authored this turn.
    pub sender: Sender,
    /// Message text.
    pub content: String,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
    /// Monotonic position within the chat; the sole ordering key.
    pub order_in_chat: i64,
}

// ── Roles ──

/// Creates a new role and returns it.
pub fn create_role(conn: &Connection, params: &CreateRoleParams) -> Result<Role, StoreError> {
    let id = Uuid::new_v4().to_string();
    let few_shot_json = params
        .few_shot
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        "INSERT INTO roles (id, name, description, system_prompt, few_shot_json)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            id,
            params.name,
            params.description,
            params.system_prompt,
            few_shot_json,
        ],
    )?;

    get_role(conn, &id)
}

/// Retrieves an active role by ID.
pub fn get_role(conn: &Connection, role_id: &str) -> Result<Role, StoreError> {
    conn.query_row(
        "SELECT id, name, description, system_prompt, few_shot_json, is_active, created_at
         FROM roles WHERE id = ?1 AND is_active = 1",
        [role_id],
        map_row_to_role,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(format!("role {role_id}")))
}

/// Lists all active roles, ordered by name.
pub fn list_roles(conn: &Connection) -> Result<Vec<Role>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, system_prompt, few_shot_json, is_active, created_at
         FROM roles WHERE is_active = 1 ORDER BY name ASC",
    )?;

    let rows = stmt.query_map([], map_row_to_role)?;
    let mut roles = Vec::new();
    for row in rows {
        roles.push(row?);
    }
    Ok(roles)
}

fn map_row_to_role(row: &Row) -> rusqlite::Result<Role> {
    let few_shot_json: Option<String> = row.get(4)?;
    let few_shot = match few_shot_json {
        Some(s) => Some(serde_json::from_str(&s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?),
        None => None,
    };

    Ok(Role {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        system_prompt: row.get(3)?,
        few_shot,
        is_active: row.get(5)?,
        created_at: row.get(6)?,
    })
}

// ── Chats ──

/// Creates a new chat owned by `user_id`, associated with an existing
/// active role. An empty title defaults to a role-derived one.
pub fn create_chat(
    conn: &Connection,
    user_id: &str,
    role_id: &str,
    title: &str,
) -> Result<Chat, StoreError> {
    let role = get_role(conn, role_id)?;
    let title = if title.trim().is_empty() {
        format!("Chat with {}", role.name)
    } else {
        title.to_string()
    };

    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO chats (id, user_id, role_id, title) VALUES (?1, ?2, ?3, ?4)",
        params![id, user_id, role_id, title],
    )?;

    get_chat(conn, user_id, &id)
}

/// Retrieves a chat by ID, scoped to the owning user.
pub fn get_chat(conn: &Connection, user_id: &str, chat_id: &str) -> Result<Chat, StoreError> {
    conn.query_row(
        "SELECT id, user_id, role_id, title, created_at
         FROM chats WHERE id = ?1 AND user_id = ?2",
        [chat_id, user_id],
        map_row_to_chat,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(format!("chat {chat_id}")))
}

/// Lists the user's chats, most recent first.
pub fn list_chats(conn: &Connection, user_id: &str) -> Result<Vec<Chat>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, role_id, title, created_at
         FROM chats WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
    )?;

    let rows = stmt.query_map([user_id], map_row_to_chat)?;
    let mut chats = Vec::new();
    for row in rows {
        chats.push(row?);
    }
    Ok(chats)
}

/// Deletes the given chats (and, via cascade, their messages) in a single
/// transaction. IDs not owned by `user_id` are silently skipped — the
/// ownership filter never reports which ids it dropped, so callers cannot
/// learn whether someone else's chat exists. Returns the number of chats
/// actually deleted.
pub fn delete_chats(
    conn: &Connection,
    user_id: &str,
    chat_ids: &[String],
) -> Result<usize, StoreError> {
    let tx = conn.unchecked_transaction()?;
    let mut deleted = 0;

    {
        let mut stmt = tx.prepare("DELETE FROM chats WHERE id = ?1 AND user_id = ?2")?;
        for chat_id in chat_ids {
            deleted += stmt.execute([chat_id.as_str(), user_id])?;
        }
    }

    tx.commit()?;
    Ok(deleted)
}

// ── Messages ──

/// Appends a message to a chat, assigning the next `order_in_chat` value.
///
/// The order is computed by the insert statement itself inside a write
/// transaction, so two concurrent appends to the same chat can never
/// observe the same maximum. The chat existence check runs in the same
/// transaction: an append racing a delete either lands before the delete
/// (and is cascaded away with the chat) or observes the chat as gone and
/// returns [`StoreError::NotFound`]. No ownership parameter here — callers
/// resolve ownership via [`get_chat`] first; this function is the commit
/// point below that check.
pub fn append_message(
    conn: &Connection,
    chat_id: &str,
    sender: Sender,
    content: &str,
) -> Result<Message, StoreError> {
    // BEGIN IMMEDIATE takes the write lock up front. A deferred transaction
    // would read first and upgrade on insert, which in WAL mode can fail
    // with SQLITE_BUSY_SNAPSHOT instead of waiting on the busy timeout.
    conn.execute_batch("BEGIN IMMEDIATE")?;
    match append_message_in_tx(conn, chat_id, sender, content) {
        Ok(message) => {
            conn.execute_batch("COMMIT")?;
            Ok(message)
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(e)
        }
    }
}

fn append_message_in_tx(
    conn: &Connection,
    chat_id: &str,
    sender: Sender,
    content: &str,
) -> Result<Message, StoreError> {
    let chat_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM chats WHERE id = ?1)",
        [chat_id],
        |row| row.get(0),
    )?;
    if !chat_exists {
        return Err(StoreError::NotFound(format!("chat {chat_id}")));
    }

    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO messages (id, chat_id, sender, content, order_in_chat)
         VALUES (?1, ?2, ?3, ?4,
                 (SELECT COALESCE(MAX(order_in_chat), -1) + 1
                  FROM messages WHERE chat_id = ?2))",
        params![id, chat_id, sender.as_str(), content],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(code, _)
            if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
        {
            // The chat was deleted between the existence check and the
            // insert. To the caller that is the same as it never existing.
            StoreError::NotFound(format!("chat {chat_id}"))
        }
        rusqlite::Error::SqliteFailure(code, _)
            if code.code == rusqlite::ffi::ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict(format!("order collision in chat {chat_id}"))
        }
        other => StoreError::Database(other),
    })?;

    let message = conn.query_row(
        "SELECT id, chat_id, sender, content, created_at, order_in_chat
         FROM messages WHERE id = ?1",
        [&id],
        map_row_to_message,
    )?;

    Ok(message)
}

/// Lists a chat's messages ordered strictly by `order_in_chat` ascending,
/// scoped to the owning user.
pub fn list_messages(
    conn: &Connection,
    user_id: &str,
    chat_id: &str,
) -> Result<Vec<Message>, StoreError> {
    // Ownership gate: missing and not-owned are the same 404.
    let _ = get_chat(conn, user_id, chat_id)?;

    let mut stmt = conn.prepare(
        "SELECT id, chat_id, sender, content, created_at, order_in_chat
         FROM messages WHERE chat_id = ?1 ORDER BY order_in_chat ASC",
    )?;

    let rows = stmt.query_map([chat_id], map_row_to_message)?;
    let mut messages = Vec::new();
    for row in rows {
        messages.push(row?);
    }
    Ok(messages)
}

fn map_row_to_chat(row: &Row) -> rusqlite::Result<Chat> {
    Ok(Chat {
        id: row.get(0)?,
        user_id: row.get(1)?,
        role_id: row.get(2)?,
        title: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn map_row_to_message(row: &Row) -> rusqlite::Result<Message> {
    let sender_str: String = row.get(2)?;
    let sender: Sender = sender_str.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Message {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        sender,
        content: row.get(3)?,
        created_at: row.get(4)?,
        order_in_chat: row.get(5)?,
    })
}
