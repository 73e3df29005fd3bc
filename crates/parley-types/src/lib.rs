//! Shared domain types for the Parley platform.
//!
//! Kept dependency-light so every other crate can use these without
//! pulling in the database or HTTP stacks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Who authored a message turn.
///
/// A closed two-variant enum rather than a free-form string: the store
/// and the LLM transcript both depend on there being exactly these two
/// sender kinds, and an invalid third value must be unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The human owner of the chat.
    User,
    /// The AI persona replying on behalf of the role.
    Assistant,
}

impl Sender {
    /// The canonical wire/database string for this sender.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sender {
    type Err = UnknownSender;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Sender::User),
            "assistant" => Ok(Sender::Assistant),
            other => Err(UnknownSender(other.to_string())),
        }
    }
}

/// Error returned when a persisted sender string is not one of the two
/// known variants. Indicates database corruption or a schema drift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSender(pub String);

impl fmt::Display for UnknownSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown sender kind: {}", self.0)
    }
}

impl std::error::Error for UnknownSender {}

/// One role-tagged turn of a conversation transcript, as consumed by the
/// LLM gateway. Decoupled from the persisted `Message` so the gateway
/// never sees storage concerns (ids, ordering, timestamps).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub sender: Sender,
    pub content: String,
}

impl Utterance {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            sender: Sender::Assistant,
            content: content.into(),
        }
    }
}

/// A single few-shot example pair attached to a role: what the user might
/// say and how the persona should answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FewShotExample {
    pub user: String,
    pub assistant: String,
}
