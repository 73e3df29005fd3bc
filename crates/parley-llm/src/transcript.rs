//! Transcript assembly.
//!
//! A transcript is the ordered, role-tagged view of a conversation that
//! the completion endpoint expects: system framing first, then optional
//! few-shot example pairs, then the chat history in `order_in_chat`
//! order. The caller guarantees the history is already ordered; this
//! module never reorders it.

use parley_types::{FewShotExample, Sender, Utterance};
use serde::Serialize;

/// One wire-format transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptMessage {
    /// `system`, `user`, or `assistant`.
    pub role: &'static str,
    pub content: String,
}

/// An ordered transcript ready to send to the completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<TranscriptMessage>,
}

impl Transcript {
    /// Builds a transcript for one persona-framed conversation.
    pub fn for_role(
        system_prompt: &str,
        few_shot: Option<&[FewShotExample]>,
        history: &[Utterance],
    ) -> Self {
        let mut messages = Vec::with_capacity(
            1 + few_shot.map_or(0, |f| f.len() * 2) + history.len(),
        );

        messages.push(TranscriptMessage {
            role: "system",
            content: system_prompt.to_string(),
        });

        if let Some(examples) = few_shot {
            for example in examples {
                messages.push(TranscriptMessage {
                    role: "user",
                    content: example.user.clone(),
                });
                messages.push(TranscriptMessage {
                    role: "assistant",
                    content: example.assistant.clone(),
                });
            }
        }

        for utterance in history {
            messages.push(TranscriptMessage {
                role: match utterance.sender {
                    Sender::User => "user",
                    Sender::Assistant => "assistant",
                },
                content: utterance.content.clone(),
            });
        }

        Self { messages }
    }

    /// The wire-format entries, in send order.
    pub fn messages(&self) -> &[TranscriptMessage] {
        &self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_framing_comes_first() {
        let transcript = Transcript::for_role("Be a pirate.", None, &[Utterance::user("hi")]);
        let messages = transcript.messages();
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, "Be a pirate.");
        assert_eq!(messages[1].role, "user");
    }

    #[test]
    fn few_shot_pairs_precede_history() {
        let examples = vec![FewShotExample {
            user: "ahoy?".to_string(),
            assistant: "Ahoy matey!".to_string(),
        }];
        let history = vec![
            Utterance::assistant("Welcome aboard."),
            Utterance::user("Where is the treasure?"),
        ];

        let transcript = Transcript::for_role("Be a pirate.", Some(&examples), &history);
        let roles: Vec<&str> = transcript.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "assistant", "user"]);
        assert_eq!(transcript.messages()[1].content, "ahoy?");
        assert_eq!(transcript.messages()[4].content, "Where is the treasure?");
    }

    #[test]
    fn history_order_is_preserved_verbatim() {
        let history: Vec<Utterance> = (0..4)
            .map(|i| {
                if i % 2 == 0 {
                    Utterance::user(format!("q{i}"))
                } else {
                    Utterance::assistant(format!("a{i}"))
                }
            })
            .collect();

        let transcript = Transcript::for_role("sys", None, &history);
        let contents: Vec<&str> = transcript.messages()[1..]
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["q0", "a1", "q2", "a3"]);
    }
}
