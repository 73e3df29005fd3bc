//! OpenAI-compatible chat completion client.

use crate::{ChatCompleter, LlmConfig, LlmError, Transcript, TranscriptMessage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [TranscriptMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// HTTP client for an OpenAI-compatible `/chat/completions` endpoint.
///
/// One request, one reply, zero retries: retry policy belongs to the
/// transport layer, not the gateway.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl OpenAiClient {
    /// Builds a client with the per-request timeout from config.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(LlmError::Http)?;
        Ok(Self { http, config })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatCompleter for OpenAiClient {
    async fn complete(&self, transcript: &Transcript) -> Result<String, LlmError> {
        let request = CompletionRequest {
            model: &self.config.model,
            messages: transcript.messages(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let mut req = self.http.post(self.completions_url()).json(&request);
        if !self.config.api_key.is_empty() {
            req = req.bearer_auth(&self.config.api_key);
        }

        let response = req.send().await.map_err(LlmError::from)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "completion endpoint rejected request");
            return Err(LlmError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Malformed(e.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::Malformed("response contained no choices".to_string()))?;

        if content.trim().is_empty() {
            return Err(LlmError::Malformed("completion content was empty".to_string()));
        }

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::Utterance;

    #[test]
    fn request_body_matches_wire_shape() {
        let transcript = Transcript::for_role("sys", None, &[Utterance::user("hello")]);
        let request = CompletionRequest {
            model: "deepseek-v3",
            messages: transcript.messages(),
            temperature: 0.7,
            max_tokens: 500,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "deepseek-v3");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hello");
        assert_eq!(json["max_tokens"], 500);
    }

    #[test]
    fn response_parsing_extracts_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Ahoy!"}}],"usage":{"total_tokens":7}}"#;
        let parsed: CompletionResponse = serde_json::from_str(body).unwrap();
        let content = parsed.choices[0].message.content.as_deref();
        assert_eq!(content, Some("Ahoy!"));
    }

    #[test]
    fn response_without_choices_is_malformed() {
        let body = r#"{"choices":[]}"#;
        let parsed: CompletionResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.choices.is_empty());
    }

    #[test]
    fn completions_url_handles_trailing_slash() {
        let client = OpenAiClient::new(LlmConfig {
            endpoint: "https://llm.example.com/v1/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            client.completions_url(),
            "https://llm.example.com/v1/chat/completions"
        );
    }
}
