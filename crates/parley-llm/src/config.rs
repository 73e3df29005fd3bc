use serde::Deserialize;
use std::fmt;

fn default_model() -> String {
    "deepseek-v3".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    500
}

fn default_timeout_secs() -> u64 {
    60
}

/// Configuration for the OpenAI-compatible completion endpoint.
#[derive(Clone, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the endpoint (the client appends `/chat/completions`).
    pub endpoint: String,
    /// Bearer token for the endpoint.
    #[serde(default)]
    pub api_key: String,
    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Per-request timeout in seconds. The gateway never retries.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_api_key() {
        let config = LlmConfig {
            api_key: "sk-very-secret".to_string(),
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let config: LlmConfig =
            toml::from_str("endpoint = \"https://llm.example.com/v1\"").unwrap();
        assert_eq!(config.model, "deepseek-v3");
        assert_eq!(config.max_tokens, 500);
        assert_eq!(config.timeout_secs, 60);
    }
}
