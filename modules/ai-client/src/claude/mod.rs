mod client;
pub(crate) mod types;

use std::time::Duration;

use tracing::warn;

use crate::AiError;
use client::ClaudeClient;
use types::*;

// =============================================================================
// Claude Agent
// =============================================================================

#[derive(Debug, Clone)]
pub struct Claude {
    api_key: String,
    model: String,
    base_url: Option<String>,
    timeout: Option<Duration>,
    max_tokens: u32,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            timeout: None,
            max_tokens: 1024,
        }
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self, AiError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| AiError::Config("ANTHROPIC_API_KEY environment variable not set".into()))?;
        Ok(Self::new(api_key, model))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// HTTP-level timeout applied to every request made by this agent.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> Result<ClaudeClient, AiError> {
        let client = ClaudeClient::new(&self.api_key, self.timeout)?;
        Ok(match self.base_url {
            Some(ref url) => client.with_base_url(url),
            None => client,
        })
    }

    // =========================================================================
    // Convenience methods
    // =========================================================================

    /// Single-turn completion at temperature 0. Returns the raw text; callers
    /// that expect structured output parse it themselves.
    pub async fn chat_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<String, AiError> {
        let request = ChatRequest::new(&self.model)
            .system(system)
            .message(WireMessage::user(user))
            .max_tokens(self.max_tokens)
            .temperature(0.0);

        let response = self.client()?.chat(&request).await?;

        if response.truncated() {
            warn!(model = %self.model, "Claude response hit max_tokens, output may be cut off");
        }

        response
            .text()
            .ok_or_else(|| AiError::Empty(format!("no text content from {}", self.model)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let ai = Claude::new("sk-ant-test", "claude-3-5-haiku-latest")
            .with_base_url("https://custom.api.com")
            .with_timeout(Duration::from_secs(30))
            .with_max_tokens(512);
        assert_eq!(ai.model(), "claude-3-5-haiku-latest");
        assert_eq!(ai.base_url.as_deref(), Some("https://custom.api.com"));
        assert_eq!(ai.timeout, Some(Duration::from_secs(30)));
        assert_eq!(ai.max_tokens, 512);
    }

    #[test]
    fn client_builds_with_custom_base_url() {
        let ai = Claude::new("sk-ant-test", "m").with_base_url("http://localhost:9999/");
        assert!(ai.client().is_ok());
    }
}
