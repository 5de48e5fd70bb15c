//! AI collaborator. A small provider abstraction so the pipeline depends on
//! a trait, with a real Anthropic client, a disabled stand-in for keyless
//! deployments, and a mock for tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1500;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(4);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a completion could not be produced. `Unconfigured` is the normal
/// state for keyless deployments and maps to the fixed "unavailable" answer.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("ai provider is not configured")]
    Unconfigured,
    #[error("ai transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("ai provider returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("ai reply carried no text content")]
    EmptyReply,
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, AiError>;
    fn name(&self) -> &'static str;
}

pub type SharedProvider = Arc<dyn CompletionProvider>;

/// Anthropic Messages API client.
pub struct AnthropicProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("ayush-assistant/0.1")
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        #[derive(serde::Serialize)]
        struct Message<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(serde::Serialize)]
        struct Request<'a> {
            model: &'a str,
            max_tokens: u32,
            messages: Vec<Message<'a>>,
        }
        #[derive(serde::Deserialize)]
        struct Block {
            #[serde(default)]
            text: String,
        }
        #[derive(serde::Deserialize)]
        struct Reply {
            #[serde(default)]
            content: Vec<Block>,
        }

        let body = Request {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };
        let resp = self
            .http
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(AiError::Status(resp.status()));
        }
        let reply: Reply = resp.json().await?;
        reply
            .content
            .into_iter()
            .map(|b| b.text)
            .find(|t| !t.is_empty())
            .ok_or(AiError::EmptyReply)
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}

/// Stand-in for deployments without an API key; always unconfigured.
pub struct DisabledProvider;

#[async_trait]
impl CompletionProvider for DisabledProvider {
    async fn complete(&self, _prompt: &str) -> Result<String, AiError> {
        Err(AiError::Unconfigured)
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Test double with a canned reply.
pub struct MockProvider {
    pub reply: String,
}

impl MockProvider {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    async fn complete(&self, _prompt: &str) -> Result<String, AiError> {
        Ok(self.reply.clone())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Pick a provider from configuration. `AI_TEST_MODE=mock` forces the mock
/// regardless of keys so local runs and CI never hit the network.
pub fn build_provider(api_key: Option<&str>, model: &str) -> SharedProvider {
    if std::env::var("AI_TEST_MODE").ok().as_deref() == Some("mock") {
        tracing::info!("AI provider: mock (AI_TEST_MODE)");
        return Arc::new(MockProvider::new(
            "REMEDY_NAME: Mock Remedy\nHERB: Tulsi\nEXPLANATION: mock reply",
        ));
    }
    match api_key {
        Some(key) if !key.trim().is_empty() => {
            tracing::info!(model, "AI provider: anthropic");
            Arc::new(AnthropicProvider::new(key, model))
        }
        _ => {
            tracing::info!("AI provider: disabled (no api key)");
            Arc::new(DisabledProvider)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_provider_reports_unconfigured() {
        let err = DisabledProvider.complete("anything").await.unwrap_err();
        assert!(matches!(err, AiError::Unconfigured));
    }

    #[tokio::test]
    async fn mock_provider_echoes_canned_reply() {
        let mock = MockProvider::new("HERB: Ginger");
        assert_eq!(mock.complete("prompt").await.unwrap(), "HERB: Ginger");
        assert_eq!(mock.name(), "mock");
    }
}
