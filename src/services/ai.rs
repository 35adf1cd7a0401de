use crate::config::AiConfig;
use serde::Deserialize;
use tracing::warn;

/// What every caller gets back when the completion service lets us down.
pub const FALLBACK_REPLY: &str = "Hello!";

/// Prompt in, text out. Implementations never fail: errors collapse to [`FALLBACK_REPLY`].
#[async_trait::async_trait]
pub trait Responder: Send + Sync {
    async fn complete(&self, prompt: &str) -> String;
}

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("completion service answered with status {0}")]
    Status(reqwest::StatusCode),
    #[error("completion response carried no text")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completions endpoint (OpenRouter by default).
pub struct OpenRouterClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenRouterClient {
    pub fn new(config: &AiConfig) -> Result<Self, AiError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    pub async fn try_complete(&self, prompt: &str) -> Result<String, AiError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AiError::Status(response.status()));
        }

        let completion: ChatCompletion = response.json().await?;
        first_choice_text(completion).ok_or(AiError::Empty)
    }
}

fn first_choice_text(completion: ChatCompletion) -> Option<String> {
    completion
        .choices
        .into_iter()
        .next()?
        .message?
        .content
        .filter(|text| !text.trim().is_empty())
}

#[async_trait::async_trait]
impl Responder for OpenRouterClient {
    async fn complete(&self, prompt: &str) -> String {
        match self.try_complete(prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("AI completion failed, using fallback reply: {}", e);
                FALLBACK_REPLY.to_string()
            }
        }
    }
}
