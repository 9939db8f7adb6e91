use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::config::{LlmProvider, LlmSettings};

use super::{QuestionSource, QuestionSourceError, QuestionSourceResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const SYSTEM_PROMPT: &str = "You are a quiz writer. Always respond with valid JSON only.";
const ANTHROPIC_MAX_TOKENS: u32 = 2048;
const TEMPERATURE: f64 = 0.7;

/// HTTP client for OpenAI compatible and Anthropic text generation APIs.
#[derive(Clone)]
pub struct LlmQuestionSource {
    client: Client,
    settings: Arc<LlmSettings>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicBlock {
    #[serde(default)]
    text: Option<String>,
}

impl LlmQuestionSource {
    /// Build the client; the API key is only checked when a request is made.
    pub fn new(settings: LlmSettings) -> QuestionSourceResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| QuestionSourceError::ClientBuilder { source })?;
        Ok(Self {
            client,
            settings: Arc::new(settings),
        })
    }

    async fn call(&self, prompt: String) -> QuestionSourceResult<Value> {
        let api_key = self
            .settings
            .api_key
            .clone()
            .ok_or(QuestionSourceError::MissingApiKey)?;

        let text = match self.settings.provider {
            LlmProvider::Anthropic => self.call_anthropic(&api_key, prompt).await?,
            LlmProvider::OpenAi => self.call_openai(&api_key, prompt).await?,
        };

        serde_json::from_str(strip_code_fences(&text)).map_err(|source| {
            warn!(body = %truncate(&text, 2000), "LLM returned invalid JSON");
            QuestionSourceError::InvalidJson { source }
        })
    }

    async fn call_openai(&self, api_key: &str, prompt: String) -> QuestionSourceResult<String> {
        let url = format!("{}/chat/completions", self.settings.base_url);
        let payload = json!({
            "model": self.settings.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt},
            ],
            "temperature": TEMPERATURE,
            "response_format": {"type": "json_object"},
        });
        info!(provider = "openai", model = %self.settings.model, url = %url, "LLM request");

        let request = self.client.post(&url).bearer_auth(api_key).json(&payload);
        let envelope: ChatCompletionResponse = self.send(&url, request).await?;

        envelope
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.is_empty())
            .ok_or(QuestionSourceError::MissingContent)
    }

    async fn call_anthropic(&self, api_key: &str, prompt: String) -> QuestionSourceResult<String> {
        let url = format!("{}/v1/messages", self.settings.base_url);
        let payload = json!({
            "model": self.settings.model,
            "max_tokens": ANTHROPIC_MAX_TOKENS,
            "system": SYSTEM_PROMPT,
            "messages": [{"role": "user", "content": prompt}],
        });
        info!(provider = "anthropic", model = %self.settings.model, url = %url, "LLM request");

        let request = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", self.settings.anthropic_version.as_str())
            .json(&payload);
        let envelope: AnthropicResponse = self.send(&url, request).await?;

        envelope
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .filter(|text| !text.is_empty())
            .ok_or(QuestionSourceError::MissingContent)
    }

    async fn send<T>(&self, url: &str, request: reqwest::RequestBuilder) -> QuestionSourceResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = request
            .send()
            .await
            .map_err(|source| QuestionSourceError::RequestSend {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %truncate(&body, 2000), "LLM request failed");
            return Err(QuestionSourceError::RequestStatus {
                url: url.to_string(),
                status,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| QuestionSourceError::DecodeResponse {
                url: url.to_string(),
                source,
            })
    }
}

impl QuestionSource for LlmQuestionSource {
    fn complete_json(&self, prompt: String) -> BoxFuture<'static, QuestionSourceResult<Value>> {
        let source = self.clone();
        Box::pin(async move { source.call(prompt).await })
    }
}

/// Remove a surrounding markdown code fence (with optional language tag).
pub fn strip_code_fences(text: &str) -> &str {
    let stripped = text.trim();
    if !stripped.starts_with("```") {
        return stripped;
    }

    let body = match stripped.find('\n') {
        Some(idx) => &stripped[idx + 1..],
        None => "",
    };
    let body = body.trim_end();
    let body = match body.rfind('\n') {
        Some(idx) if body[idx + 1..].starts_with("```") => &body[..idx],
        None if body.starts_with("```") => "",
        _ => body,
    };
    body.trim()
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
