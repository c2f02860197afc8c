//! Client for an OpenAI-compatible chat completions endpoint.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};

use super::generator::GeneratorError;

/// Chat completions client.
#[derive(Clone)]
pub struct AiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout_seconds: u64,
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system", content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user", content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant", content: content.into() }
    }
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

impl<'a> ChatRequest<'a> {
    fn new(model: &'a str, messages: &'a [ChatMessage], max_tokens: u32, temperature: f32) -> Self {
        Self {
            model,
            messages,
            max_tokens,
            temperature,
            response_format: None,
            format: None,
            tool_choice: None,
        }
    }

    /// Ask the backend to enforce a JSON object. Not every backend accepts
    /// these parameters.
    fn with_json_enforcement(mut self) -> Self {
        self.response_format = Some(ResponseFormat { kind: "json_object" });
        self.format = Some("json");
        self.tool_choice = Some("none");
        self
    }

    fn enforces_json(&self) -> bool {
        self.response_format.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// =============================================================================
// Implementation
// =============================================================================

impl AiClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout_seconds: u64,
    ) -> Result<Self, GeneratorError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() || api_key.trim().is_empty() {
            return Err(GeneratorError::Configuration(
                "AI_API_BASE and AI_API_KEY must be set".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| GeneratorError::Configuration(format!("failed to create HTTP client: {e}")))?;

        tracing::info!(base_url = %base_url, model = %model, "AI client initialized");

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
            timeout_seconds,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// POST one chat request and return the first choice's content.
    async fn post(&self, body: &ChatRequest<'_>) -> Result<String, GeneratorError> {
        let url = self.completions_url();
        debug!(url = %url, json = body.enforces_json(), "POST chat completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeneratorError::Timeout(self.timeout_seconds)
                } else {
                    error!(error = %e, url = %url, "Chat completion request failed");
                    GeneratorError::Connection { url: url.clone(), message: e.to_string() }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, url = %url, "AI API returned error");
            return Err(GeneratorError::Transport { status: status.as_u16(), url, body });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GeneratorError::Timeout(self.timeout_seconds)
            } else {
                GeneratorError::InvalidResponse(format!("failed to parse completion: {e}"))
            }
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| GeneratorError::InvalidResponse("completion has no choices".to_string()))
    }

    /// Run one chat completion. In JSON mode the request first carries the
    /// JSON-enforcement parameters and is resent without them if the backend
    /// rejects them.
    #[instrument(skip(self, messages), fields(model = %self.model, messages = messages.len()))]
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        json_mode: bool,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, GeneratorError> {
        let plain = ChatRequest::new(&self.model, messages, max_tokens, temperature);
        if !json_mode {
            return self.post(&plain).await;
        }

        let strict = ChatRequest::new(&self.model, messages, max_tokens, temperature)
            .with_json_enforcement();
        match self.post(&strict).await {
            Err(e) if e.is_unsupported_params() => {
                tracing::warn!("Backend rejected JSON parameters, retrying without them");
                self.post(&plain).await
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_requires_base_and_key() {
        assert!(matches!(
            AiClient::new("", "key", "m", 5),
            Err(GeneratorError::Configuration(_))
        ));
        assert!(matches!(
            AiClient::new("http://localhost:4000", "  ", "m", 5),
            Err(GeneratorError::Configuration(_))
        ));
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let client = AiClient::new("http://localhost:4000/v1/", "key", "m", 5).unwrap();
        assert_eq!(client.completions_url(), "http://localhost:4000/v1/chat/completions");
    }

    #[test]
    fn json_enforcement_serializes_extra_params() {
        let messages = vec![ChatMessage::user("hi")];
        let plain = serde_json::to_value(ChatRequest::new("m", &messages, 10, 0.2)).unwrap();
        assert!(plain.get("response_format").is_none());
        assert!(plain.get("tool_choice").is_none());

        let strict =
            serde_json::to_value(ChatRequest::new("m", &messages, 10, 0.2).with_json_enforcement()).unwrap();
        assert_eq!(strict["response_format"]["type"], "json_object");
        assert_eq!(strict["format"], "json");
        assert_eq!(strict["tool_choice"], "none");
        assert_eq!(strict["messages"][0]["role"], "user");
    }
}
