//! Text generation backend.
//!
//! `TextGenerator` hides whether completions come from a remote model or the
//! offline mock, and owns the JSON repair round-trip.

use thiserror::Error;
use tracing::{instrument, warn};

use super::ai_client::{AiClient, ChatMessage};
use super::mock_client::MockClient;
use crate::loe::json::{clean_json_text, is_valid_json};

const TEMPERATURE: f32 = 0.2;
const REPAIR_TEMPERATURE: f32 = 0.0;

const REPAIR_INSTRUCTION: &str = "Convert your previous answer to ONE valid JSON object with exactly these keys: \
\"summary\" (string), \"tasks\" (string), \"open_questions\" (array of strings). \
Return MINIFIED JSON (single line). Escape all newlines/tabs in strings as \\n and \\t. \
No prose, no code fences, no markdown outside JSON.";

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Generator misconfigured: {0}")]
    Configuration(String),

    #[error("AI API error {status} at {url}: {body}")]
    Transport { status: u16, url: String, body: String },

    #[error("AI API unreachable at {url}: {message}")]
    Connection { url: String, message: String },

    #[error("AI API request timed out after {0}s")]
    Timeout(u64),

    #[error("AI API returned an invalid response: {0}")]
    InvalidResponse(String),
}

impl GeneratorError {
    /// Whether the backend rejected the JSON-enforcement parameters.
    pub fn is_unsupported_params(&self) -> bool {
        match self {
            Self::Transport { body, .. } => {
                body.contains("UnsupportedParamsError") || body.contains("does not support parameters")
            }
            _ => false,
        }
    }
}

#[derive(Clone)]
pub enum TextGenerator {
    Remote(AiClient),
    Mock(MockClient),
}

impl TextGenerator {
    /// `"real"` or `"mock"`, as reported by `/health`.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Remote(_) => "real",
            Self::Mock(_) => "mock",
        }
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        json_mode: bool,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, GeneratorError> {
        match self {
            Self::Remote(client) => client.chat(messages, json_mode, max_tokens, temperature).await,
            Self::Mock(mock) => Ok(mock.chat(messages)),
        }
    }

    /// Complete a prompt. In JSON mode the reply is cleaned and, if it still
    /// does not parse, the model is asked once to re-emit it as strict JSON.
    /// Unparseable output after the repair is returned as-is for the caller
    /// to coerce.
    #[instrument(skip(self, prompt, system), fields(mode = self.mode()))]
    pub async fn complete(
        &self,
        prompt: &str,
        system: Option<&str>,
        json_mode: bool,
        max_tokens: u32,
    ) -> Result<String, GeneratorError> {
        let mut messages = Vec::with_capacity(4);
        if let Some(system) = system.map(str::trim).filter(|s| !s.is_empty()) {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(prompt));

        let out = self.chat(&messages, json_mode, max_tokens, TEMPERATURE).await?;
        if !json_mode {
            return Ok(out);
        }

        let cleaned = clean_json_text(&out);
        if is_valid_json(&cleaned) {
            return Ok(cleaned);
        }

        warn!(len = out.len(), "Model returned non-JSON output, requesting repair");
        messages.push(ChatMessage::assistant(out));
        messages.push(ChatMessage::user(REPAIR_INSTRUCTION));

        let repaired = clean_json_text(&self.chat(&messages, false, max_tokens, REPAIR_TEMPERATURE).await?);
        if !is_valid_json(&repaired) {
            warn!(len = repaired.len(), "Repair attempt still produced non-JSON output");
        }
        Ok(repaired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_params_detected_from_body() {
        let e = GeneratorError::Transport {
            status: 400,
            url: "http://x/chat/completions".into(),
            body: "litellm.UnsupportedParamsError: response_format".into(),
        };
        assert!(e.is_unsupported_params());

        let e = GeneratorError::Transport {
            status: 400,
            url: "u".into(),
            body: "model does not support parameters: ['tool_choice']".into(),
        };
        assert!(e.is_unsupported_params());

        let e = GeneratorError::Transport { status: 500, url: "u".into(), body: "boom".into() };
        assert!(!e.is_unsupported_params());
        assert!(!GeneratorError::Timeout(60).is_unsupported_params());
    }

    #[tokio::test]
    async fn plain_mode_returns_text_untouched() {
        let mock = MockClient::scripted(["```json\n{}\n```"]);
        let generator = TextGenerator::Mock(mock);
        let out = generator.complete("p", None, false, 100).await.unwrap();
        assert_eq!(out, "```json\n{}\n```");
    }

    #[tokio::test]
    async fn json_mode_cleans_without_repair() {
        let mock = MockClient::scripted(["Sure:\n```json\n{\"summary\": \"a\"}\n```"]);
        let generator = TextGenerator::Mock(mock.clone());
        let out = generator.complete("p", Some("sys"), true, 100).await.unwrap();
        assert_eq!(out, "{\"summary\": \"a\"}");
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn json_mode_repairs_once() {
        let mock = MockClient::scripted(["not json at all", "{\"summary\":\"fixed\"}"]);
        let generator = TextGenerator::Mock(mock.clone());
        let out = generator.complete("p", Some("sys"), true, 100).await.unwrap();
        assert_eq!(out, "{\"summary\":\"fixed\"}");
        assert_eq!(mock.call_count(), 2);

        let repair = mock.last_messages().unwrap();
        assert_eq!(repair.len(), 4);
        assert_eq!(repair[2], ChatMessage::assistant("not json at all"));
        assert!(repair[3].content.starts_with("Convert your previous answer"));
    }

    #[tokio::test]
    async fn failed_repair_is_not_an_error() {
        let mock = MockClient::scripted(["nope", "still nope"]);
        let generator = TextGenerator::Mock(mock.clone());
        let out = generator.complete("p", None, true, 100).await.unwrap();
        assert_eq!(out, "still nope");
        assert_eq!(mock.call_count(), 2);
    }
}
