//! OpenAI Responses API client.
//!
//! One request per call, no streaming. The response envelope is a list of
//! typed output items (`reasoning`, `web_search_call`, `message`, ...); only
//! `message` items carry text, and their `content` shows up in three shapes
//! depending on mode: a bare string, a flat block array, or an array of block
//! arrays. [`extract_output_text`] is the single place that normalizes them.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{with_retry, GenerateOptions, GenerationClient, GenerationError, RetryPolicy};
use crate::types::EnrichConfig;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/responses";
pub const DEFAULT_MODEL: &str = "gpt-5.1";

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ResponsesEnvelope {
    #[serde(default)]
    pub output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    Message {
        #[serde(default)]
        content: Option<MessageContent>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentEntry>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ContentEntry {
    Block(ContentBlock),
    Nested(Vec<ContentBlock>),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    OutputText { text: String },
    Text { text: String },
    #[serde(other)]
    Other,
}

impl ContentBlock {
    fn text(&self) -> Option<&str> {
        match self {
            Self::OutputText { text } | Self::Text { text } => {
                Some(text.as_str()).filter(|t| !t.trim().is_empty())
            }
            Self::Other => None,
        }
    }
}

/// First non-empty text of the first `message` item that has one.
pub fn extract_output_text(envelope: &ResponsesEnvelope) -> Option<String> {
    envelope.output.iter().find_map(|item| match item {
        OutputItem::Message { content: Some(content) } => match content {
            MessageContent::Text(text) => Some(text.as_str()).filter(|t| !t.trim().is_empty()),
            MessageContent::Blocks(entries) => entries.iter().find_map(|entry| match entry {
                ContentEntry::Block(block) => block.text(),
                ContentEntry::Nested(blocks) => blocks.iter().find_map(ContentBlock::text),
            }),
        }
        .map(str::to_string),
        _ => None,
    })
}

// ---------------------------------------------------------------------------
// Request payload
// ---------------------------------------------------------------------------

/// Build the JSON request body for one call.
pub fn build_payload(model: &str, system: &str, user: &str, options: &GenerateOptions) -> Value {
    let mut payload = json!({
        "model": model,
        "input": format!("System: {}\n\nUser: {}", system, user),
        "reasoning": { "effort": options.reasoning_effort.as_str() },
    });

    if options.web_search {
        payload["tools"] = json!([{ "type": "web_search" }]);
    }
    if options.json_mode {
        payload["text"] = json!({ "format": { "type": "json_object" } });
    }
    if let Some(max) = options.effective_max_output_tokens() {
        payload["max_output_tokens"] = json!(max);
    }
    payload
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct ResponsesClient {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
    short_timeout: Duration,
    search_timeout: Duration,
    retry: RetryPolicy,
}

impl ResponsesClient {
    pub fn new(config: &EnrichConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.resolved_api_key(),
            model: config.model.clone(),
            short_timeout: Duration::from_secs(config.short_timeout_secs),
            search_timeout: Duration::from_secs(config.search_timeout_secs),
            retry: config.retry_policy(),
        }
    }

    fn timeout_for(&self, options: &GenerateOptions) -> Duration {
        if options.web_search {
            self.search_timeout
        } else {
            self.short_timeout
        }
    }

    async fn send_once(&self, api_key: &str, payload: &Value, timeout: Duration) -> Result<String, GenerationError> {
        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .timeout(timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(timeout.as_secs())
                } else {
                    GenerationError::Http(e)
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            log::error!("Generation API error {}: {}", status, body);
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ResponsesEnvelope = resp
            .json()
            .await
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        extract_output_text(&envelope).ok_or_else(|| {
            log::error!("Generation response had no message text ({} output items)", envelope.output.len());
            GenerationError::EmptyOutput
        })
    }
}

#[async_trait]
impl GenerationClient for ResponsesClient {
    async fn generate(
        &self,
        system: &str,
        user: &str,
        options: &GenerateOptions,
    ) -> Result<String, GenerationError> {
        let api_key = self.api_key.as_deref().ok_or(GenerationError::MissingApiKey)?;
        let payload = build_payload(&self.model, system, user, options);
        let timeout = self.timeout_for(options);

        log::debug!(
            "Generation call: model={} json={} web_search={} timeout={:?}",
            self.model,
            options.json_mode,
            options.web_search,
            timeout
        );

        with_retry("generation", &self.retry, |_| self.send_once(api_key, &payload, timeout)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::ReasoningEffort;

    fn decode(raw: &str) -> ResponsesEnvelope {
        serde_json::from_str(raw).expect("valid envelope")
    }

    #[test]
    fn test_payload_json_mode_with_cap() {
        let payload = build_payload("gpt-test", "sys", "usr", &GenerateOptions::json(Some(2000)));
        assert_eq!(payload["model"], "gpt-test");
        assert_eq!(payload["input"], "System: sys\n\nUser: usr");
        assert_eq!(payload["reasoning"]["effort"], "none");
        assert_eq!(payload["text"]["format"]["type"], "json_object");
        assert_eq!(payload["max_output_tokens"], 2000);
        assert!(payload.get("tools").is_none());
    }

    #[test]
    fn test_payload_web_search_omits_token_cap() {
        let mut options = GenerateOptions::web_search(ReasoningEffort::Medium);
        options.max_output_tokens = Some(1000);
        let payload = build_payload("gpt-test", "sys", "usr", &options);
        assert_eq!(payload["tools"][0]["type"], "web_search");
        assert_eq!(payload["reasoning"]["effort"], "medium");
        assert!(payload.get("max_output_tokens").is_none());
        assert!(payload.get("text").is_none());
    }

    #[test]
    fn test_extract_flat_content_array() {
        let envelope = decode(
            r#"{"output":[
                {"type":"reasoning","summary":[]},
                {"type":"message","role":"assistant","content":[
                    {"type":"output_text","text":"Hello there","annotations":[]}
                ]}
            ]}"#,
        );
        assert_eq!(extract_output_text(&envelope).as_deref(), Some("Hello there"));
    }

    #[test]
    fn test_extract_skips_search_calls_and_nested_blocks() {
        let envelope = decode(
            r#"{"output":[
                {"type":"web_search_call","id":"ws_1","status":"completed"},
                {"type":"message","content":[[
                    {"type":"annotation_marker"},
                    {"type":"text","text":"product_name: Foo"}
                ]]}
            ]}"#,
        );
        assert_eq!(extract_output_text(&envelope).as_deref(), Some("product_name: Foo"));
    }

    #[test]
    fn test_extract_string_content() {
        let envelope = decode(r#"{"output":[{"type":"message","content":"plain"}]}"#);
        assert_eq!(extract_output_text(&envelope).as_deref(), Some("plain"));
    }

    #[test]
    fn test_extract_none_when_no_message() {
        let envelope = decode(r#"{"output":[{"type":"reasoning"}]}"#);
        assert!(extract_output_text(&envelope).is_none());

        let empty = decode(r#"{"output":[{"type":"message","content":[{"type":"output_text","text":"  "}]}]}"#);
        assert!(extract_output_text(&empty).is_none());

        let missing = decode(r#"{}"#);
        assert!(extract_output_text(&missing).is_none());
    }
}
