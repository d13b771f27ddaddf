//! Text-completion collaborator.
//!
//! `CompletionProvider` is the seam the generation pipeline calls through.
//! `HttpCompletionProvider` talks to an AI proxy endpoint that accepts
//! `{prompt, metadata, model?}` and answers with either plain text or a JSON
//! envelope; `extract_completion_text` pulls the completion out of either.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::AiConfig;
use crate::error::ProviderError;

/// Envelope fields searched for the completion text, in priority order.
pub const RESPONSE_TEXT_KEYS: &[&str] = &["content", "response", "result", "text", "message"];

/// One completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    /// Opaque bag forwarded to the service untouched.
    pub metadata: Value,
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Run one completion and return the raw model text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}

pub struct HttpCompletionProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: Option<String>,
}

impl HttpCompletionProvider {
    pub fn new(config: &AiConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl CompletionProvider for HttpCompletionProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let mut body = json!({
            "prompt": request.prompt,
            "metadata": request.metadata,
        });
        if let Some(model) = &self.model {
            body["model"] = Value::String(model.clone());
        }

        let mut req = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        log::debug!(
            "Completion endpoint answered {} ({} bytes)",
            status.as_u16(),
            text.len()
        );
        extract_completion_text(&text)
    }
}

/// Pull the completion text out of a response body.
///
/// JSON bodies are searched for a top-level string or one of
/// `RESPONSE_TEXT_KEYS`. Anything that is not JSON, and JSON objects without
/// any of those fields, are the completion itself.
pub fn extract_completion_text(body: &str) -> Result<String, ProviderError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::EmptyResponse);
    }

    let value: Value = match serde_json::from_str(trimmed) {
        Ok(v) => v,
        Err(_) => return Ok(trimmed.to_string()),
    };

    match text_from_value(&value, 1) {
        Some(text) if !text.trim().is_empty() => Ok(text),
        Some(_) => Err(ProviderError::EmptyResponse),
        None if value.is_object() => Ok(trimmed.to_string()),
        None => Err(ProviderError::InvalidResponse(format!(
            "no completion text in response fields ({})",
            RESPONSE_TEXT_KEYS.join(", ")
        ))),
    }
}

/// `nested` is how many object levels below this one may still be searched.
fn text_from_value(value: &Value, nested: usize) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => joined_parts(parts),
        Value::Object(map) => {
            for key in RESPONSE_TEXT_KEYS {
                let Some(field) = map.get(*key) else {
                    continue;
                };
                let found = match field {
                    Value::String(s) => Some(s.clone()),
                    Value::Array(parts) => joined_parts(parts),
                    Value::Object(_) if nested > 0 => text_from_value(field, nested - 1),
                    _ => None,
                };
                if found.is_some() {
                    return found;
                }
            }
            None
        }
        _ => None,
    }
}

/// Join an array of strings / `{text}` parts with newlines.
fn joined_parts(parts: &[Value]) -> Option<String> {
    let texts: Vec<&str> = parts
        .iter()
        .filter_map(|part| match part {
            Value::String(s) => Some(s.as_str()),
            Value::Object(map) => map.get("text").and_then(Value::as_str),
            _ => None,
        })
        .collect();
    if texts.is_empty() {
        None
    } else {
        Some(texts.join("\n"))
    }
}
