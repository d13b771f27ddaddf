//! Single-shot JSON repair of a malformed model response.
//!
//! One extra completion call asks the model to re-emit the program as strict
//! JSON. There is no retry loop: a failed repair ends the generation.

use serde_json::{json, Value};

use crate::program::extract::extract_json;
use crate::program::prompts::PROGRAM_JSON_SCHEMA;
use crate::provider::{CompletionProvider, CompletionRequest};

/// Responses up to this many characters are sent whole.
pub const REPAIR_EXCERPT_LIMIT: usize = 12_000;
pub const REPAIR_HEAD_CHARS: usize = 8_500;
pub const REPAIR_TAIL_CHARS: usize = 3_000;

/// Excerpt of `raw` for the repair prompt, counted in characters.
///
/// Long text keeps its head and tail around a `[TRUNCATED n CHARS]` marker.
pub fn repair_excerpt(raw: &str) -> String {
    let total = raw.chars().count();
    if total <= REPAIR_EXCERPT_LIMIT {
        return raw.to_string();
    }

    let head: String = raw.chars().take(REPAIR_HEAD_CHARS).collect();
    let tail: String = raw.chars().skip(total - REPAIR_TAIL_CHARS).collect();
    let omitted = total - REPAIR_HEAD_CHARS - REPAIR_TAIL_CHARS;
    format!("{}\n[TRUNCATED {} CHARS]\n{}", head, omitted, tail)
}

pub fn build_repair_prompt(raw: &str) -> String {
    let mut prompt = String::with_capacity(REPAIR_EXCERPT_LIMIT + 1024);
    prompt.push_str(
        "The text below was meant to be a weekly classroom program in JSON but it is \
         malformed or wrapped in prose.\n\
         Rewrite it as strict, compact (minified) JSON. Keep every day and block you can \
         recover. Do not invent new activities. Output JSON only, with no markdown and no \
         commentary.\n\n",
    );
    prompt.push_str("Required shape:\n");
    prompt.push_str(PROGRAM_JSON_SCHEMA);
    prompt.push_str("\n\nOriginal output:\n");
    prompt.push_str(&repair_excerpt(raw));
    prompt.push('\n');
    prompt
}

/// Ask the provider once for a JSON-only rewrite of `raw`.
///
/// Returns the extracted program value and the repaired text, or `None` on
/// any failure.
pub async fn repair(provider: &dyn CompletionProvider, raw: &str) -> Option<(Value, String)> {
    let request = CompletionRequest {
        prompt: build_repair_prompt(raw),
        metadata: json!({ "purpose": "weekly_program_repair" }),
    };

    log::info!(
        "Escalating to JSON repair ({} chars of original output)",
        raw.chars().count()
    );

    let repaired = match provider.complete(&request).await {
        Ok(text) => text,
        Err(e) => {
            log::warn!("JSON repair call failed: {}", e);
            return None;
        }
    };

    match extract_json(&repaired) {
        Some(value) => {
            log::info!("JSON repair produced a usable program");
            Some((value, repaired))
        }
        None => {
            log::warn!("JSON repair output was still unparseable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedProvider {
        reply: Result<String, u16>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(status) => Err(ProviderError::Api {
                    status: *status,
                    body: "upstream failure".to_string(),
                }),
            }
        }
    }

    fn provider(reply: Result<&str, u16>) -> ScriptedProvider {
        ScriptedProvider {
            reply: reply.map(str::to_string),
            prompts: Mutex::new(Vec::new()),
        }
    }

    #[test]
    fn test_short_excerpt_is_whole_text() {
        let text = "x".repeat(REPAIR_EXCERPT_LIMIT);
        assert_eq!(repair_excerpt(&text), text);
    }

    #[test]
    fn test_long_excerpt_keeps_head_and_tail() {
        let text = format!("{}{}{}", "h".repeat(9_000), "m".repeat(5_000), "t".repeat(3_000));
        let excerpt = repair_excerpt(&text);
        assert!(excerpt.starts_with(&"h".repeat(REPAIR_HEAD_CHARS)));
        assert!(excerpt.contains("[TRUNCATED 5500 CHARS]"));
        assert!(excerpt.ends_with(&"t".repeat(REPAIR_TAIL_CHARS)));
    }

    #[test]
    fn test_excerpt_counts_characters_not_bytes() {
        let text = "é".repeat(REPAIR_EXCERPT_LIMIT + 1);
        let excerpt = repair_excerpt(&text);
        assert!(excerpt.contains("[TRUNCATED 501 CHARS]"));
    }

    #[test]
    fn test_repair_prompt_carries_schema_and_original() {
        let prompt = build_repair_prompt("Monday: story time {broken");
        assert!(prompt.contains(PROGRAM_JSON_SCHEMA));
        assert!(prompt.contains("Monday: story time {broken"));
        assert!(prompt.contains("minified"));
    }

    #[tokio::test]
    async fn test_repair_success_issues_one_call() {
        let p = provider(Ok(r#"{"blocks":[{"title":"Story time","day":"Monday"}]}"#));
        let (value, text) = repair(&p, "not json {").await.unwrap();
        assert_eq!(value["blocks"][0]["title"], "Story time");
        assert!(text.starts_with("{\"blocks\""));
        assert_eq!(p.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_repair_returns_none_on_failures() {
        let p = provider(Ok("Sorry, I cannot help with that."));
        assert!(repair(&p, "garbage").await.is_none());

        let p = provider(Err(503));
        assert!(repair(&p, "garbage").await.is_none());
        assert_eq!(p.prompts.lock().unwrap().len(), 1);
    }
}
