//! Error types for weekly program generation
//!
//! Errors are classified by recoverability:
//! - Retryable: transport failures, upstream 5xx
//! - NonRetryable: unparseable or empty model output, bad input
//! - RequiresUserAction: quota exhausted, missing configuration

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Fixed user-facing message for quota / rate-limit failures.
pub const QUOTA_LIMIT_MESSAGE: &str = "AI usage limit reached for this workspace. Please wait for the quota to reset or ask an administrator to raise the limit.";

/// Substrings (lowercase) that mark a provider message as a quota failure.
const QUOTA_MARKERS: &[&str] = &[
    "workspace api usage limits",
    "insufficient_quota",
    "rate limit",
    "http 429",
    "will regain access on",
];

/// Failures from the text-completion collaborator, before normalization.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("AI service returned an empty response")]
    EmptyResponse,
    #[error("Invalid AI service response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// HTTP status, when the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Http(e) => e.status().map(|s| s.as_u16()),
            ProviderError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failures from the public-holiday collaborator.
#[derive(Debug, Error)]
pub enum HolidayError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Holiday API error {status}: {body}")]
    Api { status: u16, body: String },
}

/// Errors surfaced to callers of the generation pipeline.
///
/// `Display` is the single human-readable message shown to the user.
#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("Invalid generation request: {0}")]
    InvalidInput(String),

    #[error("{message}")]
    Provider {
        message: String,
        status: Option<u16>,
    },

    #[error("{message}")]
    QuotaExceeded { message: String },

    #[error("AI output could not be parsed as JSON for a weekly program")]
    Unparseable,

    #[error("AI output contained no program blocks")]
    EmptyProgram,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProgramError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            ProgramError::Provider { status, .. } => match status {
                None => true,
                Some(code) => *code == 408 || *code >= 500,
            },
            _ => false,
        }
    }

    /// Returns true if this error requires user action to resolve
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            ProgramError::QuotaExceeded { .. } | ProgramError::Config(_)
        )
    }

    /// Get a user-friendly recovery suggestion
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ProgramError::InvalidInput(_) => "Check the theme, age group and week date, then try again.",
            ProgramError::Provider { .. } => "The AI service could not be reached. Try again shortly.",
            ProgramError::QuotaExceeded { .. } => {
                "Wait for the usage quota to reset or ask an administrator to raise it."
            }
            ProgramError::Unparseable => {
                "Generate again, or simplify the theme and objectives."
            }
            ProgramError::EmptyProgram => "Generate again with more specific weekly objectives.",
            ProgramError::Config(_) => "Check your configuration in ~/.weekplan/config.json",
        }
    }
}

impl From<ProviderError> for ProgramError {
    fn from(err: ProviderError) -> Self {
        let (status, body, fallback) = match &err {
            ProviderError::Api { status, body } => (Some(*status), Some(body.as_str()), err.to_string()),
            other => (other.status(), None, other.to_string()),
        };
        normalize_provider_failure(status, body, &fallback)
    }
}

/// Serializable error representation for the UI layer
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationErrorPayload {
    pub message: String,
    pub error_type: ErrorType,
    pub can_retry: bool,
    pub recovery_suggestion: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    Retryable,
    NonRetryable,
    RequiresUserAction,
}

impl From<&ProgramError> for GenerationErrorPayload {
    fn from(err: &ProgramError) -> Self {
        let error_type = if err.requires_user_action() {
            ErrorType::RequiresUserAction
        } else if err.is_retryable() {
            ErrorType::Retryable
        } else {
            ErrorType::NonRetryable
        };

        GenerationErrorPayload {
            message: err.to_string(),
            error_type,
            can_retry: err.is_retryable(),
            recovery_suggestion: err.recovery_suggestion().to_string(),
        }
    }
}

// =============================================================================
// Provider message normalization
// =============================================================================

fn re_regain_access() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)will regain access on\s+([^\n"]+)"#)
            .expect("regain access regex should compile")
    })
}

/// Build one human-readable message from a failed completion call.
///
/// Prefers a JSON `message` / `error` field in the body, then the raw body
/// text, then `fallback`. Appends ` (HTTP {status})` when the status is known.
pub fn describe_provider_failure(status: Option<u16>, body: Option<&str>, fallback: &str) -> String {
    let body = body.map(str::trim).filter(|b| !b.is_empty());

    let message = body
        .and_then(message_from_json_body)
        .or_else(|| body.map(str::to_string))
        .unwrap_or_else(|| fallback.to_string());

    match status {
        Some(code) if !message.contains(&format!("HTTP {}", code)) => {
            format!("{} (HTTP {})", message, code)
        }
        _ => message,
    }
}

fn message_from_json_body(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let pick = |v: &serde_json::Value| -> Option<String> {
        match v {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            serde_json::Value::Object(map) => map
                .get("message")
                .and_then(|m| m.as_str())
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
            _ => None,
        }
    };
    value
        .get("message")
        .and_then(pick)
        .or_else(|| value.get("error").and_then(pick))
}

/// True when the message describes an exhausted quota or rate limit.
pub fn is_quota_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    QUOTA_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Extract the timestamp following "will regain access on", verbatim.
///
/// The capture stops at the end of the sentence, so trailing advice in the
/// provider message stays out of the quota template.
pub fn extract_regain_access(message: &str) -> Option<String> {
    let caps = re_regain_access().captures(message)?;
    let ts = sentence_head(&caps[1])
        .trim()
        .trim_end_matches(['.', ',', ' '])
        .trim();
    if ts.is_empty() {
        None
    } else {
        Some(ts.to_string())
    }
}

/// Text before the first ". " or "; " that is followed by a capital letter.
fn sentence_head(text: &str) -> &str {
    let bytes = text.as_bytes();
    for (i, pair) in bytes.windows(2).enumerate() {
        if (pair[0] == b'.' || pair[0] == b';') && pair[1] == b' ' {
            let next = text[i + 2..].trim_start().chars().next();
            if next.is_some_and(char::is_uppercase) {
                return &text[..i];
            }
        }
    }
    text
}

/// The fixed quota template, with the regain-access timestamp when known.
pub fn quota_limit_message(source_text: &str) -> String {
    match extract_regain_access(source_text) {
        Some(ts) => format!("{} Access will be restored on {}.", QUOTA_LIMIT_MESSAGE, ts),
        None => QUOTA_LIMIT_MESSAGE.to_string(),
    }
}

/// Turn a failed completion call into the caller-facing error.
pub fn normalize_provider_failure(
    status: Option<u16>,
    body: Option<&str>,
    fallback: &str,
) -> ProgramError {
    let message = describe_provider_failure(status, body, fallback);
    if is_quota_message(&message) || status == Some(429) {
        let source = body.unwrap_or(&message);
        return ProgramError::QuotaExceeded {
            message: quota_limit_message(source),
        };
    }
    ProgramError::Provider { message, status }
}
