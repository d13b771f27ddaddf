//! Configuration loaded from `~/.weekplan/config.json`.
//!
//! Every field has a serde default so a partial file is valid. The AI key can
//! be supplied through `WEEKPLAN_AI_API_KEY` instead of the file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ProgramError;
use crate::types::GenerateProgramInput;

/// Environment variable that overrides `ai.apiKey`.
pub const API_KEY_ENV: &str = "WEEKPLAN_AI_API_KEY";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub holidays: HolidayConfig,
}

/// AI proxy connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Forwarded as-is; the proxy decides what it means.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            model: None,
        }
    }
}

/// Public-holiday lookup settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidayConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_holiday_base_url")]
    pub base_url: String,
    #[serde(default = "default_country_code")]
    pub country_code: String,
}

impl Default for HolidayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_holiday_base_url(),
            country_code: default_country_code(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

fn default_holiday_base_url() -> String {
    "https://date.nager.at".to_string()
}

fn default_country_code() -> String {
    "ZA".to_string()
}

impl Config {
    /// Fail early when the AI endpoint is missing.
    pub fn validate(&self) -> Result<(), ProgramError> {
        if self.ai.endpoint.trim().is_empty() {
            return Err(ProgramError::Config(
                "ai.endpoint is not set. Add { \"ai\": { \"endpoint\": \"https://...\" } } to the config file".to_string(),
            ));
        }
        Ok(())
    }

    /// Replace the file key with a non-empty environment value.
    fn apply_env_override(mut self, env_key: Option<String>) -> Self {
        if let Some(key) = env_key.filter(|k| !k.trim().is_empty()) {
            self.ai.api_key = Some(key);
        }
        self
    }
}

pub fn config_path() -> Result<PathBuf, ProgramError> {
    let home = dirs::home_dir()
        .ok_or_else(|| ProgramError::Config("Could not find home directory".to_string()))?;
    Ok(home.join(".weekplan").join("config.json"))
}

/// Load configuration from ~/.weekplan/config.json
pub fn load_config() -> Result<Config, ProgramError> {
    load_config_from(&config_path()?)
}

/// Load configuration from an explicit path, applying the env key override.
pub fn load_config_from(path: &Path) -> Result<Config, ProgramError> {
    let config = read_config_file(path)?;
    Ok(config.apply_env_override(std::env::var(API_KEY_ENV).ok()))
}

fn read_config_file(path: &Path) -> Result<Config, ProgramError> {
    if !path.exists() {
        return Err(ProgramError::Config(format!(
            "Config file not found at {}. Create it with: {{ \"ai\": {{ \"endpoint\": \"https://...\" }} }}",
            path.display()
        )));
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ProgramError::Config(format!("Failed to read config: {}", e)))?;

    serde_json::from_str(&content)
        .map_err(|e| ProgramError::Config(format!("Failed to parse config: {}", e)))
}

/// Read a generation request from a camelCase JSON file.
pub fn load_request(path: &Path) -> Result<GenerateProgramInput, ProgramError> {
    let content = fs::read_to_string(path).map_err(|e| {
        ProgramError::InvalidInput(format!("Failed to read request {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content)
        .map_err(|e| ProgramError::InvalidInput(format!("Failed to parse request: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let file = write_config(r#"{ "ai": { "endpoint": "https://proxy.test/complete" } }"#);
        let config = read_config_file(file.path()).unwrap();
        assert_eq!(config.ai.endpoint, "https://proxy.test/complete");
        assert_eq!(config.ai.timeout_secs, 120);
        assert!(config.ai.api_key.is_none());
        assert!(config.holidays.enabled);
        assert_eq!(config.holidays.base_url, "https://date.nager.at");
        assert_eq!(config.holidays.country_code, "ZA");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_camel_case_fields() {
        let file = write_config(
            r#"{
                "ai": { "endpoint": "https://p", "apiKey": "k1", "timeoutSecs": 30, "model": "fast" },
                "holidays": { "enabled": false, "baseUrl": "http://localhost:9", "countryCode": "GB" }
            }"#,
        );
        let config = read_config_file(file.path()).unwrap();
        assert_eq!(config.ai.api_key.as_deref(), Some("k1"));
        assert_eq!(config.ai.timeout_secs, 30);
        assert_eq!(config.ai.model.as_deref(), Some("fast"));
        assert!(!config.holidays.enabled);
        assert_eq!(config.holidays.country_code, "GB");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_config_file(&dir.path().join("config.json")).unwrap_err();
        assert!(matches!(err, ProgramError::Config(_)));
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let file = write_config("{ not json");
        let err = read_config_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
        assert!(err.requires_user_action());
    }

    #[test]
    fn test_env_override_replaces_key() {
        let config = Config::default().apply_env_override(Some("from-env".to_string()));
        assert_eq!(config.ai.api_key.as_deref(), Some("from-env"));

        let mut with_file_key = Config::default();
        with_file_key.ai.api_key = Some("from-file".to_string());
        let kept = with_file_key.apply_env_override(Some("  ".to_string()));
        assert_eq!(kept.ai.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_load_request() {
        let file = write_config(
            r#"{"organizationId": "o", "createdBy": "c", "weekAnchorDate": "2025-04-30", "theme": "Farm", "ageGroup": "4-5"}"#,
        );
        let input = load_request(file.path()).unwrap();
        assert_eq!(input.theme, "Farm");

        let bad = write_config(r#"{"theme": "Farm"}"#);
        assert!(matches!(load_request(bad.path()), Err(ProgramError::InvalidInput(_))));
    }

    #[test]
    fn test_validate_requires_endpoint() {
        let err = Config::default().validate().unwrap_err();
        assert!(err.to_string().contains("ai.endpoint"));
    }
}
