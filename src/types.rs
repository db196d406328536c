//! Configuration types.
//!
//! The config file lives at `~/.catalog-enrich/config.json`. Every field has a
//! default, so a missing file yields a usable configuration; the API key falls
//! back to `OPENAI_API_KEY` when the file does not carry one.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::generation::responses::{DEFAULT_API_URL, DEFAULT_MODEL};
use crate::generation::{ReasoningEffort, RetryPolicy};

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Output format used by the full-enrichment (`generate_all`) routine.
///
/// Exactly one is active per configuration. `Lines` pairs with web search,
/// where constrained JSON output is unreliable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FullEnrichmentFormat {
    #[default]
    Lines,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Reasoning effort for search-augmented full enrichment.
    #[serde(default = "default_search_effort")]
    pub search_reasoning_effort: ReasoningEffort,
    #[serde(default = "default_short_timeout_secs")]
    pub short_timeout_secs: u64,
    #[serde(default = "default_search_timeout_secs")]
    pub search_timeout_secs: u64,
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Pause between records in a batch run.
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    /// Request text used for every record of a batch run.
    #[serde(default = "default_batch_request")]
    pub batch_request: String,
    /// How many image URLs `find_multiple_images` keeps.
    #[serde(default = "default_image_count")]
    pub image_count: usize,
    /// Language generated content is written in.
    #[serde(default = "default_output_language")]
    pub output_language: String,
    #[serde(default)]
    pub full_enrichment_format: FullEnrichmentFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_search_effort() -> ReasoningEffort {
    ReasoningEffort::Low
}

fn default_short_timeout_secs() -> u64 {
    60
}

fn default_search_timeout_secs() -> u64 {
    300
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2_000
}

fn default_batch_delay_ms() -> u64 {
    2_000
}

fn default_batch_request() -> String {
    "Fill in everything automatically".to_string()
}

fn default_image_count() -> usize {
    3
}

fn default_output_language() -> String {
    "Hungarian".to_string()
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            search_reasoning_effort: default_search_effort(),
            short_timeout_secs: default_short_timeout_secs(),
            search_timeout_secs: default_search_timeout_secs(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            batch_delay_ms: default_batch_delay_ms(),
            batch_request: default_batch_request(),
            image_count: default_image_count(),
            output_language: default_output_language(),
            full_enrichment_format: FullEnrichmentFormat::default(),
            db_path: None,
        }
    }
}

impl EnrichConfig {
    /// Key from the config file, else from the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts,
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

/// `~/.catalog-enrich`
pub fn state_dir() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Could not find home directory")?;
    Ok(home.join(".catalog-enrich"))
}

/// Default config path: `~/.catalog-enrich/config.json`.
pub fn config_path() -> Result<PathBuf, String> {
    Ok(state_dir()?.join("config.json"))
}

/// Load configuration from `path`, or from the default location.
///
/// A missing file at the default location is not an error; an explicitly
/// requested path must exist.
pub fn load_config(path: Option<&Path>) -> Result<EnrichConfig, String> {
    let (config_path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (config_path()?, false),
    };

    if !config_path.exists() {
        if explicit {
            return Err(format!("Config file not found at {}", config_path.display()));
        }
        log::info!(
            "No config at {}; using defaults",
            config_path.display()
        );
        return Ok(EnrichConfig::default());
    }

    let content =
        fs::read_to_string(&config_path).map_err(|e| format!("Failed to read config: {}", e))?;

    serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_from_empty_object() {
        let config: EnrichConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.short_timeout_secs, 60);
        assert_eq!(config.search_timeout_secs, 300);
        assert_eq!(config.batch_delay_ms, 2_000);
        assert_eq!(config.image_count, 3);
        assert_eq!(config.full_enrichment_format, FullEnrichmentFormat::Lines);
        assert_eq!(config.search_reasoning_effort, ReasoningEffort::Low);
    }

    #[test]
    fn test_config_camel_case_fields() {
        let json = r#"{
            "apiKey": "sk-test",
            "model": "gpt-test",
            "fullEnrichmentFormat": "json",
            "batchDelayMs": 0,
            "retryMaxAttempts": 5,
            "searchReasoningEffort": "high"
        }"#;
        let config: EnrichConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.resolved_api_key().as_deref(), Some("sk-test"));
        assert_eq!(config.model, "gpt-test");
        assert_eq!(config.full_enrichment_format, FullEnrichmentFormat::Json);
        assert_eq!(config.batch_delay(), Duration::from_millis(0));
        assert_eq!(config.retry_policy().max_attempts, 5);
        assert_eq!(config.search_reasoning_effort, ReasoningEffort::High);
    }

    #[test]
    fn test_load_config_explicit_missing_path_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(load_config(Some(&missing)).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"imageCount": 5, "outputLanguage": "English"}"#).unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.image_count, 5);
        assert_eq!(config.output_language, "English");
    }
}
