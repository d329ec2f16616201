//! Generator configuration.
//!
//! Controls which extraction strategy runs and how the chat-completion
//! strategy talks to its service. Every field has a default, so an empty
//! file (or no file at all) yields a working regex-only configuration.
//!
//! # Example YAML
//!
//! ```yaml
//! parser:
//!   mode: hybrid
//!   prefer_llm: false
//!   force_primary_key_not_null: true
//! llm:
//!   enabled: true
//!   api_endpoint: http://localhost:11434/v1/chat/completions
//!   model: codellama:7b
//!   temperature: 0.1
//!   retry_count: 3
//!   cache_dir: .ddl-schema-cache
//! ```

use std::convert::Infallible;
use std::fmt;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound accepted for `llm.retry_backoff`.
pub const MAX_RETRY_BACKOFF: f64 = 10.0;

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Which extraction strategy to run.
///
/// Parsing is case-insensitive and lenient: unrecognised names select
/// [`ParserMode::Standard`].
///
/// # Examples
///
/// ```
/// use ddl_schema_extract::config::ParserMode;
///
/// assert_eq!("LLM".parse::<ParserMode>().unwrap(), ParserMode::Llm);
/// assert_eq!("Hybrid".parse::<ParserMode>().unwrap(), ParserMode::Hybrid);
/// assert_eq!("antlr".parse::<ParserMode>().unwrap(), ParserMode::Standard);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ParserMode {
    /// Lexical regex-based parser.
    #[default]
    Standard,
    /// Chat-completion service.
    Llm,
    /// Both, in `prefer_llm` order, first non-empty result wins.
    Hybrid,
}

impl ParserMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParserMode::Standard => "standard",
            ParserMode::Llm => "llm",
            ParserMode::Hybrid => "hybrid",
        }
    }
}

impl FromStr for ParserMode {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "llm" => ParserMode::Llm,
            "hybrid" => ParserMode::Hybrid,
            _ => ParserMode::Standard,
        })
    }
}

impl From<String> for ParserMode {
    fn from(value: String) -> Self {
        let Ok(mode) = value.parse::<ParserMode>();
        mode
    }
}

impl fmt::Display for ParserMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parser selection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserSettings {
    pub mode: ParserMode,
    /// In hybrid mode, try the chat-completion strategy first.
    pub prefer_llm: bool,
    /// Force primary-key columns non-nullable in the regex parser.
    pub force_primary_key_not_null: bool,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            mode: ParserMode::Standard,
            prefer_llm: true,
            force_primary_key_not_null: false,
        }
    }
}

/// Chat-completion strategy settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub enabled: bool,
    /// OpenAI-compatible chat-completions URL.
    pub api_endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
    /// Total attempts per extraction.
    pub retry_count: u32,
    /// Delay before the second attempt.
    pub retry_delay_ms: u64,
    /// Multiplier applied to the delay after each failed attempt.
    pub retry_backoff: f64,
    /// Overrides the built-in system prompt when non-empty.
    pub system_prompt: String,
    /// `response_format.type` sent with the request; empty omits it.
    pub response_format: String,
    /// Log full request and response bodies at debug level.
    pub log_requests: bool,
    pub cache_responses: bool,
    /// Directory for persisted cache entries; in-memory only when unset.
    pub cache_dir: Option<PathBuf>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_endpoint: "http://localhost:11434/v1/chat/completions".to_string(),
            model: "codellama:7b".to_string(),
            temperature: 0.1,
            max_tokens: 8192,
            timeout_seconds: 60,
            retry_count: 3,
            retry_delay_ms: 1000,
            retry_backoff: 2.0,
            system_prompt: String::new(),
            response_format: "json_object".to_string(),
            log_requests: false,
            cache_responses: true,
            cache_dir: None,
        }
    }
}

/// Top-level configuration.
///
/// # Examples
///
/// ```
/// use ddl_schema_extract::config::{GeneratorConfig, ParserMode};
///
/// let config = GeneratorConfig::from_yaml_str("parser:\n  mode: Hybrid\n").unwrap();
/// assert_eq!(config.parser.mode, ParserMode::Hybrid);
/// assert!(config.parser.prefer_llm);
/// assert_eq!(config.llm.model, "codellama:7b");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub parser: ParserSettings,
    pub llm: LlmSettings,
}

impl GeneratorConfig {
    /// Loads configuration from a `.json`, `.yml` or `.yaml` file.
    ///
    /// Files with any other extension are read as YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        if is_json(path) {
            Self::from_json_str(&raw)
        } else {
            Self::from_yaml_str(&raw)
        }
    }

    /// Saves the configuration, picking the format from the file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let writer = BufWriter::new(std::fs::File::create(path)?);
        if is_json(path) {
            serde_json::to_writer_pretty(writer, self)?;
        } else {
            serde_yaml::to_writer(writer, self)?;
        }
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges the type system cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let llm = &self.llm;
        if !(0.0..=2.0).contains(&llm.temperature) {
            return Err(ConfigError::Invalid(format!(
                "llm.temperature must be within 0.0..=2.0, got {}",
                llm.temperature
            )));
        }
        if llm.max_tokens == 0 {
            return Err(ConfigError::Invalid("llm.max_tokens must be positive".into()));
        }
        if llm.retry_count == 0 {
            return Err(ConfigError::Invalid("llm.retry_count must be at least 1".into()));
        }
        if !(1.0..=MAX_RETRY_BACKOFF).contains(&llm.retry_backoff) {
            return Err(ConfigError::Invalid(format!(
                "llm.retry_backoff must be within 1.0..={MAX_RETRY_BACKOFF}, got {}",
                llm.retry_backoff
            )));
        }
        if llm.enabled && llm.api_endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.api_endpoint must not be empty".into()));
        }
        Ok(())
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
parser:
  mode: LLM
  prefer_llm: false
  force_primary_key_not_null: true
llm:
  enabled: true
  api_endpoint: http://example.invalid/v1/chat/completions
  model: llama3
  temperature: 0.3
  max_tokens: 2048
  timeout_seconds: 5
  retry_count: 2
  retry_delay_ms: 10
  retry_backoff: 1.5
  response_format: ""
  cache_responses: false
  cache_dir: /tmp/ddl-cache
"#
    }

    #[test]
    fn test_deserialize_complete() {
        let config = GeneratorConfig::from_yaml_str(sample_yaml()).unwrap();
        assert_eq!(config.parser.mode, ParserMode::Llm);
        assert!(!config.parser.prefer_llm);
        assert!(config.parser.force_primary_key_not_null);
        assert_eq!(config.llm.model, "llama3");
        assert_eq!(config.llm.max_tokens, 2048);
        assert_eq!(config.llm.retry_backoff, 1.5);
        assert!(config.llm.response_format.is_empty());
        assert_eq!(config.llm.cache_dir, Some(PathBuf::from("/tmp/ddl-cache")));
        assert!(config.llm.system_prompt.is_empty());
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(GeneratorConfig::from_yaml_str("").unwrap(), GeneratorConfig::default());
        assert_eq!(GeneratorConfig::from_json_str("{}").unwrap(), GeneratorConfig::default());
    }

    #[test]
    fn test_unknown_mode_falls_back_to_standard() {
        let config = GeneratorConfig::from_json_str(r#"{"parser":{"mode":"antlr"}}"#).unwrap();
        assert_eq!(config.parser.mode, ParserMode::Standard);
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let err = GeneratorConfig::from_yaml_str("llm:\n  temperature: 3.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("temperature")));

        let err = GeneratorConfig::from_yaml_str("llm:\n  retry_backoff: 0.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_validate_rejects_unbounded_backoff() {
        for value in [".inf", ".nan", "1.0e300"] {
            let yaml = format!("llm:\n  retry_backoff: {value}\n  retry_delay_ms: 1\n");
            let err = GeneratorConfig::from_yaml_str(&yaml).unwrap_err();
            assert!(
                matches!(&err, ConfigError::Invalid(msg) if msg.contains("retry_backoff")),
                "{value}: {err}"
            );
        }
        let config = GeneratorConfig::from_yaml_str("llm:\n  retry_backoff: 10.0\n").unwrap();
        assert_eq!(config.llm.retry_backoff, MAX_RETRY_BACKOFF);
    }

    #[test]
    fn test_save_and_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = GeneratorConfig::default();
        config.parser.mode = ParserMode::Hybrid;

        for name in ["config.yaml", "config.json"] {
            let path = dir.path().join(name);
            config.save(&path).unwrap();
            assert_eq!(GeneratorConfig::load(&path).unwrap(), config);
        }

        let raw = std::fs::read_to_string(dir.path().join("config.json")).unwrap();
        assert!(raw.trim_start().starts_with('{'));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = GeneratorConfig::load("/nonexistent/ddl-schema.yml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
