//! Configuration models for ankisync.
//!
//! Every endpoint, path and retry knob lives here and is handed to the
//! components that need it; nothing is read from globals.

use crate::models::PromptTemplates;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Top-level configuration for ankisync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Text generation service
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// AnkiConnect note sink
    #[serde(default)]
    pub anki: AnkiConfig,

    /// Where vocabulary rows come from
    #[serde(default)]
    pub source: SourceConfig,

    /// Resume state
    #[serde(default)]
    pub checkpoint: CheckpointConfig,

    /// Batch settings
    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Prompt templates; the built-in set is used when the table is absent
    #[serde(default)]
    pub prompts: PromptTemplates,
}

/// Ollama generate endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_ollama_model")]
    pub model: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434/api/generate".to_string()
}

fn default_ollama_model() -> String {
    "mixtral".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ollama_endpoint(),
            model: default_ollama_model(),
            timeout_secs: default_timeout(),
        }
    }
}

/// AnkiConnect configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnkiConfig {
    #[serde(default = "default_anki_endpoint")]
    pub endpoint: String,

    /// Anki note type used for new notes
    #[serde(default = "default_anki_model_name")]
    pub model_name: String,

    /// Tags attached to every note
    #[serde(default = "default_anki_tags")]
    pub tags: Vec<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_anki_endpoint() -> String {
    "http://localhost:8765".to_string()
}

fn default_anki_model_name() -> String {
    "Basic".to_string()
}

fn default_anki_tags() -> Vec<String> {
    vec!["auto-generated".to_string()]
}

impl Default for AnkiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_anki_endpoint(),
            model_name: default_anki_model_name(),
            tags: default_anki_tags(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Row source selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    /// Local CSV file with a header row
    Csv(CsvSourceConfig),
    /// Google Sheets spreadsheet
    Sheets(SheetsConfig),
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Csv(CsvSourceConfig {
            path: PathBuf::from("words.csv"),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvSourceConfig {
    pub path: PathBuf,
}

/// Google Sheets v4 configuration.
///
/// Only a ready-made bearer token is accepted; acquiring one is left to the
/// caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,

    /// A1 range holding the four language columns, header included
    #[serde(default = "default_sheets_range")]
    pub range: String,

    /// Numeric id of the tab rows are deleted from
    #[serde(default)]
    pub sheet_id: i64,

    /// Bearer token (supports ${ENV_VAR} expansion)
    #[serde(default)]
    pub token: Option<String>,

    /// Environment variable consulted when `token` is unset
    #[serde(default = "default_sheets_token_env")]
    pub token_env: String,

    #[serde(default = "default_sheets_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_sheets_range() -> String {
    "Sheet1!A:D".to_string()
}

fn default_sheets_token_env() -> String {
    "GOOGLE_SHEETS_TOKEN".to_string()
}

fn default_sheets_base_url() -> String {
    "https://sheets.googleapis.com/v4".to_string()
}

impl SheetsConfig {
    /// Resolve the bearer token from config or environment.
    pub fn resolve_token(&self) -> Result<String, ConfigError> {
        if let Some(token) = &self.token {
            return Ok(expand_env_vars(token));
        }

        std::env::var(&self.token_env).map_err(|_| ConfigError::MissingToken {
            env_var: self.token_env.clone(),
        })
    }
}

/// Checkpoint file location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    #[serde(default = "default_checkpoint_path")]
    pub path: PathBuf,
}

fn default_checkpoint_path() -> PathBuf {
    PathBuf::from("processed_rows.json")
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            path: default_checkpoint_path(),
        }
    }
}

/// Batch run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Attempts per row when processing raises
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delete successfully processed rows from the source afterwards
    #[serde(default = "default_true")]
    pub cleanup: bool,

    /// Draw a progress bar
    #[serde(default = "default_true")]
    pub progress: bool,
}

fn default_max_retries() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            cleanup: true,
            progress: true,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Append logs to this file in addition to stdout
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        Self::from_toml(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

/// Expand environment variables in a string.
///
/// Supports ${VAR_NAME} syntax.
/// If the variable is not set, the placeholder is left unchanged.
pub fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();

    for cap in ENV_VAR_PATTERN.captures_iter(s) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Missing Google Sheets token: set {env_var} env var or token in [source]")]
    MissingToken { env_var: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Language;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.ollama.endpoint, "http://localhost:11434/api/generate");
        assert_eq!(config.ollama.model, "mixtral");
        assert_eq!(config.anki.endpoint, "http://localhost:8765");
        assert_eq!(config.anki.tags, vec!["auto-generated".to_string()]);
        assert_eq!(config.checkpoint.path, PathBuf::from("processed_rows.json"));
        assert_eq!(config.run.max_retries, 3);
        assert!(config.run.cleanup);
        assert!(config.prompts.missing_languages().is_empty());
        assert!(matches!(config.source, SourceConfig::Csv(_)));
    }

    #[test]
    fn test_sheets_source_parses() {
        let config = Config::from_toml(
            r#"
[source]
kind = "sheets"
spreadsheet_id = "abc123"
sheet_id = 7

[run]
max_retries = 5
cleanup = false
"#,
        )
        .unwrap();

        match config.source {
            SourceConfig::Sheets(sheets) => {
                assert_eq!(sheets.spreadsheet_id, "abc123");
                assert_eq!(sheets.range, "Sheet1!A:D");
                assert_eq!(sheets.sheet_id, 7);
                assert_eq!(sheets.token_env, "GOOGLE_SHEETS_TOKEN");
            }
            other => panic!("expected sheets source, got {other:?}"),
        }
        assert_eq!(config.run.max_retries, 5);
        assert!(!config.run.cleanup);
    }

    #[test]
    fn test_partial_prompts_table_replaces_defaults() {
        let config = Config::from_toml(
            r#"
[prompts]
german = "Erkläre {word}"
"#,
        )
        .unwrap();

        assert_eq!(config.prompts.get(Language::German).unwrap(), "Erkläre {word}");
        assert!(config.prompts.get(Language::English).is_err());
    }

    #[test]
    fn test_unknown_source_kind_is_rejected() {
        assert!(Config::from_toml("[source]\nkind = \"excel\"\npath = \"x\"").is_err());
    }

    #[test]
    fn test_expand_env_vars_leaves_unknown_placeholders() {
        assert_eq!(
            expand_env_vars("Bearer ${ANKISYNC_SURELY_UNSET_VAR}"),
            "Bearer ${ANKISYNC_SURELY_UNSET_VAR}"
        );
        assert_eq!(expand_env_vars("plain"), "plain");
    }

    #[test]
    fn test_explicit_token_wins_over_env() {
        let sheets = SheetsConfig {
            spreadsheet_id: "id".to_string(),
            range: default_sheets_range(),
            sheet_id: 0,
            token: Some("ya29.token".to_string()),
            token_env: "ANKISYNC_SURELY_UNSET_VAR".to_string(),
            base_url: default_sheets_base_url(),
            timeout_secs: 30,
        };
        assert_eq!(sheets.resolve_token().unwrap(), "ya29.token");

        let without = SheetsConfig {
            token: None,
            ..sheets
        };
        assert!(matches!(
            without.resolve_token(),
            Err(ConfigError::MissingToken { .. })
        ));
    }
}
