use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use teloxide::types::ChatId;

use crate::chatbot::context::ContextConfig;
use crate::chatbot::engine::ChatbotConfig;
use crate::chatbot::orchestrator::OrchestratorConfig;
use chrono_tz::Tz;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Unknown IANA timezone name.
    InvalidTimezone(String),
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::InvalidTimezone(name) => write!(f, "unknown timezone '{}'", name),
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::InvalidTimezone(_) | Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    telegram_bot_token: String,
    #[serde(default)]
    openai_api_key: String,
    openai_base_url: Option<String>,
    /// Google Custom Search credentials for web fallback and image lookup.
    google_api_key: Option<String>,
    google_cse_id: Option<String>,
    openweather_api_key: Option<String>,
    /// Chats the bot answers in. Empty = every chat.
    #[serde(default)]
    allowed_chats: Vec<i64>,
    log_chat_id: Option<i64>,
    /// Directory for state files (logs, database). Defaults to current directory.
    data_dir: Option<String>,
    /// Custom persona text replacing the built-in one.
    personality: Option<String>,
    #[serde(default = "default_model")]
    model: String,
    #[serde(default = "default_fallback_model")]
    fallback_model: String,
    #[serde(default = "default_max_retries")]
    max_retries: u32,
    #[serde(default = "default_retry_delay_secs")]
    retry_delay_secs: u64,
    #[serde(default = "default_history_turns")]
    history_turns: usize,
    /// `null` disables trimming.
    #[serde(default = "default_token_budget")]
    token_budget: Option<usize>,
    #[serde(default = "default_timezone")]
    default_timezone: String,
    #[serde(default = "default_store_failed_turns")]
    store_failed_turns: bool,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_fallback_model() -> String {
    "gpt-4o-mini-search-preview".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_history_turns() -> usize {
    3
}

fn default_token_budget() -> Option<usize> {
    Some(3000)
}

fn default_timezone() -> String {
    "Asia/Bangkok".to_string()
}

fn default_store_failed_turns() -> bool {
    true
}

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

pub struct Config {
    pub telegram_bot_token: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub google_api_key: Option<String>,
    pub google_cse_id: Option<String>,
    pub openweather_api_key: Option<String>,
    pub allowed_chats: HashSet<ChatId>,
    pub log_chat_id: Option<ChatId>,
    /// Directory for state files (logs, database).
    pub data_dir: PathBuf,
    pub personality: Option<String>,
    pub model: String,
    pub fallback_model: String,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub history_turns: usize,
    pub token_budget: Option<usize>,
    pub default_timezone: Tz,
    pub store_failed_turns: bool,
}

/// Blank strings in optional credentials count as absent.
fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        // Validate required fields
        if file.telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation("telegram_bot_token is required".into()));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = file.telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }
        if file.openai_api_key.trim().is_empty() {
            return Err(ConfigError::Validation("openai_api_key is required".into()));
        }
        if file.max_retries == 0 {
            return Err(ConfigError::Validation("max_retries must be at least 1".into()));
        }

        let default_timezone = file
            .default_timezone
            .trim()
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(file.default_timezone.clone()))?;

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            telegram_bot_token: file.telegram_bot_token,
            openai_api_key: file.openai_api_key.trim().to_string(),
            openai_base_url: non_empty(file.openai_base_url).unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            google_api_key: non_empty(file.google_api_key),
            google_cse_id: non_empty(file.google_cse_id),
            openweather_api_key: non_empty(file.openweather_api_key),
            allowed_chats: file.allowed_chats.into_iter().map(ChatId).collect(),
            log_chat_id: file.log_chat_id.map(ChatId),
            data_dir,
            personality: non_empty(file.personality),
            model: file.model,
            fallback_model: file.fallback_model,
            max_retries: file.max_retries,
            retry_delay: Duration::from_secs(file.retry_delay_secs),
            history_turns: file.history_turns,
            token_budget: file.token_budget,
            default_timezone,
            store_failed_turns: file.store_failed_turns,
        })
    }

    /// Empty allow-list admits every chat.
    pub fn is_allowed_chat(&self, chat_id: ChatId) -> bool {
        self.allowed_chats.is_empty() || self.allowed_chats.contains(&chat_id)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("philam.db")
    }

    pub fn chatbot_config(&self) -> ChatbotConfig {
        ChatbotConfig {
            personality: self.personality.clone(),
            context: ContextConfig {
                token_budget: self.token_budget,
                initial_fetch: self.history_turns,
            },
            orchestrator: OrchestratorConfig {
                model: self.model.clone(),
                fallback_model: self.fallback_model.clone(),
                max_retries: self.max_retries,
                retry_delay: self.retry_delay,
                ..OrchestratorConfig::default()
            },
            default_timezone: self.default_timezone,
            store_failed_turns: self.store_failed_turns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_minimal_config_defaults() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdefGHIjklMNOpqrsTUVwxyz",
            "openai_api_key": "sk-test"
        }"#);
        let config = Config::load(file.path()).expect("should load valid config");
        assert_eq!(config.openai_base_url, "https://api.openai.com/v1");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.fallback_model, "gpt-4o-mini-search-preview");
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(5));
        assert_eq!(config.history_turns, 3);
        assert_eq!(config.token_budget, Some(3000));
        assert_eq!(config.default_timezone, chrono_tz::Asia::Bangkok);
        assert!(config.store_failed_turns);
        assert!(config.google_api_key.is_none());
        assert_eq!(config.database_path(), PathBuf::from("./philam.db"));
    }

    #[test]
    fn test_full_config() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "openai_api_key": "sk-test",
            "openai_base_url": "http://localhost:8080/v1",
            "google_api_key": "g",
            "google_cse_id": "  ",
            "allowed_chats": [-100123, 42],
            "log_chat_id": -100999,
            "data_dir": "/var/lib/philam",
            "max_retries": 1,
            "retry_delay_secs": 0,
            "history_turns": 5,
            "token_budget": null,
            "default_timezone": "Asia/Tokyo",
            "store_failed_turns": false
        }"#);
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.google_api_key.as_deref(), Some("g"));
        assert!(config.google_cse_id.is_none());
        assert!(config.is_allowed_chat(ChatId(42)));
        assert!(!config.is_allowed_chat(ChatId(7)));
        assert_eq!(config.log_chat_id, Some(ChatId(-100999)));
        assert_eq!(config.token_budget, None);

        let chatbot = config.chatbot_config();
        assert_eq!(chatbot.context.initial_fetch, 5);
        assert_eq!(chatbot.orchestrator.max_retries, 1);
        assert_eq!(chatbot.orchestrator.fallback_window, 5);
        assert_eq!(chatbot.default_timezone, chrono_tz::Asia::Tokyo);
        assert!(!chatbot.store_failed_turns);
    }

    #[test]
    fn test_empty_allow_list_admits_all() {
        let file = write_config(r#"{"telegram_bot_token": "1:a", "openai_api_key": "k"}"#);
        let config = Config::load(file.path()).unwrap();
        assert!(config.is_allowed_chat(ChatId(-12345)));
    }

    #[test]
    fn test_empty_token() {
        let file = write_config(r#"{
            "telegram_bot_token": "",
            "openai_api_key": "k"
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("telegram_bot_token"));
    }

    #[test]
    fn test_invalid_token_format_no_colon() {
        let file = write_config(r#"{
            "telegram_bot_token": "invalid_token_no_colon",
            "openai_api_key": "k"
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("invalid"));
    }

    #[test]
    fn test_invalid_token_format_non_numeric_id() {
        let file = write_config(r#"{
            "telegram_bot_token": "notanumber:ABCdef",
            "openai_api_key": "k"
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_missing_openai_key() {
        let file = write_config(r#"{"telegram_bot_token": "123:abc"}"#);
        let err = assert_err(Config::load(file.path()));
        assert!(err.to_string().contains("openai_api_key"));
    }

    #[test]
    fn test_zero_retries_rejected() {
        let file = write_config(r#"{
            "telegram_bot_token": "123:abc",
            "openai_api_key": "k",
            "max_retries": 0
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(err.to_string().contains("max_retries"));
    }

    #[test]
    fn test_invalid_timezone() {
        let file = write_config(r#"{
            "telegram_bot_token": "123:abc",
            "openai_api_key": "k",
            "default_timezone": "Mars/Olympus"
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::InvalidTimezone(ref name) if name == "Mars/Olympus"));
    }

    #[test]
    fn test_file_not_found() {
        let err = assert_err(Config::load("/nonexistent/path/config.json"));
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config("{ invalid json }");
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }
}
