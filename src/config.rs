use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub moderation: ModerationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModerationConfig {
    /// Senders exempt from the phone and link rules
    #[serde(default)]
    pub allowed_user_ids: Vec<u64>,
    /// Seconds a policy warning stays visible before the bot removes it
    #[serde(default = "default_warning_ttl_secs")]
    pub warning_ttl_secs: u64,
    #[serde(default = "default_phone_warning")]
    pub phone_warning: String,
    #[serde(default = "default_link_warning")]
    pub link_warning: String,
    #[serde(default = "default_phone_pattern")]
    pub phone_pattern: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Plain-text log file, appended to alongside stdout
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

fn default_warning_ttl_secs() -> u64 {
    10
}

fn default_phone_warning() -> String {
    "Please include a phone number in your message.".to_string()
}

fn default_link_warning() -> String {
    "Links are not allowed.".to_string()
}

pub fn default_phone_pattern() -> String {
    r"(\+?\d{1,3}[-\s]?\d{3,4}[-\s]?\d{2,4}[-\s]?\d{2,4})".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("log/log.log")
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            allowed_user_ids: Vec::new(),
            warning_ttl_secs: default_warning_ttl_secs(),
            phone_warning: default_phone_warning(),
            link_warning: default_link_warning(),
            phone_pattern: default_phone_pattern(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
        }
    }
}

impl ModerationConfig {
    pub fn warning_ttl(&self) -> Duration {
        Duration::from_secs(self.warning_ttl_secs)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config")?;

        if config.telegram.bot_token.trim().is_empty() {
            bail!("telegram.bot_token is empty");
        }

        Ok(config)
    }
}
