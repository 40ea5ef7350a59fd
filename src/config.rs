use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    pub bot_token: Option<String>,
    pub target_chat: Option<i64>,
    pub admin_chat: Option<i64>,

    #[serde(default = "default_max_news_age")]
    pub max_news_age_days: u32,

    #[serde(default = "default_max_news_per_run")]
    pub max_news_per_run: usize,

    #[serde(default = "default_post_interval")]
    pub post_interval_minutes: u32,

    /// Local time of the daily history prune, `HH:MM`.
    #[serde(default = "default_prune_at")]
    pub prune_at: String,

    #[serde(default = "default_primary_language")]
    pub primary_language: String,

    #[serde(default = "default_secondary_language")]
    pub secondary_language: String,

    #[serde(default = "default_translate")]
    pub translate: bool,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("feed-relay");
    data_dir.join("feed-relay.db").to_string_lossy().to_string()
}

fn default_max_news_age() -> u32 {
    30
}

fn default_max_news_per_run() -> usize {
    1
}

fn default_post_interval() -> u32 {
    41
}

fn default_prune_at() -> String {
    "01:00".to_string()
}

fn default_primary_language() -> String {
    "it".to_string()
}

fn default_secondary_language() -> String {
    "en".to_string()
}

fn default_translate() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            bot_token: None,
            target_chat: None,
            admin_chat: None,
            max_news_age_days: default_max_news_age(),
            max_news_per_run: default_max_news_per_run(),
            post_interval_minutes: default_post_interval(),
            prune_at: default_prune_at(),
            primary_language: default_primary_language(),
            secondary_language: default_secondary_language(),
            translate: default_translate(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("feed-relay")
            .join("config.toml")
    }

    /// Environment variables win over the config file.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("BOT_TOKEN") {
            self.bot_token = Some(token);
        }
        if let Some(target) = lookup("BOT_TARGET") {
            self.target_chat = Some(parse_env("BOT_TARGET", &target)?);
        }
        if let Some(admin) = lookup("BOT_ADMIN") {
            self.admin_chat = Some(parse_env("BOT_ADMIN", &admin)?);
        }
        if let Some(age) = lookup("MAX_NEWS_AGE") {
            self.max_news_age_days = parse_env("MAX_NEWS_AGE", &age)?;
        }
        if let Some(count) = lookup("NEWS_COUNT") {
            self.max_news_per_run = parse_env("NEWS_COUNT", &count)?;
        }
        if let Some(interval) = lookup("POST_INTERVAL") {
            self.post_interval_minutes = parse_env("POST_INTERVAL", &interval)?;
        }
        if let Some(path) = lookup("FEED_RELAY_DB") {
            self.db_path = path;
        }
        Ok(())
    }

    /// Startup check. Errors here are fatal; the process refuses to start.
    pub fn validate(&self, dry_run: bool) -> Result<()> {
        if self.post_interval_minutes == 0 {
            return Err(AppError::Config("post interval must be at least one minute".into()));
        }
        self.prune_time()?;

        if dry_run {
            return Ok(());
        }

        let token = self
            .bot_token
            .as_deref()
            .ok_or_else(|| AppError::Config("bot token is empty".into()))?;
        if token.len() < 10 {
            return Err(AppError::Config("bot token is too short".into()));
        }
        if !token.contains(':') {
            return Err(AppError::Config("invalid bot token format".into()));
        }
        if self.target_chat.is_none() {
            return Err(AppError::Config("target chat is not set".into()));
        }
        if self.admin_chat.is_none() {
            tracing::warn!("Admin chat is not set, no commands will be accepted");
        }
        Ok(())
    }

    pub fn prune_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.prune_at, "%H:%M")
            .map_err(|e| AppError::Config(format!("invalid prune_at '{}': {}", self.prune_at, e)))
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{} has an invalid value '{}'", key, value)))
}
