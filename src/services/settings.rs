use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::models::types::FeedName;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub base_url: String,
    pub feeds: BTreeMap<FeedName, FeedConfig>,
    #[serde(default)]
    pub reddit: RedditConfig,
    pub store: Option<StoreConfig>,
    pub schedule: Option<ScheduleConfig>,
    pub server: Option<ServerConfig>,
    pub render: Option<RenderConfig>,
    pub log: Option<LogConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FeedConfig {
    pub title: String,
    pub reddits: Vec<String>,
    #[serde(default)]
    pub num_items: usize,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RedditConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    pub auth_url: Option<String>,           // https://www.reddit.com/api/v1/access_token
    pub api_base_url: Option<String>,       // https://oauth.reddit.com
    pub comments_base_url: Option<String>,  // https://old.reddit.com
    pub user_agent: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    pub enabled: Option<bool>,
    pub cron: Option<String>,      // sec min hour day month weekday
    pub timezone: Option<String>,  // IANA name, e.g. America/Los_Angeles
    pub max_retry_attempts: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub enabled: Option<bool>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub static_dir: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    pub title_max_chars: Option<usize>,
    pub excerpt_max_chars: Option<usize>,
    pub ellipsis: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    pub dir: Option<String>,
    pub file_prefix: Option<String>,
}

pub const DEFAULT_STORE_DIR: &str = "./shine";
pub const DEFAULT_CRON: &str = "0 0 8 * * *";
pub const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";
pub const DEFAULT_PORT: u16 = 8080;

impl FeedConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.num_items == 0 {
            anyhow::bail!("feed config {:?}: num_items is not set", self.title);
        }
        if self.reddits.is_empty() {
            anyhow::bail!("feed config {:?}: reddits list is empty", self.title);
        }
        Ok(())
    }
}

impl AppConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        for feed in self.feeds.values() {
            feed.validate()?;
        }
        Ok(())
    }

    /// Переопределения из окружения (`.env` загружается в main)
    pub fn apply_env(mut self) -> Self {
        if let Ok(v) = std::env::var("REDDIT_CLIENT_ID") {
            if !v.is_empty() {
                self.reddit.client_id = v;
            }
        }
        if let Ok(v) = std::env::var("REDDIT_CLIENT_SECRET") {
            if !v.is_empty() {
                self.reddit.client_secret = v;
            }
        }
        if let Ok(v) = std::env::var("DB_PATH") {
            if !v.is_empty() {
                self.store = Some(StoreConfig { dir: v });
            }
        }
        self
    }

    pub fn store_dir(&self) -> &str {
        self.store.as_ref().map(|s| s.dir.as_str()).unwrap_or(DEFAULT_STORE_DIR)
    }

    pub fn feed(&self, name: &str) -> Option<&FeedConfig> {
        self.feeds.get(&FeedName::from(name))
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig, Box<dyn std::error::Error + Send + Sync>> {
    let content = fs::read_to_string(path)?;
    let cfg: AppConfig = serde_yaml::from_str(&content)?;
    let cfg = cfg.apply_env();
    cfg.validate()?;
    Ok(cfg)
}
