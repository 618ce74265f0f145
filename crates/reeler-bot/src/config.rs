//! Configuration management for reeler-bot

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

use reeler_db::DatabaseConfig;
use reeler_nats::NatsConfig;

/// Complete bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub telegram: TelegramBotConfig,
    pub nats: NatsConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Telegram-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramBotConfig {
    /// Bot token from BotFather
    #[serde(default = "default_bot_token")]
    pub bot_token: String,
    /// Long-polling timeout in seconds
    #[serde(default = "default_polling_timeout")]
    pub polling_timeout: u32,
}

/// Blob storage backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub kind: StorageKind,
    /// Bucket (or directory, for the filesystem backend) objects land in
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Filesystem backend root
    #[serde(default = "default_storage_root")]
    pub root: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Fs,
    Memory,
}

/// Media resolver service client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_resolver_url")]
    pub base_url: String,
    #[serde(default = "default_resolver_timeout")]
    pub timeout_secs: u64,
}

/// Worker pool sizes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_chat_update_workers")]
    pub chat_updates: usize,
    #[serde(default = "default_fetching_workers")]
    pub fetching: usize,
    #[serde(default = "default_uploading_workers")]
    pub uploading: usize,
}

/// Session persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// KV bucket TTL in seconds
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let bot_token =
            std::env::var("TELEGRAM_BOT_TOKEN").context("TELEGRAM_BOT_TOKEN not set")?;

        let nats_url = std::env::var("NATS_URL").unwrap_or_else(|_| "localhost:4222".to_string());
        let prefix = std::env::var("REELER_PREFIX").unwrap_or_else(|_| "prod".to_string());

        let mut database = DatabaseConfig::default();
        if let Ok(dsn) = std::env::var("DATABASE_URL") {
            database.dsn = dsn;
        }

        let mut resolver = ResolverConfig::default();
        if let Ok(base_url) = std::env::var("RESOLVER_URL") {
            resolver.base_url = base_url;
        }

        Ok(Config {
            telegram: TelegramBotConfig {
                bot_token,
                polling_timeout: default_polling_timeout(),
            },
            nats: NatsConfig::from_url(nats_url, prefix),
            database,
            storage: StorageConfig::default(),
            resolver,
            workers: WorkerConfig::default(),
            session: SessionConfig::default(),
        })
    }
}

fn default_bot_token() -> String {
    std::env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default()
}

fn default_polling_timeout() -> u32 {
    10
}

fn default_bucket() -> String {
    "videos".to_string()
}

fn default_storage_root() -> String {
    "/tmp/reeler".to_string()
}

fn default_resolver_url() -> String {
    "http://localhost:8390".to_string()
}

fn default_resolver_timeout() -> u64 {
    30
}

fn default_chat_update_workers() -> usize {
    10
}

fn default_fetching_workers() -> usize {
    10
}

fn default_uploading_workers() -> usize {
    5
}

fn default_session_ttl() -> u64 {
    86400
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::default(),
            bucket: default_bucket(),
            root: default_storage_root(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_url: default_resolver_url(),
            timeout_secs: default_resolver_timeout(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            chat_updates: default_chat_update_workers(),
            fetching: default_fetching_workers(),
            uploading: default_uploading_workers(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl(),
        }
    }
}
