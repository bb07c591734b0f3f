//! Configuration management for the check-in bot

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// How inbound updates reach the bot
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    Polling,
    Webhook,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub token: String,
    pub api_url: String,
    pub mode: UpdateMode,
    pub poll_timeout_seconds: u64,
    pub webhook_url: String,
    pub webhook_secret: String,
}

/// Access control and subscription gating
#[derive(Debug, Deserialize, Clone)]
pub struct AccessConfig {
    /// Bootstrap super-administrators, always resolved as `superadmin`
    pub superadmins: Vec<i64>,
    /// Channel a visitor must join before registering
    pub channel_id: i64,
    /// Public handle of that channel, used for the subscribe link
    pub channel_username: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VenueConfig {
    pub name: String,
    pub default_source: String,
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BroadcastConfig {
    pub delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub enabled: bool,
    pub url: String,
    pub dialogue_ttl_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub venue: VenueConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // CHECKIN__DATABASE__URL style variables
            .add_source(
                Environment::with_prefix("CHECKIN")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("telegram.token", env::var("BOT_TOKEN").ok())?
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .set_override_option("redis.url", env::var("REDIS_URL").ok())?
            .set_override_option("access.channel_username", env::var("CHANNEL_USERNAME").ok())?
            .build()?;

        let mut app: AppConfig = config.try_deserialize()?;

        if let Ok(raw) = env::var("CHANNEL_ID") {
            app.access.channel_id = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Message(format!("CHANNEL_ID is not an integer: {}", raw)))?;
        }
        if let Ok(raw) = env::var("ADMIN_IDS") {
            app.access.superadmins = parse_id_list(&raw)?;
        }

        Ok(app)
    }
}

impl AccessConfig {
    pub fn is_bootstrap_superadmin(&self, telegram_id: i64) -> bool {
        self.superadmins.contains(&telegram_id)
    }
}

/// Parse a comma-separated list of chat identities, ignoring blank entries
pub fn parse_id_list(raw: &str) -> Result<Vec<i64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| ConfigError::Message(format!("Invalid identity in ADMIN_IDS: {}", s)))
        })
        .collect()
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            superadmins: Vec::new(),
            channel_id: 0,
            channel_username: String::new(),
        }
    }
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            name: "Venue".to_string(),
            default_source: "Main entrance".to_string(),
            utc_offset_minutes: 0,
        }
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self { delay_ms: 50 }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "redis://127.0.0.1:6379".to_string(),
            dialogue_ttl_seconds: 86400,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
