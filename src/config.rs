use anyhow::{anyhow, Result};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: MongoDbConfig,
    pub cors: CorsConfig,
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub wagers: WagerConfig,
    #[serde(default)]
    pub settlement: SettlementConfig,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct MongoDbConfig {
    pub uri: String,
    pub database: String,
    pub connection_timeout_ms: u64,
    pub max_pool_size: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub supports_credentials: bool,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct TelegramConfig {
    pub token: Option<String>,
    pub chat_id: Option<String>,
    pub thread_id: Option<u64>,
}

const REDACTED: &str = "<redacted>";

fn redact_secret(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| REDACTED)
}

/// Connection string with any `user:password@` credentials masked
fn redact_uri(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return uri.to_string();
    };
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{}://{}@{}", scheme, REDACTED, &rest[at + 1..]),
        None => uri.to_string(),
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("api_key", &redact_secret(&self.api_key))
            .finish()
    }
}

impl fmt::Debug for MongoDbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoDbConfig")
            .field("uri", &redact_uri(&self.uri))
            .field("database", &self.database)
            .field("connection_timeout_ms", &self.connection_timeout_ms)
            .field("max_pool_size", &self.max_pool_size)
            .finish()
    }
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &redact_secret(&self.token))
            .field("chat_id", &self.chat_id)
            .field("thread_id", &self.thread_id)
            .finish()
    }
}

/// Wager update protocol and acceptance rules
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WagerConfig {
    /// Attempts for one read-modify-write on a wager before giving up with a conflict
    pub max_update_attempts: u32,
    /// Base delay between attempts; doubles per attempt, plus jitter
    pub retry_backoff_ms: u64,
    /// Let users who were not invited to a wager accept it
    pub open_acceptance: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SettlementConfig {
    /// How often pending settlements are retried
    pub retry_interval_seconds: u64,
}

impl Default for WagerConfig {
    fn default() -> Self {
        Self {
            max_update_attempts: 3,
            retry_backoff_ms: 25,
            open_acceptance: true,
        }
    }
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            retry_interval_seconds: 60,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8081,
                log_level: "info".to_string(),
                api_key: None,
            },
            database: MongoDbConfig {
                uri: "mongodb://localhost:27017".to_string(),
                database: "wager_pools".to_string(),
                connection_timeout_ms: 5000,
                max_pool_size: Some(10),
            },
            cors: CorsConfig {
                allowed_origins: vec!["http://localhost:3000".to_string()],
                allowed_methods: vec![
                    "GET".to_string(),
                    "POST".to_string(),
                    "PATCH".to_string(),
                    "DELETE".to_string(),
                ],
                allowed_headers: vec![
                    "Authorization".to_string(),
                    "X-API-Key".to_string(),
                    "Accept".to_string(),
                    "Content-Type".to_string(),
                ],
                supports_credentials: true,
            },
            telegram: TelegramConfig {
                token: None,
                chat_id: None,
                thread_id: None,
            },
            wagers: WagerConfig::default(),
            settlement: SettlementConfig::default(),
        }
    }
}

impl MongoDbConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.uri.is_empty() {
            return Err(anyhow!("MongoDB URI not configured"));
        }

        if self.database.is_empty() {
            return Err(anyhow!("MongoDB database name not configured"));
        }

        Ok(())
    }
}

impl WagerConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        // Try to load from config directory
        info!("Loading config from file");
        let mut config = match Self::load_from_file(path) {
            Ok(config) => {
                info!("Config loaded from file");
                config
            }
            Err(e) => {
                error!("Failed to load config from file: {}", e);
                // Fall back to environment variables or defaults
                info!("Falling back to environment variables or defaults");
                Self::from_env()
            }
        };
        config.validate()?;
        config.wagers.max_update_attempts = config.wagers.max_update_attempts.max(1);
        Ok(config)
    }

    pub fn load_from_file<P: AsRef<Path>>(
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.settlement.retry_interval_seconds == 0 {
            return Err(anyhow!("settlement.retry_interval_seconds must be positive"));
        }
        Ok(())
    }

    pub fn from_env() -> Self {
        let mut config = Config::default();

        // Override with environment variables if present
        if let Ok(host) = std::env::var("SERVER_HOST") {
            config.server.host = host;
        }

        if let Ok(port) = std::env::var("SERVER_PORT") {
            if let Ok(port_num) = port.parse::<u16>() {
                config.server.port = port_num;
            }
        }

        if let Ok(log_level) = std::env::var("RUST_LOG") {
            config.server.log_level = log_level;
        }

        if let Ok(uri) = std::env::var("MONGODB_URI") {
            config.database.uri = uri;
        }

        if let Ok(db_name) = std::env::var("MONGODB_DATABASE") {
            config.database.database = db_name;
        }

        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            config.cors.allowed_origins =
                origins.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Telegram configuration
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            config.telegram.token = Some(token);
        }

        if let Ok(chat_id) = std::env::var("TELEGRAM_CHAT_ID") {
            config.telegram.chat_id = Some(chat_id);
        }

        if let Ok(api_key) = std::env::var("API_KEY") {
            config.server.api_key = Some(api_key);
        }

        // Wager update protocol
        if let Ok(attempts) = std::env::var("WAGER_MAX_UPDATE_ATTEMPTS") {
            if let Ok(attempts) = attempts.parse::<u32>() {
                config.wagers.max_update_attempts = attempts;
            }
        }

        if let Ok(backoff) = std::env::var("WAGER_RETRY_BACKOFF_MS") {
            if let Ok(backoff) = backoff.parse::<u64>() {
                config.wagers.retry_backoff_ms = backoff;
            }
        }

        if let Ok(open) = std::env::var("WAGER_OPEN_ACCEPTANCE") {
            if let Ok(open) = open.parse::<bool>() {
                config.wagers.open_acceptance = open;
            }
        }

        if let Ok(interval) = std::env::var("SETTLEMENT_RETRY_INTERVAL_SECONDS") {
            if let Ok(interval) = interval.parse::<u64>() {
                config.settlement.retry_interval_seconds = interval;
            }
        }

        config
    }
}
