//! Application settings loaded from `config.toml` and the environment.
//!
//! Every section is optional in the file. Environment variables (usually from
//! `.env`) override file values. `JWT_SECRET` has no default: a missing token
//! secret is a configuration error.

use crate::config::database::DEFAULT_DATABASE_URL;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Complete application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Token settings
    pub auth: AuthConfig,
    /// Payment event and settlement settings
    pub payments: PaymentsConfig,
    /// Storage settings
    pub database: DatabaseConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `0.0.0.0:5000`
    pub bind_addr: String,
    /// Origins allowed by CORS; empty allows none
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            allowed_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

/// Token settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret used to sign bearer tokens
    pub jwt_secret: String,
    /// Token lifetime in hours
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_hours: 24,
        }
    }
}

/// Payment event and settlement settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    /// Shared secret expected in the `X-Webhook-Secret` header; webhook disabled when unset
    pub webhook_secret: Option<String>,
    /// Pending donations older than this are marked failed
    pub timeout_secs: u64,
    /// How often the timeout sweeper runs
    pub sweep_interval_secs: u64,
    /// Development only: confirm every new donation after this many milliseconds
    pub simulate_confirmation_after_ms: Option<u64>,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            webhook_secret: None,
            timeout_secs: 15 * 60,
            sweep_interval_secs: 60,
            simulate_confirmation_after_ms: None,
        }
    }
}

/// Storage settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SeaORM` connection URL (`sqlite://…` or `postgres://…`)
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

impl AppConfig {
    /// Parses configuration from TOML text without consulting the environment.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(Into::into)
    }

    /// Applies environment overrides through `lookup`.
    ///
    /// `lookup` is `std::env::var` in production; tests pass a closure over a map.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Some(origins) = lookup("ALLOWED_ORIGINS") {
            self.server.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(ttl) = lookup("TOKEN_TTL_HOURS") {
            self.auth.token_ttl_hours = parse_number("TOKEN_TTL_HOURS", &ttl)?;
        }
        if let Some(secret) = lookup("PAYMENT_WEBHOOK_SECRET") {
            self.payments.webhook_secret = Some(secret);
        }
        if let Some(secs) = lookup("PAYMENT_TIMEOUT_SECS") {
            self.payments.timeout_secs = parse_number("PAYMENT_TIMEOUT_SECS", &secs)?;
        }
        if let Some(ms) = lookup("PAYMENT_SIMULATE_AFTER_MS") {
            self.payments.simulate_confirmation_after_ms =
                Some(parse_number("PAYMENT_SIMULATE_AFTER_MS", &ms)?);
        }
        Ok(())
    }

    /// Checks values that have no usable default.
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(Error::Config {
                message: "JWT_SECRET must be set".to_string(),
            });
        }
        if self.auth.token_ttl_hours <= 0 {
            return Err(Error::Config {
                message: "token_ttl_hours must be positive".to_string(),
            });
        }
        if self.payments.timeout_secs == 0 {
            return Err(Error::Config {
                message: "payments.timeout_secs must be positive".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| Error::Config {
        message: format!("{key} must be a number, got {value:?}"),
    })
}

/// Loads configuration from `path` (if it exists) and the process environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    let mut config = if path.exists() {
        debug!("Loading configuration from {:?}", path);
        let contents = std::fs::read_to_string(path)?;
        AppConfig::from_toml_str(&contents)?
    } else {
        info!("No config file at {:?}, using defaults", path);
        AppConfig::default()
    };

    config.apply_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from the default location (./config.toml)
pub fn load_default_config() -> Result<AppConfig> {
    load_config("config.toml")
}
