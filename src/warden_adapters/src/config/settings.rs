use std::time::Duration;

use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use secrecy::Secret;
use serde::Deserialize;
use thiserror::Error;
use warden_core::{CacheConfig, CoreConfig, HashingConfig, TokenConfig, VerificationConfig};

pub const CONFIG_FILE: &str = "config/default";
pub const ENV_PREFIX: &str = "WARDEN";
pub const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("Invalid setting `{0}`: {1}")]
    Invalid(&'static str, &'static str),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub postgres: PostgresSettings,
    pub redis: RedisSettings,
    pub token: TokenSettings,
    pub hashing: HashingSettings,
    #[serde(default)]
    pub verification: VerificationSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    pub image_service: ImageServiceSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresSettings {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    pub host_name: String,
    #[serde(default = "default_events_channel")]
    pub events_channel: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenSettings {
    pub issuer: String,
    pub audience: String,
    pub secret: Secret<String>,
    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl_seconds: i64,
    #[serde(default = "default_refresh_token_ttl")]
    pub refresh_token_ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HashingSettings {
    pub pepper: Secret<String>,
    /// Base64 encoded 32-byte key.
    pub encryption_key: Secret<String>,
    #[serde(default = "default_memory_cost")]
    pub memory_cost_kib: u32,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerificationSettings {
    pub code_ttl_seconds: i64,
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            code_ttl_seconds: 15 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub identity_ttl_seconds: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            identity_ttl_seconds: 600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageServiceSettings {
    pub base_url: String,
    #[serde(default = "default_image_timeout")]
    pub timeout_in_millis: u64,
}

impl ImageServiceSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_in_millis)
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_events_channel() -> String {
    "warden.events".to_string()
}

fn default_access_token_ttl() -> i64 {
    TokenConfig::DEFAULT_ACCESS_TOKEN_TTL_SECONDS
}

fn default_refresh_token_ttl() -> i64 {
    TokenConfig::DEFAULT_REFRESH_TOKEN_TTL_DAYS
}

fn default_memory_cost() -> u32 {
    19 * 1024
}

fn default_iterations() -> u32 {
    2
}

fn default_parallelism() -> u32 {
    1
}

fn default_image_timeout() -> u64 {
    10_000
}

impl Settings {
    /// Load `.env`, then `config/default.json` (optional), then `WARDEN__*`
    /// environment variables, later sources winning.
    ///
    /// # Example
    /// `WARDEN__TOKEN__SECRET=…` overrides `token.secret`.
    pub fn load() -> Result<Self, SettingsError> {
        dotenvy::dotenv().ok();

        Self::from_builder(
            Config::builder()
                .add_source(File::with_name(CONFIG_FILE).required(false))
                .add_source(
                    Environment::with_prefix(ENV_PREFIX)
                        .prefix_separator(ENV_SEPARATOR)
                        .separator(ENV_SEPARATOR)
                        .try_parsing(true),
                ),
        )
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.token.access_token_ttl_seconds <= 0 {
            return Err(SettingsError::Invalid(
                "token.access_token_ttl_seconds",
                "must be positive",
            ));
        }
        if self.token.refresh_token_ttl_days <= 0 {
            return Err(SettingsError::Invalid(
                "token.refresh_token_ttl_days",
                "must be positive",
            ));
        }
        if self.verification.code_ttl_seconds <= 0 {
            return Err(SettingsError::Invalid(
                "verification.code_ttl_seconds",
                "must be positive",
            ));
        }
        Ok(())
    }

    /// The immutable configuration handed to services and adapters.
    pub fn core_config(&self) -> CoreConfig {
        CoreConfig {
            token: TokenConfig {
                issuer: self.token.issuer.clone(),
                audience: self.token.audience.clone(),
                secret: self.token.secret.clone(),
                access_token_ttl: chrono::Duration::seconds(self.token.access_token_ttl_seconds),
                refresh_token_ttl: chrono::Duration::days(self.token.refresh_token_ttl_days),
            },
            hashing: HashingConfig {
                pepper: self.hashing.pepper.clone(),
                encryption_key: self.hashing.encryption_key.clone(),
                memory_cost_kib: self.hashing.memory_cost_kib,
                iterations: self.hashing.iterations,
                parallelism: self.hashing.parallelism,
            },
            verification: VerificationConfig {
                code_ttl: chrono::Duration::seconds(self.verification.code_ttl_seconds),
            },
            cache: CacheConfig {
                identity_ttl: Duration::from_secs(self.cache.identity_ttl_seconds),
            },
        }
    }
}
