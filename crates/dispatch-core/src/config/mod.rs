use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use chrono_tz::Tz;
use config::Config;
use serde::Deserialize;

use crate::constants::{DEFAULT_API_BASE_URL, DEFAULT_STORE_NAMESPACE, DEFAULT_TIME_ZONE};
use crate::error::CoreResult;
use crate::types::parse_time_zone;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api: ApiConfig,
    pub store: StoreConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub token: Option<String>,
}

impl ApiConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// The bearer token must never end up in logs.
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub namespace: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub timezone: String,
    pub discard_stale_refresh: bool,
}

impl CacheConfig {
    /// ## Summary
    /// Resolves the configured time zone used for `today`/`tomorrow` date keys.
    ///
    /// ## Errors
    /// Returns an error if the configured name is not a known IANA zone.
    pub fn time_zone(&self) -> CoreResult<Tz> {
        parse_time_zone(&self.timezone)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// ## Summary
    /// Loads configuration from defaults, environment variables and an optional
    /// `config.toml` into a `Settings`.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        Self::builder()?
            // Env file
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            // TOML file
            .add_source(config::File::with_name("config.toml").required(false))
            .build()?
            .try_deserialize::<Self>()
            .map_err(Into::into)
    }

    /// ## Summary
    /// Settings made only of the built-in defaults.
    ///
    /// ## Errors
    /// Returns an error if the defaults fail to deserialize.
    pub fn defaults() -> Result<Self> {
        Ok(Self::builder()?.build()?.try_deserialize::<Self>()?)
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(Config::builder()
            .set_default("api.base_url", DEFAULT_API_BASE_URL)?
            .set_default("api.timeout_secs", 15)?
            .set_default("store.path", ".dispatch")?
            .set_default("store.namespace", DEFAULT_STORE_NAMESPACE)?
            .set_default("cache.timezone", DEFAULT_TIME_ZONE)?
            .set_default("cache.discard_stale_refresh", false)?
            .set_default("logging.level", "info")?)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}
