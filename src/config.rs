use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Default config file, read from the working directory when present.
pub const CONFIG_FILE: &str = "config.toml";

/// Prefix for environment overrides, e.g. `AUTH_DATABASE_URL`.
pub const ENV_PREFIX: &str = "AUTH_";

/// What the entry point does when schema synchronization keeps failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPolicy {
    /// Log the failure and keep serving; the users table may be missing.
    #[default]
    Degrade,
    /// Refuse to start.
    Abort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_url: String,
    pub listen_addr: String,
    pub loglevel: String,
    pub on_sync_failure: SyncPolicy,
    pub sync_retries: usize,
    pub body_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://auth.db".to_string(),
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
            on_sync_failure: SyncPolicy::Degrade,
            sync_retries: 3,
            body_limit: 1024 * 1024,
        }
    }
}

impl Config {
    /// Defaults, then `config.toml`, then `AUTH_*` environment variables.
    pub fn load() -> Result<Self, AuthError> {
        Ok(Self::figment(CONFIG_FILE).extract()?)
    }

    pub fn figment(file: &str) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX))
    }
}
