use std::{env, fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr};

use log::{info, warn};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable `{key}` is required but not set")]
    Missing { key: String },

    #[error("Environment variable `{key}` is invalid: {reason}")]
    Invalid { key: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub max_connections: u32,
    pub jwt_secret: String,
    pub token_lifetime_hours: i64,
    pub media_root: PathBuf,
    pub media_url: String,
    pub body_limit: u64,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut media_url: String = try_load(&lookup, "FOODGRAM_MEDIA_URL", "/media/")?;
        if !media_url.ends_with('/') {
            media_url.push('/');
        }

        Ok(Self {
            bind_address: try_load(&lookup, "FOODGRAM_BIND", "0.0.0.0:8000")?,
            database_url: require(&lookup, "DATABASE_URL")?,
            max_connections: try_load(&lookup, "FOODGRAM_DB_MAX_CONNECTIONS", "5")?,
            jwt_secret: require(&lookup, "FOODGRAM_JWT_SECRET")?,
            token_lifetime_hours: try_load(&lookup, "FOODGRAM_TOKEN_LIFETIME_HOURS", "24")?,
            media_root: try_load(&lookup, "FOODGRAM_MEDIA_ROOT", "media")?,
            media_url,
            body_limit: try_load(&lookup, "FOODGRAM_BODY_LIMIT", "10485760")?,
        })
    }
}

fn require<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::Missing {
            key: key.to_string(),
        })
}

fn try_load<F, T>(lookup: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    lookup(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key: key.to_string(),
                reason: e.to_string(),
            }
        })
}
