use std::env;

use tracing::info;

use crate::errors::{AppError, Result};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub redis_url: String,
}

impl AppConfig {
    /// Reads the configuration from the process environment. Call after
    /// `dotenvy::dotenv()` so `.env` values are visible.
    pub fn from_env() -> Result<Self> {
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        info!(host = %config.host, port = config.port, "configuration loaded");
        Ok(config)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| AppError::Config("DATABASE_URL is not set".to_string()))?;
        let port = lookup("PORT")
            .ok_or_else(|| AppError::Config("PORT is not set".to_string()))?
            .parse::<u16>()
            .map_err(|e| AppError::Config(format!("PORT is not a valid port: {e}")))?;
        Ok(AppConfig {
            host: lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            database_url,
            redis_url: lookup("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
        })
    }
}
