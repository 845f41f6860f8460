// src/config.rs

use std::env;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: String,
    pub upload_dir: String,
    pub public_base_url: String,
    /// Base URL of the auto-correction service. Auto-correction is off when unset.
    pub corrector_url: Option<String>,
    pub corrector_timeout: Duration,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    /// Reads the configuration from the process environment. Call
    /// `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiration: parsed("JWT_EXPIRATION", 86_400)?,
            rust_log: optional("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            upload_dir: optional("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string()),
            public_base_url: optional("PUBLIC_BASE_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            corrector_url: optional("CORRECTOR_URL"),
            corrector_timeout: Duration::from_secs(parsed("CORRECTOR_TIMEOUT_SECS", 60)?),
            admin_email: optional("ADMIN_EMAIL"),
            admin_password: optional("ADMIN_PASSWORD"),
        })
    }
}

fn optional(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn parsed(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match optional(name) {
        None => Ok(default),
        Some(value) => {
            let parsed = value.trim().parse::<u64>();
            parsed.map_err(|_| ConfigError::Invalid { name, value })
        }
    }
}
