use serde::Deserialize;
use thiserror::Error;

/// Startup-time configuration failure. Never produced per-request.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid value for environment variable {0}")]
    InvalidVar(&'static str),
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;
        let ttl_minutes = match std::env::var("JWT_TTL_MINUTES") {
            Ok(v) => v
                .parse::<i64>()
                .map_err(|_| ConfigError::InvalidVar("JWT_TTL_MINUTES"))?,
            Err(_) => 60,
        };
        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "opsdesk".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "opsdesk-users".into()),
            ttl_minutes,
        };
        Ok(Self { database_url, jwt })
    }
}
