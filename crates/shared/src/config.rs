use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),
}

/// Runtime configuration, loaded once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub secret_key: String,
    /// Token-signing secret. Falls back to `secret_key` when `JWT_SECRET_KEY`
    /// is not set.
    pub jwt_secret: String,
    pub uploads_dest: String,
    pub stripe_secret_key: String,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret_key = require("SECRET_KEY")?;
        let jwt_secret = env::var("JWT_SECRET_KEY").unwrap_or_else(|_| secret_key.clone());

        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://todo.db".to_string()),
            secret_key,
            jwt_secret,
            uploads_dest: env::var("UPLOADS_DEST").unwrap_or_else(|_| "uploads".to_string()),
            stripe_secret_key: require("STRIPE_SECRET_KEY")?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string()),
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name))
}
