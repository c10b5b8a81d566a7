//! Configuration for Promitto
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;

use crate::auth::{JwtValidator, DEFAULT_EXPIRY_SECONDS};
use crate::clock::SystemClock;
use crate::types::PromittoError;

/// Shortest accepted JWT secret
const MIN_SECRET_LEN: usize = 32;

/// Largest UTC offset a day boundary may use, in minutes
const MAX_OFFSET_MINUTES: i32 = 14 * 60;

/// Promitto - connection level service
#[derive(Parser, Debug, Clone)]
#[command(name = "promitto")]
#[command(about = "Connection level and daily ritual service for connected pairs")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// Enable development mode (dev JWT secret, in-memory fallback store)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "promitto")]
    pub mongodb_db: String,

    /// JWT secret for token verification (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value_t = DEFAULT_EXPIRY_SECONDS)]
    pub jwt_expiry_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// Fixed UTC offset (minutes east) for day boundaries; server local time if unset
    #[arg(long, env = "DAY_UTC_OFFSET_MINUTES", allow_hyphen_values = true)]
    pub day_utc_offset_minutes: Option<i32>,

    /// Attempts after a concurrent-update conflict before giving up
    #[arg(long, env = "SAVE_RETRIES", default_value = "3")]
    pub save_retries: u32,

    /// Allowed CORS origin
    #[arg(long, env = "FRONTEND_URL", default_value = "*")]
    pub frontend_url: String,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        match self.secret() {
            None if !self.dev_mode => {
                return Err("JWT_SECRET is required in production mode".to_string())
            }
            Some(secret) if secret.len() < MIN_SECRET_LEN => {
                return Err(format!(
                    "JWT_SECRET must be at least {} characters",
                    MIN_SECRET_LEN
                ))
            }
            _ => {}
        }

        if let Some(minutes) = self.day_utc_offset_minutes {
            if minutes.abs() > MAX_OFFSET_MINUTES {
                return Err(format!(
                    "DAY_UTC_OFFSET_MINUTES must be within +/-{} minutes",
                    MAX_OFFSET_MINUTES
                ));
            }
        }

        Ok(())
    }

    /// Clock deciding where one day ends and the next begins
    pub fn day_clock(&self) -> SystemClock {
        self.day_utc_offset_minutes
            .and_then(SystemClock::with_offset_minutes)
            .unwrap_or_else(SystemClock::local)
    }

    /// Token validator for the configured secret (dev secret in dev mode without one)
    pub fn jwt_validator(&self) -> Result<JwtValidator, PromittoError> {
        match (self.secret(), self.dev_mode) {
            (Some(secret), _) => JwtValidator::new(secret.to_string(), self.jwt_expiry_seconds),
            (None, true) => Ok(JwtValidator::new_dev()),
            (None, false) => Err(PromittoError::Config(
                "JWT_SECRET is required in production mode".into(),
            )),
        }
    }

    /// Configured secret; an empty value counts as unset
    fn secret(&self) -> Option<&str> {
        self.jwt_secret.as_deref().filter(|s| !s.is_empty())
    }

    pub fn mode(&self) -> &'static str {
        if self.dev_mode {
            "development"
        } else {
            "production"
        }
    }
}
