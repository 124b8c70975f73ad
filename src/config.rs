use std::env;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub port: u16,
    pub jwt_secret: String,
    pub environment: String,
    pub frontend_urls: Vec<String>,
    pub sms_gateway_url: Option<String>,
    pub policy: EnginePolicy,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Invalid engine policy: {0}")]
    Policy(#[from] config::ConfigError),
}

/// Business settings handed explicitly to the components that need them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnginePolicy {
    /// Whether a supervisor override may reverse an APPROVED task.
    pub allow_override_of_approved: bool,
    /// Margins below this percentage are flagged as low.
    pub low_margin_threshold: Decimal,
    /// Deadline, in hours after assignment, when a task names none.
    pub default_task_hours: i64,
    /// Refresh cadence suggested to polling clients.
    pub poll_interval_secs: u64,
    /// Offset of the branch's local time from UTC, used to decide "today".
    pub utc_offset_minutes: i32,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            allow_override_of_approved: true,
            low_margin_threshold: dec!(5),
            default_task_hours: 24,
            poll_interval_secs: 15,
            utc_offset_minutes: 0,
        }
    }
}

impl EnginePolicy {
    /// Reads `ENGINE_*` variables over the defaults, e.g.
    /// `ENGINE_ALLOW_OVERRIDE_OF_APPROVED=false`.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let defaults = EnginePolicy::default();
        config::Config::builder()
            .set_default("allow_override_of_approved", defaults.allow_override_of_approved)?
            .set_default("low_margin_threshold", defaults.low_margin_threshold.to_string())?
            .set_default("default_task_hours", defaults.default_task_hours)?
            .set_default("poll_interval_secs", defaults.poll_interval_secs)?
            .set_default("utc_offset_minutes", i64::from(defaults.utc_offset_minutes))?
            .add_source(config::Environment::with_prefix("ENGINE").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        match FixedOffset::east_opt(self.utc_offset_minutes * 60) {
            Some(offset) => at.with_timezone(&offset).date_naive(),
            None => at.date_naive(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        // The in-memory store needs no database.
        let database_url = match env::var("DATABASE_URL") {
            Ok(url) => Some(url),
            Err(_) if environment == "memory" => None,
            Err(_) => return Err(ConfigError::MissingVariable("DATABASE_URL".to_string())),
        };

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| ConfigError::MissingVariable("JWT_SECRET".to_string()))?;

        let port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidFormat("SERVER_PORT must be a valid port number".to_string()))?;

        let frontend_urls = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3001".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let sms_gateway_url = env::var("SMS_GATEWAY_URL").ok().filter(|url| !url.trim().is_empty());

        Ok(AppConfig {
            database_url,
            jwt_secret,
            environment,
            port,
            frontend_urls,
            sms_gateway_url,
            policy: EnginePolicy::from_env()?,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development" || self.environment == "memory"
    }
}
