//! Configuration types, built from environment variables.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// HTTP server and storage configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to the libSQL database file.
    pub db_path: String,
    /// Port the HTTP API listens on.
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: "./data/campaigns.db".to_string(),
            http_port: 5000,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            db_path: std::env::var("CAMPAIGN_DB_PATH").unwrap_or(defaults.db_path),
            http_port: env_parse("CAMPAIGN_HTTP_PORT")?.unwrap_or(defaults.http_port),
        })
    }
}

/// Dispatch tuning.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Maximum number of recipients being sent to at once.
    pub max_concurrent_sends: usize,
    /// Upper bound on a single transport call. A timed-out recipient counts as failed.
    pub send_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sends: 8,
            send_timeout: Duration::from_secs(30),
        }
    }
}

impl DispatchConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let max_concurrent_sends = match env_parse::<usize>("CAMPAIGN_MAX_CONCURRENT_SENDS")? {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    key: "CAMPAIGN_MAX_CONCURRENT_SENDS".into(),
                    message: "must be at least 1".into(),
                });
            }
            Some(n) => n,
            None => defaults.max_concurrent_sends,
        };
        Ok(Self {
            max_concurrent_sends,
            send_timeout: env_parse::<u64>("CAMPAIGN_SEND_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.send_timeout),
        })
    }
}

/// SMTP relay configuration.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

impl SmtpConfig {
    /// Returns `None` if `SMTP_HOST` is not set (sends are simulated).
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(host) = std::env::var("SMTP_HOST").ok().filter(|h| !h.is_empty()) else {
            return Ok(None);
        };
        Ok(Some(Self {
            host,
            port: env_parse("SMTP_PORT")?.unwrap_or(587),
            username: std::env::var("SMTP_USERNAME").unwrap_or_default(),
            password: SecretString::from(std::env::var("SMTP_PASSWORD").unwrap_or_default()),
        }))
    }
}

/// Google Sheets access.
#[derive(Debug, Clone, Default)]
pub struct SheetsConfig {
    pub api_key: Option<SecretString>,
}

impl SheetsConfig {
    pub fn from_env() -> Self {
        let api_key = std::env::var("GOOGLE_SHEETS_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .ok()
            .filter(|k| !k.is_empty())
            .map(SecretString::from);
        Self { api_key }
    }
}

/// Read and parse `key`. Unset or blank is `None`; anything unparsable is an error.
fn env_parse<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(None),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("{raw:?}: {e}"),
    })
}
