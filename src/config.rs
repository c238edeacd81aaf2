use std::{env, fmt::Display, net::Ipv4Addr, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Cloudflare Turnstile credentials. Both halves must be present to enable it.
#[derive(Debug, Clone)]
pub struct TurnstileConfig {
    pub secret: String,
    pub site_key: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: Ipv4Addr,
    pub port: u16,
    /// Mark the session cookie `Secure`. Leave off when serving plain http.
    pub secure_cookies: bool,
    pub turnstile: Option<TurnstileConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://fantasy_xc.db".to_string(),
            host: Ipv4Addr::LOCALHOST,
            port: 3000,
            secure_cookies: false,
            turnstile: None,
        }
    }
}

impl Config {
    /// Reads `.env` (if any) and then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let turnstile = match (var("TURNSTILE_SECRET"), var("TURNSTILE_SITE_KEY")) {
            (Some(secret), Some(site_key)) => Some(TurnstileConfig { secret, site_key }),
            (None, None) => {
                info!("Turnstile not configured, captcha checks disabled");
                None
            }
            _ => {
                warn!("Only one of TURNSTILE_SECRET / TURNSTILE_SITE_KEY is set, captcha checks disabled");
                None
            }
        };

        Ok(Self {
            database_url: var("DATABASE_URL").unwrap_or(defaults.database_url),
            host: try_load("HOST", defaults.host)?,
            port: try_load("PORT", defaults.port)?,
            secure_cookies: try_load("SECURE_COOKIES", defaults.secure_cookies)?,
            turnstile,
        })
    }

    pub fn captcha_site_key(&self) -> Option<&str> {
        self.turnstile.as_ref().map(|t| t.site_key.as_str())
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn try_load<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match var(key) {
        Some(raw) => parse_value(key, &raw),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }
    })
}
