use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Upper bound of `SESSION_DURATION_DAYS`.
pub const MAX_SESSION_DURATION_DAYS: i64 = 365;

const SECONDS_PER_DAY: i64 = 86_400;

/// The application's configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// The base URL of the restaurant API.
    pub api_base_url: String,
    /// The address the front-end listens on.
    pub bind_addr: SocketAddr,
    /// The URL of the Redis server, when tokens should outlive the process.
    pub redis_url: Option<String>,
    /// The duration of a session in days.
    pub session_duration_days: i64,
    /// The timeout for a single upstream request.
    pub request_timeout: Duration,
    /// Whether cookies must be marked `Secure`.
    pub production: bool,
    /// Origins allowed by CORS.
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let api_base_url = env::var("API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string())
            .trim_end_matches('/')
            .to_string();

        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            anyhow::bail!("API_BASE_URL must start with http:// or https://");
        }

        let session_duration_days = parse_session_days(
            &env::var("SESSION_DURATION_DAYS").unwrap_or_else(|_| "7".to_string()),
        )?;

        Ok(Self {
            api_base_url,
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
                .parse()
                .context("Invalid BIND_ADDR")?,
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            session_duration_days,
            request_timeout: Duration::from_secs(
                env::var("REQUEST_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "15".to_string())
                    .parse()
                    .context("Invalid REQUEST_TIMEOUT_SECS")?,
            ),
            production: env::var("APP_ENV")
                .unwrap_or_else(|_| "development".to_string())
                == "production",
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
        })
    }

    /// A configuration pointing at `api_base_url` with in-memory storage.
    pub fn for_api(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            redis_url: None,
            session_duration_days: 7,
            request_timeout: Duration::from_secs(15),
            production: false,
            allowed_origins: Vec::new(),
        }
    }

    /// Session lifetime in seconds.
    pub fn session_ttl_secs(&self) -> u64 {
        self.session_duration_days
            .clamp(0, MAX_SESSION_DURATION_DAYS)
            .saturating_mul(SECONDS_PER_DAY)
            .unsigned_abs()
    }

    /// Session lifetime.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs())
    }
}

fn parse_session_days(raw: &str) -> Result<i64> {
    let days: i64 = raw
        .trim()
        .parse()
        .context("Invalid SESSION_DURATION_DAYS")?;

    if days <= 0 {
        anyhow::bail!("SESSION_DURATION_DAYS must be positive");
    }
    if days > MAX_SESSION_DURATION_DAYS {
        anyhow::bail!(
            "SESSION_DURATION_DAYS must be at most {}",
            MAX_SESSION_DURATION_DAYS
        );
    }

    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_days_are_bounded() {
        assert_eq!(parse_session_days("7").unwrap(), 7);
        assert_eq!(parse_session_days("365").unwrap(), 365);
        assert!(parse_session_days("0").is_err());
        assert!(parse_session_days("366").is_err());
        assert!(parse_session_days("106751991167300").is_err());
        assert!(parse_session_days("seven").is_err());
    }

    #[test]
    fn ttl_never_overflows() {
        let mut config = Config::for_api("http://localhost:8000");
        assert_eq!(config.session_ttl_secs(), 7 * 86_400);

        config.session_duration_days = i64::MAX;
        assert_eq!(config.session_ttl_secs(), 365 * 86_400);

        config.session_duration_days = -3;
        assert_eq!(config.session_ttl_secs(), 0);
    }
}
