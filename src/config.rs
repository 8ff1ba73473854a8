use std::{env, path::PathBuf, time::Duration};

use crate::{constants, model};

/// Runtime settings for the scraper. Built from defaults, then the
/// environment (a `.env` file is loaded by `main`), then CLI flags.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,       // Whole request, connect through body.
    pub chain_timeout: Duration, // Same, for option-chain requests.
    pub cache_dir: PathBuf,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: constants::BASE_URL.to_string(),
            user_agent: constants::USER_AGENT.to_string(),
            timeout: Duration::from_secs(constants::HTTP_TIMEOUT_SECS),
            chain_timeout: Duration::from_secs(constants::CHAIN_TIMEOUT_SECS),
            cache_dir: PathBuf::from(constants::CACHE_DIR),
        }
    }
}

impl ScraperConfig {
    /// Applies `NASDAQ_BASE_URL`, `NASDAQ_USER_AGENT`, `HTTP_TIMEOUT_SECS`,
    /// `CHAIN_TIMEOUT_SECS` and `OPTIONS_CACHE_DIR` on top of the defaults.
    pub fn from_env() -> model::Result<Self> {
        let mut config = Self::default();
        if let Ok(base_url) = env::var("NASDAQ_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(user_agent) = env::var("NASDAQ_USER_AGENT") {
            config.user_agent = user_agent;
        }
        if let Some(timeout) = timeout_from_env("HTTP_TIMEOUT_SECS")? {
            config.timeout = timeout;
        }
        if let Some(timeout) = timeout_from_env("CHAIN_TIMEOUT_SECS")? {
            config.chain_timeout = timeout;
        }
        if let Ok(cache_dir) = env::var("OPTIONS_CACHE_DIR") {
            config.cache_dir = PathBuf::from(cache_dir);
        }
        Ok(config.with_trailing_slash())
    }

    /// Endpoint paths are joined onto the base URL, which therefore must end in '/'.
    pub fn with_trailing_slash(mut self) -> Self {
        if !self.base_url.ends_with('/') {
            self.base_url.push('/');
        }
        self
    }
}

fn timeout_from_env(name: &str) -> model::Result<Option<Duration>> {
    let Ok(raw) = env::var(name) else {
        return Ok(None);
    };
    parse_timeout(name, &raw).map(Some)
}

fn parse_timeout(name: &str, raw: &str) -> model::Result<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(model::ScrapeError::ConfigError(format!(
            "{} must be a positive whole number of seconds, got '{}'",
            name, raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_nasdaq() {
        let config = ScraperConfig::default();
        assert_eq!(config.base_url, "https://api.nasdaq.com/api/quote/");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.chain_timeout, Duration::from_secs(20));
        assert_eq!(config.cache_dir, PathBuf::from("cache"));
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let config = ScraperConfig {
            base_url: "http://127.0.0.1:8080/api/quote".into(),
            ..ScraperConfig::default()
        }
        .with_trailing_slash();
        assert_eq!(config.base_url, "http://127.0.0.1:8080/api/quote/");
    }

    #[test]
    fn timeouts_must_be_positive_seconds() {
        assert_eq!(
            parse_timeout("CHAIN_TIMEOUT_SECS", " 30 ").unwrap(),
            Duration::from_secs(30)
        );
        assert!(parse_timeout("CHAIN_TIMEOUT_SECS", "0").is_err());
        assert!(matches!(
            parse_timeout("HTTP_TIMEOUT_SECS", "ten"),
            Err(model::ScrapeError::ConfigError(_))
        ));
    }
}
