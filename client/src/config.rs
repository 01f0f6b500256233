//! Client configuration.
//!
//! Environment variables can be set directly or loaded from a .env file in
//! the project root.
//!
//! Required:
//! - CAMPUZBUZZ_STORE_URL: base url of the hosted store project
//! - CAMPUZBUZZ_ANON_KEY: the project's public anon key
//!
//! Optional:
//! - CAMPUZBUZZ_RETRY_ATTEMPTS: automatic retries per query (default 3)
//! - CAMPUZBUZZ_RETRY_DELAY_MS: constant delay between attempts (default 1000)
//! - CAMPUZBUZZ_ATTEMPT_TIMEOUT_MS: per-attempt timeout, 0 disables
//!   (default 15000)
//! - CAMPUZBUZZ_FEED_PAGE_SIZE: posts loaded by the feed (default 20)

use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

pub const DEFAULT_FEED_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Retries after the first attempt; the producer runs at most
    /// `retry_attempts + 1` times per sequence.
    pub retry_attempts: u32,
    /// Constant delay between attempts.
    pub retry_delay: Duration,
    /// Applied to each attempt separately. `None` waits indefinitely.
    pub attempt_timeout: Option<Duration>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            retry_delay: Duration::from_millis(1000),
            attempt_timeout: Some(Duration::from_secs(15)),
        }
    }
}

impl QueryOptions {
    /// No retries, no delay, no timeout.
    pub fn once() -> Self {
        Self {
            retry_attempts: 0,
            retry_delay: Duration::ZERO,
            attempt_timeout: None,
        }
    }

    pub fn retry_attempts(mut self, retry_attempts: u32) -> Self {
        self.retry_attempts = retry_attempts;
        self
    }

    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn attempt_timeout(mut self, attempt_timeout: Option<Duration>) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },
}

pub struct ClientConfig {
    pub store_url: String,
    pub anon_key: SecretString,
    pub query: QueryOptions,
    pub feed_page_size: usize,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Silently ignored if the file doesn't exist
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any name → value source. The browser build passes values
    /// captured at compile time.
    pub fn from_lookup(
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let defaults = QueryOptions::default();
        let retry_attempts = parse_or(
            &lookup,
            "CAMPUZBUZZ_RETRY_ATTEMPTS",
            defaults.retry_attempts,
        )?;
        let retry_delay_ms = parse_or(
            &lookup,
            "CAMPUZBUZZ_RETRY_DELAY_MS",
            defaults.retry_delay.as_millis() as u64,
        )?;
        let timeout_ms = parse_or(
            &lookup,
            "CAMPUZBUZZ_ATTEMPT_TIMEOUT_MS",
            defaults
                .attempt_timeout
                .map(|t| t.as_millis() as u64)
                .unwrap_or(0),
        )?;

        Ok(ClientConfig {
            store_url: required("CAMPUZBUZZ_STORE_URL")?
                .trim_end_matches('/')
                .to_string(),
            anon_key: SecretString::from(required("CAMPUZBUZZ_ANON_KEY")?),
            query: QueryOptions {
                retry_attempts,
                retry_delay: Duration::from_millis(retry_delay_ms),
                attempt_timeout: (timeout_ms > 0)
                    .then(|| Duration::from_millis(timeout_ms)),
            },
            feed_page_size: parse_or(
                &lookup,
                "CAMPUZBUZZ_FEED_PAGE_SIZE",
                DEFAULT_FEED_PAGE_SIZE,
            )?,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&'static str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
