//! Broker configuration and environment helpers
//!
//! Producer and consumer read their broker settings from the same variables so
//! both sides of the queue agree on the address, queue name, and retry
//! discipline.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{RelayError, Result};

// ============================================================================
// Broker Configuration Constants
// ============================================================================

/// Default broker address for the local container deployment.
pub const DEFAULT_BROKER_URL: &str = "amqp://rabbitmq_container:5672/%2f";

/// Default durable queue shared by producer and consumer.
pub const DEFAULT_QUEUE_NAME: &str = "employee_queue";

/// Default number of connection attempts before giving up.
pub const DEFAULT_CONNECT_MAX_ATTEMPTS: u32 = 5;

/// Default fixed delay between connection attempts, in seconds.
pub const DEFAULT_CONNECT_RETRY_DELAY_SECS: u64 = 5;

/// Bounded, fixed-interval retry schedule for broker connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Wait between a failed attempt and the next one
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_CONNECT_MAX_ATTEMPTS,
            delay: Duration::from_secs(DEFAULT_CONNECT_RETRY_DELAY_SECS),
        }
    }
}

/// Broker connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// AMQP URI, may carry credentials
    pub url: String,

    /// Durable queue name
    pub queue: String,

    pub retry: RetryPolicy,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BROKER_URL.to_string(),
            queue: DEFAULT_QUEUE_NAME.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl BrokerConfig {
    /// Load broker configuration from the environment and defaults
    ///
    /// Environment variables:
    /// - `RABBITMQ_URL`
    /// - `QUEUE_NAME`
    /// - `CONNECT_MAX_ATTEMPTS`
    /// - `CONNECT_RETRY_DELAY_SECS`
    pub fn from_env() -> Result<Self> {
        load_dotenv();

        let config = Self {
            url: env_string("RABBITMQ_URL", DEFAULT_BROKER_URL),
            queue: env_string("QUEUE_NAME", DEFAULT_QUEUE_NAME),
            retry: RetryPolicy {
                max_attempts: env_parse("CONNECT_MAX_ATTEMPTS", DEFAULT_CONNECT_MAX_ATTEMPTS)?,
                delay: Duration::from_secs(env_parse(
                    "CONNECT_RETRY_DELAY_SECS",
                    DEFAULT_CONNECT_RETRY_DELAY_SECS,
                )?),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(RelayError::config("Broker URL cannot be empty"));
        }
        if self.queue.trim().is_empty() {
            return Err(RelayError::config("Queue name cannot be empty"));
        }
        if self.retry.max_attempts == 0 {
            return Err(RelayError::config(
                "CONNECT_MAX_ATTEMPTS must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Load a `.env` file from the working directory if one exists.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Read a string variable, falling back to `default` when unset or blank.
pub fn env_string(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Read and parse a variable, falling back to `default` when unset.
///
/// A value that is present but does not parse is a configuration error.
pub fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|e: T::Err| {
            RelayError::config(format!("Invalid value '{raw}' for {key}: {e}"))
        }),
        _ => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_broker_env() {
        for key in [
            "RABBITMQ_URL",
            "QUEUE_NAME",
            "CONNECT_MAX_ATTEMPTS",
            "CONNECT_RETRY_DELAY_SECS",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_match_local_deployment() {
        clear_broker_env();
        let config = BrokerConfig::from_env().unwrap();
        assert_eq!(config.url, DEFAULT_BROKER_URL);
        assert_eq!(config.queue, "employee_queue");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.delay, Duration::from_secs(5));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_broker_env();
        std::env::set_var("QUEUE_NAME", "staff");
        std::env::set_var("CONNECT_MAX_ATTEMPTS", "2");
        std::env::set_var("CONNECT_RETRY_DELAY_SECS", "1");

        let config = BrokerConfig::from_env().unwrap();
        clear_broker_env();

        assert_eq!(config.queue, "staff");
        assert_eq!(config.retry, RetryPolicy::new(2, Duration::from_secs(1)));
    }

    #[test]
    #[serial]
    fn test_unparsable_value_is_config_error() {
        clear_broker_env();
        std::env::set_var("CONNECT_MAX_ATTEMPTS", "many");
        let err = BrokerConfig::from_env().unwrap_err();
        clear_broker_env();

        assert!(matches!(err, RelayError::Config(_)));
        assert!(err.to_string().contains("CONNECT_MAX_ATTEMPTS"));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = BrokerConfig {
            retry: RetryPolicy::new(0, Duration::from_secs(1)),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
