//! Consumer configuration

use relay_common::config::{env_parse, env_string, load_dotenv, BrokerConfig};
use relay_common::RelayError;
use sqlx::postgres::PgConnectOptions;
use std::str::FromStr;
use std::time::Duration;

use crate::error::Result;

// ============================================================================
// Store Configuration Constants
// ============================================================================

pub const DEFAULT_DATABASE_HOST: &str = "postgres_container";
pub const DEFAULT_DATABASE_PORT: u16 = 5432;
pub const DEFAULT_DATABASE_USER: &str = "postgres";
pub const DEFAULT_DATABASE_PASSWORD: &str = "password";
pub const DEFAULT_DATABASE_NAME: &str = "testdb";

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default bound on each shutdown step, in seconds.
pub const DEFAULT_SHUTDOWN_STEP_TIMEOUT_SECS: u64 = 10;

/// What to do with a message whose insert failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreFailurePolicy {
    /// Acknowledge anyway; the record is lost but the queue keeps moving
    #[default]
    Ack,
    /// Negative-acknowledge with requeue; the broker redelivers it
    Requeue,
}

impl FromStr for StoreFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ack" => Ok(Self::Ack),
            "requeue" | "nack" => Ok(Self::Requeue),
            other => Err(format!("expected 'ack' or 'requeue', got '{other}'")),
        }
    }
}

impl std::fmt::Display for StoreFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ack => write!(f, "ack"),
            Self::Requeue => write!(f, "requeue"),
        }
    }
}

/// Relational store connection settings
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Full connection URL; when set, the discrete fields are ignored
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub connect_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: DEFAULT_DATABASE_HOST.to_string(),
            port: DEFAULT_DATABASE_PORT,
            user: DEFAULT_DATABASE_USER.to_string(),
            password: DEFAULT_DATABASE_PASSWORD.to_string(),
            database: DEFAULT_DATABASE_NAME.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl StoreConfig {
    /// Environment variables:
    /// - `DATABASE_URL` (optional, wins over the rest)
    /// - `DATABASE_HOST`, `DATABASE_PORT`, `DATABASE_USER`, `DATABASE_PASSWORD`,
    ///   `DATABASE_NAME`
    /// - `DATABASE_CONNECT_TIMEOUT`
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|u| !u.trim().is_empty()),
            host: env_string("DATABASE_HOST", DEFAULT_DATABASE_HOST),
            port: env_parse("DATABASE_PORT", DEFAULT_DATABASE_PORT)?,
            user: env_string("DATABASE_USER", DEFAULT_DATABASE_USER),
            password: env_string("DATABASE_PASSWORD", DEFAULT_DATABASE_PASSWORD),
            database: env_string("DATABASE_NAME", DEFAULT_DATABASE_NAME),
            connect_timeout: Duration::from_secs(env_parse(
                "DATABASE_CONNECT_TIMEOUT",
                DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            )?),
        })
    }

    /// sqlx connect options for this configuration
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        match &self.url {
            Some(url) => PgConnectOptions::from_str(url).map_err(|e| {
                RelayError::config(format!("Invalid DATABASE_URL: {e}")).into()
            }),
            None => Ok(PgConnectOptions::new()
                .host(&self.host)
                .port(self.port)
                .username(&self.user)
                .password(&self.password)
                .database(&self.database)),
        }
    }

    /// Connection target for logs, without credentials
    pub fn target(&self) -> String {
        match &self.url {
            Some(url) => relay_common::broker::redact_address(url),
            None => format!("{}:{}/{}", self.host, self.port, self.database),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub broker: BrokerConfig,
    pub store: StoreConfig,
    pub failure_policy: StoreFailurePolicy,

    /// Bound on each of the channel, connection, and store close steps
    pub shutdown_step_timeout: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            store: StoreConfig::default(),
            failure_policy: StoreFailurePolicy::Ack,
            shutdown_step_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_STEP_TIMEOUT_SECS),
        }
    }
}

impl ConsumerConfig {
    /// Load configuration from environment and defaults
    ///
    /// Adds `STORE_FAILURE_POLICY` and `SHUTDOWN_STEP_TIMEOUT_SECS` to the
    /// broker and store variables.
    pub fn from_env() -> Result<Self> {
        load_dotenv();

        let config = Self {
            broker: BrokerConfig::from_env()?,
            store: StoreConfig::from_env()?,
            failure_policy: env_parse("STORE_FAILURE_POLICY", StoreFailurePolicy::Ack)?,
            shutdown_step_timeout: Duration::from_secs(env_parse(
                "SHUTDOWN_STEP_TIMEOUT_SECS",
                DEFAULT_SHUTDOWN_STEP_TIMEOUT_SECS,
            )?),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.broker.validate()?;
        if self.shutdown_step_timeout.is_zero() {
            return Err(RelayError::config("SHUTDOWN_STEP_TIMEOUT_SECS must be greater than 0").into());
        }
        self.store.connect_options()?;
        Ok(())
    }
}
