//! Producer configuration

use relay_common::config::{env_parse, env_string, load_dotenv, BrokerConfig};
use relay_common::RelayError;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;

/// Default source file, relative to the working directory.
pub const DEFAULT_SOURCE_FILE: &str = "csv.csv";

/// Default pause between the last publish and closing the connection.
pub const DEFAULT_DRAIN_GRACE_MS: u64 = 1000;

#[derive(Debug, Clone)]
pub struct ProducerConfig {
    pub broker: BrokerConfig,

    /// Delimited file with a header row
    pub source_path: PathBuf,

    /// Wait after the last publish before the channel is closed
    pub drain_grace: Duration,

    /// Wait for a broker ack on every publish
    pub publisher_confirms: bool,
}

impl ProducerConfig {
    /// Load configuration from environment and defaults
    ///
    /// Environment variables, on top of [`BrokerConfig::from_env`]:
    /// - `SOURCE_FILE`
    /// - `PUBLISH_DRAIN_GRACE_MS`
    /// - `PUBLISHER_CONFIRMS`
    pub fn from_env() -> Result<Self> {
        load_dotenv();

        let config = Self {
            broker: BrokerConfig::from_env()?,
            source_path: PathBuf::from(env_string("SOURCE_FILE", DEFAULT_SOURCE_FILE)),
            drain_grace: Duration::from_millis(env_parse(
                "PUBLISH_DRAIN_GRACE_MS",
                DEFAULT_DRAIN_GRACE_MS,
            )?),
            publisher_confirms: env_parse("PUBLISHER_CONFIRMS", false)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.broker.validate()?;
        if self.source_path.as_os_str().is_empty() {
            return Err(RelayError::config("SOURCE_FILE cannot be empty").into());
        }
        Ok(())
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            source_path: PathBuf::from(DEFAULT_SOURCE_FILE),
            drain_grace: Duration::from_millis(DEFAULT_DRAIN_GRACE_MS),
            publisher_confirms: false,
        }
    }
}
