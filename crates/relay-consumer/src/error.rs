//! Error types for the consumer

use relay_common::RelayError;
use thiserror::Error;

/// Result type alias for consumer operations
pub type Result<T> = std::result::Result<T, ConsumerError>;

/// Relational store failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to connect to database at {target}: {source}. Check DATABASE_* settings.")]
    Connect {
        target: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to ensure employee schema: {0}")]
    Schema(#[source] sqlx::Error),

    #[error("Failed to insert employee: {0}")]
    Insert(#[source] sqlx::Error),

    #[error("Database query failed: {0}")]
    Query(#[from] sqlx::Error),
}

#[derive(Error, Debug)]
pub enum ConsumerError {
    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Broker error: {0}")]
    Broker(#[from] lapin::Error),

    /// The broker dropped the connection or channel after startup
    #[error("Broker connection lost: {cause}")]
    BrokerDisrupted { cause: String },

    #[error("Shutdown step '{step}' timed out after {secs}s")]
    StepTimedOut { step: &'static str, secs: u64 },

    /// One or more cleanup steps failed; every step was still attempted
    #[error("Shutdown incomplete, failed steps: {}", failed.join(", "))]
    Shutdown { failed: Vec<&'static str> },
}

impl ConsumerError {
    /// Wrap any error surfaced by the delivery stream as a broker disruption
    pub fn disrupted(cause: impl std::fmt::Display) -> Self {
        Self::BrokerDisrupted {
            cause: cause.to_string(),
        }
    }
}
