//! Error types shared by the relay processes

use thiserror::Error;

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Main error type for the relay
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Every connection attempt failed; carries the redacted address and the
    /// last underlying cause.
    #[error("Failed to connect to broker at {address} after {attempts} attempts: {cause}")]
    ConnectExhausted {
        address: String,
        attempts: u32,
        cause: String,
    },

    #[error("Broker error: {0}")]
    Broker(#[from] lapin::Error),

    /// The queue exists with settings incompatible with a durable declare.
    #[error("Queue '{queue}' could not be declared durable: {source}. Check for an existing declaration with different settings.")]
    QueueDeclare {
        queue: String,
        #[source]
        source: lapin::Error,
    },
}

impl RelayError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
