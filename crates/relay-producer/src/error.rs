//! Error types for the producer

use relay_common::RelayError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for producer operations
pub type Result<T> = std::result::Result<T, ProducerError>;

#[derive(Error, Debug)]
pub enum ProducerError {
    /// Source file is missing or cannot be read at all
    #[error("Cannot read source file '{}': {source}. Verify the path exists and is readable.", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A single row could not be parsed; the rest of the file is still usable
    #[error("Malformed row at line {line}: {source}")]
    MalformedRow {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Broker error: {0}")]
    Broker(#[from] lapin::Error),

    /// Publisher confirms are on and the broker refused a message
    #[error("Broker rejected message for row {line} on queue '{queue}'")]
    PublishNacked { queue: String, line: u64 },

    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl ProducerError {
    /// Errors confined to one row: logged and skipped, never fatal
    pub fn is_row_local(&self) -> bool {
        matches!(self, Self::MalformedRow { .. })
    }
}
