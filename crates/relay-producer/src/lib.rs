//! Queue Relay Producer
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Reads employee rows from a delimited file and publishes each valid row as a
//! persistent JSON message on the durable queue.
//!
//! # Example
//!
//! ```no_run
//! use relay_producer::{config::ProducerConfig, run};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ProducerConfig::from_env()?;
//!     let summary = run(&config).await?;
//!     println!("published {}", summary.published);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod publisher;
pub mod source;

pub use error::{ProducerError, Result};
pub use pipeline::{publish_rows, PublishSummary};

use relay_common::broker::BrokerSession;
use tracing::info;

use crate::config::ProducerConfig;
use crate::publisher::QueuePublisher;
use crate::source::CsvSource;

/// Run one producer pass: open the source, connect, publish, drain, close.
///
/// The source is opened before the broker is contacted so a missing file fails
/// fast without spending the connection retry budget.
pub async fn run(config: &ProducerConfig) -> Result<PublishSummary> {
    let source = CsvSource::open(&config.source_path)?;
    info!(
        path = %source.path().display(),
        columns = ?source.headers(),
        "Reading source file"
    );

    let session = BrokerSession::open(&config.broker).await?;
    let outcome = publish_source(&session, source, config).await;

    let closed = session.close().await;
    let summary = outcome?;
    closed?;
    Ok(summary)
}

/// Everything between connect and close. The session is closed by the caller
/// whatever this returns.
async fn publish_source(
    session: &BrokerSession,
    source: CsvSource,
    config: &ProducerConfig,
) -> Result<PublishSummary> {
    session.declare_queue(&config.broker.queue).await?;

    let mut publisher = QueuePublisher::new(
        session.channel().clone(),
        config.broker.queue.clone(),
        config.publisher_confirms,
    )
    .await?;

    let summary = publish_rows(source.rows(), &mut publisher).await?;

    info!(
        grace_ms = config.drain_grace.as_millis() as u64,
        "Waiting before closing broker connection"
    );
    tokio::time::sleep(config.drain_grace).await;

    Ok(summary)
}
