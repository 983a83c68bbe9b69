//! Queue Relay Consumer
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Takes employee messages off the durable queue one at a time, stores each
//! valid record as a row, and acknowledges it only after the write has been
//! attempted.
//!
//! # Example
//!
//! ```no_run
//! use relay_consumer::{config::ConsumerConfig, run};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConsumerConfig::from_env()?;
//!     let report = run(&config).await?;
//!     println!("stored {}", report.stats.stored);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod consume;
pub mod delivery;
pub mod error;
pub mod shutdown;
pub mod store;

pub use consume::{consume, ConsumeReport, StopReason, StopSignal};
pub use error::{ConsumerError, Result, StoreError};

use futures::FutureExt;
use lapin::{options::BasicConsumeOptions, types::FieldTable, Consumer};
use relay_common::broker::{BrokerSession, REPLY_SUCCESS};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::ConsumerConfig;
use crate::consume::PREFETCH_COUNT;
use crate::shutdown::{interrupt_signal, run_shutdown, ShutdownStep};
use crate::store::PgRecordStore;

/// Run the consumer until interrupted or until the broker goes away.
///
/// The store is prepared before the broker is contacted. On interrupt the
/// channel, connection, and store are closed in that order; when the broker
/// closes or fails only the store is closed.
pub async fn run(config: &ConsumerConfig) -> Result<ConsumeReport> {
    let store = PgRecordStore::connect(&config.store).await?;
    if let Err(e) = store.ensure_schema().await {
        store.close().await;
        return Err(e.into());
    }

    let session = match BrokerSession::open(&config.broker).await {
        Ok(session) => session,
        Err(e) => {
            store.close().await;
            return Err(e.into());
        },
    };

    let deliveries = match subscribe(&session, &config.broker.queue).await {
        Ok(consumer) => consumer,
        Err(e) => {
            let steps = cleanup_steps(CLOSE_ALL, session, &store);
            if let Err(shutdown) = run_shutdown(steps, config.shutdown_step_timeout).await {
                warn!(error = %shutdown, "Cleanup after failed setup was incomplete");
            }
            return Err(e);
        },
    };

    let (failure_tx, mut failure_rx) = mpsc::unbounded_channel();
    session.connection().on_error(move |e| {
        let _ = failure_tx.send(e.to_string());
    });

    let stop = async move {
        tokio::select! {
            _ = interrupt_signal() => StopSignal::Interrupt,
            Some(cause) = failure_rx.recv() => StopSignal::BrokerFailure(cause),
        }
    };

    info!(
        queue = %config.broker.queue,
        policy = %config.failure_policy,
        "Waiting for messages. To exit press CTRL+C"
    );

    let outcome = consume(deliveries, &store, config.failure_policy, stop).await;

    let steps = cleanup_steps(cleanup_plan(&outcome), session, &store);
    let closed = run_shutdown(steps, config.shutdown_step_timeout).await;

    let report = outcome?;
    closed?;
    info!(
        reason = ?report.reason,
        stored = report.stats.stored,
        discarded = report.stats.discarded,
        store_failures = report.stats.store_failures,
        "Consumer stopped"
    );
    Ok(report)
}

async fn subscribe(session: &BrokerSession, queue: &str) -> Result<Consumer> {
    session.declare_queue(queue).await?;
    session.set_prefetch(PREFETCH_COUNT).await?;

    let consumer = session
        .channel()
        .basic_consume(
            queue,
            "",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;

    info!(queue, consumer_tag = %consumer.tag(), "Subscribed");
    Ok(consumer)
}

/// A resource released during shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cleanup {
    Channel,
    Connection,
    Store,
}

const CLOSE_ALL: &[Cleanup] = &[Cleanup::Channel, Cleanup::Connection, Cleanup::Store];
const CLOSE_STORE: &[Cleanup] = &[Cleanup::Store];

/// Which resources to close, in order, once the consume loop has ended.
///
/// After an interrupt the broker side is still healthy and is closed first.
/// When the broker closed or failed, only the store is left to release.
pub fn cleanup_plan(outcome: &Result<ConsumeReport>) -> &'static [Cleanup] {
    match outcome {
        Ok(ConsumeReport {
            reason: StopReason::Interrupted,
            ..
        }) => CLOSE_ALL,
        _ => CLOSE_STORE,
    }
}

fn cleanup_steps(
    plan: &[Cleanup],
    session: BrokerSession,
    store: &PgRecordStore,
) -> Vec<ShutdownStep> {
    let (connection, channel) = session.into_parts();
    let mut channel = Some(channel);
    let mut connection = Some(connection);

    plan.iter()
        .filter_map(|cleanup| match cleanup {
            Cleanup::Channel => channel.take().map(close_channel),
            Cleanup::Connection => connection.take().map(close_connection),
            Cleanup::Store => Some(close_store(store)),
        })
        .collect()
}

fn close_channel(channel: lapin::Channel) -> ShutdownStep {
    ShutdownStep::new(
        "channel",
        async move {
            channel
                .close(REPLY_SUCCESS, "OK")
                .await
                .map_err(ConsumerError::from)
        }
        .boxed(),
    )
}

fn close_connection(connection: lapin::Connection) -> ShutdownStep {
    ShutdownStep::new(
        "connection",
        async move {
            connection
                .close(REPLY_SUCCESS, "OK")
                .await
                .map_err(ConsumerError::from)
        }
        .boxed(),
    )
}

fn close_store(store: &PgRecordStore) -> ShutdownStep {
    let store = store.clone();
    ShutdownStep::new(
        "store",
        async move {
            store.close().await;
            Ok::<_, ConsumerError>(())
        }
        .boxed(),
    )
}
