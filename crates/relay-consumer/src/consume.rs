//! Consume loop
//!
//! Pulls one delivery at a time, validates it, writes it, and settles it
//! before asking for the next. The stop future is only polled between
//! messages, so an interrupt never cuts a write short: the in-flight message
//! is always stored and settled first.

use futures::{Stream, StreamExt};
use relay_common::record::EmployeeRecord;
use std::future::Future;
use tracing::{debug, error, info, warn};

use crate::config::StoreFailurePolicy;
use crate::delivery::InboundMessage;
use crate::error::{ConsumerError, Result};
use crate::store::RecordStore;

/// Deliveries the broker may push ahead of an acknowledgement
pub const PREFETCH_COUNT: u16 = 1;

/// Why the consume loop should stop between messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopSignal {
    /// Interrupt or terminate signal received
    Interrupt,
    /// The broker reported an unsolicited connection error
    BrokerFailure(String),
}

/// How the consume loop ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Interrupted,
    /// The delivery stream ended: the broker closed the channel in an orderly way
    BrokerClosed,
}

/// How a single delivery was settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Stored { id: i64 },
    /// Invalid payload, acknowledged without a write
    Discarded { reason: String },
    /// Insert failed; the message was acked or requeued per policy
    StoreFailed { requeued: bool },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumeStats {
    pub stored: u64,
    pub discarded: u64,
    pub store_failures: u64,
}

impl ConsumeStats {
    fn record(&mut self, disposition: &Disposition) {
        match disposition {
            Disposition::Stored { .. } => self.stored += 1,
            Disposition::Discarded { .. } => self.discarded += 1,
            Disposition::StoreFailed { .. } => self.store_failures += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeReport {
    pub reason: StopReason,
    pub stats: ConsumeStats,
}

/// Validate, store, and settle one delivery.
///
/// Only a failure to settle the message is returned as an error; everything
/// else is contained to this message.
pub async fn handle_delivery<M, S>(
    message: M,
    store: &S,
    policy: StoreFailurePolicy,
) -> Result<Disposition>
where
    M: InboundMessage,
    S: RecordStore + ?Sized,
{
    let tag = message.delivery_tag();

    let record = match EmployeeRecord::from_payload(message.payload()) {
        Ok(record) => record,
        Err(reason) => {
            warn!(
                delivery_tag = tag,
                %reason,
                payload = %String::from_utf8_lossy(message.payload()),
                "Invalid data, acknowledging without storing"
            );
            message.ack().await?;
            return Ok(Disposition::Discarded {
                reason: reason.to_string(),
            });
        },
    };

    debug!(delivery_tag = tag, ?record, "Received");

    match store.insert(&record).await {
        Ok(id) => {
            message.ack().await?;
            info!(delivery_tag = tag, id, name = %record.name, "Stored employee");
            Ok(Disposition::Stored { id })
        },
        Err(e) => {
            error!(
                delivery_tag = tag,
                name = %record.name,
                error = %e,
                %policy,
                "Error processing message"
            );
            let requeued = match policy {
                StoreFailurePolicy::Ack => {
                    message.ack().await?;
                    false
                },
                StoreFailurePolicy::Requeue => {
                    message.requeue().await?;
                    true
                },
            };
            Ok(Disposition::StoreFailed { requeued })
        },
    }
}

/// Drain `deliveries` into `store` until `stop` resolves or the stream ends.
///
/// A stream error or [`StopSignal::BrokerFailure`] is returned as
/// [`ConsumerError::BrokerDisrupted`].
pub async fn consume<D, M, E, S, F>(
    deliveries: D,
    store: &S,
    policy: StoreFailurePolicy,
    stop: F,
) -> Result<ConsumeReport>
where
    D: Stream<Item = std::result::Result<M, E>>,
    M: InboundMessage,
    E: std::fmt::Display,
    S: RecordStore + ?Sized,
    F: Future<Output = StopSignal>,
{
    let mut stats = ConsumeStats::default();
    tokio::pin!(deliveries);
    tokio::pin!(stop);

    loop {
        let next = tokio::select! {
            biased;

            signal = &mut stop => match signal {
                StopSignal::Interrupt => {
                    info!(?stats, "Stop requested, no message in flight");
                    return Ok(ConsumeReport { reason: StopReason::Interrupted, stats });
                },
                StopSignal::BrokerFailure(cause) => {
                    error!(%cause, "RabbitMQ connection error");
                    return Err(ConsumerError::BrokerDisrupted { cause });
                },
            },
            next = deliveries.next() => next,
        };

        match next {
            Some(Ok(message)) => {
                let disposition = handle_delivery(message, store, policy).await?;
                stats.record(&disposition);
            },
            Some(Err(e)) => {
                error!(error = %e, "Delivery stream failed");
                return Err(ConsumerError::disrupted(e));
            },
            None => {
                info!(?stats, "RabbitMQ connection closed");
                return Ok(ConsumeReport {
                    reason: StopReason::BrokerClosed,
                    stats,
                });
            },
        }
    }
}
