//! Queue publisher
//!
//! [`Publisher`] is the seam between the publish loop and the broker. The
//! production implementation, [`QueuePublisher`], sends through the default
//! exchange straight to the durable queue with the persistent delivery mode.

use async_trait::async_trait;
use lapin::{
    options::{BasicPublishOptions, ConfirmSelectOptions},
    BasicProperties, Channel,
};
use relay_common::record::CONTENT_TYPE_JSON;
use tracing::debug;

use crate::error::{ProducerError, Result};

/// AMQP delivery mode for messages that must survive a broker restart
pub const DELIVERY_MODE_PERSISTENT: u8 = 2;

/// Sink for serialized records, called once per row in source order
#[async_trait]
pub trait Publisher: Send {
    /// Publish one message. `line` identifies the source row for diagnostics.
    async fn publish(&mut self, line: u64, payload: &[u8]) -> Result<()>;
}

/// Publishes persistent JSON messages to a named queue
pub struct QueuePublisher {
    channel: Channel,
    queue: String,
    confirms: bool,
}

impl QueuePublisher {
    /// Create a publisher on `channel`. With `confirms` set, the channel is
    /// switched to confirm mode and every publish waits for the broker ack.
    pub async fn new(channel: Channel, queue: impl Into<String>, confirms: bool) -> Result<Self> {
        if confirms {
            channel
                .confirm_select(ConfirmSelectOptions::default())
                .await?;
            debug!("Publisher confirms enabled");
        }

        Ok(Self {
            channel,
            queue: queue.into(),
            confirms,
        })
    }

    fn properties() -> BasicProperties {
        BasicProperties::default()
            .with_delivery_mode(DELIVERY_MODE_PERSISTENT)
            .with_content_type(CONTENT_TYPE_JSON.into())
    }
}

#[async_trait]
impl Publisher for QueuePublisher {
    async fn publish(&mut self, line: u64, payload: &[u8]) -> Result<()> {
        let confirm = self
            .channel
            .basic_publish(
                "",
                &self.queue,
                BasicPublishOptions::default(),
                payload,
                Self::properties(),
            )
            .await?;

        // Resolves immediately when confirm mode is off
        let confirmation = confirm.await?;
        if self.confirms && confirmation.is_nack() {
            return Err(ProducerError::PublishNacked {
                queue: self.queue.clone(),
                line,
            });
        }

        Ok(())
    }
}
