//! Delivered messages
//!
//! The consume loop only needs a payload and a way to settle the message.
//! [`InboundMessage`] captures that, and is implemented for lapin deliveries.

use async_trait::async_trait;
use lapin::{
    message::Delivery,
    options::{BasicAckOptions, BasicNackOptions},
};

/// A message held by the consumer between delivery and settlement
#[async_trait]
pub trait InboundMessage: Send + Sized {
    /// Broker-assigned tag, unique per channel
    fn delivery_tag(&self) -> u64;

    fn payload(&self) -> &[u8];

    /// Remove the message from the queue
    async fn ack(self) -> Result<(), lapin::Error>;

    /// Return the message to the queue for redelivery
    async fn requeue(self) -> Result<(), lapin::Error>;
}

#[async_trait]
impl InboundMessage for Delivery {
    fn delivery_tag(&self) -> u64 {
        self.delivery_tag
    }

    fn payload(&self) -> &[u8] {
        &self.data
    }

    async fn ack(self) -> Result<(), lapin::Error> {
        self.acker.ack(BasicAckOptions::default()).await
    }

    async fn requeue(self) -> Result<(), lapin::Error> {
        self.acker
            .nack(BasicNackOptions {
                multiple: false,
                requeue: true,
            })
            .await
    }
}
