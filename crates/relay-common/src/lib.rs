//! Queue Relay Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, configuration, and broker plumbing for the producer and
//! consumer processes.
//!
//! # Overview
//!
//! - **Broker**: connection establishment with bounded retry, durable queue
//!   declaration, and orderly close
//! - **Config**: environment-driven settings with documented defaults
//! - **Record**: the employee record model, row cleaning, and the JSON wire form
//! - **Logging**: tracing subscriber setup shared by both binaries
//!
//! # Example
//!
//! ```no_run
//! use relay_common::broker::BrokerSession;
//! use relay_common::config::BrokerConfig;
//!
//! #[tokio::main]
//! async fn main() -> relay_common::Result<()> {
//!     let config = BrokerConfig::from_env()?;
//!     let session = BrokerSession::open(&config).await?;
//!     session.declare_queue(&config.queue).await?;
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

pub mod broker;
pub mod config;
pub mod error;
pub mod logging;
pub mod record;

// Re-export commonly used types
pub use error::{RelayError, Result};
