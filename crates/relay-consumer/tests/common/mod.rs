//! Common test utilities for consumer integration tests using testcontainers
//!
//! Each helper starts its own container, so tests never share broker or
//! database state.

#![allow(dead_code)]

use anyhow::{Context, Result};
use relay_common::config::{BrokerConfig, RetryPolicy};
use relay_consumer::config::StoreConfig;
use std::time::Duration;
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::{postgres::Postgres, rabbitmq::RabbitMq};
use tracing::info;

pub const TEST_QUEUE: &str = "employee_queue";

// ============================================================================
// PostgreSQL Test Container
// ============================================================================

pub struct TestPostgres {
    container: ContainerAsync<Postgres>,
    url: String,
}

impl TestPostgres {
    pub async fn start() -> Result<Self> {
        info!("Starting PostgreSQL test container...");

        let container = Postgres::default()
            .with_tag("16-alpine")
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;

        let host = container
            .get_host()
            .await
            .context("Failed to get container host")?;
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .context("Failed to get container port")?;

        let url = format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);
        info!(%url, "PostgreSQL container ready");

        Ok(Self { container, url })
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            url: Some(self.url.clone()),
            connect_timeout: Duration::from_secs(30),
            ..StoreConfig::default()
        }
    }
}

// ============================================================================
// RabbitMQ Test Container
// ============================================================================

pub struct TestRabbitMq {
    container: ContainerAsync<RabbitMq>,
    url: String,
}

impl TestRabbitMq {
    pub async fn start() -> Result<Self> {
        info!("Starting RabbitMQ test container...");

        let container = RabbitMq::default()
            .start()
            .await
            .context("Failed to start RabbitMQ container")?;

        let host = container
            .get_host()
            .await
            .context("Failed to get container host")?;
        let port = container
            .get_host_port_ipv4(5672.tcp())
            .await
            .context("Failed to get container port")?;

        let url = format!("amqp://guest:guest@{}:{}/%2f", host, port);
        info!(%url, "RabbitMQ container ready");

        Ok(Self { container, url })
    }

    pub fn broker_config(&self) -> BrokerConfig {
        BrokerConfig {
            url: self.url.clone(),
            queue: TEST_QUEUE.to_string(),
            retry: RetryPolicy::new(3, Duration::from_secs(1)),
        }
    }
}

/// Initialize tracing for tests
pub fn init_test_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,relay_consumer=debug,sqlx=warn,lapin=warn,testcontainers=info")
        }))
        .with_test_writer()
        .try_init();
}
