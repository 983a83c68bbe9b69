//! Common test utilities for producer integration tests using testcontainers

#![allow(dead_code)]

use anyhow::{Context, Result};
use relay_common::config::{BrokerConfig, RetryPolicy};
use std::time::Duration;
use testcontainers::{
    core::{ExecCommand, IntoContainerPort},
    runners::AsyncRunner,
    ContainerAsync,
};
use testcontainers_modules::rabbitmq::RabbitMq;
use tracing::info;

pub const TEST_QUEUE: &str = "employee_queue";

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

    /// Client connections the broker currently reports as open
    pub async fn open_connections(&self) -> Result<usize> {
        let mut result = self
            .container
            .exec(ExecCommand::new([
                "rabbitmqctl",
                "list_connections",
                "--quiet",
                "--no-table-headers",
                "name",
            ]))
            .await
            .context("Failed to run rabbitmqctl")?;
        let stdout = result
            .stdout_to_vec()
            .await
            .context("Failed to read rabbitmqctl output")?;

        Ok(String::from_utf8_lossy(&stdout)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .count())
    }
}

/// Initialize tracing for tests
pub fn init_test_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,relay_producer=debug,lapin=warn,testcontainers=info")
        }))
        .with_test_writer()
        .try_init();
}
