//! Queue Relay Consumer - stores queued employee messages

use anyhow::Result;
use clap::Parser;
use relay_common::logging::{init_logging, LogConfig, LogLevel};
use relay_consumer::config::{ConsumerConfig, StoreFailurePolicy};
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "relay-consumer")]
#[command(author, version, about = "Store employee messages from the durable queue")]
struct Cli {
    /// Queue name (overrides QUEUE_NAME)
    #[arg(short, long)]
    queue: Option<String>,

    /// What to do with a message whose insert failed: ack or requeue
    /// (overrides STORE_FAILURE_POLICY)
    #[arg(short, long)]
    policy: Option<StoreFailurePolicy>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .file_prefix("relay-consumer")
        .directives("lapin=warn,sqlx=warn")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    let _guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e:#}");
            return ExitCode::FAILURE;
        },
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Consumer failed");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = ConsumerConfig::from_env()?;
    if let Some(queue) = cli.queue {
        config.broker.queue = queue;
    }
    if let Some(policy) = cli.policy {
        config.failure_policy = policy;
    }
    config.validate()?;

    info!(
        queue = %config.broker.queue,
        database = %config.store.target(),
        policy = %config.failure_policy,
        "Starting consumer"
    );

    relay_consumer::run(&config).await?;
    Ok(())
}
