//! Queue Relay Producer - publishes source rows to the durable queue

use anyhow::Result;
use clap::Parser;
use relay_common::logging::{init_logging, LogConfig, LogLevel};
use relay_producer::config::ProducerConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "relay-producer")]
#[command(author, version, about = "Publish employee rows to the durable queue")]
struct Cli {
    /// Source file (overrides SOURCE_FILE)
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Queue name (overrides QUEUE_NAME)
    #[arg(short, long)]
    queue: Option<String>,

    /// Wait for broker confirms on every publish
    #[arg(long)]
    confirms: bool,

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
        .file_prefix("relay-producer")
        .directives("lapin=warn")
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
            error!(error = %format!("{e:#}"), "Producer failed");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = ProducerConfig::from_env()?;
    if let Some(source) = cli.source {
        config.source_path = source;
    }
    if let Some(queue) = cli.queue {
        config.broker.queue = queue;
    }
    config.publisher_confirms |= cli.confirms;
    config.validate()?;

    info!(
        queue = %config.broker.queue,
        source = %config.source_path.display(),
        confirms = config.publisher_confirms,
        "Starting producer"
    );

    let summary = relay_producer::run(&config).await?;
    info!(
        published = summary.published,
        skipped = summary.skipped,
        "All messages sent"
    );

    Ok(())
}
