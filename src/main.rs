//! Event Receiver - Universal event JSON receiver
//!
//! Consumes event notifications from an AMQP queue and prints a report for
//! every valid event.

mod config;
mod consumer;
mod protocol;
mod report;
mod transport;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::Config;
use consumer::Dispatcher;
use report::WriterSink;
use transport::{AmqpSource, DeliverySource, MemorySource};

/// Event Receiver - Universal event JSON receiver
#[derive(Parser)]
#[command(name = "event-receiver")]
#[command(author = "Event Receiver Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Receive and display event notifications from a message queue", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Consume events from the broker until interrupted
    Consume {
        /// Broker host (overrides configuration)
        #[arg(long)]
        host: Option<String>,

        /// Broker port (overrides configuration)
        #[arg(short, long)]
        port: Option<u16>,

        /// Queue name (overrides configuration)
        #[arg(short, long)]
        queue: Option<String>,
    },

    /// Decode a single event message from a JSON file
    Decode {
        /// File containing one JSON message
        file: PathBuf,
    },

    /// Show current configuration, or write it to a file
    Config {
        /// Generate sample configuration
        #[arg(long)]
        generate: bool,

        /// Output path for the sample or current config
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Reports go to stdout, logs to stderr
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default().unwrap_or_default()
    };

    match cli.command {
        Commands::Consume { host, port, queue } => {
            run_consumer(config, host, port, queue).await?;
        }
        Commands::Decode { file } => {
            run_decode(config, file).await?;
        }
        Commands::Config { generate, output } => {
            if generate {
                let sample = config::generate_sample_config()?;
                if let Some(path) = output {
                    std::fs::write(&path, &sample)?;
                    println!("Configuration written to: {}", path.display());
                } else {
                    println!("{}", sample);
                }
            } else if let Some(path) = output {
                config.save(&path)?;
                println!("Configuration written to: {}", path.display());
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

/// Consume from the broker until Ctrl+C or the broker closes the consumer
async fn run_consumer(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
    queue: Option<String>,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(queue) = queue {
        config.queue.name = queue;
    }

    let source = AmqpSource::connect(&config.server, &config.queue, &config.consumer).await?;
    tracing::info!(
        "Consumer {} waiting for messages. Press Ctrl+C to exit.",
        source.consumer_tag()
    );
    let mut dispatcher = Dispatcher::new(&config.consumer, source, WriterSink::stdout());

    let interrupted = tokio::select! {
        result = dispatcher.run() => {
            result?;
            false
        }
        _ = tokio::signal::ctrl_c() => true,
    };

    let stats = dispatcher.stats();
    tracing::info!(
        "{}: {} received, {} rendered, {} skipped, {} failed",
        if interrupted { "Shutting down" } else { "Consumer closed by broker" },
        stats.received,
        stats.rendered,
        stats.skipped,
        stats.failed
    );

    let (mut source, sink) = dispatcher.into_parts();
    tracing::debug!("{} reports written", sink.emitted());
    source.close().await?;

    Ok(())
}

/// Run one message from a file through the same pipeline as the queue
async fn run_decode(config: Config, file: PathBuf) -> anyhow::Result<()> {
    let body = std::fs::read(&file)?;

    let mut source = MemorySource::new();
    source.push(body);

    let mut dispatcher = Dispatcher::new(&config.consumer, source, WriterSink::stdout());
    dispatcher.run().await?;

    let (source, sink) = dispatcher.into_parts();
    tracing::debug!(
        acked = ?source.acked(),
        rejected = source.rejected().len(),
        unsettled = ?source.unsettled(),
        "Decode settled"
    );
    if sink.emitted() == 0 {
        println!("Unable to decode message");
    }

    Ok(())
}
