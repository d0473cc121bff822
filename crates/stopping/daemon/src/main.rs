//! Stopping Daemon - stops expired and errored algo instances
//!
//! The daemon provides:
//! - A reconciliation loop stopping instances past their end date
//! - Healing of started records whose pod is gone
//! - Stopping of instances whose pod terminated on its own
//! - A REST API for manual pod listing and deletion

use clap::Parser;
use stopping_daemon::config::DaemonConfig;
use stopping_daemon::error::{DaemonError, DaemonResult};
use stopping_daemon::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Stopping Daemon CLI
#[derive(Parser)]
#[command(name = "stoppingd")]
#[command(about = "Stopping Daemon - stops expired and errored algo instances", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "STOPPING_CONFIG")]
    config: Option<String>,

    /// Listen address (overrides the configuration file)
    #[arg(short, long, env = "STOPPING_LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level (overrides the configuration file)
    #[arg(long, env = "STOPPING_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "STOPPING_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())
        .map_err(|e| DaemonError::Config(e.to_string()))?;

    // Override with CLI args
    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| DaemonError::Config(format!("Invalid listen address: {}", e)))?;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    config.logging.json |= cli.json;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.server.listen_addr,
        interval_secs = config.monitor.check_interval_secs,
        "Starting stopping daemon"
    );

    // Create and run server
    let server = Server::new(config).await?;
    server.run().await
}
