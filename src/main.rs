//! Remote Relay Server
//!
//! Run with: cargo run -- --port 18081
//!
//! # Configuration
//!
//! Environment variables:
//! - `PORT`: Port to listen on, takes precedence over `--port` (default: 18081)
//! - `RELAY_HOST`: Host to bind to (default: 0.0.0.0)
//! - `RELAY_QUEUE_CAPACITY`: Frames buffered per connection (default: 16)
//! - `RELAY_LOG_LEVEL`, `RELAY_LOG_FORMAT`: Logging (default: info, pretty)
//! - `RUST_LOG`: Full filter directive, overrides the log level

use anyhow::Context;
use clap::Parser;
use remote_relay::config::{generate_default_config, Config, LoggingConfig};
use remote_relay::{serve, AppState};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Relay commands, status and images between controllers and devices
#[derive(Debug, Parser)]
#[command(name = "remote-relay", version, about)]
struct Cli {
    /// Listen port (default 18081); ignored when PORT is set
    #[arg(long)]
    port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Config file (TOML)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Print a commented default config file and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", generate_default_config());
        return Ok(());
    }

    let (mut config, source) = match &cli.config {
        Some(path) => {
            let config = Config::load_with_env(path)
                .with_context(|| format!("loading config from {}", path.display()))?;
            (config, Some(path.clone()))
        }
        None => Config::load_default().context("loading default config")?,
    };

    if let Some(host) = cli.host {
        config.server.host = host;
    }
    config.apply_cli_port(cli.port);
    config.validate()?;

    init_logging(&config.logging);

    tracing::info!("Starting remote relay v{}", env!("CARGO_PKG_VERSION"));
    match &source {
        Some(path) => tracing::info!("Loaded config from {:?}", path),
        None => tracing::info!("Using default config with environment overrides"),
    }
    tracing::info!(
        queue_capacity = config.hub.queue_capacity,
        read_timeout_secs = config.connection.read_timeout_secs,
        ping_interval_secs = config.connection.ping_interval_secs,
        "Relay settings"
    );

    let state = AppState::new(config.hub_config(), config.connection_settings());
    serve(state, &config.server.addr()).await?;

    tracing::info!("Remote relay stopped");
    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("remote_relay={},tower_http=info", logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
