//! Snapshot Relay CLI
//!
//! Command-line front end for the relay client:
//! - Run the client until Ctrl-C or until the connection ends
//! - Print a one-off table snapshot
//! - Generate a default config file
//!
//! # Configuration
//!
//! `--config <path>` loads a TOML file; otherwise the default locations are
//! searched. `SNAPSHOT_RELAY_*` environment variables override file values
//! and `RUST_LOG` overrides `logging.level`.

use clap::{Parser, Subcommand};
use snapshot_relay::config::generate_default_config;
use snapshot_relay::{Config, LoggingConfig, RelayClient, SnapshotSource, SqliteGateway, StatusEvent};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "snapshot-relay")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Answer WebSocket triggers with a snapshot of a database table")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect and relay snapshots until Ctrl-C or the connection ends
    Run,

    /// Print the current table snapshot as JSON
    Snapshot,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            let config = load_config(cli.config.as_deref())?;
            run(&config).await?;
        }
        Commands::Snapshot => {
            let config = load_config(cli.config.as_deref())?;
            let gateway = SqliteGateway::from_config(&config.data_source)?;
            println!("{}", gateway.fetch_snapshot()?);
        }
        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)?;
                    eprintln!("Wrote default config to {}", path.display());
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}

/// Load, validate and install logging for the selected config
fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    config.validate()?;
    init_logging(&config.logging);
    Ok(config)
}

async fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Snapshot Relay v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        url = %config.server.endpoint(),
        table = %config.data_source.table,
        "Relaying table snapshots"
    );

    let (mut client, mut status) = RelayClient::from_config(config)?;

    let reporter = tokio::spawn(async move {
        while let Some(event) = status.recv().await {
            match event {
                StatusEvent::Error(message) => tracing::error!("{}", message),
                other => tracing::info!("{}", other),
            }
        }
    });

    client.start()?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down...");
        }
        exit = client.wait() => {
            tracing::info!(exit = ?exit, "Exchange loop ended");
        }
    }

    client.stop().await;
    drop(client);
    let _ = reporter.await;

    tracing::info!("Snapshot Relay shutdown complete");
    Ok(())
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("snapshot_relay={}", config.level)));

    // stdout is reserved for snapshot output
    let registry = tracing_subscriber::registry().with(filter);
    if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
