//! Driftwatch - Main Entry Point
//!
//! Inference service with automatic input-drift monitoring.

use clap::Parser;
use driftwatch::cli::{cmd_serve, cmd_simulate, Cli, Commands};
use driftwatch::server::{run_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "driftwatch=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { host, port }) => {
            cmd_serve(&host, port).await?;
        }
        Some(Commands::Simulate { url, mode, steps }) => {
            cmd_simulate(&url, &mode, steps).await?;
        }
        None => {
            // Default: serve with env-backed configuration
            run_server(ServerConfig::default()).await?;
        }
    }

    Ok(())
}
