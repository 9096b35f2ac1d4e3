//! Cross-org event bridge entry point.

use anyhow::Context as _;
use clap::Parser;
use orgbridge_relay::{Bridge, BridgeConfig};
use tracing::info;

/// Relays streaming events from a source org into log records on a
/// target org.
#[derive(Parser, Debug)]
#[command(name = "orgbridge-relay", about = "Cross-org streaming event relay")]
struct Args {
    /// Override the platform API version (e.g. `v64.0`).
    #[arg(long)]
    api_version: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (controlled via RUST_LOG env var).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = BridgeConfig::from_env().context("configuration")?;
    if let Some(api_version) = args.api_version {
        config.api_version = api_version;
    }

    info!(
        channel = %config.channel,
        api_version = %config.api_version,
        "starting cross-org event bridge"
    );

    Bridge::new(config).run().await
}
