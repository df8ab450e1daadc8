//! Verikit verification service.
//!
//! Serves the on-chain payment and LNURL-auth verification API for a
//! Bitcoin store directory.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use verikit_http::{server, AppConfig, AppState};
use verikit_lib::chain::EsploraProvider;

#[derive(Parser)]
#[command(name = "verikit-http")]
#[command(about = "Payment and identity verification service", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Override the listen address from the config file
    #[arg(long)]
    listen: Option<std::net::SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    }
    .apply_env()?;
    if let Some(listen) = cli.listen {
        config.listen_addr = listen;
    }

    tracing::info!(
        api_url = %config.chain.api_url,
        network = config.chain.network.as_str(),
        "starting verification service"
    );

    let chain = Arc::new(EsploraProvider::new(config.chain.clone())?);
    let state = AppState::new(chain, config.lnurl.clone(), &config.verification);

    server::serve(
        state,
        config.listen_addr,
        Duration::from_secs(config.sweep_interval_secs),
    )
    .await
}
