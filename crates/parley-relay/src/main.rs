//! parley rendezvous server.

mod config;
mod counters;
mod error;
mod ice;
mod server;
mod slot;
mod websocket;

use config::RelayConfig;
use server::RelayServer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = RelayConfig::load()?;
    RelayServer::new(config).run().await
}
