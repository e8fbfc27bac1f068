//! Top-level rendezvous server: binds a listener and serves the
//! WebSocket router until the process is asked to stop.

use std::sync::Arc;

use tracing::info;

use crate::config::RelayConfig;
use crate::counters::Counters;
use crate::slot::SlotTable;
use crate::websocket::{router, RelayState};

/// The rendezvous server, holding the slot table and configuration for
/// its lifetime.
pub struct RelayServer {
    config: RelayConfig,
}

impl RelayServer {
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    /// Bind `config.bind_addr` and serve connections until the process
    /// exits. This is the control surface's `run_server` entry point;
    /// certificate management and static-file serving are collaborator
    /// concerns and are not implemented here.
    pub async fn run(self) -> anyhow::Result<()> {
        let counters = Arc::new(Counters::default());
        let state = Arc::new(RelayState::new(
            SlotTable::new(Arc::clone(&counters)),
            self.config.clone(),
            counters,
        ));

        let listener = tokio::net::TcpListener::bind(&self.config.bind_addr).await?;
        info!(addr = %self.config.bind_addr, "listening");

        axum::serve(listener, router(state)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_holds_the_config_it_was_given() {
        let config = RelayConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            ..RelayConfig::default()
        };
        let server = RelayServer::new(config.clone());
        assert_eq!(server.config.bind_addr, config.bind_addr);
    }
}
