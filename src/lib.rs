pub mod cli;
pub mod core;
pub mod providers;
pub mod server;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::core::{AppConfig, initialize};
use crate::providers::ActualServerConnector;

/// Loads configuration from the file and the process environment, then
/// hands over to [`run_with_config`].
pub async fn run(config_path: Option<&str>) -> Result<()> {
    info!("Budget proxy starting...");
    run_with_config(AppConfig::load(config_path)?).await
}

/// Initialises the budget session for `config` and serves until a
/// termination signal arrives.
pub async fn run_with_config(config: AppConfig) -> Result<()> {
    debug!(
        server = %config.server_url,
        sync_id = %config.sync_id,
        port = config.port,
        data_dir = %config.data_dir.display(),
        timeout_secs = config.request_timeout_secs,
        "Loaded config"
    );

    let connector = ActualServerConnector::new(config.request_timeout());
    let session = Arc::new(initialize(&config, &connector).await?);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            if let Err(e) = session.release().await {
                warn!(error = %e, "Failed to release budget session");
            }
            return Err(err).with_context(|| format!("Failed to bind {addr}"));
        }
    };

    server::serve(listener, session, server::shutdown_signal()).await
}
