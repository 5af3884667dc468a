//! RBAC service entry point.
//!
//! Reads `RBAC_CONFIG` or `~/.config/rbac-service/config.toml`, applies the
//! environment and serves until SIGINT / SIGTERM. The `rbac-cli` binary
//! offers the same with command-line overrides.

use tracing::{error, info};

use rbac_service::{default_config_path, init_tracing, AppConfig, ServerHandle, ServerOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = default_config_path();
    let config = match AppConfig::load(&config_path) {
        Ok(config) => {
            init_tracing(&config);
            info!("Configuration loaded from {}", config_path.display());
            config
        }
        Err(e) => {
            init_tracing(&AppConfig::default());
            error!("Failed to load config from {}: {}", config_path.display(), e);
            return Err(e.into());
        }
    };

    let handle = ServerHandle::start(ServerOptions {
        config,
        ..ServerOptions::default()
    })
    .await?;
    handle.install_signal_handler();

    handle.shutdown_signal().wait().await;
    handle.wait().await;
    Ok(())
}
