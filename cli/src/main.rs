//! RBAC service command-line server
//!
//! ```sh
//! # Default config (~/.config/rbac-service/config.toml)
//! rbac-cli
//!
//! # Custom config, port and log level
//! rbac-cli --config /etc/rbac-service/config.toml --port 9000 --log-level debug
//!
//! # Validate the config without starting
//! rbac-cli --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use rbac_service::config::AppConfig;
use rbac_service::server::{init_tracing, ServerHandle, ServerOptions};

#[derive(Parser, Debug)]
#[command(
    name = "rbac-cli",
    version,
    about = "Identity and role-based access control service",
    long_about = "JSON HTTP API for registration, email verification, login, password \
                  reset and role/permission administration.\n\n\
                  Default config: ~/.config/rbac-service/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "RBAC_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,

    /// Skip creating the configured system administrator.
    #[arg(long)]
    no_admin: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(rbac_service::default_config_path);

    let mut config = match AppConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            init_tracing(&AppConfig::default());
            error!("Failed to load config from {}: {}", config_path.display(), e);
            return Err(e.into());
        }
    };

    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    init_tracing(&config);
    info!("Configuration loaded from {}", config_path.display());

    if let Some(port) = cli.port {
        info!("CLI override: port = {}", port);
        config.server.port = port;
    }

    if cli.check {
        let database = rbac_service::infrastructure::database::DatabaseConfig::from_url(
            config.database.connection_url(),
        );
        println!("Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   Listen      : {}", config.listen_address());
        println!("   Base URL    : {}", config.server.base_url);
        println!("   Database    : {}", database.display_url());
        println!("   Log level   : {}", config.logging.level);
        if config.security.uses_dev_secret() {
            println!("   Warning     : development JWT secret in use");
        }
        return Ok(());
    }

    let handle = ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
        create_system_admin: !cli.no_admin,
    })
    .await?;

    handle.install_signal_handler();
    info!("Press Ctrl+C to shut down gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;

    Ok(())
}
