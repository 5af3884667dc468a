//! Service runtime.
//!
//! [`ServerHandle`] owns the full lifecycle: database connection,
//! migrations, system-admin bootstrap, the REST API and graceful shutdown.
//! The CLI binary and the integration tests share [`build_app_state`].

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};

use crate::application::{
    AccessAdminService, AuthorizationEvaluator, IdentityService, Mailer, UserService,
};
use crate::config::AppConfig;
use crate::domain::{
    AccessRepositoryInterface, PermissionRepositoryInterface, RoleRepositoryInterface,
    UserRepositoryInterface,
};
use crate::infrastructure::crypto::{PasswordHasher, TokenCodec};
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::database::repositories::{
    AccessRepository, PermissionRepository, RoleRepository, UserRepository,
};
use crate::infrastructure::{init_database, LogMailer};
use crate::interfaces::http::modules::health::HealthState;
use crate::interfaces::http::modules::metrics::MetricsState;
use crate::interfaces::http::{create_api_router, AppState};
use crate::shared::{ShutdownCoordinator, ShutdownSignal};

pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup.
    pub auto_migrate: bool,
    /// Create the configured system administrator if none exists.
    pub create_system_admin: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
            create_system_admin: true,
        }
    }
}

/// Wire repositories, services and the HTTP state over one connection.
pub fn build_app_state(
    db: DatabaseConnection,
    config: &AppConfig,
    mailer: Arc<dyn Mailer>,
) -> AppState {
    let users: Arc<dyn UserRepositoryInterface> = Arc::new(UserRepository::new(db.clone()));
    let roles: Arc<dyn RoleRepositoryInterface> = Arc::new(RoleRepository::new(db.clone()));
    let permissions: Arc<dyn PermissionRepositoryInterface> =
        Arc::new(PermissionRepository::new(db.clone()));
    let access: Arc<dyn AccessRepositoryInterface> = Arc::new(AccessRepository::new(db));

    let tokens = Arc::new(TokenCodec::new(config.security.jwt_config()));
    let hasher = PasswordHasher::new(config.security.bcrypt_cost);

    let identity = Arc::new(IdentityService::new(
        users.clone(),
        access.clone(),
        tokens.clone(),
        hasher,
        mailer,
        config.server.base_url.clone(),
    ));
    let user_service = Arc::new(UserService::new(users.clone(), access.clone()));
    let admin = Arc::new(AccessAdminService::new(
        users,
        roles,
        permissions,
        access.clone(),
    ));

    AppState {
        identity,
        users: user_service,
        admin,
        evaluator: AuthorizationEvaluator::new(access),
        tokens,
        secure_cookies: config.security.secure_cookies,
    }
}

/// The global recorder can only be installed once per process.
fn prometheus_handle() -> PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                info!("Prometheus metrics recorder installed");
                handle
            }
            Err(e) => {
                warn!(error = %e, "Prometheus recorder unavailable, /metrics will be empty");
                PrometheusBuilder::new().build_recorder().handle()
            }
        })
        .clone()
}

/// Handle to a running service.
pub struct ServerHandle {
    pub config: AppConfig,
    /// Address the API actually bound (port 0 resolves here).
    pub local_addr: SocketAddr,

    db: DatabaseConnection,
    shutdown: ShutdownCoordinator,
    api_task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// 1. Install the Prometheus recorder
    /// 2. Connect and migrate
    /// 3. Bootstrap the system administrator (if enabled)
    /// 4. Serve the REST API until the shutdown signal fires
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let config = opts.config;
        info!("Starting RBAC service...");

        if config.security.uses_dev_secret() {
            warn!("Using the built-in development JWT secret; set JWT_SECRET in production");
        }

        let metrics_handle = prometheus_handle();

        let db = init_database(&config.database.database_config()).await?;
        if opts.auto_migrate {
            info!("Running database migrations...");
            Migrator::up(&db, None).await?;
            info!("Migrations completed");
        }

        let mailer: Arc<dyn Mailer> = Arc::new(LogMailer::new(config.email.smtp_settings()));
        let state = build_app_state(db.clone(), &config, mailer);

        if opts.create_system_admin {
            if let Err(e) = state
                .identity
                .bootstrap_system_admin(&config.admin.account())
                .await
            {
                error!(error = %e, "System administrator bootstrap failed");
            }
        }

        let router = create_api_router(
            state,
            HealthState::new(db.clone()),
            MetricsState {
                handle: metrics_handle,
            },
        );

        let shutdown = ShutdownCoordinator::new(config.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();

        let listener = tokio::net::TcpListener::bind(config.listen_address()).await?;
        let local_addr = listener.local_addr()?;
        info!("REST API listening on http://{}", local_addr);
        info!("Swagger UI available at http://{}/docs/", local_addr);

        let server = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown_signal.wait().await;
            info!("REST API received shutdown signal");
        });

        let api_task = tokio::spawn(async move {
            if let Err(e) = server.await {
                error!("REST API server error: {}", e);
            }
        });

        Ok(Self {
            config,
            local_addr,
            db,
            shutdown,
            api_task,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Trigger shutdown on SIGTERM / SIGINT.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for the API task to drain (bounded by the shutdown timeout),
    /// then close the pool.
    pub async fn wait(self) {
        info!("Waiting for in-flight requests...");
        match tokio::time::timeout(self.shutdown.timeout(), self.api_task).await {
            Ok(Ok(())) => info!("REST API server stopped"),
            Ok(Err(e)) => error!("REST API server task panicked: {}", e),
            Err(_) => warn!("Shutdown timeout elapsed with requests still in flight"),
        }

        if let Err(e) = self.db.close().await {
            warn!("Error closing database connection: {}", e);
        } else {
            info!("Database connection closed");
        }
        info!("RBAC service shutdown complete");
    }

    pub async fn shutdown(self) {
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let result = match config.logging.format.to_lowercase().as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init(),
    };
    if let Err(e) = result {
        eprintln!("tracing already initialised: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_and_shuts_down() {
        let mut config = AppConfig::default();
        config.server.host = "127.0.0.1".into();
        config.server.port = 0;
        config.server.shutdown_timeout = 5;
        config.database.url = Some("sqlite::memory:".into());
        config.database.max_connections = 1;
        config.security.bcrypt_cost = 4;

        let handle = ServerHandle::start(ServerOptions {
            config,
            auto_migrate: true,
            create_system_admin: true,
        })
        .await
        .unwrap();

        assert_ne!(handle.local_addr.port(), 0);
        assert!(handle.is_running());
        handle.shutdown().await;
    }
}
