//! Identity Service Library
//!
//! User accounts, session authentication, email verification and password
//! reset over HTTP. Storage is Postgres with sessions in Redis or Postgres,
//! or process memory with `serve --ephemeral`.

pub mod api;
pub mod config;
pub mod events;
pub mod infra;
pub mod repository;
pub mod service;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use common::{AppError, AppResult};

use crate::api::{create_router, AppState};
use crate::config::IdentityServiceConfig;
use crate::infra::Database;
use crate::service::{ServiceContainer, Services};

/// Overrides for `serve`.
#[derive(Debug, Clone, Default)]
pub struct ServeOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// In-memory stores, no database or redis
    pub ephemeral: bool,
}

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

/// Build services and run the HTTP server until ctrl-c.
pub async fn serve(options: ServeOptions) -> AppResult<()> {
    let mut config = if options.ephemeral {
        ephemeral_config()
    } else {
        IdentityServiceConfig::from_env()?
    };
    if let Some(host) = options.host {
        config.service.host = host;
    }
    if let Some(port) = options.port {
        config.service.port = port;
    }

    let services: Arc<dyn ServiceContainer> = if options.ephemeral {
        info!("Running with in-memory storage; data is lost on exit");
        Arc::new(Services::in_memory(&config))
    } else {
        Arc::new(Services::connect(&config).await?)
    };

    run_server(services, &config).await
}

/// Serve the router over already-built services.
pub async fn run_server(
    services: Arc<dyn ServiceContainer>,
    config: &IdentityServiceConfig,
) -> AppResult<()> {
    let app = create_router(AppState::new(services, config));

    let addr = format!("{}:{}", config.service.host, config.service.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind to {}: {}", addr, e)))?;

    info!(service = %config.service.service_name, "Listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    info!("Server stopped");
    Ok(())
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(action: MigrateAction) -> AppResult<()> {
    let config = IdentityServiceConfig::from_env()?;
    let db = Database::connect_without_migrations(&config.database).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Delete expired sessions from the configured session store.
pub async fn prune_sessions() -> AppResult<u64> {
    let config = IdentityServiceConfig::from_env()?;
    let services = Services::connect(&config).await?;
    let removed = services.auth().prune_expired_sessions().await?;
    println!("Pruned {} expired sessions", removed);
    Ok(removed)
}

/// Env config when usable, otherwise defaults with a per-process secret.
fn ephemeral_config() -> IdentityServiceConfig {
    match IdentityServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "Using a generated JWT secret for this process");
            let secret = format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple());
            IdentityServiceConfig::ephemeral(secret)
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
