//! taskhub - task management API service.
//!
//! Startup follows a fixed sequence in every deployment path: wait for
//! the database to accept connections, apply pending schema migrations,
//! then serve.

use tokio::net::TcpListener;

mod api;
mod auth;
mod config;
mod domain;
mod error;
mod logging;
mod readiness;
mod storage;

use crate::api::build_router;
use crate::auth::JwtManager;
use crate::config::{Config, DEV_SECRET_KEY};
use crate::readiness::{wait_until_ready, PostgresProbe, RetryPolicy};
use crate::storage::TaskhubRepository;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database repository.
    pub repository: TaskhubRepository,
    /// JWT manager for token operations.
    pub jwt_manager: JwtManager,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if present)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Note: No .env file loaded ({e})");
    }

    // Configuration comes first: the logging format depends on DEBUG.
    let config = Config::load().map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    logging::init(config.runtime.debug);

    tracing::info!("Starting taskhub v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        database_host = %config.database.host,
        database = %config.database.name,
        debug = %config.runtime.debug,
        "Configuration loaded"
    );

    if config.auth.secret_key == DEV_SECRET_KEY {
        tracing::warn!("SECRET_KEY is not set - using the insecure development default");
    }

    // Gate startup on the database accepting connections for the
    // configured name and user.
    let probe = PostgresProbe::new(&config.database);
    let policy = RetryPolicy::fixed(
        config.database.connect_attempts,
        config.database.connect_interval(),
    );
    wait_until_ready(&probe, &policy).await.map_err(|e| {
        tracing::error!(error = %e, "Database never became ready");
        anyhow::anyhow!("Readiness gate failed: {}", e)
    })?;

    // Connect and migrate before the port is bound; a migration failure
    // means the server never starts accepting connections.
    let pool = storage::create_pool(&config.database).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to connect to database");
        anyhow::anyhow!("Database connection error: {}", e)
    })?;

    storage::run_migrations(&pool).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to apply migrations");
        anyhow::anyhow!("Migration error: {}", e)
    })?;

    tracing::info!("Database connected and migrations applied");

    let repository = TaskhubRepository::new(pool);
    let jwt_manager = JwtManager::new(
        &config.auth.secret_key,
        config.auth.issuer.clone(),
        config.auth.access_token_minutes,
        config.auth.refresh_token_days,
    );

    let state = AppState {
        repository,
        jwt_manager,
    };

    let app = build_router(state, config.runtime.allowed_hosts.clone());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
