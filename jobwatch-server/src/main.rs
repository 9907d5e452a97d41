//! Jobwatch Server
//!
//! Grants short-lived, credential-scoped access to MySQL databases and
//! watches their job tables in the background.
//!
//! Architecture:
//! - Configuration: settings from environment with defaults
//! - Repositories: session store backends with per-entry expiry
//! - Remote: per-check MySQL connections and the fixed job queries
//! - Services: session creation, on-demand job listing, poller ownership
//! - Scheduler: discovery plus one independently timed task per session
//! - API: thin axum adapter over the services

mod api;
mod config;
mod db;
mod error;
mod metrics;
mod remote;
mod repository;
mod scheduler;
mod service;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::remote::MySqlConnectionFactory;
use crate::repository::{MemorySessionStore, PgSessionStore, SessionStore};
use crate::service::JobWatch;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jobwatch_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Jobwatch");

    let config = load_config()?;
    info!(
        "Loaded configuration: bind_addr={}, session_ttl={:?}, discovery_interval={:?}",
        config.bind_addr, config.session_ttl, config.discovery_interval
    );

    let store = build_session_store(&config).await?;
    let watch = Arc::new(JobWatch::new(
        &config,
        store,
        Arc::new(MySqlConnectionFactory),
    ));

    watch.start_background_polling();

    let app = api::create_router(Arc::clone(&watch));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    watch.shutdown().await;
    info!("Jobwatch stopped");

    Ok(())
}

/// Loads and validates configuration from the environment
fn load_config() -> Result<Config> {
    let config = Config::from_env().context("Invalid configuration")?;
    config.validate()?;
    Ok(config)
}

/// Connects to PostgreSQL when configured, otherwise keeps sessions in process
async fn build_session_store(config: &Config) -> Result<Arc<dyn SessionStore>> {
    let Some(url) = &config.session_store_url else {
        warn!("SESSION_STORE_URL not set, sessions are kept in memory and lost on restart");
        return Ok(Arc::new(MemorySessionStore::new()));
    };

    info!("Connecting to session store...");
    let pool = db::create_pool(url, config.store_timeout)
        .await
        .context("Failed to create session store pool")?;

    db::run_migrations(&pool)
        .await
        .context("Failed to run session store migrations")?;

    Ok(Arc::new(PgSessionStore::new(pool)))
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received");
}
