use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

use flagr::api::routes::{create_router, AppState};
use flagr::config::{Config, StoreBackend};
use flagr::observability::init_tracing;
use flagr::storage::{MemoryStore, PostgresStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration
    let config = Config::parse();

    // Initialize tracing
    init_tracing(&config.log_level, config.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        store = ?config.store,
        "Starting flagr evaluation service"
    );

    // Open the store and build application state
    let mut postgres = None;
    let state = match config.store {
        StoreBackend::Postgres => {
            let store = PostgresStore::connect(
                config.require_database_url()?,
                config.db_min_connections,
                config.db_max_connections,
            )
            .await?;
            info!(
                max_connections = config.db_max_connections,
                "Connected to PostgreSQL"
            );

            if config.run_migrations {
                store.run_migrations().await?;
                info!("Database migrations applied");
            }

            let store = Arc::new(store);
            postgres = Some(store.clone());
            AppState::new(store, config.latency_budget_ms)
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store, flags are lost on restart");
            AppState::new(Arc::new(MemoryStore::new()), config.latency_budget_ms)
        }
    };

    // Create router
    let app = create_router(Arc::new(state));

    // Parse listen address
    let addr: SocketAddr = config.listen_addr.parse()?;

    info!(addr = %addr, "Starting HTTP server");

    // Create TCP listener
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run server with graceful shutdown
    if config.graceful_shutdown {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
    } else {
        axum::serve(listener, app).await?;
    }

    // Cleanup
    info!("Shutting down...");
    if let Some(store) = postgres {
        if tokio::time::timeout(config.shutdown_timeout(), store.pool().close())
            .await
            .is_err()
        {
            warn!("Timed out closing database pool");
        }
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}
