use std::time::Duration;

use clap::{Parser, ValueEnum};

/// Storage backend for flags and rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    /// PostgreSQL via `DATABASE_URL`
    Postgres,
    /// Process-local, lost on restart
    Memory,
}

/// Flag service configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "flagr")]
#[command(about = "Feature flag evaluation service")]
pub struct Config {
    /// HTTP server listen address
    #[arg(long, default_value = "0.0.0.0:8080", env = "FLAGR_LISTEN_ADDR")]
    pub listen_addr: String,

    /// Storage backend
    #[arg(long, value_enum, default_value = "memory", env = "FLAGR_STORE")]
    pub store: StoreBackend,

    /// PostgreSQL connection string (required for the postgres backend)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Minimum pooled database connections
    #[arg(long, default_value = "1", env = "FLAGR_DB_MIN_CONNECTIONS")]
    pub db_min_connections: u32,

    /// Maximum pooled database connections
    #[arg(long, default_value = "10", env = "FLAGR_DB_MAX_CONNECTIONS")]
    pub db_max_connections: u32,

    /// Apply SQL migrations on startup
    #[arg(long, default_value = "true", env = "FLAGR_RUN_MIGRATIONS")]
    pub run_migrations: bool,

    /// Latency budget in milliseconds for the evaluation endpoint
    #[arg(long, default_value = "50", env = "FLAGR_LATENCY_BUDGET_MS")]
    pub latency_budget_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, default_value = "false", env = "FLAGR_LOG_JSON")]
    pub log_json: bool,

    /// Enable graceful shutdown
    #[arg(long, default_value = "true", env = "FLAGR_GRACEFUL_SHUTDOWN")]
    pub graceful_shutdown: bool,

    /// Graceful shutdown timeout in seconds
    #[arg(long, default_value = "30", env = "FLAGR_SHUTDOWN_TIMEOUT_SECS")]
    pub shutdown_timeout_secs: u64,
}

impl Config {
    /// Get shutdown timeout as Duration.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Database URL for the postgres backend.
    pub fn require_database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set when FLAGR_STORE=postgres"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_addr: "0.0.0.0:8080".to_string(),
            store: StoreBackend::Memory,
            database_url: None,
            db_min_connections: 1,
            db_max_connections: 10,
            run_migrations: true,
            latency_budget_ms: 50,
            log_level: "info".to_string(),
            log_json: false,
            graceful_shutdown: true,
            shutdown_timeout_secs: 30,
        }
    }
}
