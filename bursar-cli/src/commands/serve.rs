//! HTTP server command

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use bursar_server::store::migrations;
use bursar_server::{create_pool, run_server, AppState, MemoryStore, PgStore, Settings, Store};

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (default: BIND_ADDR:PORT, i.e. 0.0.0.0:5000)
    #[arg(long, short = 'b')]
    pub bind: Option<SocketAddr>,

    /// Database URL (overrides DATABASE_URL from the environment)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Keep all data in process memory instead of PostgreSQL (ignores DATABASE_URL)
    #[arg(long)]
    pub in_memory: bool,
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let mut settings = Settings::from_env().context("Invalid server configuration")?;
    if let Some(bind) = args.bind {
        settings.bind_addr = bind;
    }
    if args.database_url.is_some() {
        settings.database_url = args.database_url;
    }

    let store: Arc<dyn Store> = if args.in_memory {
        tracing::warn!("Using in-memory store; data is lost on shutdown");
        Arc::new(MemoryStore::new())
    } else {
        let database_url = settings
            .database_url
            .as_deref()
            .context("DATABASE_URL not set. Set via --database-url, DATABASE_URL env, or .env")?;

        let pool = create_pool(database_url, settings.database_max_connections)
            .await
            .context("Failed to create database pool")?;
        migrations::run(&pool)
            .await
            .context("Failed to run migrations")?;
        tracing::info!("Database schema up to date");
        Arc::new(PgStore::new(pool))
    };

    tracing::info!(
        env = ?settings.environment,
        bind = %settings.bind_addr,
        "Starting bursar server"
    );

    let state = AppState::from_settings(store, settings);
    run_server(Arc::new(state))
        .await
        .context("Server error")?;

    Ok(())
}
