//! Schema migration command

use anyhow::{Context, Result};
use clap::Parser;

use bursar_server::create_pool;
use bursar_server::store::migrations;

/// Arguments for the migrate command
#[derive(Parser, Debug)]
pub struct MigrateArgs {
    /// Database URL to migrate
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,
}

/// Apply the schema. Safe to run repeatedly.
pub async fn run_migrate(args: MigrateArgs) -> Result<()> {
    let pool = create_pool(&args.database_url, 1)
        .await
        .context("Failed to connect to database")?;

    migrations::run(&pool)
        .await
        .context("Failed to run migrations")?;

    tracing::info!("Migrations applied");
    Ok(())
}
