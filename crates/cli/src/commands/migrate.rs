use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use keel_core::AppConfig;
use keel_orm::{
    create_migration, load_migrations, ConsoleReporter, MigrationConfig, MigrationRegistry,
    MigrationRunner, MigrationState, MigrationStatus, PostgresDatabase, PostgresPoolConfig,
};

pub fn help() {
    println!("'migrate' task usage:");
    println!();
    println!("    list    shows all registered migrations");
    println!("    up      runs the 'up' part for all pending migrations");
    println!("    down    runs the 'down' part of the latest migration");
    println!("    create  creates a new migration file in the migrations directory");
    println!();
}

/// Load every migration file from the configured directory
pub fn load_registry(config: &AppConfig) -> anyhow::Result<MigrationRegistry> {
    let mut registry = MigrationRegistry::new();
    load_migrations(&config.migrations_dir, &mut registry).with_context(|| {
        format!(
            "failed to load migrations from '{}'",
            config.migrations_dir.display()
        )
    })?;
    Ok(registry)
}

async fn connect(config: &AppConfig, pool: PostgresPoolConfig) -> anyhow::Result<PostgresDatabase> {
    let url = config.database_url()?;
    let db = PostgresDatabase::connect_with(url, pool).await?;
    Ok(db)
}

async fn runner(config: &AppConfig) -> anyhow::Result<MigrationRunner> {
    let registry = load_registry(config)?;
    let db = connect(config, PostgresPoolConfig::default()).await?;
    let runner = MigrationRunner::new(registry, Arc::new(db), &MigrationConfig::from(config))?
        .with_reporter(ConsoleReporter);
    Ok(runner)
}

/// What `migrate list` can show
#[derive(Debug)]
enum Listing {
    /// Registered migrations with their ledger state
    Status(Vec<MigrationStatus>),
    /// Registered ids only, when the ledger could not be read
    Registered(Vec<String>),
}

/// Any failure to reach or read the ledger degrades to the bare registered list
fn listing(ids: Vec<String>, status: anyhow::Result<Vec<MigrationStatus>>) -> Listing {
    match status {
        Ok(status) => Listing::Status(status),
        Err(e) => {
            tracing::warn!(error = %e, "migrations ledger unavailable, listing registered migrations only");
            Listing::Registered(ids)
        }
    }
}

pub async fn list(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    let pool = PostgresPoolConfig {
        max_connections: 1,
        acquire_timeout: Duration::from_secs(3),
    };

    let registry = load_registry(config)?;
    let ids: Vec<String> = registry.ids().into_iter().map(str::to_string).collect();

    let status = async {
        let db = connect(config, pool).await?;
        let runner = MigrationRunner::new(registry, Arc::new(db), &MigrationConfig::from(config))?;
        Ok::<_, anyhow::Error>(runner.status().await?)
    }
    .await;

    let shown = listing(ids, status);

    if json {
        let output = match &shown {
            Listing::Status(status) => serde_json::to_string_pretty(status)?,
            Listing::Registered(ids) => serde_json::to_string_pretty(ids)?,
        };
        println!("{}", output);
        return Ok(());
    }

    println!();
    match shown {
        Listing::Status(status) => {
            for migration in status {
                let marker = if migration.is_applied() { "applied" } else { "pending" };
                println!("    {}  {}", migration.id, marker);
            }
        }
        Listing::Registered(ids) => {
            for id in ids {
                println!("    {}", id);
            }
        }
    }
    println!();
    Ok(())
}

pub async fn up(config: &AppConfig) -> anyhow::Result<()> {
    let runner = runner(config).await?;
    println!();
    let result = runner.run_up(None).await?;
    if result.applied_count() > 0 {
        println!();
    }
    Ok(())
}

pub async fn down(config: &AppConfig) -> anyhow::Result<()> {
    let runner = runner(config).await?;
    println!();
    let result = runner.run_down(1).await?;
    if result.rolled_back.is_some() {
        println!();
    }
    Ok(())
}

pub fn create(config: &AppConfig, name: Option<&str>) -> anyhow::Result<()> {
    let path = create_migration(&config.migrations_dir, name, Utc::now())?;
    println!("\nCreated migration file '{}'\n", path.display());
    Ok(())
}
