mod commands;
mod logging;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::*;
use keel_core::{AppConfig, AppConfigTrait};

#[derive(Parser)]
#[command(name = "keel")]
#[command(about = "keel application tasks", version)]
struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database migration management
    Migrate {
        #[command(subcommand)]
        migrate_command: Option<MigrateCommands>,
    },

    /// Sortable id helpers
    Id {
        #[command(subcommand)]
        id_command: IdCommands,
    },

    /// Show the resolved configuration
    Config,
}

#[derive(Subcommand)]
enum MigrateCommands {
    /// Show all registered migrations
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the 'up' part of all pending migrations
    Up,

    /// Run the 'down' part of the latest migration
    Down,

    /// Create a new migration file in the migrations directory
    Create {
        /// Descriptive suffix, normalized to snake_case
        name: Option<String>,
    },
}

#[derive(Subcommand)]
enum IdCommands {
    /// Generate new ids
    Next {
        /// Shard to generate for (defaults to ID_SHARD)
        #[arg(long)]
        shard: Option<i64>,

        /// How many ids to print
        #[arg(long, short = 'n', default_value_t = 1)]
        count: usize,
    },

    /// Split an id into time, shard and sequence
    Split {
        /// The id to decode
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::from_env().context("invalid configuration")?;
    logging::init_logging(&config, cli.json_logs).context("failed to initialize logging")?;
    tracing::debug!(
        environment = %config.environment,
        migrations_dir = %config.migrations_dir.display(),
        migrations_table = %config.migrations_table,
        "loaded configuration"
    );

    match cli.command {
        Commands::Migrate { migrate_command } => match migrate_command {
            None => migrate::help(),
            Some(MigrateCommands::List { json }) => migrate::list(&config, json).await?,
            Some(MigrateCommands::Up) => migrate::up(&config).await?,
            Some(MigrateCommands::Down) => migrate::down(&config).await?,
            Some(MigrateCommands::Create { name }) => migrate::create(&config, name.as_deref())?,
        },
        Commands::Id { id_command } => match id_command {
            IdCommands::Next { shard, count } => id::next(&config, shard, count),
            IdCommands::Split { id, json } => id::split(&id, json)?,
        },
        Commands::Config => config::show(&config),
    }

    Ok(())
}
