mod config;
mod serve_cmd;
#[cfg(test)]
mod test_util;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use fitplan_core::{GroqClient, PgPlanStore, PlanGenerator, PlanService};
use fitplan_db::pool::{self, DatabaseState};
use fitplan_db::queries::plans;

use config::FitplanConfig;

#[derive(Parser)]
#[command(
    name = "fitplan",
    about = "Generate weekly workout and diet plans with an LLM"
)]
struct Cli {
    /// Database URL (overrides FITPLAN_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a fitplan config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/fitplan")]
        db_url: String,
        /// Groq API key to store in the config file
        #[arg(long)]
        api_key: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the fitplan database and run migrations
    DbInit,
    /// Start the HTTP API server
    Serve {
        /// Address to bind to
        #[arg(long, default_value = "0.0.0.0")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 8000)]
        port: u16,
        /// Model to request plans from (overrides FITPLAN_MODEL)
        #[arg(long)]
        model: Option<String>,
    },
}

/// Execute the `fitplan init` command: write config file.
fn cmd_init(db_url: &str, api_key: Option<String>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let has_key = api_key.is_some();
    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        generation: config::GenerationSection {
            api_key,
            ..Default::default()
        },
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    if has_key {
        println!("  generation.api_key = (set)");
    } else {
        println!(
            "  generation.api_key not set; export {} before `fitplan serve`",
            config::API_KEY_ENV
        );
    }
    println!();
    println!("Next: run `fitplan db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `fitplan db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = FitplanConfig::resolve(cli_db_url, None)?;

    println!("Initializing fitplan database...");

    match pool::ensure_database_exists(&resolved.db_config).await? {
        DatabaseState::Created => println!("Created database."),
        DatabaseState::Existing => println!("Database already exists."),
    }

    let db_pool = pool::open_store(&resolved.db_config).await?;
    let stored = plans::count_plans(&db_pool).await;
    db_pool.close().await;

    println!("Database ready. {} plans stored.", stored?);
    println!("fitplan db-init complete.");
    Ok(())
}

/// Execute the `fitplan serve` command: wire the store and generator into a
/// service and run the HTTP server until Ctrl+C.
async fn cmd_serve(
    cli_db_url: Option<&str>,
    cli_model: Option<&str>,
    bind: &str,
    port: u16,
) -> anyhow::Result<()> {
    let resolved = FitplanConfig::resolve(cli_db_url, cli_model)?;
    let groq = GroqClient::new(resolved.groq_config()?)?;
    info!(
        provider = groq.name(),
        model = groq.model(),
        timeout_secs = resolved.generation.timeout.as_secs(),
        "generation client ready"
    );

    let db_pool = pool::open_store(&resolved.db_config).await?;

    let service = PlanService::new(Arc::new(PgPlanStore::new(db_pool.clone())), Arc::new(groq));
    let result = serve_cmd::run_serve(service, bind, port).await;
    db_pool.close().await;
    result
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            db_url,
            api_key,
            force,
        } => {
            cmd_init(&db_url, api_key, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Serve { bind, port, model } => {
            cmd_serve(cli.database_url.as_deref(), model.as_deref(), &bind, port).await?;
        }
    }

    Ok(())
}
