mod sections;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "nearbuy-cli")]
#[command(about = "Nearbuy operator command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Upsert suggestion sections from the sections file
    SeedSections {
        /// Sections file (defaults to `NEARBUY_SECTIONS_PATH`)
        #[arg(long)]
        path: Option<PathBuf>,
        /// Validate and print the sections without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate the sections file without touching the database
    CheckSections {
        #[arg(long, env = "NEARBUY_SECTIONS_PATH", default_value = "./config/sections.yaml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Migrate => {
            let config = nearbuy_core::load_app_config()?;
            let pool = connect(&config).await?;
            let applied = nearbuy_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::SeedSections { path, dry_run } => {
            let config = nearbuy_core::load_app_config()?;
            let path = path.unwrap_or_else(|| config.sections_path.clone());
            if dry_run {
                sections::run_check_sections(&path)?;
            } else {
                let pool = connect(&config).await?;
                sections::run_seed_sections(&pool, &path).await?;
            }
        }
        Commands::CheckSections { path } => sections::run_check_sections(&path)?,
    }

    Ok(())
}

async fn connect(config: &nearbuy_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = nearbuy_db::PoolConfig::from_app_config(config);
    let pool = nearbuy_db::connect_pool(&config.database_url, pool_config).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests;
