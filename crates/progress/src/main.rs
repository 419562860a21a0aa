use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use brightpath_progress::{telemetry, PointsService, ProgressConfig};

#[derive(Parser)]
#[command(name = "brightpath-progress")]
#[command(
    author,
    version,
    about = "Operator tool for BrightPath points records",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations and exit
    Migrate,
    /// Print a user's total and per-course summary
    Show {
        #[arg(long)]
        user_id: i64,
    },
    /// Wipe a user's progress and start them over
    Reset {
        #[arg(long)]
        user_id: i64,
    },
    /// Print the top users by points
    Leaderboard {
        #[arg(short, long)]
        limit: Option<i64>,
    },
    /// Recompute every stored document and repair drifted totals
    Audit,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let cli = Cli::parse();

    // --- Configuration ---
    let config = ProgressConfig::from_env()?;
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    // --- Database ---
    let pool = brightpath_db::create_pool(&database_url, config.db_max_connections)
        .await
        .context("Failed to connect to database")?;
    brightpath_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    brightpath_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    let service = PointsService::new(pool, config);

    match cli.command {
        Commands::Migrate => {}
        Commands::Show { user_id } => {
            let summary = service.summary(user_id).await?;
            tracing::debug!(user_id, total = summary.total_points, "Loaded progress summary");
            print_json(&summary)?;
        }
        Commands::Reset { user_id } => {
            let record = service.reset(user_id).await?;
            print_json(&record)?;
        }
        Commands::Leaderboard { limit } => {
            let board = service.leaderboard(limit).await?;
            print_json(&board)?;
        }
        Commands::Audit => {
            let report = service.audit().await?;
            print_json(&report)?;
        }
    }

    Ok(())
}
