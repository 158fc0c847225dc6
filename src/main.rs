//! Podgist CLI entry point.

use anyhow::Result;
use clap::Parser;
use podgist::cli::{commands, Cli, Commands};
use podgist::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("podgist={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Ensure data directories exist
    std::fs::create_dir_all(settings.data_dir())?;
    std::fs::create_dir_all(settings.temp_dir())?;

    // Execute command
    match &cli.command {
        Commands::Doctor => {
            commands::run_doctor(&settings)?;
        }

        Commands::Ingest {
            url,
            guid,
            title,
            number,
            force,
        } => {
            commands::run_ingest(url, guid, title, *number, *force, settings).await?;
        }

        Commands::Rechunk { guid } => {
            commands::run_rechunk(guid, settings).await?;
        }

        Commands::Summarize { guid } => {
            commands::run_summarize(guid, settings).await?;
        }

        Commands::Search {
            query,
            mode,
            limit,
            threshold,
        } => {
            commands::run_search(query, mode, *limit, *threshold, settings).await?;
        }

        Commands::Ask { question } => {
            commands::run_ask(question, cli.verbose > 0, settings).await?;
        }

        Commands::List => {
            commands::run_list(settings).await?;
        }

        Commands::Delete { guid } => {
            commands::run_delete(guid, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings)?;
        }
    }

    Ok(())
}
