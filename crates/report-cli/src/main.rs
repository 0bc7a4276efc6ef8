//! Report App binary.
//!
//! ```bash
//! REPORT_API_URL=https://bot.example/api report-app watch
//! ```

use clap::Parser;
use report_cli::cli::Cli;
use report_cli::commands;
use report_core::{config, AppConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load environment variables from config directory first
    let env_path = config::env_file();
    if env_path.exists() {
        let _ = dotenvy::from_path(&env_path);
    }
    // Then local .env.local or .env
    let _ = dotenvy::from_filename(".env.local").or_else(|_| dotenvy::dotenv());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(cli.log_filter()).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let mut app_config = AppConfig::from_env()?;
    if let Some(dir) = cli.state_dir.clone() {
        app_config = app_config.with_state_dir(dir);
    } else if let Err(e) = config::ensure_all_dirs() {
        tracing::warn!(error = %e, "Failed to create state directories");
    }

    if let Err(e) = commands::execute(cli.command, &app_config).await {
        tracing::debug!(error = %e, "command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
