//! Taixuong - CLI client for the lichhoc timetable API.
//!
//! Consumes the service's two endpoints: fetches the current entry batch
//! as JSON, or uploads a timetable workbook.

mod client;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

use config::ApiConfig;

#[derive(Parser)]
#[command(name = "taixuong")]
#[command(about = "CLI client for the lichhoc timetable API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the current timetable JSON from the read endpoint
    Fetch {
        /// Base URL of the service (falls back to LICHHOC_URL, then localhost)
        #[arg(long)]
        url: Option<String>,

        /// Output directory for the fetched JSON
        /// Default: ./data
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Upload a workbook file, then re-fetch the resulting timetable
    Upload {
        /// Base URL of the service (falls back to LICHHOC_URL, then localhost)
        #[arg(long)]
        url: Option<String>,

        /// Output directory for the re-fetched JSON
        /// Default: ./data
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Path to the workbook file (.xlsx, .xls, .xlsb, .ods)
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch { url, output } => {
            let config = ApiConfig::resolve(url);
            let output_dir = output.unwrap_or_else(|| PathBuf::from("data"));

            if let Err(e) = client::fetch_entries(&config, &output_dir).await {
                error!("Fetch failed: {:#}", e);
                return Err(e);
            }
        }
        Commands::Upload { url, output, file } => {
            let config = ApiConfig::resolve(url);
            let output_dir = output.unwrap_or_else(|| PathBuf::from("data"));

            if let Err(e) = client::upload_workbook(&config, &file).await {
                error!("Upload failed: {:#}", e);
                return Err(e);
            }

            // A successful upload replaces the service's timetable;
            // re-fetch so the local copy reflects it
            if let Err(e) = client::fetch_entries(&config, &output_dir).await {
                error!("Re-fetch after upload failed: {:#}", e);
                return Err(e);
            }
        }
    }

    Ok(())
}
