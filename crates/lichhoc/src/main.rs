use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use lichhoc::{data, html, normalize, parser, server};

#[derive(Parser, Debug)]
#[command(name = "lichhoc")]
#[command(about = "Parse class timetable workbooks and serve a weekly grid view")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory holding workbook files and the timetable store
    #[arg(short, long, default_value = "data", global = true)]
    data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the web server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Import and generate a static HTML week view (no server)
    Build {
        /// Output path for the generated page
        #[arg(short, long, default_value = "index.html")]
        output: PathBuf,
    },

    /// Parse and normalize a specific workbook file
    Parse {
        /// Path to the workbook
        file: PathBuf,
    },
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level))
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("tower_http=warn".parse().unwrap());

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_max_level(Level::TRACE)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args.log_level);

    match args.command {
        // Default to serve if no command specified
        None => {
            server::serve(8080, args.data_dir).await?;
        }
        Some(Commands::Serve { port }) => {
            server::serve(port, args.data_dir).await?;
        }
        Some(Commands::Build { output }) => {
            let entries = data::load_or_import(&args.data_dir)?;
            let today = chrono::Local::now().date_naive();
            html::generate_html(&entries, today, &output)?;
            info!(path = %output.display(), "HTML saved");
        }
        Some(Commands::Parse { file }) => {
            let rows = parser::parse_workbook(&file)?;
            let entries = normalize::normalize(&rows);
            info!(count = entries.len(), file = %file.display(), "Found entries");
            for entry in &entries {
                info!(
                    id = entry.id,
                    course = %entry.course_name,
                    code = %entry.course_code,
                    weekday = entry.weekday,
                    start = %entry.start_time,
                    room = %entry.room,
                    "Entry"
                );
            }
        }
    }

    Ok(())
}
