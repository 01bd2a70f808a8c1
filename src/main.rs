//! Fear & Greed notifier - daily sentiment report for US market days
//!
//! Meant to run once a day from a scheduler. Closed market days exit
//! successfully without sending anything.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;

use fng_notifier::cli::{commands, OutputFormat};
use fng_notifier::config::{Config, SourceMode};

/// Fear & Greed Index notifier
#[derive(Parser)]
#[command(name = "fng")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "fng.toml", global = true)]
    config: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Output format for command results
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the index and send today's report
    Run {
        /// Date to run for (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Override the configured source: api or scrape
        #[arg(long)]
        source: Option<SourceMode>,

        /// Print the message instead of sending it
        #[arg(long)]
        dry_run: bool,
    },

    /// Show whether the market is open and list the year's holidays
    Calendar {
        /// Date to check (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Year to list holidays for (default: the date's year)
        #[arg(long)]
        year: Option<i32>,
    },

    /// Run the extraction pipeline against a saved HTML file
    Extract {
        /// Path to the saved page
        file: PathBuf,
    },

    /// Fetch the page and report its structure
    Diagnose {
        /// Send the report to Telegram as well
        #[arg(long)]
        send: bool,
    },

    /// Show current configuration (secrets masked)
    Config,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("fng_notifier=info".parse().expect("Invalid log directive"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    init_tracing(cli.json);

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Execute command
    let format = cli.format;
    let result = match cli.command {
        Commands::Run { date, source, dry_run } => commands::run(&config, date, source, dry_run, format).await,
        Commands::Calendar { date, year } => commands::calendar(&config, date, year, format),
        Commands::Extract { file } => commands::extract(&config, &file, format),
        Commands::Diagnose { send } => commands::diagnose(&config, send, format).await,
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
