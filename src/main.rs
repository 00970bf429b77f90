mod commands;
mod render;
mod session;

use std::path::PathBuf;

use anyhow::{Context, Result};
use calgrid_core::config::CalgridConfig;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "calgrid")]
#[command(about = "Browse a month grid of your calendar and add, edit or delete events")]
struct Cli {
    /// Use this config file instead of ~/.config/calgrid/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List visible calendars
    Calendars,
    /// Show the month grid
    Month {
        /// Month to show (YYYY-MM), defaults to the current month
        month: Option<String>,

        /// Day to highlight and list (YYYY-MM-DD)
        #[arg(short, long)]
        select: Option<String>,
    },
    /// List the events of one day
    Day {
        /// Day to list (YYYY-MM-DD), defaults to today
        date: Option<String>,
    },
    /// Add an event
    Add {
        /// Event title
        title: String,

        /// Day of the event (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,

        /// Start time (HH:MM), defaults to the start of the day
        #[arg(long)]
        at: Option<String>,

        /// Duration (e.g., "30m", "1h", "2h30m"), defaults to event_duration from config
        #[arg(short = 'D', long)]
        duration: Option<String>,

        /// Calendar id to add the event to (defaults to default_calendar from config)
        #[arg(short, long)]
        calendar: Option<i64>,
    },
    /// Rename an event
    Edit {
        /// Event id
        id: i64,

        /// New title
        title: String,
    },
    /// Delete an event
    Delete {
        /// Event id
        id: i64,
    },
    /// Grant or revoke calendar access
    Permission {
        #[command(subcommand)]
        action: PermissionAction,
    },
    /// Show configuration paths and settings
    Config,
}

#[derive(Subcommand, Clone, Copy)]
enum PermissionAction {
    /// Allow calgrid to read and write calendars
    Grant,
    /// Take calendar access away again
    Revoke,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => CalgridConfig::config_path()?,
    };
    let config = CalgridConfig::load_from(&config_path)
        .with_context(|| format!("Could not load {}", config_path.display()))?;

    match cli.command {
        Commands::Calendars => commands::calendars::run(&config).await,
        Commands::Month { month, select } => {
            commands::month::run(&config, month.as_deref(), select.as_deref()).await
        }
        Commands::Day { date } => commands::day::run(&config, date.as_deref()).await,
        Commands::Add {
            title,
            date,
            at,
            duration,
            calendar,
        } => {
            let request = commands::add::AddRequest {
                title,
                date,
                at,
                duration,
                calendar,
            };
            commands::add::run(&config, request).await
        }
        Commands::Edit { id, title } => commands::edit::run(&config, id, &title).await,
        Commands::Delete { id } => commands::delete::run(&config, id).await,
        Commands::Permission { action } => {
            commands::permission::run(&config, matches!(action, PermissionAction::Grant)).await
        }
        Commands::Config => commands::config::run(&config_path, &config),
    }
}

/// Log to stderr, filtered by RUST_LOG (warnings only by default).
fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
