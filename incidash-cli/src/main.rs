//! incidash CLI: terminal dashboard over incident ticket exports.
//!
//! Runs one view per invocation, or the interactive six-view menu.

mod commands;
mod menu;
mod render;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// incidash: known-alert reporting over incident ticket exports
#[derive(Parser, Debug)]
#[command(name = "incidash", version, about, long_about = None)]
struct Cli {
    /// Ticket export to read (.xlsx, .xls, .ods or .csv)
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,

    /// Sheet to read (defaults to the first sheet)
    #[arg(short, long, global = true)]
    sheet: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    /// Workspace directory
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Disable ANSI colors in text output
    #[arg(long, global = true)]
    no_color: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum Commands {
    /// Top resolvers, resolver x status heatmap and distribution
    Resolvers {
        /// Number of resolvers in the chart
        #[arg(long)]
        top: Option<usize>,
    },
    /// Known-alert incidents with a resolver suggestion
    Alerts {
        /// Alert type to show ("Todas" or omitted for every known alert)
        #[arg(short = 't', long = "type")]
        alert_type: Option<String>,
    },
    /// Headline metrics and status distribution
    Summary,
    /// Most repeated note texts
    Phrases {
        /// Number of phrases in the chart
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Every field of one incident
    Incident {
        /// Incident number (defaults to the first incident)
        number: Option<String>,
    },
    /// Heatmap of two columns plus the numeric correlation matrix
    Advanced {
        /// Column for the heatmap rows
        #[arg(long)]
        x: Option<String>,
        /// Column for the heatmap columns
        #[arg(long)]
        y: Option<String>,
    },
    /// Interactive six-view menu
    Menu,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum ConfigAction {
    /// Create default configuration file
    Init,
    /// Show current configuration
    Show,
}

/// Global options shared by every subcommand handler.
#[derive(Debug, Clone)]
pub(crate) struct GlobalArgs {
    pub workspace: PathBuf,
    pub data: Option<PathBuf>,
    pub sheet: Option<String>,
    pub format: OutputFormat,
    pub color: bool,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "incidash", "incidash")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "incidash.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let args = GlobalArgs {
        workspace,
        data: cli.data,
        sheet: cli.sheet,
        format: cli.format,
        color: !cli.no_color && cli.format == OutputFormat::Text,
    };
    commands::handle_command(cli.command, &args)
}
