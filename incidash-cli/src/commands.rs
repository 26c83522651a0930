//! CLI subcommand handlers.

use std::path::{Path, PathBuf};

use anyhow::Context;
use incidash_core::{
    AlertFilter, DashboardConfig, TicketTable, ViewMode, ViewOptions, ViewReport, render_view,
};

use crate::render::Renderer;
use crate::{Commands, ConfigAction, GlobalArgs, OutputFormat};

/// Handle a CLI subcommand.
pub fn handle_command(command: Commands, args: &GlobalArgs) -> anyhow::Result<()> {
    match command {
        Commands::Config { action } => handle_config(action, &args.workspace),
        Commands::Menu => {
            let config = effective_config(args)?;
            crate::menu::run(&config, args)
        }
        command => {
            let output = run_view(command, args)?;
            print!("{output}");
            Ok(())
        }
    }
}

fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = incidash_core::config::workspace_config_path(workspace);
            if let Some(config_dir) = config_path.parent() {
                std::fs::create_dir_all(config_dir)?;
            }

            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let default_config = DashboardConfig::default();
            let toml_str = toml::to_string_pretty(&default_config)?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            println!("{}", show_config(workspace)?);
            Ok(())
        }
    }
}

/// Effective configuration as TOML, flagged when only defaults apply.
fn show_config(workspace: &Path) -> anyhow::Result<String> {
    let config = incidash_core::load_config(Some(workspace), None)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    let toml_str = toml::to_string_pretty(&config)?;
    if incidash_core::config_exists(Some(workspace)) {
        Ok(toml_str)
    } else {
        Ok(format!("{NO_CONFIG_HEADER}\n{toml_str}"))
    }
}

const NO_CONFIG_HEADER: &str =
    "# No configuration file found; showing defaults (run `incidash config init`)";

/// Layered configuration with the `--sheet` override applied.
pub(crate) fn effective_config(args: &GlobalArgs) -> anyhow::Result<DashboardConfig> {
    let mut config = incidash_core::load_config(Some(&args.workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    if let Some(sheet) = &args.sheet {
        config.data.sheet = Some(sheet.clone());
    }
    Ok(config)
}

/// Ticket file to read: `--data` when given, else the configured path.
pub(crate) fn data_path(config: &DashboardConfig, args: &GlobalArgs) -> PathBuf {
    match &args.data {
        Some(path) => path.clone(),
        None => config.data_path(&args.workspace),
    }
}

pub(crate) fn load_table(path: &Path, config: &DashboardConfig) -> anyhow::Result<TicketTable> {
    incidash_core::load_prepared(path, config)
        .with_context(|| format!("Failed to load ticket data from {}", path.display()))
}

/// Map a view subcommand to its mode, applying per-view overrides to `options`.
fn view_request(command: Commands, options: &mut ViewOptions) -> Option<ViewMode> {
    Some(match command {
        Commands::Resolvers { top } => {
            if let Some(top) = top {
                options.top_resolvers = top;
            }
            ViewMode::ResolverGroups
        }
        Commands::Alerts { alert_type } => ViewMode::KnownAlerts {
            filter: AlertFilter::from_selection(alert_type.as_deref()),
        },
        Commands::Summary => ViewMode::Summary,
        Commands::Phrases { limit } => {
            if let Some(limit) = limit {
                options.top_phrases = limit;
            }
            ViewMode::PhraseAnalysis
        }
        Commands::Incident { number } => ViewMode::IncidentDetail { number },
        Commands::Advanced { x, y } => ViewMode::Advanced { x, y },
        Commands::Menu | Commands::Config { .. } => return None,
    })
}

/// Load the data, build one view and format it.
fn run_view(command: Commands, args: &GlobalArgs) -> anyhow::Result<String> {
    let config = effective_config(args)?;
    let mut options = ViewOptions::from(&config.report);
    let mode = view_request(command, &mut options)
        .ok_or_else(|| anyhow::anyhow!("Not a view command"))?;

    let path = data_path(&config, args);
    let table = load_table(&path, &config)?;
    tracing::debug!(view = mode.menu_label(), rows = table.len(), "Rendering view");

    let report = render_view(&mode, &table, &options);
    format_report(&report, args.format, Renderer::for_terminal(args.color))
}

/// Format a report for output.
pub(crate) fn format_report(
    report: &ViewReport,
    format: OutputFormat,
    renderer: Renderer,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => Ok(renderer.render(report)),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(report)?;
            json.push('\n');
            Ok(json)
        }
    }
}
