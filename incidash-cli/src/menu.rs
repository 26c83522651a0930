//! Interactive six-view menu.
//!
//! Each pass re-reads the ticket file through a [`TableCache`], so edits to
//! the file show up on the next selection without restarting.

use anyhow::Context;
use dialoguer::Select;
use incidash_core::views::incident_numbers;
use incidash_core::{AlertCatalog, AlertFilter, DashboardConfig, TableCache, ViewMode, ViewOptions};

use crate::GlobalArgs;
use crate::commands::{data_path, format_report};
use crate::render::Renderer;

const EXIT_LABEL: &str = "Salir";
const VISIBLE_ITEMS: usize = 15;

/// Run the menu until the user picks "Salir" or aborts the prompt.
pub fn run(config: &DashboardConfig, args: &GlobalArgs) -> anyhow::Result<()> {
    let path = data_path(config, args);
    let options = ViewOptions::from(&config.report);
    let mut cache = TableCache::new();

    let mut items: Vec<&str> = ViewMode::MENU.to_vec();
    items.push(EXIT_LABEL);

    println!("\n  Dashboard de Incidentes TI724\n");
    let mut last = 0;
    loop {
        let Some(choice) = Select::new()
            .with_prompt("Seleccione una vista")
            .items(&items)
            .default(last)
            .interact_opt()?
        else {
            break;
        };
        if choice >= ViewMode::MENU.len() {
            break;
        }
        last = choice;

        let table = cache
            .get_or_load(&path, |p| incidash_core::load_prepared(p, config))
            .with_context(|| format!("Failed to load ticket data from {}", path.display()))?;

        let Some(mode) = prompt_selections(choice, &config.catalog, &table)? else {
            continue;
        };
        let report = incidash_core::render_view(&mode, &table, &options);
        print!(
            "\n{}",
            format_report(&report, args.format, Renderer::for_terminal(args.color))?
        );
        println!();
    }

    let stats = cache.stats();
    tracing::debug!(hits = stats.hits, loads = stats.loads, "Menu closed");
    Ok(())
}

/// Ask for the per-view selections of menu entry `choice`.
///
/// Returns `None` when the user backs out of a prompt.
fn prompt_selections(
    choice: usize,
    catalog: &AlertCatalog,
    table: &incidash_core::TicketTable,
) -> anyhow::Result<Option<ViewMode>> {
    let Some(mode) = ViewMode::from_menu_index(choice) else {
        return Ok(None);
    };
    Ok(match mode {
        ViewMode::KnownAlerts { .. } => {
            let choices = alert_choices(catalog);
            Select::new()
                .with_prompt("Seleccione el tipo de alerta")
                .items(&choices)
                .default(0)
                .max_length(VISIBLE_ITEMS)
                .interact_opt()?
                .map(|i| ViewMode::KnownAlerts {
                    filter: AlertFilter::from_selection(Some(choices[i].as_str())),
                })
        }
        ViewMode::IncidentDetail { .. } => {
            let numbers = incident_numbers(table);
            if numbers.is_empty() {
                Some(ViewMode::IncidentDetail { number: None })
            } else {
                Select::new()
                    .with_prompt("Seleccione un número de incidente")
                    .items(&numbers)
                    .default(0)
                    .max_length(VISIBLE_ITEMS)
                    .interact_opt()?
                    .map(|i| ViewMode::IncidentDetail {
                        number: Some(numbers[i].clone()),
                    })
            }
        }
        ViewMode::Advanced { .. } => {
            let columns = table.columns();
            if columns.is_empty() {
                return Ok(Some(ViewMode::Advanced { x: None, y: None }));
            }
            let (x_default, y_default) = default_axes(columns.len());
            let Some(x) = Select::new()
                .with_prompt("Seleccione la variable para el eje X")
                .items(columns)
                .default(x_default)
                .max_length(VISIBLE_ITEMS)
                .interact_opt()?
            else {
                return Ok(None);
            };
            Select::new()
                .with_prompt("Seleccione la variable para el eje Y")
                .items(columns)
                .default(y_default)
                .max_length(VISIBLE_ITEMS)
                .interact_opt()?
                .map(|y| ViewMode::Advanced {
                    x: Some(columns[x].clone()),
                    y: Some(columns[y].clone()),
                })
        }
        other => Some(other),
    })
}

/// Alert selector entries: "Todas" followed by the catalog labels.
fn alert_choices(catalog: &AlertCatalog) -> Vec<String> {
    std::iter::once(AlertFilter::ALL_LABEL)
        .chain(catalog.labels())
        .map(str::to_string)
        .collect()
}

/// Default heatmap axes: the second and third columns, clamped to the table.
fn default_axes(column_count: usize) -> (usize, usize) {
    let last = column_count.saturating_sub(1);
    (1.min(last), 2.min(last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_alert_choices_start_with_all() {
        let choices = alert_choices(&AlertCatalog::default());
        assert_eq!(choices[0], "Todas");
        assert_eq!(choices.len(), 1 + AlertCatalog::default().labels().len());
        assert_eq!(
            AlertFilter::from_selection(Some(choices[0].as_str())),
            AlertFilter::All
        );
    }

    #[test]
    fn test_default_axes() {
        assert_eq!(default_axes(7), (1, 2));
        assert_eq!(default_axes(2), (1, 1));
        assert_eq!(default_axes(1), (0, 0));
    }

    #[test]
    fn test_plain_views_need_no_prompt() {
        let table = incidash_core::TicketTable::new(Vec::new());
        let catalog = AlertCatalog::default();
        for choice in [0, 2, 3] {
            let mode = prompt_selections(choice, &catalog, &table).unwrap();
            assert_eq!(mode, ViewMode::from_menu_index(choice));
        }
    }
}
