//! # incidash Core
//!
//! Core library for incidash, the incident ticket dashboard.
//! Loads ticket exports, labels known alerts from the note fields, and
//! aggregates the labeled table into the six reporting views.

pub mod aggregate;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod error;
pub mod loader;
pub mod prepare;
pub mod types;
pub mod views;

use std::path::Path;

// Re-export commonly used types at the crate root.
pub use aggregate::{AlertFilter, FrequencyTable, Recommendation, SummaryMetrics};
pub use cache::TableCache;
pub use classifier::{AlertCatalog, CatalogEntry, classify};
pub use config::{DashboardConfig, config_exists, load_config};
pub use error::{AggregationError, ConfigError, IncidashError, LoadError, Result};
pub use prepare::{PrepareOptions, prepare};
pub use types::{CellValue, Row, TicketTable, columns};
pub use views::{Notice, NoticeLevel, Section, ViewMode, ViewOptions, ViewReport, render_view};

/// Load the ticket file at `path` and prepare it for the views.
pub fn load_prepared(path: &Path, config: &DashboardConfig) -> Result<TicketTable> {
    let raw = loader::load_table(path, config.data.sheet.as_deref())?;
    Ok(prepare(
        &raw,
        &PrepareOptions::new(&config.catalog, &config.report),
    ))
}
