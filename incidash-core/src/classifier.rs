//! Known-alert classification.
//!
//! Tags each ticket with a short label when one of its two note fields
//! contains a catalog phrase. Matching is a case-insensitive substring test.
//!
//! Catalog entries are scanned in declared order and a later match overwrites
//! an earlier one, so a ticket matching several phrases carries the label of
//! the *last* matching entry. Callers relying on "first match" semantics must
//! reorder the catalog instead.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{CellValue, Row, TicketTable, columns};

/// One catalog rule: a literal phrase and the label it assigns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub phrase: String,
    pub label: String,
}

impl CatalogEntry {
    pub fn new(phrase: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
            label: label.into(),
        }
    }
}

/// Ordered phrase -> label catalog of known alert types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertCatalog {
    pub entries: Vec<CatalogEntry>,
}

impl Default for AlertCatalog {
    fn default() -> Self {
        Self {
            entries: vec![
                CatalogEntry::new(
                    "Se valida la alerta y ya se encuentra superada",
                    "Superada",
                ),
                CatalogEntry::new(
                    "Se valida alerta y la misma obedece a un consumo elevado por procesos de Java",
                    "Java",
                ),
                CatalogEntry::new(
                    "consumo dentro de los recursos disponibles del servidor",
                    "Recursos Servidor",
                ),
                CatalogEntry::new(
                    "Se valida el alertamiento y estos son procesos propios del servidor",
                    "Procesos del Servidor",
                ),
                CatalogEntry::new(
                    "Se procede con el cierre del caso, ya que la unidad alertada no puede ser ampliada",
                    "Unidad no ampliada",
                ),
                // Leading "S" is missing in the source catalog; the substring
                // still matches "Se valida ..." notes.
                CatalogEntry::new(
                    "e valida alerta y la misma obedece a un consumo elevado por procesos de ISS",
                    "ISS",
                ),
                CatalogEntry::new(
                    "se deja en monitoreo al finalizar el proceso se solventará la misma",
                    "Monitoreo",
                ),
                CatalogEntry::new(
                    "se valida la alerta en el servidor y no se ve afectación",
                    "Sin afectación",
                ),
            ],
        }
    }
}

impl AlertCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Labels in catalog order. A label shared by several phrases appears once.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            if !labels.contains(&entry.label.as_str()) {
                labels.push(&entry.label);
            }
        }
        labels
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.entries.iter().any(|e| e.label == label)
    }

    /// Label for a pair of note texts; the last matching entry wins.
    pub fn label_for(&self, work_notes: Option<&str>, resolution_notes: Option<&str>) -> Option<&str> {
        let work = work_notes.map(str::to_lowercase);
        let resolution = resolution_notes.map(str::to_lowercase);
        self.matcher()
            .label_for_lowercase(work.as_deref(), resolution.as_deref())
    }

    /// Catalog with phrases lowercased once, for scanning many rows.
    fn matcher(&self) -> PhraseMatcher<'_> {
        PhraseMatcher {
            rules: self
                .entries
                .iter()
                .map(|e| (e.phrase.to_lowercase(), e.label.as_str()))
                .filter(|(phrase, _)| !phrase.is_empty())
                .collect(),
        }
    }
}

/// Lowercased `(phrase, label)` rules in catalog order. Empty phrases are dropped.
struct PhraseMatcher<'a> {
    rules: Vec<(String, &'a str)>,
}

impl<'a> PhraseMatcher<'a> {
    fn label_for_lowercase(&self, work: Option<&str>, resolution: Option<&str>) -> Option<&'a str> {
        let hit = |text: Option<&str>, phrase: &str| text.is_some_and(|t| t.contains(phrase));
        self.rules
            .iter()
            .filter(|(phrase, _)| hit(work, phrase) || hit(resolution, phrase))
            .map(|(_, label)| *label)
            .last()
    }

    fn label_row(&self, row: Row<'_>) -> CellValue {
        let work = row.text(columns::WORK_NOTES).map(str::to_lowercase);
        let resolution = row.text(columns::RESOLUTION_NOTES).map(str::to_lowercase);
        self.label_for_lowercase(work.as_deref(), resolution.as_deref())
            .map(|label| CellValue::Text(label.to_string()))
            .unwrap_or_default()
    }
}

/// Return a copy of `table` with the `Tipo de Alerta` column set for every
/// row. An existing `Tipo de Alerta` column is overwritten.
///
/// Rows whose note cells are empty or hold non-text values never match.
pub fn classify(table: &TicketTable, catalog: &AlertCatalog) -> TicketTable {
    let mut labeled = table.clone();
    let idx = labeled.ensure_column(columns::ALERT_TYPE);
    let matcher = catalog.matcher();
    labeled.fill_column(idx, |row| matcher.label_row(row));

    let matched = labeled
        .rows()
        .filter(|row| row.get(columns::ALERT_TYPE).is_some_and(|c| !c.is_empty()))
        .count();
    debug!(
        rows = labeled.len(),
        matched,
        entries = catalog.entries.len(),
        "Classified known alerts"
    );
    labeled
}
