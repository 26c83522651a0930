//! Aggregation primitives behind the reporting views.
//!
//! Frequency tables, cross-tabulations, a pairwise Pearson correlation
//! matrix, the resolver recommendation and the summary metrics. All functions
//! are pure over a borrowed [`TicketTable`].

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::AggregationError;
use crate::types::{CellValue, TicketTable, columns};

/// Fixed message shown when no (alert type, resolver) pair exists.
pub const INSUFFICIENT_DATA_MESSAGE: &str = "No hay suficientes datos para generar sugerencias.";

/// One row of a frequency table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    pub key: String,
    pub count: usize,
}

/// Value counts of one dimension, descending by count.
///
/// Ties keep the order in which keys were first seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyTable {
    pub column: String,
    pub entries: Vec<FrequencyEntry>,
}

/// A frequency entry with its share of the total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionEntry {
    pub key: String,
    pub count: usize,
    pub percentage: f64,
}

impl FrequencyTable {
    /// Sum `(key, weight)` pairs per key and sort descending by total.
    ///
    /// Feeding an existing table's entries back in reproduces the table.
    pub fn from_weighted(
        column: impl Into<String>,
        pairs: impl IntoIterator<Item = (String, usize)>,
    ) -> Self {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut entries: Vec<FrequencyEntry> = Vec::new();
        for (key, weight) in pairs {
            match index.get(&key) {
                Some(&i) => entries[i].count += weight,
                None => {
                    index.insert(key.clone(), entries.len());
                    entries.push(FrequencyEntry { key, count: weight });
                }
            }
        }
        // Vec::sort_by is stable, so ties keep first-seen order.
        entries.sort_by(|a, b| b.count.cmp(&a.count));
        Self {
            column: column.into(),
            entries,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }

    pub fn get(&self, key: &str) -> Option<usize> {
        self.entries.iter().find(|e| e.key == key).map(|e| e.count)
    }

    /// The first `n` entries.
    pub fn top(&self, n: usize) -> FrequencyTable {
        FrequencyTable {
            column: self.column.clone(),
            entries: self.entries.iter().take(n).cloned().collect(),
        }
    }

    /// Entries with their percentage of [`total`](Self::total).
    pub fn distribution(&self) -> Vec<DistributionEntry> {
        let total = self.total();
        self.entries
            .iter()
            .map(|e| DistributionEntry {
                key: e.key.clone(),
                count: e.count,
                percentage: if total == 0 {
                    0.0
                } else {
                    e.count as f64 / total as f64 * 100.0
                },
            })
            .collect()
    }
}

/// Count the non-empty values of `column`.
pub fn value_counts(table: &TicketTable, column: &str) -> Result<FrequencyTable, AggregationError> {
    let values = table
        .column_values(column)
        .ok_or_else(|| AggregationError::UnknownColumn {
            column: column.to_string(),
        })?;
    Ok(FrequencyTable::from_weighted(
        column,
        values.into_iter().filter_map(CellValue::key).map(|k| (k, 1)),
    ))
}

/// Co-occurrence counts of two categorical columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContingencyTable {
    /// Column whose values label the rows.
    pub row_label: String,
    /// Column whose values label the columns.
    pub column_label: String,
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    /// `counts[r][c]` for `rows[r]` x `columns[c]`.
    pub counts: Vec<Vec<usize>>,
}

impl ContingencyTable {
    pub fn get(&self, row: &str, column: &str) -> Option<usize> {
        let r = self.rows.iter().position(|v| v == row)?;
        let c = self.columns.iter().position(|v| v == column)?;
        Some(self.counts[r][c])
    }

    /// Largest cell count, used to scale heatmap shading.
    pub fn max_count(&self) -> usize {
        self.counts
            .iter()
            .flat_map(|row| row.iter().copied())
            .max()
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }
}

/// Cross-tabulate `x` (rows) against `y` (columns).
///
/// Rows with an empty value in either column are skipped. Distinct values
/// are sorted: numbers numerically, then timestamps, then the rest by text.
pub fn crosstab(table: &TicketTable, x: &str, y: &str) -> Result<ContingencyTable, AggregationError> {
    let unknown = |column: &str| AggregationError::UnknownColumn {
        column: column.to_string(),
    };
    let xs = table.column_values(x).ok_or_else(|| unknown(x))?;
    let ys = table.column_values(y).ok_or_else(|| unknown(y))?;

    let pairs: Vec<(&CellValue, &CellValue)> = xs
        .into_iter()
        .zip(ys)
        .filter(|(a, b)| !a.is_empty() && !b.is_empty())
        .collect();
    if pairs.is_empty() {
        return Err(AggregationError::EmptyResult {
            x: x.to_string(),
            y: y.to_string(),
        });
    }

    let row_keys = sorted_distinct(pairs.iter().map(|(a, _)| *a));
    let col_keys = sorted_distinct(pairs.iter().map(|(_, b)| *b));
    let position = |keys: &[DistinctKey]| -> HashMap<DistinctKey, usize> {
        keys.iter().cloned().enumerate().map(|(i, k)| (k, i)).collect()
    };
    let row_pos = position(&row_keys);
    let col_pos = position(&col_keys);

    let mut counts = vec![vec![0usize; col_keys.len()]; row_keys.len()];
    for (a, b) in &pairs {
        counts[row_pos[&distinct_key(a)]][col_pos[&distinct_key(b)]] += 1;
    }

    let labels = |keys: Vec<DistinctKey>| -> Vec<String> {
        keys.into_iter().map(|(_, text)| text).collect()
    };
    Ok(ContingencyTable {
        row_label: x.to_string(),
        column_label: y.to_string(),
        rows: labels(row_keys),
        columns: labels(col_keys),
        counts,
    })
}

/// Cell identity for grouping: the display text alone would merge the
/// number `1` with the text `"1"`.
type DistinctKey = (u8, String);

fn distinct_key(cell: &CellValue) -> DistinctKey {
    (type_rank(cell), cell.to_string())
}

fn sorted_distinct<'a>(cells: impl Iterator<Item = &'a CellValue>) -> Vec<DistinctKey> {
    let mut seen: HashMap<DistinctKey, &CellValue> = HashMap::new();
    for cell in cells {
        seen.entry(distinct_key(cell)).or_insert(cell);
    }
    let mut distinct: Vec<(DistinctKey, &CellValue)> = seen.into_iter().collect();
    distinct.sort_by(|(ka, a), (kb, b)| cell_order(a, b).then_with(|| ka.cmp(kb)));
    distinct.into_iter().map(|(k, _)| k).collect()
}

fn type_rank(cell: &CellValue) -> u8 {
    match cell {
        CellValue::Number(_) => 0,
        CellValue::DateTime(_) => 1,
        CellValue::Bool(_) => 2,
        CellValue::Text(_) => 3,
        CellValue::Empty => 4,
    }
}

fn cell_order(a: &CellValue, b: &CellValue) -> Ordering {
    match (a, b) {
        (CellValue::Number(x), CellValue::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (CellValue::DateTime(x), CellValue::DateTime(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Pairwise Pearson correlation over the numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// Symmetric; `values[i][i] == 1.0`. Undefined pairs are `NaN`.
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }
}

/// Columns holding at least one number and nothing but numbers or blanks.
pub fn numeric_columns(table: &TicketTable) -> Vec<String> {
    table
        .columns()
        .iter()
        .filter(|name| {
            let Some(values) = table.column_values(name) else {
                return false;
            };
            let mut any_number = false;
            for cell in values {
                match cell {
                    CellValue::Number(_) => any_number = true,
                    CellValue::Empty => {}
                    _ => return false,
                }
            }
            any_number
        })
        .cloned()
        .collect()
}

/// Correlation matrix of all numeric columns, or `None` when fewer than two
/// exist.
pub fn correlation_matrix(table: &TicketTable) -> Option<CorrelationMatrix> {
    let names = numeric_columns(table);
    if names.len() < 2 {
        return None;
    }

    let series: Vec<Vec<Option<f64>>> = names
        .iter()
        .map(|name| {
            table
                .column_values(name)
                .unwrap_or_default()
                .into_iter()
                .map(CellValue::as_number)
                .collect()
        })
        .collect();

    let n = names.len();
    let mut values = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        values[i][i] = 1.0;
        for j in (i + 1)..n {
            let (xs, ys): (Vec<f64>, Vec<f64>) = series[i]
                .iter()
                .zip(&series[j])
                .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
                .unzip();
            let r = pearson(&xs, &ys).unwrap_or(f64::NAN);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Some(CorrelationMatrix {
        columns: names,
        values,
    })
}

/// Pearson correlation coefficient of two equally long samples.
///
/// `None` with fewer than two observations or a constant sample. A sample
/// counts as constant when its spread is within rounding error of its
/// magnitude, so tiny but varying values still correlate.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mean_x = mean(xs);
    let mean_y = mean(ys);
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    let mut sq_x = 0.0;
    let mut sq_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
        sq_x += x * x;
        sq_y += y * y;
    }
    if var_x <= f64::EPSILON * sq_x || var_y <= f64::EPSILON * sq_y {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Resolver suggested for an alert type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recommendation {
    Suggested {
        alert_type: String,
        resolver: String,
        cases: usize,
    },
    InsufficientData,
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recommendation::Suggested {
                alert_type,
                resolver,
                cases,
            } => write!(
                f,
                "Resolutor recomendado para el tipo de alerta '{alert_type}': {resolver} con {cases} casos."
            ),
            Recommendation::InsufficientData => f.write_str(INSUFFICIENT_DATA_MESSAGE),
        }
    }
}

/// The (alert type, resolver) pair with the most cases.
///
/// Pairs are grouped in sorted key order and then stably sorted by count, so
/// a tie goes to the pair that sorts first.
pub fn recommend(table: &TicketTable) -> Recommendation {
    let mut groups: BTreeMap<(String, String), usize> = BTreeMap::new();
    for row in table.rows() {
        let alert = row.get(columns::ALERT_TYPE).and_then(CellValue::key);
        let resolver = row.get(columns::RESOLVED_BY).and_then(CellValue::key);
        if let (Some(alert), Some(resolver)) = (alert, resolver) {
            *groups.entry((alert, resolver)).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<((String, String), usize)> = groups.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    match ranked.into_iter().next() {
        Some(((alert_type, resolver), cases)) => Recommendation::Suggested {
            alert_type,
            resolver,
            cases,
        },
        None => Recommendation::InsufficientData,
    }
}

/// Headline numbers of the summary view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub total: usize,
    pub resolved: usize,
    pub known_alerts: usize,
}

pub fn summary_metrics(table: &TicketTable, resolved_states: &[String]) -> SummaryMetrics {
    let mut metrics = SummaryMetrics {
        total: table.len(),
        resolved: 0,
        known_alerts: 0,
    };
    for row in table.rows() {
        let status = row.get(columns::STATUS).and_then(CellValue::key);
        if status.is_some_and(|s| resolved_states.iter().any(|r| *r == s)) {
            metrics.resolved += 1;
        }
        if row
            .get(columns::ALERT_TYPE)
            .is_some_and(|c| !c.is_empty())
        {
            metrics.known_alerts += 1;
        }
    }
    metrics
}

/// Most frequent whole note texts across both note fields.
pub fn phrase_frequency(table: &TicketTable, limit: usize) -> FrequencyTable {
    let notes = [columns::WORK_NOTES, columns::RESOLUTION_NOTES]
        .into_iter()
        .filter_map(|name| table.column_values(name))
        .flatten()
        .filter_map(CellValue::key)
        .map(|k| (k, 1));
    FrequencyTable::from_weighted("Frase", notes).top(limit)
}

/// Selection of known-alert rows.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "label", rename_all = "snake_case")]
pub enum AlertFilter {
    /// Every row with a known alert label.
    #[default]
    All,
    /// Rows carrying exactly this label.
    Label(String),
}

impl AlertFilter {
    /// Selector label that stands for [`AlertFilter::All`].
    pub const ALL_LABEL: &'static str = "Todas";

    /// Parse a menu selection; `None` or "Todas" select all known alerts.
    pub fn from_selection(selection: Option<&str>) -> Self {
        match selection.map(str::trim) {
            None | Some("") => AlertFilter::All,
            Some(s) if s.eq_ignore_ascii_case(Self::ALL_LABEL) => AlertFilter::All,
            Some(s) => AlertFilter::Label(s.to_string()),
        }
    }
}

impl std::fmt::Display for AlertFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertFilter::All => f.write_str(Self::ALL_LABEL),
            AlertFilter::Label(label) => f.write_str(label),
        }
    }
}

/// Rows of a labeled table selected by `filter`.
pub fn filter_by_alert(table: &TicketTable, filter: &AlertFilter) -> TicketTable {
    table.filter(|row| {
        let label = row.get(columns::ALERT_TYPE).and_then(CellValue::as_text);
        match filter {
            AlertFilter::All => label.is_some(),
            AlertFilter::Label(wanted) => label == Some(wanted.as_str()),
        }
    })
}
