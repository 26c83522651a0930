//! Core type definitions for incidash.
//!
//! Defines the in-memory ticket table: cell values, rows and the well-known
//! column names of the incident export.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Well-known column names of the incident export.
pub mod columns {
    pub const NUMBER: &str = "Número";
    pub const STATUS: &str = "Estado";
    pub const CREATED: &str = "Creado";
    pub const RESOLVED_BY: &str = "Resuelto por";
    pub const WORK_NOTES: &str = "Notas de trabajo";
    pub const RESOLUTION_NOTES: &str = "Notas de resolución";
    /// Derived column appended by the classifier.
    pub const ALERT_TYPE: &str = "Tipo de Alerta";

    /// Columns every loaded ticket table must carry.
    pub const REQUIRED: [&str; 6] = [
        NUMBER,
        STATUS,
        CREATED,
        RESOLVED_BY,
        WORK_NOTES,
        RESOLUTION_NOTES,
    ];
}

/// Timestamp format used when displaying `DateTime` cells.
pub const DATETIME_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single cell of the ticket table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    DateTime(NaiveDateTime),
    Text(String),
}

impl CellValue {
    /// Build a text cell, mapping the empty string to `Empty`.
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// The text content, if this is a text cell.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The numeric content, if this is a number cell.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Grouping key: the display text of any non-empty cell.
    pub fn key(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.to_string())
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            CellValue::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_DISPLAY_FORMAT)),
            CellValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::text(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

/// An ordered table of ticket records sharing one schema.
///
/// Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketTable {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl TicketTable {
    /// Create an empty table with the given header.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Create a table from a header and rows, padding or truncating each row
    /// to the header width.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// Append a row, padded with `Empty` or truncated to the header width.
    pub fn push_row(&mut self, mut row: Vec<CellValue>) {
        row.resize(self.columns.len(), CellValue::Empty);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Names from `required` that this table lacks, in the given order.
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|name| !self.has_column(name))
            .map(|name| name.to_string())
            .collect()
    }

    /// Iterate rows in table order.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |cells| Row {
            columns: &self.columns,
            cells,
        })
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows.get(index).map(|cells| Row {
            columns: &self.columns,
            cells,
        })
    }

    /// All cells of a column, or `None` for an unknown column.
    pub fn column_values(&self, name: &str) -> Option<Vec<&CellValue>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Index of `name`, appending an all-empty column when absent.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(CellValue::Empty);
        }
        self.columns.len() - 1
    }

    /// Apply `f` to every cell of column `idx`.
    pub fn map_column(&mut self, idx: usize, mut f: impl FnMut(&CellValue) -> CellValue) {
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(idx) {
                *cell = f(cell);
            }
        }
    }

    /// Set every cell of column `idx` from a per-row function.
    pub fn fill_column(&mut self, idx: usize, mut f: impl FnMut(Row<'_>) -> CellValue) {
        let values: Vec<CellValue> = self.rows().map(&mut f).collect();
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = value;
        }
    }

    /// A new table with the same header holding the rows that satisfy `pred`.
    pub fn filter(&self, mut pred: impl FnMut(&Row<'_>) -> bool) -> TicketTable {
        let rows = self
            .rows()
            .filter(|row| pred(row))
            .map(|row| row.cells.to_vec())
            .collect();
        TicketTable {
            columns: self.columns.clone(),
            rows,
        }
    }
}

/// A borrowed view of one table row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    cells: &'a [CellValue],
}

impl<'a> Row<'a> {
    /// Cell under column `name`, or `None` for an unknown column.
    pub fn get(&self, name: &str) -> Option<&'a CellValue> {
        let idx = self.columns.iter().position(|c| c == name)?;
        self.cells.get(idx)
    }

    /// Text content under column `name`, if the cell holds text.
    pub fn text(&self, name: &str) -> Option<&'a str> {
        self.get(name).and_then(CellValue::as_text)
    }

    pub fn cells(&self) -> &'a [CellValue] {
        self.cells
    }

    /// Column/value pairs in header order.
    pub fn fields(&self) -> impl Iterator<Item = (&'a str, &'a CellValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.cells.iter())
    }
}
