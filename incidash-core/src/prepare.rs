//! Data preparation: timestamp coercion, status fill and alert labeling.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::classifier::{AlertCatalog, classify};
use crate::config::ReportConfig;
use crate::types::{CellValue, TicketTable, columns};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

/// Options that shape preparation.
#[derive(Debug, Clone)]
pub struct PrepareOptions<'a> {
    pub catalog: &'a AlertCatalog,
    pub missing_status: &'a str,
}

impl<'a> PrepareOptions<'a> {
    pub fn new(catalog: &'a AlertCatalog, report: &'a ReportConfig) -> Self {
        Self {
            catalog,
            missing_status: &report.missing_status,
        }
    }
}

/// Normalize a freshly loaded table and label known alerts.
///
/// `Creado` becomes a timestamp (or empty when unparseable), empty `Estado`
/// cells get the missing-status sentinel, and `Tipo de Alerta` is derived
/// from the note fields.
pub fn prepare(table: &TicketTable, options: &PrepareOptions<'_>) -> TicketTable {
    let mut prepared = table.clone();

    if let Some(idx) = prepared.column_index(columns::CREATED) {
        prepared.map_column(idx, coerce_timestamp);
    }

    let status_idx = prepared.ensure_column(columns::STATUS);
    let mut filled = 0usize;
    prepared.map_column(status_idx, |cell| {
        if cell.is_empty() {
            filled += 1;
            CellValue::Text(options.missing_status.to_string())
        } else {
            cell.clone()
        }
    });

    debug!(rows = prepared.len(), filled, "Prepared ticket table");
    classify(&prepared, options.catalog)
}

/// Coerce a cell into a timestamp; anything unparseable becomes `Empty`.
pub fn coerce_timestamp(cell: &CellValue) -> CellValue {
    match cell {
        CellValue::DateTime(_) => cell.clone(),
        CellValue::Number(serial) => excel_serial_to_datetime(*serial)
            .map(CellValue::DateTime)
            .unwrap_or_default(),
        CellValue::Text(text) => parse_timestamp(text)
            .map(CellValue::DateTime)
            .unwrap_or_default(),
        CellValue::Bool(_) | CellValue::Empty => CellValue::Empty,
    }
}

/// Parse a timestamp written in one of the formats seen in ticket exports.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Convert an Excel serial day number (1900 date system) to a timestamp.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::value_counts;
    use pretty_assertions::assert_eq;

    fn table_with_status(status: Vec<Option<&str>>) -> TicketTable {
        TicketTable::from_rows(
            columns::REQUIRED.iter().map(|c| c.to_string()).collect(),
            status
                .into_iter()
                .enumerate()
                .map(|(i, s)| {
                    vec![
                        CellValue::from(format!("INC{i}")),
                        CellValue::from(s),
                        CellValue::from("2024-09-02 14:30:00"),
                        CellValue::from("Mesa N1"),
                        CellValue::Empty,
                        CellValue::Empty,
                    ]
                })
                .collect(),
        )
    }

    #[test]
    fn test_missing_status_is_filled() {
        let table = table_with_status(vec![Some("Resuelta"), Some("Cerrada"), None]);
        let catalog = AlertCatalog::default();
        let report = ReportConfig::default();
        let prepared = prepare(&table, &PrepareOptions::new(&catalog, &report));

        let counts = value_counts(&prepared, columns::STATUS).unwrap();
        let mut pairs: Vec<(String, usize)> = counts
            .entries
            .iter()
            .map(|e| (e.key.clone(), e.count))
            .collect();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("Cerrada".to_string(), 1),
                ("Resuelta".to_string(), 1),
                ("Sin Estado".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_prepare_adds_alert_column() {
        let table = table_with_status(vec![Some("Resuelta")]);
        let catalog = AlertCatalog::default();
        let report = ReportConfig::default();
        let prepared = prepare(&table, &PrepareOptions::new(&catalog, &report));
        assert!(prepared.has_column(columns::ALERT_TYPE));
        assert_eq!(prepared.len(), 1);
    }

    #[test]
    fn test_created_is_parsed() {
        let table = table_with_status(vec![Some("Resuelta")]);
        let catalog = AlertCatalog::default();
        let report = ReportConfig::default();
        let prepared = prepare(&table, &PrepareOptions::new(&catalog, &report));
        let created = prepared.row(0).unwrap().get(columns::CREATED).unwrap().clone();
        assert!(matches!(created, CellValue::DateTime(_)));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 9, 2)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-09-02 14:30:00"), Some(expected));
        assert_eq!(parse_timestamp("02/09/2024 14:30"), Some(expected));
        assert_eq!(parse_timestamp("2024-09-02T14:30:00Z"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-09-02"),
            NaiveDate::from_ymd_opt(2024, 9, 2).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("ayer"), None);
        assert_eq!(parse_timestamp("  "), None);
    }

    #[test]
    fn test_unparseable_timestamp_becomes_empty() {
        assert_eq!(coerce_timestamp(&CellValue::from("sin fecha")), CellValue::Empty);
        assert_eq!(coerce_timestamp(&CellValue::Bool(true)), CellValue::Empty);
    }

    #[test]
    fn test_excel_serial() {
        // 45536.5 is 2024-09-01 12:00:00
        let dt = excel_serial_to_datetime(45536.5).unwrap();
        assert_eq!(dt.to_string(), "2024-09-01 12:00:00");
        assert_eq!(excel_serial_to_datetime(-3.0), None);
    }
}
