//! Reading ticket exports from disk.
//!
//! Spreadsheets (`xlsx`, `xlsm`, `xls`, `xlsb`, `ods`) go through `calamine`;
//! `csv` files through the `csv` crate. The first row is the header.

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use tracing::debug;

use crate::error::LoadError;
use crate::types::{CellValue, TicketTable, columns};

/// Input formats understood by [`load_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Spreadsheet,
    Csv,
}

impl SourceFormat {
    /// Infer the format from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Some(SourceFormat::Spreadsheet),
            "csv" => Some(SourceFormat::Csv),
            _ => None,
        }
    }
}

/// Load a ticket table and check the required columns are present.
pub fn load_table(path: &Path, sheet: Option<&str>) -> Result<TicketTable, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let format = SourceFormat::from_path(path).ok_or_else(|| LoadError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;

    let table = match format {
        SourceFormat::Spreadsheet => read_spreadsheet(path, sheet)?,
        SourceFormat::Csv => read_csv(path)?,
    };

    let missing = table.missing_columns(&columns::REQUIRED);
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns { columns: missing });
    }

    debug!(
        path = %path.display(),
        rows = table.len(),
        columns = table.columns().len(),
        "Loaded ticket table"
    );
    Ok(table)
}

fn read_spreadsheet(path: &Path, sheet: Option<&str>) -> Result<TicketTable, LoadError> {
    let read_err = |message: String| LoadError::Read {
        path: path.to_path_buf(),
        message,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| read_err(e.to_string()))?;
    let sheet_names = workbook.sheet_names().to_vec();
    let sheet_name = match sheet {
        Some(name) => {
            if !sheet_names.iter().any(|s| s == name) {
                return Err(read_err(format!(
                    "sheet '{name}' not found (available: {})",
                    sheet_names.join(", ")
                )));
            }
            name.to_string()
        }
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| read_err("workbook has no sheets".into()))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| LoadError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let mut rows = range.rows();
    let header = rows.next().ok_or_else(|| LoadError::EmptySheet {
        path: path.to_path_buf(),
        sheet: sheet_name.clone(),
    })?;
    let header = header_names(header.iter().map(|c| cell_from_data(c).to_string()));

    let mut table = TicketTable::new(header);
    for row in rows {
        let cells: Vec<CellValue> = row.iter().map(cell_from_data).collect();
        if cells.iter().all(CellValue::is_empty) {
            continue;
        }
        table.push_row(cells);
    }
    Ok(table)
}

fn read_csv(path: &Path) -> Result<TicketTable, LoadError> {
    let parse_err = |message: String| LoadError::Parse {
        path: path.to_path_buf(),
        message,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| LoadError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let header = reader
        .headers()
        .map_err(|e| parse_err(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    if header.iter().all(|h| h.trim().is_empty()) {
        return Err(LoadError::EmptySheet {
            path: path.to_path_buf(),
            sheet: "csv".into(),
        });
    }

    let mut table = TicketTable::new(header_names(header.into_iter()));
    for record in reader.records() {
        let record = record.map_err(|e| parse_err(e.to_string()))?;
        let cells: Vec<CellValue> = record.iter().map(cell_from_csv).collect();
        if cells.iter().all(CellValue::is_empty) {
            continue;
        }
        table.push_row(cells);
    }
    Ok(table)
}

/// Trimmed header names; blank headers become `Unnamed: <index>`.
fn header_names(raw: impl Iterator<Item = String>) -> Vec<String> {
    raw.enumerate()
        .map(|(i, name)| {
            let name = name.trim();
            if name.is_empty() {
                format!("Unnamed: {i}")
            } else {
                name.to_string()
            }
        })
        .collect()
}

/// Convert a spreadsheet cell. Error cells (`#N/A`, `#DIV/0!`) read as empty.
pub fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(_) => CellValue::Empty,
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) => CellValue::text(s.clone()),
        Data::DurationIso(s) => CellValue::text(s.clone()),
    }
}

/// Convert a CSV field: numbers become `Number`, the rest stays text.
pub fn cell_from_csv(field: &str) -> CellValue {
    if field.is_empty() {
        return CellValue::Empty;
    }
    match field.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => CellValue::Number(n),
        _ => CellValue::text(field),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HEADER: &str =
        "Número,Estado,Creado,Resuelto por,Notas de trabajo,Notas de resolución,Prioridad";

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            SourceFormat::from_path(Path::new("a/b.XLSX")),
            Some(SourceFormat::Spreadsheet)
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("b.csv")),
            Some(SourceFormat::Csv)
        );
        assert_eq!(SourceFormat::from_path(Path::new("b.txt")), None);
        assert_eq!(SourceFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = load_table(Path::new("/nonexistent/tickets.xlsx"), None).unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickets.txt");
        std::fs::write(&path, "x").unwrap();
        let err = load_table(&path, None).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_load_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickets.csv");
        std::fs::write(
            &path,
            format!(
                "{HEADER}\nINC001,Resuelta,2024-09-01 10:00:00,Ana,nota,resuelto,2\nINC002,,,,,,\n"
            ),
        )
        .unwrap();

        let table = load_table(&path, None).unwrap();
        assert_eq!(table.columns().len(), 7);
        assert_eq!(table.len(), 2);
        let first = table.row(0).unwrap();
        assert_eq!(first.get("Prioridad"), Some(&CellValue::Number(2.0)));
        assert_eq!(first.text("Resuelto por"), Some("Ana"));
        let second = table.row(1).unwrap();
        assert_eq!(second.get("Estado"), Some(&CellValue::Empty));
    }

    #[test]
    fn test_csv_missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickets.csv");
        std::fs::write(&path, "Número,Estado\nINC001,Resuelta\n").unwrap();
        match load_table(&path, None).unwrap_err() {
            LoadError::MissingColumns { columns } => assert_eq!(
                columns,
                vec![
                    "Creado",
                    "Resuelto por",
                    "Notas de trabajo",
                    "Notas de resolución"
                ]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cell_from_csv() {
        assert_eq!(cell_from_csv(""), CellValue::Empty);
        assert_eq!(cell_from_csv(" 3.5 "), CellValue::Number(3.5));
        assert_eq!(cell_from_csv("NaN"), CellValue::Text("NaN".into()));
        assert_eq!(cell_from_csv("INC01"), CellValue::Text("INC01".into()));
    }

    #[test]
    fn test_cell_from_data() {
        assert_eq!(cell_from_data(&Data::Int(4)), CellValue::Number(4.0));
        assert_eq!(cell_from_data(&Data::String(String::new())), CellValue::Empty);
        assert_eq!(
            cell_from_data(&Data::Error(calamine::CellErrorType::NA)),
            CellValue::Empty
        );
    }

    #[test]
    fn test_header_names_fill_blanks() {
        let names = header_names(vec![" A ".to_string(), String::new()].into_iter());
        assert_eq!(names, vec!["A".to_string(), "Unnamed: 1".to_string()]);
    }
}
