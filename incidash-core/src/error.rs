//! Error types for the incidash core.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering loading, aggregation and configuration.

use std::path::PathBuf;

/// Top-level error type for the incidash core library.
#[derive(Debug, thiserror::Error)]
pub enum IncidashError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Aggregation error: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised while reading the ticket file.
///
/// Any of these halts every view for the session.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Ticket file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Unsupported ticket file format: {path}")]
    UnsupportedFormat { path: PathBuf },

    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Sheet '{sheet}' in {path} has no header row")]
    EmptySheet { path: PathBuf, sheet: String },

    #[error("Missing required columns: {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },
}

/// Errors raised while aggregating a table for one view.
///
/// These are view-scoped: the caller reports them inline and keeps going.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AggregationError {
    #[error("Unknown column: {column}")]
    UnknownColumn { column: String },

    #[error("No rows with values in both '{x}' and '{y}'")]
    EmptyResult { x: String, y: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// A type alias for results using the top-level `IncidashError`.
pub type Result<T> = std::result::Result<T, IncidashError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_load() {
        let err = IncidashError::Load(LoadError::NotFound {
            path: PathBuf::from("Data/incidentes.xlsx"),
        });
        assert_eq!(
            err.to_string(),
            "Load error: Ticket file not found: Data/incidentes.xlsx"
        );
    }

    #[test]
    fn test_error_display_missing_columns() {
        let err = LoadError::MissingColumns {
            columns: vec!["Estado".into(), "Creado".into()],
        };
        assert_eq!(err.to_string(), "Missing required columns: Estado, Creado");
    }

    #[test]
    fn test_error_display_aggregation() {
        let err = IncidashError::Aggregation(AggregationError::UnknownColumn {
            column: "Prioridad".into(),
        });
        assert_eq!(
            err.to_string(),
            "Aggregation error: Unknown column: Prioridad"
        );
    }

    #[test]
    fn test_error_from_config() {
        let err: IncidashError = ConfigError::Invalid {
            message: "catalog is empty".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid configuration: catalog is empty"
        );
    }
}
