//! Configuration system for incidash.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> CLI args.
//! Configuration is loaded from `~/.config/incidash/config.toml` and/or `.incidash/config.toml`
//! in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::classifier::AlertCatalog;
use crate::error::ConfigError;

/// Top-level configuration for incidash.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub data: DataConfig,
    pub report: ReportConfig,
    pub catalog: AlertCatalog,
}

/// Where the ticket export lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Path to the ticket spreadsheet, relative to the workspace.
    pub path: PathBuf,
    /// Sheet to read; the first sheet when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("Data/incidentes_Septiembre2024_ti724.xlsx"),
            sheet: None,
        }
    }
}

/// Knobs for the reporting views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Resolvers shown in the top-resolvers chart.
    pub top_resolvers: usize,
    /// Note texts shown in the phrase analysis.
    pub top_phrases: usize,
    /// `Estado` values counted as resolved in the summary.
    pub resolved_states: Vec<String>,
    /// Sentinel written into empty `Estado` cells.
    pub missing_status: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_resolvers: 15,
            top_phrases: 20,
            resolved_states: vec!["Resuelta".into(), "Cerrada".into()],
            missing_status: "Sin Estado".into(),
        }
    }
}

impl DashboardConfig {
    /// Reject configurations the views cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.report.missing_status.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "report.missing_status must not be empty".into(),
            });
        }
        if let Some(entry) = self
            .catalog
            .entries
            .iter()
            .find(|e| e.phrase.trim().is_empty() || e.label.trim().is_empty())
        {
            return Err(ConfigError::Invalid {
                message: format!(
                    "catalog entry with empty phrase or label: '{}' -> '{}'",
                    entry.phrase, entry.label
                ),
            });
        }
        Ok(())
    }

    /// Resolve the data path against `workspace` when it is relative.
    pub fn data_path(&self, workspace: &Path) -> PathBuf {
        if self.data.path.is_absolute() {
            self.data.path.clone()
        } else {
            workspace.join(&self.data.path)
        }
    }
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "incidash", "incidash")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Path of the workspace-level config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".incidash").join("config.toml")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `INCIDASH_`)
/// 3. Workspace-local config (`.incidash/config.toml`)
/// 4. User config (`~/.config/incidash/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&DashboardConfig>,
) -> Result<DashboardConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(DashboardConfig::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // INCIDASH_DATA__PATH, INCIDASH_REPORT__TOP_RESOLVERS, etc.
    figment = figment.merge(Env::prefixed("INCIDASH_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: DashboardConfig = figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}

/// Check whether any incidash configuration file exists.
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if user_config_path().is_some_and(|p| p.exists()) {
        return true;
    }
    workspace.is_some_and(|ws| workspace_config_path(ws).exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::CatalogEntry;

    #[test]
    fn test_default_config() {
        let config = DashboardConfig::default();
        assert_eq!(config.report.top_resolvers, 15);
        assert_eq!(config.report.top_phrases, 20);
        assert_eq!(config.report.missing_status, "Sin Estado");
        assert_eq!(config.report.resolved_states, vec!["Resuelta", "Cerrada"]);
        assert_eq!(config.catalog.entries.len(), 8);
        assert!(config.data.sheet.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = DashboardConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: DashboardConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.catalog, config.catalog);
        assert_eq!(parsed.data.path, config.data.path);
    }

    #[test]
    fn test_workspace_config_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(".incidash");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("config.toml"),
            r#"
            [data]
            path = "exports/octubre.xlsx"
            sheet = "Incidentes"

            [report]
            top_resolvers = 5

            [catalog]
            entries = [{ phrase = "disco lleno", label = "Disco" }]
            "#,
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(config.data.path, PathBuf::from("exports/octubre.xlsx"));
        assert_eq!(config.data.sheet.as_deref(), Some("Incidentes"));
        assert_eq!(config.report.top_resolvers, 5);
        // Untouched keys keep their defaults.
        assert_eq!(config.report.top_phrases, 20);
        assert_eq!(
            config.catalog.entries,
            vec![CatalogEntry::new("disco lleno", "Disco")]
        );
    }

    #[test]
    fn test_explicit_overrides_win() {
        let dir = tempfile::tempdir().unwrap();
        let mut overrides = DashboardConfig::default();
        overrides.data.path = PathBuf::from("/tmp/otro.xlsx");
        let config = load_config(Some(dir.path()), Some(&overrides)).unwrap();
        assert_eq!(config.data.path, PathBuf::from("/tmp/otro.xlsx"));
    }

    #[test]
    fn test_validate_rejects_empty_phrase() {
        let mut config = DashboardConfig::default();
        config.catalog.entries.push(CatalogEntry::new("  ", "Vacía"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_data_path_resolution() {
        let config = DashboardConfig::default();
        let ws = Path::new("/srv/reportes");
        assert_eq!(
            config.data_path(ws),
            PathBuf::from("/srv/reportes/Data/incidentes_Septiembre2024_ti724.xlsx")
        );
    }

    #[test]
    fn test_config_exists_in_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(".incidash");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("config.toml"), "").unwrap();
        assert!(config_exists(Some(dir.path())));
    }
}
