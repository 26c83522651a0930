//! The six reporting views.
//!
//! [`render_view`] dispatches a [`ViewMode`] to its handler, which aggregates
//! the prepared table into a [`ViewReport`]. Aggregation failures and empty
//! selections become [`Notice`]s on the report; they never fail the call.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::aggregate::{
    AlertFilter, ContingencyTable, CorrelationMatrix, DistributionEntry, FrequencyTable,
    Recommendation, SummaryMetrics, correlation_matrix, crosstab, filter_by_alert,
    phrase_frequency, recommend, summary_metrics, value_counts,
};
use crate::config::ReportConfig;
use crate::types::{CellValue, TicketTable, columns};

/// Which view to build, with its per-view selections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ViewMode {
    /// Top resolvers, resolver x status heatmap and resolver distribution.
    ResolverGroups,
    /// Known-alert incidents for a label (or all), with a resolver suggestion.
    KnownAlerts { filter: AlertFilter },
    /// Headline metrics and status distribution.
    Summary,
    /// Most repeated note texts.
    PhraseAnalysis,
    /// Every field of one incident; the first incident when `number` is unset.
    IncidentDetail { number: Option<String> },
    /// Heatmap of two arbitrary columns plus the numeric correlation matrix.
    Advanced { x: Option<String>, y: Option<String> },
}

impl ViewMode {
    /// Menu labels in menu order.
    pub const MENU: [&'static str; 6] = [
        "Grupos Resolutores",
        "Alertas Conocidas - Detalles",
        "Resumen General",
        "Análisis de Frases",
        "Detalle de Incidente",
        "Análisis Avanzado",
    ];

    /// Menu label of this view.
    pub fn menu_label(&self) -> &'static str {
        Self::MENU[self.menu_index()]
    }

    pub fn menu_index(&self) -> usize {
        match self {
            ViewMode::ResolverGroups => 0,
            ViewMode::KnownAlerts { .. } => 1,
            ViewMode::Summary => 2,
            ViewMode::PhraseAnalysis => 3,
            ViewMode::IncidentDetail { .. } => 4,
            ViewMode::Advanced { .. } => 5,
        }
    }

    /// View for a menu index with default selections.
    pub fn from_menu_index(index: usize) -> Option<Self> {
        Some(match index {
            0 => ViewMode::ResolverGroups,
            1 => ViewMode::KnownAlerts {
                filter: AlertFilter::All,
            },
            2 => ViewMode::Summary,
            3 => ViewMode::PhraseAnalysis,
            4 => ViewMode::IncidentDetail { number: None },
            5 => ViewMode::Advanced { x: None, y: None },
            _ => return None,
        })
    }
}

/// Tunables shared by all views.
#[derive(Debug, Clone)]
pub struct ViewOptions {
    pub top_resolvers: usize,
    pub top_phrases: usize,
    pub resolved_states: Vec<String>,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self::from(&ReportConfig::default())
    }
}

impl From<&ReportConfig> for ViewOptions {
    fn from(report: &ReportConfig) -> Self {
        Self {
            top_resolvers: report.top_resolvers,
            top_phrases: report.top_phrases,
            resolved_states: report.resolved_states.clone(),
        }
    }
}

/// Severity of a view-scoped message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// A labelled headline number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub label: String,
    pub value: usize,
}

/// One incident in the known-alert listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentCard {
    pub number: String,
    pub resolved_by: String,
    pub work_notes: String,
    pub resolution_notes: String,
    pub alert_type: String,
}

/// One block of a view, handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Section {
    Metrics {
        title: String,
        metrics: Vec<Metric>,
    },
    Bar {
        title: String,
        table: FrequencyTable,
    },
    Distribution {
        title: String,
        entries: Vec<DistributionEntry>,
    },
    Heatmap {
        title: String,
        table: ContingencyTable,
    },
    Correlation {
        title: String,
        matrix: CorrelationMatrix,
    },
    Incidents {
        title: String,
        incidents: Vec<IncidentCard>,
    },
    Record {
        title: String,
        fields: Vec<(String, String)>,
    },
    Suggestion {
        title: String,
        recommendation: Recommendation,
    },
}

/// Everything one view produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewReport {
    pub title: String,
    pub sections: Vec<Section>,
    pub notices: Vec<Notice>,
}

impl ViewReport {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            sections: Vec::new(),
            notices: Vec::new(),
        }
    }

    fn push(&mut self, section: Section) {
        self.sections.push(section);
    }

    fn notice(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        if level != NoticeLevel::Info {
            warn!(view = %self.title, %message, "View notice");
        }
        self.notices.push(Notice { level, message });
    }

    pub fn has_errors(&self) -> bool {
        self.notices.iter().any(|n| n.level == NoticeLevel::Error)
    }
}

/// Build the report for `mode` from a prepared table.
pub fn render_view(mode: &ViewMode, table: &TicketTable, options: &ViewOptions) -> ViewReport {
    match mode {
        ViewMode::ResolverGroups => resolver_groups(table, options),
        ViewMode::KnownAlerts { filter } => known_alerts(table, filter),
        ViewMode::Summary => summary(table, options),
        ViewMode::PhraseAnalysis => phrase_analysis(table, options),
        ViewMode::IncidentDetail { number } => incident_detail(table, number.as_deref()),
        ViewMode::Advanced { x, y } => advanced(table, x.as_deref(), y.as_deref()),
    }
}

fn heatmap_section(report: &mut ViewReport, table: &TicketTable, x: &str, y: &str, title: &str) {
    match crosstab(table, x, y) {
        Ok(ct) => report.push(Section::Heatmap {
            title: title.to_string(),
            table: ct,
        }),
        Err(e) => report.notice(
            NoticeLevel::Error,
            format!("Error al generar el mapa de calor: {e}"),
        ),
    }
}

fn resolver_groups(table: &TicketTable, options: &ViewOptions) -> ViewReport {
    let mut report = ViewReport::new("Grupos Resolutores (Resuelto por)");

    let counts = match value_counts(table, columns::RESOLVED_BY) {
        Ok(counts) => counts,
        Err(e) => {
            report.notice(NoticeLevel::Error, e.to_string());
            return report;
        }
    };
    if counts.is_empty() {
        report.notice(NoticeLevel::Info, "No hay casos con resolutor asignado.");
        return report;
    }

    report.push(Section::Bar {
        title: format!(
            "Top {} Resolutores por Casos Resueltos",
            options.top_resolvers
        ),
        table: counts.top(options.top_resolvers),
    });
    heatmap_section(
        &mut report,
        table,
        columns::RESOLVED_BY,
        columns::STATUS,
        "Resolutores vs Estado",
    );
    report.push(Section::Distribution {
        title: "Distribución de Casos por Resolutor".into(),
        entries: counts.distribution(),
    });
    report
}

fn known_alerts(table: &TicketTable, filter: &AlertFilter) -> ViewReport {
    let mut report = ViewReport::new("Detalles de Incidentes de Alertas Conocidas");
    let selected = filter_by_alert(table, filter);

    if selected.is_empty() {
        report.notice(
            NoticeLevel::Info,
            format!("No hay incidentes para el tipo de alerta '{filter}'."),
        );
    } else {
        let text = |cell: Option<&CellValue>| cell.map(ToString::to_string).unwrap_or_default();
        let incidents = selected
            .rows()
            .map(|row| IncidentCard {
                number: text(row.get(columns::NUMBER)),
                resolved_by: text(row.get(columns::RESOLVED_BY)),
                work_notes: text(row.get(columns::WORK_NOTES)),
                resolution_notes: text(row.get(columns::RESOLUTION_NOTES)),
                alert_type: text(row.get(columns::ALERT_TYPE)),
            })
            .collect();
        report.push(Section::Incidents {
            title: format!("Tipo de Alerta: {filter}"),
            incidents,
        });

        match value_counts(&selected, columns::RESOLVED_BY) {
            Ok(counts) if !counts.is_empty() => report.push(Section::Bar {
                title: "Resolutores que Más Manejan Alertas Conocidas".into(),
                table: counts,
            }),
            Ok(_) => {}
            Err(e) => report.notice(NoticeLevel::Warning, e.to_string()),
        }
    }

    report.push(Section::Suggestion {
        title: "Sugerencias".into(),
        recommendation: recommend(&selected),
    });
    report
}

fn summary(table: &TicketTable, options: &ViewOptions) -> ViewReport {
    let mut report = ViewReport::new("Resumen General");
    let SummaryMetrics {
        total,
        resolved,
        known_alerts,
    } = summary_metrics(table, &options.resolved_states);

    report.push(Section::Metrics {
        title: "Métricas".into(),
        metrics: vec![
            Metric {
                label: "Total de Incidentes".into(),
                value: total,
            },
            Metric {
                label: "Casos Resueltos".into(),
                value: resolved,
            },
            Metric {
                label: "Alertas Conocidas".into(),
                value: known_alerts,
            },
        ],
    });

    if total == 0 {
        report.notice(NoticeLevel::Info, "La tabla de incidentes está vacía.");
        return report;
    }
    match value_counts(table, columns::STATUS) {
        Ok(counts) => report.push(Section::Distribution {
            title: "Distribución de Incidentes por Estado".into(),
            entries: counts.distribution(),
        }),
        Err(e) => report.notice(NoticeLevel::Warning, e.to_string()),
    }
    report
}

fn phrase_analysis(table: &TicketTable, options: &ViewOptions) -> ViewReport {
    let mut report = ViewReport::new("Análisis de Frases Comunes");
    let phrases = phrase_frequency(table, options.top_phrases);
    if phrases.is_empty() {
        report.notice(NoticeLevel::Info, "No hay notas para analizar.");
    } else {
        report.push(Section::Bar {
            title: "Top Frases Más Repetidas".into(),
            table: phrases,
        });
    }
    report
}

fn incident_detail(table: &TicketTable, number: Option<&str>) -> ViewReport {
    let mut report = ViewReport::new("Detalle de Incidente");

    let wanted = match number {
        Some(n) => n.trim().to_string(),
        None => match incident_numbers(table).into_iter().next() {
            Some(first) => first,
            None => {
                report.notice(NoticeLevel::Info, "No hay incidentes cargados.");
                return report;
            }
        },
    };

    let matches: Vec<_> = table
        .rows()
        .filter(|row| {
            row.get(columns::NUMBER)
                .and_then(CellValue::key)
                .is_some_and(|k| k == wanted)
        })
        .collect();
    if matches.is_empty() {
        report.notice(
            NoticeLevel::Info,
            format!("No se encontró el incidente '{wanted}'."),
        );
        return report;
    }

    // One record per ticket row; repeated numbers are numbered in table order.
    let total = matches.len();
    for (i, row) in matches.into_iter().enumerate() {
        let title = if total == 1 {
            format!("Información del Incidente {wanted}")
        } else {
            format!("Información del Incidente {wanted} ({}/{total})", i + 1)
        };
        report.push(Section::Record {
            title,
            fields: row
                .fields()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        });
    }
    report
}

/// Distinct incident numbers in table order.
pub fn incident_numbers(table: &TicketTable) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    table
        .column_values(columns::NUMBER)
        .unwrap_or_default()
        .into_iter()
        .filter_map(CellValue::key)
        .filter(|k| seen.insert(k.clone()))
        .collect()
}

fn advanced(table: &TicketTable, x: Option<&str>, y: Option<&str>) -> ViewReport {
    let mut report = ViewReport::new("Análisis Avanzado de Datos");
    let cols = table.columns();
    let x = x.or_else(|| cols.get(1).map(String::as_str));
    let y = y.or_else(|| cols.get(2).map(String::as_str));

    match (x, y) {
        (Some(x), Some(y)) => {
            heatmap_section(&mut report, table, x, y, "Mapa de Calor Personalizado")
        }
        _ => report.notice(
            NoticeLevel::Warning,
            "Se necesitan dos columnas para generar el mapa de calor.",
        ),
    }

    match correlation_matrix(table) {
        Some(matrix) => report.push(Section::Correlation {
            title: "Mapa de Correlación entre Variables Numéricas".into(),
            matrix,
        }),
        None => report.notice(
            NoticeLevel::Warning,
            "No hay suficientes columnas numéricas para generar un análisis de correlación.",
        ),
    }
    report
}
