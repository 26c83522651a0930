//! Terminal renderer for view reports.
//!
//! Turns a [`ViewReport`] into plain text with optional ANSI styling: bar
//! rows scaled to the terminal width, shaded heatmap grids, aligned tables
//! and wrapped note text.

use incidash_core::aggregate::{ContingencyTable, CorrelationMatrix, DistributionEntry, FrequencyTable};
use incidash_core::views::{IncidentCard, Metric};
use incidash_core::{NoticeLevel, Section, ViewReport};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// ANSI escape codes for terminal formatting.
mod ansi {
    pub const BOLD_ON: &str = "\x1b[1m";
    pub const BOLD_OFF: &str = "\x1b[22m";
    pub const DIM_ON: &str = "\x1b[2m";
    pub const DIM_OFF: &str = "\x1b[22m";
    pub const CYAN: &str = "\x1b[36m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const RESET: &str = "\x1b[0m";
}

/// Heatmap shades from empty to the largest cell.
const SHADES: [char; 5] = [' ', '░', '▒', '▓', '█'];
const BAR_CHAR: char = '█';
const MIN_WIDTH: usize = 40;
const LABEL_MAX: usize = 32;
const CELL_WIDTH: usize = 8;

/// Width of the attached terminal, or 80 columns when there is none.
pub fn terminal_width() -> usize {
    crossterm::terminal::size()
        .map(|(cols, _)| cols as usize)
        .unwrap_or(80)
}

/// Renders reports as text.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    width: usize,
    color: bool,
}

impl Renderer {
    pub fn new(width: usize, color: bool) -> Self {
        Self {
            width: width.max(MIN_WIDTH),
            color,
        }
    }

    /// Renderer sized to the current terminal.
    pub fn for_terminal(color: bool) -> Self {
        Self::new(terminal_width(), color)
    }

    pub fn render(&self, report: &ViewReport) -> String {
        let mut out = String::new();
        out.push_str(&self.heading(&report.title, '='));
        for section in &report.sections {
            out.push('\n');
            out.push_str(&self.section(section));
        }
        if !report.notices.is_empty() {
            out.push('\n');
        }
        for notice in &report.notices {
            let (tag, color) = match notice.level {
                NoticeLevel::Info => ("info", ansi::CYAN),
                NoticeLevel::Warning => ("aviso", ansi::YELLOW),
                NoticeLevel::Error => ("error", ansi::RED),
            };
            out.push_str(&self.paint(&format!("[{tag}]"), color));
            out.push(' ');
            out.push_str(&notice.message);
            out.push('\n');
        }
        out
    }

    fn section(&self, section: &Section) -> String {
        match section {
            Section::Metrics { title, metrics } => self.metrics(title, metrics),
            Section::Bar { title, table } => self.bars(title, table),
            Section::Distribution { title, entries } => self.distribution(title, entries),
            Section::Heatmap { title, table } => self.heatmap(title, table),
            Section::Correlation { title, matrix } => self.correlation(title, matrix),
            Section::Incidents { title, incidents } => self.incidents(title, incidents),
            Section::Record { title, fields } => self.record(title, fields),
            Section::Suggestion {
                title,
                recommendation,
            } => {
                let mut out = self.heading(title, '-');
                let body = recommendation.to_string();
                for line in textwrap::wrap(&body, self.width) {
                    out.push_str(&self.paint(&line, ansi::GREEN));
                    out.push('\n');
                }
                out
            }
        }
    }

    fn heading(&self, title: &str, rule: char) -> String {
        let underline: String = std::iter::repeat_n(rule, title.width().min(self.width)).collect();
        format!("{}\n{}\n", self.bold(title), underline)
    }

    fn metrics(&self, title: &str, metrics: &[Metric]) -> String {
        let mut out = self.heading(title, '-');
        let label_width = metrics.iter().map(|m| m.label.width()).max().unwrap_or(0);
        for metric in metrics {
            out.push_str(&format!(
                "{}  {}\n",
                pad_right(&metric.label, label_width),
                self.bold(&metric.value.to_string())
            ));
        }
        out
    }

    fn bars(&self, title: &str, table: &FrequencyTable) -> String {
        let mut out = self.heading(title, '-');
        let labels: Vec<String> = table
            .entries
            .iter()
            .map(|e| truncate(&e.key, LABEL_MAX))
            .collect();
        let label_width = labels.iter().map(|l| l.width()).max().unwrap_or(0);
        let max = table.entries.first().map(|e| e.count).unwrap_or(0);
        let count_width = max.to_string().len();
        let room = self
            .width
            .saturating_sub(label_width + count_width + 4)
            .max(1);

        for (label, entry) in labels.iter().zip(&table.entries) {
            let bar: String = std::iter::repeat_n(BAR_CHAR, scale(entry.count, max, room)).collect();
            out.push_str(&format!(
                "{} | {} {:>count_width$}\n",
                pad_right(label, label_width),
                self.paint(&bar, ansi::CYAN),
                entry.count
            ));
        }
        out
    }

    fn distribution(&self, title: &str, entries: &[DistributionEntry]) -> String {
        let mut out = self.heading(title, '-');
        let labels: Vec<String> = entries.iter().map(|e| truncate(&e.key, LABEL_MAX)).collect();
        let label_width = labels.iter().map(|l| l.width()).max().unwrap_or(0);
        let room = self.width.saturating_sub(label_width + 20).max(1);
        for (label, entry) in labels.iter().zip(entries) {
            let filled = ((entry.percentage / 100.0) * room as f64).round() as usize;
            let bar: String = std::iter::repeat_n(BAR_CHAR, filled.min(room)).collect();
            out.push_str(&format!(
                "{} {:>6.1}% {:>6} {}\n",
                pad_right(label, label_width),
                entry.percentage,
                entry.count,
                self.paint(&bar, ansi::CYAN)
            ));
        }
        out
    }

    fn heatmap(&self, title: &str, table: &ContingencyTable) -> String {
        let mut out = self.heading(title, '-');
        let row_labels: Vec<String> = table.rows.iter().map(|r| truncate(r, LABEL_MAX)).collect();
        let label_width = row_labels
            .iter()
            .map(|l| l.width())
            .chain(std::iter::once(table.row_label.width().min(LABEL_MAX)))
            .max()
            .unwrap_or(0);
        let fit = (self.width.saturating_sub(label_width + 1) / (CELL_WIDTH + 1)).max(1);
        let shown = table.columns.len().min(fit);

        out.push_str(&self.dim(&format!(
            "{} \\ {}\n",
            table.row_label, table.column_label
        )));
        out.push_str(&pad_right("", label_width));
        for column in &table.columns[..shown] {
            out.push(' ');
            out.push_str(&pad_left(&truncate(column, CELL_WIDTH), CELL_WIDTH));
        }
        out.push('\n');

        let max = table.max_count();
        for (label, counts) in row_labels.iter().zip(&table.counts) {
            out.push_str(&pad_right(label, label_width));
            for &count in &counts[..shown] {
                let shade = SHADES[scale(count, max, SHADES.len() - 1)];
                let cell = format!("{shade}{shade}{count:>w$}", w = CELL_WIDTH - 2);
                out.push(' ');
                out.push_str(&cell);
            }
            out.push('\n');
        }
        if shown < table.columns.len() {
            out.push_str(&self.dim(&format!(
                "({} columnas más no caben en la pantalla)\n",
                table.columns.len() - shown
            )));
        }
        out
    }

    fn correlation(&self, title: &str, matrix: &CorrelationMatrix) -> String {
        let mut out = self.heading(title, '-');
        let labels: Vec<String> = matrix.columns.iter().map(|c| truncate(c, LABEL_MAX)).collect();
        let label_width = labels.iter().map(|l| l.width()).max().unwrap_or(0);

        out.push_str(&pad_right("", label_width));
        for label in &labels {
            out.push(' ');
            out.push_str(&pad_left(&truncate(label, CELL_WIDTH), CELL_WIDTH));
        }
        out.push('\n');
        for (label, row) in labels.iter().zip(&matrix.values) {
            out.push_str(&pad_right(label, label_width));
            for value in row {
                out.push(' ');
                out.push_str(&pad_left(&format_coefficient(*value), CELL_WIDTH));
            }
            out.push('\n');
        }
        out
    }

    fn incidents(&self, title: &str, incidents: &[IncidentCard]) -> String {
        let mut out = self.heading(title, '-');
        let indent = "    ";
        let wrap = textwrap::Options::new(self.width)
            .initial_indent(indent)
            .subsequent_indent(indent);
        for card in incidents {
            out.push_str(&format!(
                "{}  {}  [{}]\n",
                self.bold(&card.number),
                card.resolved_by,
                card.alert_type
            ));
            for (label, note) in [
                ("Notas de trabajo", &card.work_notes),
                ("Notas de resolución", &card.resolution_notes),
            ] {
                if note.is_empty() {
                    continue;
                }
                out.push_str(&format!("  {}\n", self.dim(label)));
                for line in textwrap::wrap(note, &wrap) {
                    out.push_str(&line);
                    out.push('\n');
                }
            }
            out.push('\n');
        }
        out
    }

    fn record(&self, title: &str, fields: &[(String, String)]) -> String {
        let mut out = self.heading(title, '-');
        let key_width = fields
            .iter()
            .map(|(k, _)| k.width())
            .max()
            .unwrap_or(0)
            .min(LABEL_MAX);
        let indent = " ".repeat(key_width + 3);
        let wrap = textwrap::Options::new(self.width.saturating_sub(key_width + 3).max(20))
            .subsequent_indent(&indent);
        for (key, value) in fields {
            let lines = textwrap::wrap(value, &wrap);
            let first = lines.first().map_or("", |l| &**l);
            out.push_str(&format!(
                "{} : {}\n",
                self.bold(&pad_right(&truncate(key, LABEL_MAX), key_width)),
                first
            ));
            for line in lines.iter().skip(1) {
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }

    fn paint(&self, text: &str, color: &str) -> String {
        if self.color && !text.is_empty() {
            format!("{color}{text}{}", ansi::RESET)
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        if self.color {
            format!("{}{text}{}", ansi::BOLD_ON, ansi::BOLD_OFF)
        } else {
            text.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.color {
            format!("{}{text}{}", ansi::DIM_ON, ansi::DIM_OFF)
        } else {
            text.to_string()
        }
    }
}

/// Scale `value` out of `max` onto `0..=room`, keeping non-zero values visible.
fn scale(value: usize, max: usize, room: usize) -> usize {
    if max == 0 || value == 0 {
        return 0;
    }
    ((value * room) / max).max(1)
}

fn format_coefficient(value: f64) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else {
        format!("{value:.2}")
    }
}

/// Cut `text` to at most `max` display columns, marking the cut with an ellipsis.
fn truncate(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

fn pad_right(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{text}{}", " ".repeat(fill))
}

fn pad_left(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{text}", " ".repeat(fill))
}

#[cfg(test)]
mod tests {
    use super::*;
    use incidash_core::aggregate::{FrequencyEntry, Recommendation};
    use incidash_core::Notice;
    use pretty_assertions::assert_eq;

    fn plain() -> Renderer {
        Renderer::new(60, false)
    }

    fn report(sections: Vec<Section>) -> ViewReport {
        ViewReport {
            title: "Prueba".into(),
            sections,
            notices: Vec::new(),
        }
    }

    #[test]
    fn test_truncate_respects_display_width() {
        assert_eq!(truncate("Mesa Windows", 20), "Mesa Windows");
        assert_eq!(truncate("Mesa Windows", 6), "Mesa …");
        assert_eq!(truncate("Resolución", 6).width(), 6);
    }

    #[test]
    fn test_pad_uses_display_width() {
        assert_eq!(pad_right("Número", 8), "Número  ");
        assert_eq!(pad_left("ñ", 3), "  ñ");
    }

    #[test]
    fn test_scale_keeps_small_values_visible() {
        assert_eq!(scale(0, 10, 40), 0);
        assert_eq!(scale(1, 1000, 40), 1);
        assert_eq!(scale(10, 10, 40), 40);
        assert_eq!(scale(5, 0, 40), 0);
    }

    #[test]
    fn test_bars_are_proportional() {
        let table = FrequencyTable {
            column: "Resuelto por".into(),
            entries: vec![
                FrequencyEntry {
                    key: "Ana".into(),
                    count: 4,
                },
                FrequencyEntry {
                    key: "Luis".into(),
                    count: 2,
                },
            ],
        };
        let text = plain().render(&report(vec![Section::Bar {
            title: "Top".into(),
            table,
        }]));
        let lines: Vec<&str> = text.lines().filter(|l| l.contains(" | ")).collect();
        assert_eq!(lines.len(), 2);
        let ana = lines[0].matches(BAR_CHAR).count();
        let luis = lines[1].matches(BAR_CHAR).count();
        assert!(ana.abs_diff(luis * 2) <= 1);
        assert!(lines[0].starts_with("Ana "));
        assert!(lines[0].ends_with(" 4"));
    }

    #[test]
    fn test_heatmap_grid() {
        let table = ContingencyTable {
            row_label: "Resuelto por".into(),
            column_label: "Estado".into(),
            rows: vec!["Ana".into(), "Luis".into()],
            columns: vec!["Cerrada".into(), "Resuelta".into()],
            counts: vec![vec![0, 3], vec![1, 0]],
        };
        let text = plain().render(&report(vec![Section::Heatmap {
            title: "Mapa".into(),
            table,
        }]));
        assert!(text.contains("Resuelto por \\ Estado"));
        let ana = text.lines().find(|l| l.starts_with("Ana")).unwrap();
        assert!(ana.contains("██     3"));
        assert!(ana.contains("       0"));
    }

    #[test]
    fn test_correlation_marks_undefined_pairs() {
        let matrix = CorrelationMatrix {
            columns: vec!["A".into(), "B".into()],
            values: vec![vec![1.0, f64::NAN], vec![f64::NAN, 1.0]],
        };
        let text = plain().render(&report(vec![Section::Correlation {
            title: "Corr".into(),
            matrix,
        }]));
        assert!(text.contains("1.00"));
        assert!(text.contains("n/a"));
    }

    #[test]
    fn test_record_aligns_keys() {
        let text = plain().render(&report(vec![Section::Record {
            title: "Detalle".into(),
            fields: vec![
                ("Número".into(), "INC001".into()),
                ("Estado".into(), "Resuelta".into()),
            ],
        }]));
        assert!(text.contains("Número : INC001"));
        assert!(text.contains("Estado : Resuelta"));
    }

    #[test]
    fn test_long_notes_are_wrapped() {
        let note = "palabra ".repeat(40);
        let text = plain().render(&report(vec![Section::Incidents {
            title: "Incidentes".into(),
            incidents: vec![IncidentCard {
                number: "INC001".into(),
                resolved_by: "Ana".into(),
                work_notes: note.trim().to_string(),
                resolution_notes: String::new(),
                alert_type: "Superada".into(),
            }],
        }]));
        assert!(text.lines().all(|l| l.width() <= 60));
        assert!(!text.contains("Notas de resolución"));
    }

    #[test]
    fn test_suggestion_and_notices() {
        let mut r = report(vec![Section::Suggestion {
            title: "Sugerencias".into(),
            recommendation: Recommendation::InsufficientData,
        }]);
        r.notices.push(Notice {
            level: NoticeLevel::Error,
            message: "Error al generar el mapa de calor".into(),
        });
        let text = plain().render(&r);
        assert!(text.contains("No hay suficientes datos para generar sugerencias."));
        assert!(text.contains("[error] Error al generar el mapa de calor"));
    }

    #[test]
    fn test_color_is_optional() {
        let r = report(Vec::new());
        assert!(!plain().render(&r).contains('\x1b'));
        assert!(Renderer::new(60, true).render(&r).contains(ansi::BOLD_ON));
    }
}
