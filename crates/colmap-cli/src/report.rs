//! Per-sheet statistics and `comfy-table` rendering.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use colmap_map::CONFIDENCE_THRESHOLD;
use colmap_model::{MappingEntry, MappingSession, SessionSummary};
use colmap_store::{DatasetInfo, FrameworkInfo};

/// Aggregates for one standard sheet of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetReport {
    pub sheet: String,
    pub columns: usize,
    pub matched: usize,
    pub placeholders: usize,
    /// Mean confidence over matched entries; `None` when nothing matched.
    pub mean_confidence: Option<f64>,
}

/// Summarize entries per standard sheet, in first-seen order.
pub fn sheet_reports(entries: &[MappingEntry]) -> Vec<SheetReport> {
    let mut reports: Vec<SheetReport> = Vec::new();
    let mut confidence_sums: Vec<f64> = Vec::new();

    for entry in entries {
        let index = match reports
            .iter()
            .position(|report| report.sheet == entry.standard_sheet_name)
        {
            Some(index) => index,
            None => {
                reports.push(SheetReport {
                    sheet: entry.standard_sheet_name.clone(),
                    columns: 0,
                    matched: 0,
                    placeholders: 0,
                    mean_confidence: None,
                });
                confidence_sums.push(0.0);
                reports.len() - 1
            }
        };

        let report = &mut reports[index];
        report.columns += 1;
        if entry.has_source() {
            report.matched += 1;
            confidence_sums[index] += entry.confidence;
        } else {
            report.placeholders += 1;
        }
    }

    for (report, sum) in reports.iter_mut().zip(confidence_sums) {
        if report.matched > 0 {
            report.mean_confidence = Some(sum / report.matched as f64);
        }
    }
    reports
}

pub fn session_table(session: &MappingSession) -> Table {
    let reports = sheet_reports(&session.entries);
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Sheet"),
        header_cell("Columns"),
        header_cell("Matched"),
        header_cell("Placeholders"),
        header_cell("Mean confidence"),
    ]);
    apply_table_style(&mut table);
    for index in 1..=4 {
        align_column(&mut table, index, CellAlignment::Right);
    }

    let mut total_columns = 0;
    let mut total_matched = 0;
    let mut total_placeholders = 0;
    for report in &reports {
        total_columns += report.columns;
        total_matched += report.matched;
        total_placeholders += report.placeholders;
        table.add_row(vec![
            Cell::new(&report.sheet)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(report.columns),
            count_cell(report.matched, Color::Green),
            count_cell(report.placeholders, Color::Yellow),
            confidence_cell(report.mean_confidence),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(total_columns).add_attribute(Attribute::Bold),
        count_cell(total_matched, Color::Green).add_attribute(Attribute::Bold),
        count_cell(total_placeholders, Color::Yellow).add_attribute(Attribute::Bold),
        dim_cell("-"),
    ]);
    table
}

pub fn entries_table(entries: &[MappingEntry]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Standard sheet"),
        header_cell("Standard column"),
        header_cell("Source sheet"),
        header_cell("Source column"),
        header_cell("Confidence"),
        header_cell("Rationale"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 4, CellAlignment::Right);
    for entry in entries {
        let (source_sheet, source_column) = if entry.has_source() {
            (
                Cell::new(&entry.source_sheet_name),
                Cell::new(&entry.source_column_name),
            )
        } else {
            (dim_cell("-"), dim_cell("-"))
        };
        table.add_row(vec![
            Cell::new(&entry.standard_sheet_name),
            Cell::new(&entry.standard_column_name),
            source_sheet,
            source_column,
            confidence_cell(Some(entry.confidence)),
            dim_cell(&entry.rationale),
        ]);
    }
    table
}

pub fn sessions_table(sessions: &[SessionSummary]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Session"),
        header_cell("Dataset"),
        header_cell("Framework"),
        header_cell("Created (UTC)"),
        header_cell("Entries"),
        header_cell("Matched"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 4, CellAlignment::Right);
    align_column(&mut table, 5, CellAlignment::Right);
    for session in sessions {
        table.add_row(vec![
            Cell::new(session.id),
            Cell::new(&session.dataset_id),
            Cell::new(&session.framework_id),
            dim_cell(session.created_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(session.entry_count),
            count_cell(session.matched_count, Color::Green),
        ]);
    }
    table
}

pub fn datasets_table(datasets: &[DatasetInfo]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Dataset"),
        header_cell("Name"),
        header_cell("Sheets"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for dataset in datasets {
        table.add_row(vec![
            Cell::new(&dataset.id),
            Cell::new(&dataset.name),
            Cell::new(dataset.sheet_count),
        ]);
    }
    table
}

pub fn frameworks_table(frameworks: &[FrameworkInfo]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Framework"),
        header_cell("Name"),
        header_cell("Version"),
        header_cell("Sheets"),
        header_cell("Columns"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Right);
    for framework in frameworks {
        let version = if framework.version.is_empty() {
            dim_cell("-")
        } else {
            Cell::new(&framework.version)
        };
        table.add_row(vec![
            Cell::new(&framework.id),
            Cell::new(&framework.name),
            version,
            Cell::new(framework.sheet_count),
            Cell::new(framework.column_count),
        ]);
    }
    table
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color)
    } else {
        dim_cell(count)
    }
}

fn confidence_cell(confidence: Option<f64>) -> Cell {
    match confidence {
        Some(value) if value >= CONFIDENCE_THRESHOLD => {
            Cell::new(format!("{value:.2}")).fg(Color::Green)
        }
        Some(value) if value > 0.0 => Cell::new(format!("{value:.2}")).fg(Color::Yellow),
        Some(value) => dim_cell(format!("{value:.2}")),
        None => dim_cell("-"),
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
