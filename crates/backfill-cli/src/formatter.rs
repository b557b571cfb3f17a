//! Output formatting for run and stat reports.

use backfill_core::progress::format_count;
use backfill_core::{StatRow, UnitReport};
use comfy_table::{Cell, CellAlignment, Table};
use serde::Serialize;

use crate::error::Result;

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human readable tables and lines.
    Table,
    /// JSON documents on stdout.
    Json,
}

/// Summary of a reset/run invocation.
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    /// Units whose cursors were rewound.
    pub rewound: &'a [String],
    /// Per-unit run statistics, in run order.
    pub units: &'a [UnitReport],
}

/// Render stat rows as a table.
pub fn format_stat_table(rows: &[StatRow]) -> String {
    let mut table = Table::new();
    table.set_header(vec![
        "Migration",
        "Source rows",
        "Migrated rows",
        "Migrated",
        "Consistency",
    ]);

    for row in rows {
        table.add_row(vec![
            Cell::new(&row.destination),
            Cell::new(format_count(row.source_rows)).set_alignment(CellAlignment::Right),
            Cell::new(format_count(row.target_rows)).set_alignment(CellAlignment::Right),
            Cell::new(format_percentage(Some(row.progress))).set_alignment(CellAlignment::Right),
            Cell::new(format_percentage(row.consistency)).set_alignment(CellAlignment::Right),
        ]);
    }

    table.to_string()
}

/// Render stat rows as JSON.
pub fn format_stat_json(rows: &[StatRow]) -> Result<String> {
    Ok(serde_json::to_string_pretty(rows)?)
}

/// Render a run summary as JSON.
pub fn format_run_json(summary: &RunSummary<'_>) -> Result<String> {
    Ok(serde_json::to_string_pretty(summary)?)
}

/// Format a ratio as a whole percentage, `-` when absent.
pub fn format_percentage(ratio: Option<f64>) -> String {
    match ratio {
        Some(ratio) if ratio.is_finite() => format!("{}%", (ratio * 100.0).round() as i64),
        _ => "-".to_string(),
    }
}
