// File: text.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::Result;
use colored::*;

use super::{ReportConfig, ReportData, ReportGenerator};
use crate::stats::ResultRow;
use crate::store::{column_extent, highlight_fraction, Column};

const RULE: &str =
    "===============================================================================\n";

pub struct TextGenerator;

impl TextGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl ReportGenerator for TextGenerator {
    fn generate(&self, data: &ReportData, config: &ReportConfig) -> Result<String> {
        let mut output = String::new();

        output.push_str(RULE);
        output.push_str(&format!(
            "                          {}\n",
            data.title.to_uppercase()
        ));
        output.push_str(RULE);
        output.push_str(&format!(
            "Generated: {}\n",
            data.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        output.push_str(&format!("Tool: rtimer v{}\n", env!("CARGO_PKG_VERSION")));
        output.push_str(RULE);
        output.push('\n');

        output.push_str("RUN SUMMARY\n");
        output.push_str("-----------\n");
        output.push_str(&format!("Target:               {}\n", data.target));
        output.push_str(&format!("Payloads:             {}\n", data.payload_count));
        output.push_str(&format!("Requests per Payload: {}\n", data.repeat_count));
        output.push_str(&format!(
            "Requests Sent:        {} / {}\n",
            data.summary.completed_requests, data.summary.total_requests
        ));
        output.push_str(&format!(
            "Failed Requests:      {}\n",
            data.summary.failed_requests
        ));
        output.push_str(&format!(
            "Duration:             {} ms\n",
            data.summary.elapsed_ms()
        ));
        if data.summary.cancelled {
            output.push_str("Status:               cancelled\n");
        }
        output.push_str(&format!("Template SHA-256:     {}\n\n", data.template_sha256));

        output.push_str("RESULTS\n");
        output.push_str("-------\n");
        if data.rows.is_empty() {
            output.push_str("No results.\n");
        } else {
            output.push_str(&render_table(&data.ordered_rows(config), &data.rows, false));
        }

        Ok(output)
    }

    fn file_extension(&self) -> &'static str {
        "txt"
    }
}

/// Background for a latency cell at `fraction` of its column's range:
/// green at the fastest, through yellow, to red at the slowest.
pub fn heat_color(fraction: f64) -> (u8, u8, u8) {
    let red = if fraction > 0.5 { 1.0 } else { 2.0 * fraction };
    let green = if fraction < 0.5 { 1.0 } else { 2.0 - 2.0 * fraction };
    let blue = 111.0 / 256.0;
    let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    (channel(red), channel(green), channel(blue))
}

pub fn display_payload(payload: &str) -> String {
    payload.escape_debug().to_string()
}

/// Fixed-width table of `rows`. Heat colouring, when enabled, scales each
/// latency column over all of `all_rows`, not just the rows shown.
pub fn render_table(rows: &[&ResultRow], all_rows: &[ResultRow], heat: bool) -> String {
    let payloads: Vec<String> = rows.iter().map(|r| display_payload(&r.payload)).collect();
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| Column::ALL.iter().map(|c| c.format(row)).collect())
        .collect();

    let payload_width = payloads
        .iter()
        .map(|p| p.chars().count())
        .chain(std::iter::once("Payload".len()))
        .max()
        .unwrap_or(0);
    let widths: Vec<usize> = Column::ALL
        .iter()
        .enumerate()
        .map(|(i, column)| {
            cells
                .iter()
                .map(|c| c[i].len())
                .chain(std::iter::once(column.title().len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let extents: Vec<Option<(f64, f64)>> = Column::ALL
        .iter()
        .map(|column| {
            if heat && column.is_latency() {
                column_extent(all_rows, *column)
            } else {
                None
            }
        })
        .collect();

    let mut table = String::new();
    table.push_str(&format!("{:<width$}", "Payload", width = payload_width));
    for (column, width) in Column::ALL.iter().zip(&widths) {
        table.push_str(&format!("  {:>width$}", column.title(), width = *width));
    }
    table.push('\n');
    table.push_str(&"-".repeat(payload_width + widths.iter().map(|w| w + 2).sum::<usize>()));
    table.push('\n');

    for ((row, payload), row_cells) in rows.iter().zip(&payloads).zip(&cells) {
        let pad = payload_width.saturating_sub(payload.chars().count());
        table.push_str(payload);
        table.push_str(&" ".repeat(pad));

        for (i, column) in Column::ALL.iter().enumerate() {
            let cell = format!("{:>width$}", row_cells[i], width = widths[i]);
            table.push_str("  ");
            match extents[i].and_then(|extent| highlight_fraction(column.value(row), extent)) {
                Some(fraction) => {
                    let (r, g, b) = heat_color(fraction);
                    let styled = if fraction > 0.75 {
                        cell.white().on_truecolor(r, g, b)
                    } else {
                        cell.black().on_truecolor(r, g, b)
                    };
                    table.push_str(&styled.to_string());
                }
                None => table.push_str(&cell),
            }
        }
        table.push('\n');
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::sample_report;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, (0, 255, 111))]
    #[case(0.25, (128, 255, 111))]
    #[case(0.5, (255, 255, 111))]
    #[case(0.75, (255, 128, 111))]
    #[case(1.0, (255, 0, 111))]
    fn test_heat_color(#[case] fraction: f64, #[case] expected: (u8, u8, u8)) {
        assert_eq!(heat_color(fraction), expected);
    }

    #[test]
    fn test_plain_table_layout() {
        let data = sample_report();
        let rows: Vec<&ResultRow> = data.rows.iter().collect();
        let table = render_table(&rows, &data.rows, false);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("Payload"));
        assert!(lines[0].ends_with("StdDev (ms)"));
        assert!(lines[2].starts_with("admin"));
        assert!(lines[2].ends_with("1.250"));
        assert!(!table.contains('\x1b'));
        let width = lines[0].len();
        assert!(lines[2..].iter().all(|l| l.len() == width));
    }

    #[test]
    fn test_control_characters_are_escaped() {
        assert_eq!(display_payload("a\r\nb"), "a\\r\\nb");
        assert_eq!(display_payload("plain"), "plain");
    }

    #[test]
    fn test_text_report() {
        let text = TextGenerator::new()
            .generate(&sample_report(), &ReportConfig::default())
            .unwrap();
        assert!(text.contains("RTIMER TIMING ATTACK REPORT"));
        assert!(text.contains("Requests Sent:        30 / 30"));
        assert!(text.contains("Duration:             4250 ms"));
        assert!(!text.contains("cancelled"));
        assert!(text.contains("guest"));
    }
}
