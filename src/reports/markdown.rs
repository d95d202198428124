// File: markdown.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::Result;

use super::{ReportConfig, ReportData, ReportGenerator};
use crate::store::Column;

pub struct MarkdownGenerator;

impl MarkdownGenerator {
    pub fn new() -> Self {
        Self
    }

    fn escape_markdown(&self, text: &str) -> String {
        text.replace('\\', "\\\\")
            .replace('|', "\\|")
            .replace('*', "\\*")
            .replace('_', "\\_")
            .replace('`', "\\`")
            .replace('#', "\\#")
            .replace('[', "\\[")
            .replace(']', "\\]")
            .replace('\r', "\\r")
            .replace('\n', "\\n")
    }
}

impl ReportGenerator for MarkdownGenerator {
    fn generate(&self, data: &ReportData, config: &ReportConfig) -> Result<String> {
        let mut md = String::new();

        md.push_str(&format!("# {}\n\n", data.title));
        md.push_str(&format!(
            "**Generated:** {} | **Tool:** rtimer v{}\n\n",
            data.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            env!("CARGO_PKG_VERSION")
        ));
        md.push_str("---\n\n");

        md.push_str("## Run Summary\n\n");
        md.push_str("| Metric | Value |\n");
        md.push_str("|--------|-------|\n");
        md.push_str(&format!("| Target | `{}` |\n", data.target));
        md.push_str(&format!("| Payloads | {} |\n", data.payload_count));
        md.push_str(&format!("| Requests per Payload | {} |\n", data.repeat_count));
        md.push_str(&format!(
            "| Requests Sent | {} / {} |\n",
            data.summary.completed_requests, data.summary.total_requests
        ));
        md.push_str(&format!(
            "| Failed Requests | {} |\n",
            data.summary.failed_requests
        ));
        md.push_str(&format!(
            "| Duration | {} ms |\n",
            data.summary.elapsed_ms()
        ));
        md.push_str(&format!(
            "| Cancelled | {} |\n",
            if data.summary.cancelled { "yes" } else { "no" }
        ));
        md.push_str(&format!(
            "| Template SHA-256 | `{}` |\n\n",
            data.template_sha256
        ));

        md.push_str("## Results\n\n");
        if data.rows.is_empty() {
            md.push_str("_No results._\n");
            return Ok(md);
        }

        md.push_str("| Payload |");
        for column in Column::ALL {
            md.push_str(&format!(" {} |", column.title()));
        }
        md.push_str("\n|---|");
        for _ in Column::ALL {
            md.push_str("---:|");
        }
        md.push('\n');

        for row in data.ordered_rows(config) {
            md.push_str(&format!("| {} |", self.escape_markdown(&row.payload)));
            for column in Column::ALL {
                md.push_str(&format!(" {} |", column.format(row)));
            }
            md.push('\n');
        }

        Ok(md)
    }

    fn file_extension(&self) -> &'static str {
        "md"
    }
}
