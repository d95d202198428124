// File: mod.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::config::AttackConfig;
use crate::getstate::StateSnapshot;
use crate::stats::ResultRow;
use crate::store::{sort_rows, Column, ResultStore};

pub mod csv;
pub mod json;
pub mod markdown;
pub mod text;

/// Export of one finished (or cancelled) run.
#[derive(Debug, Clone, Serialize)]
pub struct ReportData {
    pub generated_at: DateTime<Utc>,
    pub title: String,
    pub target: String,
    pub repeat_count: usize,
    pub payload_count: usize,
    pub template_sha256: String,
    pub summary: StateSnapshot,
    pub rows: Vec<ResultRow>,
}

#[derive(Debug, Clone, Default)]
pub struct ReportConfig {
    pub sort_by: Option<Column>,
    pub descending: bool,
}

impl ReportData {
    /// Rows in the order the report should list them.
    pub fn ordered_rows(&self, config: &ReportConfig) -> Vec<&ResultRow> {
        match config.sort_by {
            Some(column) => sort_rows(&self.rows, column, config.descending),
            None => self.rows.iter().collect(),
        }
    }
}

pub trait ReportGenerator {
    fn generate(&self, data: &ReportData, config: &ReportConfig) -> Result<String>;
    fn file_extension(&self) -> &'static str;
}

const FORMATS: [&str; 4] = ["csv", "json", "markdown", "text"];

pub struct ReportEngine;

impl ReportEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn generate_report<P: AsRef<Path>>(
        &self,
        format: &str,
        data: &ReportData,
        config: &ReportConfig,
        output_path: Option<P>,
    ) -> Result<String> {
        let generator = self.get_generator(format)?;
        let content = generator.generate(data, config)?;

        if let Some(path) = output_path {
            std::fs::write(path, &content)?;
        }

        Ok(content)
    }

    pub fn create_report_data(
        &self,
        config: &AttackConfig,
        store: &ResultStore,
        summary: StateSnapshot,
    ) -> ReportData {
        ReportData {
            generated_at: Utc::now(),
            title: "rtimer Timing Attack Report".to_string(),
            target: config.target().base_url(),
            repeat_count: config.repeat_count(),
            payload_count: config.payloads().len(),
            template_sha256: template_fingerprint(config.template().as_bytes()),
            summary,
            rows: store.rows().to_vec(),
        }
    }

    /// Explicit `format`, else the one whose extension `path` carries, else CSV.
    pub fn resolve_format(&self, format: Option<&str>, path: &Path) -> String {
        if let Some(format) = format {
            return format.to_string();
        }
        self.format_for_path(path).unwrap_or("csv").to_string()
    }

    pub fn format_for_path(&self, path: &Path) -> Option<&'static str> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        FORMATS.into_iter().find(|format| {
            self.get_generator(format)
                .map(|generator| generator.file_extension() == extension)
                .unwrap_or(false)
        })
    }

    pub fn get_generator(&self, format: &str) -> Result<Box<dyn ReportGenerator>> {
        match format.to_lowercase().as_str() {
            "json" => Ok(Box::new(json::JsonGenerator::new())),
            "text" | "txt" => Ok(Box::new(text::TextGenerator::new())),
            "markdown" | "md" => Ok(Box::new(markdown::MarkdownGenerator::new())),
            "csv" => Ok(Box::new(csv::CsvGenerator::new())),
            _ => Err(anyhow::anyhow!("Unsupported report format: {}", format)),
        }
    }
}

/// Hex SHA-256 of the raw template bytes (markers as the sentinel byte).
pub fn template_fingerprint(template: &[u8]) -> String {
    Sha256::digest(template)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
pub(crate) fn sample_report() -> ReportData {
    let row = |payload: &str, mean: f64| ResultRow {
        payload: payload.to_string(),
        request_count: 10,
        status_code: 200,
        total_length: 512,
        body_length: 128,
        min_ms: mean as u64 - 2,
        max_ms: mean as u64 + 5,
        mean_ms: mean,
        median_ms: mean,
        stddev_ms: 1.25,
    };

    ReportData {
        generated_at: Utc::now(),
        title: "rtimer Timing Attack Report".to_string(),
        target: "https://example.com:443".to_string(),
        repeat_count: 10,
        payload_count: 3,
        template_sha256: template_fingerprint(b"GET / HTTP/1.1\r\n\r\n"),
        summary: StateSnapshot {
            total_requests: 30,
            completed_requests: 30,
            failed_requests: 1,
            start_time: 1_700_000_000_000,
            end_time: 1_700_000_004_250,
            cancelled: false,
        },
        rows: vec![row("admin", 41.5), row("guest", 12.25), row("root, \"x\"", 20.0)],
    }
}
