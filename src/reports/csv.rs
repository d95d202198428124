// File: csv.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::Result;

use super::{ReportConfig, ReportData, ReportGenerator};
use crate::store::Column;

pub struct CsvGenerator;

impl CsvGenerator {
    pub fn new() -> Self {
        Self
    }

    fn escape_csv(&self, field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
        {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }
}

impl ReportGenerator for CsvGenerator {
    fn generate(&self, data: &ReportData, config: &ReportConfig) -> Result<String> {
        let mut csv = String::new();

        let header: Vec<String> = std::iter::once("Payload")
            .chain(Column::ALL.iter().map(|c| c.title()))
            .map(|title| self.escape_csv(title))
            .collect();
        csv.push_str(&header.join(","));
        csv.push('\n');

        for row in data.ordered_rows(config) {
            let mut fields = vec![self.escape_csv(&row.payload)];
            fields.extend(Column::ALL.iter().map(|c| c.format(row)));
            csv.push_str(&fields.join(","));
            csv.push('\n');
        }

        Ok(csv)
    }

    fn file_extension(&self) -> &'static str {
        "csv"
    }
}
