// File: json.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::Result;
use serde_json::json;

use super::{ReportConfig, ReportData, ReportGenerator};

pub struct JsonGenerator;

impl JsonGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl ReportGenerator for JsonGenerator {
    fn generate(&self, data: &ReportData, config: &ReportConfig) -> Result<String> {
        let document = json!({
            "generated_at": data.generated_at,
            "title": data.title,
            "target": data.target,
            "repeat_count": data.repeat_count,
            "payload_count": data.payload_count,
            "template_sha256": data.template_sha256,
            "summary": data.summary,
            "rows": data.ordered_rows(config),
        });
        let json = serde_json::to_string_pretty(&document)
            .map_err(|e| anyhow::anyhow!("Failed to serialize report to JSON: {}", e))?;
        Ok(json)
    }

    fn file_extension(&self) -> &'static str {
        "json"
    }
}
