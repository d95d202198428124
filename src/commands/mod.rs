// File: mod.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::{Context, Result};
use colored::*;
use std::path::Path;

use crate::cli::{AttackArgs, MarkerArgs};
use crate::markers::RequestTemplate;

pub mod attack;
pub mod markers;

pub async fn handle_attack_command(args: &AttackArgs) -> Result<()> {
    attack::execute(args).await
}

pub fn handle_markers_command(args: &MarkerArgs) -> Result<()> {
    markers::execute(args)
}

/// Reads a template file; `§` in the text becomes the marker byte.
pub fn load_template(path: &Path) -> Result<RequestTemplate> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read request template {}", path.display()))?;
    Ok(RequestTemplate::from_file_bytes(bytes))
}

pub fn save_template(path: &Path, template: &RequestTemplate) -> Result<()> {
    std::fs::write(path, template.to_file_bytes())
        .with_context(|| format!("Failed to write request template {}", path.display()))
}

fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

fn format_duration(ms: u64) -> String {
    if ms >= 60000 {
        format!("{}m {:.1}s", ms / 60000, (ms % 60000) as f64 / 1000.0)
    } else if ms >= 1000 {
        format!("{:.2}s", ms as f64 / 1000.0)
    } else {
        format!("{}ms", ms)
    }
}
