// File: main.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2025
// - Volker Schwaberow <volker@schwaberow.de>

use clap::Parser;
use colored::*;
use simple_logger::SimpleLogger;

use rtimer::cli::{effective_log_level, Cli, Commands};
use rtimer::commands;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = SimpleLogger::new()
        .with_level(effective_log_level(&cli))
        .init()
    {
        eprintln!("Failed to initialise logger: {}", e);
    }

    let result = match &cli.command {
        Commands::Attack(args) => commands::handle_attack_command(args).await,
        Commands::Markers(args) => commands::handle_markers_command(args),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
