// File: cli.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::TransportConfig;
use crate::errors::TimingError;

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long = "log-level", default_value = "warn", global = true)]
    pub log_level: String,

    #[arg(
        short = 'v',
        long = "verbose",
        help = "Enable verbose output",
        global = true
    )]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long = "quiet",
        help = "Reduce output verbosity",
        global = true
    )]
    pub quiet: bool,

    #[arg(long = "no-color", help = "Disable colored output", global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a marked request with every payload and compare latencies
    Attack(AttackArgs),
    /// Edit or inspect the payload markers of a request template
    Markers(MarkerArgs),
}

#[derive(Args, Debug)]
pub struct AttackArgs {
    #[arg(short = 'r', long = "request", help = "Raw HTTP request template file")]
    pub request: PathBuf,

    #[arg(
        short = 'p',
        long = "payloads",
        help = "Payload list, one per line (reads stdin when omitted)"
    )]
    pub payloads: Option<PathBuf>,

    #[arg(short = 'H', long = "host")]
    pub host: String,

    #[arg(short = 'P', long = "port", help = "Defaults to 443 with --https, else 80")]
    pub port: Option<u16>,

    #[arg(long = "https", help = "Connect over TLS")]
    pub https: bool,

    #[arg(
        short = 'n',
        long = "requests",
        default_value_t = 100,
        help = "Requests sent per payload"
    )]
    pub requests: usize,

    #[arg(
        short = 't',
        long = "timeout",
        default_value_t = 30,
        help = "Read timeout in seconds"
    )]
    pub timeout: u64,

    #[arg(
        long = "connect-timeout",
        default_value_t = 10,
        help = "Connect timeout in seconds"
    )]
    pub connect_timeout: u64,

    #[arg(long = "max-response-bytes", default_value_t = 16 * 1024 * 1024)]
    pub max_response_bytes: usize,

    #[arg(long = "verify-tls", help = "Verify the server certificate")]
    pub verify_tls: bool,

    #[arg(long = "rate-limit", help = "Maximum requests per second")]
    pub rate_limit: Option<u32>,

    #[arg(
        long = "delay-ms",
        default_value_t = 0,
        help = "Pause between payloads in milliseconds"
    )]
    pub delay_ms: u64,

    #[arg(long = "sort", help = "Sort the table by column (e.g. mean, median, status)")]
    pub sort: Option<String>,

    #[arg(long = "ascending", help = "Sort ascending instead of descending")]
    pub ascending: bool,

    #[arg(short = 'o', long = "output", help = "Write a report to this file")]
    pub output: Option<PathBuf>,

    #[arg(
        short = 'f',
        long = "format",
        help = "Report format: csv, json, markdown, text (default: from the --output extension, else csv)"
    )]
    pub format: Option<String>,

    #[arg(long = "no-progress", help = "Hide the progress bar")]
    pub no_progress: bool,
}

#[derive(Args, Debug)]
pub struct MarkerArgs {
    #[arg(help = "Request template file")]
    pub file: PathBuf,

    #[arg(long = "insert", help = "Insert a marker at this byte offset")]
    pub insert: Option<usize>,

    #[arg(long = "wrap", help = "Wrap the byte range START:END in markers")]
    pub wrap: Option<String>,

    #[arg(long = "wrap-text", help = "Wrap the first occurrence of this text")]
    pub wrap_text: Option<String>,

    #[arg(long = "strip", help = "Remove every marker")]
    pub strip: bool,

    #[arg(long = "count", help = "Print the number of marker pairs")]
    pub count: bool,

    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    #[arg(long = "in-place", help = "Write the result back to the input file")]
    pub in_place: bool,
}

impl AttackArgs {
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(if self.https { 443 } else { 80 })
    }

    pub fn transport_config(&self) -> TransportConfig {
        let mut config = TransportConfig::new();
        config.set_connect_timeout(Duration::from_secs(self.connect_timeout));
        config.set_read_timeout(Duration::from_secs(self.timeout));
        config.set_max_response_bytes(self.max_response_bytes);
        config.set_verify_tls(self.verify_tls);
        config
    }
}

impl MarkerArgs {
    pub fn parse_wrap(&self) -> Option<Result<(usize, usize), TimingError>> {
        self.wrap.as_deref().map(parse_range)
    }
}

fn parse_range(range: &str) -> Result<(usize, usize), TimingError> {
    let (start, end) = range
        .split_once(':')
        .ok_or_else(|| TimingError::config(format!("expected START:END, got '{}'", range)))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<usize>()
            .map_err(|_| TimingError::config(format!("invalid offset '{}'", s)))
    };
    Ok((parse(start)?, parse(end)?))
}

pub fn effective_log_level(cli: &Cli) -> log::LevelFilter {
    if cli.verbose {
        return log::LevelFilter::Debug;
    }
    if cli.quiet {
        return log::LevelFilter::Error;
    }
    match cli.log_level.to_lowercase().as_str() {
        "off" => log::LevelFilter::Off,
        "error" => log::LevelFilter::Error,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Warn,
    }
}
