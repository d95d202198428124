// File: attack.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::{Context, Result};
use colored::*;
use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use log::warn;
use std::fmt::Write;
use std::future::Future;
use std::io::Read;
use std::num::NonZeroU32;
use std::time::Duration;

use super::{format_duration, load_template, print_info, print_success, print_warning};
use crate::cli::AttackArgs;
use crate::config::{parse_payload_list, AttackConfig, TargetService};
use crate::getstate::StateSnapshot;
use crate::reports::text::render_table;
use crate::reports::{ReportConfig, ReportEngine};
use crate::scheduler::{AttackScheduler, CancellationHandle};
use crate::stats::ResultRow;
use crate::store::{Column, ResultStore};
use crate::transport::RawTransport;

pub async fn execute(args: &AttackArgs) -> Result<()> {
    let template = load_template(&args.request)?;
    let payloads = parse_payload_list(&read_payloads(args)?);
    let target = TargetService::new(args.host.as_str(), args.effective_port(), args.https)?;
    let config = AttackConfig::new(template, payloads, args.requests, target)?;
    let sort_by = parse_sort(args.sort.as_deref())?;

    let transport = RawTransport::new(args.transport_config())?;
    let mut scheduler = AttackScheduler::new(transport)
        .with_batch_delay(Duration::from_millis(args.delay_ms));
    if let Some(rate) = args.rate_limit {
        let rate = NonZeroU32::new(rate).context("--rate-limit must be greater than zero")?;
        scheduler = scheduler.with_rate_limit(rate);
    }

    print_info(&format!(
        "Attacking {} with {} payload(s) x {} request(s)",
        config.target().base_url(),
        config.payloads().len(),
        config.repeat_count()
    ));

    let cancel = CancellationHandle::new();
    let ctrl_c = tokio::spawn(watch_interrupts(tokio::signal::ctrl_c, cancel.clone()));

    let progress = create_progress_bar(config.total_requests(), args.no_progress);
    let mut store = ResultStore::new();
    scheduler
        .run_into(&config, &mut store, &progress, &cancel)
        .await;
    progress.finish_and_clear();
    ctrl_c.abort();

    let summary = scheduler.state().snapshot();
    print_results(&store, sort_by, !args.ascending);
    print_summary(&summary);

    if let Some(path) = &args.output {
        let engine = ReportEngine::new();
        let data = engine.create_report_data(&config, &store, summary);
        let report_config = ReportConfig {
            sort_by,
            descending: !args.ascending,
        };
        let format = engine.resolve_format(args.format.as_deref(), path);
        engine.generate_report(&format, &data, &report_config, Some(path))?;
        print_success(&format!("{} report written to {}", format, path.display()));
    }

    Ok(())
}

/// First interrupt cancels the run cooperatively, a second one exits at once.
async fn watch_interrupts<S, F>(mut next_signal: S, cancel: CancellationHandle)
where
    S: FnMut() -> F,
    F: Future<Output = std::io::Result<()>>,
{
    if next_signal().await.is_err() {
        return;
    }
    warn!("Interrupted, stopping after the current request (press Ctrl-C again to quit)");
    cancel.cancel();

    if next_signal().await.is_ok() {
        eprintln!("{}", "Interrupted twice, exiting".red());
        std::process::exit(130);
    }
}

fn read_payloads(args: &AttackArgs) -> Result<String> {
    match &args.payloads {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read payload list {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read payload list from stdin")?;
            Ok(text)
        }
    }
}

fn parse_sort(sort: Option<&str>) -> Result<Option<Column>> {
    sort.map(|s| s.parse::<Column>().map_err(|e| anyhow::anyhow!(e)))
        .transpose()
}

fn create_progress_bar(total: u64, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})",
        )
        .unwrap()
        .with_key("eta", |state: &ProgressState, w: &mut dyn Write| {
            write!(w, "{:.1}s", state.eta().as_secs_f64()).unwrap()
        })
        .progress_chars("#>-"),
    );
    pb
}

fn print_results(store: &ResultStore, sort_by: Option<Column>, descending: bool) {
    if store.is_empty() {
        print_warning("No results");
        return;
    }

    let rows: Vec<&ResultRow> = match sort_by {
        Some(column) => store.sorted_by(column, descending),
        None => store.rows().iter().collect(),
    };
    println!();
    print!("{}", render_table(&rows, store.rows(), true));
    println!();
}

fn print_summary(summary: &StateSnapshot) {
    println!("{}", "Run Summary".bold().underline());
    println!(
        "  Requests:   {}/{}",
        summary.completed_requests, summary.total_requests
    );
    let failed = summary.failed_requests.to_string();
    println!(
        "  Failed:     {}",
        if summary.failed_requests > 0 {
            failed.red()
        } else {
            failed.green()
        }
    );
    println!("  Duration:   {}", format_duration(summary.elapsed_ms()));
    if summary.cancelled {
        println!("  Status:     {}", "cancelled".yellow());
    }
}
