// File: scheduler.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

//! Drives an attack run.
//!
//! Requests go out one at a time, ordered by (payload, repeat index). Nothing
//! here dispatches concurrently: overlapping requests would add queueing noise
//! to the very latencies being measured.

use futures::stream::{self, Stream, StreamExt};
use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use indicatif::ProgressBar;
use log::{debug, error, info, trace, warn};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::AttackConfig;
use crate::getstate::AttackState;
use crate::mutator::RequestMutator;
use crate::sampler::{LatencySampler, ResponseSnapshot};
use crate::stats::ResultRow;
use crate::store::ResultStore;
use crate::transport::Transport;

/// Upper bound on the sample buffer reserved ahead of a batch.
const MAX_PREALLOCATED_SAMPLES: usize = 4096;

/// Receives `(completed, total)` after every request. Must return quickly.
pub trait ProgressSink: Send + Sync {
    fn report(&self, completed: u64, total: u64);
}

impl ProgressSink for ProgressBar {
    fn report(&self, completed: u64, total: u64) {
        if self.length() != Some(total) {
            self.set_length(total);
        }
        self.set_position(completed);
    }
}

pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _completed: u64, _total: u64) {}
}

/// Cooperative cancellation flag, checked before each request.
#[derive(Debug, Clone, Default)]
pub struct CancellationHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancellationHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy)]
struct RunCursor {
    next_payload: usize,
    completed: u64,
    total: u64,
    stopped: bool,
}

pub struct AttackScheduler<T> {
    sampler: LatencySampler<T>,
    state: Arc<AttackState>,
    rate_limiter: Option<Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>>,
    batch_delay: Duration,
}

impl<T: Transport> AttackScheduler<T> {
    pub fn new(transport: T) -> Self {
        Self {
            sampler: LatencySampler::new(transport),
            state: Arc::new(AttackState::new()),
            rate_limiter: None,
            batch_delay: Duration::ZERO,
        }
    }

    /// Caps the request rate. The wait happens before the timer starts.
    pub fn with_rate_limit(mut self, per_second: NonZeroU32) -> Self {
        self.rate_limiter = Some(Arc::new(RateLimiter::direct(Quota::per_second(per_second))));
        self
    }

    /// Pause between payload batches, outside any timed window.
    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    pub fn with_state(mut self, state: Arc<AttackState>) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> Arc<AttackState> {
        Arc::clone(&self.state)
    }

    pub fn sampler(&self) -> &LatencySampler<T> {
        &self.sampler
    }

    /// Starts a fresh run and yields one row per payload as its batch ends.
    ///
    /// On cancellation the batch in progress still yields a row over the
    /// samples it collected; payloads that never started yield nothing.
    pub fn run<'a>(
        &'a self,
        config: &'a AttackConfig,
        progress: &'a dyn ProgressSink,
        cancel: &'a CancellationHandle,
    ) -> impl Stream<Item = ResultRow> + 'a {
        let total = config.total_requests();
        self.state.reset(total);
        progress.report(0, total);

        if config.template().has_orphan_marker() {
            warn!(
                "Request template has an odd number of markers ({}); the unmatched marker is sent literally",
                config.template().marker_count()
            );
        } else if config.template().count_marker_pairs() == 0 {
            warn!("Request template has no payload markers; every payload sends the same request");
        }

        info!(
            "Starting attack on {}: {} payload(s) x {} request(s)",
            config.target().base_url(),
            config.payloads().len(),
            config.repeat_count()
        );

        let cursor = RunCursor {
            next_payload: 0,
            completed: 0,
            total,
            stopped: false,
        };

        stream::unfold(cursor, move |cursor| {
            self.next_row(config, progress, cancel, cursor)
        })
    }

    /// Runs to completion (or cancellation), replacing the contents of `store`.
    pub async fn run_into(
        &self,
        config: &AttackConfig,
        store: &mut ResultStore,
        progress: &dyn ProgressSink,
        cancel: &CancellationHandle,
    ) -> usize {
        store.clear();
        let rows = self.run(config, progress, cancel);
        futures::pin_mut!(rows);
        while let Some(row) = rows.next().await {
            store.append(row);
        }
        store.len()
    }

    async fn next_row(
        &self,
        config: &AttackConfig,
        progress: &dyn ProgressSink,
        cancel: &CancellationHandle,
        mut cursor: RunCursor,
    ) -> Option<(ResultRow, RunCursor)> {
        if cursor.stopped {
            return None;
        }

        let Some(payload) = config.payloads().get(cursor.next_payload) else {
            self.state.finish(false);
            info!(
                "Attack finished: {} request(s), {} failed",
                cursor.completed,
                self.state.failed_requests()
            );
            return None;
        };
        let payload_index = cursor.next_payload;
        cursor.next_payload += 1;

        if payload_index == 0 && !cancel.is_cancelled() {
            if let Err(e) = self.sampler.transport().prepare(config.target()).await {
                warn!("Could not prepare {}: {}", config.target().authority(), e);
            }
        }

        if payload_index > 0 && !self.batch_delay.is_zero() && !cancel.is_cancelled() {
            tokio::time::sleep(self.batch_delay).await;
        }

        let request = RequestMutator::substitute(config.template(), payload);
        let mut samples = Vec::with_capacity(config.repeat_count().min(MAX_PREALLOCATED_SAMPLES));
        let mut last_snapshot = ResponseSnapshot::failed();

        for repeat in 0..config.repeat_count() {
            if cancel.is_cancelled() {
                cursor.stopped = true;
                break;
            }
            if let Some(limiter) = &self.rate_limiter {
                limiter.until_ready().await;
            }

            let measurement = self.sampler.send(config.target(), &request).await;
            trace!(
                "payload #{} request #{}: {:.3}ms status {}",
                payload_index,
                repeat,
                measurement.sample.duration_millis,
                measurement.snapshot.status_code
            );

            if measurement.failure.is_some() {
                self.state.add_failure();
            } else {
                self.state.add_success();
            }
            cursor.completed += 1;
            progress.report(cursor.completed, cursor.total);

            samples.push(measurement.sample.duration_millis);
            last_snapshot = measurement.snapshot;
        }

        if cursor.stopped {
            info!(
                "Attack cancelled after {} of {} request(s)",
                cursor.completed, cursor.total
            );
            self.state.finish(true);
            if samples.is_empty() {
                return None;
            }
        }

        match ResultRow::from_batch(payload, &samples, &last_snapshot) {
            Ok(row) => {
                debug!(
                    "Payload {:?}: {} request(s), mean {:.3}ms, status {}",
                    row.payload, row.request_count, row.mean_ms, row.status_code
                );
                Some((row, cursor))
            }
            Err(e) => {
                error!("Could not aggregate payload {:?}: {}", payload, e);
                self.state.finish(true);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetService;
    use crate::errors::TimingError;
    use crate::markers::RequestTemplate;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        requests: Mutex<Vec<Vec<u8>>>,
        calls: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl Transport for Recording {
        async fn prepare(&self, _: &TargetService) -> Result<(), TimingError> {
            self.calls.lock().unwrap().push("prepare");
            Ok(())
        }

        async fn send(&self, _: &TargetService, request: &[u8]) -> Result<Vec<u8>, TimingError> {
            self.calls.lock().unwrap().push("send");
            self.requests.lock().unwrap().push(request.to_vec());
            Ok(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok".to_vec())
        }
    }

    #[derive(Default)]
    struct Reports(Mutex<Vec<(u64, u64)>>);

    impl ProgressSink for Reports {
        fn report(&self, completed: u64, total: u64) {
            self.0.lock().unwrap().push((completed, total));
        }
    }

    fn config(payloads: &[&str], repeat: usize) -> AttackConfig {
        AttackConfig::new(
            RequestTemplate::from_text("GET /?q=§x§ HTTP/1.1\r\nHost: t\r\n\r\n"),
            payloads.iter().map(|p| p.to_string()),
            repeat,
            TargetService::new("t", 80, false).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_requests_follow_payload_then_repeat_order() {
        let transport = Arc::new(Recording::default());
        let scheduler = AttackScheduler::new(Arc::clone(&transport));
        let config = config(&["a", "b"], 2);
        let mut store = ResultStore::new();

        scheduler
            .run_into(&config, &mut store, &NoProgress, &CancellationHandle::new())
            .await;

        let requests = transport.requests.lock().unwrap();
        let lines: Vec<String> = requests
            .iter()
            .map(|r| String::from_utf8_lossy(r).lines().next().unwrap().to_string())
            .collect();
        assert_eq!(
            lines,
            vec![
                "GET /?q=a HTTP/1.1",
                "GET /?q=a HTTP/1.1",
                "GET /?q=b HTTP/1.1",
                "GET /?q=b HTTP/1.1"
            ]
        );
    }

    #[tokio::test]
    async fn test_progress_reported_after_every_request() {
        let scheduler = AttackScheduler::new(Recording::default());
        let config = config(&["a", "b"], 3);
        let reports = Reports::default();
        let mut store = ResultStore::new();

        scheduler
            .run_into(&config, &mut store, &reports, &CancellationHandle::new())
            .await;

        let reports = reports.0.lock().unwrap();
        assert_eq!(reports.first(), Some(&(0, 6)));
        assert_eq!(reports.last(), Some(&(6, 6)));
        assert_eq!(reports.len(), 7);
        assert!(reports.windows(2).all(|w| w[1].0 == w[0].0 + 1));
    }

    #[tokio::test]
    async fn test_cancel_before_start_yields_nothing() {
        let transport = Arc::new(Recording::default());
        let scheduler = AttackScheduler::new(Arc::clone(&transport));
        let cancel = CancellationHandle::new();
        cancel.cancel();
        let mut store = ResultStore::new();

        let rows = scheduler
            .run_into(&config(&["a"], 5), &mut store, &NoProgress, &cancel)
            .await;

        assert_eq!(rows, 0);
        assert!(transport.requests.lock().unwrap().is_empty());
        assert!(transport.calls.lock().unwrap().is_empty());
        assert!(scheduler.state().was_cancelled());
    }

    #[tokio::test]
    async fn test_target_prepared_once_before_first_request() {
        let transport = Arc::new(Recording::default());
        let scheduler = AttackScheduler::new(Arc::clone(&transport));
        let mut store = ResultStore::new();

        scheduler
            .run_into(&config(&["a", "b"], 2), &mut store, &NoProgress, &CancellationHandle::new())
            .await;

        let calls = transport.calls.lock().unwrap();
        assert_eq!(*calls, vec!["prepare", "send", "send", "send", "send"]);
    }

    #[tokio::test]
    async fn test_huge_repeat_count_does_not_reserve_upfront() {
        let scheduler = AttackScheduler::new(Recording::default());
        let cancel = CancellationHandle::new();
        cancel.cancel();
        let mut store = ResultStore::new();

        let rows = scheduler
            .run_into(&config(&["a"], usize::MAX), &mut store, &NoProgress, &cancel)
            .await;

        assert_eq!(rows, 0);
        assert_eq!(scheduler.state().snapshot().total_requests, usize::MAX as u64);
    }

    #[tokio::test]
    async fn test_state_counts_run() {
        let scheduler = AttackScheduler::new(Recording::default());
        let mut store = ResultStore::new();
        scheduler
            .run_into(&config(&["a", "b", "c"], 2), &mut store, &NoProgress, &CancellationHandle::new())
            .await;

        let snapshot = scheduler.state().snapshot();
        assert_eq!(snapshot.total_requests, 6);
        assert_eq!(snapshot.completed_requests, 6);
        assert_eq!(snapshot.failed_requests, 0);
        assert!(!snapshot.cancelled);
        assert!(scheduler.state().is_finished());
    }

    #[tokio::test]
    async fn test_run_is_restartable() {
        let scheduler = AttackScheduler::new(Recording::default());
        let config = config(&["a", "b"], 1);
        let mut store = ResultStore::new();
        let cancel = CancellationHandle::new();

        assert_eq!(scheduler.run_into(&config, &mut store, &NoProgress, &cancel).await, 2);
        assert_eq!(scheduler.run_into(&config, &mut store, &NoProgress, &cancel).await, 2);
        assert_eq!(store.len(), 2);
    }
}
