// File: getstate.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Counters of the current run.
///
/// Written only by the worker running the attack; anything else reading them
/// gets an advisory snapshot.
#[derive(Debug, Default)]
pub struct AttackState {
    total_requests: AtomicU64,
    completed_requests: AtomicU64,
    failed_requests: AtomicU64,
    start_time: AtomicU64,
    end_time: AtomicU64,
    cancelled: AtomicBool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    pub total_requests: u64,
    pub completed_requests: u64,
    pub failed_requests: u64,
    pub start_time: u64,
    pub end_time: u64,
    pub cancelled: bool,
}

impl StateSnapshot {
    pub fn successful_requests(&self) -> u64 {
        self.completed_requests - self.failed_requests
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.end_time.saturating_sub(self.start_time)
    }
}

fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

impl AttackState {
    pub fn new() -> AttackState {
        AttackState::default()
    }

    /// Zeroes the counters for a run of `total_requests` and stamps its start.
    pub fn reset(&self, total_requests: u64) {
        self.total_requests.store(total_requests, Ordering::Relaxed);
        self.completed_requests.store(0, Ordering::Relaxed);
        self.failed_requests.store(0, Ordering::Relaxed);
        self.end_time.store(0, Ordering::Relaxed);
        self.cancelled.store(false, Ordering::Relaxed);
        self.start_time.store(now_millis(), Ordering::Relaxed);
    }

    pub fn add_success(&self) {
        self.completed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_failure(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
        self.completed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn finish(&self, cancelled: bool) {
        self.cancelled.store(cancelled, Ordering::Relaxed);
        self.end_time.store(now_millis(), Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn completed_requests(&self) -> u64 {
        self.completed_requests.load(Ordering::Relaxed)
    }

    pub fn failed_requests(&self) -> u64 {
        self.failed_requests.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.end_time.load(Ordering::Relaxed) != 0
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            total_requests: self.total_requests(),
            completed_requests: self.completed_requests(),
            failed_requests: self.failed_requests(),
            start_time: self.start_time.load(Ordering::Relaxed),
            end_time: self.end_time.load(Ordering::Relaxed),
            cancelled: self.was_cancelled(),
        }
    }
}
