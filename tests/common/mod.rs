// File: common/mod.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

#![allow(dead_code)]

use async_trait::async_trait;
use rtimer::config::{AttackConfig, TargetService};
use rtimer::errors::TimingError;
use rtimer::markers::RequestTemplate;
use rtimer::scheduler::CancellationHandle;
use rtimer::transport::Transport;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const OK_RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello";

/// In-memory transport that replays a fixed response and records what it got.
pub struct ScriptedTransport {
    response: Vec<u8>,
    delay: Duration,
    fail: bool,
    cancel_after: Option<(usize, CancellationHandle)>,
    calls: AtomicUsize,
    requests: Mutex<Vec<Vec<u8>>>,
}

impl ScriptedTransport {
    pub fn new(response: &[u8]) -> Self {
        Self {
            response: response.to_vec(),
            delay: Duration::ZERO,
            fail: false,
            cancel_after: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        let mut transport = Self::new(b"");
        transport.fail = true;
        transport
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fires `handle` once the `n`th request has been answered.
    pub fn cancel_after(mut self, n: usize, handle: CancellationHandle) -> Self {
        self.cancel_after = Some((n, handle));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Vec<u8>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, _target: &TargetService, request: &[u8]) -> Result<Vec<u8>, TimingError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request.to_vec());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some((n, handle)) = &self.cancel_after {
            if call == *n {
                handle.cancel();
            }
        }

        if self.fail {
            Err(TimingError::transport("connection refused"))
        } else {
            Ok(self.response.clone())
        }
    }
}

pub fn target() -> TargetService {
    TargetService::new("timing.test", 80, false).unwrap()
}

pub fn attack_config(template: &str, payloads: &[&str], repeat: usize) -> AttackConfig {
    AttackConfig::new(
        RequestTemplate::from_text(template),
        payloads.iter().map(|p| p.to_string()),
        repeat,
        target(),
    )
    .unwrap()
}

/// Value of the `Content-Length` header and the actual body size.
pub fn declared_and_actual_length(request: &[u8]) -> (Option<usize>, usize) {
    let text = String::from_utf8_lossy(request).into_owned();
    let (head, body) = text
        .split_once("\r\n\r\n")
        .or_else(|| text.split_once("\n\n"))
        .unwrap_or((text.as_str(), ""));
    let declared = head.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    });
    (declared, body.len())
}
