// File: sampler.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use log::debug;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::config::TargetService;
use crate::message::HttpMessage;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatencySample {
    pub duration_millis: f64,
}

impl LatencySample {
    pub fn from_duration(elapsed: Duration) -> Self {
        Self {
            duration_millis: elapsed.as_secs_f64() * 1000.0,
        }
    }
}

/// Response metadata kept for a result row. All zero when no response came back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    pub status_code: u16,
    pub total_length: u64,
    pub body_length: u64,
}

impl ResponseSnapshot {
    pub fn failed() -> Self {
        Self::default()
    }

    /// `body_length` is the declared `Content-Length`, 0 when absent.
    pub fn from_response(raw: &[u8]) -> Self {
        let head = HttpMessage::parse(raw);
        Self {
            status_code: head.status_code().unwrap_or(0),
            total_length: raw.len() as u64,
            body_length: head.content_length().unwrap_or(0) as u64,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status_code == 0 && self.total_length == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub sample: LatencySample,
    pub snapshot: ResponseSnapshot,
    /// Transport failure message, if the request produced no response.
    pub failure: Option<String>,
}

pub struct LatencySampler<T> {
    transport: T,
}

impl<T: Transport> LatencySampler<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends one request and times it. Transport failures are recorded as a
    /// zeroed snapshot with the time spent until the failure.
    pub async fn send(&self, target: &TargetService, request: &[u8]) -> Measurement {
        let start = Instant::now();
        let result = self.transport.send(target, request).await;
        let sample = LatencySample::from_duration(start.elapsed());

        match result {
            Ok(response) => Measurement {
                sample,
                snapshot: ResponseSnapshot::from_response(&response),
                failure: None,
            },
            Err(e) => {
                debug!(
                    "Request to {} failed after {:.3}ms: {}",
                    target.authority(),
                    sample.duration_millis,
                    e
                );
                Measurement {
                    sample,
                    snapshot: ResponseSnapshot::failed(),
                    failure: Some(e.to_string()),
                }
            }
        }
    }
}
