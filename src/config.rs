// File: config.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use std::collections::HashSet;
use std::time::Duration;

use serde::Serialize;

use crate::errors::TimingError;
use crate::markers::RequestTemplate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetService {
    host: String,
    port: u16,
    use_tls: bool,
}

impl TargetService {
    pub fn new(host: impl Into<String>, port: u16, use_tls: bool) -> Result<Self, TimingError> {
        let host = host.into().trim().to_string();
        if host.is_empty() {
            return Err(TimingError::config("target host must not be empty"));
        }
        if host.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(TimingError::config(format!(
                "target host {:?} contains invalid characters",
                host
            )));
        }
        if port == 0 {
            return Err(TimingError::config("target port must be in 1-65535"));
        }
        Ok(Self {
            host,
            port,
            use_tls,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn use_tls(&self) -> bool {
        self.use_tls
    }

    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn base_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

/// Everything one attack run needs. Built once, never changed during the run.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    template: RequestTemplate,
    payloads: Vec<String>,
    repeat_count: usize,
    target: TargetService,
}

impl AttackConfig {
    /// Duplicate payloads collapse to their first occurrence.
    pub fn new(
        template: RequestTemplate,
        payloads: impl IntoIterator<Item = String>,
        repeat_count: usize,
        target: TargetService,
    ) -> Result<Self, TimingError> {
        if repeat_count == 0 {
            return Err(TimingError::config(
                "number of requests per payload must be at least 1",
            ));
        }

        let mut seen = HashSet::new();
        let payloads: Vec<String> = payloads
            .into_iter()
            .filter(|p| seen.insert(p.clone()))
            .collect();

        if payloads.is_empty() {
            return Err(TimingError::config("payload list is empty"));
        }

        Ok(Self {
            template,
            payloads,
            repeat_count,
            target,
        })
    }

    pub fn template(&self) -> &RequestTemplate {
        &self.template
    }

    pub fn payloads(&self) -> &[String] {
        &self.payloads
    }

    pub fn repeat_count(&self) -> usize {
        self.repeat_count
    }

    pub fn target(&self) -> &TargetService {
        &self.target
    }

    pub fn total_requests(&self) -> u64 {
        (self.payloads.len() as u64).saturating_mul(self.repeat_count as u64)
    }
}

/// One payload per line. Blank lines between entries are the empty payload;
/// blank lines at the end of the file are dropped.
pub fn parse_payload_list(text: &str) -> Vec<String> {
    let mut payloads: Vec<String> = text.lines().map(str::to_string).collect();
    while payloads.last().is_some_and(|line| line.is_empty()) {
        payloads.pop();
    }
    payloads
}

#[derive(Debug, Clone, Copy)]
pub struct TransportConfig {
    connect_timeout: Duration,
    read_timeout: Duration,
    max_response_bytes: usize,
    verify_tls: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportConfig {
    pub fn new() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            max_response_bytes: 16 * 1024 * 1024,
            verify_tls: false,
        }
    }

    pub fn set_connect_timeout(&mut self, connect_timeout: Duration) {
        self.connect_timeout = connect_timeout;
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn set_read_timeout(&mut self, read_timeout: Duration) {
        self.read_timeout = read_timeout;
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn set_max_response_bytes(&mut self, max_response_bytes: usize) {
        self.max_response_bytes = max_response_bytes;
    }

    pub fn max_response_bytes(&self) -> usize {
        self.max_response_bytes
    }

    pub fn set_verify_tls(&mut self, verify_tls: bool) {
        self.verify_tls = verify_tls;
    }

    pub fn verify_tls(&self) -> bool {
        self.verify_tls
    }
}
