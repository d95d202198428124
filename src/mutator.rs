// File: mutator.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use log::debug;

use crate::markers::{RequestTemplate, MARKER};
use crate::message::{build_message, header_name_is, HttpMessage};

pub struct RequestMutator;

impl RequestMutator {
    /// Injects `payload` into every marked region and repairs `Content-Length`.
    pub fn substitute(template: &RequestTemplate, payload: &str) -> Vec<u8> {
        if template.has_orphan_marker() {
            debug!(
                "Template has an odd marker count ({}); the trailing marker is sent as-is",
                template.marker_count()
            );
        }
        let replaced = replace_markers(template.as_bytes(), payload.as_bytes());
        update_content_length(&replaced)
    }
}

/// Replaces each `MARKER ... MARKER` span, markers included, with `payload`.
///
/// Spans are matched left to right and never overlap; an unmatched trailing
/// marker is copied through as a literal byte. Payload bytes are not rescanned.
pub fn replace_markers(message: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + payload.len());
    let mut pos = 0;

    while pos < message.len() {
        let Some(open) = find_marker(message, pos) else {
            break;
        };
        let Some(close) = find_marker(message, open + 1) else {
            break;
        };
        out.extend_from_slice(&message[pos..open]);
        out.extend_from_slice(payload);
        pos = close + 1;
    }

    out.extend_from_slice(&message[pos..]);
    out
}

fn find_marker(message: &[u8], from: usize) -> Option<usize> {
    message[from..]
        .iter()
        .position(|b| *b == MARKER)
        .map(|i| from + i)
}

/// Drops every `Content-Length` header and appends one matching the body.
///
/// Header order and the head's line ending are kept.
pub fn update_content_length(request: &[u8]) -> Vec<u8> {
    let parsed = HttpMessage::parse(request);
    let Some((start_line, fields)) = parsed.headers().split_first() else {
        return request.to_vec();
    };

    let body = parsed.body(request);
    let mut headers: Vec<Vec<u8>> = Vec::with_capacity(parsed.headers().len() + 1);
    headers.push(start_line.clone());
    headers.extend(
        fields
            .iter()
            .filter(|line| !header_name_is(line, "content-length"))
            .cloned(),
    );
    headers.push(format!("Content-Length: {}", body.len()).into_bytes());

    build_message(&headers, parsed.line_ending(), body)
}
