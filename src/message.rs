// File: message.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use once_cell::sync::Lazy;
use regex::bytes::Regex;

static STATUS_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^HTTP/\d(?:\.\d)?[ \t]+(\d{3})").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    CrLf,
    Lf,
}

impl LineEnding {
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            LineEnding::CrLf => b"\r\n",
            LineEnding::Lf => b"\n",
        }
    }
}

/// Head of a raw HTTP/1.x request or response.
///
/// `headers[0]` is the start line. The head ends at the first empty line;
/// without one the whole buffer is head and the body is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpMessage {
    headers: Vec<Vec<u8>>,
    body_offset: usize,
    line_ending: LineEnding,
    terminated: bool,
}

impl HttpMessage {
    pub fn parse(raw: &[u8]) -> Self {
        let mut headers = Vec::new();
        let mut line_ending = LineEnding::CrLf;
        let mut pos = 0;

        while pos < raw.len() {
            let Some(rel) = raw[pos..].iter().position(|b| *b == b'\n') else {
                headers.push(raw[pos..].to_vec());
                break;
            };
            let nl = pos + rel;
            let has_cr = nl > pos && raw[nl - 1] == b'\r';
            let line = if has_cr { &raw[pos..nl - 1] } else { &raw[pos..nl] };

            if headers.is_empty() && !line.is_empty() && !has_cr {
                line_ending = LineEnding::Lf;
            }

            if line.is_empty() {
                return Self {
                    headers,
                    body_offset: nl + 1,
                    line_ending,
                    terminated: true,
                };
            }

            headers.push(line.to_vec());
            pos = nl + 1;
        }

        Self {
            headers,
            body_offset: raw.len(),
            line_ending,
            terminated: false,
        }
    }

    /// All head lines including the start line, without line terminators.
    pub fn headers(&self) -> &[Vec<u8>] {
        &self.headers
    }

    pub fn start_line(&self) -> &[u8] {
        self.headers.first().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn body_offset(&self) -> usize {
        self.body_offset
    }

    pub fn body<'a>(&self, raw: &'a [u8]) -> &'a [u8] {
        &raw[self.body_offset.min(raw.len())..]
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Whether the empty line ending the head was seen.
    pub fn is_head_complete(&self) -> bool {
        self.terminated
    }

    pub fn header_value(&self, name: &str) -> Option<String> {
        self.headers.iter().skip(1).find_map(|line| {
            let (key, value) = split_header(line)?;
            key.eq_ignore_ascii_case(name.as_bytes())
                .then(|| String::from_utf8_lossy(value).trim().to_string())
        })
    }

    pub fn content_length(&self) -> Option<usize> {
        self.header_value("content-length")?.parse().ok()
    }

    pub fn is_chunked(&self) -> bool {
        self.header_value("transfer-encoding")
            .map(|v| v.to_ascii_lowercase().contains("chunked"))
            .unwrap_or(false)
    }

    /// Status code of a response start line.
    pub fn status_code(&self) -> Option<u16> {
        let caps = STATUS_LINE.captures(self.start_line())?;
        std::str::from_utf8(caps.get(1)?.as_bytes())
            .ok()?
            .parse()
            .ok()
    }

    /// Method token of a request start line.
    pub fn method(&self) -> Option<String> {
        let token = self.start_line().split(|b| *b == b' ').next()?;
        if token.is_empty() {
            return None;
        }
        Some(String::from_utf8_lossy(token).to_string())
    }
}

/// Splits `Name: value` at the first colon; the name is trimmed.
pub fn split_header(line: &[u8]) -> Option<(&[u8], &[u8])> {
    let colon = line.iter().position(|b| *b == b':')?;
    Some((line[..colon].trim_ascii(), &line[colon + 1..]))
}

pub fn header_name_is(line: &[u8], name: &str) -> bool {
    split_header(line)
        .map(|(key, _)| key.eq_ignore_ascii_case(name.as_bytes()))
        .unwrap_or(false)
}

/// Serializes head lines, an empty line and the body.
pub fn build_message(headers: &[Vec<u8>], line_ending: LineEnding, body: &[u8]) -> Vec<u8> {
    let eol = line_ending.as_bytes();
    let head_len: usize = headers.iter().map(|h| h.len() + eol.len()).sum();
    let mut out = Vec::with_capacity(head_len + eol.len() + body.len());
    for header in headers {
        out.extend_from_slice(header);
        out.extend_from_slice(eol);
    }
    out.extend_from_slice(eol);
    out.extend_from_slice(body);
    out
}
