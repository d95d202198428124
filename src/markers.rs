// File: markers.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

//! Payload marker editing.
//!
//! A substitution site is the text between two sentinel bytes (`0xA7`). In
//! template files the sentinel is written as the `§` character; in memory it
//! is always the single raw byte so offsets line up with what goes on the wire.

use log::warn;

use crate::errors::TimingError;

pub const MARKER: u8 = 0xA7;
pub const MARKER_CHAR: char = '§';

/// An immutable raw HTTP request with zero or more marker pairs.
///
/// Editing operations never modify `self`; they return a new template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RequestTemplate {
    bytes: Vec<u8>,
}

impl RequestTemplate {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Builds a template from its text form, turning each `§` into the
    /// sentinel byte.
    pub fn from_text(text: &str) -> Self {
        let mut bytes = Vec::with_capacity(text.len());
        let mut collisions = 0usize;
        for c in text.chars() {
            if c == MARKER_CHAR {
                bytes.push(MARKER);
                continue;
            }
            let mut buf = [0u8; 4];
            let encoded = c.encode_utf8(&mut buf).as_bytes();
            if encoded.contains(&MARKER) {
                collisions += 1;
            }
            bytes.extend_from_slice(encoded);
        }
        if collisions > 0 {
            warn!(
                "Template contains {} non-ASCII character(s) whose encoding includes the marker byte 0xA7; they will act as markers",
                collisions
            );
        }
        Self { bytes }
    }

    /// Interprets file contents: UTF-8 files go through [`Self::from_text`],
    /// anything else is taken byte for byte.
    pub fn from_file_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => Self::from_text(&text),
            Err(e) => Self::new(e.into_bytes()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Text form with every sentinel rendered as `§`.
    pub fn to_text(&self) -> String {
        self.bytes
            .split(|b| *b == MARKER)
            .map(String::from_utf8_lossy)
            .collect::<Vec<_>>()
            .join(&MARKER_CHAR.to_string())
    }

    /// Bytes to write back to disk. Text templates get `§` for each sentinel;
    /// templates that are not UTF-8 around their markers are written raw, so
    /// that [`Self::from_file_bytes`] reads back the same bytes either way.
    pub fn to_file_bytes(&self) -> Vec<u8> {
        let mut buf = [0u8; 4];
        let marker = MARKER_CHAR.encode_utf8(&mut buf).as_bytes();
        let mut out = Vec::with_capacity(self.bytes.len() + self.marker_count());
        for &b in &self.bytes {
            if b == MARKER {
                out.extend_from_slice(marker);
            } else {
                out.push(b);
            }
        }
        match String::from_utf8(out) {
            Ok(text) => text.into_bytes(),
            Err(_) => self.bytes.clone(),
        }
    }

    pub fn insert_marker_at(&self, offset: usize) -> Result<Self, TimingError> {
        insert_marker_at(&self.bytes, offset).map(Self::new)
    }

    pub fn wrap_region(&self, start: usize, end: usize) -> Result<Self, TimingError> {
        wrap_region(&self.bytes, start, end).map(Self::new)
    }

    pub fn strip_markers(&self) -> Self {
        Self::new(strip_markers(&self.bytes))
    }

    pub fn count_marker_pairs(&self) -> usize {
        count_marker_pairs(&self.bytes)
    }

    pub fn marker_count(&self) -> usize {
        marker_count(&self.bytes)
    }

    pub fn has_orphan_marker(&self) -> bool {
        self.marker_count() % 2 != 0
    }

    /// Byte offset of the first occurrence of `needle`.
    pub fn find(&self, needle: &[u8]) -> Option<usize> {
        if needle.is_empty() || needle.len() > self.bytes.len() {
            return None;
        }
        self.bytes
            .windows(needle.len())
            .position(|window| window == needle)
    }
}

impl From<&str> for RequestTemplate {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

pub fn insert_marker_at(message: &[u8], offset: usize) -> Result<Vec<u8>, TimingError> {
    if offset > message.len() {
        return Err(TimingError::Range {
            start: offset,
            end: offset,
            len: message.len(),
        });
    }
    let mut out = Vec::with_capacity(message.len() + 1);
    out.extend_from_slice(&message[..offset]);
    out.push(MARKER);
    out.extend_from_slice(&message[offset..]);
    Ok(out)
}

/// Marks `[start, end)`. An empty region (`start == end`) inserts an empty
/// marker pair at that position.
pub fn wrap_region(message: &[u8], start: usize, end: usize) -> Result<Vec<u8>, TimingError> {
    if start > end || end > message.len() {
        return Err(TimingError::Range {
            start,
            end,
            len: message.len(),
        });
    }
    let mut out = Vec::with_capacity(message.len() + 2);
    out.extend_from_slice(&message[..start]);
    out.push(MARKER);
    out.extend_from_slice(&message[start..end]);
    out.push(MARKER);
    out.extend_from_slice(&message[end..]);
    Ok(out)
}

pub fn strip_markers(message: &[u8]) -> Vec<u8> {
    message.iter().copied().filter(|b| *b != MARKER).collect()
}

pub fn marker_count(message: &[u8]) -> usize {
    message.iter().filter(|b| **b == MARKER).count()
}

/// An odd count is not corrected here; the mutator treats the orphan as text.
pub fn count_marker_pairs(message: &[u8]) -> usize {
    marker_count(message) / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    const REQUEST: &str = "POST /login HTTP/1.1\r\nHost: example.com\r\n\r\nuser=admin&pass=x";

    #[test]
    fn test_from_text_maps_section_sign_to_sentinel() {
        let template = RequestTemplate::from_text("user=§admin§");
        assert_eq!(template.as_bytes(), b"user=\xA7admin\xA7");
        assert_eq!(template.count_marker_pairs(), 1);
        assert_eq!(template.to_text(), "user=§admin§");
    }

    #[test]
    fn test_from_file_bytes_keeps_non_utf8_verbatim() {
        let raw = b"GET /\xA7x\xA7 HTTP/1.1\r\n\r\n".to_vec();
        let template = RequestTemplate::from_file_bytes(raw.clone());
        assert_eq!(template.as_bytes(), raw.as_slice());
        assert_eq!(template.count_marker_pairs(), 1);
    }

    #[test]
    fn test_file_bytes_round_trip() {
        let text = RequestTemplate::from_text("q=§a§&r=é");
        assert_eq!(text.to_file_bytes(), "q=§a§&r=é".as_bytes());
        assert_eq!(RequestTemplate::from_file_bytes(text.to_file_bytes()), text);

        let raw = RequestTemplate::new(b"q=\xA7\xFF\xA7".to_vec());
        assert_eq!(raw.to_file_bytes(), raw.as_bytes());
        assert_eq!(RequestTemplate::from_file_bytes(raw.to_file_bytes()), raw);
    }

    #[test]
    fn test_insert_marker_twice_builds_pair() {
        let template = RequestTemplate::from_text("abcdef");
        let once = template.insert_marker_at(2).unwrap();
        let twice = once.insert_marker_at(5).unwrap();
        assert_eq!(twice.as_bytes(), b"ab\xA7cd\xA7ef");
        assert_eq!(twice.count_marker_pairs(), 1);
        assert_eq!(template.as_bytes(), b"abcdef");
    }

    #[test]
    fn test_insert_marker_out_of_range() {
        let err = insert_marker_at(b"abc", 4).unwrap_err();
        assert!(matches!(err, TimingError::Range { len: 3, .. }));
        assert_eq!(insert_marker_at(b"abc", 3).unwrap(), b"abc\xA7");
    }

    #[test]
    fn test_wrap_region() {
        let template = RequestTemplate::from_text(REQUEST);
        let start = template.find(b"admin").unwrap();
        let wrapped = template.wrap_region(start, start + 5).unwrap();
        assert!(wrapped.to_text().ends_with("user=§admin§&pass=x"));
        assert_eq!(wrapped.len(), template.len() + 2);
    }

    #[test]
    fn test_wrap_empty_region_inserts_empty_pair() {
        assert_eq!(wrap_region(b"ab", 1, 1).unwrap(), b"a\xA7\xA7b");
    }

    #[rstest]
    #[case(3, 2)]
    #[case(0, 4)]
    #[case(5, 5)]
    fn test_wrap_region_rejects_bad_bounds(#[case] start: usize, #[case] end: usize) {
        assert!(matches!(
            wrap_region(b"abc", start, end),
            Err(TimingError::Range { .. })
        ));
    }

    #[test]
    fn test_strip_markers_is_idempotent() {
        let marked = b"a\xA7b\xA7c\xA7".to_vec();
        let once = strip_markers(&marked);
        assert_eq!(once, b"abc");
        assert_eq!(strip_markers(&once), once);
    }

    #[rstest]
    #[case(b"".as_slice(), 0)]
    #[case(b"\xA7".as_slice(), 0)]
    #[case(b"\xA7\xA7".as_slice(), 1)]
    #[case(b"\xA7a\xA7b\xA7".as_slice(), 1)]
    #[case(b"\xA7a\xA7\xA7b\xA7".as_slice(), 2)]
    fn test_count_marker_pairs(#[case] message: &[u8], #[case] expected: usize) {
        assert_eq!(count_marker_pairs(message), expected);
    }

    #[test]
    fn test_orphan_marker_detection() {
        assert!(RequestTemplate::new(b"a\xA7b".to_vec()).has_orphan_marker());
        assert!(!RequestTemplate::new(b"a\xA7b\xA7".to_vec()).has_orphan_marker());
    }
}
