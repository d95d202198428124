// File: errors.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use std::fmt;

#[derive(Debug)]
pub enum TimingError {
    Config(String),
    Range { start: usize, end: usize, len: usize },
    EmptyInput,
    Transport(String),
    Io(std::io::Error),
    Serialization(serde_json::Error),
}

impl TimingError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl fmt::Display for TimingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::Range { start, end, len } => write!(
                f,
                "Range error: [{}, {}) is not a valid region of a {} byte message",
                start, end, len
            ),
            Self::EmptyInput => write!(f, "Empty input: no latency samples to aggregate"),
            Self::Transport(msg) => write!(f, "Transport failure: {}", msg),
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl std::error::Error for TimingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Serialization(e) => Some(e),
            Self::Config(_) | Self::Range { .. } | Self::EmptyInput | Self::Transport(_) => None,
        }
    }
}

impl From<std::io::Error> for TimingError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

impl From<serde_json::Error> for TimingError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_error_display() {
        let err = TimingError::Range {
            start: 5,
            end: 2,
            len: 10,
        };
        assert_eq!(
            err.to_string(),
            "Range error: [5, 2) is not a valid region of a 10 byte message"
        );
    }

    #[test]
    fn test_io_error_has_source() {
        let err: TimingError = std::io::Error::new(std::io::ErrorKind::Other, "boom").into();
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_transport());
    }

    #[test]
    fn test_transport_helper() {
        let err = TimingError::transport("connection refused");
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "Transport failure: connection refused");
    }
}
