// File: stats.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use serde::{Deserialize, Serialize};

use crate::errors::TimingError;
use crate::sampler::ResponseSnapshot;

/// Descriptive statistics over one payload's latency samples, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub count: usize,
    pub min_ms: u64,
    pub max_ms: u64,
    pub mean_ms: f64,
    pub median_ms: f64,
    pub stddev_ms: f64,
}

impl LatencySummary {
    /// Min and max are truncated to whole milliseconds; mean, median and
    /// standard deviation are rounded to three decimals.
    pub fn from_samples(samples: &[f64]) -> Result<Self, TimingError> {
        if samples.is_empty() {
            return Err(TimingError::EmptyInput);
        }

        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Ok(Self {
            count: samples.len(),
            min_ms: min.trunc() as u64,
            max_ms: max.trunc() as u64,
            mean_ms: round3(mean(samples)),
            median_ms: round3(median(samples)),
            stddev_ms: round3(std_dev(samples)),
        })
    }
}

pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let len = sorted.len();
    if len % 2 != 0 {
        sorted[len / 2]
    } else {
        (sorted[len / 2 - 1] + sorted[len / 2]) / 2.0
    }
}

/// Population standard deviation (divides by `n`).
pub fn std_dev(values: &[f64]) -> f64 {
    let mean_value = mean(values);
    let variance = values
        .iter()
        .map(|v| (v - mean_value).powi(2))
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

/// Half-away-from-zero rounding on the value scaled by 1000.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Summary of one payload's finished (or cancelled) batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub payload: String,
    pub request_count: usize,
    pub status_code: u16,
    pub total_length: u64,
    pub body_length: u64,
    pub min_ms: u64,
    pub max_ms: u64,
    pub mean_ms: f64,
    pub median_ms: f64,
    pub stddev_ms: f64,
}

impl ResultRow {
    /// `snapshot` must come from the last request of the batch.
    pub fn from_batch(
        payload: &str,
        samples: &[f64],
        snapshot: &ResponseSnapshot,
    ) -> Result<Self, TimingError> {
        let summary = LatencySummary::from_samples(samples)?;
        Ok(Self {
            payload: payload.to_string(),
            request_count: summary.count,
            status_code: snapshot.status_code,
            total_length: snapshot.total_length,
            body_length: snapshot.body_length,
            min_ms: summary.min_ms,
            max_ms: summary.max_ms,
            mean_ms: summary.mean_ms,
            median_ms: summary.median_ms,
            stddev_ms: summary.stddev_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[test]
    fn test_median_odd() {
        assert_eq!(median(&[30.0, 10.0, 20.0]), 20.0);
    }

    #[test]
    fn test_median_even() {
        assert_eq!(median(&[10.0, 20.0, 30.0, 40.0]), 25.0);
    }

    #[test]
    fn test_population_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(std_dev(&values), 2.0);
        assert_eq!(mean(&values), 5.0);
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(
            LatencySummary::from_samples(&[]),
            Err(TimingError::EmptyInput)
        ));
    }

    #[test]
    fn test_min_max_truncate() {
        let summary = LatencySummary::from_samples(&[10.9, 12.2, 99.999]).unwrap();
        assert_eq!(summary.min_ms, 10);
        assert_eq!(summary.max_ms, 99);
    }

    #[test]
    fn test_single_sample() {
        let summary = LatencySummary::from_samples(&[42.5]).unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.mean_ms, 42.5);
        assert_eq!(summary.median_ms, 42.5);
        assert_eq!(summary.stddev_ms, 0.0);
    }

    #[rstest]
    #[case(2.0625, 2.063)]
    #[case(2.5, 2.5)]
    #[case(0.0004, 0.0)]
    #[case(10.12345, 10.123)]
    #[case(3.0, 3.0)]
    fn test_round3(#[case] input: f64, #[case] expected: f64) {
        assert_eq!(round3(input), expected);
    }

    #[test]
    fn test_mean_rounded() {
        let summary = LatencySummary::from_samples(&[1.0, 2.0, 2.0]).unwrap();
        assert_eq!(summary.mean_ms, 1.667);
        assert_eq!(summary.stddev_ms, 0.471);
    }

    #[test]
    fn test_row_from_batch() {
        let snapshot = ResponseSnapshot {
            status_code: 200,
            total_length: 512,
            body_length: 300,
        };
        let row = ResultRow::from_batch("admin", &[10.0, 20.0, 30.0], &snapshot).unwrap();

        assert_eq!(row.payload, "admin");
        assert_eq!(row.request_count, 3);
        assert_eq!(row.status_code, 200);
        assert_eq!(row.total_length, 512);
        assert_eq!(row.body_length, 300);
        assert_eq!(row.min_ms, 10);
        assert_eq!(row.max_ms, 30);
        assert_eq!(row.mean_ms, 20.0);
        assert_eq!(row.median_ms, 20.0);
        assert_eq!(row.stddev_ms, 8.165);
    }
}
