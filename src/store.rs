// File: store.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use std::fmt;
use std::str::FromStr;

use crate::stats::ResultRow;

/// Numeric columns of the results table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    RequestCount,
    StatusCode,
    TotalLength,
    BodyLength,
    Min,
    Max,
    Mean,
    Median,
    StdDev,
}

impl Column {
    pub const ALL: [Column; 9] = [
        Column::RequestCount,
        Column::StatusCode,
        Column::TotalLength,
        Column::BodyLength,
        Column::Min,
        Column::Max,
        Column::Mean,
        Column::Median,
        Column::StdDev,
    ];

    pub const LATENCY: [Column; 5] = [
        Column::Min,
        Column::Max,
        Column::Mean,
        Column::Median,
        Column::StdDev,
    ];

    pub fn value(&self, row: &ResultRow) -> f64 {
        match self {
            Column::RequestCount => row.request_count as f64,
            Column::StatusCode => row.status_code as f64,
            Column::TotalLength => row.total_length as f64,
            Column::BodyLength => row.body_length as f64,
            Column::Min => row.min_ms as f64,
            Column::Max => row.max_ms as f64,
            Column::Mean => row.mean_ms,
            Column::Median => row.median_ms,
            Column::StdDev => row.stddev_ms,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Column::RequestCount => "Number of Requests",
            Column::StatusCode => "Status Code",
            Column::TotalLength => "Length (B)",
            Column::BodyLength => "Body (B)",
            Column::Min => "Minimum (ms)",
            Column::Max => "Maximum (ms)",
            Column::Mean => "Mean (ms)",
            Column::Median => "Median (ms)",
            Column::StdDev => "StdDev (ms)",
        }
    }

    pub fn is_latency(&self) -> bool {
        Self::LATENCY.contains(self)
    }

    /// Renders a cell the way the table shows it: integers plain, the
    /// rounded statistics with three decimals.
    pub fn format(&self, row: &ResultRow) -> String {
        match self {
            Column::Mean | Column::Median | Column::StdDev => format!("{:.3}", self.value(row)),
            _ => format!("{}", self.value(row) as u64),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for Column {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "requests" | "requestcount" | "count" => Ok(Column::RequestCount),
            "status" | "statuscode" => Ok(Column::StatusCode),
            "length" | "totallength" => Ok(Column::TotalLength),
            "body" | "bodylength" => Ok(Column::BodyLength),
            "min" | "minimum" => Ok(Column::Min),
            "max" | "maximum" => Ok(Column::Max),
            "mean" => Ok(Column::Mean),
            "median" => Ok(Column::Median),
            "stddev" | "sd" => Ok(Column::StdDev),
            other => Err(format!("unknown column '{}'", other)),
        }
    }
}

/// Result rows of the current run in the order they were produced.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    rows: Vec<ResultRow>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn append(&mut self, row: ResultRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Minimum and maximum of `column` over the current rows. Computed on
    /// every call since rows keep arriving during a run.
    pub fn column_extent(&self, column: Column) -> Option<(f64, f64)> {
        column_extent(&self.rows, column)
    }

    /// Rows ordered by `column`, ties keeping append order.
    pub fn sorted_by(&self, column: Column, descending: bool) -> Vec<&ResultRow> {
        sort_rows(&self.rows, column, descending)
    }
}

pub fn column_extent(rows: &[ResultRow], column: Column) -> Option<(f64, f64)> {
    let mut values = rows.iter().map(|row| column.value(row));
    let first = values.next()?;
    Some(values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
}

/// Stable sort, so ties keep their original order.
pub fn sort_rows(rows: &[ResultRow], column: Column, descending: bool) -> Vec<&ResultRow> {
    let mut sorted: Vec<&ResultRow> = rows.iter().collect();
    sorted.sort_by(|a, b| {
        let ord = column.value(a).total_cmp(&column.value(b));
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });
    sorted
}

/// Position of `value` within `extent`, in `[0, 1]`. `None` when the column
/// shows no variation.
pub fn highlight_fraction(value: f64, extent: (f64, f64)) -> Option<f64> {
    let (min, max) = extent;
    if min == max {
        return None;
    }
    Some(((value - min) / (max - min)).clamp(0.0, 1.0))
}
