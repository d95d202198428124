// File: lib.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::bool_assert_comparison)]
#![allow(clippy::new_without_default)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod errors;
pub mod getstate;
pub mod markers;
pub mod message;
pub mod mutator;
pub mod reports;
pub mod sampler;
pub mod scheduler;
pub mod stats;
pub mod store;
pub mod transport;


pub use config::{AttackConfig, TargetService, TransportConfig};
pub use errors::TimingError;
pub use markers::RequestTemplate;
pub use scheduler::{AttackScheduler, CancellationHandle, ProgressSink};
pub use stats::ResultRow;
pub use store::ResultStore;
pub use transport::{RawTransport, Transport};
