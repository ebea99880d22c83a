// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Processor-driven pipelines for one capture.
//!
//! Each pipeline owns a single-flight guard and shares the capture's
//! processor through the [`ProcessorRegistry`](crate::processor::ProcessorRegistry).
//! Blocking calls can be moved off the interactive thread with the
//! `spawn_*` wrappers.

pub mod flight;
pub mod quantification;
pub mod registration;
pub mod worker;

pub use quantification::{QuantificationPhase, QuantificationPipeline};
pub use registration::{RegistrationPhase, RegistrationPipeline, WarpOutcome};
pub use worker::{Pending, PendingError};
