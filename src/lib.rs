// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! TLC plate registration and spot quantification.
//!
//! A photographed thin-layer chromatography plate is registered by marking
//! its four corners and warping it upright, then quantified by marking
//! spots, integrating their intensity and fitting percentages against
//! reference spots. The numeric work is done by an external
//! [`PlateProcessor`](processor::PlateProcessor); this crate provides the
//! interactive editing models, the pipelines driving the processor and the
//! persistence of their results.

pub mod config;
pub mod editor;
pub mod error;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod processor;
pub mod report;
pub mod store;
pub mod util;

pub use config::Config;
pub use error::{Error, Result};
