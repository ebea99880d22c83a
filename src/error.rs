// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Library error type.

use crate::models::capture::CaptureId;
use crate::processor::ProcessorError;
use crate::store::StoreError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No capture matches the requested id. Fatal to the session.
    #[error("no capture with id {0}")]
    CaptureNotFound(CaptureId),

    /// The processor for an image could not be created. Fatal to the session.
    #[error("plate processor unavailable for {}", .path.display())]
    ProcessorUnavailable {
        path: PathBuf,
        #[source]
        source: ProcessorError,
    },

    #[error("plate processor call failed: {0}")]
    Processor(#[from] ProcessorError),

    /// Every warp attempt in the retry budget reported failure.
    #[error("plate warp failed after {attempts} attempts")]
    WarpUnrecoverable { attempts: u32 },

    #[error("cannot resolve the directory of capture image {}", .0.display())]
    CaptureDirectoryUnresolvable(PathBuf),

    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A single-flight operation is already in progress.
    #[error("{operation} is already running")]
    Busy { operation: &'static str },

    #[error("cannot {operation} while the pipeline is {phase}")]
    InvalidPhase {
        operation: &'static str,
        phase: &'static str,
    },

    #[error("at least {required} reference spots are needed, found {found}")]
    NotEnoughReferences { found: usize, required: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
