// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Single-flight guard for pipeline operations.
//!
//! At most one guarded operation runs per pipeline. A competing caller is
//! turned away with [`Error::Busy`] instead of queueing. Teardown waits for
//! the running operation to finish.

use crate::error::{Error, Result};
use std::sync::{Mutex, MutexGuard, TryLockError};

#[derive(Debug, Default)]
pub struct SingleFlight {
    lock: Mutex<()>,
}

/// Held for the duration of one operation.
pub struct FlightGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the guarded section, or fail with `Busy` if it is occupied.
    pub fn try_begin(&self, operation: &'static str) -> Result<FlightGuard<'_>> {
        match self.lock.try_lock() {
            Ok(guard) => Ok(FlightGuard { _guard: guard }),
            Err(TryLockError::Poisoned(poisoned)) => Ok(FlightGuard {
                _guard: poisoned.into_inner(),
            }),
            Err(TryLockError::WouldBlock) => {
                log::debug!("Rejecting {}: another operation is in flight", operation);
                Err(Error::Busy { operation })
            }
        }
    }

    /// Block until no operation is in flight and keep others out while the
    /// guard lives.
    pub fn wait_idle(&self) -> FlightGuard<'_> {
        FlightGuard {
            _guard: self
                .lock
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.lock.try_lock(), Err(TryLockError::WouldBlock))
    }
}
