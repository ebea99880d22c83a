// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Background execution for slow processor calls.
//!
//! Work runs on a named thread; the result comes back over a channel and is
//! collected through [`Pending`], either by polling from an interactive loop
//! or by blocking.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::Duration;

/// Result of work running on a background thread.
pub struct Pending<T> {
    receiver: Receiver<T>,
}

/// Why no result could be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PendingError {
    #[error("work is still running")]
    NotReady,
    #[error("worker thread exited without a result")]
    Lost,
}

impl<T> Pending<T> {
    /// Non-blocking poll.
    pub fn try_take(&self) -> Result<T, PendingError> {
        self.receiver.try_recv().map_err(|e| match e {
            TryRecvError::Empty => PendingError::NotReady,
            TryRecvError::Disconnected => PendingError::Lost,
        })
    }

    pub fn wait(self) -> Result<T, PendingError> {
        self.receiver.recv().map_err(|_| PendingError::Lost)
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Result<T, PendingError> {
        self.receiver.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => PendingError::NotReady,
            RecvTimeoutError::Disconnected => PendingError::Lost,
        })
    }
}

/// Run `work` on a new thread named `name`.
pub fn spawn<T, F>(name: &str, work: F) -> Pending<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (sender, receiver) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let _ = sender.send(work());
        });
    if let Err(e) = spawned {
        // The sender was dropped with the closure, so the handle reports Lost.
        log::error!("Failed to spawn worker thread {}: {}", name, e);
    }
    Pending { receiver }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_arrives() {
        let pending = spawn("test-worker", || 6 * 7);
        assert_eq!(pending.wait(), Ok(42));
    }

    #[test]
    fn test_poll_before_completion() {
        let (release, gate) = mpsc::channel::<()>();
        let pending = spawn("test-worker", move || {
            let _ = gate.recv();
            "done"
        });
        assert_eq!(pending.try_take(), Err(PendingError::NotReady));
        release.send(()).unwrap();
        assert_eq!(pending.wait_timeout(Duration::from_secs(5)), Ok("done"));
    }

    #[test]
    fn test_panicking_work_is_lost() {
        let pending: Pending<()> = spawn("test-worker", || panic!("boom"));
        assert_eq!(pending.wait(), Err(PendingError::Lost));
    }
}
