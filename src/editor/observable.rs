// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Observable state holder.
//!
//! Holds an immutable snapshot behind an `Arc`. Every mutation builds a new
//! snapshot and swaps it in, so readers never observe a half-applied edit.
//! Subscribers receive each new snapshot on an mpsc channel, sent
//! synchronously by the writer before the mutating call returns.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex, RwLock};

struct Inner<T> {
    value: RwLock<Arc<T>>,
    subscribers: Mutex<Vec<Sender<Arc<T>>>>,
}

/// Shared, observable value. Clones refer to the same state.
pub struct Observable<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                value: RwLock::new(Arc::new(value)),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Current snapshot.
    pub fn get(&self) -> Arc<T> {
        let value = self
            .inner
            .value
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&value)
    }

    /// Replace the value and notify subscribers.
    pub fn set(&self, value: T) {
        self.update(|_| Some(value));
    }

    /// Derive a new value from the current one.
    ///
    /// Returning `None` leaves the value untouched and sends no
    /// notification. Returns whether the value was replaced.
    pub fn update(&self, f: impl FnOnce(&T) -> Option<T>) -> bool {
        let mut value = self
            .inner
            .value
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match f(&**value) {
            Some(next) => {
                let snapshot = Arc::new(next);
                *value = Arc::clone(&snapshot);
                // Sending never blocks, so notifying under the write lock
                // keeps delivery order equal to write order.
                self.publish(snapshot);
                true
            }
            None => false,
        }
    }

    /// Receive every future snapshot. The current snapshot is delivered
    /// first.
    pub fn subscribe(&self) -> Receiver<Arc<T>> {
        let (sender, receiver) = channel();
        // Holding the read lock while registering means no write can slip in
        // between the initial snapshot and the first notification.
        let value = self
            .inner
            .value
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let _ = sender.send(Arc::clone(&value));
        self.subscribers().push(sender);
        receiver
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }

    fn publish(&self, snapshot: Arc<T>) {
        self.subscribers()
            .retain(|sender| sender.send(Arc::clone(&snapshot)).is_ok());
    }

    fn subscribers(&self) -> std::sync::MutexGuard<'_, Vec<Sender<Arc<T>>>> {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Observable").field(&self.get()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_gets_current_then_updates() {
        let value = Observable::new(1);
        let rx = value.subscribe();
        value.set(2);
        value.set(3);

        let seen: Vec<i32> = rx.try_iter().map(|v| *v).collect();
        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(*value.get(), 3);
    }

    #[test]
    fn test_unchanged_update_does_not_notify() {
        let value = Observable::new(vec![1, 2]);
        let rx = value.subscribe();
        let _ = rx.try_recv();

        assert!(!value.update(|_| None));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_old_snapshot_survives_update() {
        let value = Observable::new(vec![1]);
        let before = value.get();
        value.update(|v| {
            let mut next = v.clone();
            next.push(2);
            Some(next)
        });
        assert_eq!(*before, vec![1]);
        assert_eq!(*value.get(), vec![1, 2]);
    }

    #[test]
    fn test_dropped_receivers_are_pruned() {
        let value = Observable::new(0);
        let rx = value.subscribe();
        drop(rx);
        let _keep = value.subscribe();
        value.set(1);
        assert_eq!(value.subscriber_count(), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let a = Observable::new("x".to_string());
        let b = a.clone();
        b.set("y".into());
        assert_eq!(a.get().as_str(), "y");
    }
}
