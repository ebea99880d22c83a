// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Keyed processor lifecycle.
//!
//! Every capture image gets at most one live processor. Pipeline stages for
//! the same capture share it through [`ProcessorHandle`]; closing the key
//! releases it. Closing is idempotent.

use super::{PlateProcessor, ProcessorError, ProcessorFactory};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared, lockable processor.
#[derive(Clone)]
pub struct ProcessorHandle {
    key: PathBuf,
    processor: Arc<Mutex<Box<dyn PlateProcessor>>>,
}

impl ProcessorHandle {
    pub fn key(&self) -> &Path {
        &self.key
    }

    /// Exclusive access for the duration of one or more processor calls.
    pub fn lock(&self) -> MutexGuard<'_, Box<dyn PlateProcessor>> {
        // A panicking processor call leaves no partially written state here.
        self.processor
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether both handles refer to the same processor instance.
    pub fn same_as(&self, other: &ProcessorHandle) -> bool {
        Arc::ptr_eq(&self.processor, &other.processor)
    }
}

impl std::fmt::Debug for ProcessorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorHandle")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Map from absolute image path to live processor.
pub struct ProcessorRegistry {
    factory: Arc<dyn ProcessorFactory>,
    handles: Mutex<HashMap<PathBuf, ProcessorHandle>>,
}

impl ProcessorRegistry {
    pub fn new(factory: Arc<dyn ProcessorFactory>) -> Self {
        Self {
            factory,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Registry key for an image path.
    pub fn key_for(path: &Path) -> PathBuf {
        std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
    }

    /// Existing handle for `path`, or a freshly opened one.
    pub fn get_or_create(&self, path: &Path) -> Result<ProcessorHandle> {
        let key = Self::key_for(path);
        let mut handles = self.handles();
        if let Some(handle) = handles.get(&key) {
            return Ok(handle.clone());
        }

        let processor = self
            .factory
            .open(&key)
            .map_err(|source: ProcessorError| Error::ProcessorUnavailable {
                path: key.clone(),
                source,
            })?;
        log::info!("Opened plate processor for {}", key.display());

        let handle = ProcessorHandle {
            key: key.clone(),
            processor: Arc::new(Mutex::new(processor)),
        };
        handles.insert(key, handle.clone());
        Ok(handle)
    }

    /// Release the processor for `path`. Returns whether one was open.
    pub fn close(&self, path: &Path) -> bool {
        let key = Self::key_for(path);
        let removed = self.handles().remove(&key);
        match removed {
            Some(handle) => {
                handle.lock().close();
                log::info!("Closed plate processor for {}", key.display());
                true
            }
            None => {
                log::debug!("No open plate processor for {}", key.display());
                false
            }
        }
    }

    pub fn is_open(&self, path: &Path) -> bool {
        self.handles().contains_key(&Self::key_for(path))
    }

    pub fn open_count(&self) -> usize {
        self.handles().len()
    }

    fn handles(&self) -> MutexGuard<'_, HashMap<PathBuf, ProcessorHandle>> {
        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
