// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O operations for capture images, reports and the store document.

pub mod media;
pub mod serialization;
