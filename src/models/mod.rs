// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Data model: geometry, captures and spots.

pub mod capture;
pub mod geometry;
pub mod spot;
