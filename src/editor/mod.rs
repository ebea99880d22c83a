// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

pub mod blob;
pub mod observable;
pub mod quad;
pub mod selection;

pub use blob::{BlobEditor, SpotSizing};
pub use observable::Observable;
pub use quad::{DragState, QuadEditor, Rotation};
pub use selection::Selection;
