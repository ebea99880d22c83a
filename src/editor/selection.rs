// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Selection state shared by the editors.

use serde::{Deserialize, Serialize};

/// Either nothing is selected or exactly one live item is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Selection<K> {
    #[default]
    NotSelected,
    Selected(K),
}

impl<K: Copy> Selection<K> {
    pub fn id(&self) -> Option<K> {
        match self {
            Selection::Selected(id) => Some(*id),
            Selection::NotSelected => None,
        }
    }

    pub fn is_selected(&self) -> bool {
        matches!(self, Selection::Selected(_))
    }
}

impl<K> From<Option<K>> for Selection<K> {
    fn from(id: Option<K>) -> Self {
        match id {
            Some(id) => Selection::Selected(id),
            None => Selection::NotSelected,
        }
    }
}
