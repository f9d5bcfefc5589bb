//! Bounded history of recently started materials.
//!
//! Only the alternation rule reads it. The controller clears it whenever
//! loading is disabled.

use std::collections::VecDeque;

use loadgate_types::MaterialType;

/// Most recent material selections, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionHistory {
    entries: VecDeque<MaterialType>,
    capacity: usize,
}

impl SelectionHistory {
    /// Create an empty history holding at most `capacity` entries. A zero
    /// capacity is raised to one so the previous selection is always known.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a newly started material, evicting the oldest when full.
    pub fn record(&mut self, material: MaterialType) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(material);
    }

    /// The immediately previous selection.
    pub fn last(&self) -> Option<&MaterialType> {
        self.entries.back()
    }

    /// Number of remembered selections.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been selected yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &MaterialType> {
        self.entries.iter()
    }
}
