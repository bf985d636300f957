//! Per-source offset tracking
//!
//! The tracker keeps, for every source name, the next offset a poll should ask
//! for: one past the highest offset observed so far. Cursors only move forward.
//! A source that has never delivered a record has no cursor at all, which is
//! distinct from a cursor at zero.

use crate::types::{Record, Source};
use parking_lot::Mutex;
use std::collections::HashMap;

/// High-water offsets for one tail session
#[derive(Debug, Default)]
pub struct OffsetTracker {
    cursors: Mutex<HashMap<String, u64>>,
}

impl OffsetTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance cursors past every record in the batch.
    ///
    /// Record order within the batch does not matter.
    pub fn update(&self, batch: &[Record]) {
        if batch.is_empty() {
            return;
        }

        let mut cursors = self.cursors.lock();
        for record in batch {
            let next = record.offset.saturating_add(1);
            cursors
                .entry(record.source_name.clone())
                .and_modify(|cursor| *cursor = (*cursor).max(next))
                .or_insert(next);
        }
    }

    /// Copy of `sources` with each starting offset set from its cursor.
    ///
    /// Sources the tracker has not seen keep whatever offset they came with.
    pub fn annotate(&self, sources: &[Source]) -> Vec<Source> {
        let cursors = self.cursors.lock();
        sources
            .iter()
            .map(|source| match cursors.get(&source.name) {
                Some(&cursor) => source.at_offset(Some(cursor)),
                None => source.clone(),
            })
            .collect()
    }

    /// Cursor of one source, if any record from it has been observed
    pub fn cursor(&self, source_name: &str) -> Option<u64> {
        self.cursors.lock().get(source_name).copied()
    }

    /// Copy of all cursors
    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.cursors.lock().clone()
    }
}
