//! Deterministic ordering within a fetched batch

use crate::types::Record;

/// Sort a batch by offset, ascending.
///
/// The sort is stable: records sharing an offset (necessarily from different
/// sources) keep their arrival order.
pub fn sequence(batch: &mut [Record]) {
    batch.sort_by_key(|record| record.offset);
}
