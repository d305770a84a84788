//! Clean / quarantine partitioning of silver batches

use crate::silver::SilverRecord;

/// A silver batch split by its validity predicate
#[derive(Debug, Clone, PartialEq)]
pub struct Partitioned<T> {
    pub clean: Vec<T>,
    pub quarantine: Vec<T>,
}

impl<T> Partitioned<T> {
    pub fn len(&self) -> usize {
        self.clean.len() + self.quarantine.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clean.is_empty() && self.quarantine.is_empty()
    }
}

/// Classify every row as clean or quarantined without modifying it
///
/// The two partitions are disjoint, together contain every input row, and each
/// keeps the input order.
pub fn split<T: SilverRecord>(rows: Vec<T>) -> Partitioned<T> {
    let (clean, quarantine): (Vec<T>, Vec<T>) = rows.into_iter().partition(|row| row.is_clean());
    Partitioned { clean, quarantine }
}
