//! Key ordering.
//!
//! The same comparator orders keys inside a table and validates input before
//! it reaches the writer, so both sides agree on what "ascending" means.

use std::cmp::Ordering;

/// A total order over key byte strings.
pub trait Comparator: Send + Sync {
    /// Name recorded in every table built with this comparator. A reader
    /// refuses tables written under a different name.
    fn name(&self) -> &str;

    /// Three-way comparison of two keys.
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering;

    /// True when both keys compare equal.
    fn equal(&self, a: &[u8], b: &[u8]) -> bool {
        self.compare(a, b) == Ordering::Equal
    }
}

/// Lexicographic byte order, the default for every table.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytewiseComparator;

impl Comparator for BytewiseComparator {
    fn name(&self) -> &str {
        "sstfuzz.BytewiseComparator"
    }

    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }
}
