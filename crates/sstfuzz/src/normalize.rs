//! Rewrites a fuzzed operation sequence into one the table writer accepts:
//! keys strictly ascending, each key used once.
//!
//! Only reordering and dropping happen. Types and payloads of the surviving
//! operations are untouched, so mutations the fuzzer made to them still reach
//! the writer.

use crate::operation::{DbOperation, DbOperations};
use sstfuzz_core::{BytewiseComparator, Comparator};
use std::cmp::Ordering;

/// Normalize under the default bytewise ordering.
pub fn normalize(ops: DbOperations) -> DbOperations {
    normalize_with(ops, &BytewiseComparator)
}

/// Stable-sort by key, then keep the first operation of every run of equal
/// keys. Because the sort is stable, the survivor is the earliest operation
/// with that key in the original input.
pub fn normalize_with(mut ops: DbOperations, comparator: &dyn Comparator) -> DbOperations {
    ops.operations
        .sort_by(|a, b| comparator.compare(&a.key, &b.key));
    ops.operations
        .dedup_by(|later, kept| comparator.equal(&later.key, &kept.key));
    ops
}

/// True when every adjacent pair of keys is strictly ascending.
pub fn is_normalized(ops: &[DbOperation], comparator: &dyn Comparator) -> bool {
    ops.windows(2)
        .all(|pair| comparator.compare(&pair[0].key, &pair[1].key) == Ordering::Less)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OpType;

    #[test]
    fn test_duplicate_key_keeps_first_occurrence() {
        let input = DbOperations::from(vec![
            DbOperation::put("a", "1"),
            DbOperation::put("b", "2"),
            DbOperation::put("a", "9"),
        ]);

        let output = normalize(input);
        assert_eq!(
            output.operations,
            vec![DbOperation::put("a", "1"), DbOperation::put("b", "2")]
        );
    }

    #[test]
    fn test_duplicate_keeps_type_of_first() {
        let input = DbOperations::from(vec![
            DbOperation::delete("k"),
            DbOperation::merge("k", "x"),
            DbOperation::delete_range("k", "z"),
        ]);

        let output = normalize(input);
        assert_eq!(output.operations, vec![DbOperation::delete("k")]);
    }

    #[test]
    fn test_sorts_unsupported_like_any_other() {
        let input = DbOperations::from(vec![
            DbOperation::put("c", "3"),
            DbOperation::new(OpType::Unsupported(200), "b", ""),
            DbOperation::put("a", "1"),
        ]);

        let output = normalize(input);
        let keys: Vec<&[u8]> = output.iter().map(|op| op.key.as_slice()).collect();
        assert_eq!(keys, vec![&b"a"[..], b"b", b"c"]);
        assert_eq!(output.operations[1].op_type, OpType::Unsupported(200));
    }

    #[test]
    fn test_empty_passes_through() {
        let output = normalize(DbOperations::default());
        assert!(output.is_empty());
    }

    #[test]
    fn test_is_normalized() {
        let cmp = BytewiseComparator;
        assert!(is_normalized(&[], &cmp));
        assert!(is_normalized(&[DbOperation::put("a", "")], &cmp));
        assert!(is_normalized(
            &[DbOperation::put("a", ""), DbOperation::put("b", "")],
            &cmp
        ));
        assert!(!is_normalized(
            &[DbOperation::put("a", ""), DbOperation::put("a", "")],
            &cmp
        ));
        assert!(!is_normalized(
            &[DbOperation::put("b", ""), DbOperation::put("a", "")],
            &cmp
        ));
    }
}
