//! Structured fuzz input: an ordered list of typed key/value operations.
//!
//! Every type here implements [`Arbitrary`], so libFuzzer mutates inputs at
//! the level of whole operations, variants and byte fields instead of raw
//! bytes. Decoding never fails; validity is the normalizer's job.

use arbitrary::{Arbitrary, Unstructured};
use std::fmt;

/// Kind of write operation to replay into the table writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpType {
    /// Insert `key` with `value`
    Put,
    /// Insert `value` as a merge operand for `key`
    Merge,
    /// Point-delete `key`
    Delete,
    /// Delete `[key, value)`
    DeleteRange,
    /// Wire tag the harness does not know how to replay
    Unsupported(u8),
}

impl OpType {
    /// Decode a wire tag
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            0 => OpType::Put,
            1 => OpType::Merge,
            2 => OpType::Delete,
            3 => OpType::DeleteRange,
            other => OpType::Unsupported(other),
        }
    }

    /// Wire tag of this variant
    pub fn tag(self) -> u8 {
        match self {
            OpType::Put => 0,
            OpType::Merge => 1,
            OpType::Delete => 2,
            OpType::DeleteRange => 3,
            OpType::Unsupported(tag) => tag,
        }
    }

    /// True for the four variants the harness can replay
    pub fn is_supported(self) -> bool {
        !matches!(self, OpType::Unsupported(_))
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpType::Put => write!(f, "PUT"),
            OpType::Merge => write!(f, "MERGE"),
            OpType::Delete => write!(f, "DELETE"),
            OpType::DeleteRange => write!(f, "DELETE_RANGE"),
            OpType::Unsupported(tag) => write!(f, "UNSUPPORTED({})", tag),
        }
    }
}

impl<'a> Arbitrary<'a> for OpType {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        let tag = u8::arbitrary(u)?;
        // One tag value in 32 stands in for an unknown enum value.
        if tag % 32 == 31 {
            Ok(OpType::Unsupported(tag))
        } else {
            Ok(OpType::from_tag(tag % 4))
        }
    }

    fn size_hint(depth: usize) -> (usize, Option<usize>) {
        u8::size_hint(depth)
    }
}

/// A single operation in the input sequence.
#[derive(Debug, Clone, PartialEq, Eq, Arbitrary)]
pub struct DbOperation {
    /// What to do
    pub op_type: OpType,
    /// Target key, or range start for `DeleteRange`
    pub key: Vec<u8>,
    /// Value or merge operand, range end for `DeleteRange`, unused for `Delete`
    pub value: Vec<u8>,
}

impl DbOperation {
    /// Build an operation of any type
    pub fn new(op_type: OpType, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            op_type,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a PUT operation
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self::new(OpType::Put, key, value)
    }

    /// Create a MERGE operation
    pub fn merge(key: impl Into<Vec<u8>>, operand: impl Into<Vec<u8>>) -> Self {
        Self::new(OpType::Merge, key, operand)
    }

    /// Create a DELETE operation
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        Self::new(OpType::Delete, key, Vec::new())
    }

    /// Create a DELETE_RANGE operation over `[start, end)`
    pub fn delete_range(start: impl Into<Vec<u8>>, end: impl Into<Vec<u8>>) -> Self {
        Self::new(OpType::DeleteRange, start, end)
    }
}

/// Ordered operation sequence; order is replay order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Arbitrary)]
pub struct DbOperations {
    /// The operations
    pub operations: Vec<DbOperation>,
}

impl DbOperations {
    /// Decode raw fuzzer bytes. Undecodable input yields an empty sequence.
    pub fn from_fuzz_bytes(data: &[u8]) -> Self {
        let u = Unstructured::new(data);
        Self::arbitrary_take_rest(u).unwrap_or_default()
    }

    /// Number of operations
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// True if there is nothing to replay
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Iterate in replay order
    pub fn iter(&self) -> std::slice::Iter<'_, DbOperation> {
        self.operations.iter()
    }
}

impl From<Vec<DbOperation>> for DbOperations {
    fn from(operations: Vec<DbOperation>) -> Self {
        Self { operations }
    }
}

impl<'a> IntoIterator for &'a DbOperations {
    type Item = &'a DbOperation;
    type IntoIter = std::slice::Iter<'a, DbOperation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}
