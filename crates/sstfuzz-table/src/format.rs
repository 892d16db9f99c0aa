//! On-disk layout shared by the writer and the reader.
//!
//! ```text
//! +------------------------+
//! | Data Block 0 | CRC32   |  <- length-prefixed point entries
//! | ...                    |
//! | Data Block N | CRC32   |
//! +------------------------+
//! | Range Deletions | CRC32|  <- every delete_range tombstone
//! +------------------------+
//! | Index Block | CRC32    |  <- one handle per data block
//! +------------------------+
//! | Footer | footer_len    |  <- offsets, counts, bounds, magic, CRC
//! +------------------------+
//! ```

use serde::{Deserialize, Serialize};

/// Magic number closing every table file.
pub const TABLE_MAGIC: u64 = 0x5353_5446_555A_5A31; // "SSTFUZZ1"

/// Default data block size threshold (4KB).
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Width of the CRC32 trailer after each block.
pub const BLOCK_TRAILER_SIZE: usize = 4;

/// Width of the footer length suffix.
pub const FOOTER_LEN_SIZE: u64 = 4;

/// Kind of a point entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryType {
    /// Full value for the key
    Value,
    /// Point tombstone
    Deletion,
    /// Merge operand to be folded by a merge operator at read time
    Merge,
}

/// A single point entry in a data block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    /// The key
    pub key: Vec<u8>,
    /// What the entry means for the key
    pub entry_type: EntryType,
    /// Value or merge operand; empty for deletions
    pub value: Vec<u8>,
}

impl TableEntry {
    /// Create a value entry
    pub fn value(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self {
            key,
            entry_type: EntryType::Value,
            value,
        }
    }

    /// Create a merge operand entry
    pub fn merge(key: Vec<u8>, operand: Vec<u8>) -> Self {
        Self {
            key,
            entry_type: EntryType::Merge,
            value: operand,
        }
    }

    /// Create a point tombstone
    pub fn deletion(key: Vec<u8>) -> Self {
        Self {
            key,
            entry_type: EntryType::Deletion,
            value: Vec::new(),
        }
    }

    /// Check if this is a point tombstone
    pub fn is_deletion(&self) -> bool {
        self.entry_type == EntryType::Deletion
    }

    /// Value carried by a `Value` entry
    pub fn as_value(&self) -> Option<&[u8]> {
        match self.entry_type {
            EntryType::Value => Some(&self.value),
            _ => None,
        }
    }
}

/// A range tombstone covering `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeTombstone {
    /// Inclusive start key
    pub start: Vec<u8>,
    /// Exclusive end key
    pub end: Vec<u8>,
}

/// Index entry pointing to a data block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    /// First key in the block
    pub first_key: Vec<u8>,
    /// Offset of the block in the file
    pub offset: u64,
    /// Size of the block in bytes, CRC trailer included
    pub size: u32,
}

/// Table footer containing metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Footer {
    /// Offset of the range deletion block
    pub range_del_offset: u64,
    /// Size of the range deletion block, CRC trailer excluded
    pub range_del_size: u32,
    /// Offset of the index block
    pub index_offset: u64,
    /// Size of the index block, CRC trailer excluded
    pub index_size: u32,
    /// Number of point entries
    pub entry_count: u64,
    /// Number of range tombstones
    pub range_del_count: u64,
    /// Smallest point key
    pub smallest_key: Vec<u8>,
    /// Largest point key
    pub largest_key: Vec<u8>,
    /// Name of the comparator the table is ordered by
    pub comparator: String,
    /// Magic number for validation
    pub magic: u64,
    /// CRC32 of the footer encoded with this field zeroed
    pub crc: u32,
}

impl Footer {
    /// CRC32 over the footer with its `crc` field zeroed.
    pub fn compute_crc(&self) -> bincode::Result<u32> {
        let unsealed = Footer {
            crc: 0,
            ..self.clone()
        };
        Ok(crc32fast::hash(&bincode::serialize(&unsealed)?))
    }
}

/// Appends the CRC32 trailer of `data` to `data`.
pub(crate) fn seal_block(data: &mut Vec<u8>) {
    let crc = crc32fast::hash(data);
    data.extend_from_slice(&crc.to_le_bytes());
}
