//! Bulk-load table writer.
//!
//! Point entries must arrive in strictly ascending key order. Range
//! tombstones are collected separately and may arrive in any order.

use crate::format::{
    seal_block, Footer, IndexEntry, RangeTombstone, TableEntry, BLOCK_TRAILER_SIZE,
    FOOTER_LEN_SIZE, TABLE_MAGIC,
};
use crate::Options;
use sstfuzz_core::{Error, Result};
use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Summary of a finished table file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalSstFileInfo {
    /// Path of the table file
    pub file_path: PathBuf,
    /// Smallest point key, empty if the table has none
    pub smallest_key: Vec<u8>,
    /// Largest point key, empty if the table has none
    pub largest_key: Vec<u8>,
    /// Smallest range tombstone start, empty if the table has none
    pub smallest_range_del_key: Vec<u8>,
    /// Largest range tombstone end, empty if the table has none
    pub largest_range_del_key: Vec<u8>,
    /// Number of point entries
    pub num_entries: u64,
    /// Number of range tombstones
    pub num_range_del_entries: u64,
    /// File size in bytes
    pub file_size: u64,
}

/// State of a table that is currently being written.
struct OpenTable {
    path: PathBuf,
    writer: BufWriter<File>,
    position: u64,
    index: Vec<IndexEntry>,
    block_buffer: Vec<u8>,
    current_block_first_key: Option<Vec<u8>>,
    entry_count: u64,
    smallest_key: Option<Vec<u8>>,
    largest_key: Option<Vec<u8>>,
    range_deletions: Vec<RangeTombstone>,
}

/// Writes a sorted table file from a stream of ascending operations.
pub struct SstFileWriter {
    options: Options,
    table: Option<OpenTable>,
}

impl SstFileWriter {
    /// Create a writer that is not yet bound to a file
    pub fn new(options: Options) -> Self {
        Self {
            options,
            table: None,
        }
    }

    /// Create (or truncate) `path` and start a new table in it. A table that
    /// was open and unfinished is abandoned.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        debug!(path = %path.display(), "opened table for writing");

        self.table = Some(OpenTable {
            path,
            writer: BufWriter::new(file),
            position: 0,
            index: Vec::new(),
            block_buffer: Vec::with_capacity(self.options.block_size),
            current_block_first_key: None,
            entry_count: 0,
            smallest_key: None,
            largest_key: None,
            range_deletions: Vec::new(),
        });
        Ok(())
    }

    /// Add a key/value pair
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.add(TableEntry::value(key.to_vec(), value.to_vec()))
    }

    /// Add a merge operand for `key`
    pub fn merge(&mut self, key: &[u8], operand: &[u8]) -> Result<()> {
        self.add(TableEntry::merge(key.to_vec(), operand.to_vec()))
    }

    /// Add a point tombstone for `key`
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.add(TableEntry::deletion(key.to_vec()))
    }

    /// Delete every key in `[begin, end)`. An empty range is accepted and
    /// dropped; an inverted one is rejected.
    pub fn delete_range(&mut self, begin: &[u8], end: &[u8]) -> Result<()> {
        let comparator = self.options.comparator.clone();
        let table = self.table_mut()?;

        match comparator.compare(begin, end) {
            Ordering::Greater => Err(Error::InvalidArgument(
                "end key comes before start key".into(),
            )),
            Ordering::Equal => Ok(()),
            Ordering::Less => {
                table.range_deletions.push(RangeTombstone {
                    start: begin.to_vec(),
                    end: end.to_vec(),
                });
                Ok(())
            }
        }
    }

    /// Bytes written to the file so far
    pub fn file_size(&self) -> u64 {
        self.table.as_ref().map_or(0, |t| t.position)
    }

    fn table_mut(&mut self) -> Result<&mut OpenTable> {
        self.table
            .as_mut()
            .ok_or_else(|| Error::InvalidArgument("file is not opened".into()))
    }

    fn add(&mut self, entry: TableEntry) -> Result<()> {
        let comparator = self.options.comparator.clone();
        let block_size = self.options.block_size;
        let table = self.table_mut()?;

        if let Some(last) = &table.largest_key {
            if comparator.compare(&entry.key, last) != Ordering::Greater {
                return Err(Error::InvalidArgument(
                    "keys must be added in strict ascending order".into(),
                ));
            }
        }

        if table.smallest_key.is_none() {
            table.smallest_key = Some(entry.key.clone());
        }
        table.largest_key = Some(entry.key.clone());

        if table.current_block_first_key.is_none() {
            table.current_block_first_key = Some(entry.key.clone());
        }

        let encoded =
            bincode::serialize(&entry).map_err(|e| Error::Serialization(e.to_string()))?;
        let len = encoded.len() as u32;
        table.block_buffer.extend_from_slice(&len.to_le_bytes());
        table.block_buffer.extend_from_slice(&encoded);
        table.entry_count += 1;

        if table.block_buffer.len() >= block_size {
            table.flush_block()?;
        }

        Ok(())
    }

    /// Seal the table and close the file. The writer is unbound afterwards.
    pub fn finish(&mut self) -> Result<ExternalSstFileInfo> {
        let mut table = self
            .table
            .take()
            .ok_or_else(|| Error::InvalidArgument("file is not opened".into()))?;

        if table.entry_count == 0 && table.range_deletions.is_empty() {
            return Err(Error::InvalidArgument(
                "cannot create sst file with no entries".into(),
            ));
        }

        table.flush_block()?;

        let comparator = self.options.comparator.clone();
        let range_deletions = std::mem::take(&mut table.range_deletions);
        let index = std::mem::take(&mut table.index);

        let mut smallest_range_del_key: Option<Vec<u8>> = None;
        let mut largest_range_del_key: Option<Vec<u8>> = None;
        for tombstone in &range_deletions {
            if smallest_range_del_key
                .as_deref()
                .map_or(true, |k| comparator.compare(&tombstone.start, k) == Ordering::Less)
            {
                smallest_range_del_key = Some(tombstone.start.clone());
            }
            if largest_range_del_key
                .as_deref()
                .map_or(true, |k| comparator.compare(&tombstone.end, k) == Ordering::Greater)
            {
                largest_range_del_key = Some(tombstone.end.clone());
            }
        }

        let range_del_offset = table.position;
        let range_del_size = table.write_sealed(&range_deletions)?;

        let index_offset = table.position;
        let index_size = table.write_sealed(&index)?;

        let smallest_key = table.smallest_key.take().unwrap_or_default();
        let largest_key = table.largest_key.take().unwrap_or_default();

        let mut footer = Footer {
            range_del_offset,
            range_del_size,
            index_offset,
            index_size,
            entry_count: table.entry_count,
            range_del_count: range_deletions.len() as u64,
            smallest_key: smallest_key.clone(),
            largest_key: largest_key.clone(),
            comparator: comparator.name().to_string(),
            magic: TABLE_MAGIC,
            crc: 0,
        };
        footer.crc = footer
            .compute_crc()
            .map_err(|e| Error::Serialization(e.to_string()))?;
        let footer_encoded =
            bincode::serialize(&footer).map_err(|e| Error::Serialization(e.to_string()))?;

        let footer_len = footer_encoded.len() as u32;
        table.writer.write_all(&footer_encoded)?;
        table.writer.write_all(&footer_len.to_le_bytes())?;
        table.writer.flush()?;
        table.writer.get_ref().sync_all()?;

        let file_size = table.position + footer_encoded.len() as u64 + FOOTER_LEN_SIZE;
        debug!(
            path = %table.path.display(),
            entries = table.entry_count,
            range_deletions = footer.range_del_count,
            file_size,
            "finished table"
        );

        Ok(ExternalSstFileInfo {
            file_path: table.path,
            smallest_key,
            largest_key,
            smallest_range_del_key: smallest_range_del_key.unwrap_or_default(),
            largest_range_del_key: largest_range_del_key.unwrap_or_default(),
            num_entries: footer.entry_count,
            num_range_del_entries: footer.range_del_count,
            file_size,
        })
    }
}

impl OpenTable {
    /// Flush the current data block to disk
    fn flush_block(&mut self) -> Result<()> {
        if self.block_buffer.is_empty() {
            return Ok(());
        }

        seal_block(&mut self.block_buffer);

        if let Some(first_key) = self.current_block_first_key.take() {
            self.index.push(IndexEntry {
                first_key,
                offset: self.position,
                size: self.block_buffer.len() as u32,
            });
        }

        self.writer.write_all(&self.block_buffer)?;
        self.position += self.block_buffer.len() as u64;
        self.block_buffer.clear();

        Ok(())
    }

    /// Write a serialized block followed by its CRC; returns the payload size.
    fn write_sealed<T: serde::Serialize>(&mut self, value: &T) -> Result<u32> {
        let mut encoded =
            bincode::serialize(value).map_err(|e| Error::Serialization(e.to_string()))?;
        let size = encoded.len() as u32;
        seal_block(&mut encoded);

        self.writer.write_all(&encoded)?;
        self.position += encoded.len() as u64;
        debug_assert_eq!(encoded.len(), size as usize + BLOCK_TRAILER_SIZE);

        Ok(size)
    }
}
