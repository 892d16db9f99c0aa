//! Table reader with whole-file checksum verification.

use crate::format::{
    Footer, IndexEntry, RangeTombstone, TableEntry, BLOCK_TRAILER_SIZE,
    FOOTER_LEN_SIZE, TABLE_MAGIC,
};
use crate::Options;
use serde::de::DeserializeOwned;
use sstfuzz_core::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Counters and identity recorded in a table's footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableProperties {
    /// Number of point entries
    pub num_entries: u64,
    /// Number of range tombstones
    pub num_range_deletions: u64,
    /// Number of data blocks
    pub num_data_blocks: u64,
    /// Comparator the table is ordered by
    pub comparator_name: String,
    /// Smallest point key
    pub smallest_key: Vec<u8>,
    /// Largest point key
    pub largest_key: Vec<u8>,
    /// File size in bytes
    pub file_size: u64,
}

/// Reads an existing table file.
pub struct SstFileReader {
    path: PathBuf,
    file: BufReader<File>,
    index: Vec<IndexEntry>,
    footer: Footer,
    file_size: u64,
}

impl SstFileReader {
    /// Open a table file, validating its footer and index.
    pub fn open(options: &Options, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        let file_size = file.metadata()?.len();

        if file_size < FOOTER_LEN_SIZE {
            return Err(Error::Corruption("table file too small".into()));
        }

        // Read footer length (last 4 bytes)
        file.seek(SeekFrom::End(-(FOOTER_LEN_SIZE as i64)))?;
        let mut footer_len_buf = [0u8; 4];
        file.read_exact(&mut footer_len_buf)?;
        let footer_len = u32::from_le_bytes(footer_len_buf) as u64;

        let footer_offset = file_size
            .checked_sub(FOOTER_LEN_SIZE + footer_len)
            .ok_or_else(|| Error::Corruption("footer length exceeds file size".into()))?;

        file.seek(SeekFrom::Start(footer_offset))?;
        let mut footer_buf = vec![0u8; footer_len as usize];
        file.read_exact(&mut footer_buf)?;

        let footer: Footer = decode(&footer_buf, "footer")?;

        if footer.magic != TABLE_MAGIC {
            return Err(Error::Corruption("invalid table magic number".into()));
        }
        let expected_crc = footer
            .compute_crc()
            .map_err(|e| Error::Serialization(e.to_string()))?;
        if footer.crc != expected_crc {
            return Err(Error::Corruption("footer checksum mismatch".into()));
        }
        if footer.comparator != options.comparator.name() {
            return Err(Error::InvalidArgument(format!(
                "table was written with comparator {}, reader uses {}",
                footer.comparator,
                options.comparator.name()
            )));
        }
        if footer.range_del_offset > footer.index_offset
            || block_end(footer.index_offset, footer.index_size) > footer_offset
        {
            return Err(Error::Corruption("footer block handles out of range".into()));
        }

        let mut reader = Self {
            path,
            file: BufReader::new(file),
            index: Vec::new(),
            footer,
            file_size,
        };

        let index_buf = reader.read_checked(
            reader.footer.index_offset,
            reader.footer.index_size as usize,
            "index block",
        )?;
        reader.index = decode(&index_buf, "index block")?;
        debug!(
            path = %reader.path.display(),
            blocks = reader.index.len(),
            "opened table for reading"
        );

        Ok(reader)
    }

    /// Recompute the CRC of every block in the file and compare it with the
    /// stored trailer.
    pub fn verify_checksum(&mut self) -> Result<()> {
        let data_end = self.footer.range_del_offset;

        for block_idx in 0..self.index.len() {
            let (offset, size) = (self.index[block_idx].offset, self.index[block_idx].size);
            let data_size = (size as usize)
                .checked_sub(BLOCK_TRAILER_SIZE)
                .ok_or_else(|| Error::Corruption("data block smaller than its trailer".into()))?;
            if offset.saturating_add(size as u64) > data_end {
                return Err(Error::Corruption(format!(
                    "data block {} overlaps the meta blocks",
                    block_idx
                )));
            }
            self.read_checked(offset, data_size, "data block")?;
        }

        self.read_checked(
            self.footer.range_del_offset,
            self.footer.range_del_size as usize,
            "range deletion block",
        )?;
        self.read_checked(
            self.footer.index_offset,
            self.footer.index_size as usize,
            "index block",
        )?;

        debug!(path = %self.path.display(), "checksums verified");
        Ok(())
    }

    /// Footer-level properties of the table
    pub fn table_properties(&self) -> TableProperties {
        TableProperties {
            num_entries: self.footer.entry_count,
            num_range_deletions: self.footer.range_del_count,
            num_data_blocks: self.index.len() as u64,
            comparator_name: self.footer.comparator.clone(),
            smallest_key: self.footer.smallest_key.clone(),
            largest_key: self.footer.largest_key.clone(),
            file_size: self.file_size,
        }
    }

    /// All range tombstones in the table, in insertion order
    pub fn range_deletions(&mut self) -> Result<Vec<RangeTombstone>> {
        let buf = self.read_checked(
            self.footer.range_del_offset,
            self.footer.range_del_size as usize,
            "range deletion block",
        )?;
        decode(&buf, "range deletion block")
    }

    /// Iterate over all point entries in key order
    pub fn iter(&mut self) -> SstFileIterator<'_> {
        SstFileIterator {
            reader: self,
            block_idx: 0,
            block_entries: Vec::new(),
            entry_idx: 0,
        }
    }

    /// Read `len` bytes at `offset` and check them against the CRC trailer
    /// that follows.
    fn read_checked(&mut self, offset: u64, len: usize, what: &str) -> Result<Vec<u8>> {
        if block_end(offset, len as u32) > self.file_size {
            return Err(Error::Corruption(format!("{} extends past end of file", what)));
        }

        self.file.seek(SeekFrom::Start(offset))?;
        let mut data_buf = vec![0u8; len];
        self.file.read_exact(&mut data_buf)?;

        let mut crc_buf = [0u8; BLOCK_TRAILER_SIZE];
        self.file.read_exact(&mut crc_buf)?;
        let stored_crc = u32::from_le_bytes(crc_buf);
        let computed_crc = crc32fast::hash(&data_buf);

        if stored_crc != computed_crc {
            return Err(Error::Corruption(format!(
                "{} checksum mismatch at offset {}: stored {:#010x}, computed {:#010x}",
                what, offset, stored_crc, computed_crc
            )));
        }

        Ok(data_buf)
    }

    /// Read a data block and parse its entries
    fn read_block(&mut self, block_idx: usize) -> Result<Vec<TableEntry>> {
        let (offset, size) = (self.index[block_idx].offset, self.index[block_idx].size);
        let data_size = (size as usize)
            .checked_sub(BLOCK_TRAILER_SIZE)
            .ok_or_else(|| Error::Corruption("data block smaller than its trailer".into()))?;
        let data_buf = self.read_checked(offset, data_size, "data block")?;

        let mut entries = Vec::new();
        let mut pos = 0;

        while pos < data_buf.len() {
            if pos + 4 > data_buf.len() {
                return Err(Error::Corruption("truncated entry length".into()));
            }
            let len = u32::from_le_bytes([
                data_buf[pos],
                data_buf[pos + 1],
                data_buf[pos + 2],
                data_buf[pos + 3],
            ]) as usize;
            pos += 4;

            if pos + len > data_buf.len() {
                return Err(Error::Corruption("truncated entry".into()));
            }

            entries.push(decode(&data_buf[pos..pos + len], "entry")?);
            pos += len;
        }

        Ok(entries)
    }
}

/// Iterator over table point entries
pub struct SstFileIterator<'a> {
    reader: &'a mut SstFileReader,
    block_idx: usize,
    block_entries: Vec<TableEntry>,
    entry_idx: usize,
}

impl SstFileIterator<'_> {
    /// Get the next entry
    pub fn next_entry(&mut self) -> Result<Option<TableEntry>> {
        loop {
            if self.entry_idx < self.block_entries.len() {
                let entry = self.block_entries[self.entry_idx].clone();
                self.entry_idx += 1;
                return Ok(Some(entry));
            }

            if self.block_idx >= self.reader.index.len() {
                return Ok(None);
            }

            self.block_entries = self.reader.read_block(self.block_idx)?;
            self.block_idx += 1;
            self.entry_idx = 0;
        }
    }

    /// Drain the remaining entries
    pub fn collect_entries(mut self) -> Result<Vec<TableEntry>> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next_entry()? {
            entries.push(entry);
        }
        Ok(entries)
    }
}

fn block_end(offset: u64, size: u32) -> u64 {
    offset
        .saturating_add(size as u64)
        .saturating_add(BLOCK_TRAILER_SIZE as u64)
}

fn decode<T: DeserializeOwned>(buf: &[u8], what: &str) -> Result<T> {
    bincode::deserialize(buf).map_err(|e| Error::Corruption(format!("bad {}: {}", what, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SstFileWriter;
    use tempfile::tempdir;

    #[test]
    fn test_write_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.sst");
        let options = Options::default();

        let mut writer = SstFileWriter::new(options.clone());
        writer.open(&path).unwrap();
        writer.put(b"a", b"1").unwrap();
        writer.merge(b"b", b"2").unwrap();
        writer.delete(b"c").unwrap();
        writer.finish().unwrap();

        let mut reader = SstFileReader::open(&options, &path).unwrap();
        reader.verify_checksum().unwrap();

        let entries = reader.iter().collect_entries().unwrap();
        assert_eq!(
            entries,
            vec![
                TableEntry::value(b"a".to_vec(), b"1".to_vec()),
                TableEntry::merge(b"b".to_vec(), b"2".to_vec()),
                TableEntry::deletion(b"c".to_vec()),
            ]
        );
        assert_eq!(entries[0].as_value(), Some(&b"1"[..]));
        assert_eq!(entries[1].as_value(), None);
        assert!(entries[2].is_deletion());
    }

    #[test]
    fn test_properties_span_blocks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.sst");
        let options = Options::default().with_block_size(64);

        let mut writer = SstFileWriter::new(options.clone());
        writer.open(&path).unwrap();
        for i in 0..100 {
            let key = format!("key{:03}", i);
            let value = format!("value{}", i);
            writer.put(key.as_bytes(), value.as_bytes()).unwrap();
        }
        let info = writer.finish().unwrap();

        let mut reader = SstFileReader::open(&options, &path).unwrap();
        let props = reader.table_properties();
        assert_eq!(props.num_entries, 100);
        assert!(props.num_data_blocks > 1);
        assert_eq!(props.file_size, info.file_size);
        assert_eq!(props.smallest_key, b"key000".to_vec());
        assert_eq!(props.largest_key, b"key099".to_vec());
        assert_eq!(props.comparator_name, "sstfuzz.BytewiseComparator");

        reader.verify_checksum().unwrap();
        assert_eq!(reader.iter().collect_entries().unwrap().len(), 100);
    }

    #[test]
    fn test_range_deletions_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.sst");
        let options = Options::default();

        let mut writer = SstFileWriter::new(options.clone());
        writer.open(&path).unwrap();
        writer.delete_range(b"x", b"z").unwrap();
        writer.delete_range(b"a", b"c").unwrap();
        writer.finish().unwrap();

        let mut reader = SstFileReader::open(&options, &path).unwrap();
        reader.verify_checksum().unwrap();
        assert!(reader.iter().collect_entries().unwrap().is_empty());

        let tombstones = reader.range_deletions().unwrap();
        assert_eq!(tombstones.len(), 2);
        assert_eq!(tombstones[0].start, b"x".to_vec());
        assert_eq!(tombstones[1].end, b"c".to_vec());
    }

    #[test]
    fn test_too_small_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tiny.sst");
        std::fs::write(&path, b"ab").unwrap();

        let err = SstFileReader::open(&Options::default(), &path).err().unwrap();
        assert!(err.is_corruption());
    }
}
