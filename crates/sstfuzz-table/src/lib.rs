//! # sstfuzz table
//!
//! Bulk-load sorted table files: [`SstFileWriter`] turns an ascending stream
//! of puts, merges, deletes and range deletions into an immutable file, and
//! [`SstFileReader`] opens such a file and verifies every block checksum.
//!
//! ```rust,no_run
//! use sstfuzz_table::{Options, SstFileReader, SstFileWriter};
//!
//! let options = Options::default();
//! let mut writer = SstFileWriter::new(options.clone());
//! writer.open("/tmp/example.sst")?;
//! writer.put(b"a", b"1")?;
//! writer.delete_range(b"b", b"d")?;
//! writer.finish()?;
//!
//! let mut reader = SstFileReader::open(&options, "/tmp/example.sst")?;
//! reader.verify_checksum()?;
//! # Ok::<(), sstfuzz_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod format;
pub mod reader;
pub mod writer;

pub use format::{EntryType, RangeTombstone, TableEntry};
pub use reader::{SstFileIterator, SstFileReader, TableProperties};
pub use writer::{ExternalSstFileInfo, SstFileWriter};

use sstfuzz_core::{BytewiseComparator, Comparator};
use std::fmt;
use std::sync::Arc;

/// Table build and read options
#[derive(Clone)]
pub struct Options {
    /// Data block size threshold in bytes
    pub block_size: usize,
    /// Key ordering; must match between writer and reader
    pub comparator: Arc<dyn Comparator>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            block_size: format::DEFAULT_BLOCK_SIZE,
            comparator: Arc::new(BytewiseComparator),
        }
    }
}

impl Options {
    /// Set the data block size threshold
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Set the key ordering
    pub fn with_comparator(mut self, comparator: Arc<dyn Comparator>) -> Self {
        self.comparator = comparator;
        self
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("block_size", &self.block_size)
            .field("comparator", &self.comparator.name())
            .finish()
    }
}
