//! # sstfuzz
//!
//! Structure-aware fuzz harness for a bulk-load SST file writer and reader.
//!
//! Each iteration takes a typed [`DbOperations`] input, normalizes it into
//! strictly ascending unique keys, replays it into an [`SstFileWriter`],
//! reopens the result with an [`SstFileReader`], verifies its checksums and
//! deletes it. Any failure along the way panics, which is the crash signal a
//! fuzzing engine records.
//!
//! ```rust,no_run
//! use sstfuzz::{DbOperation, DbOperations, Harness, Outcome};
//!
//! let harness = Harness::default();
//! let input = DbOperations::from(vec![
//!     DbOperation::put("b", "2"),
//!     DbOperation::put("a", "1"),
//!     DbOperation::put("b", "9"),
//! ]);
//! assert!(matches!(harness.run(input), Outcome::Verified(_)));
//! ```
//!
//! [`SstFileWriter`]: sstfuzz_table::SstFileWriter
//! [`SstFileReader`]: sstfuzz_table::SstFileReader

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod harness;
pub mod logging;
pub mod normalize;
pub mod operation;

pub use harness::{Harness, HarnessConfig, Outcome, Stage};
pub use normalize::{is_normalized, normalize, normalize_with};
pub use operation::{DbOperation, DbOperations, OpType};

// Re-export engine types the harness is configured with
pub use sstfuzz_core::{BytewiseComparator, Comparator, DefaultFileSystem, Error, FileSystem};
pub use sstfuzz_table::{ExternalSstFileInfo, Options};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
