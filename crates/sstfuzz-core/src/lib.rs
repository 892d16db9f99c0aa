//! # sstfuzz core
//!
//! Shared building blocks for the sstfuzz workspace: the error type, the key
//! ordering used by both the table engine and the input normalizer, and the
//! filesystem capability the harness allocates artifacts through.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod comparator;
pub mod env;
pub mod error;

pub use comparator::{BytewiseComparator, Comparator};
pub use env::{DefaultFileSystem, FileSystem};
pub use error::{Error, Result};
