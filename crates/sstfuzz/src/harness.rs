//! Generate-verify harness.
//!
//! One call to [`Harness::run`] is one fuzz iteration:
//!
//! ```text
//! INIT -> WRITE -> FINALIZE -> REOPEN -> VERIFY -> CLEANUP -> DONE
//! ```
//!
//! Any failure from the filesystem, writer or reader aborts the iteration with
//! a panic, which libFuzzer records as a crash. Empty input and unsupported
//! operation types end the iteration early without a finding.

use crate::normalize::normalize_with;
use crate::operation::{DbOperations, OpType};
use sstfuzz_core::{DefaultFileSystem, FileSystem};
use sstfuzz_table::{ExternalSstFileInfo, Options, SstFileReader, SstFileWriter};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, warn};

/// Unwrap a capability result or abort the iteration.
macro_rules! check_ok {
    ($stage:expr, $result:expr) => {
        match $result {
            Ok(value) => value,
            Err(err) => fatal($stage, &err),
        }
    };
}

/// Step of a harness iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Resolve the artifact path and build the writer
    Init,
    /// Open the artifact and replay operations
    Write,
    /// Finish the writer
    Finalize,
    /// Open a reader on the artifact
    Reopen,
    /// Check every block checksum
    Verify,
    /// Delete the artifact
    Cleanup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::Write => "write",
            Stage::Finalize => "finalize",
            Stage::Reopen => "reopen",
            Stage::Verify => "verify",
            Stage::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

/// How an iteration ended, when it did not crash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to replay; no artifact was created
    Empty,
    /// Replay stopped at an operation type the harness cannot dispatch
    Unsupported {
        /// Position of the operation in the normalized sequence
        index: usize,
        /// Its wire tag
        tag: u8,
    },
    /// The artifact was written, verified and deleted
    Verified(ExternalSstFileInfo),
}

/// Harness configuration
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Artifact file name inside the test directory
    pub file_name: String,
    /// Options for both the writer and the reader
    pub options: Options,
}

/// Distinguishes default artifact names of harnesses within one process.
static NEXT_ARTIFACT_ID: AtomicU64 = AtomicU64::new(0);

impl Default for HarnessConfig {
    fn default() -> Self {
        let id = NEXT_ARTIFACT_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            file_name: format!("sst_file_writer_fuzzer-{}-{}.sst", std::process::id(), id),
            options: Options::default(),
        }
    }
}

impl HarnessConfig {
    /// Set the artifact file name
    pub fn with_file_name<S: Into<String>>(mut self, file_name: S) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Set the table options
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }
}

/// Drives writer and reader through one generate-verify cycle per input.
pub struct Harness<F: FileSystem = DefaultFileSystem> {
    config: HarnessConfig,
    fs: F,
}

impl Harness<DefaultFileSystem> {
    /// Harness writing artifacts under the default test directory
    pub fn new(config: HarnessConfig) -> Self {
        Self::with_file_system(config, DefaultFileSystem::new())
    }
}

impl Default for Harness<DefaultFileSystem> {
    fn default() -> Self {
        Self::new(HarnessConfig::default())
    }
}

impl<F: FileSystem> Harness<F> {
    /// Harness allocating artifacts through `fs`
    pub fn with_file_system(config: HarnessConfig, fs: F) -> Self {
        Self { config, fs }
    }

    /// The active configuration
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Normalize `input` and run one iteration on it.
    pub fn run(&self, input: DbOperations) -> Outcome {
        let ops = normalize_with(input, self.config.options.comparator.as_ref());
        self.run_normalized(&ops)
    }

    /// Run one iteration on an already normalized sequence.
    ///
    /// # Panics
    ///
    /// Panics if any filesystem, writer or reader call fails. This is the
    /// crash signal a fuzzing engine collects.
    pub fn run_normalized(&self, ops: &DbOperations) -> Outcome {
        if ops.is_empty() {
            return Outcome::Empty;
        }

        let dir = check_ok!(Stage::Init, self.fs.test_directory());
        let artifact = ArtifactGuard::new(&self.fs, dir.join(&self.config.file_name));
        let mut writer = SstFileWriter::new(self.config.options.clone());
        debug!(stage = %Stage::Init, path = %artifact.path().display(), ops = ops.len());

        check_ok!(Stage::Write, writer.open(artifact.path()));
        for (index, op) in ops.iter().enumerate() {
            match op.op_type {
                OpType::Put => check_ok!(Stage::Write, writer.put(&op.key, &op.value)),
                OpType::Merge => check_ok!(Stage::Write, writer.merge(&op.key, &op.value)),
                OpType::Delete => check_ok!(Stage::Write, writer.delete(&op.key)),
                OpType::DeleteRange => {
                    check_ok!(Stage::Write, writer.delete_range(&op.key, &op.value))
                }
                OpType::Unsupported(tag) => {
                    warn!(index, tag, "unsupported operation, skipping input");
                    drop(writer);
                    artifact.remove();
                    return Outcome::Unsupported { index, tag };
                }
            }
        }

        let info = check_ok!(Stage::Finalize, writer.finish());
        debug!(
            stage = %Stage::Finalize,
            entries = info.num_entries,
            range_deletions = info.num_range_del_entries,
            file_size = info.file_size
        );

        let mut reader = check_ok!(
            Stage::Reopen,
            SstFileReader::open(&self.config.options, artifact.path())
        );
        check_ok!(Stage::Verify, reader.verify_checksum());
        drop(reader);

        artifact.remove();
        Outcome::Verified(info)
    }
}

/// Log the failure and abort the iteration.
#[cold]
fn fatal(stage: Stage, err: &dyn fmt::Display) -> ! {
    error!(%stage, error = %err, "harness failure");
    panic!("{} failed: {}", stage, err);
}

/// Owns the artifact path for one iteration and deletes the file on every
/// exit that unwinds.
struct ArtifactGuard<'a, F: FileSystem> {
    fs: &'a F,
    path: PathBuf,
    armed: bool,
}

impl<'a, F: FileSystem> ArtifactGuard<'a, F> {
    fn new(fs: &'a F, path: PathBuf) -> Self {
        Self {
            fs,
            path,
            armed: true,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the artifact now. A failed delete is reported but not fatal.
    fn remove(mut self) {
        self.armed = false;
        if let Err(err) = self.fs.delete_file(&self.path) {
            warn!(
                stage = %Stage::Cleanup,
                path = %self.path.display(),
                error = %err,
                "failed to delete artifact"
            );
        }
    }
}

impl<F: FileSystem> Drop for ArtifactGuard<'_, F> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(err) = self.fs.delete_file(&self.path) {
            debug!(path = %self.path.display(), error = %err, "artifact not removed on unwind");
        }
    }
}
