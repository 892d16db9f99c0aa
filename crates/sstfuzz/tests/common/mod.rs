// Common test utilities for harness integration tests

use sstfuzz::{DefaultFileSystem, Harness, HarnessConfig};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const ARTIFACT_NAME: &str = "harness_test.sst";

/// Test fixture pointing a harness at a private scratch directory
pub struct HarnessFixture {
    #[allow(dead_code)]
    pub temp_dir: TempDir,
    pub harness: Harness,
}

impl HarnessFixture {
    pub fn new() -> Self {
        Self::with_config(HarnessConfig::default())
    }

    pub fn with_config(config: HarnessConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = config.with_file_name(ARTIFACT_NAME);
        let harness =
            Harness::with_file_system(config, DefaultFileSystem::rooted_at(temp_dir.path()));
        Self { temp_dir, harness }
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.temp_dir.path().join(ARTIFACT_NAME)
    }

    /// Names of all files left in the scratch directory
    pub fn leftover_files(&self) -> Vec<String> {
        fs::read_dir(self.temp_dir.path())
            .expect("Failed to read scratch directory")
            .filter_map(|entry| {
                entry
                    .ok()
                    .and_then(|e| e.file_name().to_str().map(String::from))
            })
            .collect()
    }
}

impl Default for HarnessFixture {
    fn default() -> Self {
        Self::new()
    }
}
