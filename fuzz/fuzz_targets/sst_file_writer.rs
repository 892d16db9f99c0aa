#![no_main]

// Replays fuzzed operations through the SST file writer, reopens the file
// with the reader and verifies its checksums. Any failure panics, which
// libFuzzer reports as a crash.

use libfuzzer_sys::fuzz_target;
use sstfuzz::logging::LogConfig;
use sstfuzz::{DbOperations, Harness};
use std::sync::OnceLock;

static HARNESS: OnceLock<Harness> = OnceLock::new();

fuzz_target!(
    init: {
        // Stderr output has no worker guard to hold on to
        let _ = LogConfig::default().init();
    },
    |input: DbOperations| {
        HARNESS.get_or_init(Harness::default).run(input);
    }
);
