#![allow(dead_code)]

pub mod range_server;

use std::path::Path;
use std::time::Duration;

use streamjoin_core::downloader::DownloadOptions;
use streamjoin_core::retry::RetryPolicy;

/// Five attempts with millisecond backoff so exhaustion tests stay fast.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 5,
        attempt_timeout: Duration::from_secs(10),
        backoff_step: Duration::from_millis(5),
        max_delay: Duration::from_millis(50),
    }
}

pub fn fast_options() -> DownloadOptions {
    DownloadOptions {
        retry: fast_retry(),
        progress_interval: Duration::from_millis(20),
        ..Default::default()
    }
}

/// Deterministic body of `len` bytes.
pub fn body(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

/// Names of files in `dir` containing `.part`.
pub fn part_files(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .map(|rd| {
            rd.flatten()
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .filter(|n| n.contains(".part"))
                .collect()
        })
        .unwrap_or_default()
}
