//! Scan progress reporting.

use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Progress information during a scan.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Number of files published to the queue so far.
    pub files_found: u64,
    /// Number of directories listed so far.
    pub dirs_scanned: u64,
    /// Number of subtrees skipped because they could not be listed.
    pub errors_count: u64,
    /// Directory being listed.
    pub current_path: PathBuf,
    /// Time elapsed since the worker started.
    pub elapsed: Duration,
    /// Whether the worker has stopped.
    pub done: bool,
}

impl ScanProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            files_found: 0,
            dirs_scanned: 0,
            errors_count: 0,
            current_path: PathBuf::new(),
            elapsed: Duration::ZERO,
            done: false,
        }
    }

    /// Calculate scan rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_found as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Get total items visited (files + dirs).
    pub fn total_items(&self) -> u64 {
        self.files_found + self.dirs_scanned
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Worker-side progress counters with timing.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    files_found: u64,
    dirs_scanned: u64,
    errors_count: u64,
    current_path: PathBuf,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            files_found: 0,
            dirs_scanned: 0,
            errors_count: 0,
            current_path: PathBuf::new(),
        }
    }

    pub fn record_file(&mut self) -> u64 {
        self.files_found += 1;
        self.files_found
    }

    pub fn record_dir(&mut self) {
        self.dirs_scanned += 1;
    }

    pub fn record_error(&mut self) {
        self.errors_count += 1;
    }

    pub fn set_current_path(&mut self, path: PathBuf) {
        self.current_path = path;
    }

    pub fn snapshot(&self) -> ScanProgress {
        ScanProgress {
            files_found: self.files_found,
            dirs_scanned: self.dirs_scanned,
            errors_count: self.errors_count,
            current_path: self.current_path.clone(),
            elapsed: self.start_time.elapsed(),
            done: false,
        }
    }
}
