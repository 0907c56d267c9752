//! Sequential depth-first traversal run by the scan worker.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;
use tracing::{trace, warn};

use harvest_core::{EntryKind, FileSystem, FilterSet, ScanWarning};

use crate::progress::{ProgressTracker, ScanProgress};
use crate::queue::FoundQueue;

/// What a finished walk saw.
#[derive(Debug)]
pub(crate) struct WalkOutcome {
    pub progress: ScanProgress,
    pub warnings: Vec<ScanWarning>,
    pub stopped: bool,
}

/// Borrowed view of everything one walk needs.
pub(crate) struct Walker<'a, F: FileSystem + ?Sized> {
    pub fs: &'a F,
    pub filters: &'a FilterSet,
    pub max_depth: Option<u32>,
    pub queue: &'a FoundQueue,
    pub stop: &'a AtomicBool,
    pub progress_tx: &'a broadcast::Sender<ScanProgress>,
    pub progress_interval: u64,
}

impl<F: FileSystem + ?Sized> Walker<'_, F> {
    /// Walk every root in order, publishing accepted files as they are found.
    ///
    /// Depth 0 is a root's direct children. A directory found at depth `d`
    /// is listed only if `d + 1 <= max_depth`.
    pub fn walk(&self, roots: &[PathBuf]) -> WalkOutcome {
        let mut tracker = ProgressTracker::new();
        let mut warnings = Vec::new();
        let mut stack: Vec<(PathBuf, u32)> = Vec::new();
        let mut stopped = false;

        'roots: for root in roots {
            stack.push((root.clone(), 0));
            while let Some((dir, depth)) = stack.pop() {
                if self.stop.load(Ordering::Relaxed) {
                    stopped = true;
                    break 'roots;
                }
                self.visit(&dir, depth, &mut stack, &mut tracker, &mut warnings);
            }
        }

        WalkOutcome {
            progress: ScanProgress {
                done: true,
                ..tracker.snapshot()
            },
            warnings,
            stopped,
        }
    }

    fn visit(
        &self,
        dir: &Path,
        depth: u32,
        stack: &mut Vec<(PathBuf, u32)>,
        tracker: &mut ProgressTracker,
        warnings: &mut Vec<ScanWarning>,
    ) {
        tracker.set_current_path(dir.to_path_buf());
        let entries = match self.fs.list_entries(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(path = %dir.display(), error = %err, "skipping unreadable directory");
                warnings.push(ScanWarning::from_io(dir, &err));
                tracker.record_error();
                return;
            }
        };
        tracker.record_dir();

        let descend = self.max_depth.is_none_or(|limit| depth < limit);
        let mut subdirs = Vec::new();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(path = %dir.display(), error = %err, "skipping unreadable entry");
                    warnings.push(ScanWarning::from_io(dir, &err));
                    tracker.record_error();
                    continue;
                }
            };
            match entry.kind {
                EntryKind::Directory => {
                    if descend {
                        subdirs.push(dir.join(&entry.file_name));
                    }
                }
                EntryKind::File => {
                    if !self.filters.accept(dir, &entry.name, entry.kind) {
                        continue;
                    }
                    let path = dir.join(&entry.file_name);
                    trace!(path = %path.display(), "found");
                    self.queue.push(path);
                    if tracker.record_file() % self.progress_interval == 0 {
                        // No subscribers is fine.
                        let _ = self.progress_tx.send(tracker.snapshot());
                    }
                }
                EntryKind::Other => {}
            }
        }

        // Reversed so that siblings are visited in listing order.
        stack.extend(subdirs.into_iter().rev().map(|path| (path, depth + 1)));
    }
}
