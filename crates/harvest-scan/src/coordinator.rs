//! The scan coordinator: configuration, worker lifecycle and queue access.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use indexmap::IndexSet;
use parking_lot::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use harvest_core::{
    FileSystem, FilterPolicy, FilterSet, OsFileSystem, Predicate, ScanConfig, ScanError,
    ScanWarning,
};

use crate::progress::ScanProgress;
use crate::queue::{FoundQueue, Interrupter, ScanPhase};
use crate::walker::Walker;

const PROGRESS_CHANNEL_SIZE: usize = 100;
const WORKER_THREAD_NAME: &str = "harvest-scan";

/// Configuration that is frozen while a scan runs.
#[derive(Debug, Clone)]
struct Settings {
    roots: IndexSet<PathBuf>,
    files: IndexSet<PathBuf>,
    max_depth: Option<u32>,
    filters: FilterSet,
    clear_on_restart: bool,
    progress_interval: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let defaults = ScanConfig::default();
        Self {
            roots: IndexSet::new(),
            files: IndexSet::new(),
            max_depth: defaults.max_depth,
            filters: FilterSet::with_policy(defaults.policy),
            clear_on_restart: defaults.clear_on_restart,
            progress_interval: defaults.progress_interval,
        }
    }
}

enum TargetKind {
    File,
    Directory,
}

/// Runs one background walk at a time and exposes what it finds.
///
/// The coordinator owns the target set, depth limit, filters and the
/// [`FoundQueue`]. Configuration may only change while no scan is running;
/// attempts during a scan fail with [`ScanError::IllegalState`]. The queue
/// can be read and drained from any thread at any time.
///
/// Restarting a finished scan keeps whatever is still queued unless
/// [`ScanConfig::clear_on_restart`] is set.
pub struct ScanCoordinator<F: FileSystem = OsFileSystem> {
    fs: Arc<F>,
    settings: Mutex<Settings>,
    queue: FoundQueue,
    stop: Arc<AtomicBool>,
    warnings: Arc<Mutex<Vec<ScanWarning>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl ScanCoordinator<OsFileSystem> {
    /// Create a coordinator over the real filesystem.
    pub fn new() -> Self {
        Self::with_filesystem(OsFileSystem::new())
    }
}

impl Default for ScanCoordinator<OsFileSystem> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FileSystem> ScanCoordinator<F> {
    /// Create a coordinator over any filesystem implementation.
    pub fn with_filesystem(fs: F) -> Self {
        Self::with_shared_filesystem(Arc::new(fs))
    }

    /// Create a coordinator over a filesystem shared with other owners.
    pub fn with_shared_filesystem(fs: Arc<F>) -> Self {
        let (progress_tx, _) = broadcast::channel(PROGRESS_CHANNEL_SIZE);
        Self {
            fs,
            settings: Mutex::new(Settings::default()),
            queue: FoundQueue::new(),
            stop: Arc::new(AtomicBool::new(false)),
            warnings: Arc::new(Mutex::new(Vec::new())),
            worker: Mutex::new(None),
            progress_tx,
        }
    }

    /// Lock the settings for mutation, failing if a scan is running.
    fn settings_mut(&self, operation: &'static str) -> Result<MutexGuard<'_, Settings>, ScanError> {
        let settings = self.settings.lock();
        if self.queue.phase() == ScanPhase::Running {
            return Err(ScanError::illegal_state(operation));
        }
        Ok(settings)
    }

    fn classify(&self, target: &Path) -> Result<TargetKind, ScanError> {
        if !self.fs.exists(target) {
            return Err(ScanError::NotFound {
                path: target.to_path_buf(),
            });
        }
        if self.fs.is_dir(target) {
            Ok(TargetKind::Directory)
        } else {
            Ok(TargetKind::File)
        }
    }

    /// Apply a declarative configuration.
    ///
    /// Replaces the target set, depth limit, policy and restart behaviour, and
    /// adds the config's predicates to the filter set. Every target is checked
    /// before anything changes. Plain-file targets are queued immediately
    /// instead of becoming scan roots.
    pub fn configure(&self, config: &ScanConfig) -> Result<(), ScanError> {
        let predicates = config.predicates()?;
        if config.progress_interval == 0 {
            return Err(ScanError::InvalidConfig {
                message: "progress interval must be greater than zero".to_string(),
            });
        }

        let mut settings = self.settings_mut("configure")?;

        let mut roots = IndexSet::new();
        let mut files = IndexSet::new();
        for target in &config.targets {
            match self.classify(target)? {
                TargetKind::Directory => roots.insert(target.clone()),
                TargetKind::File => files.insert(target.clone()),
            };
        }

        settings.max_depth = config.max_depth;
        settings.filters.set_policy(config.policy);
        settings.filters.extend(predicates);
        settings.clear_on_restart = config.clear_on_restart;
        settings.progress_interval = config.progress_interval;
        settings.roots = roots;
        settings.files = files;

        debug!(
            roots = settings.roots.len(),
            files = settings.files.len(),
            max_depth = ?settings.max_depth,
            policy = %settings.filters.policy(),
            filters = settings.filters.len(),
            "scan configured"
        );
        self.queue.push_all(settings.files.iter().cloned());
        Ok(())
    }

    /// Add one target. A plain file is queued immediately.
    ///
    /// Returns `false` if the target was already configured.
    pub fn add_target(&self, target: impl Into<PathBuf>) -> Result<bool, ScanError> {
        let target = target.into();
        let mut settings = self.settings_mut("add a target")?;
        match self.classify(&target)? {
            TargetKind::Directory => Ok(settings.roots.insert(target)),
            TargetKind::File => {
                if !settings.files.insert(target.clone()) {
                    return Ok(false);
                }
                self.queue.push(target);
                Ok(true)
            }
        }
    }

    /// Add a directory root, rejecting anything that is not a directory.
    pub fn add_directory(&self, dir: impl Into<PathBuf>) -> Result<bool, ScanError> {
        let dir = dir.into();
        let mut settings = self.settings_mut("add a directory")?;
        match self.classify(&dir)? {
            TargetKind::Directory => Ok(settings.roots.insert(dir)),
            TargetKind::File => Err(ScanError::NotADirectory { path: dir }),
        }
    }

    /// Directory roots that will be walked.
    pub fn roots(&self) -> Vec<PathBuf> {
        self.settings.lock().roots.iter().cloned().collect()
    }

    /// Plain-file targets that were queued directly.
    pub fn file_targets(&self) -> Vec<PathBuf> {
        self.settings.lock().files.iter().cloned().collect()
    }

    /// Set the depth limit (None = unlimited).
    pub fn set_max_depth(&self, max_depth: Option<u32>) -> Result<(), ScanError> {
        self.settings_mut("change the depth limit")?.max_depth = max_depth;
        Ok(())
    }

    /// Current depth limit.
    pub fn max_depth(&self) -> Option<u32> {
        self.settings.lock().max_depth
    }

    /// Add a filter predicate. Returns `false` if an equal one is present.
    pub fn add_filter(&self, predicate: Predicate) -> Result<bool, ScanError> {
        Ok(self.settings_mut("add a filter")?.filters.add(predicate))
    }

    /// Remove a filter predicate. Returns `false` if it was not present.
    pub fn remove_filter(&self, predicate: &Predicate) -> Result<bool, ScanError> {
        Ok(self.settings_mut("remove a filter")?.filters.remove(predicate))
    }

    /// Check if a filter predicate is registered.
    pub fn contains_filter(&self, predicate: &Predicate) -> bool {
        self.settings.lock().filters.contains(predicate)
    }

    /// Change how filters are combined.
    pub fn set_policy(&self, policy: FilterPolicy) -> Result<(), ScanError> {
        self.settings_mut("change the filter policy")?
            .filters
            .set_policy(policy);
        Ok(())
    }

    /// Current filter policy.
    pub fn policy(&self) -> FilterPolicy {
        self.settings.lock().filters.policy()
    }

    /// Copy of the current filter set.
    pub fn filters(&self) -> FilterSet {
        self.settings.lock().filters.clone()
    }

    /// Start the background walk.
    ///
    /// Returns `Ok(false)` without doing anything if a scan is already
    /// running. Otherwise spawns exactly one worker and returns immediately.
    pub fn start(&self) -> Result<bool, ScanError> {
        let settings = self.settings.lock();
        let files: Vec<PathBuf> = settings.files.iter().cloned().collect();
        let Some(previous) = self.queue.try_begin(settings.clear_on_restart, &files) else {
            debug!("scan already running, start ignored");
            return Ok(false);
        };

        let mut worker = self.worker.lock();
        if let Some(handle) = worker.take() {
            // The previous worker has already marked the scan finished.
            if handle.join().is_err() {
                warn!("previous scan worker panicked");
            }
        }

        self.stop.store(false, Ordering::SeqCst);
        self.warnings.lock().clear();

        let job = ScanJob {
            fs: Arc::clone(&self.fs),
            roots: settings.roots.iter().cloned().collect(),
            filters: settings.filters.clone(),
            max_depth: settings.max_depth,
            progress_interval: settings.progress_interval.max(1),
            queue: self.queue.clone(),
            stop: Arc::clone(&self.stop),
            warnings: Arc::clone(&self.warnings),
            progress_tx: self.progress_tx.clone(),
        };
        drop(settings);

        debug!(from = %previous, roots = job.roots.len(), "starting scan");
        let spawned = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || job.run());

        match spawned {
            Ok(handle) => {
                *worker = Some(handle);
                Ok(true)
            }
            Err(source) => {
                self.queue.abort_begin(previous);
                Err(ScanError::Worker { source })
            }
        }
    }

    /// Ask a running walk to stop after the directory it is listing.
    ///
    /// The scan still transitions to finished. Returns `false` if no scan
    /// was running.
    pub fn stop(&self) -> bool {
        if self.queue.phase() != ScanPhase::Running {
            return false;
        }
        self.stop.store(true, Ordering::SeqCst);
        true
    }

    /// Wait for the worker thread to exit.
    ///
    /// Returns `false` if the worker panicked.
    pub fn join(&self) -> bool {
        let handle = self.worker.lock().take();
        handle.is_none_or(|handle| handle.join().is_ok())
    }

    /// Current scan phase.
    pub fn phase(&self) -> ScanPhase {
        self.queue.phase()
    }

    /// Check if the scan has finished.
    pub fn is_finished(&self) -> bool {
        self.queue.is_finished()
    }

    /// Check if no found paths are queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of queued paths.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Remove the most recently found path without waiting.
    pub fn pop(&self) -> Result<PathBuf, ScanError> {
        self.queue.pop()
    }

    /// Remove the most recently found path, waiting for one if necessary.
    pub fn take_blocking(&self, interrupter: &Interrupter) -> Result<PathBuf, ScanError> {
        self.queue.take_blocking(interrupter)
    }

    /// Blocking take that gives up after `timeout`.
    pub fn take_timeout(&self, timeout: Duration) -> Option<PathBuf> {
        self.queue.take_timeout(timeout)
    }

    /// Next found path, or `None` once the scan is finished and drained.
    pub fn next_found(&self, interrupter: &Interrupter) -> Result<Option<PathBuf>, ScanError> {
        self.queue.next_found(interrupter)
    }

    /// Wait until the scan finishes, including one not yet started.
    pub fn wait_until_finished(&self, interrupter: &Interrupter) -> Result<(), ScanError> {
        self.queue.wait_until_finished(interrupter)
    }

    /// Wait up to `timeout` for the scan to finish.
    pub fn wait_finished_timeout(&self, timeout: Duration) -> bool {
        self.queue.wait_finished_timeout(timeout)
    }

    /// Copy of the queued paths in the order they were found.
    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.queue.snapshot()
    }

    /// Drop every queued path.
    pub fn clear(&self) -> usize {
        self.queue.clear()
    }

    /// Handle for interrupting blocking waits on this coordinator.
    pub fn interrupter(&self) -> Interrupter {
        self.queue.interrupter()
    }

    /// A consumer handle onto the found queue.
    pub fn queue(&self) -> FoundQueue {
        self.queue.clone()
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Subtrees skipped by the most recent walk.
    pub fn warnings(&self) -> Vec<ScanWarning> {
        self.warnings.lock().clone()
    }
}

impl<F: FileSystem> Drop for ScanCoordinator<F> {
    fn drop(&mut self) {
        // The detached worker winds down after its current directory.
        self.stop.store(true, Ordering::SeqCst);
    }
}

/// Everything the worker thread owns for one walk.
struct ScanJob<F: FileSystem> {
    fs: Arc<F>,
    roots: Vec<PathBuf>,
    filters: FilterSet,
    max_depth: Option<u32>,
    progress_interval: u64,
    queue: FoundQueue,
    stop: Arc<AtomicBool>,
    warnings: Arc<Mutex<Vec<ScanWarning>>>,
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl<F: FileSystem> ScanJob<F> {
    fn run(self) {
        let _finished = FinishGuard(&self.queue);

        let outcome = Walker {
            fs: self.fs.as_ref(),
            filters: &self.filters,
            max_depth: self.max_depth,
            queue: &self.queue,
            stop: &self.stop,
            progress_tx: &self.progress_tx,
            progress_interval: self.progress_interval,
        }
        .walk(&self.roots);

        info!(
            files = outcome.progress.files_found,
            dirs = outcome.progress.dirs_scanned,
            skipped = outcome.warnings.len(),
            stopped = outcome.stopped,
            elapsed = ?outcome.progress.elapsed,
            "scan finished"
        );
        *self.warnings.lock() = outcome.warnings;
        let _ = self.progress_tx.send(outcome.progress);
    }
}

/// Marks the scan finished when the worker exits, including by panic.
struct FinishGuard<'a>(&'a FoundQueue);

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}
