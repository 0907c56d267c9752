//! The found-file queue shared between the scan worker and its consumers.
//!
//! One mutex guards both the queued paths and the scan phase, and two
//! condition variables hang off it: `pushed` (signalled on every push and on
//! completion) and `finished` (signalled on completion). Every wait loop
//! re-checks its predicate after waking.
//!
//! Removal is from the tail, so [`FoundQueue::pop`] returns the most recently
//! found path. [`FoundQueue::snapshot`] lists paths in the order they were
//! found.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use strum::Display;

use harvest_core::ScanError;

/// Lifecycle of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ScanPhase {
    /// No scan has been started yet.
    #[default]
    Idle,
    /// The worker is walking.
    Running,
    /// The worker has exhausted (or abandoned) every root.
    Finished,
}

#[derive(Debug, Default)]
struct QueueState {
    items: Vec<PathBuf>,
    phase: ScanPhase,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<QueueState>,
    pushed: Condvar,
    finished: Condvar,
}

/// Handle to the queue of found files.
///
/// Clones share the same queue. Only the coordinator's worker pushes.
#[derive(Debug, Clone, Default)]
pub struct FoundQueue {
    shared: Arc<Shared>,
}

impl FoundQueue {
    /// Create an empty, idle queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued paths.
    pub fn len(&self) -> usize {
        self.shared.state.lock().items.len()
    }

    /// Check if no paths are queued.
    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().items.is_empty()
    }

    /// Current scan phase.
    pub fn phase(&self) -> ScanPhase {
        self.shared.state.lock().phase
    }

    /// Check if the scan has finished.
    pub fn is_finished(&self) -> bool {
        self.phase() == ScanPhase::Finished
    }

    /// Copy of the queued paths in the order they were found.
    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.shared.state.lock().items.clone()
    }

    /// Remove every queued path, returning how many were dropped.
    pub fn clear(&self) -> usize {
        let mut state = self.shared.state.lock();
        let dropped = state.items.len();
        state.items.clear();
        dropped
    }

    /// Remove the most recently found path without waiting.
    pub fn pop(&self) -> Result<PathBuf, ScanError> {
        self.shared.state.lock().items.pop().ok_or(ScanError::Empty)
    }

    /// Remove the most recently found path, waiting for one if necessary.
    ///
    /// This waits for a push even after the scan has finished; use
    /// [`next_found`](Self::next_found) to stop at the end of the scan.
    pub fn take_blocking(&self, interrupter: &Interrupter) -> Result<PathBuf, ScanError> {
        let mut state = self.shared.state.lock();
        loop {
            if interrupter.is_interrupted() {
                return Err(ScanError::Cancelled);
            }
            if let Some(path) = state.items.pop() {
                return Ok(path);
            }
            self.shared.pushed.wait(&mut state);
        }
    }

    /// Like [`take_blocking`](Self::take_blocking) but gives up after `timeout`.
    pub fn take_timeout(&self, timeout: Duration) -> Option<PathBuf> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        loop {
            if let Some(path) = state.items.pop() {
                return Some(path);
            }
            if self.shared.pushed.wait_until(&mut state, deadline).timed_out() {
                return state.items.pop();
            }
        }
    }

    /// Next found path, or `None` once the scan has finished and the queue
    /// is drained. Before the first start this waits like a running scan.
    pub fn next_found(&self, interrupter: &Interrupter) -> Result<Option<PathBuf>, ScanError> {
        let mut state = self.shared.state.lock();
        loop {
            if interrupter.is_interrupted() {
                return Err(ScanError::Cancelled);
            }
            if let Some(path) = state.items.pop() {
                return Ok(Some(path));
            }
            if state.phase == ScanPhase::Finished {
                return Ok(None);
            }
            self.shared.pushed.wait(&mut state);
        }
    }

    /// Wait until the scan reaches [`ScanPhase::Finished`].
    ///
    /// Returns at once if it already has. An idle queue waits for a scan to
    /// be started and to finish.
    pub fn wait_until_finished(&self, interrupter: &Interrupter) -> Result<(), ScanError> {
        let mut state = self.shared.state.lock();
        loop {
            if state.phase == ScanPhase::Finished {
                return Ok(());
            }
            if interrupter.is_interrupted() {
                return Err(ScanError::Cancelled);
            }
            self.shared.finished.wait(&mut state);
        }
    }

    /// Wait up to `timeout` for the scan to reach [`ScanPhase::Finished`].
    ///
    /// Returns `true` if it has finished when this returns.
    pub fn wait_finished_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while state.phase != ScanPhase::Finished {
            if self.shared.finished.wait_until(&mut state, deadline).timed_out() {
                return state.phase == ScanPhase::Finished;
            }
        }
        true
    }

    /// Create a handle that can interrupt waits on this queue.
    pub fn interrupter(&self) -> Interrupter {
        Interrupter {
            flag: Arc::new(AtomicBool::new(false)),
            shared: Arc::clone(&self.shared),
        }
    }

    pub(crate) fn push(&self, path: PathBuf) {
        let mut state = self.shared.state.lock();
        state.items.push(path);
        self.shared.pushed.notify_all();
    }

    pub(crate) fn push_all(&self, paths: impl IntoIterator<Item = PathBuf>) {
        let mut state = self.shared.state.lock();
        let before = state.items.len();
        state.items.extend(paths);
        if state.items.len() > before {
            self.shared.pushed.notify_all();
        }
    }

    /// Move to `Running` unless already there.
    ///
    /// When restarting a finished scan with `clear` set, queued paths are
    /// replaced by `republish` in the same critical section.
    pub(crate) fn try_begin(&self, clear: bool, republish: &[PathBuf]) -> Option<ScanPhase> {
        let mut state = self.shared.state.lock();
        let previous = state.phase;
        if previous == ScanPhase::Running {
            return None;
        }
        if clear && previous == ScanPhase::Finished {
            state.items.clear();
            state.items.extend(republish.iter().cloned());
        }
        state.phase = ScanPhase::Running;
        Some(previous)
    }

    /// Undo a [`try_begin`](Self::try_begin) whose worker never started.
    pub(crate) fn abort_begin(&self, previous: ScanPhase) {
        let mut state = self.shared.state.lock();
        state.phase = previous;
        self.shared.pushed.notify_all();
        self.shared.finished.notify_all();
    }

    pub(crate) fn finish(&self) {
        let mut state = self.shared.state.lock();
        state.phase = ScanPhase::Finished;
        self.shared.pushed.notify_all();
        self.shared.finished.notify_all();
    }
}

/// Interrupts blocking waits on one [`FoundQueue`].
///
/// A wait given an interrupted handle returns [`ScanError::Cancelled`]. The
/// flag is sticky: once interrupted, every later wait with this handle (or a
/// clone of it) fails immediately.
#[derive(Debug, Clone)]
pub struct Interrupter {
    flag: Arc<AtomicBool>,
    shared: Arc<Shared>,
}

impl Interrupter {
    /// Interrupt every wait using this handle.
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::SeqCst);
        // Taking the lock orders the store before any waiter's re-check.
        let _state = self.shared.state.lock();
        self.shared.pushed.notify_all();
        self.shared.finished.notify_all();
    }

    /// Check if [`interrupt`](Self::interrupt) has been called.
    pub fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
