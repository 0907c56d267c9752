//! Background directory scanning for harvest.
//!
//! # Overview
//!
//! `harvest-scan` walks one or more roots on a single background thread and
//! publishes every accepted file into a shared [`FoundQueue`] while the walk
//! is still running. Key features:
//!
//! - **One worker per coordinator**; starting twice is a no-op
//! - **Blocking and non-blocking consumption** from any number of threads
//! - **Interruptible waits** via [`Interrupter`]
//! - **Progress updates** via broadcast channels
//! - **Configurable** depth limits, extension/glob filters and ALL/ANY policy
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//!
//! use harvest_scan::{FilterPolicy, ScanConfig, ScanCoordinator};
//!
//! let config = ScanConfig::builder()
//!     .targets(vec![PathBuf::from("/path/to/project")])
//!     .extensions(vec!["java".to_string(), "xml".to_string()])
//!     .policy(FilterPolicy::Any)
//!     .build()
//!     .unwrap();
//!
//! let coordinator = ScanCoordinator::new();
//! coordinator.configure(&config).unwrap();
//! coordinator.start().unwrap();
//!
//! let interrupter = coordinator.interrupter();
//! while let Some(path) = coordinator.next_found(&interrupter).unwrap() {
//!     println!("{}", path.display());
//! }
//! ```
//!
//! # Progress Monitoring
//!
//! ```rust,no_run
//! use harvest_scan::ScanCoordinator;
//!
//! let coordinator = ScanCoordinator::new();
//! let mut progress_rx = coordinator.subscribe();
//!
//! std::thread::spawn(move || {
//!     while let Ok(progress) = progress_rx.blocking_recv() {
//!         println!("Found {} files", progress.files_found);
//!         if progress.done {
//!             break;
//!         }
//!     }
//! });
//! ```

mod coordinator;
mod progress;
mod queue;
mod walker;

pub use coordinator::ScanCoordinator;
pub use progress::ScanProgress;
pub use queue::{FoundQueue, Interrupter, ScanPhase};

// Re-export core types for convenience
pub use harvest_core::{
    AcceptancePredicate, DirEntry, EntryKind, FileSystem, FilterPolicy, FilterSet,
    MemoryFileSystem, OsFileSystem, Predicate, ScanConfig, ScanError, ScanWarning, WarningKind,
};
