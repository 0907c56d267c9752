//! harvest - background directory scanning with a live result queue.
//!
//! A [`ScanCoordinator`] walks its roots on one background thread and
//! publishes accepted files while the walk is in progress. Consumers pop,
//! block for the next file, or wait for the scan to finish.
//!
//! ```rust,no_run
//! use harvest::{Predicate, ScanCoordinator};
//!
//! let coordinator = ScanCoordinator::new();
//! coordinator.add_directory("/path/to/project").unwrap();
//! coordinator.add_filter(Predicate::extensions(["java", "xml"])).unwrap();
//! coordinator.start().unwrap();
//!
//! let interrupter = coordinator.interrupter();
//! while let Some(path) = coordinator.next_found(&interrupter).unwrap() {
//!     println!("{}", path.display());
//! }
//! ```
//!
//! The building blocks live in [`harvest_core`] (filters, configuration,
//! filesystem access) and [`harvest_scan`] (coordinator and queue).

pub use harvest_core;
pub use harvest_scan;

pub use harvest_scan::{
    AcceptancePredicate, DirEntry, EntryKind, FileSystem, FilterPolicy, FilterSet, FoundQueue,
    Interrupter, MemoryFileSystem, OsFileSystem, Predicate, ScanConfig, ScanCoordinator,
    ScanError, ScanPhase, ScanProgress, ScanWarning, WarningKind,
};
