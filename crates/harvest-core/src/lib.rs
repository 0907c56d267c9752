//! Core types and traits for harvest.
//!
//! This crate provides the pieces the scan engine is assembled from: error
//! and warning types, the declarative scan configuration, the filesystem
//! abstraction, acceptance predicates, and the filter policy composer.

mod config;
mod error;
mod filter;
mod fs;
mod predicate;

pub use config::{ScanConfig, ScanConfigBuilder, ScanConfigBuilderError};
pub use error::{ScanError, ScanWarning, WarningKind};
pub use filter::{FilterPolicy, FilterSet};
pub use fs::{DirEntry, EntryKind, FileSystem, MemoryFileSystem, OsFileSystem};
pub use predicate::{AcceptancePredicate, ExtensionFilter, GlobFilter, Predicate};
