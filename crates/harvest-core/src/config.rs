//! Scan configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use globset::Glob;
use serde::{Deserialize, Serialize};

use crate::error::ScanError;
use crate::filter::FilterPolicy;
use crate::predicate::Predicate;

/// Configuration for a scan coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Files and directories to scan. Duplicates are ignored.
    #[builder(default)]
    #[serde(default)]
    pub targets: Vec<PathBuf>,

    /// Maximum recursion depth (None = unlimited, 0 = direct children only).
    #[builder(default)]
    #[serde(default)]
    pub max_depth: Option<u32>,

    /// How filter predicates are combined.
    #[builder(default)]
    #[serde(default)]
    pub policy: FilterPolicy,

    /// File extensions to accept, e.g. `java` or `.xml`.
    #[builder(default)]
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Glob patterns matched against file names.
    #[builder(default)]
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Include hidden files (starting with .).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_hidden: bool,

    /// Drop queued results when a finished scan is started again.
    #[builder(default = "false")]
    #[serde(default)]
    pub clear_on_restart: bool,

    /// Send a progress update every this many found files.
    #[builder(default = "1000")]
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

fn default_true() -> bool {
    true
}

fn default_progress_interval() -> u64 {
    1000
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(targets) = &self.targets {
            if targets.iter().any(|t| t.as_os_str().is_empty()) {
                return Err("Target path cannot be empty".to_string());
            }
        }
        if self.progress_interval == Some(0) {
            return Err("Progress interval must be greater than zero".to_string());
        }
        if let Some(patterns) = &self.patterns {
            for pattern in patterns {
                Glob::new(pattern).map_err(|e| format!("Invalid glob pattern '{pattern}': {e}"))?;
            }
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a simple config scanning a single target with no filters.
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            targets: vec![target.into()],
            ..Self::empty()
        }
    }

    fn empty() -> Self {
        Self {
            targets: Vec::new(),
            max_depth: None,
            policy: FilterPolicy::default(),
            extensions: Vec::new(),
            patterns: Vec::new(),
            include_hidden: true,
            clear_on_restart: false,
            progress_interval: default_progress_interval(),
        }
    }

    /// Build the predicates described by this config.
    ///
    /// Extensions become a single extension predicate, each glob pattern its
    /// own predicate, and `include_hidden = false` adds a visibility check.
    pub fn predicates(&self) -> Result<Vec<Predicate>, ScanError> {
        let mut predicates = Vec::new();
        if !self.extensions.is_empty() {
            predicates.push(Predicate::extensions(&self.extensions));
        }
        for pattern in &self.patterns {
            predicates.push(Predicate::glob(pattern.as_str())?);
        }
        if !self.include_hidden {
            predicates.push(Predicate::Visible);
        }
        Ok(predicates)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::empty()
    }
}
