//! Acceptance predicates over `(directory, name)` pairs.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use globset::{Glob, GlobMatcher};
use indexmap::IndexSet;

use crate::error::ScanError;

/// Decides whether an entry named `name` inside `dir` is wanted.
pub trait AcceptancePredicate: Send + Sync {
    /// Return `true` to accept the entry.
    fn accept(&self, dir: &Path, name: &str) -> bool;
}

impl<F> AcceptancePredicate for F
where
    F: Fn(&Path, &str) -> bool + Send + Sync,
{
    fn accept(&self, dir: &Path, name: &str) -> bool {
        self(dir, name)
    }
}

/// Accepts names ending in one of a set of extensions.
///
/// Matching is ASCII case-insensitive and works on the whole suffix, so
/// `tar.gz` matches `backup.tar.gz`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFilter {
    suffixes: IndexSet<String>,
}

impl ExtensionFilter {
    /// Create a filter from extensions with or without a leading dot.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let suffixes = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .map(|ext| format!(".{ext}"))
            .collect();
        Self { suffixes }
    }

    /// Extensions this filter accepts, without the leading dot.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.suffixes.iter().map(|s| &s[1..])
    }

    fn matches(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        self.suffixes
            .iter()
            .any(|suffix| name.len() > suffix.len() && name.ends_with(suffix.as_str()))
    }
}

/// Accepts names matching a glob pattern.
#[derive(Debug, Clone)]
pub struct GlobFilter {
    pattern: String,
    matcher: GlobMatcher,
}

impl GlobFilter {
    /// Compile a glob pattern such as `*.rs` or `report-??.csv`.
    pub fn new(pattern: impl Into<String>) -> Result<Self, ScanError> {
        let pattern = pattern.into();
        let matcher = Glob::new(&pattern)
            .map_err(|e| ScanError::InvalidConfig {
                message: format!("invalid glob pattern '{pattern}': {e}"),
            })?
            .compile_matcher();
        Ok(Self { pattern, matcher })
    }

    /// The source pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl PartialEq for GlobFilter {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for GlobFilter {}

/// A predicate stored in a [`FilterSet`](crate::FilterSet).
///
/// Built-in variants compare by value; custom predicates compare by identity
/// of the shared instance, so adding the same `Arc` twice is a no-op while two
/// separately built closures stay distinct.
#[derive(Clone)]
pub enum Predicate {
    /// Extension suffix match.
    Extension(ExtensionFilter),
    /// Glob match on the entry name.
    Glob(GlobFilter),
    /// Rejects dot-files.
    Visible,
    /// Caller-supplied predicate.
    Custom(Arc<dyn AcceptancePredicate>),
}

impl Predicate {
    /// Shorthand for an [`ExtensionFilter`].
    pub fn extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Extension(ExtensionFilter::new(extensions))
    }

    /// Shorthand for a [`GlobFilter`].
    pub fn glob(pattern: impl Into<String>) -> Result<Self, ScanError> {
        GlobFilter::new(pattern).map(Self::Glob)
    }

    /// Wrap any predicate implementation.
    pub fn custom(predicate: impl AcceptancePredicate + 'static) -> Self {
        Self::Custom(Arc::new(predicate))
    }
}

impl AcceptancePredicate for Predicate {
    fn accept(&self, dir: &Path, name: &str) -> bool {
        match self {
            Predicate::Extension(filter) => filter.matches(name),
            Predicate::Glob(filter) => filter.matcher.is_match(name),
            Predicate::Visible => !name.starts_with('.'),
            Predicate::Custom(predicate) => predicate.accept(dir, name),
        }
    }
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Predicate::Extension(a), Predicate::Extension(b)) => a == b,
            (Predicate::Glob(a), Predicate::Glob(b)) => a == b,
            (Predicate::Visible, Predicate::Visible) => true,
            (Predicate::Custom(a), Predicate::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Predicate {}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Extension(filter) => f
                .debug_tuple("Extension")
                .field(&filter.extensions().collect::<Vec<_>>())
                .finish(),
            Predicate::Glob(filter) => f.debug_tuple("Glob").field(&filter.pattern).finish(),
            Predicate::Visible => f.write_str("Visible"),
            Predicate::Custom(predicate) => f
                .debug_tuple("Custom")
                .field(&Arc::as_ptr(predicate).cast::<()>())
                .finish(),
        }
    }
}
