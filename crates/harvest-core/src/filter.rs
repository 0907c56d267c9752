//! Composition of acceptance predicates under an ALL / ANY policy.

use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::fs::{EntryKind, FileSystem};
use crate::predicate::{AcceptancePredicate, Predicate};

/// How the predicates of a [`FilterSet`] are combined.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FilterPolicy {
    /// Every predicate must accept.
    #[serde(alias = "strict")]
    #[strum(to_string = "all", serialize = "strict")]
    All,
    /// At least one predicate must accept.
    #[default]
    #[serde(alias = "lazy")]
    #[strum(to_string = "any", serialize = "lazy")]
    Any,
}

/// An ordered, duplicate-free set of predicates plus a combination policy.
///
/// Directories are always accepted so that content filters never prune the
/// walk. An empty set accepts every file under either policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    predicates: Vec<Predicate>,
    policy: FilterPolicy,
}

impl FilterSet {
    /// Create an empty set with the default [`FilterPolicy::Any`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty set with the given policy.
    pub fn with_policy(policy: FilterPolicy) -> Self {
        Self {
            predicates: Vec::new(),
            policy,
        }
    }

    /// Add a predicate. Returns `false` if an equal one was already present.
    pub fn add(&mut self, predicate: Predicate) -> bool {
        if self.contains(&predicate) {
            return false;
        }
        self.predicates.push(predicate);
        true
    }

    /// Remove a predicate. Returns `false` if it was not present.
    pub fn remove(&mut self, predicate: &Predicate) -> bool {
        match self.predicates.iter().position(|p| p == predicate) {
            Some(index) => {
                self.predicates.remove(index);
                true
            }
            None => false,
        }
    }

    /// Check membership.
    pub fn contains(&self, predicate: &Predicate) -> bool {
        self.predicates.iter().any(|p| p == predicate)
    }

    /// Current combination policy.
    pub fn policy(&self) -> FilterPolicy {
        self.policy
    }

    /// Change the combination policy.
    pub fn set_policy(&mut self, policy: FilterPolicy) {
        self.policy = policy;
    }

    /// Number of predicates.
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// Check if no predicates are registered.
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Iterate predicates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Predicate> {
        self.predicates.iter()
    }

    /// Remove every predicate, keeping the policy.
    pub fn clear(&mut self) {
        self.predicates.clear();
    }

    /// Evaluate the entry `dir/name` whose kind is already known.
    pub fn accept(&self, dir: &Path, name: &str, kind: EntryKind) -> bool {
        if kind.is_dir() || self.predicates.is_empty() {
            return true;
        }
        match self.policy {
            FilterPolicy::All => self.predicates.iter().all(|p| p.accept(dir, name)),
            FilterPolicy::Any => self.predicates.iter().any(|p| p.accept(dir, name)),
        }
    }

    /// Evaluate `dir/name`, resolving its kind through `fs`.
    pub fn accept_path<F: FileSystem + ?Sized>(&self, fs: &F, dir: &Path, name: &str) -> bool {
        self.accept(dir, name, fs.kind_of(dir, name))
    }
}

impl Extend<Predicate> for FilterSet {
    fn extend<T: IntoIterator<Item = Predicate>>(&mut self, iter: T) {
        for predicate in iter {
            self.add(predicate);
        }
    }
}
