//! Dependencies and the per-package dependency set.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Mutex;

use serde::{Serialize, Serializer};

use crate::core::Label;

/// A single entry in a target's dependency list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dependency {
    /// Another package in this workspace.
    Internal(Label),
    /// An artifact coordinate provided by an external symbol source,
    /// e.g. `@maven//:com_google_guava_guava`.
    External(String),
}

impl Dependency {
    /// Classify a raw dependency-list entry.
    pub fn from_entry(entry: &str) -> Dependency {
        match Label::parse(entry) {
            Some(label) => Dependency::Internal(label),
            None => Dependency::External(entry.to_string()),
        }
    }

    /// The text written into the manifest.
    pub fn as_str(&self) -> &str {
        match self {
            Dependency::Internal(label) => label.as_str(),
            Dependency::External(coord) => coord,
        }
    }

    /// Whether this dependency points at the given package.
    pub fn is_label(&self, label: &Label) -> bool {
        matches!(self, Dependency::Internal(l) if l == label)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Dependency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl Ord for Dependency {
    fn cmp(&self, other: &Self) -> Ordering {
        canonical_cmp(self.as_str(), other.as_str()).then_with(|| {
            let rank = |d: &Dependency| matches!(d, Dependency::External(_)) as u8;
            rank(self).cmp(&rank(other))
        })
    }
}

impl PartialOrd for Dependency {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Canonical ordering for dependency-list entries.
///
/// Local labels (`:x`) sort first, then workspace labels (`//x`), then
/// external repositories (`@x`) and anything else; lexicographic within
/// each group.
pub fn canonical_cmp(a: &str, b: &str) -> Ordering {
    fn group(s: &str) -> u8 {
        if s.starts_with(':') {
            0
        } else if s.starts_with("//") {
            1
        } else if s.starts_with('@') {
            2
        } else {
            3
        }
    }

    group(a).cmp(&group(b)).then_with(|| a.cmp(b))
}

/// Deduplicated set of dependencies, safe to fill from several threads.
///
/// Insertion order is irrelevant: [`DependencySet::sorted`] always yields
/// the canonical order.
#[derive(Debug, Default)]
pub struct DependencySet {
    inner: Mutex<BTreeSet<Dependency>>,
}

impl DependencySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a dependency. Returns `true` if it was not already present.
    pub fn insert(&self, dep: Dependency) -> bool {
        self.lock().insert(dep)
    }

    /// Whether the set contains the dependency.
    pub fn contains(&self, dep: &Dependency) -> bool {
        self.lock().contains(dep)
    }

    /// Number of dependencies.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove every dependency.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Snapshot of the set in canonical order.
    pub fn sorted(&self) -> Vec<Dependency> {
        self.lock().iter().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeSet<Dependency>> {
        // A panic while holding the lock cannot leave the set half-updated.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clone for DependencySet {
    fn clone(&self) -> Self {
        DependencySet {
            inner: Mutex::new(self.lock().clone()),
        }
    }
}

impl FromIterator<Dependency> for DependencySet {
    fn from_iter<I: IntoIterator<Item = Dependency>>(iter: I) -> Self {
        DependencySet {
            inner: Mutex::new(iter.into_iter().collect()),
        }
    }
}
