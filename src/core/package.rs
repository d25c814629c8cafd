//! Package - one build manifest and the sources it owns.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::core::{Dependency, DependencySet, Label};

/// A discovered package.
///
/// The label is computed once at discovery and never changes. The source
/// set is filled by the file walker; the dependency set is filled while
/// walking and read by the manifest synchronizer.
#[derive(Debug, Clone)]
pub struct Package {
    /// Path of the BUILD manifest
    manifest_path: PathBuf,

    /// Target label, `//` + directory relative to the workspace root
    label: Label,

    /// Directory containing the manifest
    root: PathBuf,

    /// Name of the configured source root this package was found under
    root_kind: String,

    /// Source files owned by this package (nested packages excluded)
    sources: BTreeSet<PathBuf>,

    /// Resolved dependencies
    deps: DependencySet,
}

impl Package {
    /// Create a package stub for a manifest.
    pub fn new(manifest_path: PathBuf, label: Label, root_kind: impl Into<String>) -> Self {
        let root = manifest_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();

        Package {
            manifest_path,
            label,
            root,
            root_kind: root_kind.into(),
            sources: BTreeSet::new(),
            deps: DependencySet::new(),
        }
    }

    /// Get the manifest path.
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Get the target label.
    pub fn label(&self) -> &Label {
        &self.label
    }

    /// Get the package directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the source root kind (`main`, `test`, ...).
    pub fn root_kind(&self) -> &str {
        &self.root_kind
    }

    /// Source files owned by this package, in path order.
    pub fn sources(&self) -> &BTreeSet<PathBuf> {
        &self.sources
    }

    /// Replace the source set.
    pub fn set_sources(&mut self, sources: BTreeSet<PathBuf>) {
        self.sources = sources;
    }

    /// Record a dependency.
    ///
    /// A dependency on the package's own label is never recorded. Returns
    /// `true` if the dependency was new.
    pub fn add_dependency(&self, dep: Dependency) -> bool {
        if dep.is_label(&self.label) {
            tracing::trace!("{}: ignoring self-dependency", self.label);
            return false;
        }
        self.deps.insert(dep)
    }

    /// Dependencies in canonical order.
    pub fn dependencies(&self) -> Vec<Dependency> {
        self.deps.sorted()
    }

    /// The underlying dependency set.
    pub fn dependency_set(&self) -> &DependencySet {
        &self.deps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(label: &str) -> Package {
        let path = PathBuf::from(format!("/ws{}/BUILD.bazel", &label[1..]));
        Package::new(path, Label::parse(label).unwrap(), "main")
    }

    #[test]
    fn test_package_root() {
        let pkg = package("//src/a");
        assert_eq!(pkg.root(), Path::new("/ws/src/a"));
        assert_eq!(pkg.root_kind(), "main");
    }

    #[test]
    fn test_no_self_dependency() {
        let pkg = package("//src/a");
        assert!(!pkg.add_dependency(Dependency::from_entry("//src/a")));
        assert!(!pkg.add_dependency(Dependency::from_entry("//src/a:a")));
        assert!(pkg.add_dependency(Dependency::from_entry("//src/b")));

        let deps: Vec<_> = pkg.dependencies().iter().map(|d| d.to_string()).collect();
        assert_eq!(deps, vec!["//src/b"]);
    }
}
