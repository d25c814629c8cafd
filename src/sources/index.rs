//! Package discovery.
//!
//! Scans the directories matched by each source root for manifest files and
//! turns every one into a `Package` stub with its label precomputed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

use crate::core::manifest::find_manifest_in;
use crate::core::{Label, Package, SourceRoot, Workspace};

/// Discovery failed; no partial result is produced.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum DiscoveryError {
    #[error("invalid pattern `{pattern}` for source root `{root}`")]
    #[diagnostic(
        code(buildsync::discovery::pattern),
        help("patterns are root-relative globs such as `src/main/java` or `*/src/main/java`")
    )]
    Pattern {
        root: String,
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("failed to read {} while matching source root `{root}`", .path.display())]
    #[diagnostic(code(buildsync::discovery::glob))]
    Glob {
        root: String,
        path: PathBuf,
        #[source]
        source: glob::GlobError,
    },

    #[error("failed to scan {} for source root `{root}`", .path.display())]
    #[diagnostic(
        code(buildsync::discovery::scan),
        help("every directory under a source root must be readable")
    )]
    Scan {
        root: String,
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Finds packages in a workspace.
pub struct SourceIndex<'a> {
    ws: &'a Workspace,
}

impl<'a> SourceIndex<'a> {
    /// Create an index over a workspace.
    pub fn new(ws: &'a Workspace) -> Self {
        SourceIndex { ws }
    }

    /// Discover the packages under one source root, ordered by label.
    ///
    /// An absent root, or a pattern matching no directory, yields an empty
    /// result.
    pub fn discover(&self, root: Option<&SourceRoot>) -> Result<Vec<Package>, DiscoveryError> {
        let Some(root) = root else {
            return Ok(Vec::new());
        };

        let mut found = BTreeMap::new();
        for dir in self.match_root(root)? {
            self.scan(root, &dir, &mut found)?;
        }

        tracing::debug!(
            "source root `{}` ({}): {} packages",
            root.name,
            root.pattern,
            found.len()
        );
        Ok(found.into_values().collect())
    }

    /// Discover packages under every configured source root.
    ///
    /// A manifest reachable from several roots is reported once, tagged
    /// with the first root that found it.
    pub fn discover_all(&self) -> Result<Vec<Package>, DiscoveryError> {
        let mut all: BTreeMap<Label, Package> = BTreeMap::new();
        for root in self.ws.source_roots() {
            for pkg in self.discover(Some(root))? {
                all.entry(pkg.label().clone()).or_insert(pkg);
            }
        }

        tracing::info!("discovered {} packages", all.len());
        Ok(all.into_values().collect())
    }

    /// Directories matched by a root's pattern.
    fn match_root(&self, root: &SourceRoot) -> Result<Vec<PathBuf>, DiscoveryError> {
        let pattern = self.ws.root().join(&root.pattern);
        let pattern = pattern.to_string_lossy();

        let paths = glob::glob(&pattern).map_err(|source| DiscoveryError::Pattern {
            root: root.name.clone(),
            pattern: root.pattern.clone(),
            source,
        })?;

        let mut dirs = Vec::new();
        for entry in paths {
            let path = entry.map_err(|source| DiscoveryError::Glob {
                root: root.name.clone(),
                path: source.path().to_path_buf(),
                source,
            })?;
            if path.is_dir() {
                dirs.push(path);
            }
        }
        dirs.sort();
        dirs.dedup();
        Ok(dirs)
    }

    /// Recursively collect manifests below `dir`.
    fn scan(
        &self,
        root: &SourceRoot,
        dir: &Path,
        found: &mut BTreeMap<Label, Package>,
    ) -> Result<(), DiscoveryError> {
        let walker = WalkDir::new(dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_ignored(e));

        for entry in walker {
            let entry = entry.map_err(|source| DiscoveryError::Scan {
                root: root.name.clone(),
                path: source
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| dir.to_path_buf()),
                source,
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }

            if let Some(manifest) = find_manifest_in(entry.path(), self.ws.manifest_names()) {
                let label = Label::for_dir(self.ws.root(), entry.path());
                tracing::trace!("found {} at {}", label, manifest.display());
                found
                    .entry(label.clone())
                    .or_insert_with(|| Package::new(manifest, label, root.name.as_str()));
            }
        }
        Ok(())
    }

    fn is_ignored(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        self.ws.ignore_dirs().iter().any(|d| *d == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::WorkspaceFixture;

    fn labels(pkgs: &[Package]) -> Vec<String> {
        pkgs.iter().map(|p| p.label().to_string()).collect()
    }

    #[test]
    fn test_discover_sorted_labels() {
        let ws = WorkspaceFixture::new()
            .package("src/b", "java_library")
            .package("src/a", "java_library")
            .package("src/a/inner", "java_library")
            .file("src/c/Orphan.java", "class Orphan {}")
            .build();
        let workspace = ws.workspace();

        let pkgs = SourceIndex::new(&workspace).discover_all().unwrap();
        assert_eq!(labels(&pkgs), vec!["//src/a", "//src/a/inner", "//src/b"]);
        assert!(pkgs.iter().all(|p| p.root_kind() == "src"));
        assert!(pkgs[0].manifest_path().ends_with("src/a/BUILD.bazel"));
    }

    #[test]
    fn test_absent_root_is_empty() {
        let ws = WorkspaceFixture::new().build();
        let workspace = ws.workspace();
        let index = SourceIndex::new(&workspace);

        assert!(index.discover(None).unwrap().is_empty());
        let missing = SourceRoot::new("gen", "does/not/exist");
        assert!(index.discover(Some(&missing)).unwrap().is_empty());
    }

    #[test]
    fn test_canonical_manifest_name_wins() {
        let ws = WorkspaceFixture::new()
            .file("src/a/BUILD", "java_library(name = \"a\")\n")
            .file("src/a/BUILD.bazel", "java_library(name = \"a\")\n")
            .file("src/b/BUILD", "java_library(name = \"b\")\n")
            .build();
        let workspace = ws.workspace();

        let pkgs = SourceIndex::new(&workspace).discover_all().unwrap();
        assert!(pkgs[0].manifest_path().ends_with("BUILD.bazel"));
        assert!(pkgs[1].manifest_path().ends_with("src/b/BUILD"));
    }

    #[test]
    fn test_glob_roots_and_dedup() {
        let ws = WorkspaceFixture::new()
            .config("[roots]\nmain = \"svc/*/java\"\nall = \"svc\"\n")
            .package("svc/one/java/com/one", "java_library")
            .package("svc/two/java/com/two", "java_library")
            .package("svc/tools", "java_binary")
            .build();
        let workspace = ws.workspace();

        let pkgs = SourceIndex::new(&workspace).discover_all().unwrap();
        assert_eq!(
            labels(&pkgs),
            vec!["//svc/one/java/com/one", "//svc/tools", "//svc/two/java/com/two"]
        );
        // `all` sorts before `main`, so it is queried first
        assert!(pkgs.iter().all(|p| p.root_kind() == "all"));
    }

    #[test]
    fn test_ignored_dirs_not_scanned() {
        let ws = WorkspaceFixture::new()
            .package("src/a", "java_library")
            .package("src/node_modules/x", "java_library")
            .build();
        let workspace = ws.workspace();

        let pkgs = SourceIndex::new(&workspace).discover_all().unwrap();
        assert_eq!(labels(&pkgs), vec!["//src/a"]);
    }

    #[test]
    fn test_workspace_root_package() {
        let ws = WorkspaceFixture::new()
            .config("[roots]\nroot = \".\"\n")
            .file("BUILD.bazel", "java_library(name = \"app\")\n")
            .build();
        let workspace = ws.workspace();

        let pkgs = SourceIndex::new(&workspace).discover_all().unwrap();
        assert_eq!(labels(&pkgs), vec!["//"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_dir_aborts_scan() {
        use std::os::unix::fs::PermissionsExt;

        let ws = WorkspaceFixture::new()
            .package("src/a", "java_library")
            .package("src/locked/b", "java_library")
            .build();
        let locked = ws.path().join("src/locked");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Root can read anything; nothing to assert in that case.
        let readable = std::fs::read_dir(&locked).is_ok();
        let workspace = ws.workspace();
        let result = SourceIndex::new(&workspace).discover_all();

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        if !readable {
            assert!(matches!(result, Err(DiscoveryError::Scan { .. })));
        }
    }
}
