//! Per-package source traversal.
//!
//! A walk descends from a package's directory, carrying the owning package
//! explicitly. A subdirectory that is another package's root is skipped
//! along with everything below it, so every file belongs to the nearest
//! enclosing manifest only.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use miette::Diagnostic as MietteDiagnostic;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::core::manifest::find_manifest_in;
use crate::core::{Dependency, Package};
use crate::parser::SourceParser;
use crate::resolver::{Resolution, SymbolResolver};

/// A package's walk could not complete.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum TraversalError {
    #[error("failed to read directory {}", .path.display())]
    #[diagnostic(code(buildsync::walk::read_dir))]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read source file {}", .path.display())]
    #[diagnostic(code(buildsync::walk::read_file))]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Traversal state, reported at trace level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkState<'p> {
    Entering(&'p Path),
    VisitingFile(&'p Path),
    SkippingNestedPackage(&'p Path),
    Done,
}

/// A referenced name neither tier could resolve.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct UnresolvedReference {
    pub file: PathBuf,
    pub name: String,
}

/// Result of walking one package.
#[derive(Debug, Clone, Default)]
pub struct WalkReport {
    /// Source files visited
    pub files: usize,
    /// Unresolved references, sorted
    pub unresolved: Vec<UnresolvedReference>,
}

/// Directories that start a package.
#[derive(Debug, Clone)]
pub struct PackageBoundaries {
    roots: HashSet<PathBuf>,
    manifest_names: Vec<String>,
}

impl PackageBoundaries {
    /// Boundaries for the discovered packages.
    ///
    /// Directories holding a manifest outside every source root are
    /// boundaries too.
    pub fn new<'a>(
        packages: impl IntoIterator<Item = &'a Package>,
        manifest_names: &[String],
    ) -> Self {
        PackageBoundaries {
            roots: packages.into_iter().map(|p| p.root().to_path_buf()).collect(),
            manifest_names: manifest_names.to_vec(),
        }
    }

    /// Whether `dir` belongs to a package other than `owner`.
    pub fn is_boundary(&self, dir: &Path, owner: &Package) -> bool {
        dir != owner.root()
            && (self.roots.contains(dir) || find_manifest_in(dir, &self.manifest_names).is_some())
    }
}

/// Walks package directories, feeding source files to a parser.
pub struct FileWalker<'a> {
    parser: &'a dyn SourceParser,
    boundaries: &'a PackageBoundaries,
    ignore_dirs: &'a [String],
}

impl<'a> FileWalker<'a> {
    /// Create a walker.
    pub fn new(
        parser: &'a dyn SourceParser,
        boundaries: &'a PackageBoundaries,
        ignore_dirs: &'a [String],
    ) -> Self {
        FileWalker {
            parser,
            boundaries,
            ignore_dirs,
        }
    }

    /// Source files owned by `pkg`, nested packages excluded.
    pub fn collect_sources(&self, pkg: &Package) -> Result<BTreeSet<PathBuf>, TraversalError> {
        let mut sources = BTreeSet::new();
        self.descend(pkg.root(), pkg, &mut |files| {
            sources.extend(files.iter().cloned());
            Ok(())
        })?;
        Ok(sources)
    }

    /// Walk `pkg`, recording every cross-package or external reference in
    /// its dependency set.
    ///
    /// Files at one directory level are processed in parallel.
    pub fn walk(
        &self,
        pkg: &Package,
        resolver: &SymbolResolver,
    ) -> Result<WalkReport, TraversalError> {
        let mut report = WalkReport::default();

        self.descend(pkg.root(), pkg, &mut |files| {
            let results: Vec<Result<Vec<UnresolvedReference>, TraversalError>> = files
                .par_iter()
                .map(|file| self.visit(pkg, file, resolver))
                .collect();

            for result in results {
                report.unresolved.extend(result?);
            }
            report.files += files.len();
            Ok(())
        })?;

        report.unresolved.sort();
        report.unresolved.dedup();
        for unresolved in &report.unresolved {
            tracing::warn!(
                "{}: unresolved reference `{}` in {}",
                pkg.label(),
                unresolved.name,
                unresolved.file.display()
            );
        }

        self.trace(pkg, WalkState::Done);
        Ok(report)
    }

    /// Recursive descent below `dir`, handing the accepted files of each
    /// level to `level`.
    fn descend(
        &self,
        dir: &Path,
        owner: &Package,
        level: &mut dyn FnMut(&[PathBuf]) -> Result<(), TraversalError>,
    ) -> Result<(), TraversalError> {
        self.trace(owner, WalkState::Entering(dir));

        let read_dir_err = |source| TraversalError::ReadDir {
            path: dir.to_path_buf(),
            source,
        };
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir).map_err(read_dir_err)? {
            let entry = entry.map_err(read_dir_err)?;
            let file_type = entry.file_type().map_err(read_dir_err)?;
            entries.push((entry.path(), file_type));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut files = Vec::new();
        let mut subdirs = Vec::new();
        for (path, file_type) in entries {
            if file_type.is_dir() {
                subdirs.push(path);
            } else if self.parser.accepts(&path) && (file_type.is_file() || path.is_file()) {
                files.push(path);
            }
        }

        for file in &files {
            self.trace(owner, WalkState::VisitingFile(file));
        }
        level(&files)?;

        for sub in subdirs {
            let ignored = sub
                .file_name()
                .is_some_and(|n| self.ignore_dirs.iter().any(|d| n == d.as_str()));
            if ignored {
                continue;
            }
            if self.boundaries.is_boundary(&sub, owner) {
                self.trace(owner, WalkState::SkippingNestedPackage(&sub));
                continue;
            }
            self.descend(&sub, owner, level)?;
        }
        Ok(())
    }

    fn visit(
        &self,
        pkg: &Package,
        file: &Path,
        resolver: &SymbolResolver,
    ) -> Result<Vec<UnresolvedReference>, TraversalError> {
        let text = fs::read_to_string(file).map_err(|source| TraversalError::ReadFile {
            path: file.to_path_buf(),
            source,
        })?;

        let mut unresolved = Vec::new();
        for name in self.parser.references(file, &text, resolver) {
            match resolver.resolve(pkg.label(), file, &name) {
                Resolution::OtherPackage(label) => {
                    pkg.add_dependency(Dependency::Internal(label));
                }
                Resolution::External(coordinate) => {
                    pkg.add_dependency(Dependency::External(coordinate));
                }
                Resolution::Unresolved => unresolved.push(UnresolvedReference {
                    file: file.to_path_buf(),
                    name,
                }),
                Resolution::SameFile | Resolution::SamePackage => {}
            }
        }
        Ok(unresolved)
    }

    fn trace(&self, pkg: &Package, state: WalkState<'_>) {
        tracing::trace!("{}: {:?}", pkg.label(), state);
    }
}
