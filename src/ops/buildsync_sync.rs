//! The sync operation.
//!
//! Discovery, source collection and symbol registration run first and are
//! fatal on failure: every package's result depends on the complete
//! registry. Once the resolver is frozen, packages are walked and their
//! manifests synchronized in parallel, each independently of the others.

use std::path::PathBuf;

use anyhow::{Context, Result};
use miette::Diagnostic as MietteDiagnostic;
use rayon::prelude::*;
use thiserror::Error;

use crate::core::{Label, ManifestError, Package, Workspace};
use crate::ops::synchronize::{ManifestDiff, ManifestSynchronizer};
use crate::ops::walker::{FileWalker, PackageBoundaries, TraversalError, UnresolvedReference};
use crate::parser::{JavaParser, SourceParser};
use crate::resolver::{RegistryBuilder, SymbolResolver};
use crate::sources::{load_sources, SourceIndex};
use crate::util::diagnostic::{suggestions, Diagnostic};
use crate::util::shell::Progress;

/// Options for a sync run.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Report changes without writing
    pub dry_run: bool,
    /// Number of parallel jobs (None = rayon default)
    pub jobs: Option<usize>,
}

/// A failure confined to one package.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum SyncError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Traversal(#[from] TraversalError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Manifest(#[from] ManifestError),
}

impl SyncError {
    /// Convert to a user-friendly diagnostic for `label`.
    pub fn to_diagnostic(&self, label: &Label) -> Diagnostic {
        let diag = Diagnostic::error(format!("failed to sync `{}`", label)).with_context(self.to_string());
        match self {
            SyncError::Manifest(ManifestError::NoTarget { path, .. }) => {
                diag.with_location(path).with_suggestion(suggestions::NO_TARGET)
            }
            SyncError::Manifest(ManifestError::UnsupportedDeps { path, .. }) => {
                diag.with_location(path).with_suggestion(suggestions::UNSUPPORTED_DEPS)
            }
            _ => diag,
        }
    }
}

/// What happened to one package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageStatus {
    /// Manifest already up to date
    Unchanged,
    /// Manifest rewritten
    Updated,
    /// Manifest out of date (dry run)
    WouldUpdate,
    /// Package has no source files; manifest left alone
    Skipped,
    /// Walk or manifest update failed
    Failed,
}

impl PackageStatus {
    /// Stable name used in JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageStatus::Unchanged => "unchanged",
            PackageStatus::Updated => "updated",
            PackageStatus::WouldUpdate => "would-update",
            PackageStatus::Skipped => "skipped",
            PackageStatus::Failed => "failed",
        }
    }
}

/// Per-package result.
#[derive(Debug)]
pub struct PackageReport {
    pub label: Label,
    pub manifest: PathBuf,
    pub status: PackageStatus,
    /// Source files walked
    pub files: usize,
    /// Manifest change (absent for skipped and failed packages)
    pub diff: Option<ManifestDiff>,
    pub unresolved: Vec<UnresolvedReference>,
    pub error: Option<SyncError>,
}

impl PackageReport {
    fn new(pkg: &Package, status: PackageStatus) -> Self {
        PackageReport {
            label: pkg.label().clone(),
            manifest: pkg.manifest_path().to_path_buf(),
            status,
            files: pkg.sources().len(),
            diff: None,
            unresolved: Vec::new(),
            error: None,
        }
    }

    fn failed(pkg: &Package, error: SyncError) -> Self {
        tracing::debug!("{}: {}", pkg.label(), error);
        PackageReport {
            error: Some(error),
            ..PackageReport::new(pkg, PackageStatus::Failed)
        }
    }
}

/// Result of a sync run, packages in label order.
#[derive(Debug)]
pub struct SyncReport {
    pub packages: Vec<PackageReport>,
    /// Symbols declared across the workspace
    pub symbols: usize,
    pub dry_run: bool,
}

impl SyncReport {
    /// Packages whose walk or manifest update failed.
    pub fn failures(&self) -> impl Iterator<Item = &PackageReport> {
        self.packages
            .iter()
            .filter(|p| p.status == PackageStatus::Failed)
    }

    /// Packages whose manifest changed (or would change).
    pub fn changed(&self) -> impl Iterator<Item = &PackageReport> {
        self.packages
            .iter()
            .filter(|p| matches!(p.status, PackageStatus::Updated | PackageStatus::WouldUpdate))
    }

    /// Whether any package failed.
    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    /// Total unresolved references.
    pub fn unresolved_count(&self) -> usize {
        self.packages.iter().map(|p| p.unresolved.len()).sum()
    }
}

/// Discovered packages with their sources, and the frozen resolver.
pub struct Analysis {
    pub packages: Vec<Package>,
    pub resolver: SymbolResolver,
    pub boundaries: PackageBoundaries,
    pub parser: JavaParser,
}

impl Analysis {
    /// A walker over this analysis' packages.
    pub fn walker<'a>(&'a self, ws: &'a Workspace) -> FileWalker<'a> {
        FileWalker::new(&self.parser, &self.boundaries, ws.ignore_dirs())
    }
}

/// Discover packages, collect their sources and build the frozen resolver.
pub fn analyze(ws: &Workspace) -> Result<Analysis> {
    let mut packages = SourceIndex::new(ws).discover_all()?;
    let boundaries = PackageBoundaries::new(&packages, ws.manifest_names());
    let parser = JavaParser::new(ws.platform_prefixes().to_vec());

    {
        let walker = FileWalker::new(&parser, &boundaries, ws.ignore_dirs());
        let results: Vec<Result<()>> = packages
            .par_iter_mut()
            .map(|pkg| -> Result<()> {
                let sources = walker
                    .collect_sources(pkg)
                    .with_context(|| format!("failed to collect sources of `{}`", pkg.label()))?;
                pkg.set_sources(sources);
                Ok(())
            })
            .collect();
        for result in results {
            result?;
        }
    }

    // Parse in parallel, register sequentially so conflicts are reported
    // in a stable order.
    let declared: Vec<Result<Vec<(PathBuf, Vec<String>)>>> = packages
        .par_iter()
        .map(|pkg| {
            pkg.sources()
                .iter()
                .map(|file| -> Result<(PathBuf, Vec<String>)> {
                    let text = std::fs::read_to_string(file).map_err(|source| {
                        TraversalError::ReadFile {
                            path: file.clone(),
                            source,
                        }
                    })?;
                    Ok((file.clone(), parser.declarations(file, &text)))
                })
                .collect()
        })
        .collect();

    let mut builder = RegistryBuilder::new();
    for (pkg, files) in packages.iter().zip(declared) {
        for (file, symbols) in files? {
            for symbol in symbols {
                builder.register(&symbol, pkg.label(), &file)?;
            }
        }
    }
    tracing::info!("registered {} symbols", builder.len());

    for source in load_sources(ws)? {
        builder.add_source(source);
    }

    Ok(Analysis {
        packages,
        resolver: builder.freeze(),
        boundaries,
        parser,
    })
}

/// Set the global rayon thread count. Only the first call has an effect.
pub fn configure_jobs(jobs: Option<usize>) {
    if let Some(jobs) = jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .ok(); // Ignore if already set
    }
}

/// Synchronize every package's manifest with its computed dependencies.
///
/// Fails as a whole only on discovery, registry or configuration errors.
/// Package-level failures are recorded in the report.
pub fn sync_workspace(ws: &Workspace, opts: &SyncOptions, progress: &Progress) -> Result<SyncReport> {
    configure_jobs(opts.jobs.or(ws.jobs()));
    let analysis = analyze(ws)?;
    Ok(sync_packages(ws, &analysis, opts.dry_run, progress))
}

/// Walk and synchronize the packages of a finished analysis.
pub fn sync_packages(
    ws: &Workspace,
    analysis: &Analysis,
    dry_run: bool,
    progress: &Progress,
) -> SyncReport {
    let walker = analysis.walker(ws);
    let synchronizer = ManifestSynchronizer::new(ws.target_kinds());

    let packages: Vec<PackageReport> = analysis
        .packages
        .par_iter()
        .map(|pkg| {
            let report = sync_package(pkg, &walker, &analysis.resolver, &synchronizer, dry_run);
            progress.inc(1);
            report
        })
        .collect();
    progress.finish();

    SyncReport {
        packages,
        symbols: analysis.resolver.len(),
        dry_run,
    }
}

fn sync_package(
    pkg: &Package,
    walker: &FileWalker<'_>,
    resolver: &SymbolResolver,
    synchronizer: &ManifestSynchronizer<'_>,
    dry_run: bool,
) -> PackageReport {
    if pkg.sources().is_empty() {
        tracing::debug!("{}: no source files, skipping", pkg.label());
        return PackageReport::new(pkg, PackageStatus::Skipped);
    }

    let walked = match walker.walk(pkg, resolver) {
        Ok(walked) => walked,
        Err(e) => return PackageReport::failed(pkg, e.into()),
    };

    let outcome = match synchronizer.apply(pkg, dry_run) {
        Ok(outcome) => outcome,
        Err(e) => {
            return PackageReport {
                unresolved: walked.unresolved,
                ..PackageReport::failed(pkg, e.into())
            }
        }
    };

    let status = if outcome.diff.is_empty() {
        PackageStatus::Unchanged
    } else if outcome.written {
        PackageStatus::Updated
    } else {
        PackageStatus::WouldUpdate
    };

    PackageReport {
        files: walked.files,
        diff: Some(outcome.diff),
        unresolved: walked.unresolved,
        ..PackageReport::new(pkg, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolutionConflict;
    use crate::test_support::{java, rule, WorkspaceFixture};

    fn options(dry_run: bool) -> SyncOptions {
        SyncOptions {
            dry_run,
            jobs: None,
        }
    }

    fn workspace() -> WorkspaceFixture {
        WorkspaceFixture::new()
            .package("src/a", "java_library")
            .package("src/b", "java_library")
            .file(
                "src/a/Foo.java",
                java("com.acme.a", &["com.acme.b.Bar"], "public class Foo { Bar bar; }"),
            )
            .file("src/b/Bar.java", java("com.acme.b", &[], "public class Bar {}"))
    }

    fn status(report: &SyncReport, label: &str) -> PackageStatus {
        report
            .packages
            .iter()
            .find(|p| p.label.as_str() == label)
            .unwrap()
            .status
    }

    #[test]
    fn test_sync_adds_cross_package_dependency() {
        let ws = workspace().build();
        let report = sync_workspace(&ws.workspace(), &options(false), &Progress::hidden()).unwrap();

        assert_eq!(status(&report, "//src/a"), PackageStatus::Updated);
        assert_eq!(status(&report, "//src/b"), PackageStatus::Unchanged);
        assert_eq!(ws.read("src/a/BUILD.bazel"), rule("java_library", "a", &["//src/b"]));
        assert_eq!(report.symbols, 2);
    }

    #[test]
    fn test_sync_twice_is_noop() {
        let ws = workspace().build();
        sync_workspace(&ws.workspace(), &options(false), &Progress::hidden()).unwrap();
        let first = ws.read("src/a/BUILD.bazel");

        let report = sync_workspace(&ws.workspace(), &options(false), &Progress::hidden()).unwrap();
        assert_eq!(report.changed().count(), 0);
        assert_eq!(ws.read("src/a/BUILD.bazel"), first);
    }

    #[test]
    fn test_dry_run_reports_without_writing() {
        let ws = workspace().build();
        let before = ws.read("src/a/BUILD.bazel");

        let report = sync_workspace(&ws.workspace(), &options(true), &Progress::hidden()).unwrap();
        let a = report.packages.iter().find(|p| p.label.as_str() == "//src/a").unwrap();
        assert_eq!(a.status, PackageStatus::WouldUpdate);
        assert_eq!(a.diff.as_ref().unwrap().added, vec!["//src/b"]);
        assert_eq!(ws.read("src/a/BUILD.bazel"), before);
    }

    #[test]
    fn test_conflict_is_fatal() {
        let ws = workspace()
            .file("src/a/Bar.java", java("com.acme.b", &[], "class Bar {}"))
            .build();

        let err = sync_workspace(&ws.workspace(), &options(false), &Progress::hidden())
            .err()
            .unwrap();
        let conflict = err.downcast_ref::<ResolutionConflict>().unwrap();
        assert_eq!(conflict.first.as_str(), "//src/a");
        assert_eq!(conflict.second.as_str(), "//src/b");
    }

    #[test]
    fn test_package_failure_does_not_stop_others() {
        let ws = workspace()
            .package("src/c", "java_library")
            .file("src/c/BUILD.bazel", "filegroup(name = \"c\")\n")
            .file(
                "src/c/Baz.java",
                java("com.acme.c", &["com.acme.b.Bar"], "class Baz {}"),
            )
            .build();

        let report = sync_workspace(&ws.workspace(), &options(false), &Progress::hidden()).unwrap();
        assert!(report.has_failures());
        let failed = report.failures().next().unwrap();
        let error = failed.error.as_ref().unwrap();
        assert!(matches!(error, SyncError::Manifest(ManifestError::NoTarget { .. })));
        let diag = error.to_diagnostic(&failed.label).format(false);
        assert!(diag.starts_with("error: failed to sync `//src/c`"));
        assert!(diag.contains(suggestions::NO_TARGET));
        assert_eq!(status(&report, "//src/a"), PackageStatus::Updated);
    }

    #[test]
    fn test_package_without_sources_skipped() {
        let ws = workspace()
            .file("src/empty/BUILD.bazel", rule("java_library", "empty", &["//src/b"]))
            .build();

        let report = sync_workspace(&ws.workspace(), &options(false), &Progress::hidden()).unwrap();
        assert_eq!(status(&report, "//src/empty"), PackageStatus::Skipped);
        assert_eq!(
            ws.read("src/empty/BUILD.bazel"),
            rule("java_library", "empty", &["//src/b"])
        );
    }

    #[test]
    fn test_unresolved_references_do_not_fail() {
        let ws = workspace()
            .file(
                "src/b/Gone.java",
                java("com.acme.b", &["org.missing.Thing"], "class Gone {}"),
            )
            .build();

        let report = sync_workspace(&ws.workspace(), &options(false), &Progress::hidden()).unwrap();
        assert!(!report.has_failures());
        assert_eq!(report.unresolved_count(), 1);
    }

    #[test]
    fn test_unknown_packages_surface_as_unresolved() {
        let ws = workspace()
            .file(
                "src/b/Odd.java",
                java(
                    "com.acme.b",
                    &["org.unknown.*"],
                    "class Odd { Thing t; Object o = com.unknown.Other.make(); }",
                ),
            )
            .build();

        let report = sync_workspace(&ws.workspace(), &options(true), &Progress::hidden()).unwrap();
        let b = report.packages.iter().find(|p| p.label.as_str() == "//src/b").unwrap();
        let names: Vec<&str> = b.unresolved.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["com.unknown.Other", "org.unknown.*"]);
        assert_eq!(report.unresolved_count(), 2);
    }
}
