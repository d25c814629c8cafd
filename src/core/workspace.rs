//! Workspace - central configuration hub.
//!
//! A Workspace is the tree being synchronized: its root directory plus the
//! settings that control discovery, resolution and manifest rewriting.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::manifest::{MANIFEST_ALIAS, MANIFEST_NAME};
use crate::util::config::{Config, ExternalConfig};

/// Files that mark the root of a Bazel workspace.
pub const WORKSPACE_MARKERS: &[&str] = &["MODULE.bazel", "WORKSPACE.bazel", "WORKSPACE"];

/// A named source root, e.g. `main = "src/main/java"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRoot {
    /// Root kind (`main`, `test`, `generated`, ...)
    pub name: String,
    /// Directory pattern relative to the workspace root
    pub pattern: String,
}

impl SourceRoot {
    /// Create a source root.
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        SourceRoot {
            name: name.into(),
            pattern: pattern.into(),
        }
    }

    /// Parse a `NAME=PATTERN` command-line value.
    pub fn parse(spec: &str) -> Result<Self> {
        let Some((name, pattern)) = spec.split_once('=') else {
            bail!("invalid source root `{}`, expected NAME=PATTERN", spec);
        };
        let (name, pattern) = (name.trim(), pattern.trim());
        if name.is_empty() || pattern.is_empty() {
            bail!("invalid source root `{}`, expected NAME=PATTERN", spec);
        }
        Ok(SourceRoot::new(name, pattern))
    }
}

/// The workspace being synchronized.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Canonical workspace root
    root: PathBuf,

    /// Source roots, in configuration order
    source_roots: Vec<SourceRoot>,

    /// Manifest file names, most preferred first
    manifest_names: Vec<String>,

    /// Directory names never scanned
    ignore_dirs: Vec<String>,

    /// Name prefixes belonging to the platform (never dependencies)
    platform_prefixes: Vec<String>,

    /// Rule kinds whose `deps` are synchronized
    target_kinds: Vec<String>,

    /// External symbol sources
    external: Vec<ExternalConfig>,

    /// Parallel jobs (None = rayon default)
    jobs: Option<usize>,
}

impl Workspace {
    /// Create a workspace rooted at `root` using `config`.
    pub fn new(root: &Path, config: &Config) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("workspace root does not exist: {}", root.display()))?;

        Ok(Workspace {
            root,
            source_roots: config.source_roots(),
            manifest_names: config.manifest_names(),
            ignore_dirs: config.ignore_dirs(),
            platform_prefixes: config.platform_prefixes(),
            target_kinds: config.target_kinds(),
            external: config.external.clone(),
            jobs: config.sync.jobs,
        })
    }

    /// Replace the configured source roots.
    pub fn with_source_roots(mut self, roots: Vec<SourceRoot>) -> Self {
        if !roots.is_empty() {
            self.source_roots = roots;
        }
        self
    }

    /// Set the number of parallel jobs.
    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        if jobs.is_some() {
            self.jobs = jobs;
        }
        self
    }

    /// Get the workspace root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the source roots.
    pub fn source_roots(&self) -> &[SourceRoot] {
        &self.source_roots
    }

    /// Get the manifest file names.
    pub fn manifest_names(&self) -> &[String] {
        &self.manifest_names
    }

    /// Get the ignored directory names.
    pub fn ignore_dirs(&self) -> &[String] {
        &self.ignore_dirs
    }

    /// Get the platform name prefixes.
    pub fn platform_prefixes(&self) -> &[String] {
        &self.platform_prefixes
    }

    /// Get the synchronized rule kinds.
    pub fn target_kinds(&self) -> &[String] {
        &self.target_kinds
    }

    /// Get the external source configuration.
    pub fn external(&self) -> &[ExternalConfig] {
        &self.external
    }

    /// Get the configured job count.
    pub fn jobs(&self) -> Option<usize> {
        self.jobs
    }
}

/// Default manifest names, canonical first.
pub fn default_manifest_names() -> Vec<String> {
    vec![MANIFEST_NAME.to_string(), MANIFEST_ALIAS.to_string()]
}

/// Search `start` and its ancestors for a workspace marker file.
pub fn find_workspace_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| WORKSPACE_MARKERS.iter().any(|m| dir.join(m).is_file()))
        .map(Path::to_path_buf)
}
