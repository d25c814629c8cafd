//! Manifest synchronization.
//!
//! Brings the dependency list of a package's target in line with the
//! package's computed dependency set. Only the `deps` region is touched,
//! and an up-to-date manifest is never rewritten.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::dependency::canonical_cmp;
use crate::core::manifest::{canonical_entries, render_deps, DepsEntry, DepsRegion, Rule};
use crate::core::{Label, Manifest, ManifestError, Package};
use crate::util::fs::{display_relative, write_atomic};

/// Difference between a manifest and the computed dependency set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestDiff {
    pub label: Label,
    pub path: PathBuf,
    /// Entries the rewrite adds, in canonical order
    pub added: Vec<String>,
    /// Entries the rewrite removes, in canonical order
    pub removed: Vec<String>,
    /// Same entries, but order or layout changes
    pub reformatted: bool,
}

impl ManifestDiff {
    /// Whether applying would leave the manifest byte-identical.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && !self.reformatted
    }

    /// Human-readable report, paths relative to `root`.
    pub fn render(&self, root: &Path) -> String {
        let mut out = format!("{} ({})\n", self.label, display_relative(root, &self.path));
        for entry in &self.added {
            out.push_str(&format!("  + {}\n", entry));
        }
        for entry in &self.removed {
            out.push_str(&format!("  - {}\n", entry));
        }
        if self.reformatted && self.added.is_empty() && self.removed.is_empty() {
            out.push_str("  ~ dependency list reordered\n");
        }
        out
    }
}

/// Outcome of `ManifestSynchronizer::apply`.
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    pub diff: ManifestDiff,
    /// Full manifest text after synchronization
    pub text: String,
    /// Whether the file on disk was replaced
    pub written: bool,
}

/// Everything needed to rewrite one manifest.
struct Plan {
    manifest: Manifest,
    rule: Rule,
    region: Option<DepsRegion>,
    entries: Vec<DepsEntry>,
}

impl Plan {
    fn text(&self) -> String {
        self.manifest
            .with_deps(&self.rule, self.region.as_ref(), &self.entries)
    }

    fn indent(&self) -> &str {
        self.region
            .as_ref()
            .map_or(self.rule.indent.as_str(), |r| r.indent.as_str())
    }
}

/// Rewrites package manifests.
#[derive(Debug, Clone)]
pub struct ManifestSynchronizer<'a> {
    target_kinds: &'a [String],
}

impl<'a> ManifestSynchronizer<'a> {
    /// Create a synchronizer for rules of `target_kinds`.
    pub fn new(target_kinds: &'a [String]) -> Self {
        ManifestSynchronizer { target_kinds }
    }

    /// The canonical `deps` attribute for `pkg`.
    pub fn compute(&self, pkg: &Package) -> Result<String, ManifestError> {
        let plan = self.plan(pkg)?;
        Ok(render_deps(plan.indent(), &plan.entries))
    }

    /// Compare the computed list against the manifest. Nothing is written.
    pub fn diff(&self, pkg: &Package) -> Result<ManifestDiff, ManifestError> {
        let plan = self.plan(pkg)?;
        let text = plan.text();
        Ok(Self::diff_of(pkg, &plan, &text))
    }

    /// Synchronize `pkg`'s manifest.
    ///
    /// With `dry_run` the would-be text is returned and the file is left
    /// alone. Otherwise the file is replaced atomically, and only if its
    /// contents change.
    pub fn apply(&self, pkg: &Package, dry_run: bool) -> Result<ApplyOutcome, ManifestError> {
        let plan = self.plan(pkg)?;
        let text = plan.text();
        let diff = Self::diff_of(pkg, &plan, &text);

        let changed = text != plan.manifest.content();
        let written = changed && !dry_run;
        if written {
            write_atomic(pkg.manifest_path(), &text).map_err(|source| ManifestError::Write {
                path: pkg.manifest_path().to_path_buf(),
                source,
            })?;
            tracing::debug!("{}: wrote {}", pkg.label(), pkg.manifest_path().display());
        }

        Ok(ApplyOutcome {
            diff,
            text,
            written,
        })
    }

    fn plan(&self, pkg: &Package) -> Result<Plan, ManifestError> {
        let manifest = Manifest::load(pkg.manifest_path())?;
        let rule = manifest.find_target(pkg.label(), self.target_kinds)?;
        let region = manifest.deps_region(&rule)?;

        let computed = pkg.dependencies();
        let existing = region.as_ref().map_or(&[][..], |r| r.entries.as_slice());
        let entries = canonical_entries(computed.iter().map(|d| d.as_str()), existing);

        Ok(Plan {
            manifest,
            rule,
            region,
            entries,
        })
    }

    fn diff_of(pkg: &Package, plan: &Plan, text: &str) -> ManifestDiff {
        let before: BTreeSet<&str> = plan
            .region
            .iter()
            .flat_map(|r| r.entries.iter().map(|e| e.value.as_str()))
            .collect();
        let after: BTreeSet<&str> = plan.entries.iter().map(|e| e.value.as_str()).collect();

        let added: Vec<String> = plan
            .entries
            .iter()
            .filter(|e| !before.contains(e.value.as_str()))
            .map(|e| e.value.clone())
            .collect();
        let mut removed: Vec<String> = before
            .iter()
            .filter(|v| !after.contains(*v))
            .map(|v| v.to_string())
            .collect();
        removed.sort_by(|a, b| canonical_cmp(a, b));

        ManifestDiff {
            label: pkg.label().clone(),
            path: pkg.manifest_path().to_path_buf(),
            reformatted: added.is_empty() && removed.is_empty() && text != plan.manifest.content(),
            added,
            removed,
        }
    }
}
