//! Report the types a set of source files uses.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use walkdir::WalkDir;

use crate::core::Workspace;
use crate::ops::buildsync_sync::analyze;
use crate::parser::SourceParser;
use crate::util::fs::{normalize_path, read_to_string};

/// Fully-qualified types referenced by `files` (relative to `dir`), or by
/// every source file below `dir` when `files` is empty.
///
/// Types declared in the referencing file itself are left out. Names are
/// qualified against the whole workspace, so the workspace must be free of
/// declaration conflicts.
pub fn used_types(ws: &Workspace, dir: &Path, files: &[PathBuf]) -> Result<Vec<String>> {
    let dir = normalize_path(dir);
    if !dir.is_dir() {
        bail!("`{}` is not a directory", dir.display());
    }

    let analysis = analyze(ws)?;
    let files = if files.is_empty() {
        source_files(&dir, &analysis.parser, ws.ignore_dirs())?
    } else {
        files.iter().map(|f| normalize_path(&dir.join(f))).collect()
    };

    let mut used = BTreeSet::new();
    for file in &files {
        let text = read_to_string(file)?;
        let references = analysis
            .parser
            .references(file, &text, &analysis.resolver);
        used.extend(references.into_iter().filter(|name| {
            analysis
                .resolver
                .owner(name)
                .map_or(true, |owner| owner.file != *file)
        }));
    }

    tracing::debug!("{} types used by {} files", used.len(), files.len());
    Ok(used.into_iter().collect())
}

fn source_files(dir: &Path, parser: &dyn SourceParser, ignore_dirs: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || !ignore_dirs.iter().any(|d| e.file_name() == d.as_str())
        });
    for entry in walker {
        let entry = entry.with_context(|| format!("failed to scan {}", dir.display()))?;
        if entry.file_type().is_file() && parser.accepts(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
