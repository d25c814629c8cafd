//! `buildsync sync` command

use anyhow::{bail, Result};
use serde_json::json;

use crate::cli::SyncArgs;
use crate::GlobalOptions;
use buildsync::core::Workspace;
use buildsync::ops::buildsync_sync::{
    analyze, configure_jobs, sync_packages, PackageReport, PackageStatus, SyncReport,
};
use buildsync::resolver::ResolutionConflict;
use buildsync::util::diagnostic::{emit, suggestions};
use buildsync::util::Status;

pub fn execute(args: SyncArgs, global: &GlobalOptions) -> Result<()> {
    let ws = global.workspace(&args.root)?.with_jobs(args.jobs);

    let report = run(&ws, args.dry_run, global)?;

    let failed = report.failures().count();
    if failed > 0 {
        bail!("{} of {} packages failed to sync", failed, report.packages.len());
    }
    Ok(())
}

/// Analyze and synchronize `ws`, printing per-package results.
pub fn run(ws: &Workspace, dry_run: bool, global: &GlobalOptions) -> Result<SyncReport> {
    let shell = &global.shell;
    configure_jobs(ws.jobs());

    shell.status(Status::Scanning, ws.root().display());
    let analysis = match analyze(ws) {
        Ok(analysis) => analysis,
        Err(e) => {
            if let Some(conflict) = e.downcast_ref::<ResolutionConflict>() {
                if shell.is_json() {
                    shell.error(conflict);
                } else {
                    emit(&conflict.to_diagnostic(), shell.use_color());
                }
                bail!("could not build the symbol registry");
            }
            return Err(e);
        }
    };

    if analysis.packages.is_empty() {
        shell.warn("no packages found");
        shell.note(suggestions::NO_PACKAGES);
    }
    shell.status(
        Status::Resolving,
        format!(
            "{} symbols in {} packages",
            analysis.resolver.len(),
            analysis.packages.len()
        ),
    );

    shell.status(
        Status::Syncing,
        if dry_run {
            "manifests (dry run)"
        } else {
            "manifests"
        },
    );
    let progress = shell.progress(analysis.packages.len() as u64, "Syncing");
    let report = sync_packages(ws, &analysis, dry_run, &progress);

    for pkg in &report.packages {
        print_package(ws, pkg, global);
    }
    print_summary(&report, global);

    Ok(report)
}

fn print_package(ws: &Workspace, pkg: &PackageReport, global: &GlobalOptions) {
    let shell = &global.shell;

    if shell.is_json() {
        let (added, removed) = pkg
            .diff
            .as_ref()
            .map_or((&[][..], &[][..]), |d| (d.added.as_slice(), d.removed.as_slice()));
        shell.json_event(&json!({
            "reason": "package",
            "label": pkg.label,
            "manifest": pkg.manifest,
            "status": pkg.status.as_str(),
            "files": pkg.files,
            "added": added,
            "removed": removed,
            "unresolved": pkg.unresolved,
            "error": pkg.error.as_ref().map(|e| e.to_string()),
        }));
        return;
    }

    match pkg.status {
        PackageStatus::Updated => {
            if let Some(diff) = &pkg.diff {
                shell.status(
                    Status::Updated,
                    format!("{} (+{} -{})", pkg.label, diff.added.len(), diff.removed.len()),
                );
            }
        }
        PackageStatus::WouldUpdate => {
            shell.status(Status::WouldUpdate, &pkg.label);
            if let Some(diff) = &pkg.diff {
                print!("{}", diff.render(ws.root()));
            }
        }
        PackageStatus::Unchanged => shell.verbose_status(Status::Unchanged, &pkg.label),
        PackageStatus::Skipped => {
            shell.verbose_status(Status::Skipped, format!("{} (no source files)", pkg.label))
        }
        PackageStatus::Failed => {
            if let Some(error) = &pkg.error {
                emit(&error.to_diagnostic(&pkg.label), shell.use_color());
            }
        }
    }
}

fn print_summary(report: &SyncReport, global: &GlobalOptions) {
    let shell = &global.shell;
    let changed = report.changed().count();
    let failed = report.failures().count();
    let unresolved = report.unresolved_count();

    if shell.is_json() {
        shell.json_event(&json!({
            "reason": "sync-finished",
            "packages": report.packages.len(),
            "changed": changed,
            "failed": failed,
            "unresolved": unresolved,
            "dry_run": report.dry_run,
        }));
        return;
    }

    if unresolved > 0 {
        shell.status(
            Status::Unresolved,
            format!("{} references could not be resolved", unresolved),
        );
    }

    let verb = if report.dry_run { "out of date" } else { "updated" };
    let status = if failed > 0 {
        Status::Failed
    } else {
        Status::Finished
    };
    shell.status(
        status,
        format!(
            "{} packages, {} {}, {} failed",
            report.packages.len(),
            changed,
            verb,
            failed
        ),
    );
}
