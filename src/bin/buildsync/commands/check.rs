//! `buildsync check` command
//!
//! A dry-run sync that fails when any manifest is out of date.

use anyhow::{bail, Result};

use crate::cli::CheckArgs;
use crate::commands::sync;
use crate::GlobalOptions;
use buildsync::util::diagnostic::suggestions;

pub fn execute(args: CheckArgs, global: &GlobalOptions) -> Result<()> {
    let ws = global.workspace(&args.root)?.with_jobs(args.jobs);

    let report = sync::run(&ws, true, global)?;

    let failed = report.failures().count();
    if failed > 0 {
        bail!("{} of {} packages failed to check", failed, report.packages.len());
    }

    let stale = report.changed().count();
    if stale > 0 {
        if !global.shell.is_json() {
            global.shell.note(suggestions::STALE);
        }
        bail!("{} manifests are out of date", stale);
    }

    Ok(())
}
