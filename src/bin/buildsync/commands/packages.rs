//! `buildsync packages` command

use anyhow::Result;
use serde_json::json;

use crate::cli::PackagesArgs;
use crate::GlobalOptions;
use buildsync::sources::SourceIndex;
use buildsync::util::diagnostic::suggestions;
use buildsync::util::fs::display_relative;

pub fn execute(args: PackagesArgs, global: &GlobalOptions) -> Result<()> {
    let shell = &global.shell;
    let ws = global.workspace(&args.root)?;

    let packages = SourceIndex::new(&ws).discover_all()?;

    if shell.is_json() {
        for pkg in &packages {
            shell.json_event(&json!({
                "reason": "package",
                "label": pkg.label(),
                "root": pkg.root_kind(),
                "manifest": display_relative(ws.root(), pkg.manifest_path()),
            }));
        }
        return Ok(());
    }

    if packages.is_empty() {
        shell.warn("no packages found");
        shell.note(suggestions::NO_PACKAGES);
        return Ok(());
    }

    for pkg in &packages {
        println!(
            "{} [{}] {}",
            pkg.label(),
            pkg.root_kind(),
            display_relative(ws.root(), pkg.manifest_path())
        );
    }

    Ok(())
}
