//! `buildsync imports` command
//!
//! Prints the fully-qualified types used by a directory's source files as a
//! JSON array on stdout.

use anyhow::{Context, Result};

use crate::cli::ImportsArgs;
use crate::GlobalOptions;
use buildsync::ops::buildsync_imports::used_types;

pub fn execute(args: ImportsArgs, global: &GlobalOptions) -> Result<()> {
    let ws = global.workspace(&[])?;
    let dir = std::env::current_dir()
        .context("failed to get current directory")?
        .join(&args.dir);

    let types = used_types(&ws, &dir, &args.files)?;

    println!("{}", serde_json::to_string(&types)?);
    Ok(())
}
