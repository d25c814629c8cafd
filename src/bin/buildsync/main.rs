//! buildsync CLI - keeps BUILD dependency lists in sync with Java sources

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use buildsync::core::{SourceRoot, Workspace};
use buildsync::util::{GlobalContext, Shell};
use cli::{Cli, Commands, MessageFormat};

/// Options shared by every command.
pub struct GlobalOptions {
    pub shell: Arc<Shell>,
    /// `--workspace`, if given
    pub workspace: Option<PathBuf>,
    /// `--config`, if given
    pub config: Option<PathBuf>,
}

impl GlobalOptions {
    /// Open the workspace, applying `--root` overrides.
    pub fn workspace(&self, roots: &[String]) -> Result<Workspace> {
        let mut ctx = GlobalContext::new()?;
        if let Some(config) = &self.config {
            ctx = ctx.with_global_config(Some(config.clone()));
        }

        let roots = roots
            .iter()
            .map(|r| SourceRoot::parse(r))
            .collect::<Result<Vec<_>>>()?;

        Ok(ctx.workspace(self.workspace.as_deref())?.with_source_roots(roots))
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging; RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("buildsync=debug")
        } else if cli.quiet {
            EnvFilter::new("buildsync=error")
        } else {
            EnvFilter::new("buildsync=info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let global = GlobalOptions {
        shell: Arc::new(Shell::from_flags(
            cli.quiet,
            cli.verbose,
            cli.color,
            cli.message_format == MessageFormat::Json,
        )),
        workspace: cli.workspace,
        config: cli.config,
    };

    // Execute command
    match cli.command {
        Commands::Sync(args) => commands::sync::execute(args, &global),
        Commands::Check(args) => commands::check::execute(args, &global),
        Commands::Packages(args) => commands::packages::execute(args, &global),
        Commands::Imports(args) => commands::imports::execute(args, &global),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
