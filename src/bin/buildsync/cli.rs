//! CLI definitions using clap.

use std::path::PathBuf;

use buildsync::util::shell::ColorChoice;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// buildsync - Keeps Bazel BUILD dependency lists in sync with Java sources
#[derive(Parser)]
#[command(name = "buildsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    pub color: ColorChoice,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,

    /// Workspace root (defaults to the enclosing Bazel workspace)
    #[arg(long, global = true, env = "BUILDSYNC_WORKSPACE", value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Global config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "BUILDSYNC_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rewrite every package's deps to match its sources
    Sync(SyncArgs),

    /// Check that every manifest is up to date (no writes)
    Check(CheckArgs),

    /// List discovered packages
    Packages(PackagesArgs),

    /// Print the types used by source files as JSON
    Imports(ImportsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct SyncArgs {
    /// Report changes without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Source root as NAME=PATTERN (replaces the configured roots)
    #[arg(long, value_name = "NAME=PATTERN")]
    pub root: Vec<String>,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Source root as NAME=PATTERN (replaces the configured roots)
    #[arg(long, value_name = "NAME=PATTERN")]
    pub root: Vec<String>,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args)]
pub struct PackagesArgs {
    /// Source root as NAME=PATTERN (replaces the configured roots)
    #[arg(long, value_name = "NAME=PATTERN")]
    pub root: Vec<String>,
}

#[derive(Args)]
pub struct ImportsArgs {
    /// Directory holding the source files
    pub dir: PathBuf,

    /// Files relative to DIR (defaults to every source file below it)
    pub files: Vec<PathBuf>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
