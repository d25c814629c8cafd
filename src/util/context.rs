//! Global context for buildsync operations.
//!
//! Provides centralized access to configuration, paths, and environment.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::core::workspace::find_workspace_root;
use crate::core::Workspace;
use crate::util::config::{global_config_path, load_config, project_config_path, Config};
use crate::util::diagnostic::suggestions;

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Global configuration file, if the platform has a config directory
    global_config: Option<PathBuf>,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(GlobalContext {
            cwd,
            global_config: global_config_path(),
        })
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    /// Use a specific global config file (or none).
    pub fn with_global_config(mut self, path: Option<PathBuf>) -> Self {
        self.global_config = path;
        self
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the global configuration file path.
    pub fn global_config(&self) -> Option<&Path> {
        self.global_config.as_deref()
    }

    /// Find the workspace root, searching upward from cwd.
    pub fn find_workspace_root(&self) -> Result<PathBuf> {
        find_workspace_root(&self.cwd).ok_or_else(|| {
            anyhow!(
                "could not find a workspace marker in `{}` or any parent directory\n{}",
                self.cwd.display(),
                suggestions::NO_WORKSPACE
            )
        })
    }

    /// Load merged configuration for a workspace root.
    pub fn load_config(&self, root: &Path) -> Result<Config> {
        load_config(self.global_config(), &project_config_path(root))
    }

    /// Open the workspace at `explicit`, or the one enclosing cwd.
    ///
    /// An explicit directory does not need a workspace marker.
    pub fn workspace(&self, explicit: Option<&Path>) -> Result<Workspace> {
        let root = match explicit {
            Some(dir) => self.cwd.join(dir),
            None => self.find_workspace_root()?,
        };
        let config = self.load_config(&root)?;
        Workspace::new(&root, &config)
    }
}
