//! Configuration file support for buildsync.
//!
//! buildsync supports two configuration file locations:
//! - Global: `<config dir>/buildsync/config.toml` - User-wide defaults
//! - Project: `.buildsync/config.toml` - Workspace-specific overrides
//!
//! Project config takes precedence over global config; command-line flags
//! take precedence over both.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::core::workspace::{default_manifest_names, SourceRoot};
use crate::util::fs::read_to_string;

/// buildsync configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Discovery settings
    pub workspace: WorkspaceSettings,

    /// Named source roots (name -> root-relative directory pattern)
    pub roots: BTreeMap<String, String>,

    /// Symbol resolution settings
    pub resolve: ResolveConfig,

    /// Manifest synchronization settings
    pub sync: SyncConfig,

    /// External symbol sources, queried in order
    pub external: Vec<ExternalConfig>,
}

/// Discovery settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceSettings {
    /// Manifest file names, most preferred first
    pub manifest_names: Option<Vec<String>>,

    /// Directory names that are never scanned
    pub ignore_dirs: Option<Vec<String>>,
}

/// Symbol resolution settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Name prefixes provided by the platform (e.g. `java.`); references
    /// to these never become dependencies
    pub platform_prefixes: Option<Vec<String>>,
}

/// Manifest synchronization settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Rule kinds whose `deps` attribute is synchronized
    pub target_kinds: Option<Vec<String>>,

    /// Default number of parallel jobs (None = auto-detect)
    pub jobs: Option<usize>,
}

/// Kind of an external symbol source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalKind {
    /// A directory of `.class` or `.java` files
    Directory,
    /// A `.tar.gz` archive of `.class` files
    Archive,
    /// A table of package prefixes
    Catalog,
}

/// One `[[external]]` entry.
///
/// ```toml
/// [[external]]
/// name = "guava"
/// kind = "archive"
/// path = "third_party/guava-classes.tar.gz"
/// coordinate = "@maven//:com_google_guava_guava"
///
/// [[external]]
/// name = "maven"
/// kind = "catalog"
/// [external.packages]
/// "org.junit.jupiter.api" = "@maven//:org_junit_jupiter_junit_jupiter_api"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalConfig {
    /// Display name
    pub name: String,

    /// Source kind
    pub kind: ExternalKind,

    /// Directory or archive path, relative to the workspace root
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Coordinate every symbol of a directory/archive source maps to
    #[serde(default)]
    pub coordinate: Option<String>,

    /// Package prefix -> coordinate, for catalog sources
    #[serde(default)]
    pub packages: BTreeMap<String, String>,
}

fn default_roots() -> Vec<SourceRoot> {
    vec![
        SourceRoot::new("main", "src/main/java"),
        SourceRoot::new("test", "src/test/java"),
    ]
}

fn default_ignore_dirs() -> Vec<String> {
    [".git", ".buildsync", "bazel-out", "node_modules", "target"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_platform_prefixes() -> Vec<String> {
    ["java.", "javax.", "jdk.", "sun."]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_target_kinds() -> Vec<String> {
    [
        "java_library",
        "java_binary",
        "java_test",
        "java_junit5_test",
        "java_test_suite",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = read_to_string(path)?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.workspace.manifest_names.is_some() {
            self.workspace.manifest_names = other.workspace.manifest_names;
        }
        if other.workspace.ignore_dirs.is_some() {
            self.workspace.ignore_dirs = other.workspace.ignore_dirs;
        }

        // Roots and external sources are replaced wholesale
        if !other.roots.is_empty() {
            self.roots = other.roots;
        }
        if !other.external.is_empty() {
            self.external = other.external;
        }

        if other.resolve.platform_prefixes.is_some() {
            self.resolve.platform_prefixes = other.resolve.platform_prefixes;
        }

        if other.sync.target_kinds.is_some() {
            self.sync.target_kinds = other.sync.target_kinds;
        }
        if other.sync.jobs.is_some() {
            self.sync.jobs = other.sync.jobs;
        }
    }

    /// Configured source roots, or `main`/`test` defaults.
    pub fn source_roots(&self) -> Vec<SourceRoot> {
        if self.roots.is_empty() {
            return default_roots();
        }
        self.roots
            .iter()
            .map(|(name, pattern)| SourceRoot::new(name, pattern))
            .collect()
    }

    /// Manifest names, canonical first.
    pub fn manifest_names(&self) -> Vec<String> {
        self.workspace
            .manifest_names
            .clone()
            .unwrap_or_else(default_manifest_names)
    }

    /// Directory names never scanned.
    pub fn ignore_dirs(&self) -> Vec<String> {
        self.workspace
            .ignore_dirs
            .clone()
            .unwrap_or_else(default_ignore_dirs)
    }

    /// Platform name prefixes.
    pub fn platform_prefixes(&self) -> Vec<String> {
        self.resolve
            .platform_prefixes
            .clone()
            .unwrap_or_else(default_platform_prefixes)
    }

    /// Synchronized rule kinds.
    pub fn target_kinds(&self) -> Vec<String> {
        self.sync
            .target_kinds
            .clone()
            .unwrap_or_else(default_target_kinds)
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.buildsync/config.toml)
/// 2. Global config
/// 3. Defaults
///
/// A config file that exists but cannot be parsed is an error.
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_path.filter(|p| p.exists()) {
        config.merge(Config::load(global_path)?);
    }

    if project_path.exists() {
        config.merge(Config::load(project_path)?);
    }

    Ok(config)
}

/// Get the global buildsync config directory.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "buildsync", "buildsync").map(|d| d.config_dir().to_path_buf())
}

/// Get the global config path.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.buildsync/config.toml).
pub fn project_config_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".buildsync").join("config.toml")
}
