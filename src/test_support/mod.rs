//! Test fixtures for buildsync unit tests.
//!
//! # Example
//!
//! ```rust,ignore
//! let ws = WorkspaceFixture::new()
//!     .package("src/a", "java_library")
//!     .file("src/a/Foo.java", "package a; class Foo {}")
//!     .build();
//! let workspace = ws.workspace();
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::Workspace;
use crate::util::config::{load_config, project_config_path};

/// Config used when a fixture does not set one: a single `src` root.
pub const DEFAULT_CONFIG: &str = "[roots]\nsrc = \"src\"\n";

/// Builder for a workspace on disk.
#[derive(Debug, Clone)]
pub struct WorkspaceFixture {
    files: BTreeMap<PathBuf, String>,
    config: String,
}

impl WorkspaceFixture {
    /// An empty workspace with a `MODULE.bazel` marker.
    pub fn new() -> Self {
        let mut files = BTreeMap::new();
        files.insert(PathBuf::from("MODULE.bazel"), String::new());
        WorkspaceFixture {
            files,
            config: DEFAULT_CONFIG.to_string(),
        }
    }

    /// Add a file (path relative to the workspace root).
    pub fn file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Add a package whose manifest holds one rule named after the directory.
    pub fn package(self, dir: &str, kind: &str) -> Self {
        let name = dir.rsplit('/').next().unwrap_or(dir);
        let manifest = rule(kind, name, &[]);
        self.file(Path::new(dir).join("BUILD.bazel"), manifest)
    }

    /// Replace the project config.
    pub fn config(mut self, toml: impl Into<String>) -> Self {
        self.config = toml.into();
        self
    }

    /// Write everything to a fresh temporary directory.
    pub fn build(&self) -> TempWorkspace {
        let dir = TempDir::new().unwrap();
        for (path, content) in &self.files {
            let full = dir.path().join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, content).unwrap();
        }

        let config_path = project_config_path(dir.path());
        std::fs::create_dir_all(config_path.parent().unwrap()).unwrap();
        std::fs::write(config_path, &self.config).unwrap();

        TempWorkspace { dir }
    }
}

impl Default for WorkspaceFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A workspace written to a temporary directory.
pub struct TempWorkspace {
    dir: TempDir,
}

impl TempWorkspace {
    /// Workspace root (canonical).
    pub fn path(&self) -> PathBuf {
        self.dir.path().canonicalize().unwrap()
    }

    /// Read a file relative to the root.
    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(path)).unwrap()
    }

    /// Write a file relative to the root.
    pub fn write(&self, path: &str, content: &str) {
        let full = self.dir.path().join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
    }

    /// Load the workspace with its project config (no global config).
    pub fn workspace(&self) -> Workspace {
        let config = load_config(None, &project_config_path(self.dir.path())).unwrap();
        Workspace::new(self.dir.path(), &config).unwrap()
    }
}

/// Render a single-rule manifest.
pub fn rule(kind: &str, name: &str, deps: &[&str]) -> String {
    let mut out = format!("{}(\n    name = \"{}\",\n", kind, name);
    if !deps.is_empty() {
        out.push_str("    deps = [\n");
        for dep in deps {
            out.push_str(&format!("        \"{}\",\n", dep));
        }
        out.push_str("    ],\n");
    }
    out.push_str(")\n");
    out
}

/// Render a Java source file.
pub fn java(package: &str, imports: &[&str], body: &str) -> String {
    let mut out = format!("package {};\n\n", package);
    for import in imports {
        out.push_str(&format!("import {};\n", import));
    }
    if !imports.is_empty() {
        out.push('\n');
    }
    out.push_str(body);
    out.push('\n');
    out
}
