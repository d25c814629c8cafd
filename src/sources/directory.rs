//! Directory source - a tree of `.class` or `.java` files.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use walkdir::WalkDir;

use crate::sources::external::{holds_package, type_name, ExternalSymbolSource};
use crate::util::fs::display_relative;

/// Every type found under a directory maps to one coordinate.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    name: String,
    path: PathBuf,
    coordinate: String,
    types: BTreeSet<String>,
}

impl DirectorySource {
    /// Index the types under `path`.
    pub fn load(name: &str, path: &Path, coordinate: &str) -> Result<Self> {
        if !path.is_dir() {
            bail!("directory does not exist: {}", path.display());
        }

        let mut types = BTreeSet::new();
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry =
                entry.with_context(|| format!("failed to scan {}", path.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(ty) = type_name(&display_relative(path, entry.path())) {
                types.insert(ty);
            }
        }

        Ok(DirectorySource {
            name: name.to_string(),
            path: path.to_path_buf(),
            coordinate: coordinate.to_string(),
            types,
        })
    }

    /// Indexed directory.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ExternalSymbolSource for DirectorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve(&self, symbol: &str) -> Option<&str> {
        self.types
            .contains(symbol)
            .then_some(self.coordinate.as_str())
    }

    fn provides_package(&self, package: &str) -> bool {
        holds_package(self.types.range(format!("{}.", package)..), package)
    }

    fn len(&self) -> usize {
        self.types.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_directory_source() {
        let tmp = TempDir::new().unwrap();
        let classes = tmp.path().join("classes");
        std::fs::create_dir_all(classes.join("org/slf4j")).unwrap();
        std::fs::write(classes.join("org/slf4j/Logger.class"), "").unwrap();
        std::fs::write(classes.join("org/slf4j/Logger$Level.class"), "").unwrap();
        std::fs::write(classes.join("org/slf4j/notes.txt"), "").unwrap();

        let source = DirectorySource::load("slf4j", &classes, "@maven//:slf4j").unwrap();
        assert_eq!(source.len(), 1);
        assert_eq!(source.resolve("org.slf4j.Logger"), Some("@maven//:slf4j"));
        assert_eq!(source.resolve("org.slf4j.LoggerFactory"), None);
        assert!(source.provides_package("org.slf4j"));
        assert!(!source.provides_package("org.slf4j.Logger.Level"));
        assert!(!source.provides_package("org.slf"));
    }

    #[test]
    fn test_missing_directory() {
        let tmp = TempDir::new().unwrap();
        assert!(DirectorySource::load("x", &tmp.path().join("nope"), "@x").is_err());
    }
}
