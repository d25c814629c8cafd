//! External symbol sources.
//!
//! A source maps fully-qualified names that no workspace package declares
//! to an external coordinate such as `@maven//:com_google_guava_guava`.

use anyhow::{bail, Context, Result};

use crate::core::Workspace;
use crate::sources::{ArchiveSource, CatalogSource, DirectorySource};
use crate::util::config::{ExternalConfig, ExternalKind};

/// A pluggable resolver for names outside the workspace.
pub trait ExternalSymbolSource: Send + Sync {
    /// Get the source name for display.
    fn name(&self) -> &str;

    /// Coordinate providing `symbol`, if this source knows it.
    fn resolve(&self, symbol: &str) -> Option<&str>;

    /// Whether the source holds any type inside `package`.
    fn provides_package(&self, package: &str) -> bool;

    /// Number of entries (types or prefixes) the source holds.
    fn len(&self) -> usize;

    /// Whether the source holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build the configured external sources, in configuration order.
pub fn load_sources(ws: &Workspace) -> Result<Vec<Box<dyn ExternalSymbolSource>>> {
    ws.external()
        .iter()
        .map(|cfg| {
            load_source(ws, cfg)
                .with_context(|| format!("failed to load external source `{}`", cfg.name))
        })
        .collect()
}

fn load_source(ws: &Workspace, cfg: &ExternalConfig) -> Result<Box<dyn ExternalSymbolSource>> {
    let source: Box<dyn ExternalSymbolSource> = match cfg.kind {
        ExternalKind::Catalog => {
            if cfg.packages.is_empty() {
                bail!("catalog source has no `packages` table");
            }
            Box::new(CatalogSource::new(&cfg.name, cfg.packages.clone()))
        }
        ExternalKind::Directory | ExternalKind::Archive => {
            let Some(path) = &cfg.path else {
                bail!("`path` is required for {:?} sources", cfg.kind);
            };
            let Some(coordinate) = &cfg.coordinate else {
                bail!("`coordinate` is required for {:?} sources", cfg.kind);
            };
            let path = ws.root().join(path);
            if cfg.kind == ExternalKind::Directory {
                Box::new(DirectorySource::load(&cfg.name, &path, coordinate)?)
            } else {
                Box::new(ArchiveSource::load(&cfg.name, &path, coordinate)?)
            }
        }
    };

    tracing::debug!("external source `{}`: {} entries", source.name(), source.len());
    Ok(source)
}

/// Whether a sorted set of type names has one inside `package`.
pub fn holds_package<'a, I>(mut names: I, package: &str) -> bool
where
    I: Iterator<Item = &'a String>,
{
    let prefix = format!("{}.", package);
    names.next().is_some_and(|name| name.starts_with(&prefix))
}

/// Type name for a `.class` or `.java` path relative to its root.
///
/// `com/acme/Foo.class` and `com/acme/Foo$Inner.class` both name
/// `com.acme.Foo`. Module and package descriptors name nothing.
pub fn type_name(rel_path: &str) -> Option<String> {
    let rel_path = rel_path.trim_start_matches("./").replace('\\', "/");
    let stem = rel_path
        .strip_suffix(".class")
        .or_else(|| rel_path.strip_suffix(".java"))?;

    let (dir, file) = match stem.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, stem),
    };
    let outer = file.split('$').next().unwrap_or(file);
    if outer.is_empty() || outer == "module-info" || outer == "package-info" {
        return None;
    }

    Some(match dir {
        Some(dir) => format!("{}.{}", dir.replace('/', "."), outer),
        None => outer.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::WorkspaceFixture;
    use std::collections::BTreeSet;

    #[test]
    fn test_type_name() {
        assert_eq!(type_name("com/acme/Foo.class").as_deref(), Some("com.acme.Foo"));
        assert_eq!(type_name("com/acme/Foo$1.class").as_deref(), Some("com.acme.Foo"));
        assert_eq!(type_name("./org/x/Bar.java").as_deref(), Some("org.x.Bar"));
        assert_eq!(type_name("Top.class").as_deref(), Some("Top"));
        assert_eq!(type_name("module-info.class"), None);
        assert_eq!(type_name("com/acme/package-info.java"), None);
        assert_eq!(type_name("com/acme/README.md"), None);
    }

    #[test]
    fn test_holds_package() {
        let types: BTreeSet<String> = ["com.acme.Foo", "com.acmex.Bar"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let within = |package: &str| holds_package(types.range(format!("{}.", package)..), package);
        assert!(within("com.acme"));
        assert!(within("com"));
        assert!(!within("com.ac"));
        assert!(!within("org"));
    }

    #[test]
    fn test_load_sources_in_order() {
        let ws = WorkspaceFixture::new()
            .config(
                r#"
[[external]]
name = "guava"
kind = "directory"
path = "third_party/guava"
coordinate = "@maven//:guava"

[[external]]
name = "maven"
kind = "catalog"
[external.packages]
"com.google" = "@maven//:google"
"#,
            )
            .file("third_party/guava/com/google/common/base/Strings.class", "")
            .build();
        let workspace = ws.workspace();

        let sources = load_sources(&workspace).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].name(), "guava");
        assert_eq!(
            sources[0].resolve("com.google.common.base.Strings"),
            Some("@maven//:guava")
        );
        assert_eq!(
            sources[1].resolve("com.google.common.base.Strings"),
            Some("@maven//:google")
        );
    }

    #[test]
    fn test_load_sources_requires_coordinate() {
        let ws = WorkspaceFixture::new()
            .config("[[external]]\nname = \"x\"\nkind = \"archive\"\npath = \"x.tar.gz\"\n")
            .build();
        let workspace = ws.workspace();

        let err = load_sources(&workspace).err().unwrap();
        assert!(format!("{:#}", err).contains("`coordinate` is required"));
    }
}
