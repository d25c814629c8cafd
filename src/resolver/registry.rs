//! Symbol registry.
//!
//! Built in two phases: a mutable `RegistryBuilder` collects every declared
//! symbol and the external sources, then `freeze` turns it into a read-only
//! `SymbolResolver` shared by all per-package work.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::Label;
use crate::resolver::errors::ResolutionConflict;
use crate::sources::ExternalSymbolSource;

/// The package and file declaring a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolOwner {
    pub label: Label,
    pub file: PathBuf,
}

/// Outcome of resolving one referenced name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "kebab-case")]
pub enum Resolution {
    /// Declared in the referencing file
    SameFile,
    /// Declared elsewhere in the referencing package
    SamePackage,
    /// Declared by another workspace package
    OtherPackage(Label),
    /// Provided by an external source
    External(String),
    /// Not found in either tier
    Unresolved,
}

/// Mutable registry, filled before any resolution happens.
#[derive(Default)]
pub struct RegistryBuilder {
    symbols: HashMap<String, SymbolOwner>,
    sources: Vec<Box<dyn ExternalSymbolSource>>,
}

impl RegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `symbol` as declared by `label` in `file`.
    ///
    /// A redeclaration within the same package keeps the first file. A
    /// declaration by a different package is a conflict.
    pub fn register(
        &mut self,
        symbol: &str,
        label: &Label,
        file: &Path,
    ) -> Result<(), ResolutionConflict> {
        if let Some(existing) = self.symbols.get(symbol) {
            if existing.label == *label {
                tracing::debug!(
                    "`{}` declared twice in {} ({} and {})",
                    symbol,
                    label,
                    existing.file.display(),
                    file.display()
                );
                return Ok(());
            }
            return Err(ResolutionConflict {
                symbol: symbol.to_string(),
                first: existing.label.clone(),
                first_file: existing.file.clone(),
                second: label.clone(),
                second_file: file.to_path_buf(),
            });
        }

        self.symbols.insert(
            symbol.to_string(),
            SymbolOwner {
                label: label.clone(),
                file: file.to_path_buf(),
            },
        );
        Ok(())
    }

    /// Append an external source; sources are queried in insertion order.
    pub fn add_source(&mut self, source: Box<dyn ExternalSymbolSource>) {
        self.sources.push(source);
    }

    /// Number of registered symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether no symbol is registered.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Finish registration.
    pub fn freeze(self) -> SymbolResolver {
        tracing::debug!(
            "registry frozen: {} symbols, {} external sources",
            self.symbols.len(),
            self.sources.len()
        );
        let packages = self
            .symbols
            .keys()
            .flat_map(|symbol| prefixes(symbol).skip(1).map(str::to_string))
            .collect();
        SymbolResolver {
            symbols: self.symbols,
            packages,
            sources: self.sources,
        }
    }
}

/// Read-only resolver.
pub struct SymbolResolver {
    symbols: HashMap<String, SymbolOwner>,
    /// Every proper prefix of a workspace symbol.
    packages: HashSet<String>,
    sources: Vec<Box<dyn ExternalSymbolSource>>,
}

impl SymbolResolver {
    /// Resolve `name`, referenced from `file` in package `from`.
    ///
    /// Unknown names fall back to their longest known prefix, so nested
    /// types and static members resolve to their declaring type. Workspace
    /// declarations win over external sources at every prefix length.
    pub fn resolve(&self, from: &Label, file: &Path, name: &str) -> Resolution {
        if let Some(owner) = self.owner(name) {
            return if owner.label != *from {
                Resolution::OtherPackage(owner.label.clone())
            } else if owner.file == file {
                Resolution::SameFile
            } else {
                Resolution::SamePackage
            };
        }

        match self.external(name) {
            Some(coordinate) => Resolution::External(coordinate.to_string()),
            None => Resolution::Unresolved,
        }
    }

    /// Whether `name` is exactly a known symbol in either tier.
    pub fn knows(&self, name: &str) -> bool {
        self.symbols.contains_key(name) || self.sources.iter().any(|s| s.resolve(name).is_some())
    }

    /// Whether `name` is exactly a symbol declared in the workspace.
    pub fn declares(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// Whether either tier holds anything inside `package`.
    pub fn knows_package(&self, package: &str) -> bool {
        self.packages.contains(package) || self.sources.iter().any(|s| s.provides_package(package))
    }

    /// Owner of `name` or of its longest declared prefix.
    pub fn owner(&self, name: &str) -> Option<&SymbolOwner> {
        prefixes(name).find_map(|p| self.symbols.get(p))
    }

    fn external(&self, name: &str) -> Option<&str> {
        prefixes(name).find_map(|p| self.sources.iter().find_map(|s| s.resolve(p)))
    }

    /// Number of workspace symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the workspace declares no symbol.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// `a.b.C.d`, `a.b.C`, `a.b`, `a`.
fn prefixes(name: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(Some(name), |n| n.rfind('.').map(|i| &n[..i]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::CatalogSource;
    use std::collections::BTreeMap;

    fn label(s: &str) -> Label {
        Label::parse(s).unwrap()
    }

    fn resolver() -> SymbolResolver {
        let mut builder = RegistryBuilder::new();
        builder
            .register("com.acme.a.Foo", &label("//src/a"), Path::new("src/a/Foo.java"))
            .unwrap();
        builder
            .register("com.acme.a.Helper", &label("//src/a"), Path::new("src/a/Helper.java"))
            .unwrap();
        builder
            .register("com.acme.b.Bar", &label("//src/b"), Path::new("src/b/Bar.java"))
            .unwrap();

        let mut packages = BTreeMap::new();
        packages.insert("com.google".to_string(), "@maven//:guava".to_string());
        packages.insert("com.acme".to_string(), "@maven//:acme_legacy".to_string());
        builder.add_source(Box::new(CatalogSource::new("maven", packages)));
        builder.freeze()
    }

    #[test]
    fn test_prefixes() {
        let all: Vec<_> = prefixes("a.b.C").collect();
        assert_eq!(all, vec!["a.b.C", "a.b", "a"]);
    }

    #[test]
    fn test_resolution_kinds() {
        let r = resolver();
        let from = label("//src/a");
        let file = Path::new("src/a/Foo.java");

        assert_eq!(r.resolve(&from, file, "com.acme.a.Foo"), Resolution::SameFile);
        assert_eq!(r.resolve(&from, file, "com.acme.a.Helper"), Resolution::SamePackage);
        assert_eq!(
            r.resolve(&from, file, "com.acme.b.Bar"),
            Resolution::OtherPackage(label("//src/b"))
        );
        assert_eq!(
            r.resolve(&from, file, "com.google.common.base.Strings"),
            Resolution::External("@maven//:guava".to_string())
        );
        assert_eq!(r.resolve(&from, file, "org.nowhere.X"), Resolution::Unresolved);
    }

    #[test]
    fn test_nested_and_member_names_use_prefix() {
        let r = resolver();
        let from = label("//src/a");
        let file = Path::new("src/a/Foo.java");

        assert_eq!(
            r.resolve(&from, file, "com.acme.b.Bar.Inner"),
            Resolution::OtherPackage(label("//src/b"))
        );
        assert_eq!(
            r.resolve(&from, file, "com.acme.b.Bar.staticMethod"),
            Resolution::OtherPackage(label("//src/b"))
        );
    }

    #[test]
    fn test_internal_tier_wins() {
        // The catalog claims all of `com.acme`, but the workspace declares Bar.
        let r = resolver();
        assert_eq!(
            r.resolve(&label("//src/a"), Path::new("src/a/Foo.java"), "com.acme.b.Bar"),
            Resolution::OtherPackage(label("//src/b"))
        );
        assert_eq!(
            r.resolve(&label("//src/a"), Path::new("src/a/Foo.java"), "com.acme.c.Gone"),
            Resolution::External("@maven//:acme_legacy".to_string())
        );
    }

    #[test]
    fn test_conflict_across_packages() {
        let mut builder = RegistryBuilder::new();
        builder
            .register("com.acme.Bar", &label("//src/a"), Path::new("src/a/Bar.java"))
            .unwrap();
        let err = builder
            .register("com.acme.Bar", &label("//src/b"), Path::new("src/b/Bar.java"))
            .unwrap_err();

        assert_eq!(err.first, label("//src/a"));
        assert_eq!(err.second, label("//src/b"));
    }

    #[test]
    fn test_redeclaration_in_same_package() {
        let mut builder = RegistryBuilder::new();
        let a = label("//src/a");
        builder.register("com.acme.Bar", &a, Path::new("src/a/Bar.java")).unwrap();
        builder.register("com.acme.Bar", &a, Path::new("src/a/Other.java")).unwrap();
        let r = builder.freeze();

        assert_eq!(r.owner("com.acme.Bar").unwrap().file, Path::new("src/a/Bar.java"));
    }

    #[test]
    fn test_knows() {
        let r = resolver();
        assert!(r.knows("com.acme.b.Bar"));
        assert!(r.declares("com.acme.b.Bar"));
        assert!(r.knows("com.google.common.collect.Lists"));
        assert!(!r.declares("com.google.common.collect.Lists"));
        assert!(!r.knows("org.nowhere.X"));
    }

    #[test]
    fn test_knows_package() {
        let r = resolver();
        assert!(r.knows_package("com.acme.b"));
        assert!(r.knows_package("com"));
        assert!(r.knows_package("com.google.common.collect"));
        assert!(!r.knows_package("com.acme.b.Bar"));
        assert!(!r.knows_package("org.nowhere"));
    }
}
