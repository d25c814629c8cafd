//! Catalog source - package prefixes mapped to coordinates.

use std::collections::BTreeMap;

use crate::sources::external::ExternalSymbolSource;

/// Resolves any name under a configured package prefix.
#[derive(Debug, Clone)]
pub struct CatalogSource {
    name: String,
    packages: BTreeMap<String, String>,
}

impl CatalogSource {
    /// Create a catalog from `prefix -> coordinate` pairs.
    pub fn new(name: &str, packages: BTreeMap<String, String>) -> Self {
        CatalogSource {
            name: name.to_string(),
            packages,
        }
    }
}

impl ExternalSymbolSource for CatalogSource {
    fn name(&self) -> &str {
        &self.name
    }

    /// The longest prefix wins: with `org.junit` and `org.junit.jupiter.api`
    /// both configured, `org.junit.jupiter.api.Test` maps to the latter.
    fn resolve(&self, symbol: &str) -> Option<&str> {
        let mut candidate = symbol;
        loop {
            if let Some(coordinate) = self.packages.get(candidate) {
                return Some(coordinate);
            }
            candidate = &candidate[..candidate.rfind('.')?];
        }
    }

    /// A configured prefix covers the package, or sits below it.
    fn provides_package(&self, package: &str) -> bool {
        let prefix = format!("{}.", package);
        self.resolve(package).is_some()
            || self
                .packages
                .range(prefix.clone()..)
                .next()
                .is_some_and(|(p, _)| p.starts_with(&prefix))
    }

    fn len(&self) -> usize {
        self.packages.len()
    }
}
