//! Archive source - a gzip-compressed tarball of class files.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use tar::Archive;

use crate::sources::external::{holds_package, type_name, ExternalSymbolSource};

/// Every type in a `.tar.gz` / `.tgz` archive maps to one coordinate.
#[derive(Debug, Clone)]
pub struct ArchiveSource {
    name: String,
    coordinate: String,
    types: BTreeSet<String>,
}

impl ArchiveSource {
    /// Index the entries of the archive at `path`. Nothing is extracted.
    pub fn load(name: &str, path: &Path, coordinate: &str) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open archive: {}", path.display()))?;
        let mut archive = Archive::new(GzDecoder::new(file));

        let mut types = BTreeSet::new();
        for entry in archive
            .entries()
            .with_context(|| format!("failed to read archive entries: {}", path.display()))?
        {
            let entry = entry.context("failed to read archive entry")?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let entry_path = entry.path().context("failed to get entry path")?;
            if let Some(ty) = type_name(&entry_path.to_string_lossy()) {
                types.insert(ty);
            }
        }

        Ok(ArchiveSource {
            name: name.to_string(),
            coordinate: coordinate.to_string(),
            types,
        })
    }
}

impl ExternalSymbolSource for ArchiveSource {
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
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;

    fn write_archive(path: &Path, entries: &[&str]) {
        let file = File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for name in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(0);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, std::io::empty()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_archive_source() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("guava.tar.gz");
        write_archive(
            &path,
            &[
                "com/google/common/collect/ImmutableList.class",
                "com/google/common/collect/ImmutableList$Builder.class",
                "META-INF/MANIFEST.MF",
            ],
        );

        let source = ArchiveSource::load("guava", &path, "@maven//:guava").unwrap();
        assert_eq!(source.len(), 1);
        assert_eq!(
            source.resolve("com.google.common.collect.ImmutableList"),
            Some("@maven//:guava")
        );
        assert_eq!(source.resolve("com.google.common.collect.Lists"), None);
        assert!(source.provides_package("com.google.common"));
        assert!(!source.provides_package("com.google.common.base"));
    }

    #[test]
    fn test_missing_archive() {
        let tmp = TempDir::new().unwrap();
        assert!(ArchiveSource::load("x", &tmp.path().join("x.tgz"), "@x").is_err());
    }
}
