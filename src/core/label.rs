//! Target labels.
//!
//! A label is `//` followed by the package directory relative to the
//! workspace root, with `/` separators and no trailing separator. The
//! workspace-root package is `//`.

use std::fmt;
use std::path::{Component, Path};

use serde::Serialize;

use crate::util::fs::relative_path;

/// Canonical identifier for a package's buildable unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Label(String);

impl Label {
    /// Derive the label of a package directory.
    ///
    /// Both paths should be in the same form (both canonical, or both
    /// relative to the same base).
    pub fn for_dir(workspace_root: &Path, dir: &Path) -> Label {
        let rel = relative_path(workspace_root, dir);
        let parts: Vec<_> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        Label(format!("//{}", parts.join("/")))
    }

    /// Parse a label string such as `//src/a` or `//src/a:a`.
    ///
    /// A `:name` suffix equal to the last path component is dropped, so
    /// `//src/a:a` and `//src/a` compare equal. Returns `None` for strings
    /// that are not workspace labels.
    pub fn parse(s: &str) -> Option<Label> {
        let rest = s.strip_prefix("//")?;
        let (path, name) = match rest.split_once(':') {
            Some((path, name)) => (path, Some(name)),
            None => (rest, None),
        };
        let path = path.trim_end_matches('/');

        match name {
            None => Some(Label(format!("//{}", path))),
            Some(name) if path.rsplit('/').next() == Some(name) => {
                Some(Label(format!("//{}", path)))
            }
            Some(_) => None,
        }
    }

    /// The label text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The package path without the leading `//`.
    pub fn package_path(&self) -> &str {
        &self.0[2..]
    }

    /// The default target name: the last path component.
    ///
    /// Returns `None` for the workspace-root label.
    pub fn target_name(&self) -> Option<&str> {
        let path = self.package_path();
        if path.is_empty() {
            None
        } else {
            path.rsplit('/').next()
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Label {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_label_for_dir() {
        let root = PathBuf::from("/ws");
        assert_eq!(Label::for_dir(&root, &root.join("src/a")).as_str(), "//src/a");
        assert_eq!(Label::for_dir(&root, &root).as_str(), "//");
    }

    #[test]
    fn test_label_no_trailing_separator() {
        let root = PathBuf::from("/ws");
        let label = Label::for_dir(&root, Path::new("/ws/src/a/"));
        assert_eq!(label.as_str(), "//src/a");
    }

    #[test]
    fn test_label_parse() {
        assert_eq!(Label::parse("//src/a").unwrap().as_str(), "//src/a");
        assert_eq!(Label::parse("//src/a:a").unwrap().as_str(), "//src/a");
        assert!(Label::parse("//src/a:other").is_none());
        assert!(Label::parse("@maven//:guava").is_none());
        assert!(Label::parse(":local").is_none());
    }

    #[test]
    fn test_label_serializes_as_string() {
        let label = Label::parse("//src/a:a").unwrap();
        assert_eq!(serde_json::to_string(&label).unwrap(), "\"//src/a\"");
        assert_eq!(label.package_path(), "src/a");
    }

    #[test]
    fn test_target_name() {
        assert_eq!(Label::parse("//src/a").unwrap().target_name(), Some("a"));
        assert_eq!(Label::parse("//").unwrap().target_name(), None);
    }
}
