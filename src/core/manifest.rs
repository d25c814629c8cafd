//! BUILD manifest handling.
//!
//! Only as much of the manifest grammar is understood as is needed to find
//! top-level rule calls, their `name`, and the `deps = [ ... ]` list. Every
//! byte outside the dependency-list region is preserved as-is.
//!
//! Supports both `BUILD.bazel` (canonical) and `BUILD` (alias).

use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use miette::Diagnostic as MietteDiagnostic;
use regex::Regex;
use thiserror::Error;

use crate::core::dependency::canonical_cmp;
use crate::core::Label;

/// Canonical manifest file name.
pub const MANIFEST_NAME: &str = "BUILD.bazel";

/// Alternative manifest file name.
pub const MANIFEST_ALIAS: &str = "BUILD";

/// Indentation unit used when rendering list entries.
const INDENT: &str = "    ";

static RULE_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([A-Za-z_][A-Za-z0-9_]*)[ \t]*\(").unwrap());

/// Errors reading or addressing a manifest.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ManifestError {
    #[error("failed to read manifest {}", .path.display())]
    #[diagnostic(code(buildsync::manifest::read))]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no target for `{label}` in {}", .path.display())]
    #[diagnostic(
        code(buildsync::manifest::no_target),
        help("name a rule after the package directory, or add its kind to `sync.target_kinds`")
    )]
    NoTarget { path: PathBuf, label: String },

    #[error("`deps` of `{target}` in {} is not a plain list", .path.display())]
    #[diagnostic(
        code(buildsync::manifest::unsupported_deps),
        help("only literal lists of strings can be rewritten, e.g. deps = [\"//a\"]")
    )]
    UnsupportedDeps { path: PathBuf, target: String },

    #[error("unbalanced brackets in {} at byte {offset}", .path.display())]
    #[diagnostic(code(buildsync::manifest::malformed))]
    Malformed { path: PathBuf, offset: usize },

    #[error("failed to write manifest {}", .path.display())]
    #[diagnostic(
        code(buildsync::manifest::write),
        help("the previous manifest contents were left untouched")
    )]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A top-level rule call such as `java_library(...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Rule kind (the called function)
    pub kind: String,
    /// Value of the `name` attribute, if it is a string literal
    pub name: Option<String>,
    /// Byte offset of the opening parenthesis
    pub open: usize,
    /// Byte offset of the closing parenthesis
    pub close: usize,
    /// Indentation of the rule's attributes
    pub indent: String,
}

/// One entry of a dependency list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepsEntry {
    /// The label or coordinate
    pub value: String,
    /// Entry carries a `# keep` comment and is never removed
    pub keep: bool,
}

impl DepsEntry {
    /// A regular (non-keep) entry.
    pub fn new(value: impl Into<String>) -> Self {
        DepsEntry {
            value: value.into(),
            keep: false,
        }
    }
}

/// Location and contents of a rule's `deps = [...]` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepsRegion {
    /// Byte offset of the `deps` identifier
    pub start: usize,
    /// Byte offset just past the closing bracket and its trailing comma
    pub end: usize,
    /// Indentation of the `deps` line
    pub indent: String,
    /// Parsed entries, in file order
    pub entries: Vec<DepsEntry>,
}

/// A manifest file held in memory.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    content: String,
    kinds: Vec<ByteKind>,
}

/// What a byte of manifest text belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteKind {
    Code,
    Str,
    Comment,
}

impl Manifest {
    /// Load a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(path, content))
    }

    /// Wrap already-loaded manifest text.
    pub fn new(path: &Path, content: impl Into<String>) -> Self {
        let content = content.into();
        let kinds = classify(&content);
        Manifest {
            path: path.to_path_buf(),
            content,
            kinds,
        }
    }

    /// Manifest path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Manifest text.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// All top-level rule calls, in file order.
    pub fn rules(&self) -> Result<Vec<Rule>, ManifestError> {
        let mut rules = Vec::new();
        let mut end = 0;

        for whole in RULE_START.find_iter(&self.content) {
            // Calls inside an earlier rule's arguments are not rules.
            if whole.start() < end || !self.is_code(whole.start()) {
                continue;
            }

            let open = whole.end() - 1;
            let close = self.matching(open)?;
            end = close;
            let name = self
                .attribute(open, close, "name")
                .and_then(|(_, value)| self.string_at(value));
            let indent = self
                .attribute(open, close, "name")
                .and_then(|(start, _)| self.line_indent(start))
                .unwrap_or_else(|| INDENT.to_string());

            rules.push(Rule {
                kind: whole.as_str().trim_end_matches('(').trim_end().to_string(),
                name,
                open,
                close,
                indent,
            });
        }

        Ok(rules)
    }

    /// Find the rule whose dependency list belongs to `label`.
    ///
    /// Prefers a rule of one of `kinds` named after the package directory,
    /// then the first rule of one of `kinds`.
    pub fn find_target(&self, label: &Label, kinds: &[String]) -> Result<Rule, ManifestError> {
        let rules = self.rules()?;
        let is_kind = |rule: &Rule| kinds.iter().any(|k| *k == rule.kind);

        let by_name = label.target_name().and_then(|target| {
            rules
                .iter()
                .find(|r| is_kind(r) && r.name.as_deref() == Some(target))
        });

        by_name
            .or_else(|| rules.iter().find(|r| is_kind(r)))
            .cloned()
            .ok_or_else(|| ManifestError::NoTarget {
                path: self.path.clone(),
                label: label.to_string(),
            })
    }

    /// Locate the `deps` attribute of a rule.
    ///
    /// Returns `Ok(None)` if the rule has no `deps` attribute.
    pub fn deps_region(&self, rule: &Rule) -> Result<Option<DepsRegion>, ManifestError> {
        let Some((start, value)) = self.attribute(rule.open, rule.close, "deps") else {
            return Ok(None);
        };

        let unsupported = || ManifestError::UnsupportedDeps {
            path: self.path.clone(),
            target: rule.name.clone().unwrap_or_else(|| rule.kind.clone()),
        };

        if self.content.as_bytes().get(value) != Some(&b'[') {
            return Err(unsupported());
        }
        let close = self.matching(value)?;

        // `deps = [...] + OTHER` cannot be rewritten safely.
        let bytes = self.content.as_bytes();
        let mut end = close + 1;
        let mut next = end;
        while next < bytes.len() && bytes[next].is_ascii_whitespace() {
            next += 1;
        }
        match bytes.get(next) {
            Some(b',') => end = next + 1,
            Some(b')') | Some(b'#') => {}
            _ => return Err(unsupported()),
        }

        let entries = self
            .list_entries(value, close)
            .ok_or_else(unsupported)?;
        let indent = self
            .line_indent(start)
            .unwrap_or_else(|| INDENT.to_string());

        Ok(Some(DepsRegion {
            start,
            end,
            indent,
            entries,
        }))
    }

    /// Produce new manifest text with the rule's dependency list set to
    /// `entries`.
    ///
    /// Only the `deps` region changes. When the rule has no `deps`
    /// attribute and `entries` is empty, the text is returned unchanged.
    pub fn with_deps(
        &self,
        rule: &Rule,
        region: Option<&DepsRegion>,
        entries: &[DepsEntry],
    ) -> String {
        match region {
            Some(region) => {
                let mut out = String::with_capacity(self.content.len());
                out.push_str(&self.content[..region.start]);
                out.push_str(&render_deps(&region.indent, entries));
                out.push_str(&self.content[region.end..]);
                out
            }
            None if entries.is_empty() => self.content.clone(),
            None => self.insert_deps(rule, entries),
        }
    }

    fn insert_deps(&self, rule: &Rule, entries: &[DepsEntry]) -> String {
        let bytes = self.content.as_bytes();

        // Last significant byte inside the call decides whether a comma is needed.
        let last_code = (rule.open..rule.close)
            .rev()
            .find(|&i| self.kinds[i] != ByteKind::Comment && !bytes[i].is_ascii_whitespace())
            .unwrap_or(rule.open);
        let needs_comma = !matches!(bytes[last_code], b',' | b'(');

        // Insert after any trailing comment on that line.
        let insert_at = self.content[..rule.close].trim_end().len().max(last_code + 1);

        let mut out = String::with_capacity(self.content.len() + 64);
        out.push_str(&self.content[..=last_code]);
        if needs_comma {
            out.push(',');
        }
        out.push_str(&self.content[last_code + 1..insert_at]);
        out.push('\n');
        out.push_str(&rule.indent);
        out.push_str(&render_deps(&rule.indent, entries));
        out.push('\n');
        out.push_str(&self.content[rule.close..]);
        out
    }

    fn is_code(&self, offset: usize) -> bool {
        self.kinds[offset] == ByteKind::Code
    }

    /// Offset of the bracket closing the one at `open`.
    fn matching(&self, open: usize) -> Result<usize, ManifestError> {
        let bytes = self.content.as_bytes();
        let mut depth = 0usize;

        for i in open..bytes.len() {
            if !self.is_code(i) {
                continue;
            }
            match bytes[i] {
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
                _ => {}
            }
        }

        Err(ManifestError::Malformed {
            path: self.path.clone(),
            offset: open,
        })
    }

    /// Find a top-level `attr = value` inside a call.
    ///
    /// Returns the offset of the attribute name and of the value.
    fn attribute(&self, open: usize, close: usize, attr: &str) -> Option<(usize, usize)> {
        let bytes = self.content.as_bytes();
        let mut depth = 0usize;
        let mut i = open + 1;

        while i < close {
            if !self.is_code(i) {
                i += 1;
                continue;
            }
            match bytes[i] {
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth = depth.saturating_sub(1),
                b if depth == 0 && is_ident_start(b) && !is_ident(bytes[i - 1]) => {
                    let start = i;
                    while i < close && is_ident(bytes[i]) {
                        i += 1;
                    }
                    if &self.content[start..i] != attr {
                        continue;
                    }

                    let mut j = i;
                    while j < close && bytes[j].is_ascii_whitespace() {
                        j += 1;
                    }
                    if bytes.get(j) == Some(&b'=') && bytes.get(j + 1) != Some(&b'=') {
                        j += 1;
                        while j < close && bytes[j].is_ascii_whitespace() {
                            j += 1;
                        }
                        return Some((start, j));
                    }
                    continue;
                }
                _ => {}
            }
            i += 1;
        }

        None
    }

    /// The contents of a string literal starting at `offset`.
    fn string_at(&self, offset: usize) -> Option<String> {
        let bytes = self.content.as_bytes();
        let quote = *bytes.get(offset)?;
        if quote != b'"' && quote != b'\'' {
            return None;
        }
        let rest = &self.content[offset + 1..];
        let end = rest.find(quote as char)?;
        Some(rest[..end].to_string())
    }

    /// Whitespace before `offset` if only whitespace precedes it on its line.
    fn line_indent(&self, offset: usize) -> Option<String> {
        let line_start = self.content[..offset].rfind('\n').map_or(0, |i| i + 1);
        let prefix = &self.content[line_start..offset];
        prefix
            .chars()
            .all(|c| c == ' ' || c == '\t')
            .then(|| prefix.to_string())
    }

    /// Parse the string entries of a list literal.
    ///
    /// Returns `None` if the list contains anything besides string
    /// literals, commas, whitespace and comments.
    fn list_entries(&self, open: usize, close: usize) -> Option<Vec<DepsEntry>> {
        let bytes = self.content.as_bytes();
        let mut entries = Vec::new();
        let mut i = open + 1;

        while i < close {
            let b = bytes[i];
            if self.is_code(i) {
                if b != b',' && !b.is_ascii_whitespace() {
                    return None;
                }
                i += 1;
                continue;
            }

            if self.kinds[i] == ByteKind::Comment {
                while i < close && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }

            // Start of a string literal.
            let value = self.string_at(i)?;
            let literal_end = i + value.len() + 2;
            let line_end = self.content[literal_end..]
                .find('\n')
                .map_or(close, |n| (literal_end + n).min(close));
            let keep = self.content[literal_end..line_end]
                .split_once('#')
                .is_some_and(|(_, comment)| comment.trim() == "keep");

            entries.push(DepsEntry { value, keep });
            i = literal_end;
        }

        Some(entries)
    }
}

/// Render a `deps` attribute (without leading indentation).
pub fn render_deps(indent: &str, entries: &[DepsEntry]) -> String {
    if entries.is_empty() {
        return "deps = [],".to_string();
    }

    let mut out = String::from("deps = [\n");
    for entry in entries {
        out.push_str(indent);
        out.push_str(INDENT);
        out.push('"');
        out.push_str(&entry.value);
        out.push_str("\",");
        if entry.keep {
            out.push_str("  # keep");
        }
        out.push('\n');
    }
    out.push_str(indent);
    out.push_str("],");
    out
}

/// Merge computed dependencies with preserved `# keep` entries into the
/// canonical list.
pub fn canonical_entries<'a>(
    computed: impl IntoIterator<Item = &'a str>,
    existing: &[DepsEntry],
) -> Vec<DepsEntry> {
    let mut entries: Vec<DepsEntry> = existing.iter().filter(|e| e.keep).cloned().collect();
    for value in computed {
        if !entries.iter().any(|e| e.value == value) {
            entries.push(DepsEntry::new(value));
        }
    }
    entries.sort_by(|a, b| canonical_cmp(&a.value, &b.value));
    entries.dedup_by(|a, b| a.value == b.value);
    entries
}

/// Find the manifest in a directory, preferring the canonical name.
pub fn find_manifest_in(dir: &Path, names: &[String]) -> Option<PathBuf> {
    names
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Classify every byte as code, string literal or comment.
fn classify(text: &str) -> Vec<ByteKind> {
    let bytes = text.as_bytes();
    let mut kinds = vec![ByteKind::Code; bytes.len()];
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'#' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    kinds[i] = ByteKind::Comment;
                    i += 1;
                }
            }
            q @ (b'"' | b'\'') => {
                let start = i;
                let triple = bytes[i..].starts_with(&[q, q, q]);
                i += if triple { 3 } else { 1 };

                while i < bytes.len() {
                    if bytes[i] == b'\\' {
                        i += 2;
                    } else if triple && bytes[i..].starts_with(&[q, q, q]) {
                        i += 3;
                        break;
                    } else if !triple && bytes[i] == q {
                        i += 1;
                        break;
                    } else if !triple && bytes[i] == b'\n' {
                        break;
                    } else {
                        i += 1;
                    }
                }

                let end = i.min(bytes.len());
                kinds[start..end].iter_mut().for_each(|k| *k = ByteKind::Str);
            }
            _ => i += 1,
        }
    }

    kinds
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIB: &str = r#"load("@rules_java//java:defs.bzl", "java_library")

java_library(
    name = "a",
    srcs = glob(["*.java"]),
    visibility = ["//visibility:public"],
    deps = [
        "//src/old",  # keep
        "//src/stale",
    ],
)
"#;

    fn manifest(text: &str) -> Manifest {
        Manifest::new(Path::new("/ws/src/a/BUILD.bazel"), text)
    }

    fn kinds() -> Vec<String> {
        vec!["java_library".to_string(), "java_test".to_string()]
    }

    fn label(s: &str) -> Label {
        Label::parse(s).unwrap()
    }

    #[test]
    fn test_rules() {
        let m = manifest(LIB);
        let rules = m.rules().unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].kind, "load");
        assert_eq!(rules[1].kind, "java_library");
        assert_eq!(rules[1].name.as_deref(), Some("a"));
        assert_eq!(rules[1].indent, "    ");
    }

    #[test]
    fn test_nested_calls_are_not_rules() {
        let m = manifest(
            r#"java_library(
    name = "a",
    srcs =
glob(["*.java"]),
)

java_test(
    name = "a_test",
)
"#,
        );
        let rules = m.rules().unwrap();
        let kinds: Vec<&str> = rules.iter().map(|r| r.kind.as_str()).collect();
        assert_eq!(kinds, vec!["java_library", "java_test"]);
        assert_eq!(rules[1].name.as_deref(), Some("a_test"));
    }

    #[test]
    fn test_deps_region_entries() {
        let m = manifest(LIB);
        let rule = m.find_target(&label("//src/a"), &kinds()).unwrap();
        let region = m.deps_region(&rule).unwrap().unwrap();

        assert_eq!(
            region.entries,
            vec![
                DepsEntry {
                    value: "//src/old".to_string(),
                    keep: true
                },
                DepsEntry::new("//src/stale"),
            ]
        );
        assert!(m.content()[region.start..].starts_with("deps = ["));
        assert!(m.content()[..region.end].ends_with("],"));
    }

    #[test]
    fn test_replace_region_only() {
        let m = manifest(LIB);
        let rule = m.find_target(&label("//src/a"), &kinds()).unwrap();
        let region = m.deps_region(&rule).unwrap();
        let entries = canonical_entries(["//src/b"], &region.as_ref().unwrap().entries);

        let out = m.with_deps(&rule, region.as_ref(), &entries);
        assert_eq!(
            out,
            r#"load("@rules_java//java:defs.bzl", "java_library")

java_library(
    name = "a",
    srcs = glob(["*.java"]),
    visibility = ["//visibility:public"],
    deps = [
        "//src/b",
        "//src/old",  # keep
    ],
)
"#
        );
    }

    #[test]
    fn test_insert_missing_deps() {
        let m = manifest("java_library(\n    name = \"a\",\n    srcs = [\"A.java\"],\n)\n");
        let rule = m.find_target(&label("//src/a"), &kinds()).unwrap();
        assert!(m.deps_region(&rule).unwrap().is_none());

        let out = m.with_deps(&rule, None, &[DepsEntry::new("//src/b")]);
        assert_eq!(
            out,
            "java_library(\n    name = \"a\",\n    srcs = [\"A.java\"],\n    deps = [\n        \"//src/b\",\n    ],\n)\n"
        );

        // Re-locating the inserted region gives back the same text.
        let again = manifest(&out);
        let rule = again.find_target(&label("//src/a"), &kinds()).unwrap();
        let region = again.deps_region(&rule).unwrap();
        assert_eq!(
            again.with_deps(&rule, region.as_ref(), &[DepsEntry::new("//src/b")]),
            out
        );
    }

    #[test]
    fn test_insert_without_trailing_comma() {
        let m = manifest("java_library(\n    name = \"a\"  # lib\n)\n");
        let rule = m.find_target(&label("//src/a"), &kinds()).unwrap();
        let out = m.with_deps(&rule, None, &[DepsEntry::new("//src/b")]);
        assert_eq!(
            out,
            "java_library(\n    name = \"a\",  # lib\n    deps = [\n        \"//src/b\",\n    ],\n)\n"
        );
    }

    #[test]
    fn test_empty_set_without_attribute_is_noop() {
        let text = "java_library(\n    name = \"a\",\n)\n";
        let m = manifest(text);
        let rule = m.find_target(&label("//src/a"), &kinds()).unwrap();
        assert_eq!(m.with_deps(&rule, None, &[]), text);
    }

    #[test]
    fn test_target_selection_prefers_name() {
        let m = manifest(
            "java_library(name = \"helpers\")\n\njava_library(name = \"a\")\n",
        );
        let rule = m.find_target(&label("//src/a"), &kinds()).unwrap();
        assert_eq!(rule.name.as_deref(), Some("a"));

        let rule = m.find_target(&label("//src/other"), &kinds()).unwrap();
        assert_eq!(rule.name.as_deref(), Some("helpers"));
    }

    #[test]
    fn test_no_target() {
        let m = manifest("filegroup(name = \"a\")\n");
        let err = m.find_target(&label("//src/a"), &kinds()).unwrap_err();
        assert!(matches!(err, ManifestError::NoTarget { .. }));
    }

    #[test]
    fn test_unsupported_deps() {
        let m = manifest("java_library(\n    name = \"a\",\n    deps = COMMON + [\"//x\"],\n)\n");
        let rule = m.find_target(&label("//src/a"), &kinds()).unwrap();
        assert!(matches!(
            m.deps_region(&rule),
            Err(ManifestError::UnsupportedDeps { .. })
        ));

        let m = manifest("java_library(\n    name = \"a\",\n    deps = [\"//x\"] + EXTRA,\n)\n");
        let rule = m.find_target(&label("//src/a"), &kinds()).unwrap();
        assert!(m.deps_region(&rule).is_err());
    }

    #[test]
    fn test_brackets_inside_strings_and_comments() {
        let m = manifest(
            "# java_library(\njava_library(\n    name = \"a\",  # ) not the end\n    srcs = [\"(.java\"],\n    deps = [],\n)\n",
        );
        let rules = m.rules().unwrap();
        assert_eq!(rules.len(), 1);
        let region = m.deps_region(&rules[0]).unwrap().unwrap();
        assert!(region.entries.is_empty());
    }

    #[test]
    fn test_unbalanced() {
        let m = manifest("java_library(\n    name = \"a\",\n");
        assert!(matches!(m.rules(), Err(ManifestError::Malformed { .. })));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_deps("    ", &[]), "deps = [],");
    }
}
