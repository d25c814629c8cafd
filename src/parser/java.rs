//! Lexical Java parser.
//!
//! Comments and literals are blanked out first; everything else is found
//! with regular expressions. This is not a Java parser in the compiler
//! sense: it recognizes the package clause, imports, type declarations,
//! qualified names in code, and capitalized simple names.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::parser::SourceParser;
use crate::resolver::SymbolResolver;

static PACKAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bpackage\s+([\w$]+(?:\s*\.\s*[\w$]+)*)\s*;").unwrap());

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bimport\s+(static\s+)?([\w$]+(?:\s*\.\s*[\w$]+)*)(\s*\.\s*\*)?\s*;").unwrap()
});

static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\w.$])(?:class|interface|enum|record)\s+([A-Za-z_$][\w$]*)").unwrap()
});

static QUALIFIED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^\w.$])([a-z_][\w$]*(?:\.[\w$]+)+)").unwrap());

static SIMPLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^\w.$])([A-Z][\w$]*)").unwrap());

/// Parser for `.java` files.
#[derive(Debug, Clone)]
pub struct JavaParser {
    platform_prefixes: Vec<String>,
}

/// Imports of one file.
#[derive(Debug, Default)]
struct Imports {
    /// Simple name -> fully-qualified name
    single: BTreeMap<String, String>,
    /// Static member imports (`a.b.C.member`, or `a.b.C` for `a.b.C.*`)
    statics: Vec<String>,
    /// Wildcard packages, in file order
    wildcards: Vec<String>,
}

impl JavaParser {
    /// Create a parser ignoring names under `platform_prefixes`.
    pub fn new(platform_prefixes: Vec<String>) -> Self {
        JavaParser { platform_prefixes }
    }

    fn is_platform(&self, name: &str) -> bool {
        self.platform_prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }

    fn imports(code: &str) -> Imports {
        let mut imports = Imports::default();
        for caps in IMPORT.captures_iter(code) {
            let name = squash(&caps[2]);
            let is_static = caps.get(1).is_some();
            let is_wildcard = caps.get(3).is_some();

            match (is_static, is_wildcard) {
                (true, _) => imports.statics.push(name),
                (false, true) => imports.wildcards.push(name),
                (false, false) => {
                    let simple = name.rsplit('.').next().unwrap_or(&name).to_string();
                    imports.single.insert(simple, name);
                }
            }
        }
        imports
    }
}

impl SourceParser for JavaParser {
    fn accepts(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == "java")
    }

    fn declarations(&self, _path: &Path, text: &str) -> Vec<String> {
        let code = strip(text);
        declared_in(&code, package_of(&code).as_deref())
    }

    fn references(&self, _path: &Path, text: &str, resolver: &SymbolResolver) -> BTreeSet<String> {
        let code = strip(text);
        let package = package_of(&code);
        let imports = Self::imports(&code);
        let local: BTreeSet<String> = declared_in(&code, package.as_deref())
            .iter()
            .filter_map(|d| d.rsplit('.').next().map(str::to_string))
            .collect();

        let mut refs = BTreeSet::new();
        refs.extend(imports.single.values().cloned());
        refs.extend(imports.statics.iter().cloned());
        // Neither tier can qualify names through these; the import itself
        // is the missing reference.
        refs.extend(
            imports
                .wildcards
                .iter()
                .filter(|w| !resolver.knows(w) && !resolver.knows_package(w))
                .map(|w| format!("{}.*", w)),
        );

        // Leading segments that mark a dotted chain as a package path
        // rather than a field access.
        let roots: BTreeSet<&str> = package
            .iter()
            .chain(imports.single.values())
            .chain(&imports.statics)
            .chain(&imports.wildcards)
            .filter_map(|name| name.split('.').next())
            .collect();
        let is_root = |segment: &str| roots.contains(segment) || resolver.knows_package(segment);

        let body = IMPORT.replace_all(&code, " ");
        let body = PACKAGE.replace_all(&body, " ");

        for caps in QUALIFIED.captures_iter(&body) {
            let segments: Vec<&str> = caps[1].split('.').collect();
            let Some(first_type) = segments
                .iter()
                .position(|s| s.starts_with(|c: char| c.is_ascii_uppercase()))
            else {
                continue;
            };
            if first_type == 0 {
                continue;
            }
            let candidate = segments[..=first_type].join(".");
            if resolver.knows(&candidate)
                || (is_root(segments[0]) && !is_constant(segments[first_type]))
            {
                refs.insert(candidate);
            }
        }

        for caps in SIMPLE.captures_iter(&body) {
            let name = &caps[1];
            if imports.single.contains_key(name) || local.contains(name) {
                continue;
            }

            let same_package = match &package {
                Some(pkg) => format!("{}.{}", pkg, name),
                None => name.to_string(),
            };
            if resolver.declares(&same_package) {
                refs.insert(same_package);
                continue;
            }

            if let Some(qualified) = imports
                .wildcards
                .iter()
                .map(|w| format!("{}.{}", w, name))
                .find(|q| resolver.knows(q))
            {
                refs.insert(qualified);
            }
        }

        refs.retain(|name| !self.is_platform(name));
        refs
    }
}

/// Types declared in stripped code, nested types qualified by their outer type.
fn declared_in(code: &str, package: Option<&str>) -> Vec<String> {
    let bytes = code.as_bytes();
    let mut depth = 0usize;
    let mut cursor = 0usize;
    // (qualified name, brace depth of its body)
    let mut enclosing: Vec<(String, usize)> = Vec::new();
    let mut out = Vec::new();

    for caps in DECLARATION.captures_iter(code) {
        let name = &caps[1];
        let at = caps.get(1).map_or(0, |m| m.start());
        for &b in &bytes[cursor..at] {
            match b {
                b'{' => depth += 1,
                b'}' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        cursor = at;

        while enclosing.last().is_some_and(|(_, d)| *d > depth) {
            enclosing.pop();
        }
        let qualified = match (enclosing.last(), package) {
            (Some((outer, _)), _) => format!("{}.{}", outer, name),
            (None, Some(pkg)) => format!("{}.{}", pkg, name),
            (None, None) => name.to_string(),
        };
        enclosing.push((qualified.clone(), depth + 1));
        out.push(qualified);
    }

    out
}

/// `MAX_SIZE`-style names are constants, not types.
fn is_constant(segment: &str) -> bool {
    segment.len() > 1 && !segment.chars().any(|c| c.is_ascii_lowercase())
}

/// The file's package, if it declares one.
fn package_of(code: &str) -> Option<String> {
    PACKAGE.captures(code).map(|caps| squash(&caps[1]))
}

/// Remove whitespace inside a dotted name.
fn squash(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Blank out comments, string, text-block and character literals.
///
/// Byte offsets and newlines are preserved.
fn strip(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let blank = |b: u8| if b == b'\n' { b'\n' } else { b' ' };
    let mut i = 0;

    while i < bytes.len() {
        let rest = &bytes[i..];
        if rest.starts_with(b"//") {
            while i < bytes.len() && bytes[i] != b'\n' {
                out.push(b' ');
                i += 1;
            }
        } else if rest.starts_with(b"/*") {
            let end = find(bytes, i + 2, b"*/").map_or(bytes.len(), |e| e + 2);
            out.extend(bytes[i..end].iter().map(|&b| blank(b)));
            i = end;
        } else if rest.starts_with(b"\"\"\"") {
            let end = find(bytes, i + 3, b"\"\"\"").map_or(bytes.len(), |e| e + 3);
            out.extend(bytes[i..end].iter().map(|&b| blank(b)));
            i = end;
        } else if rest[0] == b'"' || rest[0] == b'\'' {
            let quote = rest[0];
            out.push(b' ');
            i += 1;
            while i < bytes.len() && bytes[i] != b'\n' {
                let b = bytes[i];
                if b == b'\\' && i + 1 < bytes.len() {
                    out.extend([b' ', blank(bytes[i + 1])]);
                    i += 2;
                    continue;
                }
                out.push(b' ');
                i += 1;
                if b == quote {
                    break;
                }
            }
        } else {
            out.push(rest[0]);
            i += 1;
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn find(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}
