//! Source parsers.
//!
//! A parser extracts the symbols a source file declares and the symbols it
//! references. References are qualified with help from the frozen resolver.

pub mod java;

use std::collections::BTreeSet;
use std::path::Path;

use crate::resolver::SymbolResolver;

pub use java::JavaParser;

/// Extracts declared and referenced symbols from source files.
pub trait SourceParser: Send + Sync {
    /// Whether `path` is a source file this parser understands.
    fn accepts(&self, path: &Path) -> bool;

    /// Fully-qualified names of the symbols `text` declares.
    fn declarations(&self, path: &Path, text: &str) -> Vec<String>;

    /// Fully-qualified names `text` references.
    ///
    /// Platform names are never reported.
    fn references(&self, path: &Path, text: &str, resolver: &SymbolResolver) -> BTreeSet<String>;
}
