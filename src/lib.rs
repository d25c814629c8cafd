//! buildsync - Keeps Bazel BUILD dependency lists in sync with Java sources
//!
//! This crate provides the core library functionality for buildsync:
//! package discovery, symbol resolution across packages and external
//! sources, and in-place rewriting of each target's `deps` list.

pub mod core;
pub mod ops;
pub mod parser;
pub mod resolver;
pub mod sources;
pub mod util;

/// Test fixtures for buildsync unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// writes throwaway workspaces to temporary directories.
#[cfg(test)]
pub mod test_support;

pub use core::{
    dependency::Dependency, label::Label, manifest::Manifest, package::Package,
    workspace::Workspace,
};

pub use resolver::{ResolutionConflict, SymbolResolver};
pub use util::context::GlobalContext;
