//! Core data structures for buildsync.
//!
//! This module contains the foundational types used throughout buildsync:
//! - Target labels
//! - Packages and their dependency sets
//! - BUILD manifests and dependency-list regions
//! - Workspace settings

pub mod dependency;
pub mod label;
pub mod manifest;
pub mod package;
pub mod workspace;

pub use dependency::{Dependency, DependencySet};
pub use label::Label;
pub use manifest::{DepsEntry, DepsRegion, Manifest, ManifestError, Rule};
pub use package::Package;
pub use workspace::{find_workspace_root, SourceRoot, Workspace, WORKSPACE_MARKERS};
