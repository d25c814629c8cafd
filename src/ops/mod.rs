//! High-level operations.
//!
//! This module contains the implementation of buildsync commands.

pub mod buildsync_imports;
pub mod buildsync_sync;
pub mod synchronize;
pub mod walker;

pub use buildsync_imports::used_types;
pub use buildsync_sync::{
    analyze, sync_workspace, Analysis, PackageReport, PackageStatus, SyncError, SyncOptions,
    SyncReport,
};
pub use synchronize::{ApplyOutcome, ManifestDiff, ManifestSynchronizer};
pub use walker::{
    FileWalker, PackageBoundaries, TraversalError, UnresolvedReference, WalkReport, WalkState,
};
