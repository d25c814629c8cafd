//! Package and symbol sources.
//!
//! `index` discovers workspace packages; the remaining modules provide
//! external symbol sources for names no workspace package declares.

pub mod archive;
pub mod catalog;
pub mod directory;
pub mod external;
pub mod index;

pub use archive::ArchiveSource;
pub use catalog::CatalogSource;
pub use directory::DirectorySource;
pub use external::{load_sources, ExternalSymbolSource};
pub use index::{DiscoveryError, SourceIndex};
