//! Symbol resolution.
//!
//! Tier A maps every symbol declared in the workspace to its owning
//! package. Tier B consults external sources for names Tier A does not
//! know. The resolver is frozen before any package's dependencies are
//! computed.

pub mod errors;
pub mod registry;

pub use errors::ResolutionConflict;
pub use registry::{RegistryBuilder, Resolution, SymbolOwner, SymbolResolver};
