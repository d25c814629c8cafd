//! Command implementations

pub mod check;
pub mod completions;
pub mod imports;
pub mod packages;
pub mod sync;
