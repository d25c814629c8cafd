//! Resolution error types and diagnostics.

use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::core::Label;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Two packages declare the same fully-qualified symbol.
#[derive(Debug, Clone, Error, MietteDiagnostic)]
#[error("symbol `{symbol}` is declared by both `{first}` and `{second}`")]
#[diagnostic(
    code(buildsync::resolve::conflict),
    help("each symbol must have a single owning package")
)]
pub struct ResolutionConflict {
    pub symbol: String,
    pub first: Label,
    pub first_file: PathBuf,
    pub second: Label,
    pub second_file: PathBuf,
}

impl ResolutionConflict {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(format!(
            "symbol `{}` is declared by two packages",
            self.symbol
        ))
        .with_context(format!(
            "`{}` declares it in {}",
            self.first,
            self.first_file.display()
        ))
        .with_context(format!(
            "`{}` declares it in {}",
            self.second,
            self.second_file.display()
        ))
        .with_suggestion(suggestions::CONFLICT)
    }
}
