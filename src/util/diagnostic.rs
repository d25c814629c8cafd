//! User-friendly diagnostic messages.
//!
//! Every error shown to the user names the root cause, the conflicting
//! facts, and a suggested fix where one exists.

use std::fmt;
use std::path::PathBuf;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// No workspace marker was found.
    pub const NO_WORKSPACE: &str =
        "help: Run inside a Bazel workspace or pass `--workspace <DIR>`";

    /// No package was discovered under the source roots.
    pub const NO_PACKAGES: &str =
        "help: Check the `[roots]` patterns in .buildsync/config.toml or pass `--root NAME=PATTERN`";

    /// A symbol is declared by two packages.
    pub const CONFLICT: &str =
        "help: Rename or move one of the declarations so each symbol has a single owner";

    /// A manifest has no synchronizable target.
    pub const NO_TARGET: &str =
        "help: Name the target after its directory or add its kind to `[sync] target_kinds`";

    /// A `deps` value is not a list literal.
    pub const UNSUPPORTED_DEPS: &str =
        "help: Write `deps` as a plain list, or mark the rule's kind as unmanaged";

    /// `check` found stale manifests.
    pub const STALE: &str = "help: Run `buildsync sync` to rewrite them";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (file path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Error,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(message)
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = match (self.severity, color) {
            (Severity::Error, true) => "\x1b[1;31merror\x1b[0m",
            (Severity::Warning, true) => "\x1b[1;33mwarning\x1b[0m",
            (Severity::Error, false) => "error",
            (Severity::Warning, false) => "warning",
        };

        output.push_str(&format!("{}: {}\n", severity_str, self.message));

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            for suggestion in &self.suggestions {
                output.push_str(&format!("{}\n", suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("symbol `com.acme.Bar` is declared by two packages")
            .with_location("src/a/Bar.java")
            .with_context("//src/a declares com.acme.Bar")
            .with_context("//src/b declares com.acme.Bar")
            .with_suggestion(suggestions::CONFLICT);

        let output = diag.format(false);
        assert!(output.starts_with("error: symbol `com.acme.Bar`"));
        assert!(output.contains("  --> src/a/Bar.java"));
        assert!(output.contains("  = //src/b declares com.acme.Bar"));
        assert!(output.contains("help: Rename or move"));
    }

    #[test]
    fn test_warning_severity() {
        let diag = Diagnostic::warning("unresolved reference");
        assert_eq!(diag.severity, Severity::Warning);
        assert!(diag.to_string().starts_with("warning: "));
    }
}
