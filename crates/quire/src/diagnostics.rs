//! Error types and diagnostics
//!
//! Fatal problems are [`QuireError`]s and abort the build. Everything else is
//! a [`Diagnostic`] collected while the build keeps going.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for quire operations
pub type QuireResult<T> = Result<T, QuireError>;

/// Fatal error raised by any pipeline stage
#[derive(Debug, Error)]
pub enum QuireError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// IO error tied to a path
    #[error("IO error on {path}: {source}")]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Header parse error
    #[error("Parse error in {file}:{line}:{col}: {message}")]
    Parse {
        file: PathBuf,
        line: usize,
        col: usize,
        message: String,
    },

    /// One or more headers failed to parse
    #[error("{count} header parse error(s); no output was written")]
    ParseFailed { count: usize },

    /// The intermediate extractor output is not available
    #[error("Extractor output not found at {0} (enable api.auto_extract or run `quire extract`)")]
    ExtractOutputMissing(PathBuf),

    /// Theme is neither built in nor provided by a template directory
    #[error("Unknown theme '{0}'")]
    UnknownTheme(String),

    /// A required template is missing
    #[error("Missing required template: {0}")]
    MissingTemplate(String),

    /// A required asset (logo, static file) is missing
    #[error("Missing required asset: {0}")]
    MissingAsset(PathBuf),

    /// Template rendering error
    #[error("Template error: {0}")]
    Template(String),

    /// Output directory cannot be written
    #[error("Output path not writable: {path}: {reason}")]
    OutputNotWritable { path: PathBuf, reason: String },

    /// Another build holds the lock
    #[error("Another build is running (lock file {0} exists; remove it if no build is active)")]
    BuildLocked(PathBuf),

    /// Generated page tree violates its structural invariants
    #[error("Page tree invariant violated: {0}")]
    TreeInvariant(String),

    /// Warnings were promoted to errors
    #[error("{0} warning(s) treated as errors; output was not published")]
    WarningsAsErrors(usize),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QuireError {
    /// Create a parse error with location
    pub fn parse_at(
        file: impl Into<PathBuf>,
        message: impl Into<String>,
        line: usize,
        col: usize,
    ) -> Self {
        QuireError::Parse {
            file: file.into(),
            message: message.into(),
            line,
            col,
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        QuireError::Config(message.into())
    }

    /// Attach a path to an IO error
    pub fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        QuireError::IoAt {
            path: path.into(),
            source,
        }
    }

    /// Create an output-not-writable error
    pub fn not_writable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        QuireError::OutputNotWritable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticSeverity {
    /// Error - the current stage fails once it has finished scanning
    Error,
    /// Warning - the build continues
    Warning,
    /// Info - informational message
    Info,
}

impl DiagnosticSeverity {
    /// Get display string
    pub fn display(&self) -> &'static str {
        match self {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Info => "info",
        }
    }

    /// Get ANSI color code
    pub fn color(&self) -> &'static str {
        match self {
            DiagnosticSeverity::Error => "\x1b[31m",   // Red
            DiagnosticSeverity::Warning => "\x1b[33m", // Yellow
            DiagnosticSeverity::Info => "\x1b[34m",    // Blue
        }
    }
}

/// Well-known diagnostic codes
pub mod codes {
    /// Cross-reference that matches no known target
    pub const BROKEN_REF: &str = "broken-ref";
    /// Document not reachable from the root document
    pub const ORPHAN_DOC: &str = "orphan-doc";
    /// Document listed by more than one toctree
    pub const MULTI_TOCTREE: &str = "multi-toctree";
    /// Toctree entry pointing at a missing document
    pub const MISSING_DOC: &str = "missing-doc";
    /// Theme option the theme does not understand
    pub const THEME_OPTION: &str = "theme-option";
    /// Configured directory that does not exist
    pub const MISSING_PATH: &str = "missing-path";
    /// Header syntax error
    pub const SYNTAX: &str = "syntax";
    /// Two symbols produced the same page
    pub const DUPLICATE: &str = "duplicate";
}

/// A diagnostic message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level
    pub severity: DiagnosticSeverity,
    /// Message
    pub message: String,
    /// Source file
    pub file: Option<PathBuf>,
    /// Line number (1-indexed)
    pub line: Option<usize>,
    /// Column number (1-indexed)
    pub col: Option<usize>,
    /// Diagnostic code (for categorization)
    pub code: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(severity: DiagnosticSeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            file: None,
            line: None,
            col: None,
            code: None,
        }
    }

    /// Create an error diagnostic
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Error, message)
    }

    /// Create a warning diagnostic
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Warning, message)
    }

    /// Create an info diagnostic
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Info, message)
    }

    /// Set the source file
    pub fn in_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Set the line only
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Set the location
    pub fn at(mut self, line: usize, col: usize) -> Self {
        self.line = Some(line);
        self.col = Some(col);
        self
    }

    /// Set the diagnostic code
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    fn location_prefix(&self) -> Option<String> {
        let file = self.file.as_ref()?;
        let mut result = file.display().to_string();
        if let Some(line) = self.line {
            result.push(':');
            result.push_str(&line.to_string());
            if let Some(col) = self.col {
                result.push(':');
                result.push_str(&col.to_string());
            }
        }
        Some(result)
    }

    /// Format the diagnostic for display
    pub fn format(&self) -> String {
        let mut result = String::new();

        if let Some(location) = self.location_prefix() {
            result.push_str(&location);
            result.push_str(": ");
        }

        result.push_str(self.severity.display());

        if let Some(ref code) = self.code {
            result.push('[');
            result.push_str(code);
            result.push(']');
        }

        result.push_str(": ");
        result.push_str(&self.message);

        result
    }

    /// Format with ANSI colors
    pub fn format_colored(&self) -> String {
        let mut result = String::new();
        let reset = "\x1b[0m";

        if let Some(location) = self.location_prefix() {
            result.push_str("\x1b[2m");
            result.push_str(&location);
            result.push_str(reset);
            result.push_str(": ");
        }

        result.push_str(self.severity.color());
        result.push_str(self.severity.display());
        result.push_str(reset);

        if let Some(ref code) = self.code {
            result.push_str("\x1b[2m[");
            result.push_str(code);
            result.push_str("]\x1b[0m");
        }

        result.push_str(": ");
        result.push_str(&self.message);

        result
    }
}

/// Collector for diagnostics during a build
///
/// Every diagnostic is forwarded to `tracing` the moment it is added, so the
/// build log shows problems in the order they were found.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticsCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticsCollector {
    /// Create a new collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic
    pub fn add(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            DiagnosticSeverity::Error => tracing::error!("{}", diagnostic.format()),
            DiagnosticSeverity::Warning => tracing::warn!("{}", diagnostic.format()),
            DiagnosticSeverity::Info => tracing::debug!("{}", diagnostic.format()),
        }
        self.diagnostics.push(diagnostic);
    }

    /// Add an error
    pub fn error(&mut self, message: impl Into<String>) {
        self.add(Diagnostic::error(message));
    }

    /// Add a warning
    pub fn warning(&mut self, message: impl Into<String>) {
        self.add(Diagnostic::warning(message));
    }

    /// Add an info message
    pub fn info(&mut self, message: impl Into<String>) {
        self.add(Diagnostic::info(message));
    }

    /// Move every diagnostic of another collector into this one
    pub fn absorb(&mut self, other: DiagnosticsCollector) {
        self.diagnostics.extend(other.diagnostics);
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == DiagnosticSeverity::Error)
    }

    /// Get all diagnostics
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Iterate over warnings only
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == DiagnosticSeverity::Warning)
    }

    /// Get error count
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == DiagnosticSeverity::Error)
            .count()
    }

    /// Get warning count
    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Print errors and warnings to stderr
    pub fn print(&self, colored: bool) {
        for diagnostic in &self.diagnostics {
            if diagnostic.severity == DiagnosticSeverity::Info {
                continue;
            }
            if colored {
                eprintln!("{}", diagnostic.format_colored());
            } else {
                eprintln!("{}", diagnostic.format());
            }
        }
    }

    /// Print summary
    pub fn print_summary(&self) {
        let errors = self.error_count();
        let warnings = self.warning_count();

        if errors > 0 || warnings > 0 {
            eprintln!("\n{} error(s), {} warning(s)", errors, warnings);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = QuireError::parse_at("error.hpp", "unbalanced '{'", 12, 3);
        let msg = err.to_string();
        assert!(msg.contains("error.hpp:12:3"));
        assert!(msg.contains("unbalanced"));
    }

    #[test]
    fn test_diagnostic() {
        let diag = Diagnostic::warning("unresolved reference 'foo'")
            .in_file("index.md")
            .at(10, 5)
            .with_code(codes::BROKEN_REF);

        assert_eq!(diag.severity, DiagnosticSeverity::Warning);
        assert_eq!(
            diag.format(),
            "index.md:10:5: warning[broken-ref]: unresolved reference 'foo'"
        );
    }

    #[test]
    fn test_diagnostic_without_location() {
        let diag = Diagnostic::info("42 symbols");
        assert_eq!(diag.format(), "info: 42 symbols");
    }

    #[test]
    fn test_diagnostics_collector() {
        let mut collector = DiagnosticsCollector::new();
        collector.error("error 1");
        collector.warning("warning 1");
        collector.info("info 1");

        assert!(collector.has_errors());
        assert_eq!(collector.error_count(), 1);
        assert_eq!(collector.warning_count(), 1);
        assert_eq!(collector.diagnostics().len(), 3);

        let mut other = DiagnosticsCollector::new();
        other.warning("warning 2");
        collector.absorb(other);
        assert_eq!(collector.warning_count(), 2);
    }
}
