//! Compilation diagnostics

use std::fmt;

use crate::frontend::SourceLocation;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// Informational
    Info,
    /// Suspicious but accepted
    Warning,
    /// Semantic results must not be trusted
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// Stable diagnostic identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    /// An attribute name binds to no type
    UnresolvedAttribute,
    /// An import names no known namespace or type
    UnresolvedImport,
    /// A base type binds to no type
    UnresolvedBaseType,
    /// An attribute binds to a type that is not an attribute class
    NotAnAttribute,
    /// A name binds to more than one type
    AmbiguousReference,
    /// Two declarations share a fully qualified name
    DuplicateType,
    /// The same import appears twice in one scope
    DuplicateImport,
}

impl DiagnosticCode {
    /// Short code (`AP0001`).
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::UnresolvedAttribute => "AP0001",
            DiagnosticCode::UnresolvedImport => "AP0002",
            DiagnosticCode::UnresolvedBaseType => "AP0003",
            DiagnosticCode::NotAnAttribute => "AP0004",
            DiagnosticCode::AmbiguousReference => "AP0005",
            DiagnosticCode::DuplicateType => "AP0006",
            DiagnosticCode::DuplicateImport => "AP0007",
        }
    }

    /// Severity this code is reported with.
    pub fn default_severity(&self) -> Severity {
        match self {
            DiagnosticCode::DuplicateImport => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A problem found while binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity
    pub severity: Severity,

    /// Stable identifier
    pub code: DiagnosticCode,

    /// Human-readable message
    pub message: String,

    /// Where the problem is
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    /// Create a diagnostic with the code's default severity.
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: code.default_severity(),
            code,
            message: message.into(),
            location: None,
        }
    }

    /// Add location information.
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Whether this is an error, optionally promoting warnings.
    pub fn is_error(&self, warnings_as_errors: bool) -> bool {
        match self.severity {
            Severity::Error => true,
            Severity::Warning => warnings_as_errors,
            Severity::Info => false,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(loc) = &self.location {
            write!(f, "{}: ", loc)?;
        }
        write!(f, "{} {}: {}", self.severity, self.code, self.message)
    }
}
