//! Compilation provider trait for attrprobe
//!
//! This module defines the `CompilationProvider` trait that lets any language
//! feed the attribute matchers. A provider turns source text into a
//! language-agnostic [`SyntaxTree`] and binds that tree against referenced
//! libraries into a [`Compilation`].
//!
//! # Architecture
//!
//! ```text
//! Source Code → [Provider::parse] → SyntaxTree ─┬→ SyntacticAttributeMatcher
//!                                               │
//!          Libraries → [Provider::compile] → Compilation → SemanticModel
//!                                                            └→ SemanticAttributeMatcher
//! ```
//!
//! Providers are responsible for:
//! - Parsing source code into the shared syntax model
//! - Describing their resolution rules (`LanguageRules`)
//! - Language-specific diagnostic formatting
//!
//! The shared binder is responsible for:
//! - Declaring source and library types
//! - Resolving imports, base types and attribute names
//! - Reporting diagnostics

use std::fmt;
use std::sync::Arc;

use crate::compilation::Compilation;
use crate::context::AnalysisContext;
use crate::diagnostics::Diagnostic;
use crate::library::Library;
use crate::syntax::SyntaxTree;

// ═══════════════════════════════════════════════════════════════════════
// ERROR TYPES
// ═══════════════════════════════════════════════════════════════════════

/// Error that occurred during parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Human-readable error message
    pub message: String,

    /// Optional source location
    pub location: Option<SourceLocation>,

    /// Optional source snippet for context
    pub snippet: Option<String>,
}

impl ParseError {
    /// Create a new parse error with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            snippet: None,
        }
    }

    /// Add location information to the error.
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Add a source snippet for context.
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parse error: {}", self.message)?;
        if let Some(loc) = &self.location {
            write!(f, " at {}", loc)?;
        }
        if let Some(snippet) = &self.snippet {
            write!(f, "\n{}", snippet)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Source code location for error reporting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    /// File name or identifier
    pub file: String,

    /// Line number (1-indexed)
    pub line: usize,

    /// Column number (1-indexed)
    pub column: usize,
}

impl SourceLocation {
    /// Create a new source location.
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// LANGUAGE RULES
// ═══════════════════════════════════════════════════════════════════════

/// Name resolution policy a provider hands to the shared binder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageRules {
    /// Suffix also tried when binding an attribute name (`Foo` → `FooAttribute`)
    pub attribute_suffix: Option<&'static str>,

    /// Fully qualified type every attribute class must derive from
    pub attribute_base: Option<&'static str>,

    /// Attribute names that resolve without any reference
    pub builtin_attributes: &'static [&'static str],

    /// Namespace built-in attributes live in
    pub builtin_namespace: &'static str,

    /// Whether names declared or imported in enclosing namespaces are visible
    pub outer_scopes_visible: bool,

    /// Separator used when rendering qualified names in messages
    pub path_separator: &'static str,
}

impl LanguageRules {
    /// Render path segments with this language's separator.
    pub fn render<S: AsRef<str>>(&self, segments: &[S]) -> String {
        segments
            .iter()
            .map(|s| s.as_ref())
            .collect::<Vec<_>>()
            .join(self.path_separator)
    }

    /// Whether `name` is a built-in attribute.
    pub fn is_builtin_attribute(&self, name: &str) -> bool {
        self.builtin_attributes.contains(&name)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// COMPILATION PROVIDER TRAIT
// ═══════════════════════════════════════════════════════════════════════

/// Compilation provider interface.
///
/// This trait is the only boundary the matchers depend on. A provider parses
/// source into the shared syntax model and compiles that model against a set
/// of referenced libraries. Compilation is shared: the default `compile`
/// runs the language-agnostic binder parameterised by [`LanguageRules`].
///
/// # Example Implementation
///
/// ```rust,ignore
/// use attrprobe::{AnalysisContext, CompilationProvider, LanguageRules, ParseError, SyntaxTree};
///
/// struct NullProvider;
///
/// impl CompilationProvider for NullProvider {
///     fn parse(&self, _source: &str, ctx: &AnalysisContext) -> Result<SyntaxTree, ParseError> {
///         Ok(SyntaxTree::new(&ctx.file_name, "Null", vec![]))
///     }
///
///     fn rules(&self) -> &LanguageRules {
///         &attrprobe::frontends::CSHARP_RULES
///     }
///
///     fn name(&self) -> &str {
///         "Null"
///     }
///
///     fn file_extension(&self) -> &str {
///         "null"
///     }
/// }
/// ```
pub trait CompilationProvider: Send + Sync {
    /// Parse source code into a syntax tree.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the source cannot be parsed or nests deeper
    /// than `ctx.max_nesting_depth`.
    fn parse(&self, source: &str, ctx: &AnalysisContext) -> Result<SyntaxTree, ParseError>;

    /// Resolution rules for this language.
    fn rules(&self) -> &LanguageRules;

    /// Bind a syntax tree against referenced libraries.
    ///
    /// Never fails: problems are reported as diagnostics on the returned
    /// compilation.
    fn compile(
        &self,
        tree: Arc<SyntaxTree>,
        references: &[Library],
        ctx: &AnalysisContext,
    ) -> Compilation {
        Compilation::create(tree, references, self.rules(), ctx)
    }

    /// Format a diagnostic in a language-appropriate style.
    fn format_diagnostic(&self, diagnostic: &Diagnostic, _source: &str) -> String {
        diagnostic.to_string()
    }

    /// Return the name of this provider.
    ///
    /// Examples: "C#", "Rust"
    fn name(&self) -> &str;

    /// Return the file extension for this language.
    ///
    /// Examples: "cs", "rs"
    fn file_extension(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_creation() {
        let err = ParseError::new("unexpected token");
        assert_eq!(err.message, "unexpected token");
        assert!(err.location.is_none());
        assert!(err.snippet.is_none());
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("unexpected token")
            .with_location(SourceLocation::new("test.cs", 10, 5))
            .with_snippet("[DataContract");
        let display = format!("{}", err);
        assert!(display.contains("Parse error"));
        assert!(display.contains("unexpected token"));
        assert!(display.contains("test.cs:10:5"));
        assert!(display.ends_with("[DataContract"));
    }

    #[test]
    fn test_source_location_display() {
        let loc = SourceLocation::new("lib.rs", 42, 10);
        assert_eq!(loc.to_string(), "lib.rs:42:10");
    }

    #[test]
    fn test_rules_render() {
        let rules = crate::frontends::RUST_RULES.clone();
        assert_eq!(rules.render(&["serde", "Serialize"]), "serde::Serialize");
        assert!(rules.is_builtin_attribute("derive"));
        assert!(!rules.is_builtin_attribute("Serialize"));
    }
}
