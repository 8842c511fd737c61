//! # attrprobe
//!
//! Attribute presence queries over pluggable compilation providers.
//!
//! attrprobe answers one question: does a type declaration carry a given
//! attribute? It offers two answers with different precision:
//!
//! - [`SyntacticAttributeMatcher`] compares the attribute name as written
//!   (`DataContract` or `DataContractAttribute`), without resolving it.
//! - [`SemanticAttributeMatcher`] compares the fully qualified type the
//!   attribute resolves to in a [`Compilation`]
//!   (`System.Runtime.Serialization.DataContractAttribute`).
//!
//! ## Architecture
//!
//! - **Compilation Provider**: parse source into a language-agnostic
//!   [`SyntaxTree`] and bind it against referenced [`Library`] metadata
//! - **Binder**: shared name resolution parameterised by [`LanguageRules`]
//! - **Matchers**: stateless leaf queries over declarations and symbols
//! - **Sessions**: scoped provider leases from a [`ProviderRegistry`]
//!
//! ## Example
//!
//! ```
//! use attrprobe::frontends::CSharpFrontend;
//! use attrprobe::{
//!     AnalysisContext, CompilationProvider, Library, QualifiedName, SemanticAttributeMatcher,
//!     ShortName, SyntacticAttributeMatcher,
//! };
//! use std::sync::Arc;
//!
//! let frontend = CSharpFrontend::new();
//! let ctx = AnalysisContext::new();
//! let source = "using System.Runtime.Serialization; [DataContract] class C {}";
//! let tree = Arc::new(frontend.parse(source, &ctx).unwrap());
//! let decl = tree.find_type("C").unwrap();
//!
//! let short = ShortName::new("DataContract").unwrap();
//! assert!(SyntacticAttributeMatcher::new().matches(decl, &short));
//!
//! let compilation = frontend.compile(
//!     tree.clone(),
//!     &[Library::system_core(), Library::system_serialization()],
//!     &ctx,
//! );
//! let model = compilation.checked_semantic_model().unwrap();
//! let symbol = model.resolve_declared_symbol(decl).unwrap();
//! let target = QualifiedName::new("System.Runtime.Serialization.DataContractAttribute").unwrap();
//! assert!(SemanticAttributeMatcher::new().matches(symbol, &target));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod binder;
pub mod compilation;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod frontend;
pub mod frontends;
pub mod library;
pub mod matcher;
pub mod names;
pub mod session;
pub mod symbols;
pub mod syntax;

// Re-export main types
pub use compilation::{Compilation, SemanticModel};
pub use context::AnalysisContext;
pub use diagnostics::{Diagnostic, DiagnosticCode, Severity};
pub use error::{AttrProbeError, Result};
pub use frontend::{CompilationProvider, LanguageRules, ParseError, SourceLocation};
pub use library::{Library, LibraryType};
pub use matcher::{SemanticAttributeMatcher, SyntacticAttributeMatcher};
pub use names::{normalize_name, QualifiedName, ShortName, ATTRIBUTE_SUFFIX};
pub use session::{ProviderRegistry, Session};
pub use symbols::{AttributeData, NamedType, SymbolOrigin, TypeSymbol};
pub use syntax::{
    AttributeList, AttributeSyntax, DeclId, DeclIdAllocator, DeclKind, ImportDirective,
    ImportKind, Item, NamespaceDecl, QualifiedPath, SyntaxTree, TreeId, TypeDecl,
};

/// attrprobe version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
