//! Compilations and their semantic models

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::binder::Binder;
use crate::context::AnalysisContext;
use crate::diagnostics::Diagnostic;
use crate::error::{AttrProbeError, Result};
use crate::frontend::LanguageRules;
use crate::library::Library;
use crate::names::split_path;
use crate::symbols::{NamedType, TypeSymbol};
use crate::syntax::{DeclId, SyntaxTree, TypeDecl};

/// A syntax tree bound against a set of referenced libraries.
///
/// Immutable once created; share it across threads behind an `Arc` if
/// needed. Binding problems never abort creation, they are recorded as
/// [`Diagnostic`]s.
#[derive(Debug, Clone)]
pub struct Compilation {
    tree: Arc<SyntaxTree>,
    assembly_name: String,
    references: Vec<String>,
    warnings_as_errors: bool,
    symbols: IndexMap<DeclId, TypeSymbol>,
    types: IndexMap<String, NamedType>,
    namespaces: HashSet<String>,
    diagnostics: Vec<Diagnostic>,
}

impl Compilation {
    /// Bind `tree` against `references` using `rules`.
    pub fn create(
        tree: Arc<SyntaxTree>,
        references: &[Library],
        rules: &LanguageRules,
        ctx: &AnalysisContext,
    ) -> Self {
        let output = Binder::new(rules).bind(&tree, references);
        let compilation = Self {
            assembly_name: ctx.assembly_name.clone(),
            references: references.iter().map(|lib| lib.name.clone()).collect(),
            warnings_as_errors: ctx.warnings_as_errors,
            symbols: output.symbols,
            types: output.types,
            namespaces: output.namespaces,
            diagnostics: output.diagnostics,
            tree,
        };
        debug!(
            assembly = %compilation.assembly_name,
            file = %compilation.tree.file_name(),
            references = compilation.references.len(),
            symbols = compilation.symbols.len(),
            diagnostics = compilation.diagnostics.len(),
            "compiled syntax tree"
        );
        compilation
    }

    /// The compiled tree.
    pub fn syntax_tree(&self) -> &SyntaxTree {
        &self.tree
    }

    /// Shared handle to the compiled tree.
    pub fn syntax_tree_arc(&self) -> Arc<SyntaxTree> {
        Arc::clone(&self.tree)
    }

    /// Compilation name.
    pub fn assembly_name(&self) -> &str {
        &self.assembly_name
    }

    /// Names of the referenced libraries, in reference order.
    pub fn references(&self) -> &[String] {
        &self.references
    }

    /// Every diagnostic, in the order binding produced them.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Diagnostics that count as errors under this compilation's settings.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        let promote = self.warnings_as_errors;
        self.diagnostics
            .iter()
            .filter(move |diag| diag.is_error(promote))
    }

    /// Whether any diagnostic counts as an error.
    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Fail when the compilation has errors.
    ///
    /// # Errors
    ///
    /// Returns `CompilationFailed` carrying the error count and the first error.
    pub fn ensure_success(&self) -> Result<()> {
        let mut errors = self.errors();
        match errors.next() {
            None => Ok(()),
            Some(first) => Err(AttrProbeError::CompilationFailed {
                errors: 1 + errors.count(),
                first: first.to_string(),
            }),
        }
    }

    /// Semantic model over this compilation, errors or not.
    ///
    /// Resolution in the presence of errors is best effort; prefer
    /// [`Compilation::checked_semantic_model`] when results must be trusted.
    pub fn semantic_model(&self) -> SemanticModel<'_> {
        SemanticModel { compilation: self }
    }

    /// Semantic model, only if the compilation is error free.
    ///
    /// # Errors
    ///
    /// Returns `CompilationFailed` if any diagnostic counts as an error.
    pub fn checked_semantic_model(&self) -> Result<SemanticModel<'_>> {
        self.ensure_success()?;
        Ok(self.semantic_model())
    }

    /// Type with this fully qualified name (`.` or `::` separated), from source or references.
    pub fn get_type_by_metadata_name(&self, name: &str) -> Option<&NamedType> {
        self.types.get(&split_path(name).join("."))
    }

    /// Whether a namespace with this fully qualified name exists.
    pub fn contains_namespace(&self, name: &str) -> bool {
        self.namespaces.contains(&split_path(name).join("."))
    }
}

/// Read-only view answering symbol queries for one compilation.
#[derive(Debug, Clone, Copy)]
pub struct SemanticModel<'a> {
    compilation: &'a Compilation,
}

impl<'a> SemanticModel<'a> {
    /// The compilation this model reads from.
    pub fn compilation(&self) -> &'a Compilation {
        self.compilation
    }

    /// Symbol declared by `declaration`.
    ///
    /// Returns `None` when the declaration belongs to a different tree.
    pub fn resolve_declared_symbol(&self, declaration: &TypeDecl) -> Option<&'a TypeSymbol> {
        if declaration.id.tree() != self.compilation.tree.id() {
            return None;
        }
        self.compilation.symbols.get(&declaration.id)
    }

    /// Every declared symbol in declaration order.
    pub fn declared_symbols(&self) -> impl Iterator<Item = &'a TypeSymbol> {
        self.compilation.symbols.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticCode;
    use crate::frontend::CompilationProvider;
    use crate::frontends::CSharpFrontend;
    use crate::symbols::SymbolOrigin;
    use pretty_assertions::assert_eq;

    fn compile(source: &str, references: &[Library]) -> Compilation {
        let frontend = CSharpFrontend::new();
        let ctx = AnalysisContext::new();
        let tree = frontend.parse(source, &ctx).unwrap();
        frontend.compile(Arc::new(tree), references, &ctx)
    }

    fn codes(compilation: &Compilation) -> Vec<DiagnosticCode> {
        compilation.diagnostics().iter().map(|d| d.code).collect()
    }

    fn attribute_fqn(compilation: &Compilation, decl: &str) -> Vec<Option<String>> {
        let decl = compilation.syntax_tree().find_type_path(decl).unwrap();
        compilation
            .semantic_model()
            .resolve_declared_symbol(decl)
            .unwrap()
            .attributes()
            .iter()
            .map(|a| a.attribute_class().map(NamedType::fully_qualified_name))
            .collect()
    }

    #[test]
    fn test_clean_compilation() {
        let c = compile(
            "using System.Runtime.Serialization; [DataContract] class C {}",
            &[Library::system_serialization()],
        );
        assert!(!c.has_errors());
        assert!(c.ensure_success().is_ok());
        assert_eq!(
            attribute_fqn(&c, "C"),
            vec![Some(
                "System.Runtime.Serialization.DataContractAttribute".to_string()
            )]
        );
    }

    #[test]
    fn test_missing_reference_reports_import_and_attribute() {
        let c = compile("using System.Runtime.Serialization; [DataContract] class C {}", &[]);
        assert_eq!(
            codes(&c),
            vec![
                DiagnosticCode::UnresolvedImport,
                DiagnosticCode::UnresolvedAttribute
            ]
        );
        assert_eq!(attribute_fqn(&c, "C"), vec![None]);
        assert!(c.checked_semantic_model().is_err());
    }

    #[test]
    fn test_nested_namespace_sees_outer_types() {
        let c = compile(
            "namespace Acme { class MarkAttribute : System.Attribute {} namespace Models { [Mark] class C {} } }",
            &[Library::system_core()],
        );
        assert!(!c.has_errors(), "{:?}", c.diagnostics());
        assert_eq!(
            attribute_fqn(&c, "Acme.Models.C"),
            vec![Some("Acme.MarkAttribute".to_string())]
        );
    }

    #[test]
    fn test_nested_attribute_class_resolves_from_sibling() {
        let c = compile(
            "using System; class Outer { class TagAttribute : Attribute {} [Tag] class Inner {} }",
            &[Library::system_core()],
        );
        assert!(!c.has_errors(), "{:?}", c.diagnostics());
        assert_eq!(
            attribute_fqn(&c, "Outer.Inner"),
            vec![Some("Outer.TagAttribute".to_string())]
        );
    }

    #[test]
    fn test_both_spellings_are_ambiguous() {
        let c = compile(
            "using System; class X : Attribute {} class XAttribute : Attribute {} [X] class C {}",
            &[Library::system_core()],
        );
        assert_eq!(codes(&c), vec![DiagnosticCode::AmbiguousReference]);
        assert_eq!(attribute_fqn(&c, "C"), vec![None]);
    }

    #[test]
    fn test_plain_class_does_not_shadow_suffixed_attribute() {
        let c = compile(
            "using System; class X {} class XAttribute : Attribute {} [X] class C {}",
            &[Library::system_core()],
        );
        assert!(codes(&c).is_empty());
        assert_eq!(
            attribute_fqn(&c, "C"),
            vec![Some("XAttribute".to_string())]
        );
    }

    #[test]
    fn test_non_attribute_class_is_rejected() {
        let c = compile("class Plain {} [Plain] class C {}", &[Library::system_core()]);
        assert_eq!(codes(&c), vec![DiagnosticCode::NotAnAttribute]);
        assert_eq!(attribute_fqn(&c, "C"), vec![None]);
    }

    #[test]
    fn test_alias_import() {
        let c = compile(
            "using DC = System.Runtime.Serialization.DataContractAttribute; [DC] class C {}",
            &[Library::system_serialization()],
        );
        assert!(!c.has_errors(), "{:?}", c.diagnostics());
        assert_eq!(
            attribute_fqn(&c, "C"),
            vec![Some(
                "System.Runtime.Serialization.DataContractAttribute".to_string()
            )]
        );
    }

    #[test]
    fn test_fully_qualified_attribute_without_import() {
        let c = compile(
            "[System.Runtime.Serialization.DataContract] class C {}",
            &[Library::system_serialization()],
        );
        assert!(!c.has_errors());
        assert_eq!(
            attribute_fqn(&c, "C"),
            vec![Some(
                "System.Runtime.Serialization.DataContractAttribute".to_string()
            )]
        );
    }

    #[test]
    fn test_duplicate_type_and_import() {
        let c = compile("using System; using System; class C {} class C {}", &[Library::system_core()]);
        assert_eq!(
            codes(&c),
            vec![DiagnosticCode::DuplicateType, DiagnosticCode::DuplicateImport]
        );
        // Only the duplicate type is an error
        assert_eq!(c.errors().count(), 1);
    }

    #[test]
    fn test_warnings_as_errors() {
        let frontend = CSharpFrontend::new();
        let ctx = AnalysisContext::new().with_warnings_as_errors(true);
        let tree = frontend.parse("using System; using System; class C {}", &ctx).unwrap();
        let c = frontend.compile(Arc::new(tree), &[Library::system_core()], &ctx);
        assert!(c.has_errors());
    }

    #[test]
    fn test_unresolved_base_type() {
        let c = compile("class DataContract : Attribute {}", &[]);
        assert_eq!(codes(&c), vec![DiagnosticCode::UnresolvedBaseType]);
    }

    #[test]
    fn test_base_type_recorded() {
        let c = compile("using System; class A : Attribute {}", &[Library::system_core()]);
        let decl = c.syntax_tree().find_type("A").unwrap();
        let symbol = c.semantic_model().resolve_declared_symbol(decl).unwrap();
        assert_eq!(
            symbol.base_type().map(NamedType::fully_qualified_name),
            Some("System.Attribute".to_string())
        );
        assert_eq!(symbol.named_type().origin(), &SymbolOrigin::Source);
    }

    #[test]
    fn test_foreign_declaration_is_not_resolved() {
        let a = compile("class C {}", &[]);
        let b = compile("class C {}", &[]);
        let foreign = b.syntax_tree().find_type("C").unwrap();
        assert!(a.semantic_model().resolve_declared_symbol(foreign).is_none());
    }

    #[test]
    fn test_metadata_lookup() {
        let c = compile("namespace N { class C {} }", &[Library::system_core()]);
        assert!(c.get_type_by_metadata_name("N.C").is_some());
        assert!(c.get_type_by_metadata_name("System::Attribute").is_some());
        assert!(c.get_type_by_metadata_name("C").is_none());
        assert!(c.contains_namespace("System"));
        assert!(c.contains_namespace("N"));
        assert_eq!(c.references(), &["System.Runtime".to_string()]);
    }
}
