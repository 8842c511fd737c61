//! Attribute presence matchers
//!
//! Two independent leaf queries over provider outputs:
//!
//! - [`SyntacticAttributeMatcher`] looks at attribute names as written on a
//!   [`TypeDecl`]. Cheap and reference-free, but any attribute sharing the
//!   short name matches.
//! - [`SemanticAttributeMatcher`] looks at the resolved attribute classes of a
//!   [`TypeSymbol`]. Precise, but attributes whose class failed to resolve
//!   never match.
//!
//! Both are stateless, borrow their inputs only for the duration of a call
//! and are safe to share across threads.

use crate::error::Result;
use crate::names::{normalize_name, QualifiedName, ShortName};
use crate::symbols::TypeSymbol;
use crate::syntax::TypeDecl;

/// Matches attributes by the name written in source.
///
/// A declaration matches `N` when one of its own attributes, with whitespace
/// removed, reads exactly `N` or `NAttribute`. Comparison is case-sensitive
/// and qualified spellings (`System.Runtime.Serialization.DataContract`) do
/// not match a short name.
///
/// # Example
///
/// ```
/// use attrprobe::frontends::CSharpFrontend;
/// use attrprobe::{AnalysisContext, CompilationProvider, ShortName, SyntacticAttributeMatcher};
///
/// let tree = CSharpFrontend::new()
///     .parse("[DataContractAttribute] class C {}", &AnalysisContext::new())
///     .unwrap();
/// let decl = tree.find_type("C").unwrap();
/// let matcher = SyntacticAttributeMatcher::new();
/// assert!(matcher.matches(decl, &ShortName::new("DataContract").unwrap()));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntacticAttributeMatcher;

impl SyntacticAttributeMatcher {
    /// Create a matcher.
    pub fn new() -> Self {
        Self
    }

    /// Whether `declaration` directly carries an attribute spelled `target`.
    ///
    /// Attributes of nested member declarations are not considered.
    pub fn matches(&self, declaration: &TypeDecl, target: &ShortName) -> bool {
        declaration
            .attributes()
            .any(|attr| target.matches(&normalize_name(&attr.name)))
    }

    /// [`matches`](Self::matches) with an unvalidated target name.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when `target` is not a valid short name.
    pub fn matches_str(&self, declaration: &TypeDecl, target: &str) -> Result<bool> {
        Ok(self.matches(declaration, &ShortName::new(target)?))
    }
}

/// Matches attributes by the fully qualified name of their resolved class.
///
/// The comparison is exact and includes the `Attribute` suffix:
/// `System.Runtime.Serialization.DataContractAttribute` matches, while
/// `System.Runtime.Serialization.DataContract` does not. `.` and `::`
/// separated targets are equivalent.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemanticAttributeMatcher;

impl SemanticAttributeMatcher {
    /// Create a matcher.
    pub fn new() -> Self {
        Self
    }

    /// Whether `symbol` carries a resolved attribute of class `target`.
    pub fn matches(&self, symbol: &TypeSymbol, target: &QualifiedName) -> bool {
        symbol
            .attributes()
            .iter()
            .filter_map(|attr| attr.attribute_class())
            .any(|class| target.matches_segments(&class.qualified_segments()))
    }

    /// [`matches`](Self::matches) with an unvalidated target name.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when `target` is not a valid qualified name.
    pub fn matches_str(&self, symbol: &TypeSymbol, target: &str) -> Result<bool> {
        Ok(self.matches(symbol, &QualifiedName::new(target)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AttrProbeError;
    use crate::frontend::SourceLocation;
    use crate::symbols::{AttributeData, NamedType, SymbolOrigin};
    use crate::syntax::{AttributeList, AttributeSyntax, DeclIdAllocator, DeclKind, QualifiedPath};

    fn loc() -> SourceLocation {
        SourceLocation::new("test", 1, 1)
    }

    fn attribute(name: &str) -> AttributeSyntax {
        AttributeSyntax {
            name: name.to_string(),
            path: QualifiedPath::relative(
                name.split('.').map(|s| s.trim().to_string()).collect(),
            ),
            arguments: None,
            location: loc(),
        }
    }

    fn decl(ids: &mut DeclIdAllocator, attrs: &[&str], members: Vec<TypeDecl>) -> TypeDecl {
        TypeDecl {
            id: ids.next_id(),
            kind: DeclKind::Class,
            name: "C".to_string(),
            attribute_lists: attrs
                .iter()
                .map(|name| AttributeList {
                    target: None,
                    attributes: vec![attribute(name)],
                    location: loc(),
                })
                .collect(),
            bases: vec![],
            members,
            location: loc(),
        }
    }

    fn short(name: &str) -> ShortName {
        ShortName::new(name).unwrap()
    }

    fn named(namespace: &[&str], name: &str) -> NamedType {
        NamedType::new(
            namespace.iter().map(|s| s.to_string()).collect(),
            vec![],
            name,
            DeclKind::Class,
            SymbolOrigin::Library("test".into()),
        )
    }

    fn symbol(classes: Vec<Option<NamedType>>) -> TypeSymbol {
        let mut ids = DeclIdAllocator::new();
        let attributes = classes
            .into_iter()
            .map(|class| AttributeData::new("written", class, loc()))
            .collect();
        TypeSymbol::new(ids.next_id(), named(&[], "C"), None, attributes)
    }

    #[test]
    fn test_syntactic_short_and_suffixed_names() {
        let mut ids = DeclIdAllocator::new();
        let matcher = SyntacticAttributeMatcher::new();
        assert!(matcher.matches(&decl(&mut ids, &["DataContract"], vec![]), &short("DataContract")));
        assert!(matcher.matches(
            &decl(&mut ids, &["DataContractAttribute"], vec![]),
            &short("DataContract")
        ));
        assert!(matcher.matches(
            &decl(&mut ids, &["DataContractAttribute"], vec![]),
            &short("DataContractAttribute")
        ));
    }

    #[test]
    fn test_syntactic_is_case_sensitive_and_exact() {
        let mut ids = DeclIdAllocator::new();
        let matcher = SyntacticAttributeMatcher::new();
        let d = decl(&mut ids, &["datacontract", "DataContractish", "Data"], vec![]);
        assert!(!matcher.matches(&d, &short("DataContract")));
        let d = decl(&mut ids, &["System.Runtime.Serialization.DataContract"], vec![]);
        assert!(!matcher.matches(&d, &short("DataContract")));
    }

    #[test]
    fn test_syntactic_normalizes_whitespace() {
        let mut ids = DeclIdAllocator::new();
        let matcher = SyntacticAttributeMatcher::new();
        let d = decl(&mut ids, &["System .\n  Runtime.DataContract"], vec![]);
        assert!(matcher.matches_str(&d, "System.Runtime.DataContract").unwrap());
    }

    #[test]
    fn test_syntactic_ignores_nested_declarations() {
        let mut ids = DeclIdAllocator::new();
        let matcher = SyntacticAttributeMatcher::new();
        let inner = decl(&mut ids, &["DataContract"], vec![]);
        let outer = decl(&mut ids, &[], vec![inner]);
        assert!(!matcher.matches(&outer, &short("DataContract")));
        assert!(matcher.matches(&outer.members[0], &short("DataContract")));
    }

    #[test]
    fn test_syntactic_no_attributes() {
        let mut ids = DeclIdAllocator::new();
        let d = decl(&mut ids, &[], vec![]);
        assert!(!SyntacticAttributeMatcher::new().matches(&d, &short("DataContract")));
    }

    #[test]
    fn test_syntactic_rejects_invalid_target() {
        let mut ids = DeclIdAllocator::new();
        let d = decl(&mut ids, &["DataContract"], vec![]);
        let matcher = SyntacticAttributeMatcher::new();
        assert!(matches!(
            matcher.matches_str(&d, ""),
            Err(AttrProbeError::InvalidArgument(_))
        ));
        assert!(matches!(
            matcher.matches_str(&d, "Data Contract"),
            Err(AttrProbeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_semantic_exact_qualified_name() {
        let sym = symbol(vec![Some(named(
            &["System", "Runtime", "Serialization"],
            "DataContractAttribute",
        ))]);
        let matcher = SemanticAttributeMatcher::new();
        assert!(matcher
            .matches_str(&sym, "System.Runtime.Serialization.DataContractAttribute")
            .unwrap());
        assert!(matcher
            .matches_str(&sym, "System::Runtime::Serialization::DataContractAttribute")
            .unwrap());
        assert!(!matcher
            .matches_str(&sym, "System.Runtime.Serialization.DataContract")
            .unwrap());
        assert!(!matcher.matches_str(&sym, "DataContractAttribute").unwrap());
    }

    #[test]
    fn test_semantic_skips_unresolved_attributes() {
        let sym = symbol(vec![None, Some(named(&[], "DataContractAttribute"))]);
        let matcher = SemanticAttributeMatcher::new();
        assert!(!matcher
            .matches_str(&sym, "System.Runtime.Serialization.DataContractAttribute")
            .unwrap());
        assert!(matcher.matches_str(&sym, "DataContractAttribute").unwrap());
    }

    #[test]
    fn test_semantic_no_attributes() {
        let sym = symbol(vec![]);
        assert!(!SemanticAttributeMatcher::new()
            .matches_str(&sym, "System.Attribute")
            .unwrap());
    }

    #[test]
    fn test_semantic_rejects_invalid_target() {
        let sym = symbol(vec![]);
        let matcher = SemanticAttributeMatcher::new();
        assert!(matcher.matches_str(&sym, "  ").is_err());
        assert!(matcher.matches_str(&sym, "System..Attribute").is_err());
    }

    #[test]
    fn test_matchers_are_idempotent() {
        let mut ids = DeclIdAllocator::new();
        let d = decl(&mut ids, &["DataContract"], vec![]);
        let syntactic = SyntacticAttributeMatcher::new();
        let first = syntactic.matches(&d, &short("DataContract"));
        assert_eq!(first, syntactic.matches(&d, &short("DataContract")));

        let sym = symbol(vec![Some(named(&["Acme"], "DataContract"))]);
        let target = QualifiedName::new("Acme.DataContract").unwrap();
        let semantic = SemanticAttributeMatcher::new();
        assert_eq!(semantic.matches(&sym, &target), semantic.matches(&sym, &target));
    }

    #[test]
    fn test_matchers_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyntacticAttributeMatcher>();
        assert_send_sync::<SemanticAttributeMatcher>();
    }
}
