//! Resolved symbols exposed by a semantic model

use std::fmt;

use crate::frontend::SourceLocation;
use crate::syntax::{DeclId, DeclKind};

/// Where a named type comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolOrigin {
    /// Declared in the compiled source
    Source,
    /// Provided by a referenced library
    Library(String),
    /// Known to the language without any reference
    Builtin,
}

/// Identity of a resolved type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedType {
    namespace: Vec<String>,
    containing_types: Vec<String>,
    name: String,
    kind: DeclKind,
    origin: SymbolOrigin,
}

impl NamedType {
    /// Create a type identity.
    pub fn new(
        namespace: Vec<String>,
        containing_types: Vec<String>,
        name: impl Into<String>,
        kind: DeclKind,
        origin: SymbolOrigin,
    ) -> Self {
        Self {
            namespace,
            containing_types,
            name: name.into(),
            kind,
            origin,
        }
    }

    /// Namespace segments, outermost first.
    pub fn namespace(&self) -> &[String] {
        &self.namespace
    }

    /// Enclosing type names, outermost first.
    pub fn containing_types(&self) -> &[String] {
        &self.containing_types
    }

    /// Simple name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declaration kind.
    pub fn kind(&self) -> DeclKind {
        self.kind
    }

    /// Where the type comes from.
    pub fn origin(&self) -> &SymbolOrigin {
        &self.origin
    }

    /// Namespace, containing types and name as one segment list.
    pub fn qualified_segments(&self) -> Vec<&str> {
        self.namespace
            .iter()
            .chain(&self.containing_types)
            .map(String::as_str)
            .chain(std::iter::once(self.name.as_str()))
            .collect()
    }

    /// Canonical fully qualified name, `.`-separated
    /// (`System.Runtime.Serialization.DataContractAttribute`).
    pub fn fully_qualified_name(&self) -> String {
        self.qualified_segments().join(".")
    }
}

impl fmt::Display for NamedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fully_qualified_name())
    }
}

/// One attribute attached to a declared type, after binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeData {
    written_name: String,
    attribute_class: Option<NamedType>,
    location: SourceLocation,
}

impl AttributeData {
    pub(crate) fn new(
        written_name: impl Into<String>,
        attribute_class: Option<NamedType>,
        location: SourceLocation,
    ) -> Self {
        Self {
            written_name: written_name.into(),
            attribute_class,
            location,
        }
    }

    /// The name as written in source.
    pub fn written_name(&self) -> &str {
        &self.written_name
    }

    /// The resolved attribute class, or `None` when binding failed.
    pub fn attribute_class(&self) -> Option<&NamedType> {
        self.attribute_class.as_ref()
    }

    /// Where the attribute is written.
    pub fn location(&self) -> &SourceLocation {
        &self.location
    }
}

/// A declared type as seen by the semantic model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSymbol {
    declaration: DeclId,
    named: NamedType,
    base_type: Option<NamedType>,
    attributes: Vec<AttributeData>,
}

impl TypeSymbol {
    pub(crate) fn new(
        declaration: DeclId,
        named: NamedType,
        base_type: Option<NamedType>,
        attributes: Vec<AttributeData>,
    ) -> Self {
        Self {
            declaration,
            named,
            base_type,
            attributes,
        }
    }

    /// Declaration this symbol was bound from.
    pub fn declaration(&self) -> DeclId {
        self.declaration
    }

    /// Identity of the type.
    pub fn named_type(&self) -> &NamedType {
        &self.named
    }

    /// Simple name.
    pub fn name(&self) -> &str {
        self.named.name()
    }

    /// Canonical fully qualified name.
    pub fn fully_qualified_name(&self) -> String {
        self.named.fully_qualified_name()
    }

    /// Resolved base class, if any.
    pub fn base_type(&self) -> Option<&NamedType> {
        self.base_type.as_ref()
    }

    /// Attributes in source order, resolved or not.
    pub fn attributes(&self) -> &[AttributeData] {
        &self.attributes
    }
}
