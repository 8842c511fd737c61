//! Language-agnostic syntax model produced by providers
//!
//! Trees are finite tagged variants: an [`Item`] is an import, a namespace or
//! a type declaration, and every [`TypeDecl`] carries its own attribute lists
//! and nested member declarations. Nothing here is filtered by runtime kind.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::frontend::SourceLocation;
use crate::names::split_path;

static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one parsed tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeId(u64);

impl TreeId {
    /// Allocate an identity no other tree in this process has.
    pub fn fresh() -> Self {
        Self(NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Identity of one declaration within one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclId {
    tree: TreeId,
    index: u32,
}

impl DeclId {
    /// Tree this declaration belongs to.
    pub fn tree(&self) -> TreeId {
        self.tree
    }

    /// Position in declaration order.
    pub fn index(&self) -> u32 {
        self.index
    }
}

/// Hands out declaration ids while a provider builds a tree.
#[derive(Debug)]
pub struct DeclIdAllocator {
    tree: TreeId,
    next: u32,
}

impl DeclIdAllocator {
    /// Start allocating ids for a fresh tree.
    pub fn new() -> Self {
        Self {
            tree: TreeId::fresh(),
            next: 0,
        }
    }

    /// The tree every allocated id belongs to.
    pub fn tree(&self) -> TreeId {
        self.tree
    }

    /// Next declaration id.
    pub fn next_id(&mut self) -> DeclId {
        let id = DeclId {
            tree: self.tree,
            index: self.next,
        };
        self.next += 1;
        id
    }
}

impl Default for DeclIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// A possibly qualified name as written (`DataContract`, `global::System.Attribute`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedPath {
    /// Whether the path is anchored at the global namespace
    pub absolute: bool,

    /// Name segments, outermost first
    pub segments: Vec<String>,
}

impl QualifiedPath {
    /// A path resolved relative to the enclosing scopes.
    pub fn relative(segments: Vec<String>) -> Self {
        Self {
            absolute: false,
            segments,
        }
    }

    /// A path anchored at the global namespace.
    pub fn absolute(segments: Vec<String>) -> Self {
        Self {
            absolute: true,
            segments,
        }
    }

    /// Whether this is a single unanchored identifier.
    pub fn is_simple(&self) -> bool {
        !self.absolute && self.segments.len() == 1
    }

    /// The last segment.
    pub fn last(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }
}

impl fmt::Display for QualifiedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Kind of a type-like declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    /// `class`
    #[default]
    Class,
    /// `struct`
    Struct,
    /// `interface`
    Interface,
    /// `enum`
    Enum,
    /// `record`
    Record,
    /// `trait`
    Trait,
    /// `union`
    Union,
    /// `fn` (attribute macros are functions)
    Function,
}

impl DeclKind {
    /// Keyword-like name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclKind::Class => "class",
            DeclKind::Struct => "struct",
            DeclKind::Interface => "interface",
            DeclKind::Enum => "enum",
            DeclKind::Record => "record",
            DeclKind::Trait => "trait",
            DeclKind::Union => "union",
            DeclKind::Function => "fn",
        }
    }

    /// Whether this kind can act as a base class.
    pub fn is_class_like(&self) -> bool {
        matches!(self, DeclKind::Class | DeclKind::Record)
    }
}

/// One attribute usage as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSyntax {
    /// Name text exactly as it appears in source, whitespace included
    pub name: String,

    /// Parsed name segments
    pub path: QualifiedPath,

    /// Raw argument text, if the attribute has an argument list
    pub arguments: Option<String>,

    /// Where the attribute name starts
    pub location: SourceLocation,
}

/// A bracketed group of attributes (`[A, B]` or a single `#[a]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeList {
    /// Explicit target (`type:`, `return:`), if any
    pub target: Option<String>,

    /// Attributes in source order
    pub attributes: Vec<AttributeSyntax>,

    /// Where the list opens
    pub location: SourceLocation,
}

/// A type-like declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    /// Identity within the owning tree
    pub id: DeclId,

    /// Declaration kind
    pub kind: DeclKind,

    /// Declared name (without generic parameters)
    pub name: String,

    /// Attribute lists attached directly to this declaration
    pub attribute_lists: Vec<AttributeList>,

    /// Base types as written
    pub bases: Vec<QualifiedPath>,

    /// Nested type declarations
    pub members: Vec<TypeDecl>,

    /// Where the declaration name appears
    pub location: SourceLocation,
}

impl TypeDecl {
    /// Attributes attached directly to this declaration, across all lists.
    pub fn attributes(&self) -> impl Iterator<Item = &AttributeSyntax> {
        self.attribute_lists
            .iter()
            .flat_map(|list| list.attributes.iter())
    }

    /// Whether any attribute is attached directly to this declaration.
    pub fn has_attributes(&self) -> bool {
        self.attributes().next().is_some()
    }
}

/// What an import brings into scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImportKind {
    /// Every member of a namespace (`using System;`, `use serde::*;`)
    Namespace(QualifiedPath),

    /// A single name under an alias (`using A = X.Y;`, `use serde::Serialize;`)
    Alias {
        /// Name introduced into scope
        alias: String,
        /// What it stands for
        target: QualifiedPath,
    },
}

/// An import directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDirective {
    /// What is imported
    pub kind: ImportKind,

    /// Where the directive starts
    pub location: SourceLocation,
}

/// A namespace (or module) body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDecl {
    /// Name relative to the enclosing namespace
    pub name: QualifiedPath,

    /// Contents
    pub items: Vec<Item>,

    /// Where the declaration starts
    pub location: SourceLocation,
}

/// A top-level or namespace-level item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// Import directive
    Import(ImportDirective),
    /// Namespace body
    Namespace(NamespaceDecl),
    /// Type declaration
    Type(TypeDecl),
}

/// A parsed source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    id: TreeId,
    file_name: String,
    language: String,
    items: Vec<Item>,
}

impl SyntaxTree {
    /// Assemble a tree. `id` must be the tree every `DeclId` in `items` was allocated for.
    pub fn from_parts(
        id: TreeId,
        file_name: impl Into<String>,
        language: impl Into<String>,
        items: Vec<Item>,
    ) -> Self {
        Self {
            id,
            file_name: file_name.into(),
            language: language.into(),
            items,
        }
    }

    /// A tree with a fresh identity and the given items.
    pub fn new(file_name: impl Into<String>, language: impl Into<String>, items: Vec<Item>) -> Self {
        Self::from_parts(TreeId::fresh(), file_name, language, items)
    }

    /// Tree identity.
    pub fn id(&self) -> TreeId {
        self.id
    }

    /// File the tree was parsed from.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Name of the provider that produced the tree.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Top-level items.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Every type declaration, depth-first in source order.
    pub fn types(&self) -> Vec<&TypeDecl> {
        let mut out = Vec::new();
        self.walk(|_, decl| out.push(decl));
        out
    }

    /// First declaration (depth-first) with this simple name.
    pub fn find_type(&self, name: &str) -> Option<&TypeDecl> {
        self.types().into_iter().find(|decl| decl.name == name)
    }

    /// Declaration at a qualified path such as `Ns.Outer.Inner` or `models::User`.
    pub fn find_type_path(&self, path: &str) -> Option<&TypeDecl> {
        let wanted = split_path(path);
        let mut found = None;
        self.walk(|qualified, decl| {
            if found.is_none() && qualified == wanted.as_slice() {
                found = Some(decl);
            }
        });
        found
    }

    /// Visit every type declaration with its fully qualified segments.
    pub fn walk<'a, F>(&'a self, mut visit: F)
    where
        F: FnMut(&[String], &'a TypeDecl),
    {
        let mut prefix = Vec::new();
        walk_items(&self.items, &mut prefix, &mut visit);
    }
}

fn walk_items<'a, F>(items: &'a [Item], prefix: &mut Vec<String>, visit: &mut F)
where
    F: FnMut(&[String], &'a TypeDecl),
{
    for item in items {
        match item {
            Item::Import(_) => {}
            Item::Namespace(ns) => {
                let depth = prefix.len();
                prefix.extend(ns.name.segments.iter().cloned());
                walk_items(&ns.items, prefix, visit);
                prefix.truncate(depth);
            }
            Item::Type(decl) => walk_type(decl, prefix, visit),
        }
    }
}

fn walk_type<'a, F>(decl: &'a TypeDecl, prefix: &mut Vec<String>, visit: &mut F)
where
    F: FnMut(&[String], &'a TypeDecl),
{
    prefix.push(decl.name.clone());
    visit(prefix, decl);
    for member in &decl.members {
        walk_type(member, prefix, visit);
    }
    prefix.pop();
}
