//! Shared binder: declares types, then resolves imports, bases and attributes
//!
//! Binding runs in four passes over one tree:
//!
//! 1. declare library types, then source types (building the scope arena)
//! 2. resolve import directives per scope
//! 3. resolve base types of source declarations
//! 4. bind attribute names and build the declared symbols

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::trace;

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::frontend::{LanguageRules, SourceLocation};
use crate::library::Library;
use crate::symbols::{AttributeData, NamedType, SymbolOrigin, TypeSymbol};
use crate::syntax::{
    AttributeSyntax, DeclId, DeclKind, ImportDirective, ImportKind, Item, QualifiedPath,
    SyntaxTree, TypeDecl,
};

/// Everything a compilation keeps from binding.
pub(crate) struct BindOutput {
    pub symbols: IndexMap<DeclId, TypeSymbol>,
    pub types: IndexMap<String, NamedType>,
    pub namespaces: HashSet<String>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
enum ResolvedImport {
    Namespace(Vec<String>),
    Alias { alias: String, target: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BaseLink {
    None,
    Resolved(String),
    Unresolved,
}

#[derive(Debug)]
enum Resolution {
    Found(String),
    Ambiguous(Vec<String>),
    NotFound,
}

struct Scope<'t> {
    prefix: Vec<String>,
    parent: Option<usize>,
    imports: Vec<&'t ImportDirective>,
    resolved: Vec<ResolvedImport>,
}

struct PendingType<'t> {
    decl: &'t TypeDecl,
    named: NamedType,
    scope: usize,
    duplicate: bool,
}

fn key_of(segments: &[String]) -> String {
    segments.join(".")
}

fn joined(prefix: &[String], rest: &[String], last: &str) -> String {
    let mut segments: Vec<&str> = prefix.iter().chain(rest).map(String::as_str).collect();
    segments.push(last);
    segments.join(".")
}

pub(crate) struct Binder<'t, 'r> {
    rules: &'r LanguageRules,
    scopes: Vec<Scope<'t>>,
    pending: Vec<PendingType<'t>>,
    types: IndexMap<String, NamedType>,
    bases: HashMap<String, BaseLink>,
    namespaces: HashSet<String>,
    diagnostics: Vec<Diagnostic>,
}

impl<'t, 'r> Binder<'t, 'r> {
    pub fn new(rules: &'r LanguageRules) -> Self {
        let mut namespaces = HashSet::new();
        namespaces.insert(String::new());
        Self {
            rules,
            scopes: vec![Scope {
                prefix: Vec::new(),
                parent: None,
                imports: Vec::new(),
                resolved: Vec::new(),
            }],
            pending: Vec::new(),
            types: IndexMap::new(),
            bases: HashMap::new(),
            namespaces,
            diagnostics: Vec::new(),
        }
    }

    pub fn bind(mut self, tree: &'t SyntaxTree, references: &[Library]) -> BindOutput {
        for library in references {
            self.declare_library(library);
        }
        self.declare_items(tree.items(), 0);
        self.resolve_imports();
        self.resolve_bases();
        let symbols = self.bind_symbols();
        BindOutput {
            symbols,
            types: self.types,
            namespaces: self.namespaces,
            diagnostics: self.diagnostics,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Pass 1: declarations
    // ═══════════════════════════════════════════════════════════════════

    fn add_namespace(&mut self, segments: &[String]) {
        for end in 0..=segments.len() {
            self.namespaces.insert(key_of(&segments[..end]));
        }
    }

    fn push_scope(&mut self, prefix: Vec<String>, parent: usize) -> usize {
        self.scopes.push(Scope {
            prefix,
            parent: Some(parent),
            imports: Vec::new(),
            resolved: Vec::new(),
        });
        self.scopes.len() - 1
    }

    fn declare_library(&mut self, library: &Library) {
        for ty in &library.types {
            let namespace = ty.namespace_segments();
            self.add_namespace(&namespace);
            let named = NamedType::new(
                namespace,
                Vec::new(),
                ty.name.clone(),
                ty.kind,
                SymbolOrigin::Library(library.name.clone()),
            );
            let key = named.fully_qualified_name();
            // First reference to export a name wins
            if self.types.contains_key(&key) {
                continue;
            }
            let base = match ty.base_segments() {
                Some(segments) => BaseLink::Resolved(key_of(&segments)),
                None => BaseLink::None,
            };
            self.bases.insert(key.clone(), base);
            self.types.insert(key, named);
        }
    }

    fn declare_items(&mut self, items: &'t [Item], scope: usize) {
        for item in items {
            if let Item::Import(import) = item {
                self.scopes[scope].imports.push(import);
            }
        }
        for item in items {
            match item {
                Item::Import(_) => {}
                Item::Namespace(ns) => {
                    // `namespace A.B` opens one scope per segment
                    let mut current = scope;
                    for segment in &ns.name.segments {
                        let mut prefix = self.scopes[current].prefix.clone();
                        prefix.push(segment.clone());
                        self.add_namespace(&prefix);
                        current = self.push_scope(prefix, current);
                    }
                    self.declare_items(&ns.items, current);
                }
                Item::Type(decl) => {
                    let namespace = self.scopes[scope].prefix.clone();
                    self.declare_type(decl, &namespace, &[], scope);
                }
            }
        }
    }

    fn declare_type(
        &mut self,
        decl: &'t TypeDecl,
        namespace: &[String],
        containing: &[String],
        scope: usize,
    ) {
        let named = NamedType::new(
            namespace.to_vec(),
            containing.to_vec(),
            decl.name.clone(),
            decl.kind,
            SymbolOrigin::Source,
        );
        let key = named.fully_qualified_name();
        let duplicate = matches!(
            self.types.get(&key).map(NamedType::origin),
            Some(SymbolOrigin::Source)
        );
        if duplicate {
            let owner = if containing.is_empty() {
                self.rules.render(namespace)
            } else {
                let mut owner = namespace.to_vec();
                owner.extend(containing.iter().cloned());
                self.rules.render(&owner)
            };
            self.report(
                DiagnosticCode::DuplicateType,
                format!(
                    "`{}` already contains a definition for `{}`",
                    if owner.is_empty() { "<global namespace>" } else { owner.as_str() },
                    decl.name
                ),
                &decl.location,
            );
        } else {
            // Source declarations shadow library types of the same name
            self.types.insert(key, named.clone());
        }

        let mut member_prefix = namespace.to_vec();
        member_prefix.extend(containing.iter().cloned());
        member_prefix.push(decl.name.clone());
        let member_scope = self.push_scope(member_prefix, scope);

        self.pending.push(PendingType {
            decl,
            named,
            scope,
            duplicate,
        });

        let mut inner = containing.to_vec();
        inner.push(decl.name.clone());
        for member in &decl.members {
            self.declare_type(member, namespace, &inner, member_scope);
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Pass 2: imports
    // ═══════════════════════════════════════════════════════════════════

    fn resolve_imports(&mut self) {
        for index in 0..self.scopes.len() {
            let imports = self.scopes[index].imports.clone();
            let mut seen = HashSet::new();
            let mut resolved = Vec::new();
            for import in imports {
                if !seen.insert(&import.kind) {
                    let target = match &import.kind {
                        ImportKind::Namespace(path) => self.rules.render(&path.segments),
                        ImportKind::Alias { alias, .. } => alias.clone(),
                    };
                    self.report(
                        DiagnosticCode::DuplicateImport,
                        format!("The import of `{}` appeared previously in this scope", target),
                        &import.location,
                    );
                    continue;
                }
                let path = match &import.kind {
                    ImportKind::Namespace(path) => path,
                    ImportKind::Alias { target, .. } => target,
                };
                match self.resolve_import_target(path, index) {
                    Some(target) => resolved.push(match &import.kind {
                        ImportKind::Namespace(_) => ResolvedImport::Namespace(target),
                        ImportKind::Alias { alias, .. } => ResolvedImport::Alias {
                            alias: alias.clone(),
                            target,
                        },
                    }),
                    None => self.report(
                        DiagnosticCode::UnresolvedImport,
                        format!(
                            "The type or namespace name `{}` could not be found (are you missing a library reference?)",
                            self.rules.render(&path.segments)
                        ),
                        &import.location,
                    ),
                }
            }
            self.scopes[index].resolved = resolved;
        }
    }

    /// Namespace or type an import path names, as absolute segments.
    fn resolve_import_target(&self, path: &QualifiedPath, scope: usize) -> Option<Vec<String>> {
        let mut candidates = Vec::new();
        if !path.absolute {
            for level in self.chain(scope) {
                let mut candidate = self.scopes[level].prefix.clone();
                candidate.extend(path.segments.iter().cloned());
                candidates.push(candidate);
            }
        }
        candidates.push(path.segments.clone());
        candidates.into_iter().find(|candidate| {
            let key = key_of(candidate);
            self.namespaces.contains(&key) || self.types.contains_key(&key)
        })
    }

    // ═══════════════════════════════════════════════════════════════════
    // Pass 3: base types
    // ═══════════════════════════════════════════════════════════════════

    fn resolve_bases(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for entry in &pending {
            let decl = entry.decl;
            let mut link = BaseLink::None;
            for (position, base) in decl.bases.iter().enumerate() {
                let first = position == 0;
                match self.resolve_type(base, entry.scope, None) {
                    Resolution::Found(key) => {
                        let class_like = self
                            .types
                            .get(&key)
                            .map_or(false, |ty| ty.kind().is_class_like());
                        if first && class_like && decl.kind.is_class_like() {
                            link = BaseLink::Resolved(key);
                        }
                    }
                    Resolution::Ambiguous(keys) => {
                        self.report_ambiguous(base, &keys, &decl.location);
                        if first {
                            link = BaseLink::Unresolved;
                        }
                    }
                    Resolution::NotFound => {
                        self.report(
                            DiagnosticCode::UnresolvedBaseType,
                            format!(
                                "The base type `{}` of `{}` could not be found (are you missing a library reference?)",
                                self.rules.render(&base.segments),
                                decl.name
                            ),
                            &decl.location,
                        );
                        if first {
                            link = BaseLink::Unresolved;
                        }
                    }
                }
            }
            if !entry.duplicate {
                self.bases.insert(entry.named.fully_qualified_name(), link);
            }
        }
        self.pending = pending;
    }

    // ═══════════════════════════════════════════════════════════════════
    // Pass 4: attributes
    // ═══════════════════════════════════════════════════════════════════

    fn bind_symbols(&mut self) -> IndexMap<DeclId, TypeSymbol> {
        let pending = std::mem::take(&mut self.pending);
        let mut symbols = IndexMap::new();
        for entry in pending {
            let attributes = entry
                .decl
                .attributes()
                .map(|attr| {
                    let class = self.bind_attribute(attr, entry.scope);
                    AttributeData::new(attr.name.clone(), class, attr.location.clone())
                })
                .collect();
            let base_type = if entry.duplicate {
                None
            } else {
                match self.bases.get(&entry.named.fully_qualified_name()) {
                    Some(BaseLink::Resolved(key)) => self.types.get(key).cloned(),
                    _ => None,
                }
            };
            symbols.insert(
                entry.decl.id,
                TypeSymbol::new(entry.decl.id, entry.named, base_type, attributes),
            );
        }
        symbols
    }

    fn bind_attribute(&mut self, attr: &AttributeSyntax, scope: usize) -> Option<NamedType> {
        if attr.path.is_simple() && self.rules.is_builtin_attribute(attr.path.last()) {
            trace!(attribute = %attr.name, "bound built-in attribute");
            return Some(NamedType::new(
                vec![self.rules.builtin_namespace.to_string()],
                Vec::new(),
                attr.path.last(),
                DeclKind::Function,
                SymbolOrigin::Builtin,
            ));
        }

        match self.resolve_type(&attr.path, scope, self.rules.attribute_suffix) {
            Resolution::Found(key) => {
                let named = self.types.get(&key).cloned()?;
                if let Some(base) = self.rules.attribute_base {
                    if self.derives_from(&key, base) == Some(false) {
                        self.report(
                            DiagnosticCode::NotAnAttribute,
                            format!(
                                "`{}` is not an attribute class",
                                self.rules.render(&named.qualified_segments())
                            ),
                            &attr.location,
                        );
                        return None;
                    }
                }
                trace!(attribute = %attr.name, resolved = %key, "bound attribute");
                Some(named)
            }
            Resolution::Ambiguous(keys) => {
                self.report_ambiguous(&attr.path, &keys, &attr.location);
                None
            }
            Resolution::NotFound => {
                trace!(attribute = %attr.name, "attribute did not resolve");
                self.report(
                    DiagnosticCode::UnresolvedAttribute,
                    format!(
                        "The type or namespace name `{}` could not be found (are you missing a library reference?)",
                        self.rules.render(&attr.path.segments)
                    ),
                    &attr.location,
                );
                None
            }
        }
    }

    /// `Some(true)` when `key` provably derives from `base`, `Some(false)`
    /// when its chain provably ends elsewhere, `None` when a link is missing.
    fn derives_from(&self, key: &str, base: &str) -> Option<bool> {
        let mut visited = HashSet::new();
        let mut current = key.to_string();
        loop {
            if !visited.insert(current.clone()) {
                return Some(false);
            }
            match self.bases.get(&current) {
                Some(BaseLink::Resolved(next)) => {
                    if next == base {
                        return Some(true);
                    }
                    if !self.types.contains_key(next) {
                        return None;
                    }
                    current = next.clone();
                }
                Some(BaseLink::None) => return Some(false),
                Some(BaseLink::Unresolved) | None => return None,
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Lookup
    // ═══════════════════════════════════════════════════════════════════

    /// Scopes searched from `scope`, innermost first.
    fn chain(&self, scope: usize) -> Vec<usize> {
        if !self.rules.outer_scopes_visible {
            return vec![scope];
        }
        let mut chain = vec![scope];
        let mut current = scope;
        while let Some(parent) = self.scopes[current].parent {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Look up `prefix.head.<spelling>` for every spelling.
    fn lookup(
        &self,
        prefix: &[String],
        head: &[String],
        spellings: &[String],
        attribute: bool,
    ) -> Resolution {
        let mut hits: Vec<String> = Vec::new();
        for spelling in spellings {
            let key = joined(prefix, head, spelling);
            if self.types.contains_key(&key) && !hits.contains(&key) {
                hits.push(key);
            }
        }
        self.settle(hits, attribute)
    }

    /// Collapse the hits of one scope level into a resolution.
    ///
    /// For attribute names, candidates proven not to be attribute classes
    /// drop out first: `[X]` binds `XAttribute` when `X` is a plain class.
    fn settle(&self, mut hits: Vec<String>, attribute: bool) -> Resolution {
        if let (true, Some(base)) = (attribute && hits.len() > 1, self.rules.attribute_base) {
            let attributes: Vec<String> = hits
                .iter()
                .filter(|key| self.derives_from(key, base) != Some(false))
                .cloned()
                .collect();
            if !attributes.is_empty() {
                hits = attributes;
            }
        }
        match hits.len() {
            0 => Resolution::NotFound,
            1 => Resolution::Found(hits.remove(0)),
            _ => Resolution::Ambiguous(hits),
        }
    }

    fn resolve_type(&self, path: &QualifiedPath, scope: usize, suffix: Option<&str>) -> Resolution {
        let Some((last, head)) = path.segments.split_last() else {
            return Resolution::NotFound;
        };
        let attribute = suffix.is_some();
        let mut spellings = vec![last.clone()];
        if let Some(suffix) = suffix {
            spellings.push(format!("{}{}", last, suffix));
        }

        if path.absolute {
            return self.lookup(&[], head, &spellings, attribute);
        }

        let chain = self.chain(scope);

        if head.is_empty() {
            for &level in &chain {
                let declared = self.lookup(&self.scopes[level].prefix, &[], &spellings, attribute);
                if !matches!(declared, Resolution::NotFound) {
                    return declared;
                }
                let mut hits: Vec<String> = Vec::new();
                for import in &self.scopes[level].resolved {
                    let candidates: Vec<String> = match import {
                        ResolvedImport::Alias { alias, target } if spellings.contains(alias) => {
                            vec![key_of(target)]
                        }
                        ResolvedImport::Alias { .. } => Vec::new(),
                        ResolvedImport::Namespace(ns) => spellings
                            .iter()
                            .map(|spelling| joined(ns, &[], spelling))
                            .collect(),
                    };
                    for key in candidates {
                        if self.types.contains_key(&key) && !hits.contains(&key) {
                            hits.push(key);
                        }
                    }
                }
                if !hits.is_empty() {
                    return self.settle(hits, attribute);
                }
            }
            return Resolution::NotFound;
        }

        let Some((first, middle)) = head.split_first() else {
            return Resolution::NotFound;
        };
        for &level in &chain {
            for import in &self.scopes[level].resolved {
                if let ResolvedImport::Alias { alias, target } = import {
                    if alias == first {
                        return self.lookup(target, middle, &spellings, attribute);
                    }
                }
            }
        }
        for &level in &chain {
            let found = self.lookup(&self.scopes[level].prefix, head, &spellings, attribute);
            if !matches!(found, Resolution::NotFound) {
                return found;
            }
        }
        self.lookup(&[], head, &spellings, attribute)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Reporting
    // ═══════════════════════════════════════════════════════════════════

    fn report(&mut self, code: DiagnosticCode, message: String, location: &SourceLocation) {
        self.diagnostics
            .push(Diagnostic::new(code, message).with_location(location.clone()));
    }

    fn report_ambiguous(&mut self, path: &QualifiedPath, keys: &[String], location: &SourceLocation) {
        let candidates = keys
            .iter()
            .map(|key| format!("`{}`", key))
            .collect::<Vec<_>>()
            .join(" and ");
        self.report(
            DiagnosticCode::AmbiguousReference,
            format!(
                "`{}` is ambiguous between {}",
                self.rules.render(&path.segments),
                candidates
            ),
            location,
        );
    }
}
