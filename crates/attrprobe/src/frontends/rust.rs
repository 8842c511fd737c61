//! Rust language frontend for attrprobe
//!
//! This frontend parses Rust source code using `syn` and lowers its
//! declarations (structs, enums, unions, traits and functions) into the shared
//! syntax model. Inline modules become namespaces and `use` trees become
//! imports.

use proc_macro2::Span;
use quote::ToTokens;
use syn::ext::IdentExt;
use syn::{AttrStyle, Attribute, Meta, UseTree};
use tracing::debug;

use crate::context::AnalysisContext;
use crate::diagnostics::Diagnostic;
use crate::frontend::{CompilationProvider, LanguageRules, ParseError, SourceLocation};
use crate::syntax::{
    AttributeList, AttributeSyntax, DeclIdAllocator, DeclKind, ImportDirective, ImportKind, Item,
    NamespaceDecl, QualifiedPath, SyntaxTree, TypeDecl,
};

/// Resolution rules for Rust.
pub static RUST_RULES: LanguageRules = LanguageRules {
    attribute_suffix: None,
    attribute_base: None,
    builtin_attributes: &[
        "derive",
        "repr",
        "cfg",
        "cfg_attr",
        "allow",
        "warn",
        "deny",
        "forbid",
        "doc",
        "inline",
        "must_use",
        "non_exhaustive",
        "test",
        "deprecated",
        "automatically_derived",
        "path",
        "macro_export",
        "no_mangle",
        "track_caller",
        "cold",
    ],
    builtin_namespace: "core",
    outer_scopes_visible: false,
    path_separator: "::",
};

/// Rust language frontend.
///
/// Parses Rust source code with `syn` and lowers the declaration layer into
/// a [`SyntaxTree`].
///
/// # Example
///
/// ```
/// use attrprobe::frontends::RustFrontend;
/// use attrprobe::{AnalysisContext, CompilationProvider};
///
/// let frontend = RustFrontend::new();
/// let tree = frontend
///     .parse("#[derive(Debug)] struct Point { x: i32 }", &AnalysisContext::new())
///     .unwrap();
/// assert_eq!(tree.types().len(), 1);
/// assert_eq!(frontend.name(), "Rust");
/// assert_eq!(frontend.file_extension(), "rs");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RustFrontend;

impl RustFrontend {
    /// Create a new Rust frontend.
    pub fn new() -> Self {
        Self
    }
}

impl CompilationProvider for RustFrontend {
    fn parse(&self, source: &str, ctx: &AnalysisContext) -> Result<SyntaxTree, ParseError> {
        let file = syn::parse_file(source).map_err(|e| {
            let start = e.span().start();
            let mut err = ParseError::new(format!("Rust syntax error: {}", e)).with_location(
                SourceLocation::new(&ctx.file_name, start.line.max(1), start.column + 1),
            );
            if let Some(line) = start.line.checked_sub(1).and_then(|i| source.lines().nth(i)) {
                err = err.with_snippet(line.trim_end());
            }
            err
        })?;

        let mut lowering = Lowering {
            file: &ctx.file_name,
            ids: DeclIdAllocator::new(),
            module: Vec::new(),
            max_depth: ctx.max_nesting_depth,
        };
        let items = lowering.items(&file.items)?;
        let tree = SyntaxTree::from_parts(lowering.ids.tree(), &ctx.file_name, "Rust", items);
        debug!(
            file = %ctx.file_name,
            types = tree.types().len(),
            "parsed Rust source"
        );
        Ok(tree)
    }

    fn rules(&self) -> &LanguageRules {
        &RUST_RULES
    }

    fn format_diagnostic(&self, diagnostic: &Diagnostic, source: &str) -> String {
        let mut out = format!(
            "{}[{}]: {}",
            diagnostic.severity, diagnostic.code, diagnostic.message
        );
        if let Some(loc) = &diagnostic.location {
            out.push_str(&format!("\n  --> {}", loc));
            if let Some(line) = loc.line.checked_sub(1).and_then(|i| source.lines().nth(i)) {
                out.push_str(&format!("\n   |\n{:>3} | {}", loc.line, line));
            }
        }
        out
    }

    fn name(&self) -> &str {
        "Rust"
    }

    fn file_extension(&self) -> &str {
        "rs"
    }
}

/// Lowers `syn` items into the shared syntax model.
struct Lowering<'a> {
    file: &'a str,
    ids: DeclIdAllocator,
    /// Path of the module currently being lowered
    module: Vec<String>,
    max_depth: usize,
}

impl<'a> Lowering<'a> {
    fn location(&self, span: Span) -> SourceLocation {
        let start = span.start();
        SourceLocation::new(self.file, start.line.max(1), start.column + 1)
    }

    fn items(&mut self, items: &[syn::Item]) -> Result<Vec<Item>, ParseError> {
        let mut out = Vec::new();
        for item in items {
            match item {
                syn::Item::Struct(s) => {
                    out.push(Item::Type(self.decl(DeclKind::Struct, &s.ident, &s.attrs)))
                }
                syn::Item::Enum(e) => {
                    out.push(Item::Type(self.decl(DeclKind::Enum, &e.ident, &e.attrs)))
                }
                syn::Item::Union(u) => {
                    out.push(Item::Type(self.decl(DeclKind::Union, &u.ident, &u.attrs)))
                }
                syn::Item::Trait(t) => {
                    out.push(Item::Type(self.decl(DeclKind::Trait, &t.ident, &t.attrs)))
                }
                syn::Item::Fn(f) => out.push(Item::Type(self.decl(
                    DeclKind::Function,
                    &f.sig.ident,
                    &f.attrs,
                ))),
                syn::Item::Mod(m) => {
                    // `mod foo;` lives in another file
                    let Some((_, content)) = &m.content else {
                        continue;
                    };
                    if self.module.len() + 1 > self.max_depth {
                        return Err(ParseError::new(format!(
                            "modules nest deeper than {} levels",
                            self.max_depth
                        ))
                        .with_location(self.location(m.ident.span())));
                    }
                    let name = m.ident.unraw().to_string();
                    self.module.push(name.clone());
                    let nested = self.items(content);
                    self.module.pop();
                    out.push(Item::Namespace(NamespaceDecl {
                        name: QualifiedPath::relative(vec![name]),
                        items: nested?,
                        location: self.location(m.mod_token.span),
                    }));
                }
                syn::Item::Use(u) => {
                    let location = self.location(u.use_token.span);
                    let mut imports = Vec::new();
                    collect_use(&u.tree, &mut Vec::new(), &mut imports);
                    for (alias, segments) in imports {
                        let target = self.anchor(segments, u.leading_colon.is_some());
                        let kind = match alias {
                            Some(alias) => ImportKind::Alias { alias, target },
                            None => ImportKind::Namespace(target),
                        };
                        out.push(Item::Import(ImportDirective {
                            kind,
                            location: location.clone(),
                        }));
                    }
                }
                _ => {}
            }
        }
        Ok(out)
    }

    fn decl(&mut self, kind: DeclKind, ident: &syn::Ident, attrs: &[Attribute]) -> TypeDecl {
        let id = self.ids.next_id();
        let attribute_lists = attrs
            .iter()
            .filter(|attr| matches!(attr.style, AttrStyle::Outer))
            .map(|attr| self.attribute_list(attr))
            .collect();
        TypeDecl {
            id,
            kind,
            name: ident.unraw().to_string(),
            attribute_lists,
            bases: Vec::new(),
            members: Vec::new(),
            location: self.location(ident.span()),
        }
    }

    fn attribute_list(&self, attr: &Attribute) -> AttributeList {
        let path = attr.path();
        let segments = path
            .segments
            .iter()
            .map(|segment| segment.ident.unraw().to_string())
            .collect();
        let arguments = match &attr.meta {
            Meta::Path(_) => None,
            Meta::List(list) => Some(list.tokens.to_string()),
            Meta::NameValue(nv) => Some(nv.value.to_token_stream().to_string()),
        };
        let name_span = path
            .segments
            .first()
            .map_or(attr.pound_token.spans[0], |segment| segment.ident.span());
        let attribute = AttributeSyntax {
            name: path.to_token_stream().to_string(),
            path: self.anchor(segments, path.leading_colon.is_some()),
            arguments,
            location: self.location(name_span),
        };
        AttributeList {
            target: None,
            attributes: vec![attribute],
            location: self.location(attr.pound_token.spans[0]),
        }
    }

    /// Normalize `crate::`, `self::`, `super::` and leading `::` prefixes.
    fn anchor(&self, mut segments: Vec<String>, leading_colon: bool) -> QualifiedPath {
        if leading_colon {
            return QualifiedPath::absolute(segments);
        }
        match segments.first().map(String::as_str) {
            Some("crate") if segments.len() > 1 => {
                segments.remove(0);
                QualifiedPath::absolute(segments)
            }
            Some("self") if segments.len() > 1 => {
                segments.remove(0);
                QualifiedPath::relative(segments)
            }
            Some("super") => {
                let mut base = self.module.clone();
                while segments.first().map(String::as_str) == Some("super") {
                    segments.remove(0);
                    base.pop();
                }
                base.extend(segments);
                QualifiedPath::absolute(base)
            }
            _ => QualifiedPath::relative(segments),
        }
    }
}

/// Flatten a `use` tree into `(alias, path)` pairs; `None` marks a glob.
fn collect_use(tree: &UseTree, prefix: &mut Vec<String>, out: &mut Vec<(Option<String>, Vec<String>)>) {
    match tree {
        UseTree::Path(path) => {
            prefix.push(path.ident.unraw().to_string());
            collect_use(&path.tree, prefix, out);
            prefix.pop();
        }
        UseTree::Name(name) => {
            if name.ident == "self" {
                if let Some(last) = prefix.last() {
                    out.push((Some(last.clone()), prefix.clone()));
                }
            } else {
                let ident = name.ident.unraw().to_string();
                let mut target = prefix.clone();
                target.push(ident.clone());
                out.push((Some(ident), target));
            }
        }
        UseTree::Rename(rename) => {
            let alias = rename.rename.unraw().to_string();
            if alias == "_" {
                return;
            }
            let mut target = prefix.clone();
            if rename.ident != "self" {
                target.push(rename.ident.unraw().to_string());
            }
            out.push((Some(alias), target));
        }
        UseTree::Glob(_) => out.push((None, prefix.clone())),
        UseTree::Group(group) => {
            for item in &group.items {
                collect_use(item, prefix, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticCode;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> SyntaxTree {
        RustFrontend::new()
            .parse(source, &AnalysisContext::new().with_file_name("lib.rs"))
            .unwrap()
    }

    fn imports(tree: &SyntaxTree) -> Vec<ImportKind> {
        let mut out = Vec::new();
        fn visit(items: &[Item], out: &mut Vec<ImportKind>) {
            for item in items {
                match item {
                    Item::Import(import) => out.push(import.kind.clone()),
                    Item::Namespace(ns) => visit(&ns.items, out),
                    Item::Type(_) => {}
                }
            }
        }
        visit(tree.items(), &mut out);
        out
    }

    #[test]
    fn test_frontend_creation() {
        let frontend = RustFrontend::new();
        assert_eq!(frontend.name(), "Rust");
        assert_eq!(frontend.file_extension(), "rs");
        assert_eq!(frontend.rules().path_separator, "::");
    }

    #[test]
    fn test_declaration_kinds() {
        let tree = parse(
            "struct S; enum E { A } union U { a: u8 } trait T {} fn f() {} impl S {} const X: u8 = 0;",
        );
        let kinds: Vec<_> = tree.types().iter().map(|d| (d.name.clone(), d.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("S".to_string(), DeclKind::Struct),
                ("E".to_string(), DeclKind::Enum),
                ("U".to_string(), DeclKind::Union),
                ("T".to_string(), DeclKind::Trait),
                ("f".to_string(), DeclKind::Function),
            ]
        );
    }

    #[test]
    fn test_outer_attributes_become_lists() {
        let tree = parse("#[derive(Debug, Clone)]\n#[serde :: rename = \"x\"]\n#[audited]\nstruct S;");
        let decl = tree.find_type("S").unwrap();
        assert_eq!(decl.attribute_lists.len(), 3);
        let attrs: Vec<_> = decl.attributes().collect();
        assert_eq!(attrs[0].name, "derive");
        assert_eq!(attrs[0].arguments.as_deref(), Some("Debug , Clone"));
        assert_eq!(attrs[1].name, "serde :: rename");
        assert_eq!(attrs[1].path.segments, vec!["serde", "rename"]);
        assert_eq!(attrs[1].arguments.as_deref(), Some("\"x\""));
        assert_eq!(attrs[2].arguments, None);
        assert_eq!(attrs[2].location, SourceLocation::new("lib.rs", 3, 3));
    }

    #[test]
    fn test_doc_comments_are_attributes() {
        let tree = parse("/// Docs\nstruct S;");
        let decl = tree.find_type("S").unwrap();
        assert_eq!(decl.attributes().next().map(|a| a.name.as_str()), Some("doc"));
    }

    #[test]
    fn test_inline_modules_are_namespaces() {
        let tree = parse("mod a { mod b { struct Deep; } struct Shallow; } mod external;");
        let mut paths = Vec::new();
        tree.walk(|path, _| paths.push(path.join("::")));
        assert_eq!(paths, vec!["a::b::Deep", "a::Shallow"]);
        assert!(tree.find_type_path("a::b::Deep").is_some());
    }

    #[test]
    fn test_use_trees_are_flattened() {
        let tree = parse(
            "use serde::{Serialize, de::{self, Deserialize as De}, ser::*};\nuse ::log::info;\nuse std::io as _;",
        );
        assert_eq!(
            imports(&tree),
            vec![
                ImportKind::Alias {
                    alias: "Serialize".into(),
                    target: QualifiedPath::relative(vec!["serde".into(), "Serialize".into()]),
                },
                ImportKind::Alias {
                    alias: "de".into(),
                    target: QualifiedPath::relative(vec!["serde".into(), "de".into()]),
                },
                ImportKind::Alias {
                    alias: "De".into(),
                    target: QualifiedPath::relative(vec![
                        "serde".into(),
                        "de".into(),
                        "Deserialize".into()
                    ]),
                },
                ImportKind::Namespace(QualifiedPath::relative(vec![
                    "serde".into(),
                    "ser".into()
                ])),
                ImportKind::Alias {
                    alias: "info".into(),
                    target: QualifiedPath::absolute(vec!["log".into(), "info".into()]),
                },
            ]
        );
    }

    #[test]
    fn test_path_anchors() {
        let tree = parse(
            "mod outer { mod inner { use super::Marker; use crate::top::Tag; use self::x::Y; } }",
        );
        assert_eq!(
            imports(&tree),
            vec![
                ImportKind::Alias {
                    alias: "Marker".into(),
                    target: QualifiedPath::absolute(vec!["outer".into(), "Marker".into()]),
                },
                ImportKind::Alias {
                    alias: "Tag".into(),
                    target: QualifiedPath::absolute(vec!["top".into(), "Tag".into()]),
                },
                ImportKind::Alias {
                    alias: "Y".into(),
                    target: QualifiedPath::relative(vec!["x".into(), "Y".into()]),
                },
            ]
        );
    }

    #[test]
    fn test_inner_attributes_are_ignored() {
        let tree = parse("#![allow(dead_code)]\nfn f() { #![allow(unused)] }");
        assert!(!tree.find_type("f").unwrap().has_attributes());
    }

    #[test]
    fn test_syntax_error_has_location() {
        let err = RustFrontend::new()
            .parse("struct S {\n    x: ,\n}", &AnalysisContext::new().with_file_name("bad.rs"))
            .unwrap_err();
        assert!(err.message.contains("Rust syntax error"));
        let loc = err.location.unwrap();
        assert_eq!(loc.file, "bad.rs");
        assert_eq!(loc.line, 2);
    }

    #[test]
    fn test_module_nesting_limit() {
        let ctx = AnalysisContext::new().with_max_nesting_depth(1);
        let frontend = RustFrontend::new();
        assert!(frontend.parse("mod a { struct S; }", &ctx).is_ok());
        assert!(frontend.parse("mod a { mod b {} }", &ctx).is_err());
    }

    #[test]
    fn test_format_diagnostic() {
        let frontend = RustFrontend::new();
        let diag = Diagnostic::new(DiagnosticCode::UnresolvedAttribute, "cannot find `audited`")
            .with_location(SourceLocation::new("lib.rs", 1, 3));
        assert_eq!(
            frontend.format_diagnostic(&diag, "#[audited]\nstruct S;"),
            "error[AP0001]: cannot find `audited`\n  --> lib.rs:1:3\n   |\n  1 | #[audited]"
        );
    }
}
