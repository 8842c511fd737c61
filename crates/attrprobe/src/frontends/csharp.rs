//! C# declaration frontend
//!
//! Lexes with `logos` and parses the declaration layer of C#: using
//! directives, namespaces (block and file-scoped), type declarations with
//! their attribute lists, base lists and nested types. Member bodies are
//! skipped token-wise; only type declarations are kept.

use logos::Logos;
use tracing::debug;

use crate::context::AnalysisContext;
use crate::diagnostics::Diagnostic;
use crate::frontend::{CompilationProvider, LanguageRules, ParseError, SourceLocation};
use crate::syntax::{
    AttributeList, AttributeSyntax, DeclIdAllocator, DeclKind, ImportDirective, ImportKind, Item,
    NamespaceDecl, QualifiedPath, SyntaxTree, TypeDecl,
};

/// Resolution rules for C#.
pub static CSHARP_RULES: LanguageRules = LanguageRules {
    attribute_suffix: Some("Attribute"),
    attribute_base: Some("System.Attribute"),
    builtin_attributes: &[],
    builtin_namespace: "System",
    outer_scopes_visible: true,
    path_separator: ".",
};

const MODIFIERS: &[&str] = &[
    "public", "private", "protected", "internal", "static", "sealed", "abstract", "partial",
    "readonly", "unsafe", "new", "file", "ref", "virtual", "override", "extern", "volatile",
    "async", "const", "required", "fixed",
];

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+|//[^\n]*|/\*([^*]|\*+[^*/])*\*+/|#[^\n]*")]
enum TokenKind {
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token("::")]
    ColonColon,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("=")]
    Eq,
    #[regex(r"@?[_\p{L}\p{Nl}][_\p{L}\p{Nl}\p{Nd}\p{Mn}\p{Mc}\p{Pc}]*")]
    Ident,
    #[regex(r#"\$?"([^"\\]|\\.)*""#)]
    // Verbatim strings: no escapes, `""` is a quote
    #[regex(r#"(@|\$@|@\$)"([^"]|"")*""#)]
    Str,
    #[regex(r"'([^'\\]|\\.)+'")]
    Char,
    #[regex(r"[0-9][0-9A-Za-z_]*(\.[0-9][0-9A-Za-z_]*)?")]
    Number,
    #[regex(r"[+\-*/%&|^!~?]")]
    Op,
}

impl TokenKind {
    fn describe(&self) -> &'static str {
        match self {
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::Lt => "`<`",
            TokenKind::Gt => "`>`",
            TokenKind::Comma => "`,`",
            TokenKind::Semi => "`;`",
            TokenKind::ColonColon => "`::`",
            TokenKind::Colon => "`:`",
            TokenKind::Dot => "`.`",
            TokenKind::Eq => "`=`",
            TokenKind::Ident => "identifier",
            TokenKind::Str => "string literal",
            TokenKind::Char => "character literal",
            TokenKind::Number => "number",
            TokenKind::Op => "operator",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

/// Byte offsets of line starts, for offset → line/column conversion.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { starts }
    }

    fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        }
    }

    fn location(&self, source: &str, file: &str, offset: usize) -> SourceLocation {
        let line = self.line_of(offset);
        let column = source[self.starts[line]..offset].chars().count() + 1;
        SourceLocation::new(file, line + 1, column)
    }

    fn line_text<'s>(&self, source: &'s str, offset: usize) -> &'s str {
        let line = self.line_of(offset);
        let end = self
            .starts
            .get(line + 1)
            .map_or(source.len(), |next| next - 1);
        source[self.starts[line]..end].trim_end()
    }
}

struct Parser<'s> {
    source: &'s str,
    file: &'s str,
    lines: LineIndex,
    tokens: Vec<Token>,
    pos: usize,
    ids: DeclIdAllocator,
    depth: usize,
    max_depth: usize,
}

impl<'s> Parser<'s> {
    fn new(source: &'s str, ctx: &'s AnalysisContext) -> Result<Self, ParseError> {
        let lines = LineIndex::new(source);
        let mut lexer = TokenKind::lexer(source);
        let mut tokens = Vec::new();
        while let Some(result) = lexer.next() {
            let span = lexer.span();
            match result {
                Ok(kind) => tokens.push(Token {
                    kind,
                    start: span.start,
                    end: span.end,
                }),
                Err(()) => {
                    let found = source[span.start..].chars().next().unwrap_or_default();
                    return Err(ParseError::new(format!("unexpected character `{}`", found))
                    .with_location(lines.location(source, &ctx.file_name, span.start))
                    .with_snippet(lines.line_text(source, span.start)));
                }
            }
        }
        Ok(Self {
            source,
            file: &ctx.file_name,
            lines,
            tokens,
            pos: 0,
            ids: DeclIdAllocator::new(),
            depth: 0,
            max_depth: ctx.max_nesting_depth,
        })
    }

    // ═══════════════════════════════════════════════════════════════════
    // Token cursor
    // ═══════════════════════════════════════════════════════════════════

    fn peek(&self) -> Option<TokenKind> {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + n).map(|t| t.kind)
    }

    fn peek_ident(&self) -> Option<&'s str> {
        match self.tokens.get(self.pos) {
            Some(tok) if tok.kind == TokenKind::Ident => Some(self.text(*tok)),
            _ => None,
        }
    }

    fn is_keyword(&self, word: &str) -> bool {
        self.peek_ident() == Some(word)
    }

    fn keyword_at(&self, n: usize, word: &str) -> bool {
        match self.tokens.get(self.pos + n) {
            Some(tok) => tok.kind == TokenKind::Ident && self.text(*tok) == word,
            None => false,
        }
    }

    fn text(&self, tok: Token) -> &'s str {
        &self.source[tok.start..tok.end]
    }

    fn ident_text(&self, tok: Token) -> String {
        self.text(tok).trim_start_matches('@').to_string()
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).copied();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        match self.tokens.get(self.pos).copied() {
            Some(tok) if tok.kind == kind => {
                self.pos += 1;
                Ok(tok)
            }
            _ => Err(self.error_here(format!("expected {}", what))),
        }
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.source.len(), |tok| tok.start)
    }

    fn location_of(&self, offset: usize) -> SourceLocation {
        self.lines.location(self.source, self.file, offset)
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        let offset = self.offset();
        let found = match self.tokens.get(self.pos) {
            Some(tok) => format!("found {} `{}`", tok.kind.describe(), self.text(*tok)),
            None => "found end of input".to_string(),
        };
        ParseError::new(format!("{}, {}", message.into(), found))
            .with_location(self.location_of(offset))
            .with_snippet(self.lines.line_text(self.source, offset))
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(self.error_here(format!(
                "declarations nest deeper than {} levels",
                self.max_depth
            )));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Skip from an opening token to its matching close; returns both.
    fn skip_balanced(
        &mut self,
        open: TokenKind,
        close: TokenKind,
    ) -> Result<(Token, Token), ParseError> {
        let first = self.expect(open, open.describe())?;
        let mut depth = 1usize;
        while let Some(tok) = self.bump() {
            if tok.kind == open {
                depth += 1;
            } else if tok.kind == close {
                depth -= 1;
                if depth == 0 {
                    return Ok((first, tok));
                }
            }
        }
        Err(ParseError::new(format!("unclosed {}", open.describe()))
            .with_location(self.location_of(first.start))
            .with_snippet(self.lines.line_text(self.source, first.start)))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Grammar
    // ═══════════════════════════════════════════════════════════════════

    fn parse_compilation_unit(mut self) -> Result<SyntaxTree, ParseError> {
        let items = self.parse_items(false)?;
        Ok(SyntaxTree::from_parts(self.ids.tree(), self.file, "C#", items))
    }

    fn parse_items(&mut self, braced: bool) -> Result<Vec<Item>, ParseError> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None if braced => return Err(self.error_here("expected `}` to close namespace")),
                None => return Ok(items),
                Some(TokenKind::RBrace) if braced => {
                    self.bump();
                    return Ok(items);
                }
                _ => {}
            }

            if self.is_keyword("global") && self.keyword_at(1, "using") {
                self.bump();
            }
            if self.is_keyword("using") {
                items.push(Item::Import(self.parse_using()?));
            } else if self.is_keyword("namespace") {
                items.push(Item::Namespace(self.parse_namespace()?));
            } else if let Some(decl) = self.parse_member(false)? {
                items.push(Item::Type(decl));
            }
        }
    }

    fn parse_using(&mut self) -> Result<ImportDirective, ParseError> {
        let location = self.location_of(self.offset());
        self.bump();
        if self.is_keyword("static") {
            self.bump();
        }
        let kind = if self.peek() == Some(TokenKind::Ident) && self.peek_at(1) == Some(TokenKind::Eq)
        {
            let alias = self.expect(TokenKind::Ident, "alias name")?;
            let alias = self.ident_text(alias);
            self.bump();
            let target = self.parse_qualified_path()?;
            ImportKind::Alias { alias, target }
        } else {
            ImportKind::Namespace(self.parse_qualified_path()?)
        };
        if self.peek() == Some(TokenKind::Lt) {
            self.skip_balanced(TokenKind::Lt, TokenKind::Gt)?;
        }
        self.expect(TokenKind::Semi, "`;` after using directive")?;
        Ok(ImportDirective { kind, location })
    }

    fn parse_namespace(&mut self) -> Result<NamespaceDecl, ParseError> {
        let location = self.location_of(self.offset());
        self.bump();
        let name = self.parse_qualified_path()?;
        let file_scoped = self.peek() == Some(TokenKind::Semi);
        if file_scoped {
            self.bump();
        } else {
            self.expect(TokenKind::LBrace, "`{` or `;` after namespace name")?;
        }
        self.enter()?;
        let items = self.parse_items(!file_scoped)?;
        self.leave();
        if !file_scoped && self.peek() == Some(TokenKind::Semi) {
            self.bump();
        }
        Ok(NamespaceDecl {
            name,
            items,
            location,
        })
    }

    fn parse_qualified_path(&mut self) -> Result<QualifiedPath, ParseError> {
        let mut absolute = false;
        if self.is_keyword("global") && self.peek_at(1) == Some(TokenKind::ColonColon) {
            self.bump();
            self.bump();
            absolute = true;
        }
        let first = self.expect(TokenKind::Ident, "identifier")?;
        let mut segments = vec![self.ident_text(first)];
        while matches!(self.peek(), Some(TokenKind::Dot | TokenKind::ColonColon))
            && self.peek_at(1) == Some(TokenKind::Ident)
        {
            self.bump();
            let segment = self.expect(TokenKind::Ident, "identifier")?;
            segments.push(self.ident_text(segment));
        }
        Ok(QualifiedPath { absolute, segments })
    }

    fn type_keyword(&self) -> Option<DeclKind> {
        match self.peek_ident()? {
            "class" => Some(DeclKind::Class),
            "struct" => Some(DeclKind::Struct),
            "interface" => Some(DeclKind::Interface),
            "enum" => Some(DeclKind::Enum),
            "record" => Some(DeclKind::Record),
            _ => None,
        }
    }

    /// A type declaration, or `None` for a skipped member or assembly attributes.
    fn parse_member(&mut self, in_type: bool) -> Result<Option<TypeDecl>, ParseError> {
        let mut lists = Vec::new();
        while self.peek() == Some(TokenKind::LBracket) {
            lists.push(self.parse_attribute_list()?);
        }
        let (global, attribute_lists): (Vec<AttributeList>, Vec<AttributeList>) =
            lists.into_iter().partition(|list| {
                matches!(list.target.as_deref(), Some("assembly") | Some("module"))
            });

        let mut saw_modifier = false;
        while self.peek_ident().map_or(false, |word| MODIFIERS.contains(&word)) {
            self.bump();
            saw_modifier = true;
        }

        if let Some(kind) = self.type_keyword() {
            return self.parse_type_decl(kind, attribute_lists).map(Some);
        }
        if in_type || self.is_keyword("delegate") {
            self.skip_member()?;
            return Ok(None);
        }
        if !global.is_empty() && attribute_lists.is_empty() && !saw_modifier {
            return Ok(None);
        }
        Err(self.error_here("expected a type or namespace declaration"))
    }

    fn parse_type_decl(
        &mut self,
        kind: DeclKind,
        attribute_lists: Vec<AttributeList>,
    ) -> Result<TypeDecl, ParseError> {
        self.bump();
        if kind == DeclKind::Record && (self.is_keyword("class") || self.is_keyword("struct")) {
            self.bump();
        }
        let name_token = self.expect(TokenKind::Ident, "type name")?;
        let name = self.ident_text(name_token);
        let location = self.location_of(name_token.start);
        let id = self.ids.next_id();

        if self.peek() == Some(TokenKind::Lt) {
            self.skip_balanced(TokenKind::Lt, TokenKind::Gt)?;
        }
        if self.peek() == Some(TokenKind::LParen) {
            self.skip_balanced(TokenKind::LParen, TokenKind::RParen)?;
        }

        let mut bases = Vec::new();
        if self.peek() == Some(TokenKind::Colon) {
            self.bump();
            loop {
                bases.push(self.parse_qualified_path()?);
                if self.peek() == Some(TokenKind::Lt) {
                    self.skip_balanced(TokenKind::Lt, TokenKind::Gt)?;
                }
                if self.peek() == Some(TokenKind::LParen) {
                    self.skip_balanced(TokenKind::LParen, TokenKind::RParen)?;
                }
                if self.peek() != Some(TokenKind::Comma) {
                    break;
                }
                self.bump();
            }
        }

        while self.is_keyword("where") {
            self.skip_constraint_clause()?;
        }

        let mut members = Vec::new();
        match self.peek() {
            Some(TokenKind::Semi) => {
                self.bump();
            }
            Some(TokenKind::LBrace) if kind == DeclKind::Enum => {
                self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace)?;
            }
            Some(TokenKind::LBrace) => {
                self.bump();
                self.enter()?;
                loop {
                    match self.peek() {
                        None => return Err(self.error_here("expected `}` to close type body")),
                        Some(TokenKind::RBrace) => {
                            self.bump();
                            break;
                        }
                        _ => {
                            if let Some(member) = self.parse_member(true)? {
                                members.push(member);
                            }
                        }
                    }
                }
                self.leave();
            }
            _ => {
                return Err(self.error_here(format!(
                    "expected `{{` or `;` after declaration of `{}`",
                    name
                )))
            }
        }
        if self.peek() == Some(TokenKind::Semi) {
            self.bump();
        }

        Ok(TypeDecl {
            id,
            kind,
            name,
            attribute_lists,
            bases,
            members,
            location,
        })
    }

    fn skip_constraint_clause(&mut self) -> Result<(), ParseError> {
        self.bump();
        loop {
            match self.peek() {
                None | Some(TokenKind::LBrace) | Some(TokenKind::Semi) => return Ok(()),
                Some(TokenKind::LParen) => {
                    self.skip_balanced(TokenKind::LParen, TokenKind::RParen)?;
                }
                Some(_) if self.is_keyword("where") => return Ok(()),
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    /// Skip a non-type member: up to `;`, past its body, or up to the closing `}`.
    fn skip_member(&mut self) -> Result<(), ParseError> {
        loop {
            match self.peek() {
                None => return Err(self.error_here("unexpected end of input in type body")),
                Some(TokenKind::Semi) => {
                    self.bump();
                    return Ok(());
                }
                Some(TokenKind::RBrace) => return Ok(()),
                Some(TokenKind::LBrace) => {
                    self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace)?;
                    // `int P { get; } = 1;` continues after the accessor block
                    if self.peek() != Some(TokenKind::Eq) {
                        return Ok(());
                    }
                }
                Some(TokenKind::LParen) => {
                    self.skip_balanced(TokenKind::LParen, TokenKind::RParen)?;
                }
                Some(TokenKind::LBracket) => {
                    self.skip_balanced(TokenKind::LBracket, TokenKind::RBracket)?;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn parse_attribute_list(&mut self) -> Result<AttributeList, ParseError> {
        let open = self.expect(TokenKind::LBracket, "`[`")?;
        let location = self.location_of(open.start);
        let mut target = None;
        if self.peek() == Some(TokenKind::Ident) && self.peek_at(1) == Some(TokenKind::Colon) {
            if let Some(tok) = self.bump() {
                target = Some(self.ident_text(tok));
            }
            self.bump();
        }
        let mut attributes = Vec::new();
        loop {
            attributes.push(self.parse_attribute()?);
            match self.peek() {
                Some(TokenKind::Comma) => {
                    self.bump();
                    if self.peek() == Some(TokenKind::RBracket) {
                        self.bump();
                        break;
                    }
                }
                Some(TokenKind::RBracket) => {
                    self.bump();
                    break;
                }
                _ => return Err(self.error_here("expected `,` or `]` in attribute list")),
            }
        }
        Ok(AttributeList {
            target,
            attributes,
            location,
        })
    }

    fn parse_attribute(&mut self) -> Result<AttributeSyntax, ParseError> {
        let start = self.offset();
        let location = self.location_of(start);
        let path = self.parse_qualified_path()?;
        if self.peek() == Some(TokenKind::Lt) {
            self.skip_balanced(TokenKind::Lt, TokenKind::Gt)?;
        }
        let end = self.tokens[self.pos - 1].end;
        let name = self.source[start..end].to_string();
        let arguments = if self.peek() == Some(TokenKind::LParen) {
            let (open, close) = self.skip_balanced(TokenKind::LParen, TokenKind::RParen)?;
            Some(self.source[open.end..close.start].trim().to_string())
        } else {
            None
        };
        Ok(AttributeSyntax {
            name,
            path,
            arguments,
            location,
        })
    }
}

/// C# compilation provider.
///
/// # Example
///
/// ```
/// use attrprobe::frontends::CSharpFrontend;
/// use attrprobe::{AnalysisContext, CompilationProvider};
///
/// let frontend = CSharpFrontend::new();
/// let tree = frontend
///     .parse("[DataContract] class C {}", &AnalysisContext::new())
///     .unwrap();
/// assert_eq!(tree.types().len(), 1);
/// assert_eq!(frontend.name(), "C#");
/// assert_eq!(frontend.file_extension(), "cs");
/// ```
#[derive(Debug, Clone, Default)]
pub struct CSharpFrontend;

impl CSharpFrontend {
    /// Create a new C# frontend.
    pub fn new() -> Self {
        Self
    }
}

impl CompilationProvider for CSharpFrontend {
    fn parse(&self, source: &str, ctx: &AnalysisContext) -> Result<SyntaxTree, ParseError> {
        let tree = Parser::new(source, ctx)?.parse_compilation_unit()?;
        debug!(
            file = %ctx.file_name,
            types = tree.types().len(),
            "parsed C# source"
        );
        Ok(tree)
    }

    fn rules(&self) -> &LanguageRules {
        &CSHARP_RULES
    }

    fn format_diagnostic(&self, diagnostic: &Diagnostic, _source: &str) -> String {
        match &diagnostic.location {
            Some(loc) => format!(
                "{}({},{}): {} {}: {}",
                loc.file,
                loc.line,
                loc.column,
                diagnostic.severity,
                diagnostic.code,
                diagnostic.message
            ),
            None => format!(
                "{} {}: {}",
                diagnostic.severity, diagnostic.code, diagnostic.message
            ),
        }
    }

    fn name(&self) -> &str {
        "C#"
    }

    fn file_extension(&self) -> &str {
        "cs"
    }
}
