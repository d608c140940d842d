//! Declaration parser
//!
//! A recursive-descent reader over the token stream that recognises the
//! declarations a reference manual documents. It does not type-check and
//! does not expand macros; bodies of inline functions are skipped by
//! matching braces.

use super::lexer::{Token, TokenKind};
use crate::diagnostics::QuireError;
use crate::doc_comment::DocComment;
use crate::symbol::{
    Access, BaseClass, ClassDef, ClassKey, DefineDef, EnumDef, Enumerator, FunctionDef,
    HeaderFile, Location, Param, Scope, Symbol, SymbolDef, TypedefDef, VariableDef,
};
use crate::utils::slug::signature_hash;
use std::path::{Path, PathBuf};

/// Leading specifiers moved out of a return or variable type
const SPECIFIERS: &[&str] = &[
    "virtual", "static", "inline", "constexpr", "consteval", "constinit", "explicit", "extern",
    "thread_local", "mutable",
];

/// Keywords followed by a parenthesised operand that is not a parameter list
const NON_CALL: &[&str] = &[
    "decltype", "sizeof", "alignof", "alignas", "noexcept", "__attribute__", "__declspec",
    "throw", "static_assert", "requires", "typeof", "__typeof__",
];

/// Words that can end a parameter type, so they are never a parameter name
const TYPE_WORDS: &[&str] = &[
    "int", "char", "long", "short", "unsigned", "signed", "float", "double", "bool", "void",
    "const", "volatile", "auto", "wchar_t", "char8_t", "char16_t", "char32_t",
];

/// Result of parsing one header
#[derive(Debug, Clone)]
pub struct ParsedHeader {
    pub file: HeaderFile,
    /// Namespaces, global-scope declarations and macros
    pub symbols: Vec<Symbol>,
}

/// Parse a tokenized header
pub fn parse_header(
    tokens: &[Token],
    display_path: &str,
    real_path: &Path,
) -> Result<ParsedHeader, Vec<QuireError>> {
    let mut parser = Parser::new(tokens, display_path, real_path);
    let global = Scope::file(parser.file.refid.clone());
    let mut symbols = parser.block(&global, None, false);
    symbols.append(&mut parser.macros);

    if parser.errors.is_empty() {
        Ok(ParsedHeader {
            file: parser.file,
            symbols,
        })
    } else {
        Err(parser.errors)
    }
}

/// Enclosing class while parsing members
#[derive(Debug, Clone, Copy)]
struct ClassCtx<'n> {
    name: &'n str,
    key: ClassKey,
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    file: HeaderFile,
    path: PathBuf,
    errors: Vec<QuireError>,
    pending_doc: Option<DocComment>,
    macros: Vec<Symbol>,
    file_scope: Scope,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token], display_path: &str, real_path: &Path) -> Self {
        let file = HeaderFile::new(display_path);
        let file_scope = Scope::file(file.refid.clone());
        Self {
            tokens,
            pos: 0,
            file,
            path: real_path.to_path_buf(),
            errors: Vec::new(),
            pending_doc: None,
            macros: Vec::new(),
            file_scope,
        }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'t Token> {
        self.tokens.get(self.pos + offset)
    }

    fn peek_is_punct(&self, p: &str) -> bool {
        self.peek().is_some_and(|t| t.is_punct(p))
    }

    fn peek_is_ident(&self, word: &str) -> bool {
        self.peek().is_some_and(|t| t.is_ident(word))
    }

    fn location(&self, tok: &Token) -> Location {
        Location::new(self.file.path.clone(), tok.line, tok.col)
    }

    fn error_at(&mut self, tok: &Token, message: impl Into<String>) {
        self.errors
            .push(QuireError::parse_at(&self.path, message, tok.line, tok.col));
    }

    fn cut_off(&mut self, start: &Token) {
        self.error_at(start, "declaration cut off by end of file");
    }

    /// Parse declarations until the closing brace (or end of input at file level)
    fn block(&mut self, scope: &Scope, class: Option<ClassCtx<'_>>, closing: bool) -> Vec<Symbol> {
        let mut out: Vec<Symbol> = Vec::new();
        let mut access = class
            .map(|c| c.key.default_access())
            .unwrap_or(Access::Public);
        let mut last_kept = false;
        let all = self.tokens;
        let open = self.pos.checked_sub(1).and_then(|p| all.get(p));

        loop {
            let Some(tok) = self.peek() else {
                if closing {
                    if let Some(open) = open {
                        self.cut_off(open);
                    }
                }
                return out;
            };

            match &tok.kind {
                TokenKind::DocComment { trailing: true } => {
                    self.pos += 1;
                    if last_kept {
                        if let Some(last) = out.last_mut() {
                            let doc = std::mem::take(&mut last.doc);
                            last.doc = doc.merge(DocComment::parse(&tok.text));
                        }
                    }
                    continue;
                }
                TokenKind::DocComment { trailing: false } => {
                    self.pos += 1;
                    let doc = DocComment::parse(&tok.text);
                    if tok.text.contains("@file") || tok.text.contains("\\file") {
                        self.file.doc = doc;
                    } else {
                        self.pending_doc = Some(match self.pending_doc.take() {
                            Some(prev) => prev.merge(doc),
                            None => doc,
                        });
                    }
                    continue;
                }
                TokenKind::Directive { name } => {
                    self.directive(tok, name);
                    continue;
                }
                _ => {}
            }

            if tok.is_punct("}") {
                self.pos += 1;
                if closing {
                    return out;
                }
                self.error_at(tok, "unexpected '}'");
                continue;
            }
            if tok.is_punct(";") {
                self.pos += 1;
                continue;
            }

            if class.is_some()
                && self.peek_at(1).is_some_and(|t| t.is_punct(":"))
                && matches!(tok.text.as_str(), "public" | "protected" | "private")
            {
                access = match tok.text.as_str() {
                    "public" => Access::Public,
                    "protected" => Access::Protected,
                    _ => Access::Private,
                };
                self.pos += 2;
                continue;
            }

            let doc = self.pending_doc.take().unwrap_or_default();
            let start = self.pos;
            let symbols = self.declaration(scope, class, doc);
            last_kept = false;
            for symbol in symbols {
                if access.is_documented() {
                    let access = if class.is_some() { access } else { Access::Public };
                    out.push(symbol.with_access(access));
                    last_kept = true;
                }
            }
            if self.pos == start {
                self.pos += 1;
            }
        }
    }

    fn directive(&mut self, tok: &'t Token, name: &str) {
        self.pos += 1;
        match name {
            "include" => self.file.includes.push(tok.text.clone()),
            "ifndef" => {
                // include guard: `#ifndef X` directly followed by `#define X`
                if let Some(next) = self.peek() {
                    if next.kind == (TokenKind::Directive { name: "define".into() })
                        && next.text.trim() == tok.text.trim()
                    {
                        self.pos += 1;
                    }
                }
            }
            "define" => {
                let doc = self.pending_doc.take().unwrap_or_default();
                if let Some(symbol) = self.define(tok, doc) {
                    self.macros.push(symbol);
                }
            }
            _ => {}
        }
    }

    fn define(&self, tok: &Token, doc: DocComment) -> Option<Symbol> {
        let text = tok.text.trim();
        let name_end = text
            .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .unwrap_or(text.len());
        let name = &text[..name_end];
        if name.is_empty() {
            return None;
        }
        let rest = &text[name_end..];
        let (params, value) = if let Some(after) = rest.strip_prefix('(') {
            let close = after.find(')')?;
            let params = after[..close]
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
            (Some(params), after[close + 1..].trim())
        } else {
            (None, rest.trim())
        };
        let value = value.split_whitespace().collect::<Vec<_>>().join(" ");

        Some(Symbol::new(
            name,
            &self.file_scope,
            self.location(tok),
            doc,
            SymbolDef::Define {
                define_def: DefineDef { params, value },
            },
        ))
    }

    fn declaration(&mut self, scope: &Scope, class: Option<ClassCtx<'_>>, doc: DocComment) -> Vec<Symbol> {
        let Some(tok) = self.peek() else {
            return vec![];
        };
        match tok.text.as_str() {
            "namespace" if tok.is_any_ident() => self.namespace(scope, doc),
            "inline" if self.peek_at(1).is_some_and(|t| t.is_ident("namespace")) => {
                self.pos += 1;
                self.namespace(scope, doc)
            }
            "extern" if self.peek_at(1).is_some_and(|t| t.kind == TokenKind::Str) => {
                self.pos += 2;
                if self.peek_is_punct("{") {
                    self.pos += 1;
                    self.block(scope, None, true)
                } else {
                    self.declaration(scope, class, doc)
                }
            }
            "template" if tok.is_any_ident() => {
                self.pos += 1;
                if !self.peek_is_punct("<") {
                    // explicit instantiation
                    self.skip_statement();
                    return vec![];
                }
                let params = self.template_params();
                self.templated(scope, class, doc, params)
            }
            "using" => self.using(scope, doc, None),
            "typedef" => self.typedef(scope, doc),
            "static_assert" | "friend" => {
                self.skip_statement();
                vec![]
            }
            "class" | "struct" | "union" => self.class_or_declaration(scope, class, doc, None),
            "enum" => self.enum_or_declaration(scope, class, doc),
            _ => self.generic(scope, class, doc, None),
        }
    }

    fn templated(
        &mut self,
        scope: &Scope,
        class: Option<ClassCtx<'_>>,
        doc: DocComment,
        params: String,
    ) -> Vec<Symbol> {
        match self.peek().map(|t| t.text.as_str()) {
            Some("class") | Some("struct") | Some("union") => {
                self.class_or_declaration(scope, class, doc, Some(params))
            }
            Some("using") => self.using(scope, doc, Some(params)),
            Some("friend") => {
                self.skip_statement();
                vec![]
            }
            Some("template") => {
                // member template of a class template: keep the innermost list
                self.pos += 1;
                if !self.peek_is_punct("<") {
                    self.skip_statement();
                    return vec![];
                }
                let inner = self.template_params();
                self.templated(scope, class, doc, inner)
            }
            _ => self.generic(scope, class, doc, Some(params)),
        }
    }

    /// `<...>` after `template`; returns the inner text
    fn template_params(&mut self) -> String {
        let start = self.pos;
        self.pos += 1;
        let mut angle = 1usize;
        let mut paren = 0usize;
        let inner_start = self.pos;
        while let Some(tok) = self.peek() {
            match tok.text.as_str() {
                "(" | "[" | "{" if tok.kind == TokenKind::Punct => paren += 1,
                ")" | "]" | "}" if tok.kind == TokenKind::Punct => paren = paren.saturating_sub(1),
                "<" if paren == 0 => angle += 1,
                ">" if paren == 0 => {
                    angle -= 1;
                    if angle == 0 {
                        let text = join(&self.tokens[inner_start..self.pos]);
                        self.pos += 1;
                        return text;
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        let all = self.tokens;
        self.cut_off(&all[start]);
        String::new()
    }

    fn namespace(&mut self, scope: &Scope, doc: DocComment) -> Vec<Symbol> {
        let Some(start) = self.peek() else {
            return vec![];
        };
        self.pos += 1;

        let mut names: Vec<String> = Vec::new();
        while let Some(tok) = self.peek() {
            if tok.is_ident("inline") {
                self.pos += 1;
            } else if tok.is_any_ident() {
                names.push(tok.text.clone());
                self.pos += 1;
            } else if tok.is_punct("::") {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.skip_attributes();

        if self.peek_is_punct("=") {
            // namespace alias
            self.skip_statement();
            return vec![];
        }
        if !self.peek_is_punct("{") {
            match self.peek() {
                Some(tok) => self.error_at(tok, "expected '{' after namespace name"),
                None => self.cut_off(start),
            }
            self.skip_statement();
            return vec![];
        }
        self.pos += 1;

        if names.is_empty() {
            // anonymous namespace: internal linkage, not documented
            let hidden = Scope {
                name: scope.qualify("(anonymous)"),
                refid: scope.refid.clone(),
            };
            self.block(&hidden, None, true);
            return vec![];
        }

        let location = self.location(start);
        vec![self.nested_namespace(&names, scope, location, doc)]
    }

    fn nested_namespace(
        &mut self,
        names: &[String],
        scope: &Scope,
        location: Location,
        doc: DocComment,
    ) -> Symbol {
        let last = names.len() == 1;
        let mut symbol = Symbol::new(
            &names[0],
            scope,
            location.clone(),
            if last { doc.clone() } else { DocComment::default() },
            SymbolDef::Namespace,
        );
        let inner = Scope::of(&symbol);
        symbol.children = if last {
            self.block(&inner, None, true)
        } else {
            vec![self.nested_namespace(&names[1..], &inner, location, doc)]
        };
        symbol
    }

    /// `[[...]]`, `alignas(...)`, `__attribute__((...))`, `__declspec(...)`
    fn skip_attributes(&mut self) {
        loop {
            if self.peek_is_punct("[") && self.peek_at(1).is_some_and(|t| t.is_punct("[")) {
                self.skip_balanced("[", "]");
            } else if self
                .peek()
                .is_some_and(|t| matches!(t.text.as_str(), "alignas" | "__attribute__" | "__declspec"))
                && self.peek_at(1).is_some_and(|t| t.is_punct("("))
            {
                self.pos += 1;
                self.skip_balanced("(", ")");
            } else {
                return;
            }
        }
    }

    /// Skip a balanced group starting at the current `open` token
    fn skip_balanced(&mut self, open: &str, close: &str) -> bool {
        let Some(start) = self.peek() else {
            return false;
        };
        let mut depth = 0usize;
        while let Some(tok) = self.peek() {
            if tok.kind == TokenKind::Punct {
                if tok.text == open {
                    depth += 1;
                } else if tok.text == close {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += 1;
                        return true;
                    }
                }
            }
            self.pos += 1;
        }
        self.cut_off(start);
        false
    }

    /// Skip to the end of the current statement
    fn skip_statement(&mut self) {
        let Some(start) = self.peek() else {
            return;
        };
        let mut depth = 0usize;
        let mut saw_parens = false;
        while let Some(tok) = self.peek() {
            if tok.kind == TokenKind::Punct {
                match tok.text.as_str() {
                    "(" | "[" => depth += 1,
                    ")" | "]" => {
                        depth = depth.saturating_sub(1);
                        saw_parens = true;
                    }
                    ";" if depth == 0 => {
                        self.pos += 1;
                        return;
                    }
                    "{" if depth == 0 => {
                        if !self.skip_balanced("{", "}") {
                            return;
                        }
                        if saw_parens && !self.peek_is_punct(";") {
                            return;
                        }
                        continue;
                    }
                    "}" if depth == 0 => {
                        // end of the enclosing block; leave it to the caller
                        self.error_at(start, "expected ';' before '}'");
                        return;
                    }
                    _ => {}
                }
            }
            self.pos += 1;
        }
        self.cut_off(start);
    }

    fn using(&mut self, scope: &Scope, doc: DocComment, template_params: Option<String>) -> Vec<Symbol> {
        let Some(start) = self.peek() else {
            return vec![];
        };
        self.pos += 1;

        let is_alias = self.peek().is_some_and(Token::is_any_ident)
            && !self.peek_is_ident("namespace")
            && {
                let mut offset = 1;
                // `using X [[attr]] = ...`
                while self.peek_at(offset).is_some_and(|t| t.is_punct("[")) {
                    offset += 1;
                    while self.peek_at(offset).is_some_and(|t| !t.is_punct("]")) {
                        offset += 1;
                    }
                    offset += 2;
                }
                self.peek_at(offset).is_some_and(|t| t.is_punct("="))
            };
        if !is_alias {
            self.skip_statement();
            return vec![];
        }

        let Some(name_tok) = self.peek() else {
            return vec![];
        };
        self.pos += 1;
        self.skip_attributes();
        self.pos += 1; // '='

        let target_start = self.pos;
        let mut depth = 0usize;
        loop {
            let Some(tok) = self.peek() else {
                self.cut_off(start);
                return vec![];
            };
            if tok.kind == TokenKind::Punct {
                match tok.text.as_str() {
                    "(" | "[" | "{" => depth += 1,
                    ")" | "]" | "}" if depth > 0 => depth -= 1,
                    ";" if depth == 0 => break,
                    "}" => {
                        self.error_at(start, "expected ';' after alias declaration");
                        return vec![];
                    }
                    _ => {}
                }
            }
            self.pos += 1;
        }
        let target = join(&self.tokens[target_start..self.pos]);
        self.pos += 1;

        vec![Symbol::new(
            &name_tok.text,
            scope,
            self.location(start),
            doc,
            SymbolDef::Typedef {
                typedef_def: TypedefDef {
                    target,
                    template_params,
                    is_using: true,
                },
            },
        )]
    }

    fn typedef(&mut self, scope: &Scope, doc: DocComment) -> Vec<Symbol> {
        let Some(start) = self.peek() else {
            return vec![];
        };
        self.pos += 1;

        // `typedef struct [tag] { ... } name;`
        if let Some(kw) = self.peek() {
            let is_compound = matches!(kw.text.as_str(), "struct" | "union" | "enum");
            let tag = self.peek_at(1).filter(|t| t.is_any_ident());
            let brace_at = if tag.is_some() { 2 } else { 1 };
            if is_compound && self.peek_at(brace_at).is_some_and(|t| t.is_punct("{")) {
                return self.typedef_compound(scope, doc, start, kw, tag);
            }
        }

        let decl_start = self.pos;
        let mut depth = 0usize;
        loop {
            let Some(tok) = self.peek() else {
                self.cut_off(start);
                return vec![];
            };
            if tok.kind == TokenKind::Punct {
                match tok.text.as_str() {
                    "(" | "[" => depth += 1,
                    ")" | "]" => depth = depth.saturating_sub(1),
                    ";" if depth == 0 => break,
                    "{" | "}" => {
                        self.error_at(start, "unexpected brace in typedef");
                        self.skip_statement();
                        return vec![];
                    }
                    _ => {}
                }
            }
            self.pos += 1;
        }
        let tokens: Vec<&Token> = self.tokens[decl_start..self.pos].iter().collect();
        self.pos += 1;

        let Some((name_idx, _)) = declarator_name(&tokens) else {
            return vec![];
        };
        let name = tokens[name_idx].text.clone();
        let target_tokens: Vec<&Token> = tokens
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != name_idx)
            .map(|(_, t)| *t)
            .collect();

        vec![Symbol::new(
            name,
            scope,
            self.location(start),
            doc,
            SymbolDef::Typedef {
                typedef_def: TypedefDef {
                    target: join_refs(&target_tokens),
                    template_params: None,
                    is_using: false,
                },
            },
        )]
    }

    fn typedef_compound(
        &mut self,
        scope: &Scope,
        doc: DocComment,
        start: &'t Token,
        keyword: &'t Token,
        tag: Option<&'t Token>,
    ) -> Vec<Symbol> {
        // find the typedef name after the closing brace
        let body_pos = self.pos + if tag.is_some() { 2 } else { 1 };
        let mut cursor = body_pos;
        let mut depth = 0usize;
        while let Some(tok) = self.tokens.get(cursor) {
            if tok.is_punct("{") {
                depth += 1;
            } else if tok.is_punct("}") {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            cursor += 1;
        }
        let mut alias = None;
        cursor += 1;
        while let Some(tok) = self.tokens.get(cursor) {
            if tok.is_punct(";") || tok.is_punct(",") {
                break;
            }
            if tok.is_any_ident() {
                alias = Some(tok.text.clone());
            }
            cursor += 1;
        }

        let compound_name = tag
            .map(|t| t.text.clone())
            .or_else(|| alias.clone())
            .unwrap_or_default();
        self.pos = body_pos;
        let location = self.location(start);

        let mut compound = if keyword.text == "enum" {
            self.enum_body(scope, &compound_name, false, None, location.clone(), doc.clone())
        } else {
            let key = if keyword.text == "union" {
                ClassKey::Union
            } else {
                ClassKey::Struct
            };
            let class_def = ClassDef {
                key,
                bases: vec![],
                template_params: None,
                is_final: false,
            };
            vec![self.class_body(scope, &compound_name, class_def, location.clone(), doc.clone())]
        };
        self.skip_statement();

        if compound_name.is_empty() {
            return vec![];
        }
        if let (Some(tag), Some(alias)) = (tag, alias) {
            if tag.text != alias {
                compound.push(Symbol::new(
                    alias,
                    scope,
                    location,
                    DocComment::default(),
                    SymbolDef::Typedef {
                        typedef_def: TypedefDef {
                            target: format!("{} {}", keyword.text, tag.text),
                            template_params: None,
                            is_using: false,
                        },
                    },
                ));
            }
        }
        compound
    }

    fn class_or_declaration(
        &mut self,
        scope: &Scope,
        class: Option<ClassCtx<'_>>,
        doc: DocComment,
        template_params: Option<String>,
    ) -> Vec<Symbol> {
        let save = self.pos;
        let Some(start) = self.peek() else {
            return vec![];
        };
        let key = match start.text.as_str() {
            "class" => ClassKey::Class,
            "struct" => ClassKey::Struct,
            _ => ClassKey::Union,
        };
        self.pos += 1;
        self.skip_attributes();

        let mut name = String::new();
        let mut qualified = false;
        while let Some(tok) = self.peek() {
            if tok.is_any_ident() && !tok.is_ident("final") {
                name = tok.text.clone();
                self.pos += 1;
                if self.peek_is_punct("::") {
                    qualified = true;
                    self.pos += 1;
                    continue;
                }
            }
            break;
        }
        if !name.is_empty() && self.peek_is_punct("<") {
            // partial or explicit specialization
            let spec_start = self.pos;
            self.skip_angles();
            name.push_str(&join(&self.tokens[spec_start..self.pos]));
        }
        let mut is_final = false;
        if self.peek_is_ident("final") {
            is_final = true;
            self.pos += 1;
        }

        match self.peek() {
            Some(tok) if tok.is_punct(";") => {
                // forward declaration
                self.pos += 1;
                return vec![];
            }
            Some(tok) if tok.is_punct(":") || tok.is_punct("{") => {}
            _ => {
                self.pos = save;
                return self.generic(scope, class, doc, template_params);
            }
        }

        let mut bases = Vec::new();
        if self.peek_is_punct(":") {
            self.pos += 1;
            bases = self.base_clause(key);
        }
        if !self.peek_is_punct("{") {
            match self.peek() {
                Some(tok) => self.error_at(tok, "expected '{' after base clause"),
                None => self.cut_off(start),
            }
            self.skip_statement();
            return vec![];
        }

        let location = self.location(start);
        let class_def = ClassDef {
            key,
            bases,
            template_params,
            is_final,
        };
        let symbol = self.class_body(scope, &name, class_def, location, doc);
        // trailing declarators: `} instance;`
        self.skip_statement();

        if name.is_empty() || qualified {
            vec![]
        } else {
            vec![symbol]
        }
    }

    fn base_clause(&mut self, key: ClassKey) -> Vec<BaseClass> {
        let mut bases = Vec::new();
        loop {
            let mut access = key.default_access();
            let mut is_virtual = false;
            while let Some(tok) = self.peek() {
                match tok.text.as_str() {
                    "virtual" => is_virtual = true,
                    "public" => access = Access::Public,
                    "protected" => access = Access::Protected,
                    "private" => access = Access::Private,
                    _ => break,
                }
                self.pos += 1;
            }
            let name_start = self.pos;
            let mut angle = 0usize;
            while let Some(tok) = self.peek() {
                if tok.is_punct("<") {
                    angle += 1;
                } else if tok.is_punct(">") {
                    angle = angle.saturating_sub(1);
                } else if angle == 0 && (tok.is_punct(",") || tok.is_punct("{")) {
                    break;
                }
                self.pos += 1;
            }
            if self.pos > name_start {
                bases.push(BaseClass {
                    name: join(&self.tokens[name_start..self.pos]),
                    access,
                    is_virtual,
                });
            }
            if self.peek_is_punct(",") {
                self.pos += 1;
                continue;
            }
            return bases;
        }
    }

    /// Parse `{ members }` of a class; the current token is `{`
    fn class_body(
        &mut self,
        scope: &Scope,
        name: &str,
        class_def: ClassDef,
        location: Location,
        doc: DocComment,
    ) -> Symbol {
        self.pos += 1;
        let key = class_def.key;
        let display_name = if name.is_empty() { "(anonymous)" } else { name };
        let mut symbol = Symbol::new(
            display_name,
            scope,
            location,
            doc,
            SymbolDef::Class { class_def },
        );
        let inner = Scope::of(&symbol);
        let ctx = ClassCtx {
            name: display_name,
            key,
        };
        symbol.children = self.block(&inner, Some(ctx), true);
        symbol
    }

    fn skip_angles(&mut self) {
        let mut angle = 0usize;
        while let Some(tok) = self.peek() {
            if tok.is_punct("<") {
                angle += 1;
            } else if tok.is_punct(">") {
                angle -= 1;
                if angle == 0 {
                    self.pos += 1;
                    return;
                }
            } else if tok.is_punct(";") || tok.is_punct("{") {
                return;
            }
            self.pos += 1;
        }
    }

    fn enum_or_declaration(
        &mut self,
        scope: &Scope,
        class: Option<ClassCtx<'_>>,
        doc: DocComment,
    ) -> Vec<Symbol> {
        let save = self.pos;
        let Some(start) = self.peek() else {
            return vec![];
        };
        self.pos += 1;
        let scoped = self.peek_is_ident("class") || self.peek_is_ident("struct");
        if scoped {
            self.pos += 1;
        }
        self.skip_attributes();

        let mut name = String::new();
        if let Some(tok) = self.peek().filter(|t| t.is_any_ident()) {
            name = tok.text.clone();
            self.pos += 1;
        }

        let mut underlying = None;
        if self.peek_is_punct(":") {
            self.pos += 1;
            let type_start = self.pos;
            while let Some(tok) = self.peek() {
                if tok.is_punct("{") || tok.is_punct(";") {
                    break;
                }
                self.pos += 1;
            }
            underlying = Some(join(&self.tokens[type_start..self.pos]));
        }

        match self.peek() {
            Some(tok) if tok.is_punct(";") => {
                // opaque declaration
                self.pos += 1;
                vec![]
            }
            Some(tok) if tok.is_punct("{") => {
                let location = self.location(start);
                let symbols = self.enum_body(scope, &name, scoped, underlying, location, doc);
                self.skip_statement();
                symbols
            }
            _ => {
                self.pos = save;
                self.generic(scope, class, doc, None)
            }
        }
    }

    /// Parse `{ enumerators }`; the current token is `{`
    ///
    /// An anonymous enum yields its enumerators as constants of the
    /// enclosing scope.
    fn enum_body(
        &mut self,
        scope: &Scope,
        name: &str,
        scoped: bool,
        underlying_type: Option<String>,
        location: Location,
        doc: DocComment,
    ) -> Vec<Symbol> {
        let Some(open) = self.peek() else {
            return vec![];
        };
        self.pos += 1;

        let enum_qualified = scope.qualify(name);
        let mut enumerators: Vec<(Enumerator, Location)> = Vec::new();
        let mut pending: Option<DocComment> = None;

        loop {
            let Some(tok) = self.peek() else {
                self.cut_off(open);
                return vec![];
            };
            match &tok.kind {
                TokenKind::DocComment { trailing: true } => {
                    if let Some((last, _)) = enumerators.last_mut() {
                        let doc = std::mem::take(&mut last.doc);
                        last.doc = doc.merge(DocComment::parse(&tok.text));
                    }
                    self.pos += 1;
                    continue;
                }
                TokenKind::DocComment { trailing: false } => {
                    let doc = DocComment::parse(&tok.text);
                    pending = Some(match pending.take() {
                        Some(prev) => prev.merge(doc),
                        None => doc,
                    });
                    self.pos += 1;
                    continue;
                }
                TokenKind::Directive { .. } => {
                    self.pos += 1;
                    continue;
                }
                _ => {}
            }
            if tok.is_punct("}") {
                self.pos += 1;
                break;
            }
            if !tok.is_any_ident() {
                self.pos += 1;
                continue;
            }

            let enumerator_name = tok.text.clone();
            let enumerator_location = self.location(tok);
            self.pos += 1;
            self.skip_attributes();
            let mut initializer = None;
            if self.peek_is_punct("=") {
                self.pos += 1;
                let expr_start = self.pos;
                let mut depth = 0usize;
                while let Some(t) = self.peek() {
                    if t.kind == TokenKind::Punct {
                        match t.text.as_str() {
                            "(" | "[" | "{" => depth += 1,
                            ")" | "]" => depth = depth.saturating_sub(1),
                            "}" if depth > 0 => depth -= 1,
                            "}" | "," if depth == 0 => break,
                            _ => {}
                        }
                    }
                    if t.is_doc() {
                        break;
                    }
                    self.pos += 1;
                }
                initializer = Some(join(&self.tokens[expr_start..self.pos]));
            }

            let qualified = if scoped || name.is_empty() {
                format!("{}::{}", enum_qualified, enumerator_name)
            } else {
                scope.qualify(&enumerator_name)
            };
            enumerators.push((
                Enumerator {
                    refid: format!("{}_1a{}", scope.refid, signature_hash(&qualified)),
                    name: enumerator_name,
                    initializer,
                    doc: pending.take().unwrap_or_default(),
                },
                enumerator_location,
            ));
        }

        if name.is_empty() {
            return enumerators
                .into_iter()
                .map(|(e, loc)| {
                    Symbol::new(
                        e.name,
                        scope,
                        loc,
                        e.doc,
                        SymbolDef::Variable {
                            variable_def: VariableDef {
                                type_name: "enum".to_string(),
                                initializer: e.initializer,
                                specifiers: vec![],
                            },
                        },
                    )
                })
                .collect();
        }

        vec![Symbol::new(
            name,
            scope,
            location,
            doc,
            SymbolDef::Enum {
                enum_def: EnumDef {
                    scoped,
                    underlying_type,
                    enumerators: enumerators.into_iter().map(|(e, _)| e).collect(),
                },
            },
        )]
    }

    /// Function or variable declaration
    fn generic(
        &mut self,
        scope: &Scope,
        class: Option<ClassCtx<'_>>,
        mut doc: DocComment,
        template_params: Option<String>,
    ) -> Vec<Symbol> {
        let Some(start) = self.peek() else {
            return vec![];
        };

        let mut tokens: Vec<&'t Token> = Vec::new();
        let mut depth = 0usize;
        let mut has_body = false;
        let mut init_list = false;

        loop {
            let Some(tok) = self.peek() else {
                self.cut_off(start);
                return vec![];
            };
            if matches!(tok.kind, TokenKind::DocComment { .. } | TokenKind::Directive { .. }) {
                self.pos += 1;
                continue;
            }
            if tok.kind == TokenKind::Punct && depth == 0 {
                match tok.text.as_str() {
                    ";" => {
                        self.pos += 1;
                        break;
                    }
                    "{" => {
                        if find_param_list(&tokens).is_some() {
                            has_body = true;
                            break;
                        }
                        // brace initializer
                        let all = self.tokens;
                        let init_start = self.pos;
                        if !self.skip_balanced("{", "}") {
                            return vec![];
                        }
                        tokens.extend(all[init_start..self.pos].iter());
                        continue;
                    }
                    "}" => {
                        self.error_at(start, "expected ';' before '}'");
                        return vec![];
                    }
                    ":" if find_param_list(&tokens).is_some() =>
                    {
                        init_list = true;
                        self.pos += 1;
                        break;
                    }
                    _ => {}
                }
            }
            if tok.kind == TokenKind::Punct {
                match tok.text.as_str() {
                    "(" | "[" => depth += 1,
                    ")" | "]" => depth = depth.saturating_sub(1),
                    _ => {}
                }
            }
            tokens.push(tok);
            self.pos += 1;
        }

        if init_list {
            self.skip_init_list();
            has_body = true;
        }
        if has_body && !self.skip_balanced("{", "}") {
            return vec![];
        }

        let (tokens, deprecated) = strip_attributes(&tokens);
        if deprecated && doc.deprecated.is_none() {
            doc.deprecated = Some(String::new());
        }
        if tokens.is_empty() {
            return vec![];
        }

        match find_param_list(&tokens) {
            Some(paren) => self
                .function(scope, class, doc, template_params, &tokens, paren, start)
                .into_iter()
                .collect(),
            None => self
                .variable(scope, doc, &tokens, start)
                .into_iter()
                .collect(),
        }
    }

    /// Skip `a(1), b{2}` up to the body brace
    fn skip_init_list(&mut self) {
        while let Some(tok) = self.peek() {
            if tok.is_punct("(") {
                if !self.skip_balanced("(", ")") {
                    return;
                }
                continue;
            }
            if tok.is_punct("{") {
                // a member brace-initializer follows a name; the body follows `)` or `}`
                let prev_is_name = self
                    .pos
                    .checked_sub(1)
                    .and_then(|p| self.tokens.get(p))
                    .is_some_and(|p| p.is_any_ident() || p.is_punct(">"));
                if prev_is_name {
                    if !self.skip_balanced("{", "}") {
                        return;
                    }
                    continue;
                }
                return;
            }
            self.pos += 1;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn function(
        &mut self,
        scope: &Scope,
        class: Option<ClassCtx<'_>>,
        doc: DocComment,
        template_params: Option<String>,
        tokens: &[&'t Token],
        paren: usize,
        start: &Token,
    ) -> Option<Symbol> {
        let close = matching_paren(tokens, paren)?;

        // name
        let operator_at = tokens[..paren].iter().rposition(|t| t.is_ident("operator"));
        let (name, name_start) = match operator_at {
            Some(k) => {
                let rest = &tokens[k + 1..paren];
                let mut name = "operator".to_string();
                if rest.first().is_some_and(|t| t.is_any_ident()) {
                    name.push(' ');
                }
                name.push_str(&join_refs(rest));
                (name, k)
            }
            None => {
                let name_tok = tokens[paren - 1];
                if paren >= 2 && tokens[paren - 2].is_punct("~") {
                    (format!("~{}", name_tok.text), paren - 2)
                } else {
                    (name_tok.text.clone(), paren - 1)
                }
            }
        };
        if name_start > 0 && tokens[name_start - 1].is_punct("::") {
            // out-of-line member definition
            return None;
        }

        // leading specifiers and return type
        let mut specifiers = Vec::new();
        let mut return_tokens: Vec<&Token> = Vec::new();
        let mut idx = 0;
        while idx < name_start {
            let tok = tokens[idx];
            if tok.is_ident("friend") {
                return None;
            }
            if tok.kind == TokenKind::Ident && SPECIFIERS.contains(&tok.text.as_str()) {
                specifiers.push(tok.text.clone());
                // `extern "C"`
                if tok.text == "extern" && tokens.get(idx + 1).is_some_and(|t| t.kind == TokenKind::Str) {
                    idx += 1;
                }
            } else {
                return_tokens.push(tok);
            }
            idx += 1;
        }
        let mut return_type = if return_tokens.is_empty() {
            None
        } else {
            Some(join_refs(&return_tokens))
        };

        let is_special = match class {
            Some(ctx) => name == ctx.name || name.starts_with('~') || operator_at.is_some(),
            None => operator_at.is_some(),
        };
        if return_type.is_none() && !is_special {
            // a macro invocation such as `DECLARE_THING(x);`
            return None;
        }

        // parameters
        let (params, is_variadic) = parse_params(&tokens[paren + 1..close]);

        // trailing qualifiers
        let mut qualifiers = Vec::new();
        let mut assignment = None;
        let mut idx = close + 1;
        while idx < tokens.len() {
            let tok = tokens[idx];
            match tok.text.as_str() {
                "const" | "volatile" | "override" | "final" | "&" | "&&" => {
                    qualifiers.push(tok.text.clone());
                    idx += 1;
                }
                "noexcept" | "throw" => {
                    let mut text = tok.text.clone();
                    idx += 1;
                    if tokens.get(idx).is_some_and(|t| t.is_punct("(")) {
                        let end = matching_paren(tokens, idx).unwrap_or(tokens.len() - 1);
                        text.push_str(&join_refs(&tokens[idx..=end]));
                        idx = end + 1;
                    }
                    qualifiers.push(text);
                }
                "->" => {
                    let type_start = idx + 1;
                    let mut end = type_start;
                    while end < tokens.len()
                        && !tokens[end].is_punct("=")
                        && !matches!(tokens[end].text.as_str(), "override" | "final")
                    {
                        end += 1;
                    }
                    let trailing = join_refs(&tokens[type_start..end]);
                    if !trailing.is_empty() {
                        return_type = Some(trailing);
                    }
                    idx = end;
                }
                "=" => {
                    assignment = tokens.get(idx + 1).map(|t| t.text.clone());
                    idx += 2;
                }
                "requires" => break,
                _ => idx += 1,
            }
        }

        Some(Symbol::new(
            name,
            scope,
            self.location(start),
            doc,
            SymbolDef::Function {
                function_def: FunctionDef {
                    return_type,
                    params,
                    template_params,
                    specifiers,
                    qualifiers,
                    assignment,
                    is_variadic,
                },
            },
        ))
    }

    fn variable(
        &mut self,
        scope: &Scope,
        doc: DocComment,
        tokens: &[&'t Token],
        start: &Token,
    ) -> Option<Symbol> {
        if tokens.iter().any(|t| t.is_ident("friend")) {
            return None;
        }

        // split off the initializer
        let mut depth = 0usize;
        let mut end = tokens.len();
        let mut initializer = None;
        for (i, tok) in tokens.iter().enumerate() {
            match tok.text.as_str() {
                "(" | "[" if tok.kind == TokenKind::Punct => depth += 1,
                ")" | "]" if tok.kind == TokenKind::Punct => depth = depth.saturating_sub(1),
                "=" if depth == 0 => {
                    end = i;
                    initializer = Some(join_refs(&tokens[i + 1..]));
                    break;
                }
                "{" if depth == 0 => {
                    end = i;
                    initializer = Some(join_refs(&tokens[i..]));
                    break;
                }
                ":" if depth == 0 => {
                    // bit-field width
                    end = i;
                    break;
                }
                _ => {}
            }
        }
        let declarator = &tokens[..end];
        // only the first of `int a, b;`
        let declarator = match top_level_comma(declarator) {
            Some(comma) => &declarator[..comma],
            None => declarator,
        };

        let (name_idx, _) = declarator_name(declarator)?;
        if name_idx == 0 {
            return None;
        }

        let mut specifiers = Vec::new();
        let mut type_tokens: Vec<&Token> = Vec::new();
        for (i, tok) in declarator.iter().enumerate() {
            if i == name_idx {
                continue;
            }
            if tok.kind == TokenKind::Ident && SPECIFIERS.contains(&tok.text.as_str()) {
                specifiers.push(tok.text.clone());
            } else if tok.kind == TokenKind::Str && i > 0 && declarator[i - 1].is_ident("extern") {
                continue;
            } else {
                type_tokens.push(tok);
            }
        }
        if type_tokens.is_empty() {
            return None;
        }

        Some(Symbol::new(
            &declarator[name_idx].text,
            scope,
            self.location(start),
            doc,
            SymbolDef::Variable {
                variable_def: VariableDef {
                    type_name: join_refs(&type_tokens),
                    initializer,
                    specifiers,
                },
            },
        ))
    }
}

/// Index of the `(` opening the parameter list of a function declarator
fn find_param_list(tokens: &[&Token]) -> Option<usize> {
    let mut depth = 0usize;
    let mut operator_at: Option<usize> = None;
    let mut idx = 0;
    while idx < tokens.len() {
        let tok = tokens[idx];
        if tok.is_ident("operator") && depth == 0 {
            operator_at = Some(idx);
        }
        if tok.kind == TokenKind::Punct {
            match tok.text.as_str() {
                "=" if depth == 0 && operator_at.is_none() => return None,
                "(" => {
                    if depth == 0 {
                        if let Some(k) = operator_at {
                            // `operator()` names the call operator
                            if idx == k + 1 && tokens.get(idx + 1).is_some_and(|t| t.is_punct(")")) {
                                idx += 2;
                                continue;
                            }
                            return Some(idx);
                        }
                        let prev = idx.checked_sub(1).map(|p| tokens[p]);
                        let is_call = prev.is_some_and(|p| {
                            p.is_any_ident() && !NON_CALL.contains(&p.text.as_str())
                        });
                        let is_declarator_group = tokens
                            .get(idx + 1)
                            .is_some_and(|t| t.is_punct("*") || t.is_punct("&") || t.is_punct("^"));
                        if is_call && !is_declarator_group {
                            return Some(idx);
                        }
                    }
                    depth += 1;
                }
                "[" => depth += 1,
                ")" | "]" => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        idx += 1;
    }
    None
}

fn matching_paren(tokens: &[&Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, tok) in tokens.iter().enumerate().skip(open) {
        if tok.is_punct("(") {
            depth += 1;
        } else if tok.is_punct(")") {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

fn top_level_comma(tokens: &[&Token]) -> Option<usize> {
    let mut depth = 0isize;
    for (i, tok) in tokens.iter().enumerate() {
        if tok.kind != TokenKind::Punct {
            continue;
        }
        match tok.text.as_str() {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => depth -= 1,
            "<" if i > 0 && tokens[i - 1].is_any_ident() => depth += 1,
            ">" if depth > 0 => depth -= 1,
            "," if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Locate the declared name: `int x`, `int a[4]`, `void (*cb)(int)`
///
/// Returns the token index of the name and whether it sits inside a
/// declarator group.
fn declarator_name(tokens: &[&Token]) -> Option<(usize, bool)> {
    // function pointer / reference group
    for (i, tok) in tokens.iter().enumerate() {
        if tok.is_punct("(")
            && tokens
                .get(i + 1)
                .is_some_and(|t| t.is_punct("*") || t.is_punct("&") || t.is_punct("^"))
        {
            let close = matching_paren(tokens, i)?;
            return tokens[i + 1..close]
                .iter()
                .rposition(|t| t.is_any_ident())
                .map(|p| (i + 1 + p, true));
        }
    }

    // stop at an array bound or a parameter list
    let mut end = tokens.len();
    for (i, tok) in tokens.iter().enumerate() {
        if tok.is_punct("[") || tok.is_punct("(") {
            end = i;
            break;
        }
    }
    let idx = tokens[..end].iter().rposition(|t| t.is_any_ident())?;
    let is_name = !TYPE_WORDS.contains(&tokens[idx].text.as_str())
        && !(idx > 0 && tokens[idx - 1].is_punct("::"))
        && idx + 1 >= end;
    is_name.then_some((idx, false))
}

/// Split a parameter list into parameters
fn parse_params(tokens: &[&Token]) -> (Vec<Param>, bool) {
    let mut params = Vec::new();
    let mut is_variadic = false;

    let mut groups: Vec<&[&Token]> = Vec::new();
    let mut rest = tokens;
    while let Some(comma) = top_level_comma(rest) {
        groups.push(&rest[..comma]);
        rest = &rest[comma + 1..];
    }
    if !rest.is_empty() {
        groups.push(rest);
    }

    if groups.len() == 1 && groups[0].len() == 1 && groups[0][0].is_ident("void") {
        return (params, false);
    }

    for group in groups {
        let (group, _) = strip_attributes(group);
        if group.len() == 1 && group[0].is_punct("...") {
            is_variadic = true;
            continue;
        }

        let mut depth = 0usize;
        let mut split = group.len();
        for (i, tok) in group.iter().enumerate() {
            match tok.text.as_str() {
                "(" | "[" | "{" if tok.kind == TokenKind::Punct => depth += 1,
                ")" | "]" | "}" if tok.kind == TokenKind::Punct => depth = depth.saturating_sub(1),
                "=" if depth == 0 => {
                    split = i;
                    break;
                }
                _ => {}
            }
        }
        let declarator = &group[..split];
        let default = (split < group.len()).then(|| join_refs(&group[split + 1..]));

        let name_idx = if declarator.len() >= 2 {
            declarator_name(declarator)
                .filter(|(idx, grouped)| *grouped || *idx > 0)
                .filter(|(idx, _)| {
                    let prev = &declarator[idx.saturating_sub(1)].text;
                    !matches!(prev.as_str(), "struct" | "class" | "enum" | "union" | "typename")
                })
                .map(|(idx, _)| idx)
        } else {
            None
        };

        let type_tokens: Vec<&Token> = declarator
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != name_idx)
            .map(|(_, t)| *t)
            .collect();

        params.push(Param {
            type_name: join_refs(&type_tokens),
            name: name_idx.map(|i| declarator[i].text.clone()),
            default,
        });
    }

    (params, is_variadic)
}

/// Drop attribute syntax; reports whether `deprecated` was among them
fn strip_attributes<'a>(tokens: &[&'a Token]) -> (Vec<&'a Token>, bool) {
    let mut out = Vec::with_capacity(tokens.len());
    let mut deprecated = false;
    let mut idx = 0;
    while idx < tokens.len() {
        let tok = tokens[idx];
        let is_std = tok.is_punct("[") && tokens.get(idx + 1).is_some_and(|t| t.is_punct("["));
        let is_gnu = matches!(tok.text.as_str(), "__attribute__" | "__declspec" | "alignas")
            && tokens.get(idx + 1).is_some_and(|t| t.is_punct("("));
        if is_std || is_gnu {
            let open = if is_std { "[" } else { "(" };
            let close = if is_std { "]" } else { ")" };
            let mut depth = 0usize;
            let mut end = idx + usize::from(is_gnu);
            while end < tokens.len() {
                let t = tokens[end];
                if t.is_ident("deprecated") {
                    deprecated = true;
                }
                if t.is_punct(open) {
                    depth += 1;
                } else if t.is_punct(close) {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                end += 1;
            }
            idx = end + 1;
            continue;
        }
        out.push(tok);
        idx += 1;
    }
    (out, deprecated)
}

/// Join tokens, keeping a single space wherever the source had whitespace
pub fn join(tokens: &[Token]) -> String {
    let refs: Vec<&Token> = tokens.iter().collect();
    join_refs(&refs)
}

/// Same as [`join`] for borrowed tokens
pub fn join_refs(tokens: &[&Token]) -> String {
    let mut out = String::new();
    for (i, tok) in tokens.iter().enumerate() {
        if i > 0 && tok.space_before {
            out.push(' ');
        }
        out.push_str(&tok.text);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::lexer::tokenize;
    use crate::symbol::SymbolKind;
    use pretty_assertions::assert_eq;

    fn parse(src: &str) -> ParsedHeader {
        let tokens = tokenize(src, Path::new("test.hpp")).unwrap();
        parse_header(&tokens, "mboxid/test.hpp", Path::new("test.hpp")).unwrap()
    }

    fn child<'a>(symbol: &'a Symbol, name: &str) -> &'a Symbol {
        symbol
            .children
            .iter()
            .find(|c| c.name == name)
            .unwrap_or_else(|| panic!("no child {}", name))
    }

    const SERVER: &str = r#"
#ifndef LIBMBOXID_MODBUS_TCP_SERVER_HPP
#define LIBMBOXID_MODBUS_TCP_SERVER_HPP

#include <memory>
#include <mboxid/common.hpp>

namespace mboxid {

/**
 * Modbus TCP server.
 *
 * @see backend_connector
 */
class modbus_tcp_server final : public detail::base {
public:
    modbus_tcp_server();
    modbus_tcp_server(const modbus_tcp_server&) = delete;
    modbus_tcp_server& operator=(const modbus_tcp_server&) = delete;
    ~modbus_tcp_server();

    /// Bind to an address.
    void set_server_addr(const std::string& host,
                         const std::string& service = server_default_port,
                         net::ip_protocol_version ip_version =
                              net::ip_protocol_version::any);

    void run();
    int count() const noexcept { return n; }
    static constexpr int max_clients = 16; ///< Connection limit.

protected:
    virtual void on_close(int fd) = 0;

private:
    struct impl;
    std::unique_ptr<impl> pimpl;
};

} // namespace mboxid

#endif
"#;

    #[test]
    fn test_class_members() {
        let parsed = parse(SERVER);
        assert_eq!(parsed.file.includes, vec!["<memory>", "<mboxid/common.hpp>"]);
        assert_eq!(parsed.symbols.len(), 1, "include guard is not a macro");

        let ns = &parsed.symbols[0];
        assert_eq!(ns.kind(), SymbolKind::Namespace);
        let class = child(ns, "modbus_tcp_server");
        assert_eq!(class.qualified_name, "mboxid::modbus_tcp_server");
        assert_eq!(class.refid, "classmboxid_1_1modbus__tcp__server");
        assert_eq!(
            class.doc.summary().as_deref(),
            Some("Modbus TCP server.")
        );
        assert_eq!(class.doc.see_also, vec!["backend_connector"]);
        let class_def = class.class_def().unwrap();
        assert!(class_def.is_final);
        assert_eq!(class_def.bases[0].name, "detail::base");
        assert_eq!(class_def.bases[0].access, Access::Public);

        let names: Vec<&str> = class.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "modbus_tcp_server",
                "modbus_tcp_server",
                "operator=",
                "~modbus_tcp_server",
                "set_server_addr",
                "run",
                "count",
                "max_clients",
                "on_close",
            ]
        );

        let ctor = &class.children[0];
        assert!(ctor.function_def().unwrap().return_type.is_none());
        let deleted = &class.children[1];
        assert_eq!(deleted.function_def().unwrap().assignment.as_deref(), Some("delete"));
        assert_ne!(ctor.refid, deleted.refid);

        let setter = child(class, "set_server_addr");
        let f = setter.function_def().unwrap();
        assert_eq!(f.return_type.as_deref(), Some("void"));
        assert_eq!(f.params.len(), 3);
        assert_eq!(f.params[0].type_name, "const std::string&");
        assert_eq!(f.params[0].name.as_deref(), Some("host"));
        assert_eq!(f.params[1].default.as_deref(), Some("server_default_port"));
        assert_eq!(
            f.params[2].default.as_deref(),
            Some("net::ip_protocol_version::any")
        );
        assert_eq!(setter.doc.description.as_deref(), Some("Bind to an address."));

        let count = child(class, "count");
        assert_eq!(count.function_def().unwrap().qualifiers, vec!["const", "noexcept"]);

        let max = child(class, "max_clients");
        assert_eq!(max.kind(), SymbolKind::Variable);
        assert_eq!(max.doc.description.as_deref(), Some("Connection limit."));

        let on_close = child(class, "on_close");
        assert_eq!(on_close.access, Access::Protected);
        assert!(on_close.function_def().unwrap().is_pure_virtual());
    }

    #[test]
    fn test_enums_and_aliases() {
        let parsed = parse(
            r#"
namespace mboxid {
/// Error codes.
enum class errc : int {
    none = 0,           ///< No error.
    /// Illegal function.
    illegal_function = 1,
    parse_error,
};

using milliseconds = std::chrono::milliseconds;
typedef void (*callback_t)(int code);
constexpr const char* server_default_port = "502";
}
"#,
        );
        let ns = &parsed.symbols[0];
        let errc = child(ns, "errc");
        let e = errc.enum_def().unwrap();
        assert!(e.scoped);
        assert_eq!(e.underlying_type.as_deref(), Some("int"));
        assert_eq!(e.enumerators.len(), 3);
        assert_eq!(e.enumerators[0].doc.description.as_deref(), Some("No error."));
        assert_eq!(
            e.enumerators[1].doc.description.as_deref(),
            Some("Illegal function.")
        );
        assert_eq!(e.enumerators[1].initializer.as_deref(), Some("1"));

        let ms = child(ns, "milliseconds");
        assert_eq!(
            ms.declaration(),
            "using mboxid::milliseconds = std::chrono::milliseconds"
        );

        let cb = child(ns, "callback_t");
        assert_eq!(cb.kind(), SymbolKind::Typedef);

        let port = child(ns, "server_default_port");
        assert_eq!(
            port.declaration(),
            "constexpr const char* mboxid::server_default_port = \"502\""
        );
    }

    #[test]
    fn test_c_header() {
        let parsed = parse(
            r#"
#ifdef __cplusplus
extern "C" {
#endif

/** Maximum frame size. */
#define MB_MAX_FRAME 260
#define MB_ADD(a, b) ((a) + (b))

/** A frame. */
typedef struct mb_frame {
    unsigned char data[MB_MAX_FRAME];
    int len;
} mb_frame_t;

enum { MB_READ = 3, MB_WRITE = 6 };

int mb_send(const mb_frame_t* frame, int flags, ...);
void mb_reset(void);

#ifdef __cplusplus
}
#endif
"#,
        );
        let names: Vec<(&str, SymbolKind)> = parsed
            .symbols
            .iter()
            .map(|s| (s.name.as_str(), s.kind()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("mb_frame", SymbolKind::Struct),
                ("mb_frame_t", SymbolKind::Typedef),
                ("MB_READ", SymbolKind::Variable),
                ("MB_WRITE", SymbolKind::Variable),
                ("mb_send", SymbolKind::Function),
                ("mb_reset", SymbolKind::Function),
                ("MB_MAX_FRAME", SymbolKind::Define),
                ("MB_ADD", SymbolKind::Define),
            ]
        );
        let send = parsed.symbols[4].function_def().unwrap();
        assert!(send.is_variadic);
        assert_eq!(send.params.len(), 2);
        assert!(parsed.symbols[5].function_def().unwrap().params.is_empty());

        let add = &parsed.symbols[7];
        assert_eq!(add.declaration(), "#define MB_ADD(a, b) ((a) + (b))");
        assert_eq!(
            parsed.symbols[6].doc.description.as_deref(),
            Some("Maximum frame size.")
        );
        assert_eq!(parsed.symbols[0].doc.description.as_deref(), Some("A frame."));
    }

    #[test]
    fn test_templates_and_nested_namespaces() {
        let parsed = parse(
            r#"
namespace mboxid::detail {
template <typename T, int N = 4>
class ring_buffer {
public:
    template <typename U>
    void push(U&& value);
    T& operator[](std::size_t idx);
    explicit operator bool() const;
};

template <typename T>
T clamp(T v, T lo, T hi) { return v < lo ? lo : (hi < v ? hi : v); }
}
"#,
        );
        let outer = &parsed.symbols[0];
        assert_eq!(outer.name, "mboxid");
        let inner = child(outer, "detail");
        assert_eq!(inner.qualified_name, "mboxid::detail");

        let ring = child(inner, "ring_buffer");
        assert_eq!(
            ring.class_def().unwrap().template_params.as_deref(),
            Some("typename T, int N = 4")
        );
        let push = child(ring, "push");
        assert_eq!(
            push.function_def().unwrap().template_params.as_deref(),
            Some("typename U")
        );
        assert!(ring.children.iter().any(|c| c.name == "operator[]"));
        assert!(ring.children.iter().any(|c| c.name == "operator bool"));

        let clamp = child(inner, "clamp");
        assert_eq!(clamp.function_def().unwrap().params.len(), 3);
    }

    #[test]
    fn test_ignored_declarations() {
        let parsed = parse(
            r#"
namespace mboxid {
using namespace std::chrono;
using std::uint8_t;
class forward;
static_assert(sizeof(int) == 4, "int");
namespace { int hidden; }
namespace fs = std::filesystem;
DECLARE_THING(widget);
void modbus_tcp_server::run() {}
}
"#,
        );
        assert!(parsed.symbols[0].children.is_empty());
    }

    #[test]
    fn test_constructor_initializer_list() {
        let parsed = parse(
            "struct point {\n    point(int x, int y) : x_{x}, y_(y) {}\n    int x_;\n    int y_;\n};\n",
        );
        let point = &parsed.symbols[0];
        let names: Vec<&str> = point.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["point", "x_", "y_"]);
    }

    #[test]
    fn test_cut_off_declaration() {
        let tokens = tokenize("namespace a {\nint f()\n}\n", Path::new("bad.hpp")).unwrap();
        let errors = parse_header(&tokens, "bad.hpp", Path::new("bad.hpp")).unwrap_err();
        assert!(errors[0].to_string().contains("expected ';'"));

        let tokens = tokenize("int value", Path::new("eof.hpp")).unwrap();
        let errors = parse_header(&tokens, "eof.hpp", Path::new("eof.hpp")).unwrap_err();
        assert!(errors[0].to_string().contains("cut off by end of file"));
    }
}
