//! C/C++ header tokenizer
//!
//! Produces the token stream the declaration parser works on. Ordinary
//! comments are dropped, documentation comments and preprocessor directives
//! are kept as tokens. Conditional blocks are resolved by taking the first
//! branch, except `#if 0` blocks, which are skipped.
//!
//! Syntax errors found here (unterminated literals or comments, unbalanced
//! brackets, unmatched conditionals) are collected rather than returned on
//! the first hit, so one pass reports everything wrong with a file.

use crate::diagnostics::QuireError;
use std::path::{Path, PathBuf};

/// Token category
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword
    Ident,
    /// Numeric literal
    Number,
    /// String literal, quotes included
    Str,
    /// Character literal, quotes included
    Char,
    /// Operator or punctuation
    Punct,
    /// Documentation comment; `trailing` for `///<` and `/**<`
    DocComment { trailing: bool },
    /// Preprocessor directive; `name` is `define`, `include`, ...
    Directive { name: String },
}

/// A token with its source position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text; for directives, the text after the directive name
    pub text: String,
    pub line: usize,
    pub col: usize,
    /// Whether whitespace preceded the token
    pub space_before: bool,
}

impl Token {
    /// Whether this is the punctuation `p`
    pub fn is_punct(&self, p: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == p
    }

    /// Whether this is the identifier or keyword `word`
    pub fn is_ident(&self, word: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == word
    }

    /// Whether this is any identifier
    pub fn is_any_ident(&self) -> bool {
        self.kind == TokenKind::Ident
    }

    /// Whether this is a documentation comment
    pub fn is_doc(&self) -> bool {
        matches!(self.kind, TokenKind::DocComment { .. })
    }
}

/// Multi-character operators, longest first
const OPERATORS: &[&str] = &[
    "<<=", ">>=", "...", "->*", "::", "->", "&&", "||", "==", "!=", "<=", ">=", "+=", "-=", "*=",
    "/=", "%=", "&=", "|=", "^=", "++", "--", "<<", ".*", "##",
];

#[derive(Debug, Clone, Copy, PartialEq)]
enum CondState {
    /// Emitting tokens of the first branch
    Taking,
    /// Skipping until a later branch
    SkippingToElse,
    /// A branch was taken; skipping the rest
    SkippingToEnd,
}

#[derive(Debug)]
struct CondFrame {
    state: CondState,
    line: usize,
    col: usize,
}

/// Tokenizer over one header
pub struct Lexer<'a> {
    src: &'a [u8],
    text: &'a str,
    pos: usize,
    line: usize,
    col: usize,
    file: PathBuf,
    tokens: Vec<Token>,
    errors: Vec<QuireError>,
    conds: Vec<CondFrame>,
    brackets: Vec<(u8, usize, usize)>,
    bracket_error: bool,
    at_line_start: bool,
}

impl<'a> Lexer<'a> {
    /// Create a lexer for the contents of `file`
    pub fn new(text: &'a str, file: &Path) -> Self {
        Self {
            src: text.as_bytes(),
            text,
            pos: 0,
            line: 1,
            col: 1,
            file: file.to_path_buf(),
            tokens: Vec::new(),
            errors: Vec::new(),
            conds: Vec::new(),
            brackets: Vec::new(),
            bracket_error: false,
            at_line_start: true,
        }
    }

    /// Tokenize the whole input
    pub fn tokenize(mut self) -> Result<Vec<Token>, Vec<QuireError>> {
        let mut space_before = false;

        while self.pos < self.src.len() {
            let c = self.src[self.pos];

            if c == b'\n' {
                self.advance(1);
                self.at_line_start = true;
                space_before = true;
                continue;
            }
            if c.is_ascii_whitespace() {
                self.advance(1);
                space_before = true;
                continue;
            }
            // line splice
            if c == b'\\' && self.peek(1) == Some(b'\n') {
                self.advance(2);
                continue;
            }

            let (line, col) = (self.line, self.col);

            if c == b'#' && self.at_line_start {
                self.directive(line, col);
                space_before = true;
                continue;
            }
            self.at_line_start = false;

            if c == b'/' && self.peek(1) == Some(b'/') {
                self.line_comment(line, col);
                space_before = true;
                continue;
            }
            if c == b'/' && self.peek(1) == Some(b'*') {
                if !self.block_comment(line, col) {
                    break;
                }
                space_before = true;
                continue;
            }

            let start = self.pos;
            let kind = if c == b'R' && self.peek(1) == Some(b'"') {
                self.advance(1);
                if !self.raw_string(line, col) {
                    break;
                }
                TokenKind::Str
            } else if c == b'"' {
                if !self.quoted(b'"', line, col) {
                    continue;
                }
                TokenKind::Str
            } else if c == b'\'' {
                if !self.quoted(b'\'', line, col) {
                    continue;
                }
                TokenKind::Char
            } else if c.is_ascii_alphabetic() || c == b'_' {
                while self
                    .peek(0)
                    .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
                {
                    self.advance(1);
                }
                TokenKind::Ident
            } else if c.is_ascii_digit() || (c == b'.' && self.peek(1).is_some_and(|b| b.is_ascii_digit())) {
                self.number();
                TokenKind::Number
            } else if c >= 0x80 {
                // non-ASCII outside literals: keep the whole character
                let ch_len = self.text[self.pos..]
                    .chars()
                    .next()
                    .map(char::len_utf8)
                    .unwrap_or(1);
                self.advance(ch_len);
                TokenKind::Punct
            } else {
                let op_len = OPERATORS
                    .iter()
                    .find(|op| self.src[self.pos..].starts_with(op.as_bytes()))
                    .map(|op| op.len())
                    .unwrap_or(1);
                self.bracket(c, line, col);
                self.advance(op_len);
                TokenKind::Punct
            };

            let text = self.text[start..self.pos].to_string();
            self.push(kind, text, line, col, space_before);
            space_before = false;
        }

        if let Some(frame) = self.conds.last() {
            let (l, c) = (frame.line, frame.col);
            self.error("unterminated conditional directive (missing #endif)", l, c);
        }
        if !self.bracket_error {
            if let Some(&(open, l, c)) = self.brackets.last() {
                self.error(format!("unbalanced '{}': no matching close", open as char), l, c);
            }
        }

        if self.errors.is_empty() {
            Ok(self.tokens)
        } else {
            Err(self.errors)
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn advance(&mut self, n: usize) {
        for _ in 0..n {
            if self.pos >= self.src.len() {
                return;
            }
            if self.src[self.pos] == b'\n' {
                self.line += 1;
                self.col = 1;
            } else if self.src[self.pos] & 0xC0 != 0x80 {
                self.col += 1;
            }
            self.pos += 1;
        }
    }

    fn skipping(&self) -> bool {
        self.conds.iter().any(|f| f.state != CondState::Taking)
    }

    fn error(&mut self, message: impl Into<String>, line: usize, col: usize) {
        self.errors
            .push(QuireError::parse_at(&self.file, message, line, col));
    }

    fn push(&mut self, kind: TokenKind, text: String, line: usize, col: usize, space_before: bool) {
        if self.skipping() {
            return;
        }
        self.tokens.push(Token {
            kind,
            text,
            line,
            col,
            space_before,
        });
    }

    fn bracket(&mut self, c: u8, line: usize, col: usize) {
        if self.skipping() || self.bracket_error {
            return;
        }
        match c {
            b'(' | b'[' | b'{' => self.brackets.push((c, line, col)),
            b')' | b']' | b'}' => {
                let expected = match c {
                    b')' => b'(',
                    b']' => b'[',
                    _ => b'{',
                };
                match self.brackets.pop() {
                    Some((open, _, _)) if open == expected => {}
                    Some((open, ol, oc)) => {
                        self.bracket_error = true;
                        self.error(
                            format!(
                                "unbalanced '{}': closed by '{}' at {}:{}",
                                open as char, c as char, line, col
                            ),
                            ol,
                            oc,
                        );
                    }
                    None => {
                        self.bracket_error = true;
                        self.error(format!("unbalanced '{}': nothing to close", c as char), line, col);
                    }
                }
            }
            _ => {}
        }
    }

    fn line_comment(&mut self, line: usize, col: usize) {
        let start = self.pos;
        while self.peek(0).is_some_and(|b| b != b'\n') {
            if self.peek(0) == Some(b'\\') && self.peek(1) == Some(b'\n') {
                self.advance(2);
                continue;
            }
            self.advance(1);
        }
        let text = &self.text[start..self.pos];
        let is_doc = (text.starts_with("///") && !text.starts_with("////"))
            || text.starts_with("//!");
        if !is_doc {
            return;
        }
        let trailing = text[3..].starts_with('<');

        // consecutive `///` lines form one comment
        if let Some(prev) = self.tokens.last_mut() {
            if prev.kind == (TokenKind::DocComment { trailing })
                && prev.text.starts_with("//")
                && prev.line + prev.text.lines().count() == line
                && !self.conds.iter().any(|f| f.state != CondState::Taking)
            {
                prev.text.push('\n');
                prev.text.push_str(text);
                return;
            }
        }
        let text = text.to_string();
        self.push(TokenKind::DocComment { trailing }, text, line, col, true);
    }

    /// Returns false at an unterminated comment
    fn block_comment(&mut self, line: usize, col: usize) -> bool {
        let start = self.pos;
        self.advance(2);
        loop {
            match self.peek(0) {
                None => {
                    self.error("unterminated comment", line, col);
                    return false;
                }
                Some(b'*') if self.peek(1) == Some(b'/') => {
                    self.advance(2);
                    break;
                }
                _ => self.advance(1),
            }
        }
        let text = &self.text[start..self.pos];
        let is_doc = (text.starts_with("/**") && !text.starts_with("/***") && text != "/**/")
            || text.starts_with("/*!");
        if is_doc {
            let trailing = text[3..].starts_with('<');
            let text = text.to_string();
            self.push(TokenKind::DocComment { trailing }, text, line, col, true);
        }
        true
    }

    /// Returns false at an unterminated literal; the rest of the line is skipped
    fn quoted(&mut self, quote: u8, line: usize, col: usize) -> bool {
        self.advance(1);
        loop {
            match self.peek(0) {
                None | Some(b'\n') => {
                    // prose in skipped blocks often holds lone apostrophes
                    if !self.skipping() {
                        let what = if quote == b'"' { "string" } else { "character" };
                        self.error(format!("unterminated {} literal", what), line, col);
                    }
                    return false;
                }
                Some(b'\\') => self.advance(2),
                Some(b) if b == quote => {
                    self.advance(1);
                    return true;
                }
                _ => self.advance(1),
            }
        }
    }

    /// `R"delim( ... )delim"`; the `R` has been consumed
    fn raw_string(&mut self, line: usize, col: usize) -> bool {
        self.advance(1);
        let delim_start = self.pos;
        while self.peek(0).is_some_and(|b| b != b'(' && b != b'\n') {
            self.advance(1);
        }
        let closing = format!("){}\"", &self.text[delim_start..self.pos]);
        match self.text[self.pos..].find(&closing) {
            Some(idx) => {
                self.advance(idx + closing.len());
                true
            }
            None => {
                self.error("unterminated raw string literal", line, col);
                false
            }
        }
    }

    fn number(&mut self) {
        while let Some(b) = self.peek(0) {
            let exponent_sign = (b == b'+' || b == b'-')
                && self.pos > 0
                && matches!(self.src[self.pos - 1], b'e' | b'E' | b'p' | b'P');
            if b.is_ascii_alphanumeric() || b == b'.' || b == b'\'' || exponent_sign {
                self.advance(1);
            } else {
                break;
            }
        }
    }

    fn directive(&mut self, line: usize, col: usize) {
        self.advance(1);
        let mut trailing_doc = None;
        // read the logical line, honouring splices and stripping comments
        let mut body = String::new();
        while let Some(b) = self.peek(0) {
            match b {
                b'\n' => break,
                b'\\' if self.peek(1) == Some(b'\n') => {
                    self.advance(2);
                    body.push(' ');
                }
                b'/' if self.peek(1) == Some(b'/') => {
                    let (l, c) = (self.line, self.col);
                    let comment_start = self.pos;
                    while self.peek(0).is_some_and(|b| b != b'\n') {
                        self.advance(1);
                    }
                    let comment = &self.text[comment_start..self.pos];
                    if comment.starts_with("///<") || comment.starts_with("//!<") {
                        trailing_doc = Some((comment.to_string(), l, c));
                    }
                }
                b'/' if self.peek(1) == Some(b'*') => {
                    let (l, c) = (self.line, self.col);
                    if !self.skip_plain_block_comment(l, c) {
                        return;
                    }
                    body.push(' ');
                }
                _ => {
                    let ch_start = self.pos;
                    self.advance(1);
                    while self.pos < self.src.len() && self.src[self.pos] & 0xC0 == 0x80 {
                        self.advance(1);
                    }
                    body.push_str(&self.text[ch_start..self.pos]);
                }
            }
        }

        let body = body.trim();
        let (name, rest) = match body.find(|c: char| !c.is_ascii_alphanumeric() && c != '_') {
            Some(idx) => (&body[..idx], body[idx..].trim()),
            None => (body, ""),
        };
        let name = name.to_string();
        let rest = rest.to_string();

        match name.as_str() {
            "if" | "ifdef" | "ifndef" => {
                let state = if self.skipping() {
                    CondState::SkippingToEnd
                } else if name == "if" && is_false_condition(&rest) {
                    CondState::SkippingToElse
                } else {
                    CondState::Taking
                };
                self.conds.push(CondFrame { state, line, col });
                if state == CondState::Taking {
                    self.push(TokenKind::Directive { name }, rest, line, col, true);
                }
            }
            "elif" | "elifdef" | "elifndef" | "else" => match self.conds.last_mut() {
                None => self.error(format!("#{} without matching #if", name), line, col),
                Some(frame) => {
                    frame.state = match frame.state {
                        CondState::SkippingToElse => CondState::Taking,
                        _ => CondState::SkippingToEnd,
                    };
                }
            },
            "endif" => {
                if self.conds.pop().is_none() {
                    self.error("#endif without matching #if", line, col);
                }
            }
            _ => {
                let kind = TokenKind::Directive { name };
                self.push(kind, rest, line, col, true);
                if let Some((doc, l, c)) = trailing_doc {
                    self.push(TokenKind::DocComment { trailing: true }, doc, l, c, true);
                }
            }
        }
    }

    fn skip_plain_block_comment(&mut self, line: usize, col: usize) -> bool {
        self.advance(2);
        loop {
            match self.peek(0) {
                None => {
                    self.error("unterminated comment", line, col);
                    return false;
                }
                Some(b'*') if self.peek(1) == Some(b'/') => {
                    self.advance(2);
                    return true;
                }
                _ => self.advance(1),
            }
        }
    }
}

fn is_false_condition(expr: &str) -> bool {
    matches!(expr.trim(), "0" | "false" | "(0)")
}

/// Tokenize a header
pub fn tokenize(text: &str, file: &Path) -> Result<Vec<Token>, Vec<QuireError>> {
    Lexer::new(text, file).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<Token> {
        tokenize(src, Path::new("test.hpp")).unwrap()
    }

    fn lex_errors(src: &str) -> Vec<String> {
        tokenize(src, Path::new("test.hpp"))
            .unwrap_err()
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn test_basic_tokens() {
        let tokens = lex("namespace a::b { int x = 0x1F; }");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["namespace", "a", "::", "b", "{", "int", "x", "=", "0x1F", ";", "}"]
        );
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[0].col, 1);
        assert!(tokens[6].space_before);
    }

    #[test]
    fn test_template_closers_stay_split() {
        let tokens = lex("std::vector<std::pair<int, int>> v;");
        assert!(tokens.iter().filter(|t| t.is_punct(">")).count() == 2);
    }

    #[test]
    fn test_doc_comments_kept_plain_dropped() {
        let tokens = lex("// plain\n/* plain */\n/// doc one\n/// doc two\nint x; ///< trailing\n");
        let docs: Vec<&Token> = tokens.iter().filter(|t| t.is_doc()).collect();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].text, "/// doc one\n/// doc two");
        assert_eq!(docs[1].kind, TokenKind::DocComment { trailing: true });
    }

    #[test]
    fn test_directives() {
        let tokens = lex("#ifndef GUARD\n#define GUARD\n#include <memory>\n#define ADD(a, b) \\\n  ((a) + (b))\n#endif\n");
        let directives: Vec<(String, String)> = tokens
            .iter()
            .filter_map(|t| match &t.kind {
                TokenKind::Directive { name } => Some((name.clone(), t.text.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(directives[0], ("ifndef".to_string(), "GUARD".to_string()));
        assert_eq!(directives[1], ("define".to_string(), "GUARD".to_string()));
        assert_eq!(directives[2], ("include".to_string(), "<memory>".to_string()));
        assert_eq!(directives[3].1, "ADD(a, b)    ((a) + (b))");
    }

    #[test]
    fn test_if_zero_is_skipped() {
        let tokens = lex("#if 0\nint hidden;\n#else\nint shown;\n#endif\n");
        assert!(tokens.iter().any(|t| t.is_ident("shown")));
        assert!(!tokens.iter().any(|t| t.is_ident("hidden")));
    }

    #[test]
    fn test_else_branch_is_skipped() {
        let tokens = lex("#ifdef A\nvoid f() {\n#else\nvoid g() {\n#endif\n}\n");
        assert!(tokens.iter().any(|t| t.is_ident("f")));
        assert!(!tokens.iter().any(|t| t.is_ident("g")));
    }

    #[test]
    fn test_unbalanced_brace() {
        let errors = lex_errors("namespace a {\nvoid f();\n");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("test.hpp:1:13"));
        assert!(errors[0].contains("unbalanced '{'"));
    }

    #[test]
    fn test_mismatched_close() {
        let errors = lex_errors("void f(int a];\n");
        assert!(errors[0].contains("unbalanced '('"));
    }

    #[test]
    fn test_unterminated_comment_and_string() {
        assert!(lex_errors("/** never closed\nint x;")[0].contains("unterminated comment"));
        assert!(lex_errors("const char* s = \"abc;\n")[0].contains("unterminated string"));
    }

    #[test]
    fn test_unmatched_endif() {
        let errors = lex_errors("#endif\n");
        assert!(errors[0].contains("#endif without matching #if"));
        let errors = lex_errors("#ifdef X\nint a;\n");
        assert!(errors[0].contains("missing #endif"));
    }

    #[test]
    fn test_raw_string() {
        let tokens = lex("auto s = R\"x(a \"quoted\" ) text)x\";");
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Str));
    }
}
