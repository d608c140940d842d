//! Documentation comment parsing
//!
//! Turns the raw text of a `/** ... */`, `/*! ... */`, `///` or `//!`
//! comment into a structured [`DocComment`]. Both `@cmd` and `\cmd` command
//! spellings are accepted. Free text is kept as Markdown; `@ref` targets are
//! rewritten into `` {any}`target` `` roles so later stages can resolve them.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

lazy_static! {
    /// A block command at the start of a line: `@param[in] name text`
    static ref COMMAND_REGEX: Regex = Regex::new(
        r"^[@\\]([A-Za-z]+)(\[[^\]]*\])?(?:\{([^}]*)\})?(?:\s+(.*))?$"
    ).unwrap();

    /// Inline `@ref target "text"`
    static ref REF_REGEX: Regex = Regex::new(
        r#"[@\\]ref\s+([A-Za-z_~][\w:~]*)(?:\(\))?(?:\s+"([^"]*)")?"#
    ).unwrap();

    /// Inline word markup: `@p name`, `\c code`, `@a arg`, `@e word`, `@b word`
    static ref WORD_REGEX: Regex = Regex::new(
        r"[@\\](p|c|a|e|em|b)\s+([^\s,.;:)]+)"
    ).unwrap();
}

/// Parsed documentation for one symbol
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocComment {
    /// Explicit `@brief` text
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub brief: Option<String>,

    /// Detailed description (Markdown)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,

    /// `@param` entries
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub params: Vec<ParamDoc>,

    /// `@tparam` entries
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub template_params: Vec<ParamDoc>,

    /// `@return` text
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub returns: Option<String>,

    /// `@retval` entries (value, meaning)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub retvals: Vec<ParamDoc>,

    /// `@throws` entries
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub throws: Vec<ThrowsDoc>,

    /// `@note`, `@warning`, `@pre`, `@post`
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub admonitions: Vec<Admonition>,

    /// `@see` targets
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub see_also: Vec<String>,

    /// `@deprecated` text; empty when flagged without explanation
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub deprecated: Option<String>,

    /// `@since` version
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub since: Option<String>,
}

/// Documentation of one parameter, template parameter or return value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamDoc {
    /// Parameter name (or value for `@retval`)
    pub name: String,
    /// `in`, `out` or `in,out`
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub direction: Option<String>,
    /// Description text
    pub doc: String,
}

/// `@throws Type text`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThrowsDoc {
    /// Exception type
    pub type_name: String,
    /// When it is thrown
    pub doc: String,
}

/// Kind of a highlighted paragraph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdmonitionKind {
    Note,
    Warning,
    Precondition,
    Postcondition,
}

impl AdmonitionKind {
    /// Heading shown above the paragraph
    pub fn title(&self) -> &'static str {
        match self {
            AdmonitionKind::Note => "Note",
            AdmonitionKind::Warning => "Warning",
            AdmonitionKind::Precondition => "Precondition",
            AdmonitionKind::Postcondition => "Postcondition",
        }
    }

    /// CSS class used by the HTML theme
    pub fn css_class(&self) -> &'static str {
        match self {
            AdmonitionKind::Note => "note",
            AdmonitionKind::Warning => "warning",
            AdmonitionKind::Precondition => "pre",
            AdmonitionKind::Postcondition => "post",
        }
    }
}

/// A highlighted paragraph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admonition {
    pub kind: AdmonitionKind,
    pub text: String,
}

/// Where text following a command is collected
#[derive(Debug, Clone, PartialEq)]
enum Section {
    Description,
    Brief,
    Param {
        name: String,
        direction: Option<String>,
    },
    TemplateParam {
        name: String,
    },
    Returns,
    Retval {
        value: String,
    },
    Throws {
        type_name: String,
    },
    Admonition(AdmonitionKind),
    Deprecated,
    Since,
    See,
    Ignored,
}

impl Section {
    /// Sections that end at the next blank line
    fn is_paragraph(&self) -> bool {
        !matches!(self, Section::Description)
    }
}

/// Commands that only name or group the entity; the lines after them are
/// ordinary description
const STRUCTURAL_COMMANDS: &[&str] = &[
    "file", "ingroup", "defgroup", "addtogroup", "internal", "endinternal", "private", "public",
    "protected", "fn", "class", "struct", "union", "namespace", "def", "var", "typedef", "enum",
    "name", "headerfile",
];

/// Metadata paragraphs that are not rendered
const METADATA_COMMANDS: &[&str] = &["author", "authors", "date", "version", "copyright"];

impl DocComment {
    /// Create a new empty doc
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from description only
    pub fn from_description(desc: impl Into<String>) -> Self {
        Self {
            description: Some(desc.into()),
            ..Default::default()
        }
    }

    /// Parse a raw comment, delimiters included
    pub fn parse(raw: &str) -> Self {
        let lines = clean_comment(raw);
        let mut parser = DocParser::default();
        for line in lines {
            parser.line(&line);
        }
        parser.finish()
    }

    /// Check if this doc is empty
    pub fn is_empty(&self) -> bool {
        self == &DocComment::default()
    }

    /// One-line summary: the brief, or the first sentence of the description
    pub fn summary(&self) -> Option<String> {
        if let Some(ref brief) = self.brief {
            return Some(brief.clone());
        }
        self.description.as_ref().map(|d| {
            let first_paragraph = d.split("\n\n").next().unwrap_or(d);
            if let Some(idx) = first_paragraph.find(". ") {
                first_paragraph[..=idx].to_string()
            } else if let Some(idx) = first_paragraph.find(".\n") {
                first_paragraph[..=idx].to_string()
            } else {
                first_paragraph.replace('\n', " ")
            }
        })
    }

    /// Find the documentation of a parameter
    pub fn param(&self, name: &str) -> Option<&ParamDoc> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Whether the symbol is marked deprecated
    pub fn is_deprecated(&self) -> bool {
        self.deprecated.is_some()
    }

    /// Merge a trailing (`///<`) comment into a leading one
    pub fn merge(mut self, trailing: DocComment) -> Self {
        if self.is_empty() {
            return trailing;
        }
        if self.brief.is_none() {
            self.brief = trailing.brief;
        }
        match (&mut self.description, trailing.description) {
            (Some(desc), Some(more)) => {
                desc.push_str("\n\n");
                desc.push_str(&more);
            }
            (None, more) => self.description = more,
            _ => {}
        }
        self.params.extend(trailing.params);
        self.template_params.extend(trailing.template_params);
        self.returns = self.returns.or(trailing.returns);
        self.retvals.extend(trailing.retvals);
        self.throws.extend(trailing.throws);
        self.admonitions.extend(trailing.admonitions);
        self.see_also.extend(trailing.see_also);
        self.deprecated = self.deprecated.or(trailing.deprecated);
        self.since = self.since.or(trailing.since);
        self
    }

    /// Rewrite every free-text field with `f`
    pub fn map_texts(mut self, mut f: impl FnMut(&str) -> String) -> Self {
        for text in [
            &mut self.brief,
            &mut self.description,
            &mut self.returns,
            &mut self.deprecated,
        ]
        .into_iter()
        .flatten()
        {
            *text = f(text);
        }
        for param in self
            .params
            .iter_mut()
            .chain(self.template_params.iter_mut())
            .chain(self.retvals.iter_mut())
        {
            param.doc = f(&param.doc);
        }
        for throws in &mut self.throws {
            throws.doc = f(&throws.doc);
        }
        for admonition in &mut self.admonitions {
            admonition.text = f(&admonition.text);
        }
        self
    }

    /// All free-text fields, for reference scanning
    pub fn texts(&self) -> Vec<&str> {
        let mut texts = Vec::new();
        texts.extend(self.brief.as_deref());
        texts.extend(self.description.as_deref());
        texts.extend(self.params.iter().map(|p| p.doc.as_str()));
        texts.extend(self.template_params.iter().map(|p| p.doc.as_str()));
        texts.extend(self.returns.as_deref());
        texts.extend(self.retvals.iter().map(|p| p.doc.as_str()));
        texts.extend(self.throws.iter().map(|t| t.doc.as_str()));
        texts.extend(self.admonitions.iter().map(|a| a.text.as_str()));
        texts.extend(self.deprecated.as_deref());
        texts
    }
}

#[derive(Default)]
struct DocParser {
    doc: DocComment,
    section: Option<Section>,
    text: Vec<String>,
    code: Option<(String, Vec<String>)>,
}

impl DocParser {
    fn line(&mut self, line: &str) {
        let trimmed = line.trim();

        if let Some((_, ref mut code_lines)) = self.code {
            if trimmed == "@endcode" || trimmed == "\\endcode" {
                self.end_code();
            } else {
                code_lines.push(line.to_string());
            }
            return;
        }

        if trimmed.is_empty() {
            if self.section.as_ref().is_some_and(Section::is_paragraph) {
                self.flush();
                self.section = None;
            } else {
                self.text.push(String::new());
            }
            return;
        }

        if let Some(caps) = COMMAND_REGEX.captures(trimmed) {
            let name = caps[1].to_ascii_lowercase();
            let bracket = caps.get(2).map(|m| m.as_str());
            let brace = caps.get(3).map(|m| m.as_str());
            let rest = caps.get(4).map(|m| m.as_str()).unwrap_or("").trim();
            if self.command(&name, bracket, brace, rest) {
                return;
            }
        }

        self.text.push(line.trim_end().to_string());
    }

    /// Handle a block command; returns false for inline commands
    fn command(&mut self, name: &str, bracket: Option<&str>, brace: Option<&str>, rest: &str) -> bool {
        let (section, initial) = match name {
            "brief" | "short" => (Section::Brief, rest.to_string()),
            "details" => (Section::Description, rest.to_string()),
            "param" => {
                let (pname, text) = split_word(rest);
                let direction = bracket.map(|b| {
                    b.trim_matches(|c| c == '[' || c == ']')
                        .replace(' ', "")
                });
                (
                    Section::Param {
                        name: pname,
                        direction,
                    },
                    text,
                )
            }
            "tparam" => {
                let (pname, text) = split_word(rest);
                (Section::TemplateParam { name: pname }, text)
            }
            "return" | "returns" | "result" => (Section::Returns, rest.to_string()),
            "retval" => {
                let (value, text) = split_word(rest);
                (Section::Retval { value }, text)
            }
            "throw" | "throws" | "exception" => {
                let (type_name, text) = split_word(rest);
                (Section::Throws { type_name }, text)
            }
            "note" | "remark" | "remarks" => {
                (Section::Admonition(AdmonitionKind::Note), rest.to_string())
            }
            "warning" | "attention" => {
                (Section::Admonition(AdmonitionKind::Warning), rest.to_string())
            }
            "pre" => (
                Section::Admonition(AdmonitionKind::Precondition),
                rest.to_string(),
            ),
            "post" => (
                Section::Admonition(AdmonitionKind::Postcondition),
                rest.to_string(),
            ),
            "deprecated" => (Section::Deprecated, rest.to_string()),
            "since" => (Section::Since, rest.to_string()),
            "see" | "sa" => (Section::See, rest.to_string()),
            "code" => {
                let lang = brace
                    .map(|b| b.trim_start_matches('.').to_string())
                    .unwrap_or_default();
                self.flush();
                self.section = None;
                self.code = Some((lang, vec![]));
                return true;
            }
            other if METADATA_COMMANDS.contains(&other) => (Section::Ignored, String::new()),
            other if STRUCTURAL_COMMANDS.contains(&other) => {
                self.flush();
                self.section = None;
                return true;
            }
            _ => return false,
        };

        self.flush();
        self.section = Some(section);
        if !initial.is_empty() {
            self.text.push(initial);
        }
        true
    }

    fn end_code(&mut self) {
        if let Some((lang, lines)) = self.code.take() {
            let block = format!("```{}\n{}\n```", lang, dedent(&lines).join("\n"));
            append_paragraph(&mut self.doc.description, block);
        }
    }

    fn flush(&mut self) {
        let raw = std::mem::take(&mut self.text).join("\n");
        let text = inline_markup(raw.trim());
        let section = self.section.clone().unwrap_or(Section::Description);
        let doc = &mut self.doc;

        match section {
            Section::Description => {
                if !text.is_empty() {
                    append_paragraph(&mut doc.description, text);
                }
            }
            Section::Brief => {
                if !text.is_empty() {
                    doc.brief = Some(join_lines(&text));
                }
            }
            Section::Param { name, direction } => doc.params.push(ParamDoc {
                name,
                direction,
                doc: join_lines(&text),
            }),
            Section::TemplateParam { name } => doc.template_params.push(ParamDoc {
                name,
                direction: None,
                doc: join_lines(&text),
            }),
            Section::Returns => {
                if !text.is_empty() {
                    doc.returns = Some(join_lines(&text));
                }
            }
            Section::Retval { value } => doc.retvals.push(ParamDoc {
                name: value,
                direction: None,
                doc: join_lines(&text),
            }),
            Section::Throws { type_name } => doc.throws.push(ThrowsDoc {
                type_name,
                doc: join_lines(&text),
            }),
            Section::Admonition(kind) => {
                if !text.is_empty() {
                    doc.admonitions.push(Admonition {
                        kind,
                        text: join_lines(&text),
                    });
                }
            }
            Section::Deprecated => doc.deprecated = Some(join_lines(&text)),
            Section::Since => {
                if !text.is_empty() {
                    doc.since = Some(join_lines(&text));
                }
            }
            Section::See => {
                for target in raw.split(|c: char| c == ',' || c.is_whitespace()) {
                    let target = target.trim().trim_end_matches("()");
                    if !target.is_empty() {
                        doc.see_also.push(target.to_string());
                    }
                }
            }
            Section::Ignored => {}
        }
    }

    fn finish(mut self) -> DocComment {
        // an unterminated @code block still keeps its text
        self.end_code();
        self.flush();
        self.doc
    }
}

fn append_paragraph(target: &mut Option<String>, text: String) {
    match target {
        Some(existing) => {
            existing.push_str("\n\n");
            existing.push_str(&text);
        }
        None => *target = Some(text),
    }
}

fn split_word(rest: &str) -> (String, String) {
    let rest = rest.trim();
    match rest.find(char::is_whitespace) {
        Some(idx) => (rest[..idx].to_string(), rest[idx..].trim().to_string()),
        None => (rest.to_string(), String::new()),
    }
}

fn join_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn dedent(lines: &[String]) -> Vec<String> {
    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| {
            if l.len() >= indent {
                l[indent..].trim_end().to_string()
            } else {
                String::new()
            }
        })
        .collect()
}

/// Rewrite inline commands into Markdown and roles
pub fn inline_markup(text: &str) -> String {
    let text = REF_REGEX.replace_all(text, |caps: &Captures| match caps.get(2) {
        Some(label) => format!("{{any}}`{} <{}>`", label.as_str(), &caps[1]),
        None => format!("{{any}}`{}`", &caps[1]),
    });
    WORD_REGEX
        .replace_all(&text, |caps: &Captures| match &caps[1] {
            "p" | "c" => format!("`{}`", &caps[2]),
            "b" => format!("**{}**", &caps[2]),
            _ => format!("*{}*", &caps[2]),
        })
        .into_owned()
}

/// Strip comment delimiters and leading decoration from every line
pub fn clean_comment(raw: &str) -> Vec<String> {
    let raw = raw.trim();

    if raw.starts_with("/*") {
        let body = raw
            .trim_start_matches("/**")
            .trim_start_matches("/*!")
            .trim_start_matches("/*");
        let body = body.strip_prefix('<').unwrap_or(body);
        let body = body.strip_suffix("*/").unwrap_or(body);
        let body = body.trim_end_matches('*');

        let lines: Vec<String> = body
            .lines()
            .map(|line| {
                let t = line.trim_start();
                let t = match t.strip_prefix('*') {
                    Some(stripped) if !stripped.starts_with('/') => stripped,
                    _ => t,
                };
                t.strip_prefix(' ').unwrap_or(t).trim_end().to_string()
            })
            .collect();
        return trim_blank_edges(lines);
    }

    let lines = raw
        .lines()
        .map(|line| {
            let t = line.trim_start();
            let t = t
                .strip_prefix("///")
                .or_else(|| t.strip_prefix("//!"))
                .or_else(|| t.strip_prefix("//"))
                .unwrap_or(t);
            let t = t.strip_prefix('<').unwrap_or(t);
            t.strip_prefix(' ').unwrap_or(t).trim_end().to_string()
        })
        .collect();
    trim_blank_edges(lines)
}

fn trim_blank_edges(mut lines: Vec<String>) -> Vec<String> {
    while lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_block_comment_description() {
        let doc = DocComment::parse(
            "/**\n     * Backend ticker is invoked approximately once a second.\n     *\n     * This method may be overridden.\n     */",
        );
        assert_eq!(
            doc.description.as_deref(),
            Some("Backend ticker is invoked approximately once a second.\n\nThis method may be overridden.")
        );
        assert_eq!(
            doc.summary().as_deref(),
            Some("Backend ticker is invoked approximately once a second.")
        );
    }

    #[test]
    fn test_line_comment() {
        let doc = DocComment::parse("/// Base class for libmboxid exceptions.");
        assert_eq!(
            doc.description.as_deref(),
            Some("Base class for libmboxid exceptions.")
        );
        assert!(doc.brief.is_none());
    }

    #[test]
    fn test_tags() {
        let doc = DocComment::parse(
            "/**\n * @brief Connect to a server.\n *\n * Opens the TCP connection.\n * @param[in] host Host name or\n *   numeric address.\n * @param service Port number.\n * @return True on success.\n * @throws mboxid_error If the name cannot be resolved.\n * @note Blocks until connected.\n * @see disconnect, set_timeout\n * @since 0.1.0\n */",
        );

        assert_eq!(doc.brief.as_deref(), Some("Connect to a server."));
        assert_eq!(doc.description.as_deref(), Some("Opens the TCP connection."));
        assert_eq!(doc.params.len(), 2);
        assert_eq!(doc.params[0].name, "host");
        assert_eq!(doc.params[0].direction.as_deref(), Some("in"));
        assert_eq!(doc.params[0].doc, "Host name or numeric address.");
        assert_eq!(doc.param("service").unwrap().doc, "Port number.");
        assert_eq!(doc.returns.as_deref(), Some("True on success."));
        assert_eq!(doc.throws[0].type_name, "mboxid_error");
        assert_eq!(doc.admonitions[0].kind, AdmonitionKind::Note);
        assert_eq!(doc.see_also, vec!["disconnect", "set_timeout"]);
        assert_eq!(doc.since.as_deref(), Some("0.1.0"));
    }

    #[test]
    fn test_backslash_commands_and_retval() {
        let doc = DocComment::parse(
            "/*!\n \\brief Check a code.\n \\retval true  It is a protocol exception.\n \\retval false Otherwise.\n */",
        );
        assert_eq!(doc.brief.as_deref(), Some("Check a code."));
        assert_eq!(doc.retvals.len(), 2);
        assert_eq!(doc.retvals[0].name, "true");
        assert_eq!(doc.retvals[1].doc, "Otherwise.");
    }

    #[test]
    fn test_inline_ref_and_markup() {
        let doc = DocComment::parse(
            "/// Use \\ref mboxid::modbus_tcp_server \"the server\" or @ref shutdown() with @p timeout.",
        );
        assert_eq!(
            doc.description.as_deref(),
            Some("Use {any}`the server <mboxid::modbus_tcp_server>` or {any}`shutdown` with `timeout`.")
        );
    }

    #[test]
    fn test_code_block() {
        let doc = DocComment::parse(
            "/**\n * Example:\n * @code{.cpp}\n *     server.run();\n * @endcode\n */",
        );
        assert_eq!(
            doc.description.as_deref(),
            Some("Example:\n\n```cpp\nserver.run();\n```")
        );
    }

    #[test]
    fn test_deprecated_without_text() {
        let doc = DocComment::parse("/** Old API.\n @deprecated\n */");
        assert!(doc.is_deprecated());
        assert_eq!(doc.deprecated.as_deref(), Some(""));
    }

    #[test]
    fn test_trailing_comment() {
        let doc = DocComment::parse("///< Illegal function code.");
        assert_eq!(doc.description.as_deref(), Some("Illegal function code."));

        let doc = DocComment::parse("/**< Gateway path unavailable. */");
        assert_eq!(doc.description.as_deref(), Some("Gateway path unavailable."));
    }

    #[test]
    fn test_ignored_commands() {
        let doc = DocComment::parse("/**\n * @file error.hpp\n * Error codes.\n */");
        assert_eq!(doc.description.as_deref(), Some("Error codes."));
    }

    #[test]
    fn test_structural_command_keeps_following_lines() {
        let doc = DocComment::parse("/**\n * @file\n * Modbus TCP server API.\n *\n * Details here.\n */");
        assert_eq!(
            doc.description.as_deref(),
            Some("Modbus TCP server API.\n\nDetails here.")
        );
        assert_eq!(doc.summary().as_deref(), Some("Modbus TCP server API."));

        let doc = DocComment::parse("/** @class server\n A server. */");
        assert_eq!(doc.description.as_deref(), Some("A server."));
    }

    #[test]
    fn test_metadata_paragraph_is_dropped() {
        let doc = DocComment::parse("/**\n * Client API.\n * @author Jane Doe\n *   and others\n *\n * More.\n */");
        assert_eq!(doc.description.as_deref(), Some("Client API.\n\nMore."));
    }

    #[test]
    fn test_empty() {
        assert!(DocComment::parse("/** */").is_empty());
        assert!(DocComment::new().summary().is_none());
    }
}
