//! LaTeX writer
//!
//! Walks the comrak AST of each prepared document and emits one `report`
//! class document with the rendered documents as chapters, in reading
//! order.

use super::document::resolve_docname;
use super::html::configure;
use crate::config::QuireConfig;
use comrak::nodes::{AstNode, ListType, NodeValue};
use comrak::{parse_document, Arena, Options};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ID_REGEX: Regex = Regex::new(r#"\bid="([^"]+)""#).unwrap();
    static ref ADMONITION_REGEX: Regex = Regex::new(r#"<div class="admonition[^"]*">"#).unwrap();
    static ref TITLE_REGEX: Regex =
        Regex::new(r#"<p class="admonition-title">(.*?)</p>"#).unwrap();
}

const SECTIONS: &[&str] = &[
    "chapter",
    "section",
    "subsection",
    "subsubsection",
    "paragraph",
    "subparagraph",
];

/// Escape text for LaTeX
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '$' | '&' | '#' | '%' | '_' => {
                out.push('\\');
                out.push(c);
            }
            '^' => out.push_str("\\textasciicircum{}"),
            '~' => out.push_str("\\textasciitilde{}"),
            '<' => out.push_str("\\textless{}"),
            '>' => out.push_str("\\textgreater{}"),
            _ => out.push(c),
        }
    }
    out
}

/// Writes one document
struct DocumentWriter<'d> {
    docname: &'d str,
    /// Nesting depth in the document graph; the root is 0
    depth: usize,
    skip_title: bool,
    out: String,
    /// Labels found inside a heading, emitted after it
    heading_labels: Option<Vec<String>>,
}

impl<'d> DocumentWriter<'d> {
    fn label(&self, id: &str) -> String {
        format!("{}:{}", self.docname, id)
    }

    fn children<'a>(&mut self, node: &'a AstNode<'a>) {
        for child in node.children() {
            self.node(child);
        }
    }

    fn inline<'a>(&mut self, node: &'a AstNode<'a>) -> String {
        let saved = std::mem::take(&mut self.out);
        self.children(node);
        std::mem::replace(&mut self.out, saved)
    }

    fn node<'a>(&mut self, node: &'a AstNode<'a>) {
        let value = node.data.borrow().value.clone();
        match value {
            NodeValue::Heading(heading) => {
                if self.skip_title && heading.level == 1 {
                    self.skip_title = false;
                    // the title labels still need a target
                    self.heading_labels = Some(Vec::new());
                    let _ = self.inline(node);
                    let labels = self.heading_labels.take().unwrap_or_default();
                    for label in labels {
                        self.out.push_str(&format!("\\label{{{}}}\n", label));
                    }
                    return;
                }
                self.heading_labels = Some(Vec::new());
                let text = self.inline(node);
                let labels = self.heading_labels.take().unwrap_or_default();
                let level = (heading.level as usize - 1 + self.depth.saturating_sub(1))
                    .min(SECTIONS.len() - 1);
                self.out
                    .push_str(&format!("\n\\{}{{{}}}\n", SECTIONS[level], text.trim()));
                for label in labels {
                    self.out.push_str(&format!("\\label{{{}}}\n", label));
                }
            }
            NodeValue::Paragraph => {
                self.children(node);
                self.out.push_str("\n\n");
            }
            NodeValue::Text(text) => self.out.push_str(&escape(&text)),
            NodeValue::SoftBreak => self.out.push('\n'),
            NodeValue::LineBreak => self.out.push_str("\\\\\n"),
            NodeValue::Code(code) => {
                self.out
                    .push_str(&format!("\\texttt{{{}}}", escape(&code.literal)));
            }
            NodeValue::Emph => {
                let text = self.inline(node);
                self.out.push_str(&format!("\\emph{{{}}}", text));
            }
            NodeValue::Strong => {
                let text = self.inline(node);
                self.out.push_str(&format!("\\textbf{{{}}}", text));
            }
            NodeValue::Strikethrough => {
                let text = self.inline(node);
                self.out.push_str(&format!("\\sout{{{}}}", text));
            }
            NodeValue::Link(link) => {
                let text = self.inline(node);
                let link = self.link(&link.url, &text);
                self.out.push_str(&link);
            }
            NodeValue::Image(link) => {
                if !link.url.contains("://") {
                    self.out.push_str(&format!(
                        "\\includegraphics[width=0.8\\linewidth]{{{}}}",
                        link.url
                    ));
                }
            }
            NodeValue::CodeBlock(block) => {
                self.out.push_str("\\begin{Verbatim}[frame=single]\n");
                self.out.push_str(&block.literal);
                if !block.literal.ends_with('\n') {
                    self.out.push('\n');
                }
                self.out.push_str("\\end{Verbatim}\n\n");
            }
            NodeValue::BlockQuote => {
                self.out.push_str("\\begin{quote}\n");
                self.children(node);
                self.out.push_str("\\end{quote}\n\n");
            }
            NodeValue::List(list) => {
                let env = match list.list_type {
                    ListType::Bullet => "itemize",
                    ListType::Ordered => "enumerate",
                };
                self.out.push_str(&format!("\\begin{{{}}}\n", env));
                self.children(node);
                self.out.push_str(&format!("\\end{{{}}}\n\n", env));
            }
            NodeValue::Item(_) => {
                let text = self.inline(node);
                self.out.push_str(&format!("\\item {}\n", text.trim()));
            }
            NodeValue::ThematicBreak => {
                self.out
                    .push_str("\\par\\noindent\\rule{\\textwidth}{0.4pt}\\par\n\n");
            }
            NodeValue::HtmlBlock(html) => self.html_block(&html.literal),
            NodeValue::HtmlInline(html) => self.html_inline(&html),
            NodeValue::Table(..) => self.table(node),
            _ => self.children(node),
        }
    }

    fn link(&self, url: &str, text: &str) -> String {
        if url.contains("://") || url.starts_with("mailto:") {
            return format!("\\href{{{}}}{{{}}}", url.replace('%', "\\%").replace('#', "\\#"), text);
        }
        let (path, anchor) = match url.split_once('#') {
            Some((path, anchor)) => (path, Some(anchor)),
            None => (url, None),
        };
        let target = if path.is_empty() {
            self.docname.to_string()
        } else {
            let dir = self.docname.rsplit_once('/').map_or("", |(dir, _)| dir);
            resolve_docname(dir, path.strip_suffix(".html").unwrap_or(path))
        };
        let label = match anchor {
            Some(anchor) => format!("{}:{}", target, anchor),
            None => target,
        };
        format!("\\hyperref[{}]{{{}}}", label, text)
    }

    fn html_inline(&mut self, html: &str) {
        let Some(caps) = ID_REGEX.captures(html) else {
            return;
        };
        let label = self.label(&caps[1]);
        match self.heading_labels.as_mut() {
            Some(labels) => labels.push(label),
            None => self
                .out
                .push_str(&format!("\\phantomsection\\label{{{}}}", label)),
        }
    }

    fn html_block(&mut self, html: &str) {
        if ADMONITION_REGEX.is_match(html) {
            self.out.push_str("\\begin{quote}\n");
            if let Some(caps) = TITLE_REGEX.captures(html) {
                self.out
                    .push_str(&format!("\\textbf{{{}}}\\par\n", escape(&caps[1])));
            }
        } else if html.trim() == "</div>" {
            self.out.push_str("\\end{quote}\n\n");
        } else if let Some(caps) = ID_REGEX.captures(html) {
            let label = self.label(&caps[1]);
            self.out
                .push_str(&format!("\\phantomsection\\label{{{}}}\n", label));
        }
    }

    fn table<'a>(&mut self, node: &'a AstNode<'a>) {
        let mut rows: Vec<Vec<String>> = Vec::new();
        for row in node.children() {
            let mut cells = Vec::new();
            for cell in row.children() {
                cells.push(self.inline(cell));
            }
            rows.push(cells);
        }
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return;
        }
        self.out.push_str(&format!(
            "\\begin{{tabular}}{{|{}}}\n\\hline\n",
            "l|".repeat(columns)
        ));
        for (idx, row) in rows.iter().enumerate() {
            let cells: Vec<&str> = row.iter().map(|c| c.trim()).collect();
            self.out.push_str(&cells.join(" & "));
            self.out.push_str(" \\\\\n\\hline\n");
            if idx == 0 {
                self.out.push_str("\\hline\n");
            }
        }
        self.out.push_str("\\end{tabular}\n\n");
    }
}

/// LaTeX body of one prepared document
///
/// The root document (depth 0) drops its first title; its content goes
/// before the first chapter.
pub fn document(markdown: &str, docname: &str, depth: usize) -> String {
    let arena = Arena::new();
    let mut options = Options::default();
    configure(&mut options);
    let root = parse_document(&arena, markdown, &options);

    let mut writer = DocumentWriter {
        docname,
        depth: depth.max(1),
        skip_title: depth == 0,
        out: format!("\\phantomsection\\label{{{}}}\n", docname),
        heading_labels: None,
    };
    writer.children(root);
    writer.out
}

/// Full LaTeX document around the chapter bodies
pub fn wrap(config: &QuireConfig, logo: Option<&str>, body: &str) -> String {
    let mut out = String::new();
    out.push_str("%% Generated by quire\n");
    out.push_str("\\documentclass[a4paper,10pt]{report}\n");
    out.push_str("\\usepackage[utf8]{inputenc}\n");
    out.push_str("\\usepackage[T1]{fontenc}\n");
    out.push_str("\\usepackage{graphicx}\n");
    out.push_str("\\usepackage{fancyvrb}\n");
    out.push_str("\\usepackage[normalem]{ulem}\n");
    out.push_str("\\usepackage{hyperref}\n\n");

    let title = escape(&config.project.name);
    match logo {
        Some(logo) => out.push_str(&format!(
            "\\title{{\\includegraphics[width=0.5\\linewidth]{{{}}}\\\\[2em]{}}}\n",
            logo, title
        )),
        None => out.push_str(&format!("\\title{{{}}}\n", title)),
    }
    out.push_str(&format!("\\author{{{}}}\n", escape(&config.project.author)));
    out.push_str(&format!("\\date{{{}}}\n\n", escape(&config.project.release)));

    out.push_str("\\begin{document}\n\\maketitle\n\\tableofcontents\n\n");
    out.push_str(body);
    out.push_str("\n\\end{document}\n");
    out
}

/// Output file name for a project
pub fn file_name(config: &QuireConfig) -> String {
    let stem: String = config
        .project
        .name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{}.tex", stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::document::headings;
    use crate::renderer::html::{prepare, Target};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escape() {
        assert_eq!(escape("a_b & 100% {x}"), "a\\_b \\& 100\\% \\{x\\}");
    }

    #[test]
    fn test_document() {
        let body = "# Usage\n\nCall [`run`](../api/function_run.html#a1) or see [home](../index.html).\n\n## Details\n\n```{note}\nKeep *it* short.\n```\n\n```\nint main();\n```\n";
        let prepared = prepare(body, &headings(body), &[], "cpp", Target::Latex);
        let tex = document(&prepared, "guide/usage", 1);

        assert!(tex.starts_with("\\phantomsection\\label{guide/usage}\n"));
        assert!(tex.contains("\\chapter{Usage}\n\\label{guide/usage:usage}\n"));
        assert!(tex.contains("\\hyperref[api/function_run:a1]{\\texttt{run}}"));
        assert!(tex.contains("\\hyperref[index]{home}"));
        assert!(tex.contains("\\section{Details}"));
        assert!(tex.contains("\\begin{quote}\n\\textbf{Note}\\par\n"));
        assert!(tex.contains("Keep \\emph{it} short."));
        assert!(tex.contains("\\begin{Verbatim}[frame=single]\nint main();\n\\end{Verbatim}"));
    }

    #[test]
    fn test_root_document_skips_title() {
        let tex = document("# libmboxid\n\nIntro.\n", "index", 0);
        assert!(!tex.contains("chapter"));
        assert!(tex.contains("Intro."));
    }

    #[test]
    fn test_wrap() {
        let config = QuireConfig::parse("[project]\nname = \"lib mboxid\"\n").unwrap();
        let tex = wrap(&config, Some("mboxid_logo.png"), "BODY");
        assert!(tex.contains("\\includegraphics[width=0.5\\linewidth]{mboxid_logo.png}"));
        assert!(tex.contains("BODY\n\\end{document}"));
        assert_eq!(file_name(&config), "lib_mboxid.tex");
    }
}
