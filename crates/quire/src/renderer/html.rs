//! HTML writer
//!
//! Documents arrive as Markdown whose roles are already links. Directive
//! fences become raw HTML blocks, headings get their anchors, and comrak
//! turns the result into the page body that the theme layout wraps.

use super::document::{Document, DocumentGraph, DocumentSet, Heading, Toctree};
use super::xref::relative_url;
use crate::role::{directive_arg, directive_name, FenceLine, FenceTracker};
use crate::utils::slug;
use comrak::{markdown_to_html, Options};
use html_escape::{encode_double_quoted_attribute, encode_text};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

lazy_static! {
    static ref OPTION_REGEX: Regex = Regex::new(r"^\s*:([A-Za-z][\w-]*):\s*(.*?)\s*$").unwrap();
}

/// Output target of [`prepare`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Html,
    Latex,
}

/// Turn directive fences and headings into what comrak can render
///
/// `headings` are the headings of the original body, matched by line.
/// `toctrees` holds the pre-rendered HTML of each toctree in order.
pub fn prepare(
    markdown: &str,
    headings: &[Heading],
    toctrees: &[String],
    highlight_language: &str,
    target: Target,
) -> String {
    let anchors: HashMap<usize, &str> = headings
        .iter()
        .map(|h| (h.line, h.anchor.as_str()))
        .collect();
    let lines: Vec<&str> = markdown.split_inclusive('\n').collect();
    let mut out = String::with_capacity(markdown.len() + 256);
    let mut fences = FenceTracker::default();
    let mut toctree_depth: Option<usize> = None;
    let mut next_toctree = 0;
    let mut idx = 0;

    while idx < lines.len() {
        let line = lines[idx];
        let kind = fences.classify(line);
        idx += 1;

        if let Some(depth) = toctree_depth {
            if kind == FenceLine::DirectiveClose && fences.depth() < depth {
                toctree_depth = None;
            }
            continue;
        }

        match kind {
            FenceLine::CodeOpen(info) => out.push_str(&code_fence(line, info, highlight_language)),
            FenceLine::DirectiveOpen(info) => {
                let name = directive_name(info);
                let mut options: Vec<(String, String)> = Vec::new();
                while let Some(caps) = lines.get(idx).and_then(|l| OPTION_REGEX.captures(l)) {
                    options.push((caps[1].to_string(), caps[2].to_string()));
                    idx += 1;
                }
                if name == "toctree" {
                    if target == Target::Html {
                        if let Some(html) = toctrees.get(next_toctree) {
                            out.push_str(html);
                        }
                    }
                    next_toctree += 1;
                    toctree_depth = Some(fences.depth());
                } else {
                    out.push_str(&admonition_open(name, directive_arg(info), &options));
                }
            }
            FenceLine::DirectiveClose => out.push_str("\n</div>\n\n"),
            FenceLine::Text => {
                if super::document::is_label_line(line) {
                    continue;
                }
                match anchors.get(&(idx - 1)) {
                    Some(anchor) => out.push_str(&anchored_heading(line, anchor)),
                    None => out.push_str(line),
                }
            }
            FenceLine::Code | FenceLine::CodeClose => out.push_str(line),
        }
    }
    out
}

/// Code fence with a language; `{code-block} cpp` becomes plain ```` ```cpp ````
fn code_fence(line: &str, info: &str, highlight_language: &str) -> String {
    let trimmed = line.trim_start();
    let indent = &line[..line.len() - trimmed.len()];
    let fence: String = trimmed
        .chars()
        .take_while(|&c| c == '`' || c == '~')
        .collect();
    let language = if info.starts_with('{') {
        directive_arg(info)
    } else {
        info
    };
    let language = if language.is_empty() {
        highlight_language
    } else {
        language
    };
    format!("{}{}{}\n", indent, fence, language)
}

fn admonition_open(name: &str, arg: &str, options: &[(String, String)]) -> String {
    let title = match name {
        "admonition" if !arg.is_empty() => arg.to_string(),
        "seealso" => "See also".to_string(),
        "deprecated" if !arg.is_empty() => format!("Deprecated since version {}", arg),
        _ => capitalize(name),
    };
    let mut classes = vec!["admonition".to_string()];
    match name {
        "admonition" => classes.push(format!("admonition-{}", slug(&title))),
        other => classes.push(other.to_string()),
    }
    for (key, value) in options {
        if key == "class" {
            classes.extend(value.split_whitespace().map(str::to_string));
        }
    }
    format!(
        "\n<div class=\"{}\">\n<p class=\"admonition-title\">{}</p>\n\n",
        encode_double_quoted_attribute(&classes.join(" ")),
        encode_text(&title)
    )
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `## Title` with an anchor span in front of the text
fn anchored_heading(line: &str, anchor: &str) -> String {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    let text = line[hashes..].trim_start();
    format!(
        "{} <span class=\"target\" id=\"{}\"></span>{}",
        &line[..hashes],
        anchor,
        text
    )
}

/// Set the Markdown extensions used for every document
pub(crate) fn configure(options: &mut Options) {
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.footnotes = true;
    options.render.unsafe_ = true;
}

/// Render prepared Markdown to an HTML fragment
pub fn to_html(markdown: &str) -> String {
    let mut options = Options::default();
    configure(&mut options);
    markdown_to_html(markdown, &options)
}

/// HTML of a toctree as seen from `current`
pub fn toctree_html(
    tree: &Toctree,
    current: &str,
    docs: &DocumentSet,
    graph: &DocumentGraph,
) -> String {
    if tree.hidden {
        return String::new();
    }
    let mut out = String::from("<div class=\"toctree-wrapper compound\">\n");
    if let Some(ref caption) = tree.caption {
        out.push_str(&format!(
            "<p class=\"caption\" role=\"heading\"><span class=\"caption-text\">{}</span></p>\n",
            encode_text(caption)
        ));
    }
    out.push_str("<ul>\n");
    let maxdepth = tree.maxdepth.filter(|&d| d > 0).unwrap_or(usize::MAX);
    for entry in &tree.entries {
        let Some(doc) = docs.get(&entry.docname).filter(|_| graph.contains(&entry.docname)) else {
            continue;
        };
        let title = entry.title.as_deref().unwrap_or(&doc.title);
        toc_item(&mut out, doc, title, 1, maxdepth, current, docs, graph);
    }
    out.push_str("</ul>\n</div>\n\n");
    out
}

#[allow(clippy::too_many_arguments)]
fn toc_item(
    out: &mut String,
    doc: &Document,
    title: &str,
    level: usize,
    maxdepth: usize,
    current: &str,
    docs: &DocumentSet,
    graph: &DocumentGraph,
) {
    out.push_str(&format!(
        "<li class=\"toctree-l{}\"><a class=\"reference internal\" href=\"{}\">{}</a>",
        level,
        encode_double_quoted_attribute(&relative_url(current, &doc.docname, None)),
        encode_text(title)
    ));
    let children = graph.children_of(&doc.docname);
    if level < maxdepth && !children.is_empty() {
        out.push_str("\n<ul>\n");
        for child in children {
            if let Some(child_doc) = docs.get(child) {
                toc_item(out, child_doc, &child_doc.title, level + 1, maxdepth, current, docs, graph);
            }
        }
        out.push_str("</ul>\n");
    }
    out.push_str("</li>\n");
}

/// Global navigation for the sidebar, two levels deep
pub fn nav_html(current: &str, docs: &DocumentSet, graph: &DocumentGraph) -> String {
    let mut trail = graph.ancestors(current);
    trail.push(current);
    let mut out = String::from("<ul>\n");
    for child in graph.children_of(&graph.root) {
        nav_item(&mut out, child, 1, &trail, current, docs, graph);
    }
    out.push_str("</ul>\n");
    out
}

fn nav_item(
    out: &mut String,
    docname: &str,
    level: usize,
    trail: &[&str],
    current: &str,
    docs: &DocumentSet,
    graph: &DocumentGraph,
) {
    let Some(doc) = docs.get(docname) else {
        return;
    };
    let class = if trail.contains(&docname) {
        format!("toctree-l{} current", level)
    } else {
        format!("toctree-l{}", level)
    };
    out.push_str(&format!(
        "<li class=\"{}\"><a class=\"reference internal\" href=\"{}\">{}</a>",
        class,
        encode_double_quoted_attribute(&relative_url(current, docname, None)),
        encode_text(&doc.title)
    ));
    let children = graph.children_of(docname);
    if level < 2 && !children.is_empty() {
        out.push_str("<ul>\n");
        for child in children {
            nav_item(out, child, level + 1, trail, current, docs, graph);
        }
        out.push_str("</ul>");
    }
    out.push_str("</li>\n");
}

/// A link in the page chrome
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NavLink {
    pub title: String,
    pub url: String,
}

/// Project fields available to layouts
#[derive(Debug, Clone, Serialize)]
pub struct ProjectContext {
    pub name: String,
    pub release: String,
    pub author: String,
}

/// Everything a layout template can use
#[derive(Debug, Clone, Serialize)]
pub struct PageContext {
    pub project: ProjectContext,
    pub docname: String,
    pub title: String,
    /// Rendered document body
    pub body: String,
    /// Relative prefix to the site root (`../` per directory level)
    pub root: String,
    pub stylesheets: Vec<String>,
    pub logo: Option<String>,
    /// Sidebar navigation HTML
    pub nav: String,
    pub breadcrumbs: Vec<NavLink>,
    pub prev: Option<NavLink>,
    pub next: Option<NavLink>,
    pub copyright: Option<String>,
    pub options: indexmap::IndexMap<String, String>,
    pub show_powered_by: bool,
    pub generator: String,
}

/// Prefix from a document back to the site root
pub fn root_prefix(docname: &str) -> String {
    "../".repeat(docname.matches('/').count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticsCollector;
    use crate::renderer::document::{build_graph, headings};
    use crate::translator::FrontMatter;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_prepare_directives_and_headings() {
        let body = "# Intro\n\n(setup)=\n## Setup\n\n````{note}\n:class: tip\nRead this.\n\n```\nrun();\n```\n````\n\n```{code-block} c\nint x;\n```\n";
        let hs = headings(body);
        let out = prepare(body, &hs, &[], "cpp", Target::Html);
        assert_eq!(
            out,
            "# <span class=\"target\" id=\"intro\"></span>Intro\n\n## <span class=\"target\" id=\"setup\"></span>Setup\n\n\n<div class=\"admonition note tip\">\n<p class=\"admonition-title\">Note</p>\n\nRead this.\n\n```cpp\nrun();\n```\n\n</div>\n\n\n```c\nint x;\n```\n"
        );
    }

    #[test]
    fn test_admonition_title() {
        let out = prepare("```{admonition} Precondition\n:class: pre\nok\n```\n", &[], &[], "cpp", Target::Html);
        assert!(out.contains("class=\"admonition admonition-precondition pre\""));
        assert!(out.contains("<p class=\"admonition-title\">Precondition</p>"));
        let html = to_html(&out);
        assert!(html.contains("<p>ok</p>"));
    }

    #[test]
    fn test_toctree_html() {
        let mut docs = DocumentSet::default();
        for (name, body) in [
            ("index", "# Home\n\n```{toctree}\n:caption: Contents\n:maxdepth: 1\n\nguide\n```\n"),
            ("guide", "# Guide & more\n\n```{toctree}\nsub\n```\n"),
            ("sub", "# Sub\n"),
        ] {
            docs.docs.insert(
                name.to_string(),
                Document::new(name, FrontMatter::default(), body.to_string()),
            );
        }
        let graph = build_graph(&docs, "index", &mut DiagnosticsCollector::new()).unwrap();
        let index = docs.get("index").unwrap();
        let html = toctree_html(&index.toctrees()[0], "index", &docs, &graph);
        assert!(html.contains("<span class=\"caption-text\">Contents</span>"));
        assert!(html.contains("href=\"guide.html\">Guide &amp; more</a></li>"));
        assert!(!html.contains("sub.html"));

        let prepared = prepare(&index.body, &headings(&index.body), &[html.clone()], "cpp", Target::Html);
        assert!(prepared.contains("toctree-wrapper"));
        let latex = prepare(&index.body, &[], &[html], "cpp", Target::Latex);
        assert!(!latex.contains("toctree"));

        let nav = nav_html("sub", &docs, &graph);
        assert!(nav.contains("<li class=\"toctree-l1 current\"><a class=\"reference internal\" href=\"guide.html\">"));
        assert!(nav.contains("toctree-l2 current"));
    }

    #[test]
    fn test_root_prefix() {
        assert_eq!(root_prefix("index"), "");
        assert_eq!(root_prefix("api/class_x"), "../");
    }
}
