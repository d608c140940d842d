//! Document discovery and the document graph
//!
//! Narrative documents are the `*.md` files under the source root. Together
//! with the generated API pages they form a graph whose edges are toctree
//! entries and front-matter `children`; only documents reachable from the
//! root document are rendered.

use crate::config::{paths::normalize, ExcludeMatcher, ProjectPaths, QuireConfig};
use crate::diagnostics::{codes, Diagnostic, DiagnosticsCollector, QuireError, QuireResult};
use crate::role::{directive_name, replace_roles, FenceLine, FenceTracker};
use crate::translator::{split_front_matter, FrontMatter, PageSet};
use crate::utils::unique_slug;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

lazy_static! {
    static ref HEADING_REGEX: Regex = Regex::new(r"^(#{1,6})\s+(.*?)\s*#*\s*$").unwrap();
    static ref LABEL_REGEX: Regex = Regex::new(r"^\(([A-Za-z0-9_.:/-]+)\)=\s*$").unwrap();
}

/// One source document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Path below the source root, without extension, `/` separated
    pub docname: String,
    /// File it was read from; `None` for generated pages
    pub source: Option<PathBuf>,
    pub front: FrontMatter,
    /// Markdown body without front matter
    pub body: String,
    pub title: String,
}

impl Document {
    /// Build a document from its text
    pub fn new(docname: impl Into<String>, front: FrontMatter, body: String) -> Self {
        let docname = docname.into();
        let title = front
            .title
            .clone()
            .or_else(|| headings(&body).into_iter().next().map(|h| h.text))
            .unwrap_or_else(|| docname.rsplit('/').next().unwrap_or(&docname).to_string());
        Self {
            docname,
            source: None,
            front,
            body,
            title,
        }
    }

    /// Directory part of the docname; empty at the source root
    pub fn dir(&self) -> &str {
        match self.docname.rfind('/') {
            Some(idx) => &self.docname[..idx],
            None => "",
        }
    }

    /// Where diagnostics about this document point
    pub fn location(&self) -> PathBuf {
        self.source
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}.md", self.docname)))
    }

    /// Toctrees in the body
    pub fn toctrees(&self) -> Vec<Toctree> {
        parse_toctrees(&self.body, self.dir())
    }

    /// Linked documents in order: front matter children first, then
    /// toctree entries; duplicates dropped
    pub fn children(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let from_front = self
            .front
            .children
            .iter()
            .map(|c| resolve_docname(self.dir(), c));
        let from_toc = self
            .toctrees()
            .into_iter()
            .flat_map(|t| t.entries.into_iter().map(|e| e.docname));
        from_front
            .chain(from_toc)
            .filter(|c| seen.insert(c.clone()))
            .collect()
    }
}

/// A ```` ```{toctree} ```` block
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Toctree {
    pub caption: Option<String>,
    pub maxdepth: Option<usize>,
    /// Listed for navigation but not shown in the page
    pub hidden: bool,
    pub entries: Vec<TocEntry>,
}

/// One toctree line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    /// Explicit title (`Title <path>`)
    pub title: Option<String>,
    /// Resolved docname
    pub docname: String,
}

/// Parse the toctree blocks of a body; `dir` is the document's directory
pub fn parse_toctrees(body: &str, dir: &str) -> Vec<Toctree> {
    let mut trees = Vec::new();
    let mut fences = FenceTracker::default();
    // open toctree and the directive depth it lives at
    let mut current: Option<(Toctree, usize)> = None;

    for line in body.lines() {
        let kind = fences.classify(line);
        if let Some((tree, depth)) = current.as_mut() {
            match kind {
                FenceLine::DirectiveClose if fences.depth() < *depth => {
                    if let Some((tree, _)) = current.take() {
                        trees.push(tree);
                    }
                }
                FenceLine::Text => parse_toctree_line(tree, line.trim(), dir),
                _ => {}
            }
            continue;
        }
        if let FenceLine::DirectiveOpen(info) = kind {
            if directive_name(info) == "toctree" {
                current = Some((Toctree::default(), fences.depth()));
            }
        }
    }
    trees
}

fn parse_toctree_line(tree: &mut Toctree, line: &str, dir: &str) {
    if let Some(option) = line.strip_prefix(':') {
        let (key, value) = option.split_once(':').unwrap_or((option, ""));
        let value = value.trim();
        match key.trim() {
            "caption" => tree.caption = Some(value.to_string()),
            "maxdepth" => tree.maxdepth = value.parse().ok(),
            "hidden" => tree.hidden = true,
            _ => {}
        }
    } else if !line.is_empty() {
        tree.entries.push(parse_entry(line, dir));
    }
}

fn parse_entry(line: &str, dir: &str) -> TocEntry {
    if let (Some(open), true) = (line.rfind('<'), line.ends_with('>')) {
        let title = line[..open].trim();
        if !title.is_empty() {
            return TocEntry {
                title: Some(title.to_string()),
                docname: resolve_docname(dir, &line[open + 1..line.len() - 1]),
            };
        }
    }
    TocEntry {
        title: None,
        docname: resolve_docname(dir, line),
    }
}

/// Resolve a document reference relative to `dir`
///
/// A leading `/` makes it relative to the source root; `.md` is optional.
pub fn resolve_docname(dir: &str, target: &str) -> String {
    let target = target.trim();
    let target = target.strip_suffix(".md").unwrap_or(target);
    let (base, rel) = match target.strip_prefix('/') {
        Some(rest) => ("", rest),
        None => (dir, target),
    };

    let mut parts: Vec<&str> = base.split('/').filter(|p| !p.is_empty()).collect();
    for part in rel.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// A heading with its anchor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// 0-indexed line in the body
    pub line: usize,
    pub level: usize,
    /// Plain text
    pub text: String,
    /// Anchor id, unique within the document
    pub anchor: String,
    /// Explicit `(label)=` target written above the heading
    pub label: Option<String>,
}

/// Headings outside code blocks
pub fn headings(body: &str) -> Vec<Heading> {
    let mut out: Vec<Heading> = Vec::new();
    let mut anchors: Vec<String> = Vec::new();
    let mut fences = FenceTracker::default();
    let mut pending_label: Option<String> = None;

    for (idx, line) in body.lines().enumerate() {
        if fences.classify(line) != FenceLine::Text {
            continue;
        }
        let trimmed = line.trim();
        if let Some(caps) = LABEL_REGEX.captures(trimmed) {
            pending_label = Some(caps[1].to_string());
            continue;
        }
        // indented lines are code, not headings
        if line.starts_with("    ") {
            continue;
        }
        if let Some(caps) = HEADING_REGEX.captures(line) {
            let text = plain_text(&caps[2]);
            let anchor = unique_slug(&text, &anchors);
            anchors.push(anchor.clone());
            out.push(Heading {
                line: idx,
                level: caps[1].len(),
                text,
                anchor,
                label: pending_label.take(),
            });
        } else if !trimmed.is_empty() {
            pending_label = None;
        }
    }
    out
}

/// Inline Markdown reduced to its visible text
pub fn plain_text(markdown: &str) -> String {
    let text = replace_roles(markdown, |role| role.label().to_string());
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '`' | '*' => {}
            _ => out.push(c),
        }
    }
    out.trim().to_string()
}

/// Whether a line is an explicit target label
pub fn is_label_line(line: &str) -> bool {
    LABEL_REGEX.is_match(line.trim())
}

/// All documents of a build, keyed by docname in sorted order
#[derive(Debug, Clone, Default)]
pub struct DocumentSet {
    pub docs: IndexMap<String, Document>,
}

impl DocumentSet {
    pub fn get(&self, docname: &str) -> Option<&Document> {
        self.docs.get(docname)
    }

    pub fn contains(&self, docname: &str) -> bool {
        self.docs.contains_key(docname)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Add generated pages under the containment folder
    pub fn add_pages(&mut self, set: &PageSet, containment: &str) {
        let containment = containment.trim_end_matches('/');
        for page in set.pages.values() {
            let stem = set.file_name(&page.id);
            let stem = stem.strip_suffix(".md").unwrap_or(&stem);
            let docname = format!("{}/{}", containment, stem);
            let doc = Document::new(docname.clone(), page.front.clone(), page.body.clone());
            self.docs.insert(docname, doc);
        }
        self.docs.sort_keys();
    }
}

/// Find and read the narrative documents
///
/// Skips hidden directories, the build directory, excluded paths and, with
/// `skip_containment`, the containment folder whose pages are supplied in
/// memory.
pub fn discover(
    config: &QuireConfig,
    paths: &ProjectPaths,
    skip_containment: bool,
    diagnostics: &mut DiagnosticsCollector,
) -> QuireResult<DocumentSet> {
    let matcher = ExcludeMatcher::new(&config.general.exclude_patterns)?;
    let root = &paths.source_root;
    let mut set = DocumentSet::default();

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            let path = entry.path();
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            let relative = path.strip_prefix(root).unwrap_or(path);
            !(hidden
                || path.starts_with(&paths.build_dir)
                || (skip_containment && path.starts_with(&paths.containment_dir))
                || matcher.is_excluded(relative))
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
            QuireError::io_at(path, e.into())
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("md")
        {
            continue;
        }

        let relative = normalize(path.strip_prefix(root).unwrap_or(path));
        let docname = relative.strip_suffix(".md").unwrap_or(&relative).to_string();
        let text = fs::read_to_string(path).map_err(|e| QuireError::io_at(path, e))?;

        let (front, body) = match split_front_matter(&text) {
            Ok((front, body)) => (front.unwrap_or_default(), body.to_string()),
            Err(message) => {
                diagnostics.add(
                    Diagnostic::warning(message)
                        .in_file(path)
                        .at_line(1)
                        .with_code(codes::SYNTAX),
                );
                (FrontMatter::default(), text.clone())
            }
        };

        debug!("Found document {}", docname);
        let mut doc = Document::new(docname.clone(), front, body);
        doc.source = Some(path.to_path_buf());
        set.docs.insert(docname, doc);
    }

    set.docs.sort_keys();
    Ok(set)
}

/// Reachable documents and their navigation structure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentGraph {
    pub root: String,
    /// Reachable documents in depth-first order
    pub order: Vec<String>,
    /// docname -> the document that includes it
    pub parent: HashMap<String, String>,
    /// docname -> included documents, in order
    pub children: HashMap<String, Vec<String>>,
}

impl DocumentGraph {
    /// Whether a document is rendered
    pub fn contains(&self, docname: &str) -> bool {
        docname == self.root || self.parent.contains_key(docname)
    }

    pub fn children_of(&self, docname: &str) -> &[String] {
        self.children
            .get(docname)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Chain of ancestors, root first
    pub fn ancestors(&self, docname: &str) -> Vec<&str> {
        let mut chain = Vec::new();
        let mut current = docname;
        while let Some(parent) = self.parent.get(current) {
            chain.push(parent.as_str());
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// Previous and next document in reading order
    pub fn neighbours(&self, docname: &str) -> (Option<&str>, Option<&str>) {
        let Some(idx) = self.order.iter().position(|d| d == docname) else {
            return (None, None);
        };
        let prev = idx.checked_sub(1).map(|i| self.order[i].as_str());
        let next = self.order.get(idx + 1).map(String::as_str);
        (prev, next)
    }
}

/// Walk the document graph from the root document
///
/// Toctree warnings are reported in depth-first visiting order, orphaned
/// documents after the walk.
pub fn build_graph(
    set: &DocumentSet,
    root: &str,
    diagnostics: &mut DiagnosticsCollector,
) -> QuireResult<DocumentGraph> {
    if !set.contains(root) {
        return Err(QuireError::config(format!(
            "root document '{}.md' not found",
            root
        )));
    }

    let mut graph = DocumentGraph {
        root: root.to_string(),
        ..Default::default()
    };
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(root.to_string());

    fn visit(
        set: &DocumentSet,
        docname: &str,
        graph: &mut DocumentGraph,
        visited: &mut HashSet<String>,
        diagnostics: &mut DiagnosticsCollector,
    ) {
        graph.order.push(docname.to_string());
        let Some(doc) = set.get(docname) else {
            return;
        };
        for child in doc.children() {
            if !set.contains(&child) {
                diagnostics.add(
                    Diagnostic::warning(format!("toctree references unknown document '{}'", child))
                        .in_file(doc.location())
                        .with_code(codes::MISSING_DOC),
                );
                continue;
            }
            if !visited.insert(child.clone()) {
                diagnostics.add(
                    Diagnostic::warning(format!(
                        "document '{}' is already included elsewhere; ignoring the entry",
                        child
                    ))
                    .in_file(doc.location())
                    .with_code(codes::MULTI_TOCTREE),
                );
                continue;
            }
            graph.parent.insert(child.clone(), docname.to_string());
            graph
                .children
                .entry(docname.to_string())
                .or_default()
                .push(child.clone());
            visit(set, &child, graph, visited, diagnostics);
        }
    }

    visit(set, root, &mut graph, &mut visited, diagnostics);

    for doc in set.docs.values() {
        if !visited.contains(&doc.docname) {
            diagnostics.add(
                Diagnostic::warning(format!(
                    "document '{}' is not included in any toctree",
                    doc.docname
                ))
                .in_file(doc.location())
                .with_code(codes::ORPHAN_DOC),
            );
        }
    }

    debug!(
        "{} of {} document(s) reachable from {}",
        graph.order.len(),
        set.len(),
        root
    );
    Ok(graph)
}
