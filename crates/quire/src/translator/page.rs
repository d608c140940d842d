//! Page-description documents
//!
//! A page is Markdown with a TOML front matter block delimited by `+++`
//! lines. Generated API pages and hand-written narrative documents share
//! the format; narrative documents usually omit the front matter.

use crate::diagnostics::{QuireError, QuireResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Front matter delimiter line
pub const FRONT_MATTER_DELIMITER: &str = "+++";

/// An object documented on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageObject {
    /// Qualified name
    pub name: String,
    /// Object kind (`class`, `function`, `enumerator`, ...)
    pub kind: String,
    pub refid: String,
    /// Anchor on the page; the page itself when absent
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub anchor: Option<String>,
}

/// Page metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontMatter {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
    /// Parent document, relative to this page's directory
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent: Option<String>,
    /// Child documents, relative to this page's directory
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<String>,
    /// Objects documented here
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub objects: Vec<PageObject>,
}

impl FrontMatter {
    /// Check if nothing is set
    pub fn is_empty(&self) -> bool {
        self == &FrontMatter::default()
    }
}

/// Split a document into its front matter and body
///
/// Returns `Ok((None, text))` when the document does not start with a
/// front matter block.
pub fn split_front_matter(text: &str) -> Result<(Option<FrontMatter>, &str), String> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let Some(rest) = text.strip_prefix(FRONT_MATTER_DELIMITER) else {
        return Ok((None, text));
    };
    let Some(rest) = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n")) else {
        return Ok((None, text));
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FRONT_MATTER_DELIMITER {
            let block = &rest[..offset];
            let body = &rest[offset + line.len()..];
            let front: FrontMatter =
                toml::from_str(block).map_err(|e| format!("invalid front matter: {}", e))?;
            return Ok((Some(front), body.trim_start_matches(['\n', '\r'])));
        }
        offset += line.len();
    }
    Err("front matter is not closed by a '+++' line".to_string())
}

/// One generated document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Stable page id; also the file stem
    pub id: String,
    pub front: FrontMatter,
    /// Markdown body
    pub body: String,
}

impl Page {
    /// Create a page with a title
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            front: FrontMatter {
                title: Some(title.into()),
                ..Default::default()
            },
            body: String::new(),
        }
    }

    /// Page title
    pub fn title(&self) -> &str {
        self.front.title.as_deref().unwrap_or(&self.id)
    }

    /// Serialize front matter and body
    pub fn render(&self) -> QuireResult<String> {
        let mut out = String::new();
        if !self.front.is_empty() {
            let front = toml::to_string(&self.front)
                .map_err(|e| QuireError::Template(format!("page {}: {}", self.id, e)))?;
            out.push_str(FRONT_MATTER_DELIMITER);
            out.push('\n');
            out.push_str(&front);
            if !front.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(FRONT_MATTER_DELIMITER);
            out.push_str("\n\n");
        }
        out.push_str(self.body.trim_end());
        out.push('\n');
        Ok(out)
    }
}

/// The translator's output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSet {
    /// Id of the root page
    pub root: String,
    /// File name of the root page
    pub root_file_name: String,
    /// Pages keyed by id, root first
    pub pages: IndexMap<String, Page>,
}

impl PageSet {
    /// Root page
    pub fn root_page(&self) -> Option<&Page> {
        self.pages.get(&self.root)
    }

    /// Look up a page
    pub fn get(&self, id: &str) -> Option<&Page> {
        self.pages.get(id)
    }

    /// File name of a page inside the containment folder
    pub fn file_name(&self, id: &str) -> String {
        if id == self.root {
            self.root_file_name.clone()
        } else {
            format!("{}.md", id)
        }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
