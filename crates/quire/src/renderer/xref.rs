//! Cross-reference resolution for rendered documents
//!
//! Roles are rewritten into plain Markdown links before a document is
//! converted, so the HTML and LaTeX writers only ever see links. Targets
//! that do not resolve become a visible placeholder plus a warning.

use super::document::{headings, resolve_docname, Document, DocumentGraph, DocumentSet};
use crate::config::KNOWN_DOMAINS;
use crate::diagnostics::{codes, Diagnostic, DiagnosticsCollector};
use crate::inventory::{is_object_role, Inventory, InventoryEntry, Lookup};
use crate::role::{replace_roles_at, RoleRef};
use crate::translator::unresolved;
use std::collections::HashMap;

/// Where a `ref` label points
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTarget {
    pub docname: String,
    pub anchor: String,
    /// Heading text, used when the role gives no text
    pub title: String,
}

/// Explicit `(label)=` targets of the rendered documents
pub fn collect_labels(
    docs: &DocumentSet,
    graph: &DocumentGraph,
    diagnostics: &mut DiagnosticsCollector,
) -> HashMap<String, LabelTarget> {
    let mut labels: HashMap<String, LabelTarget> = HashMap::new();
    for docname in &graph.order {
        let Some(doc) = docs.get(docname) else {
            continue;
        };
        for heading in headings(&doc.body) {
            let Some(label) = heading.label else {
                continue;
            };
            if let Some(existing) = labels.get(&label) {
                diagnostics.add(
                    Diagnostic::warning(format!(
                        "duplicate label '{}', also defined in {}",
                        label, existing.docname
                    ))
                    .in_file(doc.location())
                    .at_line(heading.line + 1)
                    .with_code(codes::DUPLICATE),
                );
                continue;
            }
            labels.insert(
                label,
                LabelTarget {
                    docname: docname.clone(),
                    anchor: heading.anchor,
                    title: heading.text,
                },
            );
        }
    }
    labels
}

/// Inventory of the objects documented by rendered pages
///
/// Front-matter objects of reachable documents come first; entries of
/// `bridged` that no page documents are added without a document.
pub fn collect_objects(docs: &DocumentSet, graph: &DocumentGraph, bridged: &Inventory) -> Inventory {
    let mut inventory = Inventory::new();
    for docname in &graph.order {
        let Some(doc) = docs.get(docname) else {
            continue;
        };
        for object in &doc.front.objects {
            inventory.insert(InventoryEntry {
                name: object.name.clone(),
                kind: object.kind.clone(),
                refid: object.refid.clone(),
                docname: Some(docname.clone()),
                anchor: object.anchor.clone(),
            });
        }
    }
    for entry in bridged.entries() {
        let rendered = entry
            .docname
            .as_deref()
            .is_some_and(|d| graph.contains(d));
        inventory.insert(InventoryEntry {
            docname: if rendered { entry.docname.clone() } else { None },
            anchor: if rendered { entry.anchor.clone() } else { None },
            ..entry.clone()
        });
    }
    inventory
}

/// Relative URL from one document to another
pub fn relative_url(from: &str, to: &str, anchor: Option<&str>) -> String {
    let mut url = String::new();
    if from != to || anchor.is_none() {
        let depth = from.matches('/').count();
        url.push_str(&"../".repeat(depth));
        url.push_str(to);
        url.push_str(".html");
    }
    if let Some(anchor) = anchor {
        url.push('#');
        url.push_str(anchor);
    }
    url
}

/// Rewrites roles in document bodies
pub struct XrefResolver<'a> {
    docs: &'a DocumentSet,
    graph: &'a DocumentGraph,
    labels: &'a HashMap<String, LabelTarget>,
    inventory: &'a Inventory,
}

impl<'a> XrefResolver<'a> {
    pub fn new(
        docs: &'a DocumentSet,
        graph: &'a DocumentGraph,
        labels: &'a HashMap<String, LabelTarget>,
        inventory: &'a Inventory,
    ) -> Self {
        Self {
            docs,
            graph,
            labels,
            inventory,
        }
    }

    /// Body of `doc` with every role replaced by a link or placeholder
    pub fn rewrite(&self, doc: &Document, diagnostics: &mut DiagnosticsCollector) -> String {
        replace_roles_at(&doc.body, |role, line| {
            match self.resolve(role, doc) {
                Ok(markdown) => markdown,
                Err(message) => {
                    diagnostics.add(
                        Diagnostic::warning(message)
                            .in_file(doc.location())
                            .at_line(line)
                            .with_code(codes::BROKEN_REF),
                    );
                    unresolved(role.label())
                }
            }
        })
    }

    fn resolve(&self, role: &RoleRef<'_>, doc: &Document) -> Result<String, String> {
        let missing = || format!("unresolved reference '{}'", role.target);
        match role.name {
            "doc" if role.domain.is_none() => {
                let docname = resolve_docname(doc.dir(), role.target);
                let target = self
                    .docs
                    .get(&docname)
                    .filter(|_| self.graph.contains(&docname))
                    .ok_or_else(missing)?;
                let text = role.text.unwrap_or(&target.title);
                Ok(text_link(text, &relative_url(&doc.docname, &docname, None)))
            }
            "ref" if role.domain.is_none() => {
                let target = self.labels.get(role.target).ok_or_else(missing)?;
                let text = role.text.unwrap_or(&target.title);
                Ok(text_link(
                    text,
                    &relative_url(&doc.docname, &target.docname, Some(&target.anchor)),
                ))
            }
            name if is_object_role(name) => {
                if let Some(domain) = role.domain {
                    if !KNOWN_DOMAINS.contains(&domain) {
                        return Err(format!("unknown role '{}'", role.full_name()));
                    }
                }
                match self.inventory.lookup(role.target, name) {
                    Lookup::Found(entry) => Ok(self.object_link(entry, role.label(), doc)),
                    Lookup::Ambiguous(entries) => Err(format!(
                        "ambiguous reference '{}': {}",
                        role.target,
                        entries
                            .iter()
                            .map(|e| e.name.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    )),
                    Lookup::Missing => Err(missing()),
                }
            }
            _ => Err(format!("unknown role '{}'", role.full_name())),
        }
    }

    fn object_link(&self, entry: &InventoryEntry, label: &str, doc: &Document) -> String {
        let code = code_span(label);
        match entry.docname {
            Some(ref docname) => format!(
                "[{}]({})",
                code,
                relative_url(&doc.docname, docname, entry.anchor.as_deref())
            ),
            None => code,
        }
    }
}

fn text_link(text: &str, url: &str) -> String {
    let escaped = text.replace('[', "\\[").replace(']', "\\]");
    format!("[{}]({})", escaped, url)
}

fn code_span(text: &str) -> String {
    format!("`{}`", text.replace('`', "'"))
}
