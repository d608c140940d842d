//! Search index and object inventory
//!
//! `searchindex.json` lists every rendered document with its headings and
//! every documented object. `objects.json` is the cross-reference inventory
//! other projects can link against.

use super::document::{headings, DocumentGraph, DocumentSet};
use crate::diagnostics::QuireResult;
use crate::inventory::Inventory;
use serde::Serialize;

/// Heading entry
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchHeading {
    pub title: String,
    pub anchor: String,
}

/// Document entry
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchDocument {
    pub docname: String,
    pub title: String,
    pub url: String,
    pub headings: Vec<SearchHeading>,
}

/// Object entry
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchObject {
    pub name: String,
    pub kind: String,
    pub url: String,
}

/// Contents of `searchindex.json`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchIndex {
    pub docs: Vec<SearchDocument>,
    pub objects: Vec<SearchObject>,
}

impl SearchIndex {
    /// Index the rendered documents in reading order
    pub fn build(docs: &DocumentSet, graph: &DocumentGraph, inventory: &Inventory) -> Self {
        let docs = graph
            .order
            .iter()
            .filter_map(|docname| docs.get(docname))
            .map(|doc| SearchDocument {
                docname: doc.docname.clone(),
                title: doc.title.clone(),
                url: format!("{}.html", doc.docname),
                headings: headings(&doc.body)
                    .into_iter()
                    .skip(1)
                    .map(|h| SearchHeading {
                        title: h.text,
                        anchor: h.anchor,
                    })
                    .collect(),
            })
            .collect();

        let mut objects: Vec<SearchObject> = inventory
            .entries()
            .iter()
            .filter_map(|entry| {
                let docname = entry.docname.as_ref()?;
                let url = match entry.anchor {
                    Some(ref anchor) => format!("{}.html#{}", docname, anchor),
                    None => format!("{}.html", docname),
                };
                Some(SearchObject {
                    name: entry.name.clone(),
                    kind: entry.kind.clone(),
                    url,
                })
            })
            .collect();
        objects.sort_by(|a, b| (&a.name, &a.kind).cmp(&(&b.name, &b.kind)));

        Self { docs, objects }
    }

    pub fn to_json(&self) -> QuireResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Contents of `objects.json`
pub fn objects_json(inventory: &Inventory) -> QuireResult<String> {
    let mut entries = inventory.entries().to_vec();
    entries.sort_by(|a, b| (&a.name, &a.refid).cmp(&(&b.name, &b.refid)));
    Ok(serde_json::to_string_pretty(&entries)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticsCollector;
    use crate::inventory::InventoryEntry;
    use crate::renderer::document::{build_graph, Document};
    use crate::translator::FrontMatter;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_search_index() {
        let mut docs = DocumentSet::default();
        docs.docs.insert(
            "index".to_string(),
            Document::new(
                "index",
                FrontMatter::default(),
                "# Home\n\n## Building\n".to_string(),
            ),
        );
        let graph = build_graph(&docs, "index", &mut DiagnosticsCollector::new()).unwrap();

        let mut inventory = Inventory::new();
        inventory.insert(InventoryEntry {
            name: "mboxid::errc".to_string(),
            kind: "enum".to_string(),
            refid: "enummboxid_1_1errc".to_string(),
            docname: Some("api/enum_errc".to_string()),
            anchor: Some("enummboxid_1_1errc".to_string()),
        });
        inventory.insert(InventoryEntry {
            name: "mboxid::hidden".to_string(),
            kind: "function".to_string(),
            refid: "x".to_string(),
            docname: None,
            anchor: None,
        });

        let index = SearchIndex::build(&docs, &graph, &inventory);
        assert_eq!(
            index.docs[0].headings,
            vec![SearchHeading {
                title: "Building".to_string(),
                anchor: "building".to_string()
            }]
        );
        assert_eq!(index.objects.len(), 1);
        assert_eq!(index.objects[0].url, "api/enum_errc.html#enummboxid_1_1errc");

        let json = objects_json(&inventory).unwrap();
        assert!(json.contains("\"docname\": \"api/enum_errc\""));
    }
}
