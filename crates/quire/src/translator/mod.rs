//! Symbol tree to page set
//!
//! The translator plans one page per namespace, type, namespace-scope
//! entity, macro and header, resolves `@ref`/`@see` targets against the
//! inventory of extracted objects, links the pages into a tree under a root
//! index page, validates that tree and renders every page to Markdown with
//! front matter.
//!
//! The result is fully determined by the symbol tree: children are sorted
//! and no timestamps or absolute paths are embedded.

pub mod markdown;
pub mod page;
pub mod tree;

pub use page::{split_front_matter, FrontMatter, Page, PageObject, PageSet, FRONT_MATTER_DELIMITER};

use crate::config::QuireConfig;
use crate::diagnostics::{codes, Diagnostic, DiagnosticsCollector, QuireResult};
use crate::doc_comment::DocComment;
use crate::inventory::{is_object_role, Inventory, InventoryEntry, Lookup, ENUMERATOR_KIND};
use crate::role::{replace_roles, RoleRef};
use crate::symbol::{Enumerator, HeaderFile, Location, Symbol, SymbolKind, SymbolTree};
use crate::utils::escape_refid;
use crate::utils::fs::{write_file, StagedDir};
use markdown::{escape_heading, PageWriter};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Translator output
#[derive(Debug, Clone, Default)]
pub struct Translation {
    pub pages: PageSet,
    /// Every documented object with the page that describes it
    pub inventory: Inventory,
}

/// A page about to be generated
struct Planned<'t> {
    /// `None` for header file pages
    symbol: Option<&'t Symbol>,
    file: Option<&'t HeaderFile>,
    id: String,
    title: String,
    /// Label in lists: qualified name, with parameters for overloads
    label: String,
    /// Tree parent page id
    parent: String,
}

impl Planned<'_> {
    fn kind(&self) -> Option<SymbolKind> {
        self.symbol.map(Symbol::kind)
    }

    /// Children are ordered by kind (files last), then title
    fn sort_key(&self) -> (bool, Option<SymbolKind>, &str, &str) {
        (self.symbol.is_none(), self.kind(), self.title.as_str(), self.id.as_str())
    }
}

/// Generates the API page set
pub struct Translator<'a> {
    config: &'a QuireConfig,
}

impl<'a> Translator<'a> {
    /// Create a translator
    pub fn new(config: &'a QuireConfig) -> Self {
        Self { config }
    }

    /// Id of the root page: the root file name without extension
    pub fn root_id(&self) -> String {
        let name = &self.config.api.root_file_name;
        name.strip_suffix(".md").unwrap_or(name).to_string()
    }

    fn docname(&self, id: &str) -> String {
        format!(
            "{}/{}",
            self.config.api.containment_folder.trim_end_matches('/'),
            id
        )
    }

    /// Build the page set for a symbol tree
    pub fn translate(
        &self,
        tree: &SymbolTree,
        diagnostics: &mut DiagnosticsCollector,
    ) -> QuireResult<Translation> {
        let root_id = self.root_id();
        let tree_view = self.config.api.create_tree_view;
        let planned = self.plan(tree, &root_id);

        let page_of: HashMap<String, String> = planned
            .iter()
            .filter_map(|p| p.symbol.map(|s| (s.refid.clone(), p.id.clone())))
            .collect();
        let file_pages: HashMap<String, String> = planned
            .iter()
            .filter_map(|p| p.file.map(|f| (f.path.clone(), p.id.clone())))
            .collect();

        let docnames: HashMap<String, String> = page_of
            .iter()
            .map(|(refid, id)| (refid.clone(), self.docname(id)))
            .collect();
        let inventory = build_inventory(tree, &docnames);
        debug!("Inventory holds {} object(s)", inventory.len());

        let docs = resolve_docs(tree, &inventory, diagnostics);
        let derived = derived_classes(tree, &inventory);

        let lang = match self.config.html.primary_domain.as_str() {
            "c" => "c",
            _ => "cpp",
        };
        let writer = PageWriter {
            lang,
            page_of: &page_of,
            docs: &docs,
            file_pages: &file_pages,
            derived: &derived,
            inventory: &inventory,
        };

        // parent page id -> children, in sorted order
        let mut children: HashMap<&str, Vec<&Planned>> = HashMap::new();
        if tree_view {
            for p in &planned {
                children.entry(p.parent.as_str()).or_default().push(p);
            }
        } else {
            children.insert(root_id.as_str(), planned.iter().collect());
        }
        for list in children.values_mut() {
            list.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        }

        let mut set = PageSet {
            root: root_id.clone(),
            root_file_name: self.config.api.root_file_name.clone(),
            pages: Default::default(),
        };

        let mut root = Page::new(&root_id, &self.config.api.root_file_title);
        root.body = self.root_body(&planned, &children, &root_id);
        root.front.children = child_ids(&children, &root_id);
        set.pages.insert(root_id.clone(), root);

        for p in &planned {
            let mut page = Page::new(&p.id, &p.title);
            match (p.symbol, p.file) {
                (Some(symbol), _) => {
                    page.body = writer.symbol_page(symbol, &p.title);
                    page.front.objects = page_objects(symbol, &page_of);
                }
                (None, Some(file)) => {
                    let declared: Vec<&Symbol> = planned
                        .iter()
                        .filter_map(|q| q.symbol)
                        .filter(|s| {
                            s.location.file == file.path && s.kind() != SymbolKind::Namespace
                        })
                        .collect();
                    page.body = writer.file_page(file, &p.title, &declared);
                }
                (None, None) => {}
            }
            if tree_view {
                page.front.parent = Some(p.parent.clone());
                page.front.children = child_ids(&children, &p.id);
            }
            set.pages.insert(p.id.clone(), page);
        }

        tree::validate(&set, tree_view)?;
        info!(
            "Generated {} page(s) for {} symbol(s)",
            set.len(),
            tree.symbol_count()
        );

        Ok(Translation {
            pages: set,
            inventory,
        })
    }

    /// Choose pages, ids, titles and tree parents
    fn plan<'t>(&self, tree: &'t SymbolTree, root_id: &str) -> Vec<Planned<'t>> {
        let mut used: HashSet<String> = HashSet::new();
        used.insert(root_id.to_string());

        let mut planned = Vec::new();
        let mut file_ids: HashMap<&str, String> = HashMap::new();
        for file in &tree.files {
            let id = reserve(&mut used, format!("file_{}", file.refid));
            file_ids.insert(file.path.as_str(), id.clone());
            planned.push(Planned {
                symbol: None,
                file: Some(file),
                id,
                title: format!("File {}", file.path),
                label: file.path.clone(),
                parent: root_id.to_string(),
            });
        }

        let mut candidates = Vec::new();
        collect_pages(&tree.symbols, None, &mut candidates);

        let mut overloads: HashMap<&str, usize> = HashMap::new();
        for &(symbol, _) in &candidates {
            if symbol.kind() == SymbolKind::Function {
                *overloads.entry(symbol.qualified_name.as_str()).or_default() += 1;
            }
        }

        let mut ids: HashMap<&str, String> = HashMap::new();
        for (symbol, parent) in candidates {
            let kind = symbol.kind();
            let overloaded = overloads
                .get(symbol.qualified_name.as_str())
                .is_some_and(|&n| n > 1);

            let mut base = format!(
                "{}_{}",
                kind.id_prefix(),
                escape_refid(&symbol.qualified_name)
            );
            if overloaded {
                base.push('_');
                base.push_str(refid_hash(&symbol.refid));
            }
            let id = reserve(&mut used, base);

            let params = symbol
                .function_def()
                .filter(|_| overloaded)
                .map(|f| f.param_list())
                .unwrap_or_default();
            let title = match kind {
                SymbolKind::Namespace => format!("Namespace {}", symbol.qualified_name),
                k if k.is_class_like() || k == SymbolKind::Enum => {
                    format!("{} {}", k.display_name(), symbol.name)
                }
                SymbolKind::Define => format!("Define {}", symbol.name),
                k => format!("{} {}{}", k.display_name(), symbol.qualified_name, params),
            };
            let label = match symbol.function_def() {
                Some(f) => format!("{}{}", symbol.qualified_name, f.param_list()),
                None => symbol.qualified_name.clone(),
            };

            let parent = match parent {
                Some(p) => ids.get(p.refid.as_str()).cloned(),
                None if kind == SymbolKind::Namespace => None,
                None => file_ids.get(symbol.location.file.as_str()).cloned(),
            }
            .unwrap_or_else(|| root_id.to_string());

            ids.insert(symbol.refid.as_str(), id.clone());
            planned.push(Planned {
                symbol: Some(symbol),
                file: None,
                id,
                title,
                label,
                parent,
            });
        }

        planned
    }

    /// Root page: hierarchies (tree view) and the full API listing
    fn root_body(
        &self,
        planned: &[Planned],
        children: &HashMap<&str, Vec<&Planned>>,
        root_id: &str,
    ) -> String {
        let mut md = format!("# {}\n\n", escape_heading(&self.config.api.root_file_title));

        if self.config.api.create_tree_view {
            let roots: Vec<&Planned> = children
                .get(root_id)
                .map(|c| c.iter().copied().filter(|p| p.symbol.is_some()).collect())
                .unwrap_or_default();
            if !roots.is_empty() {
                md.push_str("## Class Hierarchy\n\n");
                for p in roots {
                    hierarchy(&mut md, p, children, 0);
                }
                md.push('\n');
            }

            let files: Vec<&Planned> = planned.iter().filter(|p| p.file.is_some()).collect();
            if !files.is_empty() {
                md.push_str("## File Hierarchy\n\n");
                for p in files {
                    md.push_str(&format!("- {{doc}}`{} <{}>`\n", p.label, p.id));
                }
                md.push('\n');
            }
        }

        md.push_str("## Full API\n\n");
        const GROUPS: &[(&[SymbolKind], &str)] = &[
            (&[SymbolKind::Namespace], "Namespaces"),
            (
                &[SymbolKind::Class, SymbolKind::Struct, SymbolKind::Union],
                "Classes and Structs",
            ),
            (&[SymbolKind::Enum], "Enums"),
            (&[SymbolKind::Function], "Functions"),
            (&[SymbolKind::Variable], "Variables"),
            (&[SymbolKind::Typedef], "Typedefs"),
            (&[SymbolKind::Define], "Defines"),
        ];
        let mut all: Vec<&Planned> = planned.iter().collect();
        all.sort_by(|a, b| {
            (a.kind(), &a.label, &a.id).cmp(&(b.kind(), &b.label, &b.id))
        });

        for (kinds, heading) in GROUPS {
            let group: Vec<&&Planned> = all
                .iter()
                .filter(|p| p.kind().is_some_and(|k| kinds.contains(&k)))
                .collect();
            if group.is_empty() {
                continue;
            }
            md.push_str(&format!("### {}\n\n", heading));
            for p in group {
                md.push_str(&format!("- {{doc}}`{} <{}>`\n", p.label.replace('`', "'"), p.id));
            }
            md.push('\n');
        }

        let files: Vec<&&Planned> = all.iter().filter(|p| p.file.is_some()).collect();
        if !files.is_empty() {
            md.push_str("### Files\n\n");
            for p in files {
                md.push_str(&format!("- {{doc}}`{} <{}>`\n", p.label, p.id));
            }
            md.push('\n');
        }

        md
    }

    /// Write a page set into a staging directory for `dir`
    pub fn stage(&self, set: &PageSet, dir: &Path) -> QuireResult<StagedDir> {
        let staged = StagedDir::new(dir)?;
        for page in set.pages.values() {
            let path = staged.path().join(set.file_name(&page.id));
            write_file(&path, page.render()?)?;
        }
        debug!("Staged {} page(s) for {}", set.len(), dir.display());
        Ok(staged)
    }

    /// Write a page set into `dir`, replacing its previous content
    pub fn write(&self, set: &PageSet, dir: &Path) -> QuireResult<PathBuf> {
        let published = self.stage(set, dir)?.publish()?;
        info!("Wrote {} page(s) to {}", set.len(), published.display());
        Ok(published)
    }
}

/// Inventory without pages, for resolving roles when no API pages exist
pub fn bridge(tree: &SymbolTree) -> Inventory {
    build_inventory(tree, &HashMap::new())
}

/// Every documented symbol and enumerator; `docnames` maps refids to the
/// document of their own page
pub fn build_inventory(tree: &SymbolTree, docnames: &HashMap<String, String>) -> Inventory {
    fn fill(
        symbols: &[Symbol],
        enclosing: Option<&str>,
        docnames: &HashMap<String, String>,
        inventory: &mut Inventory,
    ) {
        for symbol in symbols.iter().filter(|s| s.access.is_documented()) {
            let docname = docnames
                .get(&symbol.refid)
                .map(String::as_str)
                .or(enclosing);
            inventory.insert(InventoryEntry {
                name: symbol.qualified_name.clone(),
                kind: symbol.kind().id_prefix().to_string(),
                refid: symbol.refid.clone(),
                docname: docname.map(str::to_string),
                anchor: docname.map(|_| symbol.refid.clone()),
            });
            if let Some(enum_def) = symbol.enum_def() {
                for e in &enum_def.enumerators {
                    inventory.insert(InventoryEntry {
                        name: enumerator_name(symbol, enum_def.scoped, e),
                        kind: ENUMERATOR_KIND.to_string(),
                        refid: e.refid.clone(),
                        docname: docname.map(str::to_string),
                        anchor: docname.map(|_| e.refid.clone()),
                    });
                }
            }
            fill(&symbol.children, docname, docnames, inventory);
        }
    }

    let mut inventory = Inventory::new();
    fill(&tree.symbols, None, docnames, &mut inventory);
    inventory
}

/// Qualified name of an enumerator; unscoped enumerators live in the
/// enclosing scope
fn enumerator_name(symbol: &Symbol, scoped: bool, e: &Enumerator) -> String {
    let scope = if scoped {
        symbol.qualified_name.as_str()
    } else {
        parent_scope(symbol)
    };
    if scope.is_empty() {
        e.name.clone()
    } else {
        format!("{}::{}", scope, e.name)
    }
}

/// Qualified name of the scope enclosing a symbol
pub(crate) fn parent_scope(symbol: &Symbol) -> &str {
    symbol
        .qualified_name
        .strip_suffix(symbol.name.as_str())
        .and_then(|s| s.strip_suffix("::"))
        .unwrap_or("")
}

/// Name to look a base class up by: template arguments removed
pub(crate) fn base_target(name: &str) -> &str {
    name.split('<').next().unwrap_or(name).trim()
}

/// Symbols that get their own page, paired with the page symbol they belong to
fn collect_pages<'t>(
    symbols: &'t [Symbol],
    parent: Option<&'t Symbol>,
    out: &mut Vec<(&'t Symbol, Option<&'t Symbol>)>,
) {
    let in_class = parent.is_some_and(|p| p.kind().is_class_like());
    for symbol in symbols.iter().filter(|s| s.access.is_documented()) {
        let kind = symbol.kind();
        let own_page = kind.is_compound() || kind == SymbolKind::Enum || !in_class;
        if !own_page {
            continue;
        }
        out.push((symbol, parent));
        if kind.is_compound() {
            collect_pages(&symbol.children, Some(symbol), out);
        }
    }
}

/// Claim an id, adding a counter when it is taken
fn reserve(used: &mut HashSet<String>, base: String) -> String {
    if used.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}", base, n);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Short hash part of a member refid
fn refid_hash(refid: &str) -> &str {
    let hash = refid.rsplit("_1a").next().unwrap_or(refid);
    &hash[..hash.len().min(8)]
}

fn child_ids(children: &HashMap<&str, Vec<&Planned>>, id: &str) -> Vec<String> {
    children
        .get(id)
        .map(|list| list.iter().map(|p| p.id.clone()).collect())
        .unwrap_or_default()
}

/// Nested list of namespaces and types
fn hierarchy(md: &mut String, p: &Planned, children: &HashMap<&str, Vec<&Planned>>, depth: usize) {
    let shown = p
        .kind()
        .is_some_and(|k| k.is_compound() || k == SymbolKind::Enum);
    if !shown {
        return;
    }
    md.push_str(&"  ".repeat(depth));
    md.push_str(&format!("- {{doc}}`{} <{}>`\n", p.title, p.id));
    if let Some(list) = children.get(p.id.as_str()) {
        for child in list {
            hierarchy(md, child, children, depth + 1);
        }
    }
}

/// Objects described on a symbol's page
fn page_objects(symbol: &Symbol, page_of: &HashMap<String, String>) -> Vec<PageObject> {
    let object = |s: &Symbol| PageObject {
        name: s.qualified_name.clone(),
        kind: s.kind().id_prefix().to_string(),
        refid: s.refid.clone(),
        anchor: Some(s.refid.clone()),
    };

    let mut objects = vec![object(symbol)];
    if symbol.kind().is_class_like() {
        objects.extend(
            symbol
                .children
                .iter()
                .filter(|c| c.access.is_documented() && !page_of.contains_key(&c.refid))
                .map(object),
        );
    }
    if let Some(enum_def) = symbol.enum_def() {
        objects.extend(enum_def.enumerators.iter().map(|e| PageObject {
            name: enumerator_name(symbol, enum_def.scoped, e),
            kind: ENUMERATOR_KIND.to_string(),
            refid: e.refid.clone(),
            anchor: Some(e.refid.clone()),
        }));
    }
    objects
}

/// refid -> class refids deriving from it
fn derived_classes(tree: &SymbolTree, inventory: &Inventory) -> HashMap<String, Vec<String>> {
    let mut derived: HashMap<String, Vec<String>> = HashMap::new();
    tree.walk(&mut |symbol| {
        let Some(class_def) = symbol.class_def() else {
            return;
        };
        if !symbol.access.is_documented() {
            return;
        }
        for base in &class_def.bases {
            if let Some(entry) = inventory
                .lookup_in_scope(base_target(&base.name), parent_scope(symbol), "class")
                .found()
            {
                derived
                    .entry(entry.refid.clone())
                    .or_default()
                    .push(symbol.refid.clone());
            }
        }
    });
    derived
}

/// Documentation with references rewritten to refids, keyed by refid
fn resolve_docs(
    tree: &SymbolTree,
    inventory: &Inventory,
    diagnostics: &mut DiagnosticsCollector,
) -> HashMap<String, DocComment> {
    let mut resolver = Resolver {
        inventory,
        diagnostics,
    };
    let mut docs = HashMap::new();

    for file in &tree.files {
        if !file.doc.is_empty() {
            let location = Location::new(file.path.as_str(), 1, 1);
            docs.insert(file.refid.clone(), resolver.doc(&file.doc, "", &location));
        }
    }

    fn visit(
        symbols: &[Symbol],
        scope: &str,
        resolver: &mut Resolver,
        docs: &mut HashMap<String, DocComment>,
    ) {
        for symbol in symbols.iter().filter(|s| s.access.is_documented()) {
            let own_scope = if symbol.kind().is_compound() || symbol.kind() == SymbolKind::Enum {
                symbol.qualified_name.as_str()
            } else {
                scope
            };
            if !symbol.doc.is_empty() {
                let doc = resolver.doc(&symbol.doc, own_scope, &symbol.location);
                docs.insert(symbol.refid.clone(), doc);
            }
            if let Some(enum_def) = symbol.enum_def() {
                for e in enum_def.enumerators.iter().filter(|e| !e.doc.is_empty()) {
                    let doc = resolver.doc(&e.doc, own_scope, &symbol.location);
                    docs.insert(e.refid.clone(), doc);
                }
            }
            visit(&symbol.children, own_scope, resolver, docs);
        }
    }

    visit(&tree.symbols, "", &mut resolver, &mut docs);
    docs
}

/// Rewrites object roles in documentation text
struct Resolver<'i, 'd> {
    inventory: &'i Inventory,
    diagnostics: &'d mut DiagnosticsCollector,
}

impl Resolver<'_, '_> {
    fn doc(&mut self, doc: &DocComment, scope: &str, location: &Location) -> DocComment {
        let see_also: Vec<String> = doc
            .see_also
            .iter()
            .map(|target| {
                let role = RoleRef {
                    domain: None,
                    name: "any",
                    text: None,
                    target: target.as_str(),
                };
                self.role(&role, scope, location)
            })
            .collect();

        let mut resolved =
            doc.clone()
                .map_texts(|text| replace_roles(text, |role| self.role(role, scope, location)));
        resolved.see_also = see_also;
        resolved
    }

    fn role(&mut self, role: &RoleRef<'_>, scope: &str, location: &Location) -> String {
        let foreign_domain = role.domain.is_some_and(|d| d != "cpp" && d != "c");
        if foreign_domain || !is_object_role(role.name) {
            return role.markup();
        }

        let message = match self.inventory.lookup_in_scope(role.target, scope, role.name) {
            Lookup::Found(entry) => {
                return format!(
                    "{{{}}}`{} <{}>`",
                    role.full_name(),
                    role.label(),
                    entry.refid
                );
            }
            Lookup::Ambiguous(candidates) => {
                let names: Vec<&str> = candidates.iter().map(|e| e.name.as_str()).collect();
                format!(
                    "ambiguous reference '{}' matches {}",
                    role.target,
                    names.join(", ")
                )
            }
            Lookup::Missing => format!("unresolved reference '{}'", role.target),
        };

        self.diagnostics.add(
            Diagnostic::warning(message)
                .in_file(location.file.as_str())
                .at_line(location.line)
                .with_code(codes::BROKEN_REF),
        );
        unresolved(role.label())
    }
}

/// Visible placeholder for a reference that could not be resolved
pub fn unresolved(label: &str) -> String {
    format!(
        "<span class=\"xref unresolved\">{}</span>",
        html_escape::encode_text(label)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::scan_header;
    use crate::symbol::SymbolTree;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const ERROR_HPP: &str = r#"
/// @file
/// Error codes of libmboxid.
#pragma once
#include <system_error>

namespace mboxid {

/// Error codes.
enum class errc {
    none = 0,           ///< No error.
    illegal_function,   ///< See @ref make_error_code.
};

/// Base class for libmboxid exceptions.
class mboxid_error : public std::system_error {
public:
    /// Create from an error code.
    explicit mboxid_error(errc e);
};

/// Make an error code.
std::error_code make_error_code(errc e);

/// Make an error code from an integer.
/// @see errc, no_such_thing
std::error_code make_error_code(int e);

}
"#;

    const SERVER_HPP: &str = r#"
namespace mboxid {

/// A Modbus TCP server.
///
/// Uses @ref mboxid_error for failures and @ref backend_connector.
class modbus_tcp_server {
public:
    /// Connect.
    /// @param[in] host Host name.
    /// @return True on success.
    bool connect(const char* host);

    /// Stop serving.
    void shutdown();

    /// Server state.
    enum class state { idle, running };

private:
    int fd;
};

}

/// Library version.
#define MBOXID_VERSION 1
"#;

    fn symbol_tree() -> SymbolTree {
        let mut tree = SymbolTree::new("libmboxid");
        for (name, text) in [("error.hpp", ERROR_HPP), ("modbus_tcp_server.hpp", SERVER_HPP)] {
            let parsed = scan_header(text, name, Path::new(name)).unwrap();
            tree.files.push(parsed.file);
            tree.symbols.extend(parsed.symbols);
        }
        tree.merge_namespaces();
        tree.sort();
        tree
    }

    fn config(tree_view: bool) -> QuireConfig {
        let mut config = QuireConfig::parse("[project]\nname = \"libmboxid\"\n").unwrap();
        config.api.create_tree_view = tree_view;
        config
    }

    #[test]
    fn test_page_ids_and_titles() {
        let config = config(true);
        let mut diagnostics = DiagnosticsCollector::new();
        let out = Translator::new(&config)
            .translate(&symbol_tree(), &mut diagnostics)
            .unwrap();
        let pages = &out.pages;

        assert_eq!(pages.root, "library_root");
        assert_eq!(pages.file_name("library_root"), "library_root.md");

        let class = pages.get("class_mboxid_1_1modbus__tcp__server").unwrap();
        assert_eq!(class.title(), "Class modbus_tcp_server");
        assert_eq!(class.front.parent.as_deref(), Some("namespace_mboxid"));
        assert!(class.body.contains("bool mboxid::modbus_tcp_server::connect(const char* host)"));
        assert!(class.body.contains("- `host` *(in)*: Host name."));
        assert!(!class.body.contains("modbus_tcp_server::fd"));

        let nested = "enum_mboxid_1_1modbus__tcp__server_1_1state";
        assert!(class.front.children.contains(&nested.to_string()));

        let overloads: Vec<&Page> = pages
            .pages
            .values()
            .filter(|p| p.id.starts_with("function_mboxid_1_1make__error__code_"))
            .collect();
        assert_eq!(overloads.len(), 2);
        assert!(overloads
            .iter()
            .any(|p| p.title() == "Function mboxid::make_error_code(int e)"));

        let file = pages.get("file_error_8hpp").unwrap();
        assert_eq!(file.front.parent.as_deref(), Some("library_root"));
        assert!(file.body.contains("`<system_error>`"));

        let define = pages
            .pages
            .values()
            .find(|p| p.title() == "Define MBOXID_VERSION")
            .unwrap();
        assert_eq!(
            define.front.parent.as_deref(),
            Some("file_modbus__tcp__server_8hpp")
        );
    }

    #[test]
    fn test_tree_is_valid_and_ordered() {
        let config = config(true);
        let mut diagnostics = DiagnosticsCollector::new();
        let out = Translator::new(&config)
            .translate(&symbol_tree(), &mut diagnostics)
            .unwrap();
        tree::validate(&out.pages, true).unwrap();

        let root = out.pages.root_page().unwrap();
        assert_eq!(
            root.front.children,
            vec![
                "namespace_mboxid".to_string(),
                "file_error_8hpp".to_string(),
                "file_modbus__tcp__server_8hpp".to_string(),
            ]
        );
        assert!(root.body.contains("## Class Hierarchy"));

        let ns = out.pages.get("namespace_mboxid").unwrap();
        let first_kinds: Vec<&str> = ns
            .front
            .children
            .iter()
            .map(|c| c.split('_').next().unwrap_or(""))
            .collect();
        let mut sorted = first_kinds.clone();
        sorted.sort_by_key(|k| SymbolKind::from_id_prefix(k));
        assert_eq!(first_kinds, sorted);
    }

    #[test]
    fn test_flat_tree() {
        let config = config(false);
        let mut diagnostics = DiagnosticsCollector::new();
        let out = Translator::new(&config)
            .translate(&symbol_tree(), &mut diagnostics)
            .unwrap();

        let root = out.pages.root_page().unwrap();
        assert_eq!(root.front.children.len(), out.pages.len() - 1);
        assert!(out
            .pages
            .pages
            .values()
            .all(|p| p.front.parent.is_none()));
        assert!(!root.body.contains("## Class Hierarchy"));
        assert!(root.body.contains("## Full API"));
    }

    #[test]
    fn test_references_resolved_and_broken() {
        let config = config(true);
        let mut diagnostics = DiagnosticsCollector::new();
        let out = Translator::new(&config)
            .translate(&symbol_tree(), &mut diagnostics)
            .unwrap();

        let class = out.pages.get("class_mboxid_1_1modbus__tcp__server").unwrap();
        assert!(class
            .body
            .contains("{any}`mboxid_error <classmboxid_1_1mboxid__error>`"));
        assert!(class
            .body
            .contains("<span class=\"xref unresolved\">backend_connector</span>"));

        let broken: Vec<&str> = diagnostics
            .warnings()
            .filter(|d| d.code.as_deref() == Some(codes::BROKEN_REF))
            .map(|d| d.message.as_str())
            .collect();
        assert_eq!(
            broken,
            vec![
                "unresolved reference 'no_such_thing'",
                "unresolved reference 'backend_connector'",
            ]
        );
    }

    #[test]
    fn test_inventory_and_objects() {
        let config = config(true);
        let mut diagnostics = DiagnosticsCollector::new();
        let out = Translator::new(&config)
            .translate(&symbol_tree(), &mut diagnostics)
            .unwrap();

        let entry = out.inventory.lookup("errc::none", "any").found().unwrap();
        assert_eq!(entry.kind, ENUMERATOR_KIND);
        assert_eq!(entry.docname.as_deref(), Some("api/enum_mboxid_1_1errc"));

        let member = out
            .inventory
            .lookup("mboxid::modbus_tcp_server::shutdown", "func")
            .found()
            .unwrap();
        assert_eq!(
            member.docname.as_deref(),
            Some("api/class_mboxid_1_1modbus__tcp__server")
        );

        let class = out.pages.get("class_mboxid_1_1modbus__tcp__server").unwrap();
        let names: Vec<&str> = class.front.objects.iter().map(|o| o.name.as_str()).collect();
        assert!(names.contains(&"mboxid::modbus_tcp_server::connect"));
        assert!(!names.contains(&"mboxid::modbus_tcp_server::fd"));

        let bridged = bridge(&symbol_tree());
        assert_eq!(bridged.len(), out.inventory.len());
        assert!(bridged.entries().iter().all(|e| e.docname.is_none()));
    }

    #[test]
    fn test_deterministic_and_written() {
        let config = config(true);
        let translator = Translator::new(&config);
        let first = translator
            .translate(&symbol_tree(), &mut DiagnosticsCollector::new())
            .unwrap();
        let second = translator
            .translate(&symbol_tree(), &mut DiagnosticsCollector::new())
            .unwrap();
        assert_eq!(first.pages, second.pages);

        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("api");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("stale.md"), "old").unwrap();

        translator.write(&first.pages, &dir).unwrap();
        assert!(!dir.join("stale.md").exists());
        let text = std::fs::read_to_string(dir.join("library_root.md")).unwrap();
        assert!(text.starts_with("+++\ntitle = \"Library API\"\n"));
        let class = std::fs::read_to_string(
            dir.join("class_mboxid_1_1modbus__tcp__server.md"),
        )
        .unwrap();
        let (front, _) = split_front_matter(&class).unwrap();
        assert_eq!(front.unwrap().parent.as_deref(), Some("namespace_mboxid"));
    }
}
