//! Markdown bodies for generated pages
//!
//! Bodies use plain CommonMark plus the markup the renderer understands:
//! `` {doc}`...` `` roles for page links, `<span class="target">` anchors
//! for objects, and ```` ```{note} ```` style directive fences for
//! admonitions.

use super::{base_target, parent_scope};
use crate::doc_comment::{AdmonitionKind, DocComment};
use crate::inventory::Inventory;
use crate::symbol::{Access, HeaderFile, Symbol, SymbolKind};
use std::collections::HashMap;

/// Everything a page body may link to
pub struct PageWriter<'a> {
    /// Fence language for declarations
    pub lang: &'a str,
    /// refid -> page id, for symbols with their own page
    pub page_of: &'a HashMap<String, String>,
    /// refid -> documentation with references resolved
    pub docs: &'a HashMap<String, DocComment>,
    /// display path -> file page id
    pub file_pages: &'a HashMap<String, String>,
    /// refid -> refids of classes deriving from it
    pub derived: &'a HashMap<String, Vec<String>>,
    /// Resolves base class names
    pub inventory: &'a Inventory,
}

impl<'a> PageWriter<'a> {
    /// Body of a symbol's own page
    pub fn symbol_page(&self, symbol: &Symbol, title: &str) -> String {
        let mut md = format!("# {}\n\n", escape_heading(title));

        if symbol.kind() != SymbolKind::Namespace {
            self.defined_in(&mut md, symbol);
        }

        match symbol.kind() {
            SymbolKind::Namespace => self.namespace_body(&mut md, symbol),
            k if k.is_class_like() => self.class_body(&mut md, symbol),
            SymbolKind::Enum => {
                md.push_str("## Enum Documentation\n\n");
                self.object(&mut md, symbol);
                self.enumerators(&mut md, symbol);
            }
            kind => {
                md.push_str(&format!("## {} Documentation\n\n", kind.display_name()));
                self.object(&mut md, symbol);
            }
        }

        md
    }

    /// Body of a header file page
    pub fn file_page(&self, file: &HeaderFile, title: &str, declared: &[&Symbol]) -> String {
        let mut md = format!("# {}\n\n", escape_heading(title));
        md.push_str(&anchor(&file.refid));
        md.push_str(&format!("- Path: `{}`\n\n", file.path));

        let doc = self
            .docs
            .get(&file.refid)
            .cloned()
            .unwrap_or_else(|| file.doc.clone());
        if !doc.is_empty() {
            self.documentation(&mut md, &doc);
        }

        if !file.includes.is_empty() {
            md.push_str("## Includes\n\n");
            for include in &file.includes {
                md.push_str(&format!("- `{}`\n", include));
            }
            md.push('\n');
        }

        self.link_groups(&mut md, declared, "##");
        md
    }

    fn defined_in(&self, md: &mut String, symbol: &Symbol) {
        let file = &symbol.location.file;
        match self.file_pages.get(file) {
            Some(page) => md.push_str(&format!(
                "- Defined in {{doc}}`{} <{}>`\n\n",
                file, page
            )),
            None => md.push_str(&format!("- Defined in `{}`\n\n", file)),
        }
    }

    fn namespace_body(&self, md: &mut String, symbol: &Symbol) {
        md.push_str(&anchor(&symbol.refid));
        self.documentation(md, &self.doc_of(symbol));

        let children: Vec<&Symbol> = symbol
            .children
            .iter()
            .filter(|c| self.page_of.contains_key(&c.refid))
            .collect();
        self.link_groups(md, &children, "##");
    }

    fn class_body(&self, md: &mut String, symbol: &Symbol) {
        let bases = symbol.class_def().map(|c| c.bases.as_slice()).unwrap_or(&[]);
        let derived = self.derived.get(&symbol.refid);

        if !bases.is_empty() || derived.is_some() {
            md.push_str("## Inheritance Relationships\n\n");
            if !bases.is_empty() {
                md.push_str(if bases.len() == 1 {
                    "### Base Type\n\n"
                } else {
                    "### Base Types\n\n"
                });
                for base in bases {
                    let virt = if base.is_virtual { "virtual " } else { "" };
                    let link = self
                        .inventory
                        .lookup_in_scope(base_target(&base.name), parent_scope(symbol), "class")
                        .found()
                        .filter(|e| self.page_of.contains_key(&e.refid))
                        .map(|e| format!("{{doc}}`{} <{}>`", base.name, self.page_of[&e.refid]))
                        .unwrap_or_else(|| format!("`{}`", base.name));
                    md.push_str(&format!("- {}{} {}\n", virt, base.access.keyword(), link));
                }
                md.push('\n');
            }
            if let Some(derived) = derived {
                md.push_str(if derived.len() == 1 {
                    "### Derived Type\n\n"
                } else {
                    "### Derived Types\n\n"
                });
                for refid in derived {
                    if let Some(page) = self.page_of.get(refid) {
                        md.push_str(&format!("- {{doc}}`{}`\n", page));
                    }
                }
                md.push('\n');
            }
        }

        md.push_str(&format!(
            "## {} Documentation\n\n",
            symbol.kind().display_name()
        ));
        self.object(md, symbol);

        for access in [Access::Public, Access::Protected] {
            let members: Vec<&Symbol> = symbol
                .children
                .iter()
                .filter(|c| c.access == access)
                .collect();
            if members.is_empty() {
                continue;
            }
            let label = match access {
                Access::Protected => "Protected",
                _ => "Public",
            };

            let types: Vec<&Symbol> = members
                .iter()
                .copied()
                .filter(|m| self.page_of.contains_key(&m.refid))
                .collect();
            if !types.is_empty() {
                md.push_str(&format!("### {} Types\n\n", label));
                for t in &types {
                    self.link_item(md, t);
                }
                md.push('\n');
            }

            for (kinds, heading) in [
                (&[SymbolKind::Typedef][..], "Type Aliases"),
                (&[SymbolKind::Function][..], "Functions"),
                (&[SymbolKind::Variable][..], "Members"),
            ] {
                let group: Vec<&Symbol> = members
                    .iter()
                    .copied()
                    .filter(|m| kinds.contains(&m.kind()) && !self.page_of.contains_key(&m.refid))
                    .collect();
                if group.is_empty() {
                    continue;
                }
                md.push_str(&format!("### {} {}\n\n", label, heading));
                for member in group {
                    let heading = match member.kind() {
                        SymbolKind::Function => format!("{}()", member.name),
                        _ => member.name.clone(),
                    };
                    md.push_str(&format!("#### `{}`\n\n", heading));
                    self.object(md, member);
                }
            }
        }
    }

    fn enumerators(&self, md: &mut String, symbol: &Symbol) {
        let Some(enum_def) = symbol.enum_def() else {
            return;
        };
        if enum_def.enumerators.is_empty() {
            return;
        }
        md.push_str("### Values\n\n");
        for e in &enum_def.enumerators {
            md.push_str(&format!(
                "- <span class=\"target\" id=\"{}\"></span>`{}`",
                e.refid, e.name
            ));
            if let Some(ref init) = e.initializer {
                md.push_str(&format!(" = `{}`", init));
            }
            let doc = self.docs.get(&e.refid).cloned().unwrap_or_else(|| e.doc.clone());
            let text = [doc.brief, doc.description]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            if !text.is_empty() {
                md.push_str(": ");
                md.push_str(&indent_continuation(&text));
            }
            md.push('\n');
        }
        md.push('\n');
    }

    /// Anchor, declaration and documentation of one object
    fn object(&self, md: &mut String, symbol: &Symbol) {
        md.push_str(&anchor(&symbol.refid));
        md.push_str(&format!("```{}\n{}\n```\n\n", self.lang, symbol.declaration()));
        self.documentation(md, &self.doc_of(symbol));
    }

    fn doc_of(&self, symbol: &Symbol) -> DocComment {
        self.docs
            .get(&symbol.refid)
            .cloned()
            .unwrap_or_else(|| symbol.doc.clone())
    }

    /// Documentation sections in a fixed order
    fn documentation(&self, md: &mut String, doc: &DocComment) {
        if let Some(ref deprecated) = doc.deprecated {
            md.push_str(&directive("admonition", Some("Deprecated"), Some("deprecated"), deprecated));
        }
        if let Some(ref brief) = doc.brief {
            md.push_str(brief.trim());
            md.push_str("\n\n");
        }
        if let Some(ref description) = doc.description {
            md.push_str(description.trim());
            md.push_str("\n\n");
        }

        if !doc.template_params.is_empty() {
            md.push_str("**Template Parameters**\n\n");
            for p in &doc.template_params {
                md.push_str(&format!("- `{}`: {}\n", p.name, indent_continuation(&p.doc)));
            }
            md.push('\n');
        }
        if !doc.params.is_empty() {
            md.push_str("**Parameters**\n\n");
            for p in &doc.params {
                let direction = p
                    .direction
                    .as_ref()
                    .map(|d| format!(" *({})*", d))
                    .unwrap_or_default();
                md.push_str(&format!(
                    "- `{}`{}: {}\n",
                    p.name,
                    direction,
                    indent_continuation(&p.doc)
                ));
            }
            md.push('\n');
        }
        if let Some(ref returns) = doc.returns {
            md.push_str("**Returns**\n\n");
            md.push_str(returns.trim());
            md.push_str("\n\n");
        }
        if !doc.retvals.is_empty() {
            md.push_str("**Return Values**\n\n");
            for r in &doc.retvals {
                md.push_str(&format!("- `{}`: {}\n", r.name, indent_continuation(&r.doc)));
            }
            md.push('\n');
        }
        if !doc.throws.is_empty() {
            md.push_str("**Exceptions**\n\n");
            for t in &doc.throws {
                md.push_str(&format!("- `{}`: {}\n", t.type_name, indent_continuation(&t.doc)));
            }
            md.push('\n');
        }

        for admonition in &doc.admonitions {
            let text = match admonition.kind {
                AdmonitionKind::Note => directive("note", None, None, &admonition.text),
                AdmonitionKind::Warning => directive("warning", None, None, &admonition.text),
                kind => directive(
                    "admonition",
                    Some(kind.title()),
                    Some(kind.css_class()),
                    &admonition.text,
                ),
            };
            md.push_str(&text);
        }

        if let Some(ref since) = doc.since {
            md.push_str(&format!("*Since {}*\n\n", since.trim()));
        }
        if !doc.see_also.is_empty() {
            md.push_str(&format!("**See also**: {}\n\n", doc.see_also.join(", ")));
        }
    }

    /// Links grouped under one heading per kind
    fn link_groups(&self, md: &mut String, symbols: &[&Symbol], level: &str) {
        const GROUPS: &[(&[SymbolKind], &str)] = &[
            (&[SymbolKind::Namespace], "Namespaces"),
            (
                &[SymbolKind::Class, SymbolKind::Struct, SymbolKind::Union],
                "Classes",
            ),
            (&[SymbolKind::Enum], "Enums"),
            (&[SymbolKind::Function], "Functions"),
            (&[SymbolKind::Variable], "Variables"),
            (&[SymbolKind::Typedef], "Typedefs"),
            (&[SymbolKind::Define], "Defines"),
        ];

        for (kinds, heading) in GROUPS {
            let group: Vec<&&Symbol> = symbols
                .iter()
                .filter(|s| kinds.contains(&s.kind()))
                .collect();
            if group.is_empty() {
                continue;
            }
            md.push_str(&format!("{} {}\n\n", level, heading));
            for symbol in group {
                self.link_item(md, symbol);
            }
            md.push('\n');
        }
    }

    fn link_item(&self, md: &mut String, symbol: &Symbol) {
        let label = match symbol.kind() {
            SymbolKind::Function => match symbol.function_def() {
                Some(f) => format!("{}{}", symbol.qualified_name, f.param_list()),
                None => symbol.qualified_name.clone(),
            },
            _ => symbol.qualified_name.clone(),
        };
        let link = match self.page_of.get(&symbol.refid) {
            Some(page) => format!("{{doc}}`{} <{}>`", escape_role_text(&label), page),
            None => format!("`{}`", label),
        };
        match self.doc_of(symbol).summary() {
            Some(summary) => md.push_str(&format!(
                "- {}: {}\n",
                link,
                summary.replace('\n', " ")
            )),
            None => md.push_str(&format!("- {}\n", link)),
        }
    }
}

/// Anchor for an object
pub fn anchor(refid: &str) -> String {
    format!("<span class=\"target\" id=\"{}\"></span>\n\n", refid)
}

/// A directive fence; four backticks so code fences may nest inside
pub fn directive(name: &str, argument: Option<&str>, class: Option<&str>, body: &str) -> String {
    let mut out = format!("````{{{}}}", name);
    if let Some(arg) = argument {
        out.push(' ');
        out.push_str(arg);
    }
    out.push('\n');
    if let Some(class) = class {
        out.push_str(&format!(":class: {}\n", class));
    }
    out.push_str(body.trim());
    out.push_str("\n````\n\n");
    out
}

/// Indent continuation lines so multi-line text stays inside a list item
fn indent_continuation(text: &str) -> String {
    text.trim().replace('\n', "\n  ")
}

/// Role text may not contain backticks
fn escape_role_text(text: &str) -> String {
    text.replace('`', "'")
}

/// Keep angle brackets in titles from turning into HTML
pub fn escape_heading(text: &str) -> String {
    text.replace('<', "\\<").replace('>', "\\>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_nests_code() {
        let text = directive("note", None, None, "Example:\n\n```cpp\nrun();\n```");
        assert!(text.starts_with("````{note}\nExample:"));
        assert!(text.ends_with("```\n````\n\n"));
    }

    #[test]
    fn test_admonition_with_title() {
        let text = directive("admonition", Some("Precondition"), Some("pre"), "Connected.");
        assert_eq!(
            text,
            "````{admonition} Precondition\n:class: pre\nConnected.\n````\n\n"
        );
    }

    #[test]
    fn test_indent_continuation() {
        assert_eq!(indent_continuation("a\nb\n"), "a\n  b");
    }
}
