//! Cross-reference inventory
//!
//! Every addressable object (symbol or enumerator) with the page and anchor
//! that documents it. The translator uses it to resolve `@ref` targets in
//! doc comments, the renderer to resolve roles, and it is published as
//! `objects.json`.

use crate::symbol::SymbolKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind string used for enumerators
pub const ENUMERATOR_KIND: &str = "enumerator";

/// Role names that refer to documented objects
pub const OBJECT_ROLES: &[&str] = &[
    "any", "namespace", "class", "struct", "union", "type", "enum", "enumerator", "func",
    "function", "member", "var", "data", "macro",
];

/// Whether a role names an object kind rather than a document or heading
pub fn is_object_role(name: &str) -> bool {
    OBJECT_ROLES.contains(&name)
}

/// One addressable object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEntry {
    /// Qualified name
    pub name: String,
    /// `class`, `function`, ..., or `enumerator`
    pub kind: String,
    pub refid: String,
    /// Document that describes the object, if any
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub docname: Option<String>,
    /// Anchor within that document
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub anchor: Option<String>,
}

impl InventoryEntry {
    /// Whether a role (without domain) may refer to this object
    pub fn accepts(&self, role: &str) -> bool {
        if self.kind == ENUMERATOR_KIND {
            return matches!(role, "enumerator" | "member" | "var" | "any");
        }
        SymbolKind::from_id_prefix(&self.kind).is_some_and(|k| k.role_names().contains(&role))
    }

    /// `docname#anchor`
    pub fn target(&self) -> Option<String> {
        let docname = self.docname.as_ref()?;
        Some(match self.anchor {
            Some(ref anchor) => format!("{}#{}", docname, anchor),
            None => docname.clone(),
        })
    }
}

/// Result of a lookup
#[derive(Debug, PartialEq, Eq)]
pub enum Lookup<'a> {
    Found(&'a InventoryEntry),
    /// Several different objects match a partial name
    Ambiguous(Vec<&'a InventoryEntry>),
    Missing,
}

impl<'a> Lookup<'a> {
    /// The entry, if the lookup found exactly one object
    pub fn found(self) -> Option<&'a InventoryEntry> {
        match self {
            Lookup::Found(entry) => Some(entry),
            _ => None,
        }
    }
}

/// Addressable objects indexed by name and refid
#[derive(Debug, Default, Clone)]
pub struct Inventory {
    entries: Vec<InventoryEntry>,
    by_name: HashMap<String, Vec<usize>>,
    by_refid: HashMap<String, usize>,
}

impl Inventory {
    /// Create an empty inventory
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry; returns `false` when the refid is already known
    pub fn insert(&mut self, entry: InventoryEntry) -> bool {
        if self.by_refid.contains_key(&entry.refid) {
            return false;
        }
        let idx = self.entries.len();
        self.by_refid.insert(entry.refid.clone(), idx);
        self.by_name.entry(entry.name.clone()).or_default().push(idx);
        self.entries.push(entry);
        true
    }

    /// All entries in insertion order
    pub fn entries(&self) -> &[InventoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry with a given refid
    pub fn by_refid(&self, refid: &str) -> Option<&InventoryEntry> {
        self.by_refid.get(refid).map(|&i| &self.entries[i])
    }

    /// Resolve a target for a role
    ///
    /// Tries the exact qualified name, then the refid, then a `::`-suffix
    /// match that must name a single object.
    pub fn lookup(&self, target: &str, role: &str) -> Lookup<'_> {
        let target = normalize_target(target);
        if target.is_empty() {
            return Lookup::Missing;
        }

        if let Some(indices) = self.by_name.get(target) {
            if let Some(&i) = indices.iter().find(|&&i| self.entries[i].accepts(role)) {
                return Lookup::Found(&self.entries[i]);
            }
        }

        if let Some(entry) = self.by_refid(target) {
            if entry.accepts(role) {
                return Lookup::Found(entry);
            }
        }

        let suffix = format!("::{}", target);
        let mut matches: Vec<&InventoryEntry> = Vec::new();
        for entry in &self.entries {
            if entry.name.ends_with(&suffix)
                && entry.accepts(role)
                && !matches.iter().any(|m| m.name == entry.name)
            {
                matches.push(entry);
            }
        }
        match matches.len() {
            0 => Lookup::Missing,
            1 => Lookup::Found(matches[0]),
            _ => Lookup::Ambiguous(matches),
        }
    }

    /// Resolve a target written inside `scope` (a qualified name)
    ///
    /// Enclosing scopes are searched from the innermost outwards before
    /// falling back to [`Inventory::lookup`].
    pub fn lookup_in_scope(&self, target: &str, scope: &str, role: &str) -> Lookup<'_> {
        let normalized = normalize_target(target);
        if !normalized.is_empty() && !target.trim().starts_with("::") {
            let mut scope = scope;
            while !scope.is_empty() {
                let candidate = format!("{}::{}", scope, normalized);
                if let Some(indices) = self.by_name.get(&candidate) {
                    if let Some(&i) = indices.iter().find(|&&i| self.entries[i].accepts(role)) {
                        return Lookup::Found(&self.entries[i]);
                    }
                }
                scope = match scope.rfind("::") {
                    Some(idx) => &scope[..idx],
                    None => "",
                };
            }
        }
        self.lookup(target, role)
    }
}

/// Strip a leading `::` and any argument list
fn normalize_target(target: &str) -> &str {
    let target = target.trim();
    let target = target.strip_prefix("::").unwrap_or(target);
    match target.find('(') {
        Some(idx) if !target.starts_with("operator") => target[..idx].trim_end(),
        _ => target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, kind: &str, refid: &str) -> InventoryEntry {
        InventoryEntry {
            name: name.to_string(),
            kind: kind.to_string(),
            refid: refid.to_string(),
            docname: Some("api/page".to_string()),
            anchor: Some(refid.to_string()),
        }
    }

    fn inventory() -> Inventory {
        let mut inv = Inventory::new();
        inv.insert(entry("mboxid", "namespace", "namespacemboxid"));
        inv.insert(entry(
            "mboxid::modbus_tcp_server",
            "class",
            "classmboxid_1_1modbus__tcp__server",
        ));
        inv.insert(entry(
            "mboxid::modbus_tcp_server::run",
            "function",
            "classmboxid_1_1modbus__tcp__server_1a01",
        ));
        inv.insert(entry(
            "mboxid::modbus_tcp_client::run",
            "function",
            "classmboxid_1_1modbus__tcp__client_1a02",
        ));
        inv.insert(entry("mboxid::errc::none", ENUMERATOR_KIND, "namespacemboxid_1a03"));
        inv
    }

    #[test]
    fn test_exact_then_suffix() {
        let inv = inventory();
        let found = inv.lookup("mboxid::modbus_tcp_server", "class").found().unwrap();
        assert_eq!(found.refid, "classmboxid_1_1modbus__tcp__server");

        let found = inv.lookup("::modbus_tcp_server", "any").found().unwrap();
        assert_eq!(found.name, "mboxid::modbus_tcp_server");

        assert!(matches!(inv.lookup("run()", "func"), Lookup::Ambiguous(ref m) if m.len() == 2));
        assert_eq!(inv.lookup("modbus_tcp_server", "func"), Lookup::Missing);
    }

    #[test]
    fn test_refid_lookup() {
        let inv = inventory();
        let found = inv
            .lookup("classmboxid_1_1modbus__tcp__server_1a01", "any")
            .found()
            .unwrap();
        assert_eq!(found.name, "mboxid::modbus_tcp_server::run");
        assert_eq!(
            found.target().as_deref(),
            Some("api/page#classmboxid_1_1modbus__tcp__server_1a01")
        );
    }

    #[test]
    fn test_scoped_lookup() {
        let inv = inventory();
        let found = inv
            .lookup_in_scope("run", "mboxid::modbus_tcp_client", "any")
            .found()
            .unwrap();
        assert_eq!(found.refid, "classmboxid_1_1modbus__tcp__client_1a02");
    }

    #[test]
    fn test_enumerator_roles() {
        let inv = inventory();
        assert!(inv.lookup("errc::none", "enumerator").found().is_some());
        assert!(inv.lookup("errc::none", "class").found().is_none());
    }

    #[test]
    fn test_duplicate_refid_rejected() {
        let mut inv = inventory();
        assert!(!inv.insert(entry("other", "class", "namespacemboxid")));
        assert_eq!(inv.len(), 5);
    }
}
