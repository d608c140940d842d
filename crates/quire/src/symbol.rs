//! Extracted symbol model
//!
//! `SymbolTree` is the extractor's output and the translator's input. It is
//! serialized as JSON to `_extract/symbols.json` between the two stages.

use crate::doc_comment::DocComment;
use crate::utils::slug::{escape_refid, signature_hash};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Format version of the serialized tree
pub const SYMBOL_TREE_VERSION: u32 = 1;

/// Source location of a declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Header path as displayed (strip prefix removed)
    pub file: String,
    /// 1-indexed line number
    pub line: usize,
    /// 1-indexed column number
    pub col: usize,
}

impl Location {
    /// Create a new location
    pub fn new(file: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            file: file.into(),
            line,
            col,
        }
    }
}

impl Ord for Location {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.file.cmp(&other.file) {
            Ordering::Equal => match self.line.cmp(&other.line) {
                Ordering::Equal => self.col.cmp(&other.col),
                ord => ord,
            },
            ord => ord,
        }
    }
}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Kind of a documented symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SymbolKind {
    Namespace,
    Class,
    Struct,
    Union,
    Enum,
    Function,
    Variable,
    Typedef,
    Define,
}

impl SymbolKind {
    /// Get display name for this kind
    pub fn display_name(&self) -> &'static str {
        match self {
            SymbolKind::Namespace => "Namespace",
            SymbolKind::Class => "Class",
            SymbolKind::Struct => "Struct",
            SymbolKind::Union => "Union",
            SymbolKind::Enum => "Enum",
            SymbolKind::Function => "Function",
            SymbolKind::Variable => "Variable",
            SymbolKind::Typedef => "Typedef",
            SymbolKind::Define => "Define",
        }
    }

    /// Prefix used in refids and page ids
    pub fn id_prefix(&self) -> &'static str {
        match self {
            SymbolKind::Namespace => "namespace",
            SymbolKind::Class => "class",
            SymbolKind::Struct => "struct",
            SymbolKind::Union => "union",
            SymbolKind::Enum => "enum",
            SymbolKind::Function => "function",
            SymbolKind::Variable => "variable",
            SymbolKind::Typedef => "typedef",
            SymbolKind::Define => "define",
        }
    }

    /// Inverse of [`SymbolKind::id_prefix`]
    pub fn from_id_prefix(prefix: &str) -> Option<Self> {
        Some(match prefix {
            "namespace" => SymbolKind::Namespace,
            "class" => SymbolKind::Class,
            "struct" => SymbolKind::Struct,
            "union" => SymbolKind::Union,
            "enum" => SymbolKind::Enum,
            "function" => SymbolKind::Function,
            "variable" => SymbolKind::Variable,
            "typedef" => SymbolKind::Typedef,
            "define" => SymbolKind::Define,
            _ => return None,
        })
    }

    /// Whether the symbol is a compound with its own refid scope
    pub fn is_compound(&self) -> bool {
        matches!(
            self,
            SymbolKind::Namespace | SymbolKind::Class | SymbolKind::Struct | SymbolKind::Union
        )
    }

    /// Whether the symbol is a class-like type
    pub fn is_class_like(&self) -> bool {
        matches!(
            self,
            SymbolKind::Class | SymbolKind::Struct | SymbolKind::Union
        )
    }

    /// Roles that may refer to this kind (without domain prefix)
    pub fn role_names(&self) -> &'static [&'static str] {
        match self {
            SymbolKind::Namespace => &["namespace", "any"],
            SymbolKind::Class | SymbolKind::Struct | SymbolKind::Union => {
                &["class", "struct", "union", "type", "any"]
            }
            SymbolKind::Enum => &["enum", "type", "any"],
            SymbolKind::Function => &["func", "function", "any"],
            SymbolKind::Variable => &["var", "member", "data", "any"],
            SymbolKind::Typedef => &["type", "any"],
            SymbolKind::Define => &["macro", "any"],
        }
    }
}

/// Member access level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Access {
    #[default]
    Public,
    Protected,
    Private,
}

impl Access {
    /// Whether members with this access are documented
    pub fn is_documented(&self) -> bool {
        !matches!(self, Access::Private)
    }

    /// Keyword as written in C++
    pub fn keyword(&self) -> &'static str {
        match self {
            Access::Public => "public",
            Access::Protected => "protected",
            Access::Private => "private",
        }
    }
}

/// `class`, `struct` or `union`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClassKey {
    Class,
    Struct,
    Union,
}

impl ClassKey {
    /// Keyword as written in C++
    pub fn keyword(&self) -> &'static str {
        match self {
            ClassKey::Class => "class",
            ClassKey::Struct => "struct",
            ClassKey::Union => "union",
        }
    }

    /// Access of members before the first access specifier
    pub fn default_access(&self) -> Access {
        match self {
            ClassKey::Class => Access::Private,
            ClassKey::Struct | ClassKey::Union => Access::Public,
        }
    }
}

/// Base class specifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseClass {
    pub name: String,
    pub access: Access,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub is_virtual: bool,
}

/// Class, struct or union definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDef {
    pub key: ClassKey,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub bases: Vec<BaseClass>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub template_params: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub is_final: bool,
}

/// Function parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Param {
    /// Parameter type as written
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub default: Option<String>,
}

impl Param {
    /// `type name = default`
    pub fn display(&self) -> String {
        let mut out = self.type_name.clone();
        if let Some(ref name) = self.name {
            out.push(' ');
            out.push_str(name);
        }
        if let Some(ref default) = self.default {
            out.push_str(" = ");
            out.push_str(default);
        }
        out
    }
}

/// Function, method, constructor, destructor or operator
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDef {
    /// Return type; absent for constructors and destructors
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub return_type: Option<String>,
    pub params: Vec<Param>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub template_params: Option<String>,
    /// Leading specifiers: `virtual`, `static`, `inline`, `constexpr`, `explicit`
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub specifiers: Vec<String>,
    /// Trailing qualifiers: `const`, `noexcept`, `override`, `final`, `&`, `&&`
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub qualifiers: Vec<String>,
    /// `= 0`, `= default` or `= delete`
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub assignment: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub is_variadic: bool,
}

impl FunctionDef {
    /// Parameter list as written: `(int a, char const* b)`
    pub fn param_list(&self) -> String {
        let mut parts: Vec<String> = self.params.iter().map(Param::display).collect();
        if self.is_variadic {
            parts.push("...".to_string());
        }
        format!("({})", parts.join(", "))
    }

    /// Parameter types only, used for overload identity
    pub fn type_signature(&self) -> String {
        let mut parts: Vec<&str> = self.params.iter().map(|p| p.type_name.as_str()).collect();
        if self.is_variadic {
            parts.push("...");
        }
        let mut sig = format!("({})", parts.join(","));
        for q in &self.qualifiers {
            sig.push(' ');
            sig.push_str(q);
        }
        sig
    }

    /// Whether this is a pure virtual function
    pub fn is_pure_virtual(&self) -> bool {
        self.assignment.as_deref() == Some("0")
    }
}

/// Variable, constant or data member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDef {
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub initializer: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub specifiers: Vec<String>,
}

/// Enumerator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enumerator {
    pub name: String,
    pub refid: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub initializer: Option<String>,
    #[serde(skip_serializing_if = "DocComment::is_empty", default)]
    pub doc: DocComment,
}

/// Enum definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumDef {
    /// `enum class` / `enum struct`
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub scoped: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub underlying_type: Option<String>,
    pub enumerators: Vec<Enumerator>,
}

/// `typedef` or `using` alias
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedefDef {
    /// Aliased type
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub template_params: Option<String>,
    /// Written as `using X = ...`
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub is_using: bool,
}

/// Preprocessor macro
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefineDef {
    /// Parameters of a function-like macro
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub params: Option<Vec<String>>,
    /// Replacement text
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub value: String,
}

/// Kind-specific definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SymbolDef {
    Namespace,
    #[serde(rename_all = "camelCase")]
    Class { class_def: ClassDef },
    #[serde(rename_all = "camelCase")]
    Enum { enum_def: EnumDef },
    #[serde(rename_all = "camelCase")]
    Function { function_def: FunctionDef },
    #[serde(rename_all = "camelCase")]
    Variable { variable_def: VariableDef },
    #[serde(rename_all = "camelCase")]
    Typedef { typedef_def: TypedefDef },
    #[serde(rename_all = "camelCase")]
    Define { define_def: DefineDef },
}

/// A documented declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    /// Unqualified name
    pub name: String,
    /// Fully qualified name (`mboxid::modbus_tcp_server`)
    pub qualified_name: String,
    /// Stable cross-reference identifier
    pub refid: String,
    /// Declaration site
    pub location: Location,
    /// Access within the enclosing class
    #[serde(default, skip_serializing_if = "is_public")]
    pub access: Access,
    #[serde(skip_serializing_if = "DocComment::is_empty", default)]
    pub doc: DocComment,
    #[serde(flatten)]
    pub def: SymbolDef,
    /// Namespace or class members
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<Symbol>,
}

fn is_public(access: &Access) -> bool {
    *access == Access::Public
}

impl Symbol {
    /// Create a symbol; the refid is derived from the scope and definition
    pub fn new(
        name: impl Into<String>,
        scope: &Scope,
        location: Location,
        doc: DocComment,
        def: SymbolDef,
    ) -> Self {
        let name = name.into();
        let qualified_name = scope.qualify(&name);
        let kind = def_kind(&def);
        let refid = match kind {
            k if k.is_compound() => format!("{}{}", k.id_prefix(), escape_refid(&qualified_name)),
            _ => {
                let signature = match &def {
                    SymbolDef::Function { function_def } => {
                        format!("{}{}", qualified_name, function_def.type_signature())
                    }
                    _ => qualified_name.clone(),
                };
                format!("{}_1a{}", scope.refid, signature_hash(&signature))
            }
        };
        Self {
            name,
            qualified_name,
            refid,
            location,
            access: Access::Public,
            doc,
            def,
            children: Vec::new(),
        }
    }

    /// Set the access level
    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    /// Symbol kind
    pub fn kind(&self) -> SymbolKind {
        def_kind(&self.def)
    }

    /// Class definition, if this is a class-like symbol
    pub fn class_def(&self) -> Option<&ClassDef> {
        match &self.def {
            SymbolDef::Class { class_def } => Some(class_def),
            _ => None,
        }
    }

    /// Function definition, if this is a function
    pub fn function_def(&self) -> Option<&FunctionDef> {
        match &self.def {
            SymbolDef::Function { function_def } => Some(function_def),
            _ => None,
        }
    }

    /// Enum definition, if this is an enum
    pub fn enum_def(&self) -> Option<&EnumDef> {
        match &self.def {
            SymbolDef::Enum { enum_def } => Some(enum_def),
            _ => None,
        }
    }

    /// One-line declaration as it would appear in a header
    pub fn declaration(&self) -> String {
        match &self.def {
            SymbolDef::Namespace => format!("namespace {}", self.qualified_name),
            SymbolDef::Class { class_def } => {
                let mut out = String::new();
                if let Some(ref tp) = class_def.template_params {
                    out.push_str(&format!("template <{}>\n", tp));
                }
                out.push_str(class_def.key.keyword());
                out.push(' ');
                out.push_str(&self.qualified_name);
                if class_def.is_final {
                    out.push_str(" final");
                }
                if !class_def.bases.is_empty() {
                    let bases: Vec<String> = class_def
                        .bases
                        .iter()
                        .map(|b| {
                            let virt = if b.is_virtual { "virtual " } else { "" };
                            format!("{}{} {}", virt, b.access.keyword(), b.name)
                        })
                        .collect();
                    out.push_str(" : ");
                    out.push_str(&bases.join(", "));
                }
                out
            }
            SymbolDef::Enum { enum_def } => {
                let mut out = if enum_def.scoped {
                    format!("enum class {}", self.qualified_name)
                } else {
                    format!("enum {}", self.qualified_name)
                };
                if let Some(ref ty) = enum_def.underlying_type {
                    out.push_str(" : ");
                    out.push_str(ty);
                }
                out
            }
            SymbolDef::Function { function_def } => {
                let mut out = String::new();
                if let Some(ref tp) = function_def.template_params {
                    out.push_str(&format!("template <{}>\n", tp));
                }
                for spec in &function_def.specifiers {
                    out.push_str(spec);
                    out.push(' ');
                }
                if let Some(ref ret) = function_def.return_type {
                    out.push_str(ret);
                    out.push(' ');
                }
                out.push_str(&self.qualified_name);
                out.push_str(&function_def.param_list());
                for q in &function_def.qualifiers {
                    out.push(' ');
                    out.push_str(q);
                }
                if let Some(ref assign) = function_def.assignment {
                    out.push_str(" = ");
                    out.push_str(assign);
                }
                out
            }
            SymbolDef::Variable { variable_def } => {
                let mut out = String::new();
                for spec in &variable_def.specifiers {
                    out.push_str(spec);
                    out.push(' ');
                }
                out.push_str(&variable_def.type_name);
                out.push(' ');
                out.push_str(&self.qualified_name);
                if let Some(ref init) = variable_def.initializer {
                    out.push_str(" = ");
                    out.push_str(init);
                }
                out
            }
            SymbolDef::Typedef { typedef_def } => {
                let mut out = String::new();
                if let Some(ref tp) = typedef_def.template_params {
                    out.push_str(&format!("template <{}>\n", tp));
                }
                if typedef_def.is_using {
                    out.push_str(&format!("using {} = {}", self.qualified_name, typedef_def.target));
                } else {
                    out.push_str(&format!("typedef {} {}", typedef_def.target, self.qualified_name));
                }
                out
            }
            SymbolDef::Define { define_def } => {
                let mut out = format!("#define {}", self.name);
                if let Some(ref params) = define_def.params {
                    out.push_str(&format!("({})", params.join(", ")));
                }
                if !define_def.value.is_empty() {
                    out.push(' ');
                    out.push_str(&define_def.value);
                }
                out
            }
        }
    }

    /// Sort key that keeps overloads in a stable order
    pub fn sort_key(&self) -> (String, SymbolKind, String) {
        let sig = self
            .function_def()
            .map(FunctionDef::type_signature)
            .unwrap_or_default();
        (self.qualified_name.clone(), self.kind(), sig)
    }

    /// Sort children recursively
    pub fn sort(&mut self) {
        self.children.sort_by_key(Symbol::sort_key);
        for child in &mut self.children {
            child.sort();
        }
    }

    /// Visit this symbol and all descendants, depth first
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Symbol)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

fn def_kind(def: &SymbolDef) -> SymbolKind {
    match def {
        SymbolDef::Namespace => SymbolKind::Namespace,
        SymbolDef::Class { class_def } => match class_def.key {
            ClassKey::Class => SymbolKind::Class,
            ClassKey::Struct => SymbolKind::Struct,
            ClassKey::Union => SymbolKind::Union,
        },
        SymbolDef::Enum { .. } => SymbolKind::Enum,
        SymbolDef::Function { .. } => SymbolKind::Function,
        SymbolDef::Variable { .. } => SymbolKind::Variable,
        SymbolDef::Typedef { .. } => SymbolKind::Typedef,
        SymbolDef::Define { .. } => SymbolKind::Define,
    }
}

/// Enclosing scope of a declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    /// Qualified name of the scope; empty for global scope
    pub name: String,
    /// Refid of the scope: a compound refid, or the file refid at global scope
    pub refid: String,
}

impl Scope {
    /// Global scope of a header
    pub fn file(file_refid: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            refid: file_refid.into(),
        }
    }

    /// Qualify a name within this scope
    pub fn qualify(&self, name: &str) -> String {
        if self.name.is_empty() {
            name.to_string()
        } else {
            format!("{}::{}", self.name, name)
        }
    }

    /// Scope of a compound symbol, for its members
    pub fn of(symbol: &Symbol) -> Self {
        Self {
            name: symbol.qualified_name.clone(),
            refid: symbol.refid.clone(),
        }
    }

    /// Whether this is the global scope
    pub fn is_global(&self) -> bool {
        self.name.is_empty()
    }
}

/// A scanned header file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderFile {
    /// Display path (strip prefix removed, `/` separated)
    pub path: String,
    /// File refid (`error_8hpp`)
    pub refid: String,
    /// `#include` directives, as written
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub includes: Vec<String>,
    /// `@file` documentation
    #[serde(skip_serializing_if = "DocComment::is_empty", default)]
    pub doc: DocComment,
}

impl HeaderFile {
    /// Create a header entry for a display path
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            refid: escape_refid(&path),
            path,
            includes: Vec::new(),
            doc: DocComment::default(),
        }
    }

    /// File name without directories
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Everything the extractor found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolTree {
    /// Format version
    pub version: u32,
    /// Project name
    pub project: String,
    /// Scanned headers, sorted by path
    pub files: Vec<HeaderFile>,
    /// Global-scope symbols (namespaces, globals, macros), sorted
    pub symbols: Vec<Symbol>,
}

impl SymbolTree {
    /// Create an empty tree
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            version: SYMBOL_TREE_VERSION,
            project: project.into(),
            files: Vec::new(),
            symbols: Vec::new(),
        }
    }

    /// Put files and symbols into canonical order
    pub fn sort(&mut self) {
        self.files.sort_by(|a, b| a.path.cmp(&b.path));
        self.symbols.sort_by_key(Symbol::sort_key);
        for symbol in &mut self.symbols {
            symbol.sort();
        }
    }

    /// Visit every symbol depth first
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Symbol)) {
        for symbol in &self.symbols {
            symbol.walk(visit);
        }
    }

    /// Total number of symbols
    pub fn symbol_count(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_| count += 1);
        count
    }

    /// Find a symbol by qualified name
    pub fn find(&self, qualified_name: &str) -> Option<&Symbol> {
        let mut found = None;
        self.walk(&mut |s| {
            if found.is_none() && s.qualified_name == qualified_name {
                found = Some(s);
            }
        });
        found
    }

    /// Merge namespaces with the same qualified name
    ///
    /// A namespace reopened in several headers becomes one symbol whose
    /// children are the union of all blocks. Its location is the first one
    /// in path order.
    pub fn merge_namespaces(&mut self) {
        self.symbols = merge_level(std::mem::take(&mut self.symbols));
    }
}

fn merge_level(symbols: Vec<Symbol>) -> Vec<Symbol> {
    let mut merged: Vec<Symbol> = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        if symbol.kind() == SymbolKind::Namespace {
            if let Some(existing) = merged
                .iter_mut()
                .find(|s| s.kind() == SymbolKind::Namespace && s.refid == symbol.refid)
            {
                if symbol.location < existing.location {
                    existing.location = symbol.location.clone();
                }
                if existing.doc.is_empty() {
                    existing.doc = symbol.doc.clone();
                }
                existing.children.extend(symbol.children);
                continue;
            }
        }
        merged.push(symbol);
    }
    for symbol in &mut merged {
        if symbol.kind() == SymbolKind::Namespace {
            symbol.children = merge_level(std::mem::take(&mut symbol.children));
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn namespace(name: &str, scope: &Scope, file: &str) -> Symbol {
        Symbol::new(
            name,
            scope,
            Location::new(file, 1, 1),
            DocComment::default(),
            SymbolDef::Namespace,
        )
    }

    #[test]
    fn test_compound_refids() {
        let global = Scope::file("error_8hpp");
        let ns = namespace("mboxid", &global, "error.hpp");
        assert_eq!(ns.refid, "namespacemboxid");
        assert_eq!(ns.qualified_name, "mboxid");

        let class = Symbol::new(
            "modbus_tcp_server",
            &Scope::of(&ns),
            Location::new("modbus_tcp_server.hpp", 10, 1),
            DocComment::default(),
            SymbolDef::Class {
                class_def: ClassDef {
                    key: ClassKey::Class,
                    bases: vec![],
                    template_params: None,
                    is_final: false,
                },
            },
        );
        assert_eq!(class.refid, "classmboxid_1_1modbus__tcp__server");
        assert_eq!(class.kind(), SymbolKind::Class);
    }

    #[test]
    fn test_overloads_get_distinct_refids() {
        let scope = Scope {
            name: "mboxid".to_string(),
            refid: "namespacemboxid".to_string(),
        };
        let make = |ty: &str| {
            Symbol::new(
                "make_error_code",
                &scope,
                Location::new("error.hpp", 5, 1),
                DocComment::default(),
                SymbolDef::Function {
                    function_def: FunctionDef {
                        return_type: Some("std::error_code".to_string()),
                        params: vec![Param {
                            type_name: ty.to_string(),
                            name: Some("e".to_string()),
                            default: None,
                        }],
                        ..Default::default()
                    },
                },
            )
        };
        let a = make("errc");
        let b = make("int");
        assert!(a.refid.starts_with("namespacemboxid_1a"));
        assert_ne!(a.refid, b.refid);
        assert_eq!(a.refid, make("errc").refid);
        assert_eq!(
            a.declaration(),
            "std::error_code mboxid::make_error_code(errc e)"
        );
    }

    #[test]
    fn test_merge_namespaces() {
        let mut tree = SymbolTree::new("demo");
        let global = Scope::file("b_8hpp");
        let mut first = namespace("mboxid", &global, "b.hpp");
        first.children.push(namespace("detail", &Scope::of(&first), "b.hpp"));
        let mut second = namespace("mboxid", &Scope::file("a_8hpp"), "a.hpp");
        second
            .children
            .push(namespace("detail", &Scope::of(&second), "a.hpp"));
        tree.symbols = vec![first, second];

        tree.merge_namespaces();
        assert_eq!(tree.symbols.len(), 1);
        assert_eq!(tree.symbols[0].location.file, "a.hpp");
        assert_eq!(tree.symbols[0].children.len(), 1);
        assert!(tree.find("mboxid::detail").is_some());
    }

    #[test]
    fn test_header_file() {
        let file = HeaderFile::new("mboxid/error.hpp");
        assert_eq!(file.refid, "mboxid_2error_8hpp");
        assert_eq!(file.file_name(), "error.hpp");
    }
}
