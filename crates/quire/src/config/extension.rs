//! Pipeline stage identifiers
//!
//! The `[general].extensions` list decides which optional stages run. Order is
//! the initialisation order and is checked against stage dependencies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An optional pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Extension {
    /// Exposes extracted symbols to cross-reference roles
    Bridge,
    /// Generates the API page set from extracted symbols
    ApiTree,
}

impl Extension {
    /// Identifier used in `quire.toml`
    pub fn id(&self) -> &'static str {
        match self {
            Extension::Bridge => "bridge",
            Extension::ApiTree => "api-tree",
        }
    }

    /// Stages that must be listed before this one
    pub fn requires(&self) -> &'static [Extension] {
        match self {
            Extension::Bridge => &[],
            Extension::ApiTree => &[Extension::Bridge],
        }
    }

    /// All known stages
    pub fn all() -> &'static [Extension] {
        &[Extension::Bridge, Extension::ApiTree]
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Extension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Extension::all()
            .iter()
            .copied()
            .find(|e| e.id() == s)
            .ok_or_else(|| {
                let known: Vec<_> = Extension::all().iter().map(|e| e.id()).collect();
                format!("unknown extension '{}' (known: {})", s, known.join(", "))
            })
    }
}

/// Ordered, duplicate-free set of enabled stages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ExtensionSet {
    enabled: Vec<Extension>,
}

impl ExtensionSet {
    /// Build a set, checking duplicates and initialisation order
    pub fn new(enabled: Vec<Extension>) -> Result<Self, String> {
        for (idx, ext) in enabled.iter().enumerate() {
            if enabled[..idx].contains(ext) {
                return Err(format!("extension '{}' listed more than once", ext));
            }
            for required in ext.requires() {
                if !enabled[..idx].contains(required) {
                    return Err(format!(
                        "extension '{}' requires '{}' to be listed before it",
                        ext, required
                    ));
                }
            }
        }
        Ok(Self { enabled })
    }

    /// Empty set (only narrative documents are rendered)
    pub fn empty() -> Self {
        Self { enabled: vec![] }
    }

    /// Whether a stage is enabled
    pub fn contains(&self, ext: Extension) -> bool {
        self.enabled.contains(&ext)
    }

    /// Stages in initialisation order
    pub fn iter(&self) -> impl Iterator<Item = Extension> + '_ {
        self.enabled.iter().copied()
    }

    /// Number of enabled stages
    pub fn len(&self) -> usize {
        self.enabled.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }
}

impl Default for ExtensionSet {
    fn default() -> Self {
        Self {
            enabled: vec![Extension::Bridge, Extension::ApiTree],
        }
    }
}

impl TryFrom<Vec<String>> for ExtensionSet {
    type Error = String;

    fn try_from(ids: Vec<String>) -> Result<Self, Self::Error> {
        let enabled = ids
            .iter()
            .map(|id| id.parse::<Extension>())
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(enabled)
    }
}

impl From<ExtensionSet> for Vec<String> {
    fn from(set: ExtensionSet) -> Self {
        set.enabled.iter().map(|e| e.id().to_string()).collect()
    }
}
