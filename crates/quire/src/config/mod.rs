//! Build configuration
//!
//! `quire.toml` in the project source root describes one documentation build.
//! It is parsed once when the build starts and is read-only afterwards.
//!
//! ```toml
//! [project]
//! name = "libmboxid"
//! copyright = "2024, Franz Hollerer"
//! author = "Franz Hollerer"
//! release = "0.1.0"
//!
//! [api]
//! strip_from_path = "../include/mboxid"
//! input = ["../include/mboxid"]
//! ```

pub mod extension;
pub mod paths;

pub use extension::{Extension, ExtensionSet};
pub use paths::{ExcludeMatcher, ProjectPaths};

use crate::diagnostics::{QuireError, QuireResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path};

/// Configuration file name looked up in the source root
pub const CONFIG_FILE_NAME: &str = "quire.toml";

/// Complete build configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuireConfig {
    /// Project metadata
    pub project: ProjectMetadata,
    /// Stage selection and source paths
    pub general: GeneralConfig,
    /// API extraction and page generation
    pub api: ExtractionTarget,
    /// HTML output and theme
    pub html: ThemeConfig,
    /// Print output
    pub latex: LatexConfig,
    /// Build directory layout
    pub build: BuildConfig,
}

/// Project metadata shown in page titles and footers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectMetadata {
    /// Project name
    pub name: String,
    /// Copyright holder line
    pub copyright: String,
    /// Author name
    pub author: String,
    /// Release string
    pub release: String,
}

/// `[general]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralConfig {
    /// Enabled pipeline stages, in initialisation order
    pub extensions: ExtensionSet,
    /// Directories searched for template overrides
    pub templates_path: Vec<String>,
    /// Glob patterns excluded from document discovery
    pub exclude_patterns: Vec<String>,
    /// Root document name, without extension
    pub root_doc: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            extensions: ExtensionSet::default(),
            templates_path: vec!["_templates".to_string()],
            exclude_patterns: vec![
                "_build".to_string(),
                "Thumbs.db".to_string(),
                ".DS_Store".to_string(),
            ],
            root_doc: "index".to_string(),
        }
    }
}

/// `[api]` table: where headers come from and where API pages go
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractionTarget {
    /// Folder under the source root that receives generated pages
    pub containment_folder: String,
    /// File name of the generated root page
    pub root_file_name: String,
    /// Prefix removed from displayed header paths
    pub strip_from_path: String,
    /// Title of the generated root page
    pub root_file_title: String,
    /// Whether pages carry parent/child navigation
    pub create_tree_view: bool,
    /// Whether the extractor runs as part of the build
    pub auto_extract: bool,
    /// Header files or directories, relative to the source root
    pub input: Vec<String>,
}

impl Default for ExtractionTarget {
    fn default() -> Self {
        Self {
            containment_folder: "api".to_string(),
            root_file_name: "library_root.md".to_string(),
            strip_from_path: String::new(),
            root_file_title: "Library API".to_string(),
            create_tree_view: true,
            auto_extract: true,
            input: vec![],
        }
    }
}

impl ExtractionTarget {
    /// Document name of the generated root page (`api/library_root`)
    pub fn root_docname(&self) -> String {
        let stem = self
            .root_file_name
            .strip_suffix(".md")
            .unwrap_or(&self.root_file_name);
        format!("{}/{}", self.containment_folder.trim_end_matches('/'), stem)
    }
}

/// `[html]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    /// Theme name
    pub theme: String,
    /// Theme-specific options
    pub theme_options: IndexMap<String, toml::Value>,
    /// Directories copied into `_static`
    pub static_path: Vec<String>,
    /// HTML logo, relative to the source root
    pub logo: Option<String>,
    /// Domain used by roles without a domain prefix
    pub primary_domain: String,
    /// Language for code blocks that do not name one
    pub highlight_language: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            theme: "alabaster".to_string(),
            theme_options: IndexMap::new(),
            static_path: vec!["_static".to_string()],
            logo: None,
            primary_domain: "cpp".to_string(),
            highlight_language: "cpp".to_string(),
        }
    }
}

impl ThemeConfig {
    /// Theme option rendered as a plain string
    pub fn option(&self, key: &str) -> Option<String> {
        self.theme_options.get(key).map(|v| match v {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// `[latex]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LatexConfig {
    /// Whether the LaTeX target is built
    pub enabled: bool,
    /// Print logo, relative to the source root
    pub logo: Option<String>,
}

/// `[build]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Build directory, relative to the source root
    pub dir: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            dir: "_build".to_string(),
        }
    }
}

/// Domains understood by the cross-reference resolver
pub const KNOWN_DOMAINS: &[&str] = &["cpp", "c"];

impl QuireConfig {
    /// Parse configuration from TOML text
    pub fn parse(text: &str) -> QuireResult<Self> {
        toml::from_str(text).map_err(|e| QuireError::config(e.to_string()))
    }

    /// Load `quire.toml` from a source root
    pub fn load(source_root: &Path) -> QuireResult<Self> {
        Self::load_file(&source_root.join(CONFIG_FILE_NAME))
    }

    /// Load a configuration file
    pub fn load_file(path: &Path) -> QuireResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| QuireError::io_at(path, e))?;
        let config = Self::parse(&text)
            .map_err(|e| QuireError::config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde cannot express
    pub fn validate(&self) -> QuireResult<()> {
        if self.project.name.trim().is_empty() {
            return Err(QuireError::config("project.name must not be empty"));
        }

        if !KNOWN_DOMAINS.contains(&self.html.primary_domain.as_str()) {
            return Err(QuireError::config(format!(
                "html.primary_domain '{}' is not one of: {}",
                self.html.primary_domain,
                KNOWN_DOMAINS.join(", ")
            )));
        }

        if self.general.root_doc.trim().is_empty() {
            return Err(QuireError::config("general.root_doc must not be empty"));
        }

        check_relative("api.containment_folder", &self.api.containment_folder)?;
        check_relative("build.dir", &self.build.dir)?;

        if !self.api.root_file_name.ends_with(".md")
            || self.api.root_file_name.contains('/')
            || self.api.root_file_name.contains('\\')
        {
            return Err(QuireError::config(format!(
                "api.root_file_name '{}' must be a plain '.md' file name",
                self.api.root_file_name
            )));
        }

        if self.generates_api() && self.api.auto_extract && self.api.input.is_empty() {
            return Err(QuireError::config(
                "api.input must list at least one header file or directory",
            ));
        }

        let matcher = ExcludeMatcher::new(&self.general.exclude_patterns)?;
        let mut required = vec![
            CONFIG_FILE_NAME.to_string(),
            format!("{}.md", self.general.root_doc),
        ];
        if self.generates_api() {
            required.push(format!("{}.md", self.api.root_docname()));
        }
        for path in required {
            if matcher.is_excluded(Path::new(&path)) {
                return Err(QuireError::config(format!(
                    "general.exclude_patterns excludes required file '{}'",
                    path
                )));
            }
        }

        Ok(())
    }

    /// Whether API pages are generated
    pub fn generates_api(&self) -> bool {
        self.general.extensions.contains(Extension::ApiTree)
    }

    /// Whether extracted symbols are exposed to cross-references
    pub fn bridges_symbols(&self) -> bool {
        self.general.extensions.contains(Extension::Bridge)
    }

    /// Footer line, e.g. `© 2024, Franz Hollerer`
    pub fn copyright_line(&self) -> Option<String> {
        if self.project.copyright.is_empty() {
            None
        } else {
            Some(format!("© {}", self.project.copyright))
        }
    }
}

fn check_relative(key: &str, value: &str) -> QuireResult<()> {
    let path = Path::new(value);
    if value.trim().is_empty() {
        return Err(QuireError::config(format!("{} must not be empty", key)));
    }
    if path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir))
    {
        return Err(QuireError::config(format!(
            "{} '{}' must be a relative path inside the source root",
            key, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FULL: &str = r#"
[project]
name = "libmboxid"
copyright = "2024, Franz Hollerer"
author = "Franz Hollerer"
release = "0.1.0"

[general]
extensions = ["bridge", "api-tree"]
templates_path = ["_templates"]
exclude_patterns = ["_build", "Thumbs.db", ".DS_Store"]

[api]
containment_folder = "api"
root_file_name = "library_root.md"
strip_from_path = "../include/mboxid"
root_file_title = "Library API"
create_tree_view = true
auto_extract = true
input = ["../include/mboxid"]

[html]
theme = "alabaster"
theme_options = { body_min_width = "50em", body_max_width = "none" }
static_path = ["_static"]
logo = "mboxid_logo.svg"
primary_domain = "cpp"
highlight_language = "cpp"

[latex]
logo = "mboxid_logo.png"
"#;

    #[test]
    fn test_parse_full_config() {
        let config = QuireConfig::parse(FULL).unwrap();
        config.validate().unwrap();

        assert_eq!(config.project.name, "libmboxid");
        assert_eq!(config.project.release, "0.1.0");
        assert!(config.generates_api());
        assert_eq!(config.api.root_docname(), "api/library_root");
        assert_eq!(config.html.option("body_min_width").as_deref(), Some("50em"));
        assert_eq!(config.html.logo.as_deref(), Some("mboxid_logo.svg"));
        assert!(!config.latex.enabled);
        assert_eq!(config.build.dir, "_build");
        assert_eq!(
            config.copyright_line().as_deref(),
            Some("© 2024, Franz Hollerer")
        );
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = QuireConfig::parse(
            "[project]\nname = \"demo\"\n[api]\ninput = [\"include\"]\n",
        )
        .unwrap();
        config.validate().unwrap();

        assert_eq!(config.general.root_doc, "index");
        assert_eq!(config.html.theme, "alabaster");
        assert_eq!(config.api.containment_folder, "api");
        assert!(config.api.create_tree_view);
    }

    #[test]
    fn test_unknown_extension_is_config_error() {
        let err = QuireConfig::parse(
            "[project]\nname = \"demo\"\n[general]\nextensions = [\"bridge\", \"magic\"]\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown extension 'magic'"));
    }

    #[test]
    fn test_exclude_must_not_hide_config() {
        let config = QuireConfig::parse(
            "[project]\nname = \"demo\"\n[general]\nextensions = []\nexclude_patterns = [\"*.toml\"]\n",
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("quire.toml"));
    }

    #[test]
    fn test_containment_folder_must_be_relative() {
        let config = QuireConfig::parse(
            "[project]\nname = \"demo\"\n[api]\ninput = [\"inc\"]\ncontainment_folder = \"../api\"\n",
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_domain_rejected() {
        let config = QuireConfig::parse(
            "[project]\nname = \"demo\"\n[general]\nextensions = []\n[html]\nprimary_domain = \"py\"\n",
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_name_rejected() {
        let config = QuireConfig::parse("[general]\nextensions = []\n").unwrap();
        assert!(config.validate().is_err());
    }
}
