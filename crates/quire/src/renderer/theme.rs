//! HTML themes
//!
//! A theme is a Handlebars `layout.hbs` plus stylesheets. Two themes are
//! built in; others live in `{templates_path}/{theme}/`. A `layout.hbs`
//! directly inside a templates directory overrides the theme's layout.

use crate::config::{ProjectPaths, QuireConfig};
use crate::diagnostics::{codes, Diagnostic, DiagnosticsCollector, QuireError, QuireResult};
use handlebars::Handlebars;
use indexmap::IndexMap;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Layout template name
pub const LAYOUT_TEMPLATE: &str = "layout";

/// Themes shipped with quire
pub const BUILTIN_THEMES: &[&str] = &["alabaster", "basic"];

/// Options understood by the built-in themes, with their defaults
pub const THEME_OPTIONS: &[(&str, &str)] = &[
    ("body_min_width", "450px"),
    ("body_max_width", "800px"),
    ("page_width", "940px"),
    ("sidebar_width", "220px"),
    ("description", ""),
    ("show_powered_by", "true"),
];

const BASIC_LAYOUT: &str = include_str!("../themes/basic/layout.hbs");
const BASIC_CSS: &str = include_str!("../themes/basic/basic.css");
const ALABASTER_LAYOUT: &str = include_str!("../themes/alabaster/layout.hbs");
const ALABASTER_CSS: &str = include_str!("../themes/alabaster/alabaster.css");

/// A stylesheet written to `_static`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stylesheet {
    pub file_name: String,
    pub contents: String,
}

impl Stylesheet {
    fn new(file_name: &str, contents: impl Into<String>) -> Self {
        Self {
            file_name: file_name.to_string(),
            contents: contents.into(),
        }
    }
}

/// A resolved theme
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,
    /// Handlebars source of the page layout
    pub layout: String,
    /// Where the layout came from; `None` for a built-in layout
    pub layout_path: Option<PathBuf>,
    pub stylesheets: Vec<Stylesheet>,
    /// Option values with defaults applied
    pub options: IndexMap<String, String>,
}

impl Theme {
    /// Resolve the configured theme
    pub fn load(config: &QuireConfig, paths: &ProjectPaths) -> QuireResult<Self> {
        let name = config.html.theme.clone();
        let template_dirs: Vec<PathBuf> = config
            .general
            .templates_path
            .iter()
            .map(|dir| paths.resolve(dir))
            .collect();

        let mut theme = match name.as_str() {
            "basic" => Self::builtin(&name, BASIC_LAYOUT, vec![Stylesheet::new("basic.css", BASIC_CSS)]),
            "alabaster" => Self::builtin(
                &name,
                ALABASTER_LAYOUT,
                vec![
                    Stylesheet::new("basic.css", BASIC_CSS),
                    Stylesheet::new("alabaster.css", ALABASTER_CSS),
                ],
            ),
            _ => Self::from_directory(&name, &template_dirs)?,
        };

        if let Some(path) = template_dirs
            .iter()
            .map(|dir| dir.join("layout.hbs"))
            .find(|path| path.is_file())
        {
            debug!("Using layout override {}", path.display());
            theme.layout = fs::read_to_string(&path).map_err(|e| QuireError::io_at(&path, e))?;
            theme.layout_path = Some(path);
        }

        theme.options = THEME_OPTIONS
            .iter()
            .map(|&(key, default)| {
                let value = config
                    .html
                    .option(key)
                    .map(|v| css_length(key, v))
                    .unwrap_or_else(|| default.to_string());
                (key.to_string(), value)
            })
            .collect();

        Ok(theme)
    }

    fn builtin(name: &str, layout: &str, stylesheets: Vec<Stylesheet>) -> Self {
        Self {
            name: name.to_string(),
            layout: layout.to_string(),
            layout_path: None,
            stylesheets,
            options: IndexMap::new(),
        }
    }

    /// Theme provided by `{templates_path}/{name}/`
    fn from_directory(name: &str, template_dirs: &[PathBuf]) -> QuireResult<Self> {
        let Some(dir) = template_dirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|dir| dir.is_dir())
        else {
            return Err(QuireError::UnknownTheme(name.to_string()));
        };

        let layout_path = dir.join("layout.hbs");
        if !layout_path.is_file() {
            return Err(QuireError::MissingTemplate(layout_path.display().to_string()));
        }
        let layout =
            fs::read_to_string(&layout_path).map_err(|e| QuireError::io_at(&layout_path, e))?;

        let mut css_files: Vec<PathBuf> = fs::read_dir(&dir)
            .map_err(|e| QuireError::io_at(&dir, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("css"))
            .collect();
        css_files.sort();

        let mut stylesheets = vec![Stylesheet::new("basic.css", BASIC_CSS)];
        for path in css_files {
            let contents = fs::read_to_string(&path).map_err(|e| QuireError::io_at(&path, e))?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            stylesheets.push(Stylesheet::new(&file_name, contents));
        }

        Ok(Self {
            name: name.to_string(),
            layout,
            layout_path: Some(layout_path),
            stylesheets,
            options: IndexMap::new(),
        })
    }

    /// Compile the layout
    pub fn registry(&self) -> QuireResult<Handlebars<'static>> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars
            .register_template_string(LAYOUT_TEMPLATE, &self.layout)
            .map_err(|e| {
                let source = self
                    .layout_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| format!("{} layout", self.name));
                QuireError::Template(format!("{}: {}", source, e))
            })?;
        Ok(handlebars)
    }

    /// Warn about configured options no theme understands
    pub fn check_options(&self, config: &QuireConfig, diagnostics: &mut DiagnosticsCollector) {
        for key in config.html.theme_options.keys() {
            if !THEME_OPTIONS.iter().any(|&(known, _)| known == key) {
                diagnostics.add(
                    Diagnostic::warning(format!(
                        "unsupported theme option '{}' for theme '{}'",
                        key, self.name
                    ))
                    .with_code(codes::THEME_OPTION),
                );
            }
        }
    }

    /// Whether the footer credits quire
    pub fn show_powered_by(&self) -> bool {
        self.options
            .get("show_powered_by")
            .map_or(true, |v| v != "false")
    }
}

/// Width options given as bare numbers are pixels
fn css_length(key: &str, value: String) -> String {
    if key.ends_with("_width") && value.parse::<f64>().is_ok() {
        format!("{}px", value)
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::fs::write_file;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn setup(toml: &str) -> (TempDir, QuireConfig, ProjectPaths) {
        let temp = TempDir::new().unwrap();
        let config = QuireConfig::parse(toml).unwrap();
        let paths = ProjectPaths::new(temp.path(), &config);
        (temp, config, paths)
    }

    #[test]
    fn test_builtin_theme_with_options() {
        let (_temp, config, paths) = setup(
            "[html]\ntheme = \"alabaster\"\n[html.theme_options]\nbody_min_width = \"50em\"\nbody_max_width = \"none\"\nsidebar_width = 250\nfancy = true\n",
        );
        let theme = Theme::load(&config, &paths).unwrap();
        assert_eq!(theme.options["body_min_width"], "50em");
        assert_eq!(theme.options["body_max_width"], "none");
        assert_eq!(theme.options["sidebar_width"], "250px");
        assert_eq!(theme.stylesheets.len(), 2);
        assert!(theme.show_powered_by());
        theme.registry().unwrap();

        let mut diagnostics = DiagnosticsCollector::new();
        theme.check_options(&config, &mut diagnostics);
        assert_eq!(diagnostics.warning_count(), 1);
        assert!(diagnostics.diagnostics()[0].message.contains("'fancy'"));
    }

    #[test]
    fn test_unknown_theme() {
        let (_temp, config, paths) = setup("[html]\ntheme = \"nope\"\n");
        let err = Theme::load(&config, &paths).unwrap_err();
        assert!(matches!(err, QuireError::UnknownTheme(ref name) if name == "nope"));
    }

    #[test]
    fn test_theme_directory_requires_layout() {
        let (temp, config, paths) = setup("[html]\ntheme = \"corp\"\n");
        write_file(&temp.path().join("_templates/corp/corp.css"), "body {}").unwrap();
        let err = Theme::load(&config, &paths).unwrap_err();
        assert!(matches!(err, QuireError::MissingTemplate(_)));

        write_file(
            &temp.path().join("_templates/corp/layout.hbs"),
            "<html>{{{body}}}</html>",
        )
        .unwrap();
        let theme = Theme::load(&config, &paths).unwrap();
        let names: Vec<&str> = theme.stylesheets.iter().map(|s| s.file_name.as_str()).collect();
        assert_eq!(names, vec!["basic.css", "corp.css"]);
    }

    #[test]
    fn test_layout_override_and_bad_template() {
        let (temp, config, paths) = setup("");
        write_file(&temp.path().join("_templates/layout.hbs"), "{{#if}}").unwrap();
        let theme = Theme::load(&config, &paths).unwrap();
        assert_eq!(theme.name, "alabaster");
        assert!(theme.layout_path.is_some());
        let err = theme.registry().unwrap_err();
        assert!(matches!(err, QuireError::Template(_)));
    }
}
