//! Renderer: page documents to an HTML site and an optional LaTeX document
//!
//! Rendering runs in this order:
//!
//! 1. [`Renderer::preflight`] resolves the theme and checks the logos
//! 2. narrative documents are discovered and the generated pages added
//! 3. the document graph is walked from the root document
//! 4. roles are resolved and every reachable document is written
//!
//! Everything is written to staging directories; [`RenderOutput::publish`]
//! swaps them into place.

pub mod document;
pub mod html;
pub mod latex;
pub mod search;
pub mod theme;
pub mod xref;

pub use document::{Document, DocumentGraph, DocumentSet};
pub use theme::Theme;

use crate::config::{ProjectPaths, QuireConfig};
use crate::diagnostics::{DiagnosticsCollector, QuireError, QuireResult};
use crate::inventory::Inventory;
use crate::translator::PageSet;
use crate::utils::fs::{copy_dir_recursive, publish_all, write_file, StagedDir};
use document::{build_graph, discover, headings};
use html::{nav_html, prepare, root_prefix, to_html, toctree_html, NavLink, PageContext, ProjectContext, Target};
use search::{objects_json, SearchIndex};
use std::fs;
use std::path::{Path, PathBuf};
use theme::LAYOUT_TEMPLATE;
use tracing::{debug, info};
use xref::{collect_labels, collect_objects, relative_url, XrefResolver};

/// Staged output of one render
#[derive(Debug)]
pub struct RenderOutput {
    pub html: StagedDir,
    pub latex: Option<StagedDir>,
    /// Number of documents written
    pub documents: usize,
}

impl RenderOutput {
    /// Staged directories, HTML first
    pub fn into_stages(self) -> Vec<StagedDir> {
        let mut stages = vec![self.html];
        stages.extend(self.latex);
        stages
    }

    /// Move every staged target into place
    pub fn publish(self) -> QuireResult<Vec<PathBuf>> {
        publish_all(self.into_stages())
    }
}

/// Renders one project
pub struct Renderer<'a> {
    config: &'a QuireConfig,
    paths: &'a ProjectPaths,
}

impl<'a> Renderer<'a> {
    pub fn new(config: &'a QuireConfig, paths: &'a ProjectPaths) -> Self {
        Self { config, paths }
    }

    /// Checks that must pass before any stage writes output
    ///
    /// Resolves and compiles the theme, and checks that the root document
    /// and every configured logo exist.
    pub fn preflight(&self) -> QuireResult<Theme> {
        let theme = Theme::load(self.config, self.paths)?;
        theme.registry()?;

        let root = self
            .paths
            .source_root
            .join(format!("{}.md", self.config.general.root_doc));
        if !root.is_file() {
            return Err(QuireError::config(format!(
                "root document {} not found",
                root.display()
            )));
        }

        if let Some(ref logo) = self.config.html.logo {
            self.require_asset(logo)?;
        }
        if self.config.latex.enabled {
            match self.config.latex.logo {
                Some(ref logo) => {
                    self.require_asset(logo)?;
                }
                None => {
                    return Err(QuireError::config(
                        "latex.logo must be set when the LaTeX target is enabled",
                    ))
                }
            }
        }

        debug!("Preflight passed (theme {})", theme.name);
        Ok(theme)
    }

    fn require_asset(&self, relative: &str) -> QuireResult<PathBuf> {
        let path = self.paths.resolve(relative);
        if path.is_file() {
            Ok(path)
        } else {
            Err(QuireError::MissingAsset(path))
        }
    }

    /// Render every reachable document into staging directories
    ///
    /// `pages` are the freshly generated API pages, used instead of the
    /// containment folder on disk. `bridged` holds symbols that roles may
    /// name even when no page documents them.
    pub fn render(
        &self,
        pages: Option<&PageSet>,
        bridged: &Inventory,
        diagnostics: &mut DiagnosticsCollector,
    ) -> QuireResult<RenderOutput> {
        let theme = self.preflight()?;
        theme.check_options(self.config, diagnostics);
        let registry = theme.registry()?;

        let mut docs = discover(self.config, self.paths, pages.is_some(), diagnostics)?;
        if let Some(pages) = pages {
            docs.add_pages(pages, &self.config.api.containment_folder);
        }
        info!("Rendering: {} document(s) found", docs.len());

        let graph = build_graph(&docs, &self.config.general.root_doc, diagnostics)?;
        let labels = collect_labels(&docs, &graph, diagnostics);
        let inventory = collect_objects(&docs, &graph, bridged);
        let resolver = XrefResolver::new(&docs, &graph, &labels, &inventory);

        let html_dir = StagedDir::new(&self.paths.html_dir)?;
        let static_dir = html_dir.path().join("_static");
        for sheet in &theme.stylesheets {
            write_file(&static_dir.join(&sheet.file_name), &sheet.contents)?;
        }
        self.copy_static(&static_dir)?;
        let logo = match self.config.html.logo {
            Some(ref logo) => Some(self.copy_asset(logo, &static_dir)?),
            None => None,
        };

        let highlight = &self.config.html.highlight_language;
        let mut latex_body = String::new();

        for docname in &graph.order {
            let Some(doc) = docs.get(docname) else {
                continue;
            };
            let markdown = resolver.rewrite(doc, diagnostics);
            let doc_headings = headings(&doc.body);
            let toctrees: Vec<String> = doc
                .toctrees()
                .iter()
                .map(|tree| toctree_html(tree, docname, &docs, &graph))
                .collect();

            let body = to_html(&prepare(
                &markdown,
                &doc_headings,
                &toctrees,
                highlight,
                Target::Html,
            ));
            let context = self.page_context(doc, body, &theme, &docs, &graph, logo.as_deref());
            let page = registry
                .render(LAYOUT_TEMPLATE, &context)
                .map_err(|e| QuireError::Template(format!("{}: {}", docname, e)))?;
            write_file(&html_dir.path().join(format!("{}.html", docname)), page)?;
            debug!("Rendered {}", docname);

            if self.config.latex.enabled {
                let prepared = prepare(&markdown, &doc_headings, &[], highlight, Target::Latex);
                let depth = graph.ancestors(docname).len();
                latex_body.push_str(&latex::document(&prepared, docname, depth));
                latex_body.push('\n');
            }
        }

        let index = SearchIndex::build(&docs, &graph, &inventory);
        write_file(&html_dir.path().join("searchindex.json"), index.to_json()?)?;
        write_file(&html_dir.path().join("objects.json"), objects_json(&inventory)?)?;

        let latex_dir = if self.config.latex.enabled {
            Some(self.render_latex(&latex_body)?)
        } else {
            None
        };

        info!(
            "Rendered {} document(s), {} object(s)",
            graph.order.len(),
            inventory.len()
        );
        Ok(RenderOutput {
            html: html_dir,
            latex: latex_dir,
            documents: graph.order.len(),
        })
    }

    fn render_latex(&self, body: &str) -> QuireResult<StagedDir> {
        let dir = StagedDir::new(&self.paths.latex_dir)?;
        let logo = match self.config.latex.logo {
            Some(ref logo) => Some(self.copy_asset(logo, dir.path())?),
            None => None,
        };
        let tex = latex::wrap(self.config, logo.as_deref(), body);
        write_file(&dir.path().join(latex::file_name(self.config)), tex)?;
        Ok(dir)
    }

    /// Copy `static_path` directories; later ones override earlier ones
    fn copy_static(&self, static_dir: &Path) -> QuireResult<()> {
        for dir in &self.config.html.static_path {
            let src = self.paths.resolve(dir);
            if !src.is_dir() {
                debug!("Static path {} does not exist, skipping", src.display());
                continue;
            }
            let copied = copy_dir_recursive(&src, static_dir)?;
            debug!("Copied {} static file(s) from {}", copied, src.display());
        }
        Ok(())
    }

    /// Copy an asset into `dir`; returns its file name
    fn copy_asset(&self, relative: &str, dir: &Path) -> QuireResult<String> {
        let src = self.require_asset(relative)?;
        let name = src
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| QuireError::MissingAsset(src.clone()))?;
        fs::create_dir_all(dir).map_err(|e| QuireError::not_writable(dir, e))?;
        fs::copy(&src, dir.join(&name)).map_err(|e| QuireError::io_at(&src, e))?;
        Ok(name)
    }

    fn page_context(
        &self,
        doc: &Document,
        body: String,
        theme: &Theme,
        docs: &DocumentSet,
        graph: &DocumentGraph,
        logo: Option<&str>,
    ) -> PageContext {
        let root = root_prefix(&doc.docname);
        let link = |docname: &str| {
            docs.get(docname).map(|d| NavLink {
                title: d.title.clone(),
                url: relative_url(&doc.docname, docname, None),
            })
        };
        let (prev, next) = graph.neighbours(&doc.docname);
        let breadcrumbs = graph
            .ancestors(&doc.docname)
            .into_iter()
            .skip(1)
            .filter_map(|d| link(d))
            .collect();

        PageContext {
            project: ProjectContext {
                name: self.config.project.name.clone(),
                release: self.config.project.release.clone(),
                author: self.config.project.author.clone(),
            },
            docname: doc.docname.clone(),
            title: doc.title.clone(),
            body,
            stylesheets: theme
                .stylesheets
                .iter()
                .map(|s| format!("{}_static/{}", root, s.file_name))
                .collect(),
            logo: logo.map(|name| format!("{}_static/{}", root, name)),
            nav: nav_html(&doc.docname, docs, graph),
            breadcrumbs,
            prev: prev.and_then(|d| link(d)),
            next: next.and_then(|d| link(d)),
            copyright: self.config.copyright_line(),
            options: theme.options.clone(),
            show_powered_by: theme.show_powered_by(),
            generator: format!("quire {}", crate::VERSION),
            root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
[project]
name = "demo"
copyright = "2024, Demo"

[general]
extensions = []

[html]
logo = "logo.svg"
"#;

    fn project(config: &str) -> (TempDir, QuireConfig, ProjectPaths) {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write_file(
            &root.join("index.md"),
            "# Demo\n\nWelcome. See {doc}`guide`.\n\n```{toctree}\n:caption: Contents\n\nguide\n```\n",
        )
        .unwrap();
        write_file(&root.join("guide.md"), "# Guide\n\n## Build\n\nRun {cpp:func}`missing_fn`.\n").unwrap();
        write_file(&root.join("logo.svg"), "<svg/>").unwrap();
        write_file(&root.join("_static/custom.css"), "body {}").unwrap();
        let config = QuireConfig::parse(config).unwrap();
        let paths = ProjectPaths::new(root, &config);
        (temp, config, paths)
    }

    #[test]
    fn test_render_site() {
        let (_temp, config, paths) = project(CONFIG);
        let renderer = Renderer::new(&config, &paths);
        let mut diagnostics = DiagnosticsCollector::new();
        let output = renderer
            .render(None, &Inventory::new(), &mut diagnostics)
            .unwrap();
        assert_eq!(output.documents, 2);
        assert!(!paths.html_dir.exists());

        let published = output.publish().unwrap();
        assert_eq!(published, vec![paths.html_dir.clone()]);

        let index = fs::read_to_string(paths.html_dir.join("index.html")).unwrap();
        assert!(index.contains("<a href=\"guide.html\">Guide</a>"));
        assert!(index.contains("toctree-wrapper"));
        assert!(index.contains("_static/logo.svg"));
        assert!(index.contains("© 2024, Demo"));

        let guide = fs::read_to_string(paths.html_dir.join("guide.html")).unwrap();
        assert!(guide.contains("id=\"build\""));
        assert!(guide.contains("<span class=\"xref unresolved\">missing_fn</span>"));
        assert!(paths.html_dir.join("_static/alabaster.css").exists());
        assert!(paths.html_dir.join("_static/custom.css").exists());
        assert!(paths.html_dir.join("searchindex.json").exists());

        let warnings: Vec<String> = diagnostics.warnings().map(|d| d.message.clone()).collect();
        assert_eq!(warnings, vec!["unresolved reference 'missing_fn'".to_string()]);
    }

    #[test]
    fn test_preflight_missing_logo() {
        let (temp, config, paths) = project(CONFIG);
        fs::remove_file(temp.path().join("logo.svg")).unwrap();
        let err = Renderer::new(&config, &paths).preflight().unwrap_err();
        assert!(matches!(err, QuireError::MissingAsset(ref p) if p.ends_with("logo.svg")));
    }

    #[test]
    fn test_latex_requires_logo() {
        let config = format!("{}\n[latex]\nenabled = true\n", CONFIG);
        let (temp, config, paths) = project(&config);
        let err = Renderer::new(&config, &paths).preflight().unwrap_err();
        assert!(matches!(err, QuireError::Config(_)));

        write_file(&temp.path().join("print.png"), "png").unwrap();
        let mut config = config;
        config.latex.logo = Some("print.png".to_string());
        let renderer = Renderer::new(&config, &paths);
        let output = renderer
            .render(None, &Inventory::new(), &mut DiagnosticsCollector::new())
            .unwrap();
        output.publish().unwrap();

        let tex = fs::read_to_string(paths.latex_dir.join("demo.tex")).unwrap();
        assert!(tex.contains("\\chapter{Guide}"));
        assert!(tex.contains("{print.png}"));
        assert!(paths.latex_dir.join("print.png").exists());
    }
}
