//! Build pipeline
//!
//! Runs the extractor, translator and renderer strictly in that order and
//! tracks progress as a [`BuildState`]. Nothing is published until every
//! stage has succeeded: generated pages and rendered targets are staged and
//! only swapped into place at the very end, so a failed build leaves the
//! previous output untouched.

use crate::config::{ProjectPaths, QuireConfig};
use crate::diagnostics::{DiagnosticsCollector, QuireError, QuireResult};
use crate::extractor::{write_symbols, Extractor};
use crate::inventory::Inventory;
use crate::renderer::{Renderer, Theme};
use crate::symbol::SymbolTree;
use crate::translator::{bridge, PageSet, Translator};
use crate::utils::fs::{publish_all, remove_dir_if_exists, StagedDir};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info};

/// Progress of one build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildState {
    NotStarted,
    Extracting,
    Translating,
    Rendering,
    Done,
    Failed,
}

impl BuildState {
    /// `Done` and `Failed` are final
    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildState::Done | BuildState::Failed)
    }

    /// Whether `next` may follow this state
    pub fn can_advance_to(&self, next: BuildState) -> bool {
        use BuildState::*;
        match (self, next) {
            (NotStarted, Extracting)
            | (Extracting, Translating)
            | (Translating, Rendering)
            | (Rendering, Done) => true,
            (state, Failed) => !state.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildState::NotStarted => "not started",
            BuildState::Extracting => "extracting",
            BuildState::Translating => "translating",
            BuildState::Rendering => "rendering",
            BuildState::Done => "done",
            BuildState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Exclusive lock on a build directory, released on drop
#[derive(Debug)]
pub struct BuildLock {
    path: PathBuf,
}

impl BuildLock {
    /// Create the lock file, failing if another build holds it
    pub fn acquire(path: &Path) -> QuireResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| QuireError::not_writable(parent, e))?;
        }
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(QuireError::BuildLocked(path.to_path_buf()))
            }
            Err(e) => return Err(QuireError::not_writable(path, e)),
        };
        writeln!(file, "{}", std::process::id()).map_err(|e| QuireError::io_at(path, e))?;
        debug!("Acquired build lock {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            debug!("Could not remove build lock {}: {}", self.path.display(), e);
        }
    }
}

/// Build settings that do not come from `quire.toml`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Fail before publishing when any warning was reported
    pub warnings_as_errors: bool,
}

/// Result of a successful build
#[derive(Debug)]
pub struct BuildReport {
    pub diagnostics: DiagnosticsCollector,
    /// Documents rendered
    pub documents: usize,
    /// Symbols extracted
    pub symbols: usize,
    /// API pages generated
    pub pages: usize,
    /// Directories swapped into place
    pub published: Vec<PathBuf>,
}

/// Result of `quire extract`
#[derive(Debug)]
pub struct ExtractReport {
    pub symbols_file: PathBuf,
    pub symbols: usize,
    pub headers: usize,
    pub diagnostics: DiagnosticsCollector,
}

/// Output of the extract and translate stages, held until publishing
struct Staged {
    pages: Option<PageSet>,
    containment: Option<StagedDir>,
    bridged: Inventory,
}

/// One documentation build
///
/// A pipeline runs once. After a failure a new pipeline has to be created,
/// it starts again from [`BuildState::NotStarted`].
pub struct Pipeline<'a> {
    config: &'a QuireConfig,
    paths: &'a ProjectPaths,
    options: BuildOptions,
    state: BuildState,
    diagnostics: DiagnosticsCollector,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a QuireConfig, paths: &'a ProjectPaths) -> Self {
        Self {
            config,
            paths,
            options: BuildOptions::default(),
            state: BuildState::NotStarted,
            diagnostics: DiagnosticsCollector::new(),
        }
    }

    /// Set build options
    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Diagnostics reported so far, also after a failure
    pub fn diagnostics(&self) -> &DiagnosticsCollector {
        &self.diagnostics
    }

    fn advance(&mut self, next: BuildState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        info!("Pipeline: {} -> {}", self.state, next);
        self.state = next;
    }

    /// Run every stage and publish the output
    pub fn build(&mut self) -> QuireResult<BuildReport> {
        if self.state != BuildState::NotStarted {
            return Err(QuireError::config(format!(
                "pipeline already ran (state: {}); start a new build",
                self.state
            )));
        }

        let started = Instant::now();
        let _lock = BuildLock::acquire(&self.paths.lock_file)?;

        match self.run() {
            Ok(report) => {
                self.advance(BuildState::Done);
                info!(
                    "Build finished in {:.2}s: {} document(s), {} warning(s)",
                    started.elapsed().as_secs_f64(),
                    report.documents,
                    report.diagnostics.warning_count()
                );
                Ok(report)
            }
            Err(e) => {
                error!("Build failed while {}: {}", self.state, e);
                self.advance(BuildState::Failed);
                Err(e)
            }
        }
    }

    fn run(&mut self) -> QuireResult<BuildReport> {
        let renderer = Renderer::new(self.config, self.paths);
        renderer.preflight()?;

        self.advance(BuildState::Extracting);
        let tree = self.extract_stage()?;
        let symbols = tree.as_ref().map_or(0, SymbolTree::symbol_count);

        self.advance(BuildState::Translating);
        let staged = self.translate_stage(tree)?;
        let pages = staged.pages.as_ref().map_or(0, PageSet::len);

        self.advance(BuildState::Rendering);
        let rendered = renderer.render(staged.pages.as_ref(), &staged.bridged, &mut self.diagnostics)?;
        let documents = rendered.documents;

        let warnings = self.diagnostics.warning_count();
        if self.options.warnings_as_errors && warnings > 0 {
            return Err(QuireError::WarningsAsErrors(warnings));
        }

        let mut stages: Vec<StagedDir> = staged.containment.into_iter().collect();
        stages.extend(rendered.into_stages());
        let published = publish_all(stages)?;
        for path in &published {
            info!("Published {}", path.display());
        }

        Ok(BuildReport {
            diagnostics: self.diagnostics.clone(),
            documents,
            symbols,
            pages,
            published,
        })
    }

    /// `None` when no extension uses extracted symbols
    fn extract_stage(&mut self) -> QuireResult<Option<SymbolTree>> {
        if !self.config.bridges_symbols() {
            info!("No extension uses extracted symbols, skipping extraction");
            return Ok(None);
        }
        let tree = Extractor::new(self.config, self.paths).run(&mut self.diagnostics)?;
        Ok(Some(tree))
    }

    fn translate_stage(&mut self, tree: Option<SymbolTree>) -> QuireResult<Staged> {
        let Some(tree) = tree else {
            return Ok(Staged {
                pages: None,
                containment: None,
                bridged: Inventory::new(),
            });
        };

        if !self.config.generates_api() {
            debug!("API page generation disabled, bridging symbols only");
            return Ok(Staged {
                bridged: bridge(&tree),
                pages: None,
                containment: None,
            });
        }

        let translator = Translator::new(self.config);
        let translation = translator.translate(&tree, &mut self.diagnostics)?;
        let containment = translator.stage(&translation.pages, &self.paths.containment_dir)?;
        info!("Generated {} API page(s)", translation.pages.len());

        Ok(Staged {
            pages: Some(translation.pages),
            containment: Some(containment),
            bridged: translation.inventory,
        })
    }

    /// Run the extractor alone and write the intermediate file
    pub fn extract(&mut self) -> QuireResult<ExtractReport> {
        let _lock = BuildLock::acquire(&self.paths.lock_file)?;
        let tree = Extractor::new(self.config, self.paths).extract(&mut self.diagnostics)?;
        write_symbols(&tree, &self.paths.symbols_file)?;
        info!(
            "Wrote {} symbol(s) to {}",
            tree.symbol_count(),
            self.paths.symbols_file.display()
        );
        Ok(ExtractReport {
            symbols_file: self.paths.symbols_file.clone(),
            symbols: tree.symbol_count(),
            headers: tree.files.len(),
            diagnostics: self.diagnostics.clone(),
        })
    }

    /// Scan the headers without writing anything
    pub fn symbols(&mut self) -> QuireResult<SymbolTree> {
        Extractor::new(self.config, self.paths).extract(&mut self.diagnostics)
    }

    /// Validate configuration and assets without building
    pub fn check(&mut self) -> QuireResult<Theme> {
        let theme = Renderer::new(self.config, self.paths).preflight()?;
        theme.check_options(self.config, &mut self.diagnostics);
        info!("Configuration and assets OK (theme {})", theme.name);
        Ok(theme)
    }

    /// Remove the build directory and the generated API pages
    pub fn clean(&self) -> QuireResult<Vec<PathBuf>> {
        if self.paths.lock_file.exists() {
            return Err(QuireError::BuildLocked(self.paths.lock_file.clone()));
        }
        let mut removed = Vec::new();
        for dir in [&self.paths.build_dir, &self.paths.containment_dir] {
            if dir.exists() {
                remove_dir_if_exists(dir)?;
                info!("Removed {}", dir.display());
                removed.push(dir.clone());
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_state_transitions() {
        use BuildState::*;
        assert!(NotStarted.can_advance_to(Extracting));
        assert!(Rendering.can_advance_to(Done));
        assert!(Translating.can_advance_to(Failed));
        assert!(!NotStarted.can_advance_to(Rendering));
        assert!(!Done.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(Extracting));
        assert_eq!(Extracting.to_string(), "extracting");
    }

    #[test]
    fn test_lock_is_exclusive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("_build").join(".quire.lock");

        let lock = BuildLock::acquire(&path).unwrap();
        assert!(path.is_file());
        match BuildLock::acquire(&path) {
            Err(QuireError::BuildLocked(p)) => assert_eq!(p, path),
            other => panic!("expected BuildLocked, got {:?}", other),
        }

        drop(lock);
        assert!(!path.exists());
        BuildLock::acquire(&path).unwrap();
    }
}
