//! Subcommand implementations

use anyhow::{Context as _, Result};
use quire::{
    BuildOptions, DiagnosticsCollector, Pipeline, ProjectPaths, QuireConfig, SymbolPrinter,
};
use std::io::IsTerminal;
use std::path::Path;

/// Loaded configuration shared by every command
pub struct Context {
    pub config: QuireConfig,
    pub paths: ProjectPaths,
    color: bool,
}

impl Context {
    /// Load the configuration for a source directory
    pub fn load(directory: &Path, config_file: Option<&Path>, color: bool) -> Result<Self> {
        let config = match config_file {
            Some(file) => QuireConfig::load_file(file)
                .with_context(|| format!("Failed to load {}", file.display()))?,
            None => QuireConfig::load(directory).with_context(|| {
                format!("Failed to load configuration from {}", directory.display())
            })?,
        };
        let paths = ProjectPaths::new(directory, &config);
        Ok(Self {
            config,
            paths,
            color,
        })
    }

    fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::new(&self.config, &self.paths)
    }

    fn report(&self, diagnostics: &DiagnosticsCollector) {
        diagnostics.print(self.color && stderr_is_terminal());
        diagnostics.print_summary();
    }
}

pub fn stderr_is_terminal() -> bool {
    std::io::stderr().is_terminal()
}

pub fn build(ctx: &Context, warnings_as_errors: bool) -> Result<()> {
    let mut pipeline = ctx.pipeline().with_options(BuildOptions { warnings_as_errors });
    let result = pipeline.build();
    ctx.report(pipeline.diagnostics());
    let report = result.context("Build failed")?;

    println!(
        "Build succeeded: {} document(s), {} API page(s), {} symbol(s)",
        report.documents, report.pages, report.symbols
    );
    for path in &report.published {
        println!("  {}", path.display());
    }
    Ok(())
}

pub fn extract(ctx: &Context) -> Result<()> {
    let mut pipeline = ctx.pipeline();
    let result = pipeline.extract();
    ctx.report(pipeline.diagnostics());
    let report = result.context("Extraction failed")?;

    println!(
        "{} symbol(s) from {} header(s) written to {}",
        report.symbols,
        report.headers,
        report.symbols_file.display()
    );
    Ok(())
}

pub fn tree(ctx: &Context) -> Result<()> {
    let mut pipeline = ctx.pipeline();
    let result = pipeline.symbols();
    ctx.report(pipeline.diagnostics());
    let tree = result.context("Extraction failed")?;

    SymbolPrinter::new(&tree, ctx.color && std::io::stdout().is_terminal())
        .print_to_stdout()
        .context("Failed to write to stdout")?;
    Ok(())
}

pub fn check(ctx: &Context) -> Result<()> {
    let mut pipeline = ctx.pipeline();
    let result = pipeline.check();
    ctx.report(pipeline.diagnostics());
    let theme = result.context("Check failed")?;

    let extensions: Vec<&str> = ctx.config.general.extensions.iter().map(|e| e.id()).collect();
    println!(
        "Configuration OK: project {}, theme {}, extensions [{}]",
        ctx.config.project.name,
        theme.name,
        extensions.join(", ")
    );
    Ok(())
}

pub fn clean(ctx: &Context) -> Result<()> {
    let removed = ctx.pipeline().clean().context("Clean failed")?;
    if removed.is_empty() {
        println!("Nothing to clean");
    }
    for path in removed {
        println!("Removed {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("quire.toml"),
            "[project]\nname = \"demo\"\n\n[general]\nextensions = []\n",
        )
        .unwrap();
        fs::write(temp.path().join("index.md"), "# Demo\n\nHello.\n").unwrap();
        temp
    }

    #[test]
    fn test_build_and_clean() {
        let temp = project();
        let ctx = Context::load(temp.path(), None, false).unwrap();
        build(&ctx, true).unwrap();
        assert!(ctx.paths.html_dir.join("index.html").is_file());

        check(&ctx).unwrap();
        clean(&ctx).unwrap();
        assert!(!ctx.paths.build_dir.exists());
    }

    #[test]
    fn test_missing_config() {
        let temp = TempDir::new().unwrap();
        let err = Context::load(temp.path(), None, false).err().unwrap();
        assert!(format!("{:#}", err).contains("Failed to load configuration"));
    }
}
