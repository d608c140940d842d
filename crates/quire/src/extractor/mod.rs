//! Header extractor
//!
//! Scans the configured headers and produces the [`SymbolTree`] the
//! translator works from. Every header is scanned even after a failure so a
//! single run reports all syntax errors; any error fails the stage and no
//! intermediate file is written.

pub mod lexer;
pub mod parser;

pub use lexer::{tokenize, Token, TokenKind};
pub use parser::{parse_header, ParsedHeader};

use crate::config::{paths::normalize, ProjectPaths, QuireConfig};
use crate::diagnostics::{
    codes, Diagnostic, DiagnosticsCollector, QuireError, QuireResult,
};
use crate::symbol::SymbolTree;
use crate::utils::fs::write_file;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// File extensions treated as headers
pub const HEADER_EXTENSIONS: &[&str] = &["h", "hh", "hpp", "hxx", "h++", "inl"];

/// Runs the extractor stage for one project
pub struct Extractor<'a> {
    config: &'a QuireConfig,
    paths: &'a ProjectPaths,
}

impl<'a> Extractor<'a> {
    /// Create an extractor
    pub fn new(config: &'a QuireConfig, paths: &'a ProjectPaths) -> Self {
        Self { config, paths }
    }

    /// Produce the symbol tree
    ///
    /// With `api.auto_extract` the headers are scanned and the tree is
    /// written to the intermediate file; otherwise the file from an
    /// earlier run is read.
    pub fn run(&self, diagnostics: &mut DiagnosticsCollector) -> QuireResult<SymbolTree> {
        if !self.config.api.auto_extract {
            info!(
                "Automatic extraction disabled, reading {}",
                self.paths.symbols_file.display()
            );
            return load_symbols(&self.paths.symbols_file);
        }
        let tree = self.extract(diagnostics)?;
        write_symbols(&tree, &self.paths.symbols_file)?;
        Ok(tree)
    }

    /// Scan every configured header
    pub fn extract(&self, diagnostics: &mut DiagnosticsCollector) -> QuireResult<SymbolTree> {
        let headers = self.find_headers(diagnostics);
        info!("Scanning {} header(s)", headers.len());

        let mut tree = SymbolTree::new(&self.config.project.name);
        let mut seen = BTreeSet::new();
        let mut failures = 0;

        for header in &headers {
            let shown = self.display_path(header);
            if !seen.insert(shown.clone()) {
                diagnostics.add(
                    Diagnostic::warning(format!(
                        "header '{}' is reachable through more than one input; scanned once",
                        shown
                    ))
                    .in_file(header)
                    .with_code(codes::DUPLICATE),
                );
                continue;
            }

            debug!("Scanning {} as {}", header.display(), shown);
            let bytes = fs::read(header).map_err(|e| QuireError::io_at(header, e))?;
            let text = String::from_utf8_lossy(&bytes);

            match scan_header(&text, &shown, header) {
                Ok(parsed) => {
                    tree.files.push(parsed.file);
                    tree.symbols.extend(parsed.symbols);
                }
                Err(errors) => {
                    failures += errors.len();
                    for error in errors {
                        diagnostics.add(syntax_diagnostic(error));
                    }
                }
            }
        }

        if failures > 0 {
            return Err(QuireError::ParseFailed { count: failures });
        }

        tree.merge_namespaces();
        tree.sort();
        info!(
            "Extracted {} symbol(s) from {} header(s)",
            tree.symbol_count(),
            tree.files.len()
        );
        Ok(tree)
    }

    /// Headers listed by `api.input`, expanded and sorted
    pub fn find_headers(&self, diagnostics: &mut DiagnosticsCollector) -> Vec<PathBuf> {
        let mut headers = BTreeSet::new();

        for input in &self.config.api.input {
            let path = clean_path(&self.paths.resolve(input));
            if path.is_file() {
                headers.insert(path);
                continue;
            }
            if !path.is_dir() {
                diagnostics.add(
                    Diagnostic::warning(format!("api.input entry '{}' does not exist", input))
                        .in_file(&path)
                        .with_code(codes::MISSING_PATH),
                );
                continue;
            }
            for entry in WalkDir::new(&path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let file = entry.path();
                if file.is_file() && is_header(file) {
                    headers.insert(file.to_path_buf());
                }
            }
        }

        headers.into_iter().collect()
    }

    /// Path shown in output: relative to `api.strip_from_path`, `/` separated
    pub fn display_path(&self, header: &Path) -> String {
        let header = clean_path(header);
        let mut prefixes = Vec::new();
        if !self.config.api.strip_from_path.is_empty() {
            prefixes.push(clean_path(&self.paths.resolve(&self.config.api.strip_from_path)));
        }
        prefixes.push(clean_path(&self.paths.source_root));

        for prefix in prefixes {
            if let Ok(rel) = header.strip_prefix(&prefix) {
                let rel = normalize(rel);
                if !rel.is_empty() {
                    return rel;
                }
            }
        }
        normalize(&header)
    }
}

/// Tokenize and parse one header
pub fn scan_header(
    text: &str,
    display_path: &str,
    real_path: &Path,
) -> Result<ParsedHeader, Vec<QuireError>> {
    let tokens = tokenize(text, real_path)?;
    parse_header(&tokens, display_path, real_path)
}

/// Whether a path has a header extension
pub fn is_header(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| HEADER_EXTENSIONS.contains(&ext))
}

fn syntax_diagnostic(error: QuireError) -> Diagnostic {
    match error {
        QuireError::Parse {
            file,
            line,
            col,
            message,
        } => Diagnostic::error(message)
            .in_file(file)
            .at(line, col)
            .with_code(codes::SYNTAX),
        other => Diagnostic::error(other.to_string()).with_code(codes::SYNTAX),
    }
}

/// Resolve `.` and `..` without touching the filesystem
fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Write the tree as pretty JSON
///
/// The file is written next to its destination and renamed, so an
/// interrupted write never leaves a truncated tree behind.
pub fn write_symbols(tree: &SymbolTree, path: &Path) -> QuireResult<()> {
    let mut json = serde_json::to_string_pretty(tree)?;
    json.push('\n');
    let tmp = path.with_extension("json.tmp");
    write_file(&tmp, json)?;
    fs::rename(&tmp, path).map_err(|e| QuireError::not_writable(path, e))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Read a tree written by [`write_symbols`]
pub fn load_symbols(path: &Path) -> QuireResult<SymbolTree> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(QuireError::ExtractOutputMissing(path.to_path_buf()))
        }
        Err(e) => return Err(QuireError::io_at(path, e)),
    };
    let tree: SymbolTree = serde_json::from_str(&text)?;
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolKind;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
[project]
name = "libmboxid"

[api]
input = ["../include/mboxid"]
strip_from_path = "../include/mboxid"
"#;

    fn project(files: &[(&str, &str)]) -> (TempDir, QuireConfig, ProjectPaths) {
        let temp = TempDir::new().unwrap();
        let docs = temp.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        for (name, contents) in files {
            write_file(&temp.path().join("include/mboxid").join(name), contents).unwrap();
        }
        let config = QuireConfig::parse(CONFIG).unwrap();
        let paths = ProjectPaths::new(&docs, &config);
        (temp, config, paths)
    }

    #[test]
    fn test_extract_merges_namespaces() {
        let (_temp, config, paths) = project(&[
            (
                "error.hpp",
                "namespace mboxid {\n/// Error codes.\nenum class errc { none };\n}\n",
            ),
            (
                "common.hpp",
                "namespace mboxid {\n/// Unit id.\nusing unit_id = unsigned char;\n}\n",
            ),
            ("notes.txt", "not a header"),
        ]);
        let mut diagnostics = DiagnosticsCollector::new();
        let tree = Extractor::new(&config, &paths)
            .extract(&mut diagnostics)
            .unwrap();

        let files: Vec<&str> = tree.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(files, vec!["common.hpp", "error.hpp"]);
        assert_eq!(tree.files[1].refid, "error_8hpp");

        assert_eq!(tree.symbols.len(), 1);
        let ns = &tree.symbols[0];
        assert_eq!(ns.kind(), SymbolKind::Namespace);
        let children: Vec<&str> = ns.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(children, vec!["errc", "unit_id"]);
        assert!(!diagnostics.has_errors());
    }

    #[test]
    fn test_all_errors_reported() {
        let (_temp, config, paths) = project(&[
            ("a.hpp", "namespace a {\n"),
            ("b.hpp", "int x = \"oops;\n"),
            ("c.hpp", "int ok;\n"),
        ]);
        let mut diagnostics = DiagnosticsCollector::new();
        let err = Extractor::new(&config, &paths)
            .run(&mut diagnostics)
            .unwrap_err();

        assert!(matches!(err, QuireError::ParseFailed { count: 2 }));
        assert_eq!(diagnostics.error_count(), 2);
        assert!(diagnostics
            .diagnostics()
            .iter()
            .all(|d| d.code.as_deref() == Some(codes::SYNTAX)));
        assert!(!paths.symbols_file.exists());
    }

    #[test]
    fn test_run_writes_and_reloads() {
        let (_temp, mut config, paths) = project(&[("server.hpp", "/// Port.\nint port;\n")]);
        let mut diagnostics = DiagnosticsCollector::new();
        let tree = Extractor::new(&config, &paths).run(&mut diagnostics).unwrap();
        assert!(paths.symbols_file.exists());

        config.api.auto_extract = false;
        let reloaded = Extractor::new(&config, &paths).run(&mut diagnostics).unwrap();
        assert_eq!(tree, reloaded);
    }

    #[test]
    fn test_missing_intermediate_file() {
        let (_temp, mut config, paths) = project(&[]);
        config.api.auto_extract = false;
        let mut diagnostics = DiagnosticsCollector::new();
        let err = Extractor::new(&config, &paths)
            .run(&mut diagnostics)
            .unwrap_err();
        assert!(matches!(err, QuireError::ExtractOutputMissing(_)));
    }

    #[test]
    fn test_missing_input_is_warning() {
        let (_temp, mut config, paths) = project(&[]);
        config.api.input = vec!["../nowhere".to_string()];
        let mut diagnostics = DiagnosticsCollector::new();
        let headers = Extractor::new(&config, &paths).find_headers(&mut diagnostics);
        assert!(headers.is_empty());
        assert_eq!(diagnostics.warning_count(), 1);
    }

    #[test]
    fn test_file_comment_documents_header() {
        let text = "/**\n * @file\n * Modbus TCP server API.\n */\n\nnamespace mboxid {\n}\n";
        let parsed = scan_header(text, "server.hpp", Path::new("server.hpp")).unwrap();
        assert_eq!(
            parsed.file.doc.summary().as_deref(),
            Some("Modbus TCP server API.")
        );
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(
            clean_path(Path::new("/p/docs/../include/./mboxid")),
            PathBuf::from("/p/include/mboxid")
        );
        assert_eq!(clean_path(Path::new("../x")), PathBuf::from("../x"));
    }
}
