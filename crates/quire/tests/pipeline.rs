//! End-to-end builds of a small C++ library

use pretty_assertions::assert_eq;
use quire::diagnostics::codes;
use quire::{
    BuildLock, BuildOptions, BuildState, DiagnosticSeverity, Extractor, Pipeline, ProjectPaths,
    QuireConfig, QuireError, Translator,
};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

const CONFIG: &str = r#"
[project]
name = "libmboxid"
copyright = "2024, Franz Hollerer"
author = "Franz Hollerer"
release = "0.1.0"

[general]
extensions = ["bridge", "api-tree"]

[api]
strip_from_path = "../include"
input = ["../include/mboxid"]

[html]
theme = "alabaster"
logo = "mboxid_logo.svg"
"#;

const ERROR_HPP: &str = r#"
namespace mboxid {

/// Error codes reported by the library.
enum class errc {
    none,    ///< No error.
    timeout, ///< Timed out.
};

/// Return the library version.
const char* version();

} // namespace mboxid
"#;

const SERVER_HPP: &str = r#"
namespace mboxid {

/**
 * @brief Modbus TCP server.
 *
 * Serves holding registers to any number of clients.
 */
class modbus_tcp_server {
public:
    /// Create a server.
    modbus_tcp_server();

    /**
     * Start serving.
     * @param port TCP port to listen on.
     * @return true on success.
     */
    bool run(int port);

private:
    int fd;
};

} // namespace mboxid
"#;

const INDEX_MD: &str = r#"# libmboxid

A Modbus library. Start with {cpp:class}`mboxid::modbus_tcp_server`
or the missing {cpp:func}`mboxid::no_such_function`.

```{toctree}
:caption: Contents

guide
api/library_root
```
"#;

const GUIDE_MD: &str = r#"# User guide

(building)=
## Building

Call {cpp:func}`run <mboxid::modbus_tcp_server::run>` after construction.

```
mboxid::modbus_tcp_server server;
```
"#;

struct Project {
    _temp: TempDir,
    root: PathBuf,
    config: QuireConfig,
    paths: ProjectPaths,
}

impl Project {
    fn new() -> Self {
        Self::with_config(CONFIG)
    }

    fn with_config(config: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let include = temp.path().join("include").join("mboxid");
        fs::create_dir_all(&include).unwrap();
        fs::write(include.join("error.hpp"), ERROR_HPP).unwrap();
        fs::write(include.join("modbus_tcp_server.hpp"), SERVER_HPP).unwrap();

        let root = temp.path().join("docs");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("quire.toml"), config).unwrap();
        fs::write(root.join("index.md"), INDEX_MD).unwrap();
        fs::write(root.join("guide.md"), GUIDE_MD).unwrap();
        fs::write(root.join("mboxid_logo.svg"), "<svg/>").unwrap();

        let config = QuireConfig::load(&root).unwrap();
        let paths = ProjectPaths::new(&root, &config);
        Self {
            _temp: temp,
            root,
            config,
            paths,
        }
    }

    fn header(&self, name: &str) -> PathBuf {
        self.root.join("../include/mboxid").join(name)
    }

    fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::new(&self.config, &self.paths)
    }
}

/// Every file under `dir`, keyed by relative path
fn snapshot(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(dir).unwrap().to_string_lossy().replace('\\', "/");
            (rel, fs::read(e.path()).unwrap())
        })
        .collect()
}

#[test]
fn test_clean_build_succeeds() {
    let project = Project::new();
    let mut pipeline = project.pipeline();
    let report = pipeline.build().unwrap();

    assert_eq!(pipeline.state(), BuildState::Done);
    assert!(report.symbols > 0);
    assert!(report.pages > 0);
    assert!(report.documents >= 2 + report.pages);
    assert_eq!(
        report.published,
        vec![project.paths.containment_dir.clone(), project.paths.html_dir.clone()]
    );
    assert!(!project.paths.lock_file.exists());
    assert!(project.paths.symbols_file.is_file());

    let html = &project.paths.html_dir;
    let index = fs::read_to_string(html.join("index.html")).unwrap();
    assert!(index.contains("api/class_mboxid_1_1modbus__tcp__server.html"));
    assert!(index.contains("_static/mboxid_logo.svg"));
    assert!(html.join("api/library_root.html").is_file());
    assert!(html.join("api/class_mboxid_1_1modbus__tcp__server.html").is_file());
    assert!(html.join("searchindex.json").is_file());
    assert!(html.join("objects.json").is_file());

    let guide = fs::read_to_string(html.join("guide.html")).unwrap();
    assert!(guide.contains("id=\"building\""));
    assert!(guide.contains("language-cpp"));

    assert!(project.paths.containment_dir.join("library_root.md").is_file());
}

#[test]
fn test_broken_narrative_reference_is_a_warning() {
    let project = Project::new();
    let report = project.pipeline().build().unwrap();

    let broken: Vec<&str> = report
        .diagnostics
        .warnings()
        .filter(|d| d.code.as_deref() == Some(codes::BROKEN_REF))
        .map(|d| d.message.as_str())
        .collect();
    assert_eq!(broken, vec!["unresolved reference 'mboxid::no_such_function'"]);

    let index = fs::read_to_string(project.paths.html_dir.join("index.html")).unwrap();
    assert!(index.contains("<span class=\"xref unresolved\">mboxid::no_such_function</span>"));
}

#[test]
fn test_rebuild_is_byte_identical() {
    let project = Project::new();
    project.pipeline().build().unwrap();
    let html = snapshot(&project.paths.html_dir);
    let api = snapshot(&project.paths.containment_dir);
    let symbols = fs::read(&project.paths.symbols_file).unwrap();

    project.pipeline().build().unwrap();
    assert_eq!(snapshot(&project.paths.html_dir), html);
    assert_eq!(snapshot(&project.paths.containment_dir), api);
    assert_eq!(fs::read(&project.paths.symbols_file).unwrap(), symbols);
}

#[test]
fn test_generated_tree_is_valid() {
    let project = Project::new();
    let tree = Extractor::new(&project.config, &project.paths)
        .extract(&mut Default::default())
        .unwrap();
    let translation = Translator::new(&project.config)
        .translate(&tree, &mut Default::default())
        .unwrap();
    let pages = &translation.pages;

    let root = pages.root_page().unwrap();
    assert!(root.front.parent.is_none());

    for page in pages.pages.values() {
        for child in &page.front.children {
            let child = pages.get(child).unwrap();
            assert_eq!(child.front.parent.as_deref(), Some(page.id.as_str()));
        }
        if page.id == pages.root {
            continue;
        }

        // Walking up the parents reaches the root without revisiting a page
        let mut seen = HashSet::new();
        let mut current = page;
        while let Some(ref parent) = current.front.parent {
            assert!(seen.insert(current.id.clone()), "cycle through {}", current.id);
            current = pages.get(parent).unwrap();
        }
        assert_eq!(current.id, pages.root);

        let listed_by = pages
            .pages
            .values()
            .filter(|p| p.front.children.contains(&page.id))
            .count();
        assert_eq!(listed_by, 1, "{} has {} parents", page.id, listed_by);
    }
}

#[test]
fn test_syntax_error_leaves_output_unchanged() {
    let project = Project::new();
    project.pipeline().build().unwrap();
    let html = snapshot(&project.paths.html_dir);
    let api = snapshot(&project.paths.containment_dir);

    fs::write(
        project.header("broken.hpp"),
        "namespace mboxid {\nclass broken {\n    void f(;\n",
    )
    .unwrap();

    let mut pipeline = project.pipeline();
    let err = pipeline.build().unwrap_err();
    assert!(matches!(err, QuireError::ParseFailed { .. }), "{}", err);
    assert_eq!(pipeline.state(), BuildState::Failed);
    assert!(pipeline
        .diagnostics()
        .diagnostics()
        .iter()
        .any(|d| d.severity == DiagnosticSeverity::Error
            && d.code.as_deref() == Some(codes::SYNTAX)));

    assert_eq!(snapshot(&project.paths.html_dir), html);
    assert_eq!(snapshot(&project.paths.containment_dir), api);
    assert!(!project.paths.lock_file.exists());
}

#[test]
fn test_syntax_error_on_first_build_writes_nothing() {
    let project = Project::new();
    fs::write(project.header("broken.hpp"), "/** unterminated\nint x;\n").unwrap();

    let err = project.pipeline().build().unwrap_err();
    assert!(matches!(err, QuireError::ParseFailed { .. }));
    assert!(!project.paths.html_dir.exists());
    assert!(!project.paths.containment_dir.exists());
    assert!(!project.paths.symbols_file.exists());
}

#[test]
fn test_missing_logo_fails_before_any_output() {
    let project = Project::new();
    fs::remove_file(project.root.join("mboxid_logo.svg")).unwrap();

    let mut pipeline = project.pipeline();
    let err = pipeline.build().unwrap_err();
    assert!(matches!(err, QuireError::MissingAsset(ref p) if p.ends_with("mboxid_logo.svg")));
    assert_eq!(pipeline.state(), BuildState::Failed);
    assert!(!project.paths.html_dir.exists());
    assert!(!project.paths.containment_dir.exists());
    assert!(!project.paths.symbols_file.exists());
}

#[test]
fn test_warnings_as_errors_blocks_publishing() {
    let project = Project::new();
    let err = project
        .pipeline()
        .with_options(BuildOptions {
            warnings_as_errors: true,
        })
        .build()
        .unwrap_err();
    assert!(matches!(err, QuireError::WarningsAsErrors(n) if n >= 1), "{}", err);
    assert!(!project.paths.html_dir.exists());
    assert!(!project.paths.containment_dir.exists());
}

#[test]
fn test_concurrent_build_is_rejected() {
    let project = Project::new();
    let lock = BuildLock::acquire(&project.paths.lock_file).unwrap();

    let err = project.pipeline().build().unwrap_err();
    assert!(matches!(err, QuireError::BuildLocked(ref p) if p == lock.path()));
    assert!(project.paths.lock_file.exists());

    drop(lock);
    project.pipeline().build().unwrap();
}

#[test]
fn test_latex_target() {
    let config = format!("{}\n[latex]\nenabled = true\nlogo = \"mboxid_logo.png\"\n", CONFIG);
    let project = Project::with_config(&config);
    fs::write(project.root.join("mboxid_logo.png"), "png").unwrap();

    let report = project.pipeline().build().unwrap();
    assert!(report.published.contains(&project.paths.latex_dir));

    let tex = fs::read_to_string(project.paths.latex_dir.join("libmboxid.tex")).unwrap();
    assert!(tex.contains("\\chapter{User guide}"));
    assert!(tex.contains("\\chapter{Library API}"));
    assert!(tex.find("\\chapter{User guide}") < tex.find("\\chapter{Library API}"));
    assert!(project.paths.latex_dir.join("mboxid_logo.png").is_file());
}

#[test]
fn test_manual_extraction() {
    let config = CONFIG.replace("[api]\n", "[api]\nauto_extract = false\n");
    let project = Project::with_config(&config);

    let err = project.pipeline().build().unwrap_err();
    assert!(matches!(err, QuireError::ExtractOutputMissing(_)));

    let report = project.pipeline().extract().unwrap();
    assert_eq!(report.symbols_file, project.paths.symbols_file);
    assert_eq!(report.headers, 2);
    project.pipeline().build().unwrap();
}

#[test]
fn test_clean_removes_derived_output() {
    let project = Project::new();
    project.pipeline().build().unwrap();

    let removed = project.pipeline().clean().unwrap();
    assert_eq!(
        removed,
        vec![project.paths.build_dir.clone(), project.paths.containment_dir.clone()]
    );
    assert!(!project.paths.build_dir.exists());
    assert!(!project.paths.containment_dir.exists());
    assert!(project.root.join("index.md").is_file());
}
