//! Resolved filesystem locations and exclude-pattern matching

use super::QuireConfig;
use crate::diagnostics::{QuireError, QuireResult};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};

/// Every location a build reads from or writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    /// Directory holding `quire.toml` and narrative documents
    pub source_root: PathBuf,
    /// Build directory
    pub build_dir: PathBuf,
    /// Published HTML site
    pub html_dir: PathBuf,
    /// Published LaTeX document
    pub latex_dir: PathBuf,
    /// Extractor intermediate directory
    pub extract_dir: PathBuf,
    /// Extractor intermediate file
    pub symbols_file: PathBuf,
    /// Generated API pages
    pub containment_dir: PathBuf,
    /// Build lock
    pub lock_file: PathBuf,
}

impl ProjectPaths {
    /// Resolve all locations for a configuration
    pub fn new(source_root: impl Into<PathBuf>, config: &QuireConfig) -> Self {
        let source_root = source_root.into();
        let build_dir = source_root.join(&config.build.dir);
        let extract_dir = build_dir.join("_extract");
        Self {
            html_dir: build_dir.join("html"),
            latex_dir: build_dir.join("latex"),
            symbols_file: extract_dir.join("symbols.json"),
            extract_dir,
            containment_dir: source_root.join(&config.api.containment_folder),
            lock_file: build_dir.join(".quire.lock"),
            build_dir,
            source_root,
        }
    }

    /// Resolve a path from the configuration against the source root
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.source_root.join(relative)
    }
}

/// Glob matcher for `general.exclude_patterns`
///
/// Patterns are matched against paths relative to the source root. A path is
/// excluded when it or any of its ancestors matches.
#[derive(Debug, Clone)]
pub struct ExcludeMatcher {
    set: GlobSet,
}

impl ExcludeMatcher {
    /// Compile the patterns
    pub fn new(patterns: &[String]) -> QuireResult<Self> {
        let mut builder = GlobSetBuilder::new();
        for pat in patterns {
            // `*` stays within one path component, `**` crosses directories
            let glob = GlobBuilder::new(pat)
                .literal_separator(true)
                .build()
                .map_err(|e| {
                    QuireError::config(format!("invalid exclude pattern '{}': {}", pat, e))
                })?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .map_err(|e| QuireError::config(format!("invalid exclude patterns: {}", e)))?;
        Ok(Self { set })
    }

    /// Check a source-relative path
    pub fn is_excluded(&self, relative: &Path) -> bool {
        let normalized = normalize(relative);
        if normalized.is_empty() {
            return false;
        }
        let mut prefix = String::new();
        for part in normalized.split('/') {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(part);
            if self.set.is_match(&prefix) {
                return true;
            }
        }
        false
    }
}

/// Source-relative path with `/` separators
pub fn normalize(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            std::path::Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(patterns: &[&str]) -> ExcludeMatcher {
        let owned: Vec<String> = patterns.iter().map(|s| s.to_string()).collect();
        ExcludeMatcher::new(&owned).unwrap()
    }

    #[test]
    fn test_directory_pattern_excludes_contents() {
        let m = matcher(&["_build", "Thumbs.db"]);
        assert!(m.is_excluded(Path::new("_build")));
        assert!(m.is_excluded(Path::new("_build/html/index.md")));
        assert!(m.is_excluded(Path::new("Thumbs.db")));
        assert!(!m.is_excluded(Path::new("guide/Thumbs.db")));
        assert!(!m.is_excluded(Path::new("index.md")));
    }

    #[test]
    fn test_star_does_not_cross_directories() {
        let m = matcher(&["drafts/*.md"]);
        assert!(m.is_excluded(Path::new("drafts/a.md")));
        assert!(!m.is_excluded(Path::new("drafts/deep/a.md")));

        let m = matcher(&["**/.DS_Store"]);
        assert!(m.is_excluded(Path::new("a/b/.DS_Store")));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = ExcludeMatcher::new(&["[".to_string()]).unwrap_err();
        assert!(err.to_string().contains("invalid exclude pattern"));
    }

    #[test]
    fn test_project_paths() {
        let config = QuireConfig::default();
        let paths = ProjectPaths::new("/docs", &config);
        assert_eq!(paths.html_dir, PathBuf::from("/docs/_build/html"));
        assert_eq!(
            paths.symbols_file,
            PathBuf::from("/docs/_build/_extract/symbols.json")
        );
        assert_eq!(paths.containment_dir, PathBuf::from("/docs/api"));
    }
}
