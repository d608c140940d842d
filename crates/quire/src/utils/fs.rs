//! Filesystem helpers
//!
//! Output trees are assembled in a staging directory next to their final
//! location and renamed into place in one step, so readers never observe a
//! half-written site.

use crate::diagnostics::{QuireError, QuireResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A directory being assembled for a later swap into `target`
#[derive(Debug)]
pub struct StagedDir {
    staging: PathBuf,
    target: PathBuf,
    published: bool,
}

impl StagedDir {
    /// Create an empty staging directory for `target`
    pub fn new(target: impl Into<PathBuf>) -> QuireResult<Self> {
        let target = target.into();
        let staging = sibling(&target, "staging");
        remove_dir_if_exists(&staging)?;
        fs::create_dir_all(&staging).map_err(|e| QuireError::not_writable(&staging, e))?;
        debug!("Staging {} in {}", target.display(), staging.display());
        Ok(Self {
            staging,
            target,
            published: false,
        })
    }

    /// Where files are written before publishing
    pub fn path(&self) -> &Path {
        &self.staging
    }

    /// Final location
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Replace `target` with the staged content
    pub fn publish(self) -> QuireResult<PathBuf> {
        let mut published = publish_all(vec![self])?;
        Ok(published.remove(0))
    }
}

/// Swap several staged directories into place as one unit
///
/// Existing targets are first moved aside, then every stage is renamed into
/// place. If any step fails the targets published so far are removed and
/// the moved-aside trees are restored, so either every target holds its new
/// content or every target holds its previous content.
pub fn publish_all(mut stages: Vec<StagedDir>) -> QuireResult<Vec<PathBuf>> {
    let mut moved_aside: Vec<(PathBuf, PathBuf)> = Vec::new();
    let mut swapped: Vec<PathBuf> = Vec::new();

    let result = (|| -> QuireResult<()> {
        for stage in &stages {
            let previous = sibling(&stage.target, "previous");
            remove_dir_if_exists(&previous)?;
            if stage.target.exists() {
                fs::rename(&stage.target, &previous)
                    .map_err(|e| QuireError::not_writable(&stage.target, e))?;
                moved_aside.push((stage.target.clone(), previous));
            }
        }
        for stage in &stages {
            fs::rename(&stage.staging, &stage.target)
                .map_err(|e| QuireError::not_writable(&stage.target, e))?;
            swapped.push(stage.target.clone());
        }
        Ok(())
    })();

    if let Err(e) = result {
        for target in &swapped {
            if let Err(err) = fs::remove_dir_all(target) {
                warn!("Could not remove partially published {}: {}", target.display(), err);
            }
        }
        for (target, previous) in &moved_aside {
            if let Err(err) = fs::rename(previous, target) {
                warn!(
                    "Could not restore {} from {}: {}",
                    target.display(),
                    previous.display(),
                    err
                );
            }
        }
        return Err(e);
    }

    for (_, previous) in &moved_aside {
        if let Err(e) = fs::remove_dir_all(previous) {
            debug!("Could not remove {}: {}", previous.display(), e);
        }
    }

    let mut published = Vec::with_capacity(stages.len());
    for stage in &mut stages {
        stage.published = true;
        debug!("Published {}", stage.target.display());
        published.push(stage.target.clone());
    }
    Ok(published)
}

impl Drop for StagedDir {
    fn drop(&mut self) {
        if !self.published {
            let _ = fs::remove_dir_all(&self.staging);
        }
    }
}

/// `<parent>/.<name>.<suffix>`
fn sibling(target: &Path, suffix: &str) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!(".{}.{}", name, suffix))
}

/// Write a file, creating parent directories
pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> QuireResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| QuireError::not_writable(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| QuireError::not_writable(path, e))
}

/// Remove a directory tree if it exists
pub fn remove_dir_if_exists(path: &Path) -> QuireResult<()> {
    if path.exists() {
        fs::remove_dir_all(path).map_err(|e| QuireError::io_at(path, e))?;
    }
    Ok(())
}

/// Recursively copy a directory, overwriting existing files
///
/// Symbolic links are not followed, a link to a file is copied as the
/// file it points to and a link to a directory is skipped.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> QuireResult<usize> {
    fs::create_dir_all(dst).map_err(|e| QuireError::not_writable(dst, e))?;
    let mut copied = 0;

    for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            QuireError::io_at(path, e.into())
        })?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let dst_path = dst.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dst_path).map_err(|e| QuireError::not_writable(&dst_path, e))?;
        } else if entry.path().is_file() {
            fs::copy(entry.path(), &dst_path).map_err(|e| QuireError::io_at(entry.path(), e))?;
            copied += 1;
        } else {
            debug!("Skipping {}", entry.path().display());
        }
    }

    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_publish_replaces_target() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("html");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("old.html"), "old").unwrap();

        let staged = StagedDir::new(&target).unwrap();
        write_file(&staged.path().join("sub/index.html"), "new").unwrap();
        staged.publish().unwrap();

        assert!(!target.join("old.html").exists());
        assert_eq!(
            fs::read_to_string(target.join("sub/index.html")).unwrap(),
            "new"
        );
        assert!(!temp.path().join(".html.staging").exists());
        assert!(!temp.path().join(".html.previous").exists());
    }

    #[test]
    fn test_dropped_staging_leaves_target_untouched() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("html");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("index.html"), "published").unwrap();

        {
            let staged = StagedDir::new(&target).unwrap();
            write_file(&staged.path().join("index.html"), "partial").unwrap();
        }

        assert_eq!(
            fs::read_to_string(target.join("index.html")).unwrap(),
            "published"
        );
        assert!(!temp.path().join(".html.staging").exists());
    }

    #[test]
    fn test_copy_dir_recursive() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        write_file(&src.join("a.css"), "a").unwrap();
        write_file(&src.join("img/logo.svg"), "<svg/>").unwrap();

        let dst = temp.path().join("dst");
        assert_eq!(copy_dir_recursive(&src, &dst).unwrap(), 2);
        assert!(dst.join("img/logo.svg").exists());
    }

    #[test]
    fn test_publish_all_restores_on_failure() {
        let temp = TempDir::new().unwrap();
        let html = temp.path().join("html");
        let latex = temp.path().join("latex");
        write_file(&html.join("index.html"), "old html").unwrap();
        write_file(&latex.join("doc.tex"), "old tex").unwrap();

        let html_stage = StagedDir::new(&html).unwrap();
        write_file(&html_stage.path().join("index.html"), "new html").unwrap();
        let latex_stage = StagedDir::new(&latex).unwrap();
        fs::remove_dir_all(latex_stage.path()).unwrap();

        assert!(publish_all(vec![html_stage, latex_stage]).is_err());

        assert_eq!(fs::read_to_string(html.join("index.html")).unwrap(), "old html");
        assert_eq!(fs::read_to_string(latex.join("doc.tex")).unwrap(), "old tex");
        assert!(!temp.path().join(".html.previous").exists());
        assert!(!temp.path().join(".latex.previous").exists());
        assert!(!temp.path().join(".html.staging").exists());
    }

    #[test]
    fn test_publish_all_swaps_every_target() {
        let temp = TempDir::new().unwrap();
        let html = temp.path().join("html");
        write_file(&html.join("index.html"), "old").unwrap();

        let html_stage = StagedDir::new(&html).unwrap();
        write_file(&html_stage.path().join("index.html"), "new").unwrap();
        let api_stage = StagedDir::new(temp.path().join("api")).unwrap();
        write_file(&api_stage.path().join("server.md"), "# server").unwrap();

        let published = publish_all(vec![html_stage, api_stage]).unwrap();
        assert_eq!(published, vec![html.clone(), temp.path().join("api")]);
        assert_eq!(fs::read_to_string(html.join("index.html")).unwrap(), "new");
        assert!(temp.path().join("api/server.md").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_dir_skips_symlink_loop() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        write_file(&src.join("theme.css"), "body {}").unwrap();
        std::os::unix::fs::symlink(&src, src.join("loop")).unwrap();

        let dst = temp.path().join("dst");
        assert_eq!(copy_dir_recursive(&src, &dst).unwrap(), 1);
        assert!(dst.join("theme.css").is_file());
        assert!(!dst.join("loop").exists());
    }
}
