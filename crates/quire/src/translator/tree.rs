//! Page tree validation
//!
//! The generated pages must form a strict tree under the root page: every
//! other page is listed as a child exactly once, is reachable from the
//! root, and no page is its own ancestor. A violation is an internal error
//! in the translator, so it is fatal.

use super::page::PageSet;
use crate::diagnostics::{QuireError, QuireResult};
use std::collections::{HashMap, HashSet};

/// Validate the parent/child structure of a page set
///
/// With `linked` every non-root page must also record its parent in the
/// front matter; without it no page may carry a parent link.
pub fn validate(set: &PageSet, linked: bool) -> QuireResult<()> {
    let root = set
        .root_page()
        .ok_or_else(|| invariant(format!("root page '{}' is missing", set.root)))?;
    if root.front.parent.is_some() {
        return Err(invariant(format!("root page '{}' has a parent", set.root)));
    }

    let mut parent_of: HashMap<&str, &str> = HashMap::new();
    for page in set.pages.values() {
        for child in &page.front.children {
            if !set.pages.contains_key(child) {
                return Err(invariant(format!(
                    "page '{}' lists unknown child '{}'",
                    page.id, child
                )));
            }
            if child == &set.root {
                return Err(invariant(format!(
                    "root page is listed as a child of '{}'",
                    page.id
                )));
            }
            if let Some(previous) = parent_of.insert(child, &page.id) {
                return Err(invariant(format!(
                    "page '{}' has two parents: '{}' and '{}'",
                    child, previous, page.id
                )));
            }
        }
    }

    for page in set.pages.values() {
        if page.id == set.root {
            continue;
        }
        let Some(&parent) = parent_of.get(page.id.as_str()) else {
            return Err(invariant(format!("page '{}' has no parent", page.id)));
        };
        match (&page.front.parent, linked) {
            (Some(recorded), true) if recorded != parent => {
                return Err(invariant(format!(
                    "page '{}' records parent '{}' but is listed by '{}'",
                    page.id, recorded, parent
                )));
            }
            (None, true) => {
                return Err(invariant(format!(
                    "page '{}' does not record its parent '{}'",
                    page.id, parent
                )));
            }
            (Some(recorded), false) => {
                return Err(invariant(format!(
                    "page '{}' has parent link '{}' although the tree view is disabled",
                    page.id, recorded
                )));
            }
            _ => {}
        }
    }

    // depth-first walk from the root; a back edge is a cycle
    let mut visited = HashSet::new();
    let mut on_path = HashSet::new();

    fn visit<'a>(
        set: &'a PageSet,
        id: &'a str,
        visited: &mut HashSet<&'a str>,
        on_path: &mut HashSet<&'a str>,
    ) -> QuireResult<()> {
        if on_path.contains(id) {
            return Err(invariant(format!("cycle through page '{}'", id)));
        }
        if !visited.insert(id) {
            return Ok(());
        }
        on_path.insert(id);
        if let Some(page) = set.pages.get(id) {
            for child in &page.front.children {
                visit(set, child, visited, on_path)?;
            }
        }
        on_path.remove(id);
        Ok(())
    }

    visit(set, &set.root, &mut visited, &mut on_path)?;

    if visited.len() != set.pages.len() {
        let mut detached: Vec<&str> = set
            .pages
            .keys()
            .map(String::as_str)
            .filter(|id| !visited.contains(id))
            .collect();
        detached.sort_unstable();
        return Err(invariant(format!(
            "pages not reachable from the root (cycle): {}",
            detached.join(", ")
        )));
    }

    Ok(())
}

fn invariant(message: String) -> QuireError {
    QuireError::TreeInvariant(message)
}
