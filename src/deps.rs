//! File-to-file dependency tracking for incremental rebuilds.
//!
//! The graph is one bidirectional relation stored as two maps —
//! `depends_on: file → set<file>` and `dependents: file → set<file>` —
//! kept in sync as a pair: every edge insertion and removal updates both
//! sides. When a source file changes, [`DependencyGraph::get_dependent_pages`]
//! answers "which pages must rebuild".
//!
//! ## Lifecycle
//!
//! A page's dependency set is fully replaced each time the page is
//! (re)tracked: the new set is computed first, then the old edges are
//! removed and the new ones added. Stale edges never accumulate, and the
//! replacement is all-or-nothing — an abandoned rebuild pass can simply
//! not call [`DependencyGraph::track_page_dependencies`] and the graph
//! stays consistent. [`DependencyGraph::remove_page`] cuts a file out of
//! both maps entirely (file deletion).
//!
//! A file's presence as a graph key is independent of whether it exists on
//! disk; deleted files may still be depended upon until explicitly removed.
//!
//! ## Cycles
//!
//! Dependency chains may be circular (fragment A includes B includes A).
//! Tracking records one hop per call, so cycles are fine at the graph
//! level and tracking never recurses. Runaway recursion is the
//! include-expansion step's problem ([`crate::include`]), which fails with
//! the full cycle chain.
//!
//! ## Concurrency
//!
//! The graph is plain mutable state. Callers that can observe concurrent
//! file events (the watch loop) must serialize writes — one rebuild pass
//! owns the graph for its duration, and impact reads happen after the
//! previous pass's writes. Wrap the graph in a `Mutex` at that boundary;
//! this module stays lock-free so single-threaded builds pay nothing.

use crate::attrs::LAYOUT_ATTR;
use crate::include::parse_include_directive;
use crate::markup::Document;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// File extensions considered page sources by [`DependencyGraph::track_tree`].
const PAGE_EXTENSIONS: &[&str] = &["html", "htm"];

/// Directory under the source root where short-name layout pointers
/// resolve (`data-unify="base"` → `layouts/base.html`).
const DEFAULT_LAYOUTS_DIR: &str = "layouts";

/// Bidirectional file dependency graph.
#[derive(Debug)]
pub struct DependencyGraph {
    depends_on: HashMap<PathBuf, HashSet<PathBuf>>,
    dependents: HashMap<PathBuf, HashSet<PathBuf>>,
    layouts_dir: String,
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            depends_on: HashMap::new(),
            dependents: HashMap::new(),
            layouts_dir: DEFAULT_LAYOUTS_DIR.to_string(),
        }
    }

    /// Override the directory short-name layout pointers resolve under.
    pub fn with_layouts_dir(mut self, dir: impl Into<String>) -> Self {
        self.layouts_dir = dir.into();
        self
    }

    /// Parse `content` for dependency references and replace `path`'s
    /// entire dependency set with the freshly discovered one.
    ///
    /// References recognized: the explicit layout pointer (`data-unify` on
    /// a root or `body` element), SSI-style include directives, and asset
    /// URLs (stylesheet links, script sources, images). Each is resolved
    /// under `source_root`; self-references and references escaping the
    /// root are treated as absent, not fatal.
    pub fn track_page_dependencies(&mut self, path: &Path, content: &str, source_root: &Path) {
        let new_deps = extract_dependencies(path, content, source_root, &self.layouts_dir);

        // Compute-then-swap keeps the replacement all-or-nothing.
        self.clear_dependencies(path);
        for dep in new_deps {
            self.dependents
                .entry(dep.clone())
                .or_default()
                .insert(path.to_path_buf());
            self.depends_on
                .entry(path.to_path_buf())
                .or_default()
                .insert(dep);
        }
    }

    /// Files that directly depend on `path` — the rebuild set when `path`
    /// changes. Sorted for deterministic output.
    pub fn get_dependent_pages(&self, path: &Path) -> Vec<PathBuf> {
        let mut pages: Vec<PathBuf> = self
            .dependents
            .get(path)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        pages.sort();
        pages
    }

    /// Files `path` directly depends on. Sorted for deterministic output.
    pub fn get_dependencies(&self, path: &Path) -> Vec<PathBuf> {
        let mut deps: Vec<PathBuf> = self
            .depends_on
            .get(path)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        deps.sort();
        deps
    }

    /// Remove `path` as both a dependency source and a dependency target.
    pub fn remove_page(&mut self, path: &Path) {
        self.clear_dependencies(path);
        if let Some(pages) = self.dependents.remove(path) {
            for page in pages {
                if let Some(deps) = self.depends_on.get_mut(&page) {
                    deps.remove(path);
                    if deps.is_empty() {
                        self.depends_on.remove(&page);
                    }
                }
            }
        }
    }

    /// Track every page file under `source_root` in one pass. Returns the
    /// number of files tracked. Used to prime the graph before watching.
    pub fn track_tree(&mut self, source_root: &Path) -> io::Result<usize> {
        let mut tracked = 0;
        for entry in WalkDir::new(source_root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let is_page = entry
                .path()
                .extension()
                .map(|e| PAGE_EXTENSIONS.iter().any(|p| e.eq_ignore_ascii_case(p)))
                .unwrap_or(false);
            if !is_page {
                continue;
            }
            let content = fs::read_to_string(entry.path())?;
            self.track_page_dependencies(entry.path(), &content, source_root);
            tracked += 1;
        }
        Ok(tracked)
    }

    /// Counts for observability.
    pub fn stats(&self) -> DependencyStats {
        DependencyStats {
            pages: self.depends_on.len(),
            targets: self.dependents.len(),
            edges: self.depends_on.values().map(HashSet::len).sum(),
        }
    }

    /// Remove all outgoing edges of `path`, updating both maps.
    fn clear_dependencies(&mut self, path: &Path) {
        if let Some(old) = self.depends_on.remove(path) {
            for dep in old {
                if let Some(set) = self.dependents.get_mut(&dep) {
                    set.remove(path);
                    if set.is_empty() {
                        self.dependents.remove(&dep);
                    }
                }
            }
        }
    }
}

/// Graph size counters returned by [`DependencyGraph::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DependencyStats {
    /// Files with at least one outgoing edge.
    pub pages: usize,
    /// Files that at least one page depends on.
    pub targets: usize,
    /// Total directed edges.
    pub edges: usize,
}

impl fmt::Display for DependencyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pages, {} edges, {} targets",
            self.pages, self.edges, self.targets
        )
    }
}

/// Discover every dependency reference in `content`, resolved to absolute
/// paths under `source_root`.
fn extract_dependencies(
    path: &Path,
    content: &str,
    source_root: &Path,
    layouts_dir: &str,
) -> HashSet<PathBuf> {
    let doc = Document::parse(content);
    let mut deps = HashSet::new();
    let mut add = |reference: &str| {
        if let Some(resolved) = resolve_reference(reference, path, source_root) {
            deps.insert(resolved);
        }
    };

    // Explicit layout pointer on a root or body element. A bare short name
    // resolves under the layouts directory.
    if let Some(pointer) = layout_pointer(&doc) {
        if is_short_name(&pointer) {
            add(&format!("/{layouts_dir}/{pointer}.html"));
        } else {
            add(&pointer);
        }
    }

    // Include directives live in comments.
    for comment in doc.comments() {
        if let Some(target) = parse_include_directive(&comment.text) {
            add(&target);
        }
    }

    // Asset references: stylesheets, scripts, images.
    for &id in doc.by_tag("link") {
        let el = doc.get(id);
        let is_stylesheet = el
            .attr("rel")
            .map(|rel| rel.split_whitespace().any(|r| r == "stylesheet"))
            .unwrap_or(false);
        if is_stylesheet && let Some(href) = el.attr("href") {
            add(href);
        }
    }
    for &id in doc.by_tag("script") {
        if let Some(src) = doc.get(id).attr("src") {
            add(src);
        }
    }
    for &id in doc.by_tag("img") {
        if let Some(src) = doc.get(id).attr("src") {
            add(src);
        }
    }

    deps
}

/// A layout pointer with no path separator or extension, e.g.
/// `data-unify="base"`.
pub(crate) fn is_short_name(pointer: &str) -> bool {
    !pointer.contains('/') && !pointer.contains('.')
}

/// The `data-unify` layout pointer, taken from a root element or `<body>`.
pub(crate) fn layout_pointer(doc: &Document) -> Option<String> {
    doc.roots()
        .iter()
        .chain(doc.by_tag("body"))
        .find_map(|&id| doc.get(id).attr(LAYOUT_ATTR))
        .map(str::to_string)
}

/// Resolve a reference string to an absolute path under `source_root`.
///
/// Path-rooted references (`/css/site.css`) resolve from the root; others
/// resolve relative to the referencing file's directory. Returns `None`
/// for external URLs, fragments, self-references, and anything escaping
/// the root.
pub fn resolve_reference(reference: &str, referrer: &Path, source_root: &Path) -> Option<PathBuf> {
    let resolved = resolve_path(reference, referrer, source_root)?;
    if resolved == referrer {
        // A file depending on itself is not an edge.
        return None;
    }
    Some(resolved)
}

/// [`resolve_reference`] without the self-reference rejection. Include
/// expansion needs a self-include to resolve so the cycle check can report
/// it as circular rather than leaving the directive in place.
pub(crate) fn resolve_path(
    reference: &str,
    referrer: &Path,
    source_root: &Path,
) -> Option<PathBuf> {
    let reference = reference.trim();
    if reference.is_empty() || is_external(reference) {
        return None;
    }
    // Strip query string / fragment.
    let reference = reference
        .split(['?', '#'])
        .next()
        .filter(|r| !r.is_empty())?;

    let candidate = if let Some(rooted) = reference.strip_prefix('/') {
        source_root.join(rooted)
    } else {
        referrer.parent().unwrap_or(source_root).join(reference)
    };

    let normalized = normalize(&candidate);
    if !normalized.starts_with(source_root) {
        return None;
    }
    Some(normalized)
}

fn is_external(reference: &str) -> bool {
    reference.contains("://")
        || reference.starts_with("//")
        || reference.starts_with('#')
        || reference.starts_with("data:")
        || reference.starts_with("mailto:")
}

/// Logical path normalization (no filesystem access): resolves `.` and
/// `..` components. A `..` that climbs past the path start is preserved so
/// the root containment check fails naturally.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}
