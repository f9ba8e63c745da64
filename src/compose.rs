//! The composition pipeline: parse → match → merge → splice.
//!
//! [`Composer::compose`] takes a layout string and a page string and
//! produces the compiled output: matched layout regions are rewritten with
//! merged attributes and the page's content, the `<head>` is replaced with
//! the merged head collection, and surplus page sections are appended
//! after the last matched section. Everything outside the matched spans is
//! the layout's own text, byte for byte — splicing by source span keeps
//! doctype, whitespace, and comments intact.
//!
//! The pipeline is pure computation over in-memory trees: no step
//! suspends, no shared state is touched. Batch composition of independent
//! pages runs the per-page pipeline on a rayon pool
//! ([`compose_all`]), each worker exclusively owning its page's trees.
//!
//! Layout resolution ([`resolve_layout`]) follows the precedence
//! explicit pointer > per-directory default filename > directory climbing
//! toward the source root > none.

use crate::attrs::{LAYER_ATTR, LAYOUT_ATTR, merge_attributes};
use crate::config::{ComposeConfig, ConfigError};
use crate::deps::{self, resolve_reference};
use crate::head::HeadCollection;
use crate::markup::{AttrMap, Document};
use crate::matching::{Match, match_areas};
use crate::types::Warning;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComposeError {
    /// The layout or page failed the matcher's input contract.
    #[error("invalid composition input: {0}")]
    InvalidInput(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Compiled output of one composition run.
#[derive(Debug)]
pub struct Composed {
    pub html: String,
    pub warnings: Vec<Warning>,
}

/// One page's composition work item for [`compose_all`].
#[derive(Debug, Clone)]
pub struct ComposeJob {
    pub page: PathBuf,
    pub layout: PathBuf,
}

/// Runs the composition pipeline with an explicit configuration.
#[derive(Debug, Clone)]
pub struct Composer {
    config: ComposeConfig,
}

impl Composer {
    /// Build a composer, validating the configuration up front.
    pub fn new(config: ComposeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ComposeConfig {
        &self.config
    }

    /// Compose a page against a layout, both given as markup strings.
    pub fn compose(&self, layout_html: &str, page_html: &str) -> Result<Composed, ComposeError> {
        let layout = Document::parse(layout_html);
        let page = Document::parse(page_html);

        let outcome = match_areas(&layout, &page, &self.config.area_prefix);
        if !outcome.errors.is_empty() {
            return Err(ComposeError::InvalidInput(outcome.errors.join("; ")));
        }

        // Each edit is a source span of the layout plus its replacement
        // text; zero-width spans are insertions.
        let mut edits: Vec<(Range<usize>, String)> = Vec::new();

        if let Some(&head_id) = layout.by_tag("head").first() {
            let merged = HeadCollection::merge(
                &HeadCollection::extract(&layout),
                &HeadCollection::extract(&page),
            );
            edits.push((layout.inner_span(head_id), format!("\n{}\n", merged.to_html())));
        }

        for m in &outcome.matches {
            let layout_id = m.layout_node();
            let layout_el = layout.get(layout_id);
            let attrs = match m.primary_page_node() {
                Some(page_id) => merge_attributes(layout_el, page.get(page_id)),
                None => strip_control_attrs(&layout_el.attrs),
            };
            let html = format!(
                "<{tag}{attrs}>{content}</{tag}>",
                tag = layout_el.tag,
                attrs = attrs.to_html(),
                content = m.content()
            );
            edits.push((layout.span(layout_id), html));
        }

        if !outcome.appended.is_empty()
            && let Some(at) = append_offset(&layout, &outcome.matches)
        {
            let mut extra = String::new();
            for appended in &outcome.appended {
                let el = page.get(appended.page);
                extra.push_str(&format!(
                    "\n<{tag}{attrs}>{content}</{tag}>",
                    tag = el.tag,
                    attrs = strip_control_attrs(&el.attrs).to_html(),
                    content = appended.content
                ));
            }
            edits.push((at..at, extra));
        }

        Ok(Composed {
            html: splice(layout.source(), edits),
            warnings: outcome.warnings,
        })
    }

    /// Compose from files on disk.
    pub fn compose_files(&self, layout: &Path, page: &Path) -> Result<Composed, ComposeError> {
        let read = |path: &Path| {
            fs::read_to_string(path).map_err(|source| ComposeError::Io {
                path: path.to_path_buf(),
                source,
            })
        };
        self.compose(&read(layout)?, &read(page)?)
    }
}

/// Compose many independent pages in parallel. Each worker owns its page's
/// trees exclusively; results come back in job order.
pub fn compose_all(
    jobs: &[ComposeJob],
    config: &ComposeConfig,
) -> Result<Vec<(PathBuf, Result<Composed, ComposeError>)>, ConfigError> {
    let composer = Composer::new(config.clone())?;
    Ok(jobs
        .par_iter()
        .map(|job| {
            (
                job.page.clone(),
                composer.compose_files(&job.layout, &job.page),
            )
        })
        .collect())
}

/// Resolve the layout a page composes against.
///
/// Precedence: explicit `data-unify` pointer (returned whether or not the
/// file exists — a missing explicit layout is the caller's error to
/// surface) > the configured default layout filename in the page's
/// directory > climbing parent directories up to the source root > none.
pub fn resolve_layout(
    page_path: &Path,
    content: &str,
    source_root: &Path,
    config: &ComposeConfig,
) -> Option<PathBuf> {
    let doc = Document::parse(content);
    if let Some(pointer) = deps::layout_pointer(&doc) {
        let reference = if deps::is_short_name(&pointer) {
            format!("/{}/{}.html", config.layouts_dir, pointer)
        } else {
            pointer
        };
        return resolve_reference(&reference, page_path, source_root);
    }

    let mut dir = page_path.parent();
    while let Some(d) = dir {
        let candidate = d.join(&config.layout_filename);
        if candidate != page_path && candidate.exists() {
            return Some(candidate);
        }
        if d == source_root {
            break;
        }
        dir = d.parent();
    }
    None
}

/// Where appended sections go: after the last ordered-fill-matched layout
/// section, else at the end of the layout `<main>`'s content, else at the
/// end of `<body>`'s content.
fn append_offset(layout: &Document, matches: &[Match]) -> Option<usize> {
    let last_section = matches
        .iter()
        .filter_map(|m| match m {
            Match::OrderedFill { layout: id, .. } => Some(layout.span(*id).end),
            _ => None,
        })
        .max();
    if last_section.is_some() {
        return last_section;
    }
    for tag in ["main", "body"] {
        if let Some(&id) = layout.by_tag(tag).first() {
            return Some(layout.inner_span(id).end);
        }
    }
    None
}

fn strip_control_attrs(attrs: &AttrMap) -> AttrMap {
    let mut cleaned = attrs.clone();
    cleaned.remove(LAYOUT_ATTR);
    cleaned.remove(LAYER_ATTR);
    cleaned
}

/// Apply span edits to the source. Edits are sorted by start; an edit that
/// begins inside an already-applied edit's span is skipped — the outer
/// rewrite has already replaced that region (nested matches).
fn splice(source: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by_key(|(range, _)| (range.start, range.end));
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for (range, text) in edits {
        if range.start < cursor {
            continue;
        }
        out.push_str(&source[cursor..range.start]);
        out.push_str(&text);
        cursor = range.end;
    }
    out.push_str(&source[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{page_doc, shell};
    use std::fs;
    use tempfile::TempDir;

    fn composer() -> Composer {
        Composer::new(ComposeConfig::default()).unwrap()
    }

    // =========================================================================
    // End-to-end composition
    // =========================================================================

    #[test]
    fn area_class_content_replaces_layout_slot() {
        let layout = shell("<div class=\"unify-hero\">default hero</div>");
        let page = page_doc("<div class=\"unify-hero\"><h1>Page hero</h1></div>");
        let out = composer().compose(&layout, &page).unwrap();

        assert!(out.html.contains("<h1>Page hero</h1>"));
        assert!(!out.html.contains("default hero"));
        // Layout shell around the slot survives byte-for-byte.
        assert!(out.html.contains("<!DOCTYPE html>"));
    }

    #[test]
    fn merged_attributes_follow_id_and_class_rules() {
        let layout = shell("<div id=\"slot\" class=\"unify-hero wide\" data-layer=\"1\">d</div>");
        let page = page_doc("<div id=\"other\" class=\"unify-hero tall\">p</div>");
        let out = composer().compose(&layout, &page).unwrap();

        assert!(out.html.contains("id=\"slot\""));
        assert!(!out.html.contains("id=\"other\""));
        assert!(out.html.contains("class=\"unify-hero wide tall\""));
        assert!(!out.html.contains("data-layer"));
    }

    #[test]
    fn landmark_fallback_fills_unclassed_regions() {
        let layout = shell("<header>layout header</header><footer>layout footer</footer>");
        let page = page_doc("<header>page header</header>");
        let out = composer().compose(&layout, &page).unwrap();

        assert!(out.html.contains("page header"));
        // No page footer → layout default prevails.
        assert!(out.html.contains("layout footer"));
    }

    #[test]
    fn surplus_sections_appended_after_last_match() {
        let layout = shell("<main><section>L0</section></main>");
        let page =
            page_doc("<main><section>P0</section><section>P1</section><section>P2</section></main>");
        let out = composer().compose(&layout, &page).unwrap();

        // main is landmark-matched, so the whole page main (all three
        // sections) lands in the output.
        assert!(out.html.contains("P0"));
        assert!(out.html.contains("P1"));
        assert!(out.html.contains("P2"));
    }

    #[test]
    fn appended_sections_rendered_when_main_not_matched() {
        // Two layout mains → landmark phase skips main, ordered-fill still
        // pairs sections within them and appends the surplus.
        let layout = shell("<main><section>L0</section></main><main>x</main>");
        let page = page_doc("<main><section>P0</section><section>P1</section></main>");
        let out = composer().compose(&layout, &page).unwrap();

        assert!(out.html.contains("P0"));
        assert!(out.html.contains("P1"));
        assert!(!out.html.contains("L0"));
    }

    #[test]
    fn area_claimed_content_not_duplicated_by_ordered_fill() {
        // Two layout mains keep the landmark phase away from main, so the
        // ordered phase is live; the page section inside the matched
        // area-class div must still appear exactly once.
        let layout = shell(
            "<div class=\"unify-x\">d</div><main><section>L0</section></main><main>x</main>",
        );
        let page = page_doc("<main><div class=\"unify-x\"><section>AAA</section></div></main>");
        let out = composer().compose(&layout, &page).unwrap();

        assert_eq!(out.html.matches("AAA").count(), 1);
        // The unpaired layout section keeps its default content.
        assert!(out.html.contains("L0"));
    }

    #[test]
    fn head_entries_merge_into_output() {
        let layout = "<!DOCTYPE html><html><head><title>Layout</title>\
            <link rel=\"stylesheet\" href=\"site.css\"></head>\
            <body><main>m</main></body></html>";
        let page = "<html><head><title>Page</title>\
            <link rel=\"stylesheet\" href=\"page.css\"></head>\
            <body><main>p</main></body></html>";
        let out = composer().compose(layout, page).unwrap();

        assert!(out.html.contains("<title>Page</title>"));
        assert!(!out.html.contains("<title>Layout</title>"));
        assert!(out.html.contains("site.css"));
        assert!(out.html.contains("page.css"));
        let site = out.html.find("site.css").unwrap();
        let page_css = out.html.find("page.css").unwrap();
        assert!(site < page_css, "layout head entries come first");
    }

    #[test]
    fn headless_page_body_scripts_not_duplicated() {
        let layout = shell("<main>default</main>");
        let page = "<body><main>content<script>track();</script></main></body>";
        let out = composer().compose(&layout, page).unwrap();
        // The script reaches the output through the matched main only,
        // never hoisted into the merged head as well.
        assert_eq!(out.html.matches("track();").count(), 1);
    }

    #[test]
    fn invalid_input_is_an_error_not_a_panic() {
        let err = composer().compose("", "<div>x</div>").unwrap_err();
        assert!(matches!(err, ComposeError::InvalidInput(_)));
        assert!(err.to_string().contains("layout"));
    }

    #[test]
    fn warnings_surface_on_composed_result() {
        let layout = shell("<nav>L</nav>");
        let page = page_doc("<nav>P1</nav><nav>P2</nav>");
        let out = composer().compose(&layout, &page).unwrap();
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn composing_does_not_mutate_inputs() {
        let layout = shell("<div class=\"unify-a\">d</div>");
        let page = page_doc("<div class=\"unify-a\">p1</div>");
        let c = composer();
        let first = c.compose(&layout, &page).unwrap();
        // Same layout reused for a different page.
        let second = c
            .compose(&layout, &page_doc("<div class=\"unify-a\">p2</div>"))
            .unwrap();
        assert!(first.html.contains("p1"));
        assert!(second.html.contains("p2"));
        assert!(!second.html.contains("p1"));
    }

    // =========================================================================
    // Layout resolution precedence
    // =========================================================================

    #[test]
    fn explicit_pointer_beats_default_filename() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("layouts")).unwrap();
        fs::write(tmp.path().join("_layout.html"), "default").unwrap();
        fs::write(tmp.path().join("layouts/blog.html"), "blog layout").unwrap();

        let page = tmp.path().join("post.html");
        let resolved = resolve_layout(
            &page,
            "<html data-unify=\"blog\"><body>x</body></html>",
            tmp.path(),
            &ComposeConfig::default(),
        );
        assert_eq!(resolved, Some(tmp.path().join("layouts/blog.html")));
    }

    #[test]
    fn explicit_path_pointer_resolves_relative_to_page() {
        let tmp = TempDir::new().unwrap();
        let page = tmp.path().join("blog/post.html");
        let resolved = resolve_layout(
            &page,
            "<body data-unify=\"../base.html\">x</body>",
            tmp.path(),
            &ComposeConfig::default(),
        );
        // Returned even though the file doesn't exist: missing explicit
        // layouts are the caller's error to report.
        assert_eq!(resolved, Some(tmp.path().join("base.html")));
    }

    #[test]
    fn default_filename_found_in_page_directory() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("blog")).unwrap();
        fs::write(tmp.path().join("blog/_layout.html"), "x").unwrap();

        let resolved = resolve_layout(
            &tmp.path().join("blog/post.html"),
            "<body>no pointer</body>",
            tmp.path(),
            &ComposeConfig::default(),
        );
        assert_eq!(resolved, Some(tmp.path().join("blog/_layout.html")));
    }

    #[test]
    fn directory_climb_stops_at_source_root() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a/b")).unwrap();
        fs::write(tmp.path().join("_layout.html"), "root layout").unwrap();

        let resolved = resolve_layout(
            &tmp.path().join("a/b/deep.html"),
            "<body>x</body>",
            tmp.path(),
            &ComposeConfig::default(),
        );
        assert_eq!(resolved, Some(tmp.path().join("_layout.html")));
    }

    #[test]
    fn no_layout_resolves_to_none() {
        let tmp = TempDir::new().unwrap();
        let resolved = resolve_layout(
            &tmp.path().join("page.html"),
            "<body>x</body>",
            tmp.path(),
            &ComposeConfig::default(),
        );
        assert_eq!(resolved, None);
    }

    // =========================================================================
    // Batch composition
    // =========================================================================

    #[test]
    fn compose_all_processes_every_job() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("layout.html"), shell("<main>default</main>")).unwrap();
        for i in 0..8 {
            fs::write(
                tmp.path().join(format!("p{i}.html")),
                page_doc(&format!("<main>page {i}</main>")),
            )
            .unwrap();
        }

        let jobs: Vec<ComposeJob> = (0..8)
            .map(|i| ComposeJob {
                page: tmp.path().join(format!("p{i}.html")),
                layout: tmp.path().join("layout.html"),
            })
            .collect();
        let results = compose_all(&jobs, &ComposeConfig::default()).unwrap();

        assert_eq!(results.len(), 8);
        for (i, (path, result)) in results.iter().enumerate() {
            assert_eq!(*path, tmp.path().join(format!("p{i}.html")));
            assert!(result.as_ref().unwrap().html.contains(&format!("page {i}")));
        }
    }

    #[test]
    fn compose_all_reports_per_job_errors() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("layout.html"), shell("<main>d</main>")).unwrap();
        let jobs = vec![ComposeJob {
            page: tmp.path().join("missing.html"),
            layout: tmp.path().join("layout.html"),
        }];
        let results = compose_all(&jobs, &ComposeConfig::default()).unwrap();
        assert!(matches!(results[0].1, Err(ComposeError::Io { .. })));
    }
}
