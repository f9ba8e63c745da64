//! `<head>` extraction and merging.
//!
//! Each document's head is normalized into a [`HeadCollection`]: five
//! independent lists with their own dedup policies. Merging mirrors the
//! "layout → page" load order: layout entries keep their positions, page
//! entries either replace a same-key layout entry in place or append after.
//!
//! Dedup keys are stable functions of element *identity*, never of content:
//!
//! | kind | key |
//! |------|-----|
//! | meta | `name:` / `property:` / `http-equiv:` + value |
//! | link | `rel` + `href` (both required) |
//! | script | `src` (external only — inline scripts never dedup) |
//! | style | none (CSS cascade order preserved verbatim) |
//!
//! Keyless entries (malformed meta, link missing rel or href) are always
//! appended, never deduplicated.

use crate::markup::{AttrMap, Document};
use std::collections::HashMap;

/// One head element: its attributes plus inner content (empty for voids
/// like `<meta>`/`<link>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadEntry {
    pub tag: String,
    pub attrs: AttrMap,
    pub content: String,
}

impl HeadEntry {
    fn new(tag: &str, attrs: AttrMap, content: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs,
            content: content.to_string(),
        }
    }

    /// Serialize back to markup. Void head tags render without a close tag.
    pub fn to_html(&self) -> String {
        match self.tag.as_str() {
            "meta" | "link" => format!("<{}{}>", self.tag, self.attrs.to_html()),
            _ => format!(
                "<{tag}{attrs}>{content}</{tag}>",
                tag = self.tag,
                attrs = self.attrs.to_html(),
                content = self.content
            ),
        }
    }
}

/// Normalized head contents of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadCollection {
    pub title: Option<HeadEntry>,
    pub meta: Vec<HeadEntry>,
    pub links: Vec<HeadEntry>,
    pub scripts: Vec<HeadEntry>,
    pub styles: Vec<HeadEntry>,
}

impl HeadCollection {
    /// Extract head elements from a parsed document.
    ///
    /// When the document has a `<head>` element only its descendants are
    /// considered. Without one, the scan covers everything outside `<body>`
    /// (bare fragments with neither element scan the whole tree) — body
    /// scripts and styles are page content, not head metadata, and already
    /// reach the output through the matched regions. Missing kinds stay
    /// empty — this never fails.
    pub fn extract(doc: &Document) -> HeadCollection {
        let head_scope = doc.by_tag("head").first().copied();
        let body_scope = doc.by_tag("body").first().copied();
        let in_scope = |id| match head_scope {
            Some(head) => doc.is_ancestor(head, id),
            None => body_scope.map_or(true, |body| !doc.is_ancestor(body, id)),
        };

        let collect = |tag: &str| -> Vec<HeadEntry> {
            doc.by_tag(tag)
                .iter()
                .filter(|&&id| in_scope(id))
                .map(|&id| HeadEntry::new(tag, doc.get(id).attrs.clone(), doc.inner_html(id)))
                .collect()
        };

        HeadCollection {
            title: collect("title").into_iter().next(),
            meta: collect("meta"),
            links: collect("link"),
            scripts: collect("script"),
            styles: collect("style"),
        }
    }

    /// Merge two head collections, layout first.
    pub fn merge(layout: &HeadCollection, page: &HeadCollection) -> HeadCollection {
        HeadCollection {
            title: page.title.clone().or_else(|| layout.title.clone()),
            meta: merge_keyed(&layout.meta, &page.meta, meta_key),
            links: merge_keyed(&layout.links, &page.links, link_key),
            scripts: merge_keyed(&layout.scripts, &page.scripts, script_key),
            // Styles are never deduplicated: cascade order is layout then page.
            styles: layout.styles.iter().chain(&page.styles).cloned().collect(),
        }
    }

    /// Serialize all lists in output order: title, meta, links, styles,
    /// scripts — one element per line.
    pub fn to_html(&self) -> String {
        let mut out = Vec::new();
        if let Some(title) = &self.title {
            out.push(title.to_html());
        }
        for entry in self
            .meta
            .iter()
            .chain(&self.links)
            .chain(&self.styles)
            .chain(&self.scripts)
        {
            out.push(entry.to_html());
        }
        out.join("\n")
    }
}

/// First-wins-position, last-wins-content merge over a dedup key.
///
/// Layout entries establish positions. A page (or later layout) entry whose
/// key matches an earlier entry replaces that entry's content in place;
/// keyless entries are always appended.
fn merge_keyed(
    layout: &[HeadEntry],
    page: &[HeadEntry],
    key: fn(&HeadEntry) -> Option<String>,
) -> Vec<HeadEntry> {
    let mut merged: Vec<HeadEntry> = Vec::with_capacity(layout.len() + page.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for entry in layout.iter().chain(page) {
        match key(entry) {
            Some(k) => match positions.get(&k) {
                Some(&pos) => merged[pos] = entry.clone(),
                None => {
                    positions.insert(k, merged.len());
                    merged.push(entry.clone());
                }
            },
            None => merged.push(entry.clone()),
        }
    }

    merged
}

fn meta_key(entry: &HeadEntry) -> Option<String> {
    if let Some(name) = entry.attrs.get("name") {
        return Some(format!("name:{name}"));
    }
    if let Some(property) = entry.attrs.get("property") {
        return Some(format!("property:{property}"));
    }
    if let Some(value) = entry.attrs.get("http-equiv") {
        return Some(format!("http-equiv:{value}"));
    }
    None
}

fn link_key(entry: &HeadEntry) -> Option<String> {
    let rel = entry.attrs.get("rel")?;
    let href = entry.attrs.get("href")?;
    Some(format!("{rel}:{href}"))
}

/// External scripts key on `src`; inline scripts never deduplicate.
fn script_key(entry: &HeadEntry) -> Option<String> {
    entry.attrs.get("src").map(|src| format!("src:{src}"))
}
