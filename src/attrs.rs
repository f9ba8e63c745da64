//! Attribute merging for matched layout/page element pairs.
//!
//! The rule set is page-wins-except-id-and-class:
//!
//! - The composition-control attributes (`data-unify`, `data-layer`) are
//!   stripped from the output regardless of which side carries them.
//! - `id`: layout wins when present. An element's identity for CSS/JS hooks
//!   must not shift merely because a page overrode content.
//! - `class`: union, layout classes first, deduplicated keeping first
//!   occurrence.
//! - Everything else: page value wins when the page defines it.
//! - Empty-string values are dropped from the final map.
//!
//! Merging never mutates either source element; the same layout tree is
//! reused across every page that composes against it.

use crate::markup::{AttrMap, ClassSet, Element};

/// Attribute naming the layout a page composes against. Always stripped
/// from merged output.
pub const LAYOUT_ATTR: &str = "data-unify";

/// Attribute marking layer/slot metadata during authoring. Always stripped
/// from merged output.
pub const LAYER_ATTR: &str = "data-layer";

const STRIPPED_ATTRS: &[&str] = &[LAYOUT_ATTR, LAYER_ATTR];

/// Merge the attributes of a matched layout/page element pair.
pub fn merge_attributes(layout: &Element, page: &Element) -> AttrMap {
    let mut merged = AttrMap::new();

    for (name, value) in layout.attrs.iter() {
        if STRIPPED_ATTRS.contains(&name) {
            continue;
        }
        merged.set(name, value);
    }

    for (name, value) in page.attrs.iter() {
        if STRIPPED_ATTRS.contains(&name) {
            continue;
        }
        match name {
            // Layout id wins; adopt the page's only when layout has none.
            "id" => {
                if merged.get("id").is_none() {
                    merged.set("id", value);
                }
            }
            "class" => {
                let combined = merge_class_values(layout.attr("class"), Some(value));
                merged.set("class", combined);
            }
            _ => merged.set(name, value),
        }
    }

    drop_empty(&mut merged);
    merged
}

/// Union of two whitespace-separated class strings: layout classes first,
/// deduplicated keeping first occurrence, re-joined space-separated.
pub fn merge_class_values(layout: Option<&str>, page: Option<&str>) -> String {
    let mut set = ClassSet::from_attr(layout.unwrap_or(""));
    for name in page.unwrap_or("").split_whitespace() {
        set.insert(name);
    }
    set.iter().collect::<Vec<_>>().join(" ")
}

/// Page-wins merge restricted to `aria-*` attributes. Accessibility-only
/// view used by the linter and by callers inspecting merged semantics.
pub fn merge_aria_attributes(layout: &Element, page: &Element) -> AttrMap {
    merge_prefixed(layout, page, "aria-")
}

/// Page-wins merge restricted to `data-*` attributes, minus the two
/// composition-control names.
pub fn merge_data_attributes(layout: &Element, page: &Element) -> AttrMap {
    merge_prefixed(layout, page, "data-")
}

fn merge_prefixed(layout: &Element, page: &Element, prefix: &str) -> AttrMap {
    let mut merged = AttrMap::new();
    for (name, value) in layout.attrs.iter().chain(page.attrs.iter()) {
        if !name.starts_with(prefix) || STRIPPED_ATTRS.contains(&name) {
            continue;
        }
        merged.set(name, value);
    }
    drop_empty(&mut merged);
    merged
}

fn drop_empty(attrs: &mut AttrMap) {
    let empty: Vec<String> = attrs
        .iter()
        .filter(|(_, v)| v.is_empty())
        .map(|(n, _)| n.to_string())
        .collect();
    for name in empty {
        attrs.remove(&name);
    }
}
