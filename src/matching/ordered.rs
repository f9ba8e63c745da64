//! Ordered-fill phase: positional fallback over `main > section` children.
//!
//! Layout section *i* pairs with page section *i* by document order. Page
//! surplus beyond the layout's section count is appended after the last
//! matched section rather than discarded. Scope is restricted to sections
//! that are descendants of a `main` element and not already claimed by an
//! earlier phase.
//!
//! Sections *inside* an element an area-class match claimed are also out
//! of scope, on both sides: that match already places their content, and
//! re-pairing them positionally would render it twice. Landmark claims do
//! not cascade this way — sections under a landmark-matched `main` still
//! pair and surplus still appends.

use crate::markup::{Document, NodeId};
use crate::types::{Warning, WarningKind};
use std::collections::HashSet;

pub(crate) struct OrderedPair {
    pub index: usize,
    pub layout: NodeId,
    pub page: NodeId,
}

pub(crate) struct Surplus {
    pub index: usize,
    pub page: NodeId,
}

pub(crate) fn run(
    layout: &Document,
    page: &Document,
    claimed_layout: &HashSet<NodeId>,
    claimed_page: &HashSet<NodeId>,
    area_claimed_layout: &HashSet<NodeId>,
    area_claimed_page: &HashSet<NodeId>,
    area_prefix: &str,
    warnings: &mut Vec<Warning>,
) -> (Vec<OrderedPair>, Vec<Surplus>) {
    warn_multiple_main(layout, "layout", warnings);
    warn_multiple_main(page, "page", warnings);

    // Mixed-usage is judged over every section in scope, including ones an
    // earlier phase already claimed via their area classes.
    let layout_all = sections_under_main(layout);
    let page_all = sections_under_main(page);
    warn_mixed_usage(layout, &layout_all, area_prefix, "layout", warnings);
    warn_mixed_usage(page, &page_all, area_prefix, "page", warnings);

    let layout_sections: Vec<NodeId> = layout_all
        .into_iter()
        .filter(|&id| {
            !claimed_layout.contains(&id) && !inside_claimed_area(layout, id, area_claimed_layout)
        })
        .collect();
    let page_sections: Vec<NodeId> = page_all
        .into_iter()
        .filter(|&id| {
            !claimed_page.contains(&id) && !inside_claimed_area(page, id, area_claimed_page)
        })
        .collect();

    let paired = layout_sections.len().min(page_sections.len());
    let pairs = (0..paired)
        .map(|i| OrderedPair {
            index: i,
            layout: layout_sections[i],
            page: page_sections[i],
        })
        .collect();

    let surplus = page_sections
        .iter()
        .enumerate()
        .skip(paired)
        .map(|(i, &id)| Surplus { index: i, page: id })
        .collect();

    (pairs, surplus)
}

/// True when an ancestor of `id` was claimed by an area-class match. The
/// claiming match already carries this section's content to its own slot.
fn inside_claimed_area(doc: &Document, id: NodeId, area_claimed: &HashSet<NodeId>) -> bool {
    let mut cur = doc.get(id).parent();
    while let Some(p) = cur {
        if area_claimed.contains(&p) {
            return true;
        }
        cur = doc.get(p).parent();
    }
    false
}

/// Sections that are descendants of any `main` element, in document order.
fn sections_under_main(doc: &Document) -> Vec<NodeId> {
    let mains = doc.by_tag("main");
    doc.by_tag("section")
        .iter()
        .copied()
        .filter(|&section| mains.iter().any(|&main| doc.is_ancestor(main, section)))
        .collect()
}

fn warn_multiple_main(doc: &Document, side: &str, warnings: &mut Vec<Warning>) {
    let count = doc.by_tag("main").len();
    if count > 1 {
        warnings.push(Warning::new(
            WarningKind::MultipleMain,
            format!("{side} has {count} <main> elements; ordered-fill scope is ambiguous"),
        ));
    }
}

fn warn_mixed_usage(
    doc: &Document,
    sections: &[NodeId],
    area_prefix: &str,
    side: &str,
    warnings: &mut Vec<Warning>,
) {
    let with_area = sections
        .iter()
        .filter(|&&id| doc.get(id).classes.iter().any(|c| c.starts_with(area_prefix)))
        .count();
    if with_area > 0 && with_area < sections.len() {
        warnings.push(Warning::new(
            WarningKind::MixedFillUsage,
            format!(
                "{side} mixes area-classed and unclassed <section> elements under <main> \
                 ({with_area} of {} carry a \"{area_prefix}\" class)",
                sections.len()
            ),
        ));
    }
}
