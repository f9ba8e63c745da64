//! Three-phase area matching between a layout document and a page document.
//!
//! Phases run in fixed precedence order, each skipping elements an earlier
//! phase already claimed:
//!
//! 1. **Area-class** — layout elements carrying a class with the configured
//!    area prefix pair with page elements sharing that exact class.
//! 2. **Landmark** ([`landmark`]) — semantic fallback over the five
//!    landmark tags.
//! 3. **Ordered-fill** ([`ordered`]) — positional fallback over
//!    `main > section` children, with page surplus appended.
//!
//! The result is a [`MatchOutcome`]: the match list, the append list,
//! collected warnings (never aborting), and errors (which abort the whole
//! call — an outcome with a non-empty `errors` list carries no matches).

pub mod landmark;
pub mod ordered;

use crate::markup::{Document, NodeId};
use crate::types::Warning;
use std::collections::HashSet;

pub use landmark::LANDMARK_TAGS;

/// One layout↔page pairing, tagged by the phase that produced it.
///
/// Every variant carries the layout element, the page element(s), and the
/// combined page content that will replace the layout element's content.
#[derive(Debug, Clone)]
pub enum Match {
    /// Phase 1: explicit area-class pairing.
    AreaClass {
        /// The shared class name, prefix included (e.g. `unify-hero`).
        class: String,
        layout: NodeId,
        /// All page elements carrying the class, in source order.
        pages: Vec<NodeId>,
        content: String,
    },
    /// Phase 2: semantic landmark pairing.
    Landmark {
        tag: &'static str,
        /// 1.0 when the page candidate was unique, lower when the first of
        /// several was chosen.
        confidence: f32,
        layout: NodeId,
        page: NodeId,
        content: String,
    },
    /// Phase 3: positional `main > section` pairing.
    OrderedFill {
        index: usize,
        layout: NodeId,
        page: NodeId,
        content: String,
    },
}

impl Match {
    /// The claimed layout element. Never shared between two matches of the
    /// same composition run.
    pub fn layout_node(&self) -> NodeId {
        match self {
            Match::AreaClass { layout, .. }
            | Match::Landmark { layout, .. }
            | Match::OrderedFill { layout, .. } => *layout,
        }
    }

    /// The combined page content that replaces the layout element's content.
    pub fn content(&self) -> &str {
        match self {
            Match::AreaClass { content, .. }
            | Match::Landmark { content, .. }
            | Match::OrderedFill { content, .. } => content,
        }
    }

    /// First page element contributing to this match (attribute-merge
    /// partner).
    pub fn primary_page_node(&self) -> Option<NodeId> {
        match self {
            Match::AreaClass { pages, .. } => pages.first().copied(),
            Match::Landmark { page, .. } | Match::OrderedFill { page, .. } => Some(*page),
        }
    }
}

/// A page section with no layout counterpart, to be rendered after the last
/// matched section.
#[derive(Debug, Clone)]
pub struct Appended {
    /// Positional index continuing the ordered-fill numbering.
    pub index: usize,
    pub page: NodeId,
    pub content: String,
}

/// Result of one composition run's matching stage.
#[derive(Debug, Default)]
pub struct MatchOutcome {
    pub matches: Vec<Match>,
    pub appended: Vec<Appended>,
    pub warnings: Vec<Warning>,
    /// Non-empty only when the whole call aborted (invalid documents).
    pub errors: Vec<String>,
}

/// Run the three matching phases over a layout/page pair.
///
/// `area_prefix` is the configured class prefix (default `unify-`).
/// Malformed or empty documents populate `errors` instead of panicking or
/// returning partial matches.
pub fn match_areas(layout: &Document, page: &Document, area_prefix: &str) -> MatchOutcome {
    let mut outcome = MatchOutcome::default();

    if layout.is_empty() {
        outcome
            .errors
            .push("layout document contains no parseable elements".to_string());
    }
    if page.is_empty() {
        outcome
            .errors
            .push("page document contains no parseable elements".to_string());
    }
    if !outcome.errors.is_empty() {
        return outcome;
    }

    let mut claimed_layout: HashSet<NodeId> = HashSet::new();
    let mut claimed_page: HashSet<NodeId> = HashSet::new();
    // Area-class claims tracked separately: they exclude their descendants
    // from ordered-fill, landmark claims do not (their sections still pair
    // and surplus still appends).
    let mut area_claimed_layout: HashSet<NodeId> = HashSet::new();
    let mut area_claimed_page: HashSet<NodeId> = HashSet::new();

    // Phase 1: area classes.
    for &layout_id in layout.all() {
        if claimed_layout.contains(&layout_id) {
            continue;
        }
        let area_classes: Vec<&str> = layout
            .get(layout_id)
            .classes
            .iter()
            .filter(|c| c.starts_with(area_prefix))
            .collect();
        for class in area_classes {
            let pages: Vec<NodeId> = page
                .by_class(class)
                .iter()
                .copied()
                .filter(|id| !claimed_page.contains(id))
                .collect();
            if pages.is_empty() {
                continue;
            }
            let content = pages
                .iter()
                .map(|&id| page.inner_html(id))
                .collect::<Vec<_>>()
                .join("\n");
            claimed_layout.insert(layout_id);
            claimed_page.extend(&pages);
            area_claimed_layout.insert(layout_id);
            area_claimed_page.extend(&pages);
            outcome.matches.push(Match::AreaClass {
                class: class.to_string(),
                layout: layout_id,
                pages,
                content,
            });
            break;
        }
    }

    // Phase 2: landmarks.
    for pair in landmark::run(
        layout,
        page,
        &claimed_layout,
        &claimed_page,
        &mut outcome.warnings,
    ) {
        claimed_layout.insert(pair.layout);
        claimed_page.insert(pair.page);
        outcome.matches.push(Match::Landmark {
            tag: pair.tag,
            confidence: pair.confidence,
            layout: pair.layout,
            page: pair.page,
            content: page.inner_html(pair.page).to_string(),
        });
    }

    // Phase 3: ordered fill.
    let (pairs, surplus) = ordered::run(
        layout,
        page,
        &claimed_layout,
        &claimed_page,
        &area_claimed_layout,
        &area_claimed_page,
        area_prefix,
        &mut outcome.warnings,
    );
    for pair in pairs {
        claimed_layout.insert(pair.layout);
        claimed_page.insert(pair.page);
        outcome.matches.push(Match::OrderedFill {
            index: pair.index,
            layout: pair.layout,
            page: pair.page,
            content: page.inner_html(pair.page).to_string(),
        });
    }
    for extra in surplus {
        outcome.appended.push(Appended {
            index: extra.index,
            page: extra.page,
            content: page.inner_html(extra.page).to_string(),
        });
    }

    outcome
}
