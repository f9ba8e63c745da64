//! Landmark phase: semantic fallback matching between layout and page.
//!
//! For each of the five landmark tags, a layout that has exactly one
//! unclaimed landmark of that tag pairs with the page's corresponding
//! landmark. Ambiguity rules:
//!
//! - Page has several candidates → first occurrence wins, with a warning
//!   and reduced confidence.
//! - Layout has several candidates → the tag is skipped for this phase
//!   (left to ordered-fill or unmatched), with a warning.
//! - Page has none → no match; the layout's default content prevails at
//!   render time.

use crate::markup::{Document, NodeId};
use crate::types::{Warning, WarningKind};
use std::collections::HashSet;

/// The landmark vocabulary. Exactly these tags participate in phase 2.
pub const LANDMARK_TAGS: [&str; 5] = ["header", "nav", "main", "aside", "footer"];

/// Confidence assigned when the page had exactly one candidate.
pub const CONFIDENCE_UNIQUE: f32 = 1.0;

/// Confidence assigned when the first of several page candidates was used.
pub const CONFIDENCE_AMBIGUOUS: f32 = 0.5;

pub(crate) struct LandmarkPair {
    pub layout: NodeId,
    pub page: NodeId,
    pub tag: &'static str,
    pub confidence: f32,
}

pub(crate) fn run(
    layout: &Document,
    page: &Document,
    claimed_layout: &HashSet<NodeId>,
    claimed_page: &HashSet<NodeId>,
    warnings: &mut Vec<Warning>,
) -> Vec<LandmarkPair> {
    let mut pairs = Vec::new();

    for tag in LANDMARK_TAGS {
        let layout_candidates: Vec<NodeId> = layout
            .by_tag(tag)
            .iter()
            .copied()
            .filter(|id| !claimed_layout.contains(id))
            .collect();

        let layout_el = match layout_candidates.as_slice() {
            [] => continue,
            [one] => *one,
            many => {
                warnings.push(Warning::new(
                    WarningKind::AmbiguousLayoutLandmark,
                    format!(
                        "layout has {} <{tag}> landmarks; skipping <{tag}> for landmark matching",
                        many.len()
                    ),
                ));
                continue;
            }
        };

        let page_candidates: Vec<NodeId> = page
            .by_tag(tag)
            .iter()
            .copied()
            .filter(|id| !claimed_page.contains(id))
            .collect();

        let (page_el, confidence) = match page_candidates.as_slice() {
            [] => continue,
            [one] => (*one, CONFIDENCE_UNIQUE),
            many => {
                warnings.push(Warning::new(
                    WarningKind::AmbiguousPageLandmark,
                    format!(
                        "page has {} <{tag}> landmarks; using the first occurrence",
                        many.len()
                    ),
                ));
                (many[0], CONFIDENCE_AMBIGUOUS)
            }
        };

        pairs.push(LandmarkPair {
            layout: layout_el,
            page: page_el,
            tag,
            confidence,
        });
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::Document;

    fn run_on(layout: &str, page: &str) -> (Vec<LandmarkPair>, Vec<Warning>) {
        let layout = Document::parse(layout);
        let page = Document::parse(page);
        let mut warnings = Vec::new();
        let pairs = run(
            &layout,
            &page,
            &HashSet::new(),
            &HashSet::new(),
            &mut warnings,
        );
        (pairs, warnings)
    }

    #[test]
    fn unique_landmarks_pair_with_full_confidence() {
        let (pairs, warnings) = run_on(
            "<header>L</header><main>L</main><footer>L</footer>",
            "<header>P</header><main>P</main>",
        );
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|p| p.confidence == CONFIDENCE_UNIQUE));
        assert!(warnings.is_empty());
        // footer has no page counterpart → layout default prevails.
        assert!(!pairs.iter().any(|p| p.tag == "footer"));
    }

    #[test]
    fn ambiguous_page_uses_first_and_warns() {
        let (pairs, warnings) = run_on(
            "<nav>L</nav>",
            "<nav id=\"first\">P1</nav><nav id=\"second\">P2</nav>",
        );
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].confidence, CONFIDENCE_AMBIGUOUS);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::AmbiguousPageLandmark);
        assert!(warnings[0].message.contains("nav"));
    }

    #[test]
    fn ambiguous_layout_skips_tag_and_warns() {
        let (pairs, warnings) = run_on("<aside>A</aside><aside>B</aside>", "<aside>P</aside>");
        assert!(pairs.is_empty());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::AmbiguousLayoutLandmark);
    }

    #[test]
    fn claimed_elements_are_excluded() {
        let layout = Document::parse("<main>L</main>");
        let page = Document::parse("<main>P</main>");
        let claimed: HashSet<NodeId> = layout.by_tag("main").iter().copied().collect();
        let mut warnings = Vec::new();
        let pairs = run(&layout, &page, &claimed, &HashSet::new(), &mut warnings);
        assert!(pairs.is_empty());
    }

    #[test]
    fn non_landmark_tags_ignored() {
        let (pairs, _) = run_on("<div>L</div><section>L</section>", "<div>P</div>");
        assert!(pairs.is_empty());
    }
}
