//! # Unify Core
//!
//! The composition engine of a layout-based static site compiler. Pages are
//! plain HTML; layouts are plain HTML; composition matches regions between
//! the two and splices page content into the layout's slots. No template
//! language, no front matter — the markup itself carries all the signal.
//!
//! # Architecture: Parse → Match → Merge → Splice
//!
//! Every composition runs the same four-stage pipeline, pure computation
//! over in-memory trees:
//!
//! ```text
//! 1. Parse    layout + page  →  Document        (arena-indexed trees)
//! 2. Match    both trees     →  MatchOutcome    (three-phase area pairing)
//! 3. Merge    each pair      →  attrs + head    (deterministic precedence)
//! 4. Splice   layout source  →  final HTML      (byte-span replacement)
//! ```
//!
//! Splicing edits the layout's original source text by byte span rather
//! than re-serializing the tree, so everything outside the matched regions
//! — doctype, whitespace, comments — survives byte for byte.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`markup`] | Lenient HTML parser producing arena-indexed [`markup::Document`] trees |
//! | [`matching`] | Three-phase area matching: area-class, landmark, ordered-fill |
//! | [`attrs`] | Attribute merging between matched layout/page element pairs |
//! | [`head`] | `<head>` extraction and keyed merging (title, meta, links, scripts, styles) |
//! | [`compose`] | The pipeline itself: [`compose::Composer`], layout resolution, parallel batch runs |
//! | [`deps`] | Bidirectional page↔resource dependency graph for incremental rebuilds |
//! | [`include`] | SSI-style include expansion with cycle and depth protection |
//! | [`lint`] | Cascade linter: documentation and area-class hygiene rules |
//! | [`config`] | `unify.toml` loading and validation |
//! | [`types`] | Shared warning types surfaced across matching and composition |
//!
//! # Design Decisions
//!
//! ## Three Matching Phases, Fixed Precedence
//!
//! Explicit beats implicit: an area class the author wrote (`unify-hero`)
//! always wins over what the markup's shape suggests. Landmark tags
//! (`header`, `nav`, `main`, `footer`, `aside`) are the semantic fallback,
//! and positional `main > section` pairing is the fallback of last resort.
//! An element claimed by one phase is invisible to later phases, on both
//! the layout and page side, so no element ever participates in two
//! matches.
//!
//! ## Warnings Accumulate, Errors Abort
//!
//! Ambiguity — two `<nav>` elements where one was expected, a mix of
//! classed and unclassed sections — produces a [`types::Warning`] and a
//! best-effort match. Only structurally unusable input (an empty document,
//! an unreadable file, a circular include chain) stops a composition.
//! Authors iterate on half-finished markup constantly; the compiler's job
//! is to keep producing output while telling them what looked off.
//!
//! ## Cycles Are Facts, Expansion Through Them Is an Error
//!
//! The dependency graph records whatever edges exist, circular ones
//! included — tracking must never fail on structurally odd sites. The
//! include expander is the one place a cycle is fatal, because expansion
//! through one cannot terminate; it reports the full chain
//! (`a.html → b.html → a.html`), not just the repeated file.
//!
//! ## Layout Source Is the Output Skeleton
//!
//! The composed page is the layout's own source text with matched spans
//! replaced. Tree re-serialization would normalize attribute order and
//! whitespace and drop comments; splicing guarantees the author's layout
//! formatting survives untouched.

pub mod attrs;
pub mod compose;
pub mod config;
pub mod deps;
pub mod head;
pub mod include;
pub mod lint;
pub mod markup;
pub mod matching;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
