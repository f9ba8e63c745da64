//! Shared warning records used across the matching and composition stages.
//!
//! Warnings are collected on result records and never abort a pipeline run
//! (see [`crate::matching::MatchOutcome`]). They carry a machine-readable
//! kind plus a human-readable message so external collaborators (the build
//! command, the dev server overlay) can both filter and display them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable warning category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    /// Page has more than one landmark of the same tag; first occurrence used.
    AmbiguousPageLandmark,
    /// Layout has more than one landmark of the same tag; tag skipped for
    /// the landmark phase.
    AmbiguousLayoutLandmark,
    /// Some `main > section` elements carry area-prefixed classes while
    /// others do not.
    MixedFillUsage,
    /// A document contains more than one `main` element, making the
    /// ordered-fill scope ambiguous.
    MultipleMain,
}

/// A non-fatal diagnostic produced during matching or composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
