//! Static validation of a single document's area cascade.
//!
//! The linter is stateless: it takes one markup string plus a severity
//! configuration and returns a [`LintReport`]. It never mutates anything
//! and never aborts a build by itself — the build-command collaborator
//! decides what to do with `error`-severity violations.
//!
//! ## The documentation block
//!
//! Layouts document their slots in an HTML comment whose first non-blank
//! line is `unify:areas`. Each following non-blank line starts with a
//! selector, then free-form description text:
//!
//! ```html
//! <!--
//!   unify:areas
//!   .unify-hero    full-width banner under the header
//!   .unify-sidebar related links column
//! -->
//! ```
//!
//! ## Rules
//!
//! | rule | default | fires when |
//! |------|---------|-----------|
//! | `missing-docs` | warn | no documentation block present |
//! | `duplicate-area-class` | error | an area class appears on two elements |
//! | `selector-specificity` | warn | a documented selector is compound/descendant |
//! | `undocumented-area-class` | warn | a used area class is missing from the docs |
//! | `unused-doc-class` | info | a documented area class is absent from the DOM |
//! | `duplicate-landmark` | warn | two top-level landmarks share a tag |
//!
//! A rule configured `off` does not run at all. Unknown rule names and
//! invalid severities are rejected when the configuration is built, never
//! at lint time.

use crate::markup::{Comment, Document, NodeId};
use crate::matching::LANDMARK_TAGS;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Marker line opening a documentation block.
const DOC_BLOCK_MARKER: &str = "unify:areas";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LintConfigError {
    #[error("unknown lint rule: {0}")]
    UnknownRule(String),
    #[error("invalid severity \"{0}\" (expected error, warn, info, or off)")]
    InvalidSeverity(String),
}

/// Per-rule severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warn,
    Info,
    Off,
}

impl Severity {
    fn parse(s: &str) -> Result<Severity, LintConfigError> {
        match s {
            "error" => Ok(Severity::Error),
            "warn" => Ok(Severity::Warn),
            "info" => Ok(Severity::Info),
            "off" => Ok(Severity::Off),
            other => Err(LintConfigError::InvalidSeverity(other.to_string())),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warn => "warn",
            Severity::Info => "info",
            Severity::Off => "off",
        };
        write!(f, "{s}")
    }
}

/// Severity configuration for every rule. Unknown keys in a deserialized
/// config are rejected by serde; the string-map constructor rejects them
/// explicitly. Both paths fail at construction, not at lint time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct LintConfig {
    pub missing_docs: Severity,
    pub duplicate_area_class: Severity,
    pub selector_specificity: Severity,
    pub undocumented_area_class: Severity,
    pub unused_doc_class: Severity,
    pub duplicate_landmark: Severity,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            missing_docs: Severity::Warn,
            duplicate_area_class: Severity::Error,
            selector_specificity: Severity::Warn,
            undocumented_area_class: Severity::Warn,
            unused_doc_class: Severity::Info,
            duplicate_landmark: Severity::Warn,
        }
    }
}

impl LintConfig {
    /// Build from `rule name → severity string` pairs, starting from the
    /// defaults. Rejects unknown rules and invalid severities.
    pub fn from_map(rules: &HashMap<String, String>) -> Result<LintConfig, LintConfigError> {
        let mut config = LintConfig::default();
        for (rule, severity) in rules {
            config.set(rule, Severity::parse(severity)?)?;
        }
        Ok(config)
    }

    /// Set one rule's severity by name.
    pub fn set(&mut self, rule: &str, severity: Severity) -> Result<(), LintConfigError> {
        match rule {
            "missing-docs" => self.missing_docs = severity,
            "duplicate-area-class" => self.duplicate_area_class = severity,
            "selector-specificity" => self.selector_specificity = severity,
            "undocumented-area-class" => self.undocumented_area_class = severity,
            "unused-doc-class" => self.unused_doc_class = severity,
            "duplicate-landmark" => self.duplicate_landmark = severity,
            other => return Err(LintConfigError::UnknownRule(other.to_string())),
        }
        Ok(())
    }
}

/// One rule violation with its source position.
#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    pub rule: &'static str,
    pub severity: Severity,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

/// Result of linting one file.
#[derive(Debug, Serialize)]
pub struct LintReport {
    pub file_path: String,
    pub violations: Vec<Violation>,
}

impl LintReport {
    pub fn has_errors(&self) -> bool {
        self.violations
            .iter()
            .any(|v| v.severity == Severity::Error)
    }
}

/// A selector line from the documentation block.
struct DocSelector {
    selector: String,
    /// Byte offset of the selector in the source file.
    offset: usize,
}

/// Lint one document. `area_prefix` is the configured area-class prefix
/// (default `unify-`).
pub fn lint_html(
    content: &str,
    file_path: &str,
    config: &LintConfig,
    area_prefix: &str,
) -> LintReport {
    let doc = Document::parse(content);
    let mut violations = Vec::new();

    let doc_block = find_doc_block(&doc);
    let doc_selectors = doc_block.map(parse_doc_block).unwrap_or_default();

    if config.missing_docs != Severity::Off && doc_block.is_none() {
        violations.push(Violation {
            rule: "missing-docs",
            severity: config.missing_docs,
            message: format!("no \"{DOC_BLOCK_MARKER}\" documentation block found"),
            line: 1,
            column: 1,
        });
    }

    if config.selector_specificity != Severity::Off {
        for sel in &doc_selectors {
            if !is_simple_class_selector(&sel.selector) {
                let (line, column) = doc.line_col(sel.offset);
                violations.push(Violation {
                    rule: "selector-specificity",
                    severity: config.selector_specificity,
                    message: format!(
                        "documented selector \"{}\" is not a simple class selector; \
                         area slots should be addressable by a single class",
                        sel.selector
                    ),
                    line,
                    column,
                });
            }
        }
    }

    // Area classes used in the DOM, first occurrence per class.
    let mut used: HashMap<&str, NodeId> = HashMap::new();
    for &id in doc.all() {
        for class in doc.get(id).classes.iter() {
            if !class.starts_with(area_prefix) {
                continue;
            }
            if let Some(&first) = used.get(class) {
                if config.duplicate_area_class != Severity::Off {
                    let (line, column) = doc.line_col(doc.span(id).start);
                    let (first_line, _) = doc.line_col(doc.span(first).start);
                    violations.push(Violation {
                        rule: "duplicate-area-class",
                        severity: config.duplicate_area_class,
                        message: format!(
                            "area class \"{class}\" already used on line {first_line}; \
                             area classes must be unique within a document"
                        ),
                        line,
                        column,
                    });
                }
            } else {
                used.insert(class, id);
            }
        }
    }

    let documented: HashMap<String, usize> = doc_selectors
        .iter()
        .flat_map(|sel| {
            class_names_in(&sel.selector)
                .into_iter()
                .filter(|name| name.starts_with(area_prefix))
                .map(|name| (name, sel.offset))
                .collect::<Vec<_>>()
        })
        .collect();

    if config.undocumented_area_class != Severity::Off && doc_block.is_some() {
        for (class, &id) in &used {
            if !documented.contains_key(*class) {
                let (line, column) = doc.line_col(doc.span(id).start);
                violations.push(Violation {
                    rule: "undocumented-area-class",
                    severity: config.undocumented_area_class,
                    message: format!("area class \"{class}\" is not documented"),
                    line,
                    column,
                });
            }
        }
    }

    if config.unused_doc_class != Severity::Off {
        for (class, &offset) in &documented {
            if !used.contains_key(class.as_str()) {
                let (line, column) = doc.line_col(offset);
                violations.push(Violation {
                    rule: "unused-doc-class",
                    severity: config.unused_doc_class,
                    message: format!(
                        "documented area class \"{class}\" is not used anywhere in the DOM"
                    ),
                    line,
                    column,
                });
            }
        }
    }

    if config.duplicate_landmark != Severity::Off {
        for tag in LANDMARK_TAGS {
            let top_level: Vec<NodeId> = doc
                .by_tag(tag)
                .iter()
                .copied()
                .filter(|&id| !has_landmark_ancestor(&doc, id))
                .collect();
            for &dup in top_level.iter().skip(1) {
                let (line, column) = doc.line_col(doc.span(dup).start);
                violations.push(Violation {
                    rule: "duplicate-landmark",
                    severity: config.duplicate_landmark,
                    message: format!(
                        "multiple top-level <{tag}> landmarks; landmark matching is ambiguous"
                    ),
                    line,
                    column,
                });
            }
        }
    }

    violations.sort_by_key(|v| (v.line, v.column));
    LintReport {
        file_path: file_path.to_string(),
        violations,
    }
}

fn find_doc_block(doc: &Document) -> Option<&Comment> {
    doc.comments().iter().find(|c| {
        c.text
            .lines()
            .find(|l| !l.trim().is_empty())
            .map(|l| l.trim() == DOC_BLOCK_MARKER)
            .unwrap_or(false)
    })
}

/// Pull the selector lines out of a documentation block, tracking each
/// selector's byte offset for diagnostics.
fn parse_doc_block(comment: &Comment) -> Vec<DocSelector> {
    let mut selectors = Vec::new();
    // Comment text starts after "<!--".
    let mut offset = comment.span.start + 4;
    let mut past_marker = false;

    for line in comment.text.split_inclusive('\n') {
        let trimmed = line.trim();
        if !past_marker {
            if trimmed == DOC_BLOCK_MARKER {
                past_marker = true;
            }
        } else if !trimmed.is_empty() {
            // The selector is the leading run of selector-looking tokens;
            // everything after is description text.
            let tokens: Vec<&str> = trimmed
                .split_whitespace()
                .take_while(|t| t.starts_with(['.', '#', '>']) || t.contains('.'))
                .collect();
            if !tokens.is_empty() {
                let indent = line.len() - line.trim_start().len();
                selectors.push(DocSelector {
                    selector: tokens.join(" "),
                    offset: offset + indent,
                });
            }
        }
        offset += line.len();
    }
    selectors
}

/// True for a single bare class selector like `.unify-hero`.
fn is_simple_class_selector(selector: &str) -> bool {
    let Some(name) = selector.strip_prefix('.') else {
        return false;
    };
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Class names mentioned anywhere in a selector (`div.a > .b` → a, b).
fn class_names_in(selector: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = selector;
    while let Some(dot) = rest.find('.') {
        let after = &rest[dot + 1..];
        let end = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
            .unwrap_or(after.len());
        if end > 0 {
            names.push(after[..end].to_string());
        }
        rest = &after[end..];
    }
    names
}

fn has_landmark_ancestor(doc: &Document, id: NodeId) -> bool {
    let mut cur = doc.get(id).parent();
    while let Some(p) = cur {
        if LANDMARK_TAGS.contains(&doc.get(p).tag.as_str()) {
            return true;
        }
        cur = doc.get(p).parent();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lint(content: &str) -> LintReport {
        lint_html(content, "test.html", &LintConfig::default(), "unify-")
    }

    fn rules_of(report: &LintReport) -> Vec<&str> {
        report.violations.iter().map(|v| v.rule).collect()
    }

    const DOCUMENTED: &str = "<!--\n  unify:areas\n  .unify-hero  banner slot\n-->\n\
        <main><section class=\"unify-hero\">x</section></main>";

    // =========================================================================
    // Configuration validation
    // =========================================================================

    #[test]
    fn unknown_rule_rejected_at_construction() {
        let mut rules = HashMap::new();
        rules.insert("no-such-rule".to_string(), "warn".to_string());
        assert_eq!(
            LintConfig::from_map(&rules),
            Err(LintConfigError::UnknownRule("no-such-rule".to_string()))
        );
    }

    #[test]
    fn invalid_severity_rejected_at_construction() {
        let mut rules = HashMap::new();
        rules.insert("missing-docs".to_string(), "loud".to_string());
        assert_eq!(
            LintConfig::from_map(&rules),
            Err(LintConfigError::InvalidSeverity("loud".to_string()))
        );
    }

    #[test]
    fn toml_config_rejects_unknown_rule() {
        let result: Result<LintConfig, _> = toml::from_str("no-such-rule = \"warn\"");
        assert!(result.is_err());
    }

    #[test]
    fn toml_config_parses_severities() {
        let config: LintConfig =
            toml::from_str("missing-docs = \"off\"\nduplicate-area-class = \"warn\"").unwrap();
        assert_eq!(config.missing_docs, Severity::Off);
        assert_eq!(config.duplicate_area_class, Severity::Warn);
        // Untouched rules keep defaults.
        assert_eq!(config.unused_doc_class, Severity::Info);
    }

    // =========================================================================
    // missing-docs
    // =========================================================================

    #[test]
    fn clean_documented_file_passes() {
        let report = lint(DOCUMENTED);
        assert!(report.violations.is_empty(), "{:?}", report.violations);
    }

    #[test]
    fn missing_doc_block_warns() {
        let report = lint("<main><section class=\"unify-hero\">x</section></main>");
        assert!(rules_of(&report).contains(&"missing-docs"));
    }

    #[test]
    fn disabled_rule_does_not_run() {
        let mut config = LintConfig::default();
        config.set("missing-docs", Severity::Off).unwrap();
        config.set("undocumented-area-class", Severity::Off).unwrap();
        let report = lint_html(
            "<main><section class=\"unify-hero\">x</section></main>",
            "t.html",
            &config,
            "unify-",
        );
        assert!(report.violations.is_empty());
    }

    // =========================================================================
    // duplicate-area-class
    // =========================================================================

    #[test]
    fn duplicate_area_class_is_error() {
        let html = "<!--\nunify:areas\n.unify-hero x\n-->\n\
            <div class=\"unify-hero\">a</div>\n<div class=\"unify-hero\">b</div>";
        let report = lint(html);
        let violation = report
            .violations
            .iter()
            .find(|v| v.rule == "duplicate-area-class")
            .unwrap();
        assert_eq!(violation.severity, Severity::Error);
        assert_eq!(violation.line, 6);
        assert!(report.has_errors());
    }

    #[test]
    fn non_area_duplicate_classes_fine() {
        let report = lint("<!--\nunify:areas\n-->\n<div class=\"card\">a</div><div class=\"card\">b</div>");
        assert!(!rules_of(&report).contains(&"duplicate-area-class"));
    }

    // =========================================================================
    // selector-specificity
    // =========================================================================

    #[test]
    fn compound_selectors_warn() {
        let html = "<!--\nunify:areas\ndiv.unify-hero tag-qualified\n.unify-a > .unify-b child\n-->\n\
            <div class=\"unify-hero\">x</div>";
        let report = lint(html);
        let specificity: Vec<_> = report
            .violations
            .iter()
            .filter(|v| v.rule == "selector-specificity")
            .collect();
        assert_eq!(specificity.len(), 2);
        assert!(specificity[0].message.contains("div.unify-hero"));
    }

    #[test]
    fn simple_selector_does_not_warn() {
        let report = lint(DOCUMENTED);
        assert!(!rules_of(&report).contains(&"selector-specificity"));
    }

    // =========================================================================
    // doc/DOM drift
    // =========================================================================

    #[test]
    fn undocumented_used_class_warns() {
        let html = "<!--\nunify:areas\n.unify-hero x\n-->\n\
            <div class=\"unify-hero\">a</div><div class=\"unify-extra\">b</div>";
        let report = lint(html);
        let v = report
            .violations
            .iter()
            .find(|v| v.rule == "undocumented-area-class")
            .unwrap();
        assert!(v.message.contains("unify-extra"));
    }

    #[test]
    fn undocumented_not_reported_without_doc_block() {
        // missing-docs already covers the absent block; per-class noise
        // would be redundant.
        let report = lint("<div class=\"unify-hero\">a</div>");
        assert!(!rules_of(&report).contains(&"undocumented-area-class"));
    }

    #[test]
    fn unused_documented_class_is_info() {
        let html = "<!--\nunify:areas\n.unify-hero x\n.unify-ghost y\n-->\n\
            <div class=\"unify-hero\">a</div>";
        let report = lint(html);
        let v = report
            .violations
            .iter()
            .find(|v| v.rule == "unused-doc-class")
            .unwrap();
        assert_eq!(v.severity, Severity::Info);
        assert!(v.message.contains("unify-ghost"));
        assert_eq!(v.line, 4);
    }

    // =========================================================================
    // duplicate-landmark
    // =========================================================================

    #[test]
    fn duplicate_top_level_landmark_warns() {
        let html = "<!--\nunify:areas\n-->\n<nav>a</nav><nav>b</nav>";
        let report = lint(html);
        let v = report
            .violations
            .iter()
            .find(|v| v.rule == "duplicate-landmark")
            .unwrap();
        assert!(v.message.contains("nav"));
        assert_eq!(v.line, 4);
    }

    #[test]
    fn nested_landmark_not_counted_as_duplicate() {
        // A nav inside a header is scoped, not a top-level ambiguity.
        let html = "<!--\nunify:areas\n-->\n<header><nav>a</nav></header><nav>b</nav>";
        let report = lint(html);
        assert!(!rules_of(&report).contains(&"duplicate-landmark"));
    }

    // =========================================================================
    // Report shape
    // =========================================================================

    #[test]
    fn violations_sorted_by_position() {
        let html = "<div class=\"unify-a\">x</div>\n<div class=\"unify-a\">y</div>";
        let report = lint(html);
        let lines: Vec<usize> = report.violations.iter().map(|v| v.line).collect();
        let mut sorted = lines.clone();
        sorted.sort();
        assert_eq!(lines, sorted);
    }

    #[test]
    fn report_serializes_to_json() {
        let report = lint("<div class=\"unify-a\">x</div>");
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"file_path\":\"test.html\""));
        assert!(json.contains("\"rule\""));
    }

    #[test]
    fn malformed_markup_never_panics() {
        let report = lint("<div class=\"unify-a\"><section><<</");
        // Unclosed everything → empty tree → only missing-docs fires.
        assert_eq!(rules_of(&report), vec!["missing-docs"]);
    }
}
