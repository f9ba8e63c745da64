//! Include expansion with cycle and depth protection.
//!
//! Pages and fragments may pull in other fragments via SSI-style comment
//! directives:
//!
//! ```text
//! <!--#include file="fragments/nav.html" -->     relative to the including file
//! <!--#include virtual="/fragments/nav.html" --> rooted at the source root
//! ```
//!
//! Expansion is recursive: an included fragment may itself include others.
//! Two guards keep that recursion honest, both fatal when tripped:
//!
//! - a **path-so-far set** catches circular chains and reports the full
//!   chain (`a.html → b.html → a.html`), not just the repeated file;
//! - a **max-depth limit** catches non-cyclic runaway nesting and reports
//!   the chain plus the configured limit.
//!
//! This is deliberately the *only* place cycles are fatal. The dependency
//! graph ([`crate::deps`]) records circular edges without complaint —
//! cycles are a structural fact of the graph, an error only when someone
//! actually tries to expand through one.

use crate::deps::resolve_path;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default nesting limit for include expansion.
pub const DEFAULT_MAX_DEPTH: usize = 10;

#[derive(Error, Debug)]
pub enum IncludeError {
    #[error("circular include detected: {chain}")]
    CircularInclude { chain: String },
    #[error("include depth limit ({limit}) exceeded: {chain}")]
    DepthExceeded { chain: String, limit: usize },
    #[error("failed to read include {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Expand all include directives in a file read from disk.
pub fn expand_file(
    path: &Path,
    source_root: &Path,
    max_depth: usize,
) -> Result<String, IncludeError> {
    let content = fs::read_to_string(path).map_err(|source| IncludeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    expand(&content, path, source_root, max_depth)
}

/// Expand all include directives in `content`, as if it were the contents
/// of `path`. Unresolvable directives (external URLs, paths escaping the
/// source root) are left in place untouched.
pub fn expand(
    content: &str,
    path: &Path,
    source_root: &Path,
    max_depth: usize,
) -> Result<String, IncludeError> {
    let mut chain = vec![path.to_path_buf()];
    expand_inner(content, path, source_root, max_depth, &mut chain)
}

fn expand_inner(
    content: &str,
    path: &Path,
    source_root: &Path,
    max_depth: usize,
    chain: &mut Vec<PathBuf>,
) -> Result<String, IncludeError> {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("<!--#include") {
        let Some(end_rel) = rest[start..].find("-->") else {
            // Unterminated directive: emit verbatim, nothing to expand.
            break;
        };
        let end = start + end_rel + 3;
        out.push_str(&rest[..start]);

        let directive = &rest[start + 4..end - 3];
        // resolve_path keeps self-references so the cycle check below can
        // report a self-include instead of treating it as unresolvable.
        let expanded = match parse_include_directive(directive)
            .and_then(|target| resolve_path(&target, path, source_root))
        {
            Some(target) => {
                if let Some(pos) = chain.iter().position(|p| p == &target) {
                    let cycle: Vec<String> = chain[pos..]
                        .iter()
                        .chain(std::iter::once(&target))
                        .map(|p| display_relative(p, source_root))
                        .collect();
                    return Err(IncludeError::CircularInclude {
                        chain: cycle.join(" → "),
                    });
                }
                if chain.len() > max_depth {
                    let full: Vec<String> = chain
                        .iter()
                        .chain(std::iter::once(&target))
                        .map(|p| display_relative(p, source_root))
                        .collect();
                    return Err(IncludeError::DepthExceeded {
                        chain: full.join(" → "),
                        limit: max_depth,
                    });
                }

                let fragment =
                    fs::read_to_string(&target).map_err(|source| IncludeError::Io {
                        path: target.clone(),
                        source,
                    })?;
                chain.push(target.clone());
                let result = expand_inner(&fragment, &target, source_root, max_depth, chain)?;
                chain.pop();
                result
            }
            // Malformed or out-of-root directive: left in place.
            None => rest[start..end].to_string(),
        };

        out.push_str(&expanded);
        rest = &rest[end..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Parse the target out of an include directive's comment text.
///
/// Accepts `#include file="…"` (relative to the including file) and
/// `#include virtual="…"` (root-relative; normalized to a leading slash so
/// resolution treats it as path-rooted). Returns `None` for anything else.
pub(crate) fn parse_include_directive(comment_text: &str) -> Option<String> {
    let trimmed = comment_text.trim();
    let rest = trimmed.strip_prefix("#include")?.trim_start();

    if let Some(value) = attr_value(rest, "file") {
        return Some(value);
    }
    if let Some(value) = attr_value(rest, "virtual") {
        let rooted = if value.starts_with('/') {
            value
        } else {
            format!("/{value}")
        };
        return Some(rooted);
    }
    None
}

fn attr_value(text: &str, name: &str) -> Option<String> {
    let after = text.strip_prefix(name)?.trim_start();
    let after = after.strip_prefix('=')?.trim_start();
    let quote = after.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let inner = &after[1..];
    let end = inner.find(quote)?;
    Some(inner[..end].to_string())
}

fn display_relative(path: &Path, source_root: &Path) -> String {
    path.strip_prefix(source_root)
        .unwrap_or(path)
        .display()
        .to_string()
}
