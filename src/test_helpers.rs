//! Shared test utilities for the unify-core test suite.
//!
//! Provides document builders that wrap body markup in a complete HTML
//! shell, plus a source-tree fixture writer for filesystem-backed tests.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let layout = shell("<main><section>default</section></main>");
//! let page = page_doc("<main><section>content</section></main>");
//! ```

use std::fs;
use std::path::{Path, PathBuf};

// =========================================================================
// Document builders
// =========================================================================

/// A complete layout document wrapping the given body markup.
pub fn shell(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n\
         <meta charset=\"utf-8\">\n<title>Layout</title>\n</head>\n\
         <body>\n{body}\n</body>\n</html>\n"
    )
}

/// A complete page document wrapping the given body markup.
pub fn page_doc(body: &str) -> String {
    format!(
        "<html>\n<head>\n<title>Page</title>\n</head>\n\
         <body>\n{body}\n</body>\n</html>\n"
    )
}

// =========================================================================
// Filesystem fixtures
// =========================================================================

/// Write a file under `root`, creating parent directories as needed, and
/// return its full path.
pub fn write_file(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}
