//! Lightweight markup parsing and tree model.
//!
//! A single-pass tokenizer feeds a stack-based tree builder, producing a
//! [`Document`] whose elements live in an arena and are addressed by
//! [`NodeId`] indices. The arena order is document order (elements are
//! allocated when their open tag is seen), so `by_tag`/`by_class`/`all`
//! views fall out of one linear pass over the arena at the end of parsing.
//!
//! ## Error recovery
//!
//! Parsing never fails. Malformed input degrades to a partial tree:
//!
//! - A close tag with no matching open tag on the stack is ignored.
//! - An open element whose close tag never arrives is dropped from the
//!   tree at end of input; its already-closed children are spliced into
//!   the nearest surviving ancestor so they remain queryable.
//! - A tag truncated mid-attribute (`<div class="x`) is discarded.
//!
//! Callers (the matchers, the linter) must tolerate partial trees — queries
//! on a mangled document return whatever was captured, possibly nothing.
//!
//! ## What this parser is not
//!
//! This is not an HTML5-conformant parser. It recognizes matched tag pairs,
//! attributes, comments, a fixed void-element vocabulary, and treats
//! `<script>`/`<style>` bodies as opaque raw text. That is exactly the
//! surface the composition engine needs; anything fancier belongs to the
//! browser rendering the output.

use std::collections::HashMap;
use std::ops::Range;

/// Index of an element in its document's arena.
///
/// Ids are only meaningful against the [`Document`] that produced them;
/// there are no cross-document references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Tags that never take a close tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Tags whose content is captured as opaque text, never parsed for nested
/// elements.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Ordered attribute map. Preserves source order on iteration. Names are
/// lowercased when the tag is parsed, so lookups should pass lowercase
/// names; `get` and `contains` compare exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttrMap {
    entries: Vec<(String, String)>,
}

impl AttrMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Set a value, replacing in place (keeping position) if the name exists.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize as the attribute portion of an open tag, with a leading
    /// space when non-empty. Valueless attributes render bare.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for (name, value) in self.iter() {
            out.push(' ');
            out.push_str(name);
            if !value.is_empty() {
                out.push_str("=\"");
                out.push_str(value);
                out.push('"');
            }
        }
        out
    }
}

impl FromIterator<(String, String)> for AttrMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Deduplicated, insertion-ordered set of class names.
///
/// Owned membership-set type rather than a raw `Vec`/`HashSet` so callers
/// get `contains` without reaching for ad-hoc helpers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassSet {
    names: Vec<String>,
}

impl ClassSet {
    /// Build from a whitespace-separated `class` attribute value.
    /// Duplicates keep their first occurrence.
    pub fn from_attr(value: &str) -> Self {
        let mut set = Self::default();
        for name in value.split_whitespace() {
            set.insert(name);
        }
        set
    }

    pub fn insert(&mut self, name: &str) {
        if !self.contains(name) {
            self.names.push(name.to_string());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A parsed element. Owned by exactly one [`Document`]; mutated only while
/// that document is being built.
#[derive(Debug, Clone)]
pub struct Element {
    /// Lowercased tag name.
    pub tag: String,
    pub attrs: AttrMap,
    pub classes: ClassSet,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    /// Byte range of the whole element in the source, open tag through
    /// close tag.
    span: Range<usize>,
    /// Byte range of the content between open and close tags.
    inner: Range<usize>,
    dropped: bool,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name)
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes.contains(name)
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// A comment captured during parsing (`<!-- … -->`), with the text between
/// the delimiters and the span of the whole comment.
#[derive(Debug, Clone)]
pub struct Comment {
    pub text: String,
    pub span: Range<usize>,
}

/// A parsed markup document: the arena of elements plus lookup views
/// computed at parse time.
#[derive(Debug, Clone)]
pub struct Document {
    source: String,
    nodes: Vec<Element>,
    roots: Vec<NodeId>,
    comments: Vec<Comment>,
    /// Live element ids in document order.
    order: Vec<NodeId>,
    tag_index: HashMap<String, Vec<NodeId>>,
    class_index: HashMap<String, Vec<NodeId>>,
}

impl Document {
    /// Parse a markup string. Never fails; see the module docs for the
    /// degradation rules on malformed input.
    pub fn parse(source: &str) -> Document {
        Parser::new(source).run()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn get(&self, id: NodeId) -> &Element {
        &self.nodes[id.0]
    }

    /// All live elements in document order.
    pub fn all(&self) -> &[NodeId] {
        &self.order
    }

    /// Elements with the given (case-insensitive) tag, in document order.
    pub fn by_tag(&self, tag: &str) -> &[NodeId] {
        self.tag_index
            .get(&tag.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Elements carrying the given class, in document order.
    pub fn by_class(&self, class: &str) -> &[NodeId] {
        self.class_index
            .get(class)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Top-level elements (no parent), in document order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// True when nothing parsed into the tree.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The content between an element's open and close tags, verbatim.
    pub fn inner_html(&self, id: NodeId) -> &str {
        &self.source[self.nodes[id.0].inner.clone()]
    }

    /// The whole element, open tag through close tag, verbatim.
    pub fn outer_html(&self, id: NodeId) -> &str {
        &self.source[self.nodes[id.0].span.clone()]
    }

    /// Byte span of the whole element in the source.
    pub fn span(&self, id: NodeId) -> Range<usize> {
        self.nodes[id.0].span.clone()
    }

    /// Byte span of the element's inner content.
    pub fn inner_span(&self, id: NodeId) -> Range<usize> {
        self.nodes[id.0].inner.clone()
    }

    /// True if `ancestor` is on `node`'s parent chain.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = self.nodes[node.0].parent;
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self.nodes[p.0].parent;
        }
        false
    }

    /// 1-based (line, column) for a byte offset into the source.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        line_col(&self.source, offset)
    }
}

/// 1-based (line, column) for a byte offset into `source`.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source[..offset];
    let line = before.bytes().filter(|&b| b == b'\n').count() + 1;
    let col = offset - before.rfind('\n').map(|p| p + 1).unwrap_or(0) + 1;
    (line, col)
}

struct OpenEntry {
    node: NodeId,
    inner_start: usize,
}

struct Parser<'a> {
    source: &'a str,
    nodes: Vec<Element>,
    roots: Vec<NodeId>,
    comments: Vec<Comment>,
    stack: Vec<OpenEntry>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            nodes: Vec::new(),
            roots: Vec::new(),
            comments: Vec::new(),
            stack: Vec::new(),
        }
    }

    fn run(mut self) -> Document {
        let src = self.source;
        let len = src.len();
        let mut i = 0;

        while i < len {
            let Some(lt) = find_byte(src.as_bytes(), b'<', i) else {
                break;
            };
            let rest = &src[lt..];

            if rest.starts_with("<!--") {
                i = self.consume_comment(lt);
            } else if rest.starts_with("</") {
                i = self.consume_close_tag(lt);
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                // Doctype or processing instruction: skip to '>'.
                i = find_byte(src.as_bytes(), b'>', lt)
                    .map(|p| p + 1)
                    .unwrap_or(len);
            } else {
                i = self.consume_open_tag(lt);
            }
        }

        // Unclosed elements at end of input are dropped; their closed
        // children survive under the nearest live ancestor.
        while let Some(entry) = self.stack.pop() {
            drop_node(&mut self.nodes, &mut self.roots, entry.node);
        }

        self.finish()
    }

    fn consume_comment(&mut self, lt: usize) -> usize {
        let body_start = lt + 4;
        match self.source[body_start..].find("-->") {
            Some(rel) => {
                let end = body_start + rel + 3;
                self.comments.push(Comment {
                    text: self.source[body_start..body_start + rel].to_string(),
                    span: lt..end,
                });
                end
            }
            None => {
                // Unterminated comment swallows the rest of the input.
                self.comments.push(Comment {
                    text: self.source[body_start..].to_string(),
                    span: lt..self.source.len(),
                });
                self.source.len()
            }
        }
    }

    fn consume_close_tag(&mut self, lt: usize) -> usize {
        let name = read_tag_name(self.source, lt + 2);
        let Some(gt) = find_byte(self.source.as_bytes(), b'>', lt + 2) else {
            // Truncated close tag at end of input.
            return self.source.len();
        };
        if name.is_empty() {
            return gt + 1;
        }
        let lname = name.to_ascii_lowercase();
        if let Some(pos) = self
            .stack
            .iter()
            .rposition(|e| self.nodes[e.node.0].tag == lname)
        {
            // Anything opened after the matching element never closed.
            while self.stack.len() > pos + 1 {
                let entry = self.stack.pop().unwrap();
                drop_node(&mut self.nodes, &mut self.roots, entry.node);
            }
            let entry = self.stack.pop().unwrap();
            let el = &mut self.nodes[entry.node.0];
            el.inner = entry.inner_start..lt;
            el.span.end = gt + 1;
        }
        // Stray close tag with no open counterpart: ignored.
        gt + 1
    }

    fn consume_open_tag(&mut self, lt: usize) -> usize {
        let name = read_tag_name(self.source, lt + 1);
        if name.is_empty() {
            // '<' followed by non-tag content: treat as text.
            return lt + 1;
        }
        let attr_start = lt + 1 + name.len();
        let Some((gt, self_closing)) = scan_tag_end(self.source.as_bytes(), attr_start) else {
            // Tag truncated mid-attribute: discard the fragment.
            return self.source.len();
        };
        let attr_end = if self_closing { gt - 1 } else { gt };
        let attrs = parse_attrs(&self.source[attr_start..attr_end]);
        let classes = ClassSet::from_attr(attrs.get("class").unwrap_or(""));
        let lname = name.to_ascii_lowercase();

        let id = NodeId(self.nodes.len());
        let parent = self.stack.last().map(|e| e.node);
        self.nodes.push(Element {
            tag: lname.clone(),
            attrs,
            classes,
            children: Vec::new(),
            parent,
            span: lt..gt + 1,
            inner: gt + 1..gt + 1,
            dropped: false,
        });
        match parent {
            Some(p) => self.nodes[p.0].children.push(id),
            None => self.roots.push(id),
        }

        let after = gt + 1;
        if self_closing || VOID_ELEMENTS.contains(&lname.as_str()) {
            after
        } else if RAW_TEXT_ELEMENTS.contains(&lname.as_str()) {
            self.consume_raw_text(id, &lname, after)
        } else {
            self.stack.push(OpenEntry {
                node: id,
                inner_start: after,
            });
            after
        }
    }

    /// Capture script/style content as opaque text through the matching
    /// close tag.
    fn consume_raw_text(&mut self, id: NodeId, tag: &str, from: usize) -> usize {
        let close_pat = format!("</{tag}");
        match find_ci(&self.source[from..], &close_pat) {
            Some(rel) => {
                let close_start = from + rel;
                self.nodes[id.0].inner = from..close_start;
                let end = find_byte(self.source.as_bytes(), b'>', close_start)
                    .map(|p| p + 1)
                    .unwrap_or(self.source.len());
                self.nodes[id.0].span.end = end;
                end
            }
            None => {
                // Unterminated raw text runs to end of input.
                self.nodes[id.0].inner = from..self.source.len();
                self.nodes[id.0].span.end = self.source.len();
                self.source.len()
            }
        }
    }

    fn finish(self) -> Document {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut tag_index: HashMap<String, Vec<NodeId>> = HashMap::new();
        let mut class_index: HashMap<String, Vec<NodeId>> = HashMap::new();

        for (idx, node) in self.nodes.iter().enumerate() {
            if node.dropped {
                continue;
            }
            let id = NodeId(idx);
            order.push(id);
            tag_index.entry(node.tag.clone()).or_default().push(id);
            for class in node.classes.iter() {
                class_index.entry(class.to_string()).or_default().push(id);
            }
        }

        Document {
            source: self.source.to_string(),
            nodes: self.nodes,
            roots: self.roots,
            comments: self.comments,
            order,
            tag_index,
            class_index,
        }
    }
}

/// Remove a node from the tree, splicing its children into its parent (or
/// the root list) at the node's position.
fn drop_node(nodes: &mut [Element], roots: &mut Vec<NodeId>, id: NodeId) {
    let children = std::mem::take(&mut nodes[id.0].children);
    let parent = nodes[id.0].parent;
    nodes[id.0].dropped = true;
    for &child in &children {
        nodes[child.0].parent = parent;
    }
    let siblings = match parent {
        Some(p) => &mut nodes[p.0].children,
        None => roots,
    };
    if let Some(pos) = siblings.iter().position(|&n| n == id) {
        siblings.splice(pos..pos + 1, children);
    }
}

fn find_byte(haystack: &[u8], needle: u8, from: usize) -> Option<usize> {
    haystack[from..]
        .iter()
        .position(|&b| b == needle)
        .map(|p| from + p)
}

/// Case-insensitive substring search (needle is ASCII).
fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || h.len() < n.len() {
        return None;
    }
    (0..=h.len() - n.len()).find(|&i| {
        h[i..i + n.len()]
            .iter()
            .zip(n)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
    })
}

/// Read a tag name starting at `from`. Returns the empty string when the
/// character there cannot start a tag.
fn read_tag_name(source: &str, from: usize) -> &str {
    let bytes = source.as_bytes();
    if from >= bytes.len() || !bytes[from].is_ascii_alphabetic() {
        return "";
    }
    let mut end = from + 1;
    while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'-') {
        end += 1;
    }
    &source[from..end]
}

/// Find the end of an open tag, honoring quoted attribute values.
/// Returns `(index of '>', self_closing)`, or `None` if the input ends
/// before the tag does.
fn scan_tag_end(bytes: &[u8], from: usize) -> Option<(usize, bool)> {
    let mut quote: Option<u8> = None;
    let mut i = from;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'>' => {
                    let self_closing = i > from && bytes[i - 1] == b'/';
                    return Some((i, self_closing));
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// Parse the attribute portion of an open tag into an ordered map.
/// Attribute names are lowercased; values keep their raw text (no entity
/// decoding). Valueless attributes map to the empty string.
fn parse_attrs(raw: &str) -> AttrMap {
    let bytes = raw.as_bytes();
    let mut attrs = AttrMap::new();
    let mut i = 0;

    while i < bytes.len() {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }

        let name_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && bytes[i] != b'='
            && bytes[i] != b'/'
        {
            i += 1;
        }
        let name = raw[name_start..i].to_ascii_lowercase();
        if name.is_empty() {
            i += 1;
            continue;
        }

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'=' {
            attrs.set(name, "");
            continue;
        }
        i += 1; // consume '='
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            attrs.set(name, "");
            break;
        }

        let value = if bytes[i] == b'"' || bytes[i] == b'\'' {
            let q = bytes[i];
            i += 1;
            let start = i;
            while i < bytes.len() && bytes[i] != q {
                i += 1;
            }
            let v = &raw[start..i];
            if i < bytes.len() {
                i += 1; // closing quote
            }
            v
        } else {
            let start = i;
            while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            &raw[start..i]
        };
        attrs.set(name, value);
    }

    attrs
}
