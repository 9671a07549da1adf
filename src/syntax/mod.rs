//! Syntax model: parsing, spans and traversal
//!
//! A thin layer over tree-sitter. The tree owns every node; nodes expose a
//! non-owning `parent()` link for upward walks. Parsing is deterministic, so
//! the same text and dialect always yield the same node kinds and spans,
//! which the analysis cache relies on.

pub mod kinds;
pub mod query;

use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Parser, Tree};

use crate::error::ParseError;
use crate::lang::Dialect;
use crate::utils::{one_line, truncate_with_ellipsis};

pub use kinds::NodeKind;

/// Byte range plus human-readable positions
///
/// Lines are 1-based, columns are 0-based byte offsets within the line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl Span {
    pub fn from_node(node: &Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            start: node.start_byte(),
            end: node.end_byte(),
            start_line: start.row + 1,
            start_column: start.column,
            end_line: end.row + 1,
            end_column: end.column,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn contains_offset(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// "12-18" style line range for reports
    pub fn lines(&self) -> String {
        format!("{}-{}", self.start_line, self.end_line)
    }
}

/// Maps byte offsets to line/column positions
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            line_starts,
            len: text.len(),
        }
    }

    /// (1-based line, 0-based column) of a byte offset, clamped to the text
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        (line + 1, offset - self.line_starts[line])
    }

    pub fn span(&self, start: usize, end: usize) -> Span {
        let (start_line, start_column) = self.position(start);
        let (end_line, end_column) = self.position(end);
        Span {
            start: start.min(self.len),
            end: end.min(self.len),
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

/// Visitor signal for `traverse`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Continue,
    SkipSubtree,
}

/// Depth-first pre-order traversal over every node below (and including) `node`
pub fn traverse<'t, F>(node: Node<'t>, mut visitor: F)
where
    F: FnMut(Node<'t>) -> Visit,
{
    let mut cursor = node.walk();
    loop {
        let current = cursor.node();
        if visitor(current) == Visit::Continue && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// Visit every node; convenience wrapper that never skips
pub fn visit_all<'t, F>(node: Node<'t>, mut f: F)
where
    F: FnMut(Node<'t>),
{
    traverse(node, |n| {
        f(n);
        Visit::Continue
    });
}

/// A parsed source text together with the text it was parsed from
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    tree: Tree,
    source: String,
    dialect: Dialect,
}

impl SyntaxTree {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn text(&self, node: &Node) -> &str {
        query::node_text(node, &self.source)
    }

    /// Node kinds and byte spans in pre-order, for structural comparison
    pub fn fingerprint(&self) -> Vec<(&'static str, usize, usize)> {
        let mut out = Vec::new();
        visit_all(self.root(), |n| out.push((n.kind(), n.start_byte(), n.end_byte())));
        out
    }

    pub fn node_count(&self) -> usize {
        let mut count = 0;
        visit_all(self.root(), |_| count += 1);
        count
    }

    /// The first ERROR or MISSING node in pre-order, if any
    pub fn first_error(&self) -> Option<ParseError> {
        if !self.root().has_error() {
            return None;
        }
        let mut found: Option<ParseError> = None;
        traverse(self.root(), |n| {
            if found.is_some() {
                return Visit::SkipSubtree;
            }
            if n.is_missing() {
                let pos = n.start_position();
                found = Some(ParseError {
                    line: pos.row + 1,
                    column: pos.column + 1,
                    message: format!("missing `{}`", n.kind()),
                });
                return Visit::SkipSubtree;
            }
            if n.is_error() {
                let pos = n.start_position();
                let snippet = truncate_with_ellipsis(&one_line(self.text(&n)), 40);
                found = Some(ParseError {
                    line: pos.row + 1,
                    column: pos.column + 1,
                    message: format!("unexpected `{}`", snippet),
                });
                return Visit::SkipSubtree;
            }
            if n.has_error() {
                Visit::Continue
            } else {
                Visit::SkipSubtree
            }
        });
        found
    }
}

fn parse_tree(text: &str, dialect: Dialect) -> Result<SyntaxTree, ParseError> {
    let mut parser = Parser::new();
    parser
        .set_language(&dialect.tree_sitter_language())
        .map_err(|e| ParseError {
            line: 1,
            column: 1,
            message: format!("failed to load {} grammar: {}", dialect.name(), e),
        })?;

    let tree = parser.parse(text, None).ok_or_else(|| ParseError {
        line: 1,
        column: 1,
        message: "parser produced no tree".to_string(),
    })?;

    Ok(SyntaxTree {
        tree,
        source: text.to_string(),
        dialect,
    })
}

/// Parse source text, failing on the first syntax error
pub fn parse(text: &str, dialect: Dialect) -> Result<SyntaxTree, ParseError> {
    let tree = parse_tree(text, dialect)?;
    match tree.first_error() {
        Some(err) => Err(err),
        None => Ok(tree),
    }
}

/// Parse source text, returning the (possibly partial) tree and the first error
pub fn parse_partial(text: &str, dialect: Dialect) -> Result<(SyntaxTree, Option<ParseError>), ParseError> {
    let tree = parse_tree(text, dialect)?;
    let err = tree.first_error();
    Ok((tree, err))
}
