//! Node lookup helpers shared by the analyzer and the refactorer

use once_cell::sync::Lazy;
use regex::Regex;
use tree_sitter::Node;

use super::kinds::{is_statement_container, NodeKind};
use super::{traverse, Visit};

static HOOK_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^use[A-Z0-9]").expect("valid hook regex"));

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("valid identifier regex"));

const RESERVED_WORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "enum", "export", "extends", "false", "finally", "for", "function", "if",
    "import", "in", "instanceof", "new", "null", "return", "super", "switch", "this", "throw",
    "true", "try", "typeof", "var", "void", "while", "with", "yield", "let", "static",
    "implements", "interface", "package", "private", "protected", "public", "await", "async",
    "undefined",
];

/// Get the source text covered by a node
pub fn node_text<'s>(node: &Node, source: &'s str) -> &'s str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// Owned text of a node
pub fn get_node_text(node: &Node, source: &str) -> String {
    node_text(node, source).to_string()
}

pub fn children<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

pub fn named_children<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Ancestors from the parent upward
pub fn ancestors<'t>(node: &Node<'t>) -> impl Iterator<Item = Node<'t>> {
    std::iter::successors(node.parent(), |n| n.parent())
}

/// Whether an anonymous token (e.g. `default`, `type`, `async`) is a direct child
pub fn has_token(node: &Node, token: &str) -> bool {
    children(node).iter().any(|c| !c.is_named() && c.kind() == token)
}

/// Innermost named node covering the byte range
pub fn smallest_covering<'t>(root: &Node<'t>, start: usize, end: usize) -> Option<Node<'t>> {
    root.named_descendant_for_byte_range(start, end)
}

/// Named nodes spanning exactly `[start, end)`, innermost first
pub fn exact_nodes<'t>(root: &Node<'t>, start: usize, end: usize) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    let mut current = smallest_covering(root, start, end);
    while let Some(node) = current {
        if node.start_byte() == start && node.end_byte() == end {
            if node.is_named() {
                out.push(node);
            }
        } else if node.start_byte() < start || node.end_byte() > end {
            break;
        }
        current = node.parent();
    }
    out
}

/// Strip any number of wrapping parentheses
pub fn unwrap_parens<'t>(node: Node<'t>) -> Node<'t> {
    let mut current = node;
    while current.kind() == "parenthesized_expression" {
        match named_children(&current).into_iter().next() {
            Some(inner) => current = inner,
            None => break,
        }
    }
    current
}

/// The statement that directly sits in a block, program or switch case
pub fn enclosing_statement<'t>(node: &Node<'t>) -> Option<Node<'t>> {
    let mut current = *node;
    loop {
        let parent = current.parent()?;
        if is_statement_container(parent.kind()) {
            return Some(current);
        }
        current = parent;
    }
}

/// The outermost statement under `program` that contains the node
pub fn top_level_statement<'t>(node: &Node<'t>) -> Option<Node<'t>> {
    let mut current = *node;
    loop {
        let parent = current.parent()?;
        if parent.kind() == "program" {
            return Some(current);
        }
        current = parent;
    }
}

/// Check whether any node below matches, optionally not descending into nested functions
pub fn contains_matching<F>(node: &Node, stop_at_functions: bool, mut pred: F) -> bool
where
    F: FnMut(&Node) -> bool,
{
    let root_id = node.id();
    let mut found = false;
    traverse(*node, |n| {
        if found {
            return Visit::SkipSubtree;
        }
        if n.id() != root_id && stop_at_functions && NodeKind::of(&n).is_function_like() {
            return Visit::SkipSubtree;
        }
        if pred(&n) {
            found = true;
            return Visit::SkipSubtree;
        }
        Visit::Continue
    });
    found
}

/// Name and receiver of a call's callee: `a.b.c()` → ("c", Some("a.b"))
pub fn callee_name(call: &Node, source: &str) -> Option<(String, Option<String>)> {
    let func = call.child_by_field_name("function")?;
    match func.kind() {
        "identifier" => Some((get_node_text(&func, source), None)),
        "member_expression" => {
            let property = func.child_by_field_name("property")?;
            let object = func
                .child_by_field_name("object")
                .map(|o| get_node_text(&o, source));
            Some((get_node_text(&property, source), object))
        }
        _ => None,
    }
}

/// First argument node of a call, skipping punctuation
pub fn call_arguments<'t>(call: &Node<'t>) -> Vec<Node<'t>> {
    call.child_by_field_name("arguments")
        .map(|args| {
            named_children(&args)
                .into_iter()
                .filter(|n| n.kind() != "comment")
                .collect()
        })
        .unwrap_or_default()
}

/// `memo(...)`, `React.memo(...)`, `forwardRef(...)` and friends
pub fn component_wrapper(call: &Node, source: &str) -> Option<&'static str> {
    if call.kind() != "call_expression" {
        return None;
    }
    let (name, object) = callee_name(call, source)?;
    let object_ok = object.as_deref().map_or(true, |o| o == "React");
    match name.as_str() {
        "memo" if object_ok => Some("memo"),
        "forwardRef" if object_ok => Some("forwardRef"),
        _ => None,
    }
}

/// Resolve the binding name of a function-like node
///
/// Declarations use their own name; expressions take the name of the
/// variable they are bound to, looking through component wrappers such as
/// `const Button = memo(() => ...)`.
pub fn function_name(node: &Node, source: &str) -> Option<String> {
    match node.kind() {
        "function_declaration" | "generator_function_declaration" | "method_definition" => node
            .child_by_field_name("name")
            .map(|n| get_node_text(&n, source)),
        "function_expression" | "generator_function" | "arrow_function" => {
            let mut current = *node;
            loop {
                let parent = current.parent()?;
                match parent.kind() {
                    "variable_declarator" => {
                        let name = parent.child_by_field_name("name")?;
                        return (name.kind() == "identifier").then(|| get_node_text(&name, source));
                    }
                    "parenthesized_expression" => current = parent,
                    "arguments" => {
                        let call = parent.parent()?;
                        component_wrapper(&call, source)?;
                        current = call;
                    }
                    "export_statement" => return Some("default".to_string()),
                    "pair" => {
                        let key = parent.child_by_field_name("key")?;
                        return Some(get_node_text(&key, source));
                    }
                    _ => {
                        return node
                            .child_by_field_name("name")
                            .map(|n| get_node_text(&n, source));
                    }
                }
            }
        }
        _ => None,
    }
}

pub fn is_hook_name(name: &str) -> bool {
    HOOK_NAME.is_match(name)
}

pub fn is_capitalized(name: &str) -> bool {
    name.chars().next().map_or(false, |c| c.is_ascii_uppercase())
}

/// Valid, non-reserved JavaScript identifier
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name) && !RESERVED_WORDS.contains(&name)
}

/// Byte offset of the start of the line containing `offset`
pub fn line_start(text: &str, offset: usize) -> usize {
    text[..offset.min(text.len())].rfind('\n').map_or(0, |i| i + 1)
}

/// Byte offset just past the newline ending the line containing `offset`
pub fn line_end_inclusive(text: &str, offset: usize) -> usize {
    let offset = offset.min(text.len());
    text[offset..].find('\n').map_or(text.len(), |i| offset + i + 1)
}

/// Leading whitespace of the line containing `offset`
pub fn indentation_at(text: &str, offset: usize) -> &str {
    let start = line_start(text, offset);
    let line = &text[start..];
    let width = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..width]
}
