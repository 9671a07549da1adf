//! Per-function metrics: cyclomatic complexity, parameters and type coverage

use tree_sitter::Node;

use crate::schema::FunctionStyle;
use crate::syntax::kinds::NodeKind;
use crate::syntax::query::{function_name, has_token, named_children, node_text};
use crate::syntax::{traverse, Visit};

/// Name of a function that is reported on its own
///
/// Function declarations, methods and expressions bound to a variable are
/// named; callbacks passed as arguments or used as object values are not,
/// and their decision points count toward the enclosing function.
pub fn declared_name(node: &Node, source: &str) -> Option<String> {
    if !NodeKind::of(node).is_function_like() {
        return None;
    }
    if node.parent().map_or(false, |p| p.kind() == "pair") {
        return None;
    }
    function_name(node, source).filter(|n| !n.is_empty())
}

/// 1 + decision points, not descending into nested named functions
pub fn cyclomatic(func: &Node, source: &str) -> usize {
    let root_id = func.id();
    let mut count = 1;
    traverse(*func, |n| {
        if n.id() != root_id && declared_name(&n, source).is_some() {
            return Visit::SkipSubtree;
        }
        match n.kind() {
            "if_statement" | "ternary_expression" | "switch_case" | "catch_clause"
            | "for_statement" | "for_in_statement" | "while_statement" | "do_statement" => count += 1,
            "binary_expression" if is_logical(&n) => count += 1,
            _ => {}
        }
        Visit::Continue
    });
    count
}

/// `&&` or `||`
pub fn is_logical(node: &Node) -> bool {
    node.kind() == "binary_expression"
        && node
            .child_by_field_name("operator")
            .map_or(false, |op| matches!(op.kind(), "&&" | "||"))
}

/// Formal parameter nodes, skipping comments and `this` parameters
pub fn parameters<'t>(func: &Node<'t>) -> Vec<Node<'t>> {
    if let Some(params) = func.child_by_field_name("parameters") {
        return named_children(&params)
            .into_iter()
            .filter(|p| p.kind() != "comment")
            .filter(|p| {
                p.child_by_field_name("pattern")
                    .map_or(true, |pattern| pattern.kind() != "this")
            })
            .collect();
    }
    func.child_by_field_name("parameter").into_iter().collect()
}

pub fn style_of(func: &Node) -> FunctionStyle {
    match NodeKind::of(func) {
        NodeKind::ArrowFunction => FunctionStyle::Arrow,
        NodeKind::FunctionExpression => FunctionStyle::Expression,
        NodeKind::Method => FunctionStyle::Method,
        _ => FunctionStyle::Declaration,
    }
}

pub fn is_async(func: &Node) -> bool {
    has_token(func, "async")
}

/// (annotated, total) type slots: every parameter plus the return type
pub fn type_slots(func: &Node, source: &str) -> (usize, usize) {
    let params = parameters(func);
    let mut total = params.len();
    let mut annotated = params
        .iter()
        .filter(|p| p.child_by_field_name("type").is_some())
        .count();

    // Constructors and setters take no return annotation
    let no_return_slot = func.kind() == "method_definition"
        && (has_token(func, "set")
            || func
                .child_by_field_name("name")
                .map_or(false, |n| node_text(&n, source) == "constructor"));
    if !no_return_slot {
        total += 1;
        if func.child_by_field_name("return_type").is_some() {
            annotated += 1;
        }
    }
    (annotated, total)
}
