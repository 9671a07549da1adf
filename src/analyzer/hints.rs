//! Refactor candidates offered alongside an analysis

use tree_sitter::Node;

use super::modules::{imports_sorted, unused_import_locals};
use super::scope::{DeclKind, ScopeModel};
use crate::config::Config;
use crate::schema::{AnalysisResult, BindingKind, OperationKind, RefactorHint, Span};
use crate::syntax::kinds::NodeKind;
use crate::syntax::query::{named_children, node_text, smallest_covering, unwrap_parens};
use crate::syntax::{traverse, visit_all, LineIndex, SyntaxTree, Visit};

/// Evaluating the expression cannot observably change program state
///
/// Calls, `new`, assignments, `await` and `delete` are effects; member reads
/// are treated as pure.
pub fn is_side_effect_free(expr: &Node) -> bool {
    let expr = unwrap_parens(*expr);
    match expr.kind() {
        "number" | "string" | "true" | "false" | "null" | "undefined" | "regex" | "identifier" | "this"
        | "arrow_function" | "function_expression" | "class" | "jsx_element"
        | "jsx_self_closing_element" | "jsx_fragment" => true,
        "unary_expression" => {
            !expr
                .child_by_field_name("operator")
                .map_or(false, |op| op.kind() == "delete")
                && named_children(&expr).iter().all(is_side_effect_free)
        }
        "template_string" | "template_substitution" | "array" | "object" | "pair" | "spread_element"
        | "binary_expression" | "ternary_expression" | "member_expression" | "subscript_expression"
        | "as_expression" | "satisfies_expression" | "non_null_expression" | "property_identifier"
        | "string_fragment" | "escape_sequence" | "computed_property_name" | "shorthand_property_identifier" => {
            named_children(&expr)
                .iter()
                .filter(|c| !is_type_node(c.kind()))
                .all(is_side_effect_free)
        }
        _ => false,
    }
}

fn is_type_node(kind: &str) -> bool {
    kind == "comment" || kind == "type_identifier" || kind.ends_with("_type") || kind == "type_arguments"
}

pub fn collect(tree: &SyntaxTree, scope: &ScopeModel, analysis: &AnalysisResult, config: &Config) -> Vec<RefactorHint> {
    let root = tree.root();
    let source = tree.source();
    let mut hints = Vec::new();

    // Imports
    if let (Some(first), Some(last)) = (analysis.imports.first(), analysis.imports.last()) {
        let has_jsx = super::modules::contains_jsx(&root);
        let unused = unused_import_locals(scope, &analysis.imports, has_jsx);
        let sorted = imports_sorted(&analysis.imports);
        if !unused.is_empty() || !sorted {
            let reason = match (unused.is_empty(), sorted) {
                (false, true) => format!("unused imports: {}", unused.join(", ")),
                (true, false) => "imports are not grouped and sorted".to_string(),
                _ => format!("unsorted imports; unused: {}", unused.join(", ")),
            };
            hints.push(RefactorHint {
                operation: OperationKind::OrganizeImports,
                target_span: span_between(tree, first.span, last.span),
                reason,
            });
        }
    }

    // Dead top-level bindings
    for binding in &analysis.bindings {
        if binding.is_exported || binding.references > 0 || binding.kind == BindingKind::Import {
            continue;
        }
        if binding.kind == BindingKind::Variable && !initializer_is_pure(tree, scope, &binding.name) {
            continue;
        }
        hints.push(RefactorHint {
            operation: OperationKind::RemoveDeadCode,
            target_span: binding.span,
            reason: format!("'{}' is never referenced", binding.name),
        });
    }

    // Complex functions
    for func in &analysis.functions {
        if func.cyclomatic_complexity > config.complexity_warning_threshold {
            hints.push(RefactorHint {
                operation: OperationKind::ExtractFunction,
                target_span: func.span,
                reason: format!(
                    "'{}' has complexity {} (threshold {})",
                    func.name, func.cyclomatic_complexity, config.complexity_warning_threshold
                ),
            });
        }
    }

    // Block-bodied arrows bound to const
    visit_all(root, |n| {
        if n.kind() != "arrow_function" || !is_convertible_arrow(&n, source) {
            return;
        }
        if let Some(decl) = n.parent().and_then(|p| p.parent()) {
            let name = n
                .parent()
                .and_then(|p| p.child_by_field_name("name"))
                .map(|name| node_text(&name, source).to_string())
                .unwrap_or_default();
            hints.push(RefactorHint {
                operation: OperationKind::ConvertFunctionStyle,
                target_span: Span::from_node(&decl),
                reason: format!("'{}' can be a function declaration", name),
            });
        }
    });

    hints.sort_by(|a, b| {
        (a.target_span.start, a.operation).cmp(&(b.target_span.start, b.operation))
    });
    hints
}

/// `const f = () => { ... }` with no `this` or `arguments` inside
pub fn is_convertible_arrow(arrow: &Node, source: &str) -> bool {
    let block_body = arrow
        .child_by_field_name("body")
        .map_or(false, |b| b.kind() == "statement_block");
    let Some(declarator) = arrow.parent().filter(|p| p.kind() == "variable_declarator") else {
        return false;
    };
    let bound_to_const = declarator.parent().map_or(false, |d| {
        d.kind() == "lexical_declaration"
            && d.child_by_field_name("kind").map_or(false, |k| node_text(&k, source) == "const")
            && named_children(&d).iter().filter(|c| c.kind() == "variable_declarator").count() == 1
    });
    let simple_name = declarator
        .child_by_field_name("name")
        .map_or(false, |n| n.kind() == "identifier");
    block_body && bound_to_const && simple_name && !uses_this_binding(arrow, source)
}

/// `this`, `super` or `arguments` reachable without crossing a function that rebinds them
pub fn uses_this_binding(func: &Node, source: &str) -> bool {
    let root_id = func.id();
    let mut found = false;
    traverse(*func, |n| {
        if found || (n.id() != root_id && NodeKind::of(&n).binds_this()) {
            return Visit::SkipSubtree;
        }
        if matches!(n.kind(), "this" | "super") || (n.kind() == "identifier" && node_text(&n, source) == "arguments") {
            found = true;
        }
        Visit::Continue
    });
    found
}

fn initializer_is_pure(tree: &SyntaxTree, scope: &ScopeModel, name: &str) -> bool {
    let Some(decl) = scope.declared_in(super::scope::MODULE_SCOPE, name) else {
        return false;
    };
    let decl = &scope.declarations[decl];
    if !matches!(decl.kind, DeclKind::Const | DeclKind::Let | DeclKind::Var) {
        return true;
    }
    let Some(declarator) = decl.declarator else {
        return false;
    };
    let root = tree.root();
    smallest_covering(&root, declarator.start, declarator.end)
        .filter(|n| n.kind() == "variable_declarator")
        .map_or(false, |n| {
            let pattern_is_identifier = n.child_by_field_name("name").map_or(false, |p| p.kind() == "identifier");
            pattern_is_identifier
                && n.child_by_field_name("value").map_or(true, |v| is_side_effect_free(&v))
        })
}

fn span_between(tree: &SyntaxTree, first: Span, last: Span) -> Span {
    LineIndex::new(tree.source()).span(first.start, last.end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::Dialect;
    use crate::syntax::parse;

    fn first_expression<'t>(tree: &'t SyntaxTree) -> Node<'t> {
        let mut found = None;
        visit_all(tree.root(), |n| {
            if found.is_none() && n.kind() == "variable_declarator" {
                found = n.child_by_field_name("value");
            }
        });
        found.unwrap()
    }

    #[test]
    fn test_side_effect_free_expressions() {
        for (src, pure) in [
            ("const a = 1 + b * 2;", true),
            ("const a = { x: [1, 2], y: `t${b}` };", true),
            ("const a = () => run();", true),
            ("const a = run();", false),
            ("const a = new Map();", false),
            ("const a = b ? c : d++;", false),
        ] {
            let tree = parse(src, Dialect::JavaScript).unwrap();
            assert_eq!(is_side_effect_free(&first_expression(&tree)), pure, "{}", src);
        }
    }

    #[test]
    fn test_convertible_arrow() {
        let src = "const a = () => { return 1; };\nconst b = () => 1;\nconst c = () => { return this.x; };\nconst d = () => { return function () { return this; }; };";
        let tree = parse(src, Dialect::JavaScript).unwrap();
        let mut got = Vec::new();
        visit_all(tree.root(), |n| {
            if n.kind() == "arrow_function" {
                got.push(is_convertible_arrow(&n, src));
            }
        });
        assert_eq!(got, vec![true, false, false, true]);
    }
}
