//! Extract variable / inline variable

use tree_sitter::Node;

use super::edits::{insert, replace, statement_removal};
use super::{check_identifier, declarator_list_edit, name_taken, Change, RefactorContext, Selection};
use crate::analyzer::complexity::is_logical;
use crate::analyzer::hints::is_side_effect_free;
use crate::analyzer::scope::{DeclKind, RefKind};
use crate::error::RefactorError;
use crate::schema::TextEdit;
use crate::syntax::kinds::{is_expression, NodeKind};
use crate::syntax::query::{
    ancestors, enclosing_statement, exact_nodes, indentation_at, named_children, node_text, smallest_covering,
};
use crate::syntax::Span;

// ============================================================================
// Extract variable
// ============================================================================

pub fn extract_variable(ctx: &RefactorContext, selection: Selection, name: Option<&str>) -> Result<Change, RefactorError> {
    let source = ctx.source();
    let selection = selection.trimmed(source)?;
    let root = ctx.root();
    let invalid = |details: String| RefactorError::InvalidSelection { details };

    let expr = exact_nodes(&root, selection.start, selection.end)
        .into_iter()
        .find(|n| is_expression(n.kind()) && !is_binding_position(n))
        .ok_or_else(|| invalid("selection must be a complete expression".to_string()))?;
    let statement = enclosing_statement(&expr).ok_or_else(|| invalid("expression is not inside a statement".to_string()))?;

    check_evaluation_unchanged(&expr, &statement)?;

    // `const a = 1, b = a + 1;` cannot hoist `a + 1` above `a`
    let region = Span::from_node(&expr);
    let stmt_span = Span::from_node(&statement);
    let uses_own_statement = ctx.scope.references.iter().any(|r| {
        region.contains(&r.span)
            && r.decl
                .map_or(false, |d| ctx.scope.declarations[d].statement == stmt_span)
    });
    if uses_own_statement {
        return Err(invalid("expression depends on a binding of its own statement".to_string()));
    }

    let scope = ctx.scope.scope_at(statement.start_byte());
    let name = match name {
        Some(name) => {
            check_identifier(name)?;
            if name_taken(ctx.scope, name, scope) {
                return Err(RefactorError::NameCollision { name: name.to_string() });
            }
            name.to_string()
        }
        None => fresh_name(ctx, scope),
    };

    let indent = indentation_at(source, statement.start_byte());
    let declaration = format!("const {} = {};\n{}", name, node_text(&expr, source), indent);
    let in_jsx_children = expr
        .parent()
        .map_or(false, |p| matches!(p.kind(), "jsx_element" | "jsx_fragment"));
    let usage = if in_jsx_children { format!("{{{}}}", name) } else { name };

    Ok(Change {
        target_spans: vec![region],
        edits: vec![insert(statement.start_byte(), declaration), replace(region, usage)],
    })
}

/// Identifiers that name a binding rather than read a value
fn is_binding_position(node: &Node) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    let is_field = |field: &str| parent.child_by_field_name(field).map(|c| c.id()) == Some(node.id());
    match parent.kind() {
        "variable_declarator" => is_field("name"),
        "assignment_expression" | "augmented_assignment_expression" => is_field("left"),
        "update_expression" => true,
        "required_parameter" | "optional_parameter" | "formal_parameters" => true,
        "function_declaration" | "function_expression" | "class_declaration" => is_field("name"),
        "import_specifier" | "export_specifier" | "import_clause" | "namespace_import" => true,
        _ => false,
    }
}

/// Reject selections whose evaluation is conditional, repeated or deferred
fn check_evaluation_unchanged(expr: &Node, statement: &Node) -> Result<(), RefactorError> {
    let invalid = |details: &str| {
        Err(RefactorError::InvalidSelection {
            details: details.to_string(),
        })
    };
    let mut child = *expr;
    for ancestor in ancestors(expr) {
        if ancestor.id() == statement.id() {
            break;
        }
        if NodeKind::of(&ancestor).is_function_like() {
            return invalid("expression is evaluated inside a nested function");
        }
        match ancestor.kind() {
            "ternary_expression" if !is_field(&ancestor, "condition", &child) => {
                return invalid("expression is a conditional branch");
            }
            "binary_expression" if is_logical(&ancestor) && is_field(&ancestor, "right", &child) => {
                return invalid("expression is short-circuited");
            }
            _ => {}
        }
        child = ancestor;
    }

    // Only some statement parts run exactly once, before the statement
    let allowed = match statement.kind() {
        "if_statement" => statement.child_by_field_name("condition"),
        "switch_statement" => statement.child_by_field_name("value"),
        "expression_statement" | "return_statement" | "throw_statement" | "lexical_declaration"
        | "variable_declaration" | "export_statement" => Some(*statement),
        _ => None,
    };
    match allowed {
        Some(part) if Span::from_node(&part).contains(&Span::from_node(expr)) => Ok(()),
        _ => invalid("expression is not evaluated exactly once per statement"),
    }
}

fn is_field(parent: &Node, field: &str, child: &Node) -> bool {
    parent.child_by_field_name(field).map(|c| c.id()) == Some(child.id())
}

fn fresh_name(ctx: &RefactorContext, scope: usize) -> String {
    let mut index = 1;
    loop {
        let candidate = if index == 1 {
            "value".to_string()
        } else {
            format!("value{}", index)
        };
        if !name_taken(ctx.scope, &candidate, scope) {
            return candidate;
        }
        index += 1;
    }
}

// ============================================================================
// Inline variable
// ============================================================================

pub fn inline_variable(ctx: &RefactorContext, position: usize) -> Result<Change, RefactorError> {
    let model = ctx.scope;
    let source = ctx.source();
    let root = ctx.root();
    let unsupported = |details: String| RefactorError::UnsupportedTarget { details };

    let decl_id = model
        .declaration_at(position)
        .ok_or_else(|| RefactorError::SymbolNotFound {
            details: format!("no binding at offset {}", position),
        })?;
    let decl = &model.declarations[decl_id];
    if !matches!(decl.kind, DeclKind::Const | DeclKind::Let | DeclKind::Var) {
        return Err(unsupported(format!("'{}' is not a variable", decl.name)));
    }
    if decl.exported {
        return Err(unsupported(format!("'{}' is exported", decl.name)));
    }
    let declarator_span = decl
        .declarator
        .ok_or_else(|| unsupported(format!("'{}' is a loop variable", decl.name)))?;
    let declarator = smallest_covering(&root, declarator_span.start, declarator_span.end)
        .filter(|n| n.kind() == "variable_declarator")
        .ok_or_else(|| unsupported(format!("declaration of '{}' not found", decl.name)))?;
    if declarator.child_by_field_name("name").map(|n| n.kind()) != Some("identifier") {
        return Err(unsupported(format!("'{}' is destructured", decl.name)));
    }
    let value = declarator
        .child_by_field_name("value")
        .ok_or_else(|| unsupported(format!("'{}' has no initializer", decl.name)))?;

    let references: Vec<_> = model.references_to(decl_id).collect();
    if references.iter().any(|r| r.is_write) {
        return Err(RefactorError::MutatedBeforeUse { name: decl.name.clone() });
    }
    if references.iter().any(|r| r.kind == RefKind::JsxName) {
        return Err(unsupported(format!("'{}' is rendered as a JSX element", decl.name)));
    }
    if references.iter().any(|r| declarator_span.contains(&r.span)) {
        return Err(unsupported(format!("'{}' refers to itself", decl.name)));
    }

    // Effects must still run exactly once
    if !is_side_effect_free(&value) {
        let repeated = references.len() > 1
            || references.iter().any(|r| ctx.is_deferred(r, decl_id) || inside_loop(ctx, r.span, decl.statement));
        if repeated {
            return Err(RefactorError::UnsafeTransform {
                details: format!("initializer of '{}' has side effects", decl.name),
            });
        }
    }

    // Names read by the initializer must mean the same thing at every use
    let value_span = Span::from_node(&value);
    for inner in model.references.iter().filter(|r| value_span.contains(&r.span)) {
        if let Some(target) = inner.decl {
            if model.references_to(target).any(|r| r.is_write) {
                return Err(RefactorError::UnsafeTransform {
                    details: format!("'{}' changes between declaration and use", inner.name),
                });
            }
        }
        for usage in &references {
            if model.lookup(&inner.name, usage.scope) != inner.decl {
                return Err(RefactorError::UnsafeTransform {
                    details: format!("'{}' resolves differently at line {}", inner.name, usage.span.start_line),
                });
            }
        }
    }

    // A member callee would be called with a different `this`
    let callees: Vec<bool> = references.iter().map(|r| in_callee_position(&root, r.span)).collect();
    if callees.iter().any(|c| *c) && matches!(value.kind(), "member_expression" | "subscript_expression") {
        return Err(RefactorError::UnsafeTransform {
            details: format!("calling the inlined '{}' would change its receiver", decl.name),
        });
    }

    let value_text = node_text(&value, source);
    let replacement = if is_primary(&value) {
        value_text.to_string()
    } else {
        format!("({})", value_text)
    };
    let callee_replacement = if value.kind() == "call_expression" {
        format!("({})", value_text)
    } else {
        replacement.clone()
    };

    let mut edits: Vec<TextEdit> = references
        .iter()
        .zip(&callees)
        .map(|(r, callee)| match r.kind {
            RefKind::Shorthand => replace(r.span, format!("{}: {}", r.name, replacement)),
            _ if *callee => replace(r.span, callee_replacement.clone()),
            _ => replace(r.span, replacement.clone()),
        })
        .collect();
    edits.push(removal_edit(ctx, &declarator, decl.statement)?);

    let mut target_spans = vec![decl.name_span];
    target_spans.extend(references.iter().map(|r| r.span));
    Ok(Change { target_spans, edits })
}

/// Loop between the declaring statement and the use site
fn inside_loop(ctx: &RefactorContext, usage: Span, statement: Span) -> bool {
    let root = ctx.root();
    let Some(node) = smallest_covering(&root, usage.start, usage.end) else {
        return false;
    };
    ancestors(&node)
        .take_while(|a| !Span::from_node(a).contains(&statement))
        .any(|a| NodeKind::of(&a).is_loop())
}

/// Use site is the callee of a call, a `new` or a tagged template
fn in_callee_position(root: &Node, usage: Span) -> bool {
    let Some(node) = smallest_covering(root, usage.start, usage.end) else {
        return false;
    };
    let Some(parent) = node.parent() else {
        return false;
    };
    match parent.kind() {
        "call_expression" => is_field(&parent, "function", &node),
        "new_expression" => is_field(&parent, "constructor", &node),
        _ => false,
    }
}

fn is_primary(node: &Node) -> bool {
    matches!(
        node.kind(),
        "identifier"
            | "number"
            | "string"
            | "template_string"
            | "true"
            | "false"
            | "null"
            | "undefined"
            | "this"
            | "regex"
            | "member_expression"
            | "subscript_expression"
            | "call_expression"
            | "parenthesized_expression"
            | "array"
    )
}

/// Drop the declarator, or the whole statement when it is the only one
fn removal_edit(ctx: &RefactorContext, declarator: &Node, statement: Span) -> Result<TextEdit, RefactorError> {
    let source = ctx.source();
    let declaration = declarator.parent().ok_or_else(|| RefactorError::UnsupportedTarget {
        details: "declarator without declaration".to_string(),
    })?;
    let siblings: Vec<Node> = named_children(&declaration)
        .into_iter()
        .filter(|c| c.kind() == "variable_declarator")
        .collect();
    if siblings.len() <= 1 {
        let (start, end) = statement_removal(source, statement);
        return Ok(TextEdit {
            start,
            end,
            new_text: String::new(),
        });
    }
    let kept: Vec<Node> = siblings.into_iter().filter(|d| d.id() != declarator.id()).collect();
    declarator_list_edit(&declaration, &kept, source).ok_or_else(|| RefactorError::UnsupportedTarget {
        details: "empty declaration".to_string(),
    })
}
