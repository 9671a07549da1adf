//! Extract function / extract component

use tree_sitter::Node;

use super::edits::{insert, replace};
use super::{check_identifier, name_taken, reindent, Change, RefactorContext, Selection};
use crate::analyzer::hints::uses_this_binding;
use crate::analyzer::scope::{DeclKind, RefKind, MODULE_SCOPE};
use crate::error::RefactorError;
use crate::syntax::kinds::{is_statement, is_statement_container, NodeKind};
use crate::syntax::query::{
    ancestors, callee_name, contains_matching, exact_nodes, has_token, indentation_at, is_capitalized, is_hook_name,
    named_children, node_text, smallest_covering, top_level_statement,
};
use crate::syntax::{visit_all, Span};

// ============================================================================
// Extract function
// ============================================================================

pub fn extract_function(ctx: &RefactorContext, selection: Selection, name: &str) -> Result<Change, RefactorError> {
    check_identifier(name)?;
    let source = ctx.source();
    let selection = selection.trimmed(source)?;
    let statements = select_statements(ctx, selection)?;
    let (first, last) = match (statements.first(), statements.last()) {
        (Some(f), Some(l)) => (*f, *l),
        _ => {
            return Err(RefactorError::InvalidSelection {
                details: "selection contains no statements".to_string(),
            })
        }
    };
    let region = Span::from_node(&first);
    let region = Span {
        end: last.end_byte(),
        end_line: last.end_position().row + 1,
        end_column: last.end_position().column,
        ..region
    };

    for stmt in &statements {
        check_control_flow(stmt, &region, source)?;
        if uses_this_binding(stmt, source) {
            return Err(RefactorError::ThisBinding {
                details: "selection uses `this`, `super` or `arguments`".to_string(),
            });
        }
    }

    if name_taken(ctx.scope, name, ctx.scope.scope_at(region.start)) {
        return Err(RefactorError::NameCollision { name: name.to_string() });
    }

    let params = captured_locals(ctx, &region)?;
    let returned = escaping_locals(ctx, &region)?;
    let is_async = statements.iter().any(|s| {
        contains_matching(s, true, |n| {
            n.kind() == "await_expression" || (n.kind() == "for_in_statement" && has_token(n, "await"))
        })
    });

    let anchor = top_level_statement(&first).unwrap_or(first);
    let text = &source[region.start..region.end];
    let body = reindent(&first, text, indentation_at(source, region.start), "  ");

    let return_line = match returned.as_slice() {
        [] => String::new(),
        [(single, _)] => format!("\n  return {};", single),
        many => format!(
            "\n  return {{ {} }};",
            many.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>().join(", ")
        ),
    };
    let function = format!(
        "\n\n{}function {}({}) {{\n{}{}\n}}",
        if is_async { "async " } else { "" },
        name,
        params.join(", "),
        body,
        return_line
    );

    let call = format!("{}{}({})", if is_async { "await " } else { "" }, name, params.join(", "));
    let keyword = if returned.iter().any(|(_, mutable)| *mutable) { "let" } else { "const" };
    let replacement = match returned.as_slice() {
        [] => format!("{};", call),
        [(single, _)] => format!("{} {} = {};", keyword, single, call),
        many => format!(
            "{} {{ {} }} = {};",
            keyword,
            many.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>().join(", "),
            call
        ),
    };

    Ok(Change {
        target_spans: vec![region],
        edits: vec![replace(region, replacement), insert(anchor.end_byte(), function)],
    })
}

/// Complete statements of one statement list matching the selection exactly
fn select_statements<'t>(ctx: &RefactorContext<'t>, selection: Selection) -> Result<Vec<Node<'t>>, RefactorError> {
    let root = ctx.root();
    let (start, end) = (selection.start, selection.end);
    let invalid = || RefactorError::InvalidSelection {
        details: "selection must cover complete statements of one block".to_string(),
    };

    let mut current = smallest_covering(&root, start, end);
    while let Some(node) = current {
        if is_statement_container(node.kind()) {
            let children = named_children(&node);
            let partial = children.iter().any(|c| {
                let overlaps = c.start_byte() < end && c.end_byte() > start;
                let inside = c.start_byte() >= start && c.end_byte() <= end;
                overlaps && !inside
            });
            if partial {
                return Err(invalid());
            }
            let inside: Vec<Node> = children
                .into_iter()
                .filter(|c| c.start_byte() >= start && c.end_byte() <= end)
                .collect();
            let bounds_match = inside.first().map(|n| n.start_byte()) == Some(start)
                && inside.last().map(|n| n.end_byte()) == Some(end);
            if bounds_match {
                let statements: Vec<Node> = inside.into_iter().filter(|c| c.kind() != "comment").collect();
                if statements.is_empty() || !statements.iter().all(|s| is_statement(s.kind())) {
                    return Err(invalid());
                }
                return Ok(statements);
            }
        }
        current = node.parent();
    }
    Err(invalid())
}

/// `return`, `yield` and jumps that would leave the extracted body
fn check_control_flow(stmt: &Node, region: &Span, source: &str) -> Result<(), RefactorError> {
    let mut problem: Option<String> = None;
    let root_id = stmt.id();
    crate::syntax::traverse(*stmt, |n| {
        if problem.is_some() || (n.id() != root_id && NodeKind::of(&n).is_function_like()) {
            return crate::syntax::Visit::SkipSubtree;
        }
        match n.kind() {
            "return_statement" => problem = Some("selection contains `return`".to_string()),
            "yield_expression" => problem = Some("selection contains `yield`".to_string()),
            "break_statement" | "continue_statement" if !jump_target_inside(&n, region, source) => {
                problem = Some(format!("`{}` jumps out of the selection", node_text(&n, source)))
            }
            _ => {}
        }
        crate::syntax::Visit::Continue
    });
    match problem {
        Some(details) => Err(RefactorError::InvalidSelection { details }),
        None => Ok(()),
    }
}

fn jump_target_inside(jump: &Node, region: &Span, source: &str) -> bool {
    let label = jump
        .child_by_field_name("label")
        .map(|l| node_text(&l, source).to_string());
    let is_break = jump.kind() == "break_statement";
    for ancestor in ancestors(jump) {
        if !region.contains(&Span::from_node(&ancestor)) {
            return false;
        }
        match &label {
            Some(label) => {
                if ancestor.kind() == "labeled_statement"
                    && ancestor
                        .child_by_field_name("label")
                        .map_or(false, |l| node_text(&l, source) == label)
                {
                    return true;
                }
            }
            None => {
                if NodeKind::of(&ancestor).is_loop() || (is_break && ancestor.kind() == "switch_statement") {
                    return true;
                }
            }
        }
    }
    false
}

/// Function-local bindings read inside `region` but declared outside it, in first-use order
fn captured_locals(ctx: &RefactorContext, region: &Span) -> Result<Vec<String>, RefactorError> {
    let mut refs: Vec<_> = ctx
        .scope
        .references
        .iter()
        .filter(|r| region.contains(&r.span))
        .collect();
    refs.sort_by_key(|r| r.span.start);

    let mut names: Vec<String> = Vec::new();
    for r in refs {
        let Some(id) = r.decl else { continue };
        let decl = &ctx.scope.declarations[id];
        if decl.scope == MODULE_SCOPE || region.contains(&decl.name_span) {
            continue;
        }
        if r.is_write {
            return Err(RefactorError::InvalidSelection {
                details: format!("selection assigns to outer local '{}'", decl.name),
            });
        }
        if r.kind == RefKind::Type || decl.kind == DeclKind::Type {
            return Err(RefactorError::InvalidSelection {
                details: format!("selection uses local type '{}'", decl.name),
            });
        }
        if !names.contains(&decl.name) {
            names.push(decl.name.clone());
        }
    }
    Ok(names)
}

/// Bindings declared inside `region` and used after it, with whether they are reassigned
fn escaping_locals(ctx: &RefactorContext, region: &Span) -> Result<Vec<(String, bool)>, RefactorError> {
    let mut out: Vec<(usize, String, bool)> = Vec::new();
    for (id, decl) in ctx.scope.declarations.iter().enumerate() {
        if !region.contains(&decl.name_span) {
            continue;
        }
        let outside: Vec<_> = ctx
            .scope
            .references_to(id)
            .filter(|r| !region.contains(&r.span))
            .collect();
        if outside.is_empty() {
            continue;
        }
        if outside.iter().any(|r| r.span.start < region.start) {
            return Err(RefactorError::InvalidSelection {
                details: format!("'{}' is used before the selection", decl.name),
            });
        }
        let mutable = outside.iter().any(|r| r.is_write);
        out.push((decl.name_span.start, decl.name.clone(), mutable));
    }
    out.sort_by_key(|(start, _, _)| *start);
    Ok(out.into_iter().map(|(_, name, mutable)| (name, mutable)).collect())
}

// ============================================================================
// Extract component
// ============================================================================

pub fn extract_component(ctx: &RefactorContext, selection: Selection, name: &str) -> Result<Change, RefactorError> {
    check_identifier(name)?;
    if !is_capitalized(name) {
        return Err(RefactorError::InvalidName { name: name.to_string() });
    }
    let source = ctx.source();
    let selection = selection.trimmed(source)?;
    let root = ctx.root();
    let element = exact_nodes(&root, selection.start, selection.end)
        .into_iter()
        .find(|n| NodeKind::of(n).is_jsx())
        .ok_or_else(|| RefactorError::InvalidSelection {
            details: "selection must be a complete JSX element".to_string(),
        })?;
    let region = Span::from_node(&element);

    if let Some(hook) = first_hook_call(&element, source) {
        return Err(RefactorError::HookNotHoistable { hook });
    }
    if uses_this_binding(&element, source) {
        return Err(RefactorError::ThisBinding {
            details: "JSX uses `this`".to_string(),
        });
    }
    if name_taken(ctx.scope, name, ctx.scope.scope_at(region.start)) {
        return Err(RefactorError::NameCollision { name: name.to_string() });
    }

    let props = captured_locals(ctx, &region)?;
    let anchor = top_level_statement(&element).unwrap_or(element);
    let body = reindent(
        &element,
        node_text(&element, source),
        indentation_at(source, region.start),
        "    ",
    );

    let signature = if props.is_empty() {
        String::new()
    } else {
        format!("{{ {} }}", props.join(", "))
    };
    let component = format!(
        "\n\nfunction {}({}) {{\n  return (\n{}\n  );\n}}",
        name, signature, body
    );
    let usage = if props.is_empty() {
        format!("<{} />", name)
    } else {
        let attrs: Vec<String> = props.iter().map(|p| format!("{}={{{}}}", p, p)).collect();
        format!("<{} {} />", name, attrs.join(" "))
    };

    Ok(Change {
        target_spans: vec![region],
        edits: vec![replace(region, usage), insert(anchor.end_byte(), component)],
    })
}

fn first_hook_call(node: &Node, source: &str) -> Option<String> {
    let mut found = None;
    visit_all(*node, |n| {
        if found.is_some() || n.kind() != "call_expression" {
            return;
        }
        if let Some((callee, object)) = callee_name(&n, source) {
            let object_ok = object.as_deref().map_or(true, |o| o == "React");
            if object_ok && is_hook_name(&callee) {
                found = Some(callee);
            }
        }
    });
    found
}
