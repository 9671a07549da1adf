//! Function declaration <-> arrow function conversion

use tree_sitter::Node;

use super::edits::replace;
use super::{Change, RefactorContext};
use crate::analyzer::hints::uses_this_binding;
use crate::error::RefactorError;
use crate::lang::Dialect;
use crate::syntax::query::{ancestors, has_token, indentation_at, named_children, node_text};
use crate::syntax::Span;

enum Target<'t> {
    Declaration(Node<'t>),
    /// The declaration statement and its function-valued initializer
    Bound { declaration: Node<'t>, function: Node<'t> },
}

pub fn convert_function_style(ctx: &RefactorContext, position: usize) -> Result<Change, RefactorError> {
    let node = ctx.node_at(position).ok_or_else(|| RefactorError::UnsupportedTarget {
        details: format!("no function at offset {}", position),
    })?;
    match find_target(&node, ctx.source())? {
        Target::Declaration(func) => declaration_to_arrow(ctx, &func),
        Target::Bound { declaration, function } => bound_to_declaration(ctx, &declaration, &function),
    }
}

fn find_target<'t>(node: &Node<'t>, source: &str) -> Result<Target<'t>, RefactorError> {
    let unsupported = |details: &str| RefactorError::UnsupportedTarget {
        details: details.to_string(),
    };
    for current in std::iter::once(*node).chain(ancestors(node)) {
        match current.kind() {
            "function_declaration" => return Ok(Target::Declaration(current)),
            "generator_function_declaration" | "generator_function" => {
                return Err(unsupported("generators have no arrow form"))
            }
            "method_definition" => return Err(unsupported("methods cannot be converted")),
            "arrow_function" | "function_expression" => {
                let declaration = current
                    .parent()
                    .filter(|p| p.kind() == "variable_declarator")
                    .and_then(|d| d.parent())
                    .ok_or_else(|| unsupported("function is not bound to a variable"))?;
                return Ok(Target::Bound {
                    declaration,
                    function: current,
                });
            }
            "lexical_declaration" | "variable_declaration" => {
                let declarators: Vec<Node> = named_children(&current)
                    .into_iter()
                    .filter(|c| c.kind() == "variable_declarator")
                    .collect();
                let function = declarators
                    .first()
                    .and_then(|d| d.child_by_field_name("value"))
                    .filter(|v| matches!(v.kind(), "arrow_function" | "function_expression"));
                return match function {
                    Some(function) => Ok(Target::Bound {
                        declaration: current,
                        function,
                    }),
                    None => Err(unsupported(&format!(
                        "'{}' is not a function binding",
                        node_text(&current, source).lines().next().unwrap_or("")
                    ))),
                };
            }
            "program" | "class_body" => break,
            _ => {}
        }
    }
    Err(unsupported("no function at position"))
}

// ============================================================================
// Declaration -> arrow
// ============================================================================

fn declaration_to_arrow(ctx: &RefactorContext, func: &Node) -> Result<Change, RefactorError> {
    let source = ctx.source();
    if func
        .parent()
        .map_or(false, |p| p.kind() == "export_statement" && has_token(&p, "default"))
    {
        return Err(RefactorError::UnsupportedTarget {
            details: "`export default function` has no const form".to_string(),
        });
    }
    let name = func.child_by_field_name("name").ok_or_else(|| RefactorError::UnsupportedTarget {
        details: "anonymous function declaration".to_string(),
    })?;
    if uses_this_binding(func, source) {
        return Err(RefactorError::ThisBinding {
            details: format!("'{}' uses `this` or `arguments`", node_text(&name, source)),
        });
    }

    let decl_id = ctx
        .scope
        .declaration_at(name.start_byte())
        .ok_or_else(|| RefactorError::SymbolNotFound {
            details: node_text(&name, source).to_string(),
        })?;
    for reference in ctx.scope.references_to(decl_id) {
        if reference.is_write {
            return Err(RefactorError::UnsafeTransform {
                details: format!("'{}' is reassigned", reference.name),
            });
        }
        // Declarations are hoisted, const bindings are not
        if reference.span.start < func.start_byte() && !ctx.is_deferred(reference, decl_id) {
            return Err(RefactorError::UnsafeTransform {
                details: format!(
                    "'{}' is called on line {} before its declaration",
                    reference.name, reference.span.start_line
                ),
            });
        }
    }

    let type_params = func
        .child_by_field_name("type_parameters")
        .map(|t| arrow_type_parameters(node_text(&t, source), ctx.unit.dialect()))
        .unwrap_or_default();
    let params = func
        .child_by_field_name("parameters")
        .map(|p| node_text(&p, source))
        .unwrap_or("()");
    let return_type = func
        .child_by_field_name("return_type")
        .map(|r| node_text(&r, source))
        .unwrap_or("");
    let body = func
        .child_by_field_name("body")
        .map(|b| node_text(&b, source))
        .unwrap_or("{}");

    let text = format!(
        "const {} = {}{}{}{} => {};",
        node_text(&name, source),
        if has_token(func, "async") { "async " } else { "" },
        type_params,
        params,
        return_type,
        body
    );
    Ok(Change {
        target_spans: vec![Span::from_node(func)],
        edits: vec![replace(Span::from_node(func), text)],
    })
}

/// `<T>` reads as a JSX tag in TSX; a trailing comma disambiguates
fn arrow_type_parameters(text: &str, dialect: Dialect) -> String {
    if dialect == Dialect::Tsx && !text.contains(',') {
        if let Some(inner) = text.strip_suffix('>') {
            return format!("{},>", inner);
        }
    }
    text.to_string()
}

// ============================================================================
// Arrow / function expression -> declaration
// ============================================================================

fn bound_to_declaration(ctx: &RefactorContext, declaration: &Node, function: &Node) -> Result<Change, RefactorError> {
    let source = ctx.source();
    let unsupported = |details: String| RefactorError::UnsupportedTarget { details };

    let declarators: Vec<Node> = named_children(declaration)
        .into_iter()
        .filter(|c| c.kind() == "variable_declarator")
        .collect();
    if declarators.len() != 1 {
        return Err(unsupported("declaration binds several variables".to_string()));
    }
    let declarator = declarators[0];
    let name = declarator
        .child_by_field_name("name")
        .filter(|n| n.kind() == "identifier")
        .ok_or_else(|| unsupported("destructured binding".to_string()))?;
    let name_text = node_text(&name, source);
    if declarator.child_by_field_name("type").is_some() {
        return Err(unsupported(format!("'{}' has a type annotation", name_text)));
    }
    if function.kind() != "arrow_function" && function.child_by_field_name("name").is_some() {
        return Err(unsupported(format!("'{}' is bound to a named function expression", name_text)));
    }
    if function.kind() == "arrow_function" && uses_this_binding(function, source) {
        return Err(RefactorError::ThisBinding {
            details: format!("arrow '{}' captures `this` or `arguments`", name_text),
        });
    }

    let decl_id = ctx
        .scope
        .declaration_at(name.start_byte())
        .ok_or_else(|| RefactorError::SymbolNotFound {
            details: name_text.to_string(),
        })?;
    if ctx.scope.references_to(decl_id).any(|r| r.is_write) {
        return Err(RefactorError::UnsafeTransform {
            details: format!("'{}' is reassigned", name_text),
        });
    }

    let type_params = function
        .child_by_field_name("type_parameters")
        .map(|t| node_text(&t, source).replace(",>", ">"))
        .unwrap_or_default();
    let params = match (function.child_by_field_name("parameters"), function.child_by_field_name("parameter")) {
        (Some(p), _) => node_text(&p, source).to_string(),
        (None, Some(p)) => format!("({})", node_text(&p, source)),
        (None, None) => "()".to_string(),
    };
    let return_type = function
        .child_by_field_name("return_type")
        .map(|r| node_text(&r, source))
        .unwrap_or("");

    let body_node = function
        .child_by_field_name("body")
        .ok_or_else(|| unsupported("function has no body".to_string()))?;
    let body = if body_node.kind() == "statement_block" {
        node_text(&body_node, source).to_string()
    } else {
        let indent = indentation_at(source, declaration.start_byte());
        format!("{{\n{}  return {};\n{}}}", indent, node_text(&body_node, source), indent)
    };

    let text = format!(
        "{}function {}{}{}{} {}",
        if has_token(function, "async") { "async " } else { "" },
        name_text,
        type_params,
        params,
        return_type,
        body
    );
    Ok(Change {
        target_spans: vec![Span::from_node(declaration)],
        edits: vec![replace(Span::from_node(declaration), text)],
    })
}

#[cfg(test)]
mod tests {
    use super::super::tests::plan_for;
    use super::super::RefactorOperation;

    fn convert(path: &str, src: &str, at: &str) -> Result<String, String> {
        let op = RefactorOperation::ConvertFunctionStyle {
            position: src.find(at).unwrap(),
        };
        plan_for(path, src, op)
            .map(|p| p.proposed_text)
            .map_err(|e| e.reason().to_string())
    }

    #[test]
    fn test_declaration_to_arrow() {
        let src = "export async function load(id: string): Promise<void> {\n  await get(id);\n}\n";
        assert_eq!(
            convert("a.ts", src, "load").unwrap(),
            "export const load = async (id: string): Promise<void> => {\n  await get(id);\n};\n"
        );
    }

    #[test]
    fn test_tsx_generic_gets_trailing_comma() {
        let src = "function id<T>(x: T): T {\n  return x;\n}\n";
        assert_eq!(
            convert("a.tsx", src, "id").unwrap(),
            "const id = <T,>(x: T): T => {\n  return x;\n};\n"
        );
    }

    #[test]
    fn test_arrow_to_declaration() {
        let src = "const add = (a, b) => a + b;\nconst inc = x => {\n  return x + 1;\n};\n";
        assert_eq!(
            convert("a.js", src, "add").unwrap(),
            "function add(a, b) {\n  return a + b;\n}\nconst inc = x => {\n  return x + 1;\n};\n"
        );
        assert_eq!(
            convert("a.js", src, "inc").unwrap(),
            "const add = (a, b) => a + b;\nfunction inc(x) {\n  return x + 1;\n}\n"
        );
    }

    #[test]
    fn test_this_binding_rejected() {
        let src = "function f() { return this.x; }\nconst g = () => arguments.length;\n";
        assert_eq!(convert("a.js", src, "f()").unwrap_err(), "this-binding");
        assert_eq!(convert("a.js", src, "g =").unwrap_err(), "this-binding");
    }

    #[test]
    fn test_unsupported_shapes() {
        let src = "function* gen() { yield 1; }\nexport default function main() {}\nconst n = 1;\nclass A { m() {} }\n";
        assert_eq!(convert("a.js", src, "gen").unwrap_err(), "unsupported-target");
        assert_eq!(convert("a.js", src, "main").unwrap_err(), "unsupported-target");
        assert_eq!(convert("a.js", src, "n = 1").unwrap_err(), "unsupported-target");
        assert_eq!(convert("a.js", src, "m()").unwrap_err(), "unsupported-target");
    }

    #[test]
    fn test_call_before_declaration_is_unsafe() {
        let src = "run();\nfunction run() {}\n";
        assert_eq!(convert("a.js", src, "function run").unwrap_err(), "unsafe-transform");

        let deferred = "function main() { run(); }\nfunction run() {}\n";
        assert!(convert("a.js", deferred, "function run").is_ok());
    }
}
