//! Component detection
//!
//! A component is a named function or arrow whose name is capitalized (or
//! the default export of a file with a capitalized stem) and which returns
//! JSX. `memo` and `forwardRef` wrappers are looked through.

use std::collections::{BTreeSet, HashMap, HashSet};

use tree_sitter::Node;

use super::complexity::{declared_name, is_logical, parameters};
use crate::schema::{ComponentInfo, ExportInfo, PropInfo, Span};
use crate::syntax::kinds::NodeKind;
use crate::syntax::query::{
    ancestors, call_arguments, callee_name, component_wrapper, get_node_text, has_token, is_capitalized,
    is_hook_name, named_children, node_text, unwrap_parens,
};
use crate::syntax::{traverse, visit_all, SyntaxTree, Visit};

/// Collect components in source order
pub fn collect(tree: &SyntaxTree, file_stem: &str, exports: &[ExportInfo]) -> Vec<ComponentInfo> {
    let root = tree.root();
    let source = tree.source();
    let memoized = memoized_names(&root, source);
    let prop_types = declared_prop_types(&root, source);

    let mut components = Vec::new();
    visit_all(root, |node| {
        if node.kind() == "method_definition" {
            return;
        }
        let Some(declared) = declared_name(&node, source) else {
            return;
        };
        let is_default_slot = declared == "default";
        let name = if is_default_slot {
            if !is_capitalized(file_stem) {
                return;
            }
            file_stem.to_string()
        } else {
            declared
        };
        if !is_capitalized(&name) || !returns_jsx(&node) {
            return;
        }

        let wrapped_in_memo = ancestors(&node)
            .take_while(|a| matches!(a.kind(), "arguments" | "call_expression" | "parenthesized_expression"))
            .any(|a| component_wrapper(&a, source) == Some("memo"));

        let is_default_export = is_default_slot
            || exports
                .iter()
                .any(|e| e.is_default && e.module_path.is_none() && e.binding_names.contains(&name));

        components.push(ComponentInfo {
            span: Span::from_node(&node),
            hooks_used: hooks_used(&node, source),
            props_shape: props_shape(&node, source, &prop_types),
            has_memoization: wrapped_in_memo || memoized.contains(&name),
            is_default_export,
            jsx_depth: jsx_depth(&node, source),
            has_render_loop: has_render_loop(&node, source),
            name,
        });
    });
    components
}

/// JSX element or fragment, possibly behind parens, a ternary or `&&`/`||`
pub fn is_jsx_shaped(expr: &Node) -> bool {
    let expr = unwrap_parens(*expr);
    if NodeKind::of(&expr).is_jsx() {
        return true;
    }
    match expr.kind() {
        "ternary_expression" => ["consequence", "alternative"]
            .iter()
            .filter_map(|f| expr.child_by_field_name(f))
            .any(|branch| is_jsx_shaped(&branch)),
        "binary_expression" if is_logical(&expr) => ["left", "right"]
            .iter()
            .filter_map(|f| expr.child_by_field_name(f))
            .any(|side| is_jsx_shaped(&side)),
        _ => false,
    }
}

/// Whether a function's return expression is JSX-shaped
pub fn returns_jsx(func: &Node) -> bool {
    let Some(body) = func.child_by_field_name("body") else {
        return false;
    };
    if body.kind() != "statement_block" {
        return is_jsx_shaped(&body);
    }
    let mut found = false;
    traverse(body, |n| {
        if found || NodeKind::of(&n).is_function_like() {
            return Visit::SkipSubtree;
        }
        if n.kind() == "return_statement" {
            if let Some(value) = named_children(&n).into_iter().find(|c| c.kind() != "comment") {
                found = is_jsx_shaped(&value);
            }
            return Visit::SkipSubtree;
        }
        Visit::Continue
    });
    found
}

/// Names passed to `memo(...)` anywhere in the file
fn memoized_names(root: &Node, source: &str) -> HashSet<String> {
    let mut names = HashSet::new();
    visit_all(*root, |n| {
        if component_wrapper(&n, source) == Some("memo") {
            if let Some(arg) = call_arguments(&n).first() {
                if arg.kind() == "identifier" {
                    names.insert(get_node_text(arg, source));
                }
            }
        }
    });
    names
}

/// Nested components are reported on their own, so walks stop there
fn is_nested_component(node: &Node, root_id: usize, source: &str) -> bool {
    node.id() != root_id
        && declared_name(node, source).map_or(false, |n| is_capitalized(&n))
        && returns_jsx(node)
}

fn hooks_used(func: &Node, source: &str) -> BTreeSet<String> {
    let root_id = func.id();
    let mut hooks = BTreeSet::new();
    traverse(*func, |n| {
        if is_nested_component(&n, root_id, source) {
            return Visit::SkipSubtree;
        }
        if n.kind() == "call_expression" {
            if let Some((name, object)) = callee_name(&n, source) {
                if is_hook_name(&name) && object.as_deref().map_or(true, |o| o == "React") {
                    hooks.insert(name);
                }
            }
        }
        Visit::Continue
    });
    hooks
}

fn jsx_depth(func: &Node, source: &str) -> usize {
    fn depth(node: &Node, root_id: usize, source: &str) -> usize {
        if is_nested_component(node, root_id, source) {
            return 0;
        }
        let below = named_children(node)
            .iter()
            .map(|c| depth(c, root_id, source))
            .max()
            .unwrap_or(0);
        if NodeKind::of(node).is_jsx() {
            below + 1
        } else {
            below
        }
    }
    depth(func, func.id(), source)
}

fn has_render_loop(func: &Node, source: &str) -> bool {
    let root_id = func.id();
    let mut found = false;
    traverse(*func, |n| {
        if found || is_nested_component(&n, root_id, source) {
            return Visit::SkipSubtree;
        }
        if NodeKind::of(&n).is_loop() {
            found = true;
        } else if n.kind() == "call_expression" {
            if let Some((name, Some(_))) = callee_name(&n, source) {
                found = name == "map";
            }
        }
        Visit::Continue
    });
    found
}

/// Property signatures of an object type: (name, type, optional)
type TypeMembers = Vec<(String, Option<String>, bool)>;

/// Interfaces and type aliases declared in this file
fn declared_prop_types(root: &Node, source: &str) -> HashMap<String, TypeMembers> {
    let mut types = HashMap::new();
    visit_all(*root, |n| {
        let body = match n.kind() {
            "interface_declaration" => named_children(&n)
                .into_iter()
                .find(|c| matches!(c.kind(), "interface_body" | "object_type")),
            "type_alias_declaration" => n.child_by_field_name("value").filter(|v| v.kind() == "object_type"),
            _ => None,
        };
        if let (Some(name), Some(body)) = (n.child_by_field_name("name"), body) {
            types.insert(get_node_text(&name, source), object_type_members(&body, source));
        }
    });
    types
}

fn object_type_members(body: &Node, source: &str) -> TypeMembers {
    named_children(body)
        .into_iter()
        .filter(|m| m.kind() == "property_signature")
        .filter_map(|m| {
            let name = m.child_by_field_name("name")?;
            let ty = m.child_by_field_name("type").and_then(|t| type_text(&t, source));
            Some((get_node_text(&name, source), ty, has_token(&m, "?")))
        })
        .collect()
}

/// Text of the type inside a `: T` annotation
fn type_text(annotation: &Node, source: &str) -> Option<String> {
    if annotation.kind() == "type_annotation" {
        named_children(annotation)
            .into_iter()
            .next()
            .map(|t| get_node_text(&t, source))
    } else {
        Some(get_node_text(annotation, source))
    }
}

fn props_shape(func: &Node, source: &str, declared: &HashMap<String, TypeMembers>) -> Vec<PropInfo> {
    let Some(first) = parameters(func).into_iter().next() else {
        return Vec::new();
    };

    let (pattern, annotation) = match first.kind() {
        "required_parameter" | "optional_parameter" => (
            first.child_by_field_name("pattern"),
            first.child_by_field_name("type"),
        ),
        _ => (Some(first), None),
    };
    let Some(mut pattern) = pattern else {
        return Vec::new();
    };
    if pattern.kind() == "assignment_pattern" {
        match pattern.child_by_field_name("left") {
            Some(left) => pattern = left,
            None => return Vec::new(),
        }
    }

    let members: Option<TypeMembers> = annotation
        .and_then(|a| named_children(&a).into_iter().next())
        .and_then(|ty| match ty.kind() {
            "object_type" => Some(object_type_members(&ty, source)),
            "type_identifier" => declared.get(node_text(&ty, source)).cloned(),
            "generic_type" => ty
                .child_by_field_name("name")
                .and_then(|n| declared.get(node_text(&n, source)).cloned()),
            _ => None,
        });
    let lookup = |name: &str| -> (Option<String>, Option<bool>) {
        members
            .as_ref()
            .and_then(|m| m.iter().find(|(n, _, _)| n == name))
            .map_or((None, None), |(_, ty, optional)| (ty.clone(), Some(*optional)))
    };

    let mut props = Vec::new();
    match pattern.kind() {
        "object_pattern" => {
            for entry in named_children(&pattern) {
                let (name, default_value) = match entry.kind() {
                    "shorthand_property_identifier_pattern" => (get_node_text(&entry, source), None),
                    "object_assignment_pattern" => {
                        let Some(left) = entry.child_by_field_name("left") else { continue };
                        let default = entry.child_by_field_name("right").map(|r| get_node_text(&r, source));
                        (get_node_text(&left, source), default)
                    }
                    "pair_pattern" => {
                        let Some(key) = entry.child_by_field_name("key") else { continue };
                        let default = entry
                            .child_by_field_name("value")
                            .filter(|v| v.kind() == "assignment_pattern")
                            .and_then(|v| v.child_by_field_name("right"))
                            .map(|r| get_node_text(&r, source));
                        (get_node_text(&key, source), default)
                    }
                    _ => continue,
                };
                let (prop_type, optional) = lookup(&name);
                props.push(PropInfo {
                    required: default_value.is_none() && !optional.unwrap_or(false),
                    name,
                    prop_type,
                    default_value,
                });
            }
        }
        "identifier" => {
            let object = node_text(&pattern, source);
            let mut seen = HashSet::new();
            visit_all(*func, |n| {
                if n.kind() != "member_expression" {
                    return;
                }
                let is_props = n
                    .child_by_field_name("object")
                    .map_or(false, |o| o.kind() == "identifier" && node_text(&o, source) == object);
                if let (true, Some(property)) = (is_props, n.child_by_field_name("property")) {
                    let name = get_node_text(&property, source);
                    if seen.insert(name.clone()) {
                        let (prop_type, optional) = lookup(&name);
                        props.push(PropInfo {
                            required: !optional.unwrap_or(false),
                            name,
                            prop_type,
                            default_value: None,
                        });
                    }
                }
            });
            // Typed props that the body never touches still belong to the shape
            if let Some(members) = &members {
                for (name, ty, optional) in members {
                    if seen.insert(name.clone()) {
                        props.push(PropInfo {
                            name: name.clone(),
                            prop_type: ty.clone(),
                            default_value: None,
                            required: !optional,
                        });
                    }
                }
            }
        }
        _ => {}
    }
    props
}
