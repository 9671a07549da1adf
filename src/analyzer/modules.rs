//! Import/export extraction and the local dependency edge list

use tree_sitter::Node;

use super::complexity::is_logical;
use super::scope::{ScopeModel, MODULE_SCOPE};
use crate::schema::{DynamicImport, ExportInfo, ImportInfo, ImportSpecifier, JsxUsage, NamespaceUsage, Span, SpecifierKind};
use crate::syntax::kinds::NodeKind;
use crate::syntax::query::{
    ancestors, call_arguments, callee_name, component_wrapper, get_node_text, has_token, is_capitalized,
    named_children, node_text, unwrap_parens,
};
use crate::syntax::{visit_all, SyntaxTree};

/// Strip the quotes from a string literal node
pub fn string_value(node: &Node, source: &str) -> String {
    let text = node_text(node, source);
    text.trim_matches(|c| c == '"' || c == '\'' || c == '`').to_string()
}

pub fn extract_imports(tree: &SyntaxTree, scope: &ScopeModel) -> Vec<ImportInfo> {
    let source = tree.source();
    let mut imports = Vec::new();

    for stmt in named_children(&tree.root()) {
        if stmt.kind() != "import_statement" {
            continue;
        }
        let Some(module) = stmt.child_by_field_name("source") else {
            continue;
        };
        let is_type_only = has_token(&stmt, "type");
        let specifiers = import_specifiers(&stmt, source, is_type_only);

        let namespace_usage = specifiers
            .iter()
            .find(|s| s.kind == SpecifierKind::Namespace)
            .and_then(|s| scope.declared_in(MODULE_SCOPE, &s.local))
            .map(|decl| {
                let mut usage = NamespaceUsage::default();
                for r in scope.references_to(decl) {
                    match &r.member {
                        Some(member) => {
                            usage.members.insert(member.clone());
                        }
                        None => usage.escapes = true,
                    }
                }
                usage
            });

        imports.push(ImportInfo {
            module_path: string_value(&module, source),
            binding_names: specifiers.iter().map(|s| s.local.clone()).collect(),
            is_type_only,
            span: Span::from_node(&stmt),
            specifiers,
            namespace_usage,
        });
    }
    imports
}

pub fn import_specifiers(stmt: &Node, source: &str, statement_type_only: bool) -> Vec<ImportSpecifier> {
    let mut out = Vec::new();
    for clause in named_children(stmt) {
        if clause.kind() != "import_clause" {
            continue;
        }
        for inner in named_children(&clause) {
            match inner.kind() {
                "identifier" => out.push(ImportSpecifier {
                    imported: "default".to_string(),
                    local: get_node_text(&inner, source),
                    kind: SpecifierKind::Default,
                    is_type_only: statement_type_only,
                }),
                "namespace_import" => {
                    if let Some(id) = named_children(&inner).into_iter().find(|n| n.kind() == "identifier") {
                        out.push(ImportSpecifier {
                            imported: "*".to_string(),
                            local: get_node_text(&id, source),
                            kind: SpecifierKind::Namespace,
                            is_type_only: statement_type_only,
                        });
                    }
                }
                "named_imports" => {
                    for spec in named_children(&inner) {
                        if spec.kind() != "import_specifier" {
                            continue;
                        }
                        let Some(name) = spec.child_by_field_name("name") else {
                            continue;
                        };
                        let imported = get_node_text(&name, source);
                        let local = spec
                            .child_by_field_name("alias")
                            .map(|a| get_node_text(&a, source))
                            .unwrap_or_else(|| imported.clone());
                        out.push(ImportSpecifier {
                            imported,
                            local,
                            kind: SpecifierKind::Named,
                            is_type_only: statement_type_only || has_token(&spec, "type"),
                        });
                    }
                }
                _ => {}
            }
        }
    }
    out
}

pub fn extract_exports(tree: &SyntaxTree) -> Vec<ExportInfo> {
    let source = tree.source();
    let mut exports = Vec::new();

    for stmt in named_children(&tree.root()) {
        if stmt.kind() != "export_statement" {
            continue;
        }
        let module_path = stmt.child_by_field_name("source").map(|s| string_value(&s, source));
        let is_default = has_token(&stmt, "default");
        let mut is_type_only = has_token(&stmt, "type");
        let mut names = Vec::new();

        if let Some(decl) = stmt.child_by_field_name("declaration") {
            match decl.kind() {
                "lexical_declaration" | "variable_declaration" => {
                    for declarator in named_children(&decl) {
                        if let Some(name) = declarator.child_by_field_name("name") {
                            collect_pattern_names(&name, source, &mut names);
                        }
                    }
                }
                kind => {
                    if matches!(kind, "interface_declaration" | "type_alias_declaration") {
                        is_type_only = true;
                    }
                    if let Some(name) = decl.child_by_field_name("name") {
                        names.push(get_node_text(&name, source));
                    }
                }
            }
        } else if let Some(value) = stmt.child_by_field_name("value") {
            let value = unwrap_parens(value);
            let name = match value.kind() {
                "identifier" => Some(get_node_text(&value, source)),
                "call_expression" if component_wrapper(&value, source).is_some() => call_arguments(&value)
                    .first()
                    .filter(|a| a.kind() == "identifier")
                    .map(|a| get_node_text(a, source)),
                _ => value.child_by_field_name("name").map(|n| get_node_text(&n, source)),
            };
            names.push(name.unwrap_or_else(|| "default".to_string()));
        } else {
            for child in named_children(&stmt) {
                match child.kind() {
                    "export_clause" => {
                        for spec in named_children(&child) {
                            if spec.kind() != "export_specifier" {
                                continue;
                            }
                            let exported = spec
                                .child_by_field_name("alias")
                                .or_else(|| spec.child_by_field_name("name"));
                            if let Some(exported) = exported {
                                names.push(get_node_text(&exported, source));
                            }
                        }
                    }
                    "namespace_export" => {
                        let alias = named_children(&child).into_iter().next();
                        names.push(alias.map_or_else(|| "*".to_string(), |a| get_node_text(&a, source)));
                    }
                    _ => {}
                }
            }
            if names.is_empty() && module_path.is_some() {
                names.push("*".to_string());
            }
        }

        exports.push(ExportInfo {
            is_default: is_default || names.iter().any(|n| n == "default"),
            module_path,
            binding_names: names,
            is_type_only,
            span: Span::from_node(&stmt),
        });
    }
    exports
}

fn collect_pattern_names(pattern: &Node, source: &str, out: &mut Vec<String>) {
    match pattern.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => out.push(get_node_text(pattern, source)),
        "pair_pattern" => {
            if let Some(value) = pattern.child_by_field_name("value") {
                collect_pattern_names(&value, source, out);
            }
        }
        "assignment_pattern" | "object_assignment_pattern" => {
            if let Some(left) = pattern.child_by_field_name("left") {
                collect_pattern_names(&left, source, out);
            }
        }
        _ => {
            for child in named_children(pattern) {
                collect_pattern_names(&child, source, out);
            }
        }
    }
}

/// `import('...')` calls and whether they sit inside `lazy(...)`
pub fn extract_dynamic_imports(tree: &SyntaxTree) -> Vec<DynamicImport> {
    let source = tree.source();
    let mut out = Vec::new();
    visit_all(tree.root(), |n| {
        if n.kind() != "call_expression" {
            return;
        }
        let is_import = n.child_by_field_name("function").map_or(false, |f| f.kind() == "import");
        if !is_import {
            return;
        }
        let Some(arg) = call_arguments(&n).into_iter().next() else {
            return;
        };
        if !matches!(arg.kind(), "string" | "template_string") {
            return;
        }
        let is_lazy = ancestors(&n).filter(|a| a.kind() == "call_expression").any(|a| {
            callee_name(&a, source).map_or(false, |(name, object)| {
                name == "lazy" && object.as_deref().map_or(true, |o| o == "React")
            })
        });
        out.push(DynamicImport {
            module_path: string_value(&arg, source),
            span: Span::from_node(&n),
            is_lazy,
        });
    });
    out
}

/// Imported and re-exported module paths, de-duplicated in source order
pub fn dependencies(imports: &[ImportInfo], exports: &[ExportInfo], dynamic: &[DynamicImport]) -> Vec<String> {
    let mut edges: Vec<(usize, &str)> = imports
        .iter()
        .map(|i| (i.span.start, i.module_path.as_str()))
        .chain(
            exports
                .iter()
                .filter_map(|e| e.module_path.as_deref().map(|m| (e.span.start, m))),
        )
        .chain(dynamic.iter().map(|d| (d.span.start, d.module_path.as_str())))
        .collect();
    edges.sort_by_key(|(start, _)| *start);

    let mut out: Vec<String> = Vec::new();
    for (_, module) in edges {
        if !out.iter().any(|m| m == module) {
            out.push(module.to_string());
        }
    }
    out
}

/// Capitalized JSX elements, whether they render conditionally, and which
/// props receive freshly allocated literals
pub fn extract_jsx_usages(tree: &SyntaxTree) -> Vec<JsxUsage> {
    let source = tree.source();
    let mut out = Vec::new();
    visit_all(tree.root(), |n| {
        let (element, tag) = match n.kind() {
            "jsx_opening_element" => match n.parent() {
                Some(parent) => (parent, n),
                None => return,
            },
            "jsx_self_closing_element" => (n, n),
            _ => return,
        };
        let Some(name) = tag.child_by_field_name("name") else {
            return;
        };
        let name = get_node_text(&name, source);
        if !is_capitalized(&name) {
            return;
        }

        let non_primitive_props = named_children(&tag)
            .into_iter()
            .filter(|a| a.kind() == "jsx_attribute")
            .filter_map(|attr| {
                let children = named_children(&attr);
                let prop = children.first()?;
                let value = children.get(1)?;
                if value.kind() != "jsx_expression" {
                    return None;
                }
                let expr = unwrap_parens(named_children(value).into_iter().next()?);
                is_fresh_literal(&expr).then(|| get_node_text(prop, source))
            })
            .collect();

        out.push(JsxUsage {
            name,
            span: Span::from_node(&element),
            conditional: is_conditional_render(&element),
            non_primitive_props,
        });
    });
    out
}

/// Object, array or function literal: a new identity on every render
pub fn is_fresh_literal(expr: &Node) -> bool {
    matches!(
        expr.kind(),
        "object" | "array" | "arrow_function" | "function_expression"
    )
}

fn is_conditional_render(element: &Node) -> bool {
    let mut child_id = element.id();
    for ancestor in ancestors(element) {
        if NodeKind::of(&ancestor).is_function_like() || crate::syntax::kinds::is_statement(ancestor.kind()) {
            return false;
        }
        match ancestor.kind() {
            "ternary_expression" => {
                let in_condition = ancestor
                    .child_by_field_name("condition")
                    .map_or(false, |c| c.id() == child_id);
                if !in_condition {
                    return true;
                }
            }
            "binary_expression" if is_logical(&ancestor) => return true,
            _ => {}
        }
        child_id = ancestor.id();
    }
    false
}

/// Import ordering groups, in output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImportGroup {
    /// `import './polyfill'`: kept first, in original order
    SideEffect,
    External,
    /// Project aliases: `@/`, `~/`, `#`, `src/`
    Internal,
    Relative,
}

pub fn module_group(path: &str) -> ImportGroup {
    if path.starts_with('.') {
        ImportGroup::Relative
    } else if ["@/", "~/", "#", "src/"].iter().any(|p| path.starts_with(p)) {
        ImportGroup::Internal
    } else {
        ImportGroup::External
    }
}

pub fn import_group(import: &ImportInfo) -> ImportGroup {
    if import.specifiers.is_empty() {
        ImportGroup::SideEffect
    } else {
        module_group(&import.module_path)
    }
}

/// Whether the file renders any JSX at all
pub fn contains_jsx(root: &Node) -> bool {
    crate::syntax::query::contains_matching(root, false, |n| NodeKind::of(n).is_jsx())
}

/// Import locals that nothing references
///
/// `React` stays when the file contains JSX, since the classic JSX runtime
/// needs it in scope.
pub fn unused_import_locals(scope: &ScopeModel, imports: &[ImportInfo], has_jsx: bool) -> Vec<String> {
    imports
        .iter()
        .flat_map(|i| i.specifiers.iter())
        .filter(|s| !(has_jsx && s.local == "React"))
        .filter(|s| {
            scope
                .declared_in(MODULE_SCOPE, &s.local)
                .map_or(false, |d| scope.references_to(d).next().is_none())
        })
        .map(|s| s.local.clone())
        .collect()
}

/// Case-insensitive ordering key with the original text as tie-break
pub fn sort_key(s: &str) -> (String, &str) {
    (s.to_lowercase(), s)
}

/// Whether the import block is already grouped and sorted
pub fn imports_sorted(imports: &[ImportInfo]) -> bool {
    let keys: Vec<(ImportGroup, Option<(String, &str)>)> = imports
        .iter()
        .map(|i| {
            let group = import_group(i);
            let path = (group != ImportGroup::SideEffect).then(|| sort_key(&i.module_path));
            (group, path)
        })
        .collect();
    let ordered = keys.windows(2).all(|w| w[0] <= w[1]);
    let specifiers_ordered = imports.iter().all(|i| {
        let named: Vec<_> = i
            .specifiers
            .iter()
            .filter(|s| s.kind == SpecifierKind::Named)
            .map(|s| sort_key(&s.imported))
            .collect();
        named.windows(2).all(|w| w[0] <= w[1])
    });
    ordered && specifiers_ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::Dialect;
    use crate::syntax::parse;

    #[test]
    fn test_import_specifiers() {
        let src = "import React, { useState, type FC as F } from 'react';\nimport * as _ from 'lodash';\nimport './styles.css';\nconst v = _.pick(_.omit(a));";
        let tree = parse(src, Dialect::Tsx).unwrap();
        let scope = ScopeModel::build(&tree);
        let imports = extract_imports(&tree, &scope);
        assert_eq!(imports.len(), 3);
        assert_eq!(imports[0].module_path, "react");
        assert_eq!(imports[0].binding_names, vec!["React", "useState", "F"]);
        assert!(imports[0].specifiers[2].is_type_only);
        let usage = imports[1].namespace_usage.as_ref().unwrap();
        assert_eq!(usage.members.iter().cloned().collect::<Vec<_>>(), vec!["omit", "pick"]);
        assert!(!usage.escapes);
        assert!(imports[2].specifiers.is_empty());
    }

    #[test]
    fn test_exports() {
        let src = "export const a = 1, b = 2;\nexport function f() {}\nexport { c as d };\nexport * from './all';\nexport default memo(Card);\nexport interface P {}";
        let tree = parse(src, Dialect::TypeScript).unwrap();
        let exports = extract_exports(&tree);
        assert_eq!(exports[0].binding_names, vec!["a", "b"]);
        assert_eq!(exports[1].binding_names, vec!["f"]);
        assert_eq!(exports[2].binding_names, vec!["d"]);
        assert_eq!(exports[3].module_path.as_deref(), Some("./all"));
        assert_eq!(exports[3].binding_names, vec!["*"]);
        assert!(exports[4].is_default);
        assert_eq!(exports[4].binding_names, vec!["Card"]);
        assert!(exports[5].is_type_only);
    }

    #[test]
    fn test_dynamic_imports_and_dependencies() {
        let src = "import a from './a';\nconst Page = lazy(() => import('./Page'));\nconst m = import('./a');";
        let tree = parse(src, Dialect::Jsx).unwrap();
        let scope = ScopeModel::build(&tree);
        let imports = extract_imports(&tree, &scope);
        let dynamic = extract_dynamic_imports(&tree);
        assert_eq!(dynamic.len(), 2);
        assert!(dynamic[0].is_lazy);
        assert!(!dynamic[1].is_lazy);
        assert_eq!(dependencies(&imports, &[], &dynamic), vec!["./a", "./Page"]);
    }

    #[test]
    fn test_import_groups_and_order() {
        assert_eq!(module_group("react"), ImportGroup::External);
        assert_eq!(module_group("@/lib/api"), ImportGroup::Internal);
        assert_eq!(module_group("@scope/pkg"), ImportGroup::External);
        assert_eq!(module_group("../util"), ImportGroup::Relative);

        let sorted = "import './polyfill';\nimport a from 'a';\nimport { x, y } from 'b';\nimport c from './c';\nuse(a, x, y, c);";
        let tree = parse(sorted, Dialect::JavaScript).unwrap();
        let scope = ScopeModel::build(&tree);
        let imports = extract_imports(&tree, &scope);
        assert!(imports_sorted(&imports));
        assert!(unused_import_locals(&scope, &imports, false).is_empty());

        let unsorted = "import c from './c';\nimport { y, x } from 'b';\nuse(c, y);";
        let tree = parse(unsorted, Dialect::JavaScript).unwrap();
        let scope = ScopeModel::build(&tree);
        let imports = extract_imports(&tree, &scope);
        assert!(!imports_sorted(&imports));
        assert_eq!(unused_import_locals(&scope, &imports, false), vec!["x"]);
    }

    #[test]
    fn test_jsx_usages() {
        let src = "const x = <div>{open && <Modal style={{ a: 1 }} onClose={() => {}} title=\"t\" />}<Footer /></div>;";
        let tree = parse(src, Dialect::Jsx).unwrap();
        let usages = extract_jsx_usages(&tree);
        assert_eq!(usages.len(), 2);
        assert_eq!(usages[0].name, "Modal");
        assert!(usages[0].conditional);
        assert_eq!(usages[0].non_primitive_props, vec!["style", "onClose"]);
        assert_eq!(usages[1].name, "Footer");
        assert!(!usages[1].conditional);
    }
}
