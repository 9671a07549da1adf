//! Scenario tests across analyzer, optimizer and refactorer

use frontend_intel::schema::{FunctionStyle, OperationKind};
use frontend_intel::{optimize, OptimizeOptions, RefactorOperation, Selection, SuggestionKind};

use crate::common::fixtures::{COUNTER_TSX, LIST_JSX, UTILS_TS};
use crate::common::{analysis, offset, plan, reason};

// ============================================================================
// Analyzer
// ============================================================================

#[test]
fn test_single_branch_function_complexity() {
    let result = analysis("f.js", "function f(a){ if(a) {return 1;} else {return 2;} }");
    assert_eq!(result.functions.len(), 1);
    assert_eq!(result.functions[0].name, "f");
    assert_eq!(result.functions[0].cyclomatic_complexity, 2);
    assert_eq!(result.metrics.max_complexity, 2);
}

#[test]
fn test_component_analysis() {
    let result = analysis("Counter.tsx", COUNTER_TSX);
    let counter = result.component("Counter").expect("Counter is a component");
    assert!(counter.hooks_used.contains("useState"));
    assert!(counter.hooks_used.contains("useEffect"));
    assert!(!counter.has_memoization);
    let props: Vec<&str> = counter.props_shape.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(props, vec!["label", "step"]);

    let describe = result.function("describe").expect("describe is a function");
    assert_eq!(describe.style, FunctionStyle::Arrow);
    assert_eq!(describe.cyclomatic_complexity, 3);
}

#[test]
fn test_module_surface() {
    let result = analysis("utils.ts", UTILS_TS);
    let modules: Vec<&str> = result.imports.iter().map(|i| i.module_path.as_str()).collect();
    assert_eq!(modules, vec!["./b", "./a"]);
    assert!(result.exports.iter().any(|e| e.binding_names.contains(&"classify".to_string())));
    assert!(result
        .hints
        .iter()
        .any(|h| h.operation == OperationKind::RemoveDeadCode && h.reason.contains("unused")));
}

#[test]
fn test_parse_failure_reports_position() {
    let unit = crate::common::unit("broken.ts", "function f( {\n  return 1;\n");
    let err = frontend_intel::analyze(&unit, &Default::default(), &Default::default()).unwrap_err();
    assert_eq!(err.reason(), "parse-failure");
}

// ============================================================================
// Optimizer
// ============================================================================

#[test]
fn test_unmemoized_list_component_gets_memoize() {
    let src = "function Big({x}){ return <div>{[1,2,3].map(i=><span key={i}>{x}</span>)}</div>; }";
    let result = analysis("Big.jsx", src);
    let suggestions = optimize(&result, &OptimizeOptions::default()).unwrap();
    let memoize: Vec<_> = suggestions
        .iter()
        .filter(|s| s.kind == SuggestionKind::Memoize)
        .collect();
    assert_eq!(memoize.len(), 1);
    assert_eq!(memoize[0].target_span, result.functions[0].span);
}

#[test]
fn test_optimize_requires_metrics() {
    let result = analysis("List.jsx", LIST_JSX);
    let without = result.project(frontend_intel::schema::Sections {
        metrics: false,
        patterns: true,
        suggestions: true,
    });
    let err = optimize(&without, &OptimizeOptions::default()).unwrap_err();
    assert_eq!(err.reason(), "missing-analysis-section");
}

// ============================================================================
// Refactorer
// ============================================================================

#[test]
fn test_inline_after_extract_on_reassigned_variable() {
    let src = "function f() {\n  let total = 1;\n  total = total + 2;\n  return total;\n}\n";
    let extracted = plan(
        "f.js",
        src,
        RefactorOperation::ExtractVariable {
            selection: Selection::new(offset(src, "total + 2"), offset(src, "total + 2") + "total + 2".len()),
            name: None,
        },
    )
    .unwrap();
    assert_eq!(
        extracted.proposed_text,
        "function f() {\n  let total = 1;\n  const value = total + 2;\n  total = value;\n  return total;\n}\n"
    );

    let next = &extracted.proposed_text;
    let inline = RefactorOperation::InlineVariable {
        position: offset(next, "total = 1"),
    };
    assert_eq!(reason(plan("f.js", next, inline)), "mutated-before-use");
}

#[test]
fn test_extract_component_from_list_item() {
    let start = offset(LIST_JSX, "<strong>");
    let end = offset(LIST_JSX, "</strong>") + "</strong>".len();
    let result = plan(
        "List.jsx",
        LIST_JSX,
        RefactorOperation::ExtractComponent {
            selection: Selection::new(start, end),
            name: "Title".into(),
        },
    )
    .unwrap();
    assert!(result.is_dry_run);
    assert!(result.proposed_text.contains("<Title item={item} />"));
    assert!(result.proposed_text.contains("function Title({ item }) {"));
}

#[test]
fn test_extract_component_with_hook_fails() {
    let src = "export function Card({ id }) {\n  return <div><p>{useLabel(id)}</p></div>;\n}\n";
    let start = offset(src, "<p>");
    let end = offset(src, "</p>") + "</p>".len();
    let op = RefactorOperation::ExtractComponent {
        selection: Selection::new(start, end),
        name: "Label".into(),
    };
    assert_eq!(reason(plan("Card.jsx", src, op)), "hook-not-hoistable");
}

#[test]
fn test_extract_function_from_component_body() {
    let start = offset(COUNTER_TSX, "useEffect(() =>");
    let end = offset(COUNTER_TSX, "[label, count]);") + "[label, count]);".len();
    let moved = plan(
        "Counter.tsx",
        COUNTER_TSX,
        RefactorOperation::ExtractFunction {
            selection: Selection::new(start, end),
            name: "syncTitle".into(),
        },
    )
    .unwrap();
    assert!(moved.proposed_text.contains("syncTitle(label, count);"));
    assert!(moved.proposed_text.contains("function syncTitle(label, count) {"));
}

#[test]
fn test_organize_imports_on_component() {
    let result = plan("Counter.tsx", COUNTER_TSX, RefactorOperation::OrganizeImports).unwrap();
    assert!(result
        .proposed_text
        .starts_with("import React, { useEffect, useState } from 'react';\n\nimport { format } from './format';\n"));
    assert!(!result.proposed_text.contains("lodash"));
}

#[test]
fn test_remove_dead_code_on_utils() {
    let result = plan("utils.ts", UTILS_TS, RefactorOperation::RemoveDeadCode).unwrap();
    assert!(!result.proposed_text.contains("function unused"));
    assert!(result.proposed_text.contains("export function classify"));
    assert_eq!(result.operation_kind, OperationKind::RemoveDeadCode);
}

#[test]
fn test_convert_arrow_in_component_file() {
    let result = plan(
        "Counter.tsx",
        COUNTER_TSX,
        RefactorOperation::ConvertFunctionStyle {
            position: offset(COUNTER_TSX, "describe ="),
        },
    )
    .unwrap();
    assert!(result
        .proposed_text
        .contains("function describe(value: number) {\n  if (value > 10) {"));
}
