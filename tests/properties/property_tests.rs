//! Property tests over the shared fixtures

use std::collections::HashSet;

use frontend_intel::syntax::parse;
use frontend_intel::{optimize, refactor, OptimizeOptions, RefactorOperation, RefactorOptions, Selection};

use crate::common::fixtures::{ALL, COUNTER_TSX, UTILS_TS};
use crate::common::{analysis, offset, plan, unit};

#[test]
fn test_parse_is_deterministic() {
    for (path, src) in ALL {
        let dialect = unit(path, src).dialect();
        let first = parse(src, dialect).unwrap();
        let second = parse(src, dialect).unwrap();
        assert_eq!(first.fingerprint(), second.fingerprint(), "{}", path);
        assert_eq!(analysis(path, src), analysis(path, src), "{}", path);
    }
}

#[test]
fn test_organize_imports_is_idempotent() {
    let inputs = [
        ("Counter.tsx", COUNTER_TSX),
        ("utils.ts", UTILS_TS),
        (
            "mixed.ts",
            "import './polyfill';\nimport { z } from '@/z';\nimport * as path from 'path';\nimport { y, x } from '../up';\nexport const v = [z, path.join, x, y];\n",
        ),
    ];
    for (path, src) in inputs {
        let once = plan(path, src, RefactorOperation::OrganizeImports).unwrap();
        let twice = plan(path, &once.proposed_text, RefactorOperation::OrganizeImports).unwrap();
        assert_eq!(twice.proposed_text, once.proposed_text, "{}", path);
        assert!(twice.is_noop(), "{} changed on second run", path);
    }
}

#[test]
fn test_accepted_plans_reparse() {
    let ops = |src: &str| {
        vec![
            RefactorOperation::OrganizeImports,
            RefactorOperation::RemoveDeadCode,
            RefactorOperation::ConvertFunctionStyle { position: 0 },
            RefactorOperation::InlineVariable {
                position: src.find("const ").unwrap_or(0) + "const ".len(),
            },
            RefactorOperation::ExtractVariable {
                selection: Selection::new(0, src.len().min(20)),
                name: None,
            },
        ]
    };
    for (path, src) in ALL {
        let unit = unit(path, src);
        for op in ops(src) {
            if let Ok(plan) = plan(path, src, op.clone()) {
                assert!(
                    parse(&plan.proposed_text, unit.dialect()).is_ok(),
                    "{} on {} produced unparsable text",
                    op.kind(),
                    path
                );
            }
        }
    }
}

#[test]
fn test_complexity_is_monotonic() {
    let base = "function f(a, b) {\n  if (a) {\n    return 1;\n  }\n  return 2;\n}\n";
    let more = "function f(a, b) {\n  if (a) {\n    return 1;\n  }\n  if (b && a) {\n    return 3;\n  }\n  return 2;\n}\n";
    let before = analysis("f.js", base).functions[0].cyclomatic_complexity;
    let after = analysis("f.js", more).functions[0].cyclomatic_complexity;
    assert!(after > before);
    assert_eq!(after, before + 2);
}

#[test]
fn test_suggestions_are_unique() {
    let src = "import * as icons from './icons';\nimport Chart from './Chart';\n\nexport default function Page({ rows, title, a, b, c, d }) {\n  return (\n    <main>\n      <section>\n        <div>{rows.map((r) => <p key={r}>{title}</p>)}</div>\n      </section>\n      {a && <Chart data={[a, b]} />}\n      <icons.Star />\n    </main>\n  );\n}\n";
    let result = analysis("Page.jsx", src);
    let suggestions = optimize(&result, &OptimizeOptions::default()).unwrap();
    assert!(!suggestions.is_empty());
    let mut seen = HashSet::new();
    for s in &suggestions {
        assert!(seen.insert((s.kind, s.target_span)), "duplicate {:?}", s.kind);
    }
}

#[test]
fn test_dry_run_never_touches_source() {
    let unit = unit("utils.ts", UTILS_TS);
    let result = analysis("utils.ts", UTILS_TS);

    let preview = refactor(&unit, &result, &RefactorOperation::RemoveDeadCode, &RefactorOptions { dry_run: true }).unwrap();
    assert!(preview.is_dry_run);
    assert_ne!(preview.proposed_text, UTILS_TS);
    assert_eq!(preview.commit(&unit).unwrap_err().reason(), "dry-run-plan");
    assert_eq!(unit.text(), UTILS_TS);

    let real = refactor(&unit, &result, &RefactorOperation::RemoveDeadCode, &RefactorOptions { dry_run: false }).unwrap();
    let committed = real.commit(&unit).unwrap();
    assert_eq!(committed.text(), real.proposed_text);
    assert_eq!(unit.text(), UTILS_TS);

    // A plan for the old text cannot be applied to the new one
    assert_eq!(real.commit(&committed).unwrap_err().reason(), "stale-source");
}

#[test]
fn test_rejected_plan_leaves_no_trace() {
    let src = "let a = 1;\na = 2;\nexport const b = a;\n";
    let unit = unit("a.js", src);
    let result = analysis("a.js", src);
    let op = RefactorOperation::InlineVariable {
        position: offset(src, "a = 1"),
    };
    let err = refactor(&unit, &result, &op, &RefactorOptions { dry_run: false }).unwrap_err();
    assert_eq!(err.reason(), "mutated-before-use");
    assert_eq!(unit.text(), src);
}
