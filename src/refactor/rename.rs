//! Scope-aware, single-file symbol rename

use super::edits::replace;
use super::{check_identifier, Change, RefactorContext};
use crate::analyzer::scope::{DeclKind, RefKind};
use crate::error::RefactorError;
use crate::schema::TextEdit;
use crate::syntax::query::{is_capitalized, node_text, smallest_covering};
use crate::syntax::Span;

pub fn rename_symbol(ctx: &RefactorContext, position: usize, new_name: &str) -> Result<Change, RefactorError> {
    let model = ctx.scope;
    let source = ctx.source();
    let decl_id = model
        .declaration_at(position)
        .ok_or_else(|| RefactorError::SymbolNotFound {
            details: format!("no binding at offset {}", position),
        })?;
    let decl = &model.declarations[decl_id];
    if decl.name == new_name {
        return Ok(Change {
            target_spans: vec![decl.name_span],
            edits: Vec::new(),
        });
    }
    check_identifier(new_name)?;

    let references: Vec<_> = model.references_to(decl_id).collect();
    if references.iter().any(|r| r.kind == RefKind::JsxName) && !is_capitalized(new_name) {
        return Err(RefactorError::InvalidName {
            name: new_name.to_string(),
        });
    }
    if decl.kind != DeclKind::Import && source[decl.statement.start..].starts_with("export") {
        return Err(RefactorError::UnsupportedTarget {
            details: format!("renaming '{}' would change the module's exports", decl.name),
        });
    }

    // Collisions: same scope, capture at a use site, or a free name that
    // would start resolving to the renamed binding
    let collision = model.declared_in(decl.scope, new_name).is_some()
        || references
            .iter()
            .any(|r| model.lookup(new_name, r.scope).map_or(false, |other| other != decl_id))
        || model.references.iter().any(|r| {
            r.name == new_name
                && model.is_within(r.scope, decl.scope)
                && r.decl.map_or(true, |d| !model.is_within(model.declarations[d].scope, decl.scope))
        });
    if collision {
        return Err(RefactorError::NameCollision {
            name: new_name.to_string(),
        });
    }

    let mut edits = vec![declaration_edit(ctx, decl_id, new_name)];
    for reference in &references {
        let edit = match reference.kind {
            RefKind::Shorthand => replace(reference.span, format!("{}: {}", reference.name, new_name)),
            RefKind::ExportSpecifier => export_specifier_edit(ctx, reference.span, &reference.name, new_name),
            _ => replace(reference.span, new_name),
        };
        edits.push(edit);
    }

    let mut target_spans = vec![decl.name_span];
    target_spans.extend(references.iter().map(|r| r.span));
    target_spans.sort();
    Ok(Change { target_spans, edits })
}

fn declaration_edit(ctx: &RefactorContext, decl_id: usize, new_name: &str) -> TextEdit {
    let decl = &ctx.scope.declarations[decl_id];
    let root = ctx.root();
    let node = smallest_covering(&root, decl.name_span.start, decl.name_span.end);
    let parent = node.and_then(|n| n.parent());

    if decl.shorthand {
        // `{ name }` pattern keeps reading the `name` property
        return replace(decl.name_span, format!("{}: {}", decl.name, new_name));
    }
    if let (Some(node), Some(parent)) = (node, parent) {
        if parent.kind() == "import_specifier" && parent.child_by_field_name("alias").is_none() {
            return replace(decl.name_span, format!("{} as {}", node_text(&node, ctx.source()), new_name));
        }
    }
    replace(decl.name_span, new_name)
}

/// `export { old }` keeps the exported name: `export { new as old }`
fn export_specifier_edit(ctx: &RefactorContext, span: Span, old: &str, new_name: &str) -> TextEdit {
    let root = ctx.root();
    let aliased = smallest_covering(&root, span.start, span.end)
        .and_then(|n| n.parent())
        .map_or(false, |p| p.kind() == "export_specifier" && p.child_by_field_name("alias").is_some());
    if aliased {
        replace(span, new_name)
    } else {
        replace(span, format!("{} as {}", new_name, old))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::plan_for;
    use super::super::RefactorOperation;

    fn rename(path: &str, src: &str, at: &str, to: &str) -> Result<String, String> {
        let op = RefactorOperation::RenameSymbol {
            position: src.find(at).unwrap(),
            new_name: to.into(),
        };
        plan_for(path, src, op)
            .map(|p| p.proposed_text)
            .map_err(|e| e.reason().to_string())
    }

    #[test]
    fn test_rename_respects_shadowing() {
        let src = "const a = 1;\nfunction f() { const a = 2; return a; }\nconsole.log(a);\n";
        assert_eq!(
            rename("a.js", src, "a = 1", "b").unwrap(),
            "const b = 1;\nfunction f() { const a = 2; return a; }\nconsole.log(b);\n"
        );
    }

    #[test]
    fn test_rename_keeps_external_names() {
        let src = "const size = 1;\nconst obj = { size };\nexport { size };\n";
        assert_eq!(
            rename("a.js", src, "size = 1", "width").unwrap(),
            "const width = 1;\nconst obj = { size: width };\nexport { width as size };\n"
        );
    }

    #[test]
    fn test_rename_destructured_and_imported() {
        let src = "import { load } from './api';\nfunction f({ id }) { return load(id); }\n";
        assert_eq!(
            rename("a.js", src, "load }", "fetchIt").unwrap(),
            "import { load as fetchIt } from './api';\nfunction f({ id }) { return fetchIt(id); }\n"
        );
        assert_eq!(
            rename("a.js", src, "id }", "key").unwrap(),
            "import { load } from './api';\nfunction f({ id: key }) { return load(key); }\n"
        );
    }

    #[test]
    fn test_rename_jsx_component() {
        let src = "function Item() { return <li />; }\nexport function List() { return <ul><Item></Item></ul>; }\n";
        let out = rename("a.jsx", src, "Item()", "Row").unwrap();
        assert!(out.contains("<Row></Row>"));
        assert!(out.contains("function Row()"));
        assert_eq!(rename("a.jsx", src, "Item()", "row").unwrap_err(), "invalid-name");
    }

    #[test]
    fn test_rename_failures() {
        let src = "let a = 1;\nlet b = 2;\nfunction f() { return a + c; }\nexport const api = a;\n";
        assert_eq!(rename("a.js", src, "a = 1", "b").unwrap_err(), "name-collision");
        assert_eq!(rename("a.js", src, "a = 1", "c").unwrap_err(), "name-collision");
        assert_eq!(rename("a.js", src, "a = 1", "class").unwrap_err(), "invalid-name");
        assert_eq!(rename("a.js", src, "api", "other").unwrap_err(), "unsupported-target");
        assert_eq!(rename("a.js", src, "\nlet", "zz").unwrap_err(), "symbol-not-found");
    }

    #[test]
    fn test_rename_to_same_name_is_noop() {
        let src = "const a = 1;\n";
        assert_eq!(rename("a.js", src, "a = 1", "a").unwrap(), src);
    }
}
