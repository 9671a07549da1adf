//! Organize imports: group, sort, drop unused specifiers

use std::collections::HashSet;

use tree_sitter::Node;

use super::edits::{attached_comment_start, insert};
use super::{Change, RefactorContext};
use crate::analyzer::modules::{
    contains_jsx, extract_imports, import_group, sort_key, unused_import_locals, ImportGroup,
};
use crate::error::RefactorError;
use crate::schema::{ImportInfo, ImportSpecifier, SpecifierKind, TextEdit};
use crate::syntax::query::{line_end_inclusive, line_start, named_children, node_text, smallest_covering};
use crate::syntax::LineIndex;

const GROUP_ORDER: [ImportGroup; 4] = [
    ImportGroup::SideEffect,
    ImportGroup::External,
    ImportGroup::Internal,
    ImportGroup::Relative,
];

/// One import statement with the comments that travel with it
struct Slot {
    start: usize,
    end: usize,
    /// Start of the attached leading comments
    lead: usize,
    /// End of a same-line trailing comment
    tail: usize,
    group: ImportGroup,
    module_path: String,
    /// `None` when every specifier is unused
    text: Option<String>,
}

pub fn organize_imports(ctx: &RefactorContext) -> Result<Change, RefactorError> {
    let source = ctx.source();
    let root = ctx.root();
    let imports = extract_imports(ctx.tree, ctx.scope);
    if imports.is_empty() {
        return Ok(Change::default());
    }
    let unused: HashSet<String> = unused_import_locals(ctx.scope, &imports, contains_jsx(&root))
        .into_iter()
        .collect();

    let mut slots = Vec::with_capacity(imports.len());
    for import in &imports {
        let node = smallest_covering(&root, import.span.start, import.span.end)
            .filter(|n| n.kind() == "import_statement")
            .ok_or_else(|| RefactorError::UnsafeTransform {
                details: format!("import of '{}' not found in tree", import.module_path),
            })?;
        let (start, end) = (import.span.start, import.span.end);
        let lead = leading_start(source, start);
        let tail = trailing_end(source, end);
        let text = render(&node, import, &unused, source)
            .map(|body| format!("{}{}{}", &source[lead..start], body, &source[end..tail]));
        slots.push(Slot {
            start,
            end,
            lead,
            tail,
            group: import_group(import),
            module_path: import.module_path.clone(),
            text,
        });
    }

    let block = render_block(&slots);
    let (first, last) = match (slots.first(), slots.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => return Ok(Change::default()),
    };
    let index = LineIndex::new(source);
    let target = index.span(first.lead, last.tail);

    let contiguous = slots
        .windows(2)
        .all(|w| source[w[0].tail..w[1].lead].trim().is_empty());

    if contiguous {
        if source[first.lead..last.tail] == block {
            return Ok(Change {
                target_spans: vec![target],
                edits: Vec::new(),
            });
        }
        return Ok(Change {
            target_spans: vec![target],
            edits: vec![TextEdit {
                start: first.lead,
                end: last.tail,
                new_text: block,
            }],
        });
    }

    // Imports interleaved with other statements: pull them all to the first slot
    let mut edits: Vec<TextEdit> = slots
        .iter()
        .map(|slot| {
            let owns_line = source[line_start(source, slot.start)..slot.start].trim().is_empty()
                && source[slot.tail..line_end_inclusive(source, slot.tail)].trim().is_empty();
            let (start, end) = if owns_line {
                (slot.lead, line_end_inclusive(source, slot.tail))
            } else {
                (slot.start, slot.end)
            };
            TextEdit {
                start,
                end,
                new_text: String::new(),
            }
        })
        .collect();
    if !block.is_empty() {
        edits.push(insert(first.lead, format!("{}\n", block)));
    }
    Ok(Change {
        target_spans: vec![target],
        edits,
    })
}

fn leading_start(source: &str, start: usize) -> usize {
    let line = line_start(source, start);
    if source[line..start].trim().is_empty() {
        attached_comment_start(source, line)
    } else {
        start
    }
}

/// End of a same-line comment after the statement, if any
fn trailing_end(source: &str, end: usize) -> usize {
    let line_end = source[end..].find('\n').map_or(source.len(), |i| end + i);
    let rest = source[end..line_end].trim();
    let is_comment = rest.starts_with("//") || (rest.starts_with("/*") && rest.ends_with("*/"));
    if is_comment {
        end + source[end..line_end].trim_end().len()
    } else {
        end
    }
}

fn render_block(slots: &[Slot]) -> String {
    let mut groups = Vec::new();
    for group in GROUP_ORDER {
        let mut members: Vec<&Slot> = slots
            .iter()
            .filter(|s| s.group == group && s.text.is_some())
            .collect();
        if group != ImportGroup::SideEffect {
            members.sort_by(|a, b| sort_key(&a.module_path).cmp(&sort_key(&b.module_path)));
        }
        if members.is_empty() {
            continue;
        }
        let lines: Vec<&str> = members.iter().filter_map(|s| s.text.as_deref()).collect();
        groups.push(lines.join("\n"));
    }
    groups.join("\n\n")
}

/// Statement text with unused specifiers removed and named specifiers sorted
///
/// Statements that need no change keep their original text, including any
/// multi-line layout.
fn render(node: &Node, import: &ImportInfo, unused: &HashSet<String>, source: &str) -> Option<String> {
    let original = node_text(node, source);
    if import.specifiers.is_empty() {
        return Some(original.to_string());
    }
    let kept: Vec<&ImportSpecifier> = import
        .specifiers
        .iter()
        .filter(|s| !unused.contains(&s.local))
        .collect();
    if kept.is_empty() {
        return None;
    }

    let named_keys: Vec<_> = import
        .specifiers
        .iter()
        .filter(|s| s.kind == SpecifierKind::Named)
        .map(|s| sort_key(&s.imported))
        .collect();
    let named_sorted = named_keys.windows(2).all(|w| w[0] <= w[1]);
    let has_attributes = named_children(node)
        .iter()
        .any(|c| matches!(c.kind(), "import_attribute" | "import_assertion"));
    if has_attributes || (kept.len() == import.specifiers.len() && named_sorted) {
        return Some(original.to_string());
    }

    let quote = node
        .child_by_field_name("source")
        .and_then(|s| node_text(&s, source).chars().next())
        .unwrap_or('\'');
    let semicolon = if original.trim_end().ends_with(';') { ";" } else { "" };

    let mut parts = Vec::new();
    if let Some(default) = kept.iter().find(|s| s.kind == SpecifierKind::Default) {
        parts.push(default.local.clone());
    }
    if let Some(namespace) = kept.iter().find(|s| s.kind == SpecifierKind::Namespace) {
        parts.push(format!("* as {}", namespace.local));
    }
    let mut named: Vec<&&ImportSpecifier> = kept.iter().filter(|s| s.kind == SpecifierKind::Named).collect();
    named.sort_by(|a, b| sort_key(&a.imported).cmp(&sort_key(&b.imported)));
    if !named.is_empty() {
        let specs: Vec<String> = named
            .iter()
            .map(|s| {
                let prefix = if s.is_type_only && !import.is_type_only { "type " } else { "" };
                if s.imported == s.local {
                    format!("{}{}", prefix, s.local)
                } else {
                    format!("{}{} as {}", prefix, s.imported, s.local)
                }
            })
            .collect();
        parts.push(format!("{{ {} }}", specs.join(", ")));
    }

    Some(format!(
        "import {}{} from {}{}{}{}",
        if import.is_type_only { "type " } else { "" },
        parts.join(", "),
        quote,
        import.module_path,
        quote,
        semicolon
    ))
}

#[cfg(test)]
mod tests {
    use super::super::tests::plan_for;
    use super::super::RefactorOperation;

    fn organize(path: &str, src: &str) -> String {
        plan_for(path, src, RefactorOperation::OrganizeImports)
            .unwrap()
            .proposed_text
    }

    #[test]
    fn test_groups_sort_and_prune() {
        let src = "import { z, a } from './local';\nimport b from '@/shared';\nimport 'polyfill';\nimport { useState, unused } from 'react';\n\nexport const x = () => z(a, b, useState);\n";
        assert_eq!(
            organize("a.ts", src),
            "import 'polyfill';\n\nimport { useState } from 'react';\n\nimport b from '@/shared';\n\nimport { a, z } from './local';\n\nexport const x = () => z(a, b, useState);\n"
        );
    }

    #[test]
    fn test_is_idempotent() {
        let src = "// api client\nimport { b, a } from 'lib'; // keep\nimport c from './c';\nimport d from 'zeta';\nexport default [a, b, c, d];\n";
        let once = organize("a.js", src);
        assert_eq!(
            once,
            "// api client\nimport { a, b } from 'lib'; // keep\nimport d from 'zeta';\n\nimport c from './c';\nexport default [a, b, c, d];\n"
        );
        assert_eq!(organize("a.js", &once), once);
        let plan = plan_for("a.js", &once, RefactorOperation::OrganizeImports).unwrap();
        assert!(plan.is_noop());
    }

    #[test]
    fn test_react_kept_with_jsx() {
        let src = "import React from \"react\";\nimport Unused from \"./Unused\";\nexport const A = () => <div />;\n";
        assert_eq!(
            organize("A.jsx", src),
            "import React from \"react\";\nexport const A = () => <div />;\n"
        );
    }

    #[test]
    fn test_interleaved_imports_are_gathered() {
        let src = "import b from 'b';\nconst x = b();\nimport a from 'a';\nexport { x, a };\n";
        let once = organize("a.js", src);
        assert_eq!(once, "import a from 'a';\nimport b from 'b';\nconst x = b();\nexport { x, a };\n");
        assert_eq!(organize("a.js", &once), once);
    }

    #[test]
    fn test_type_only_specifiers() {
        let src = "import { type Z, A, unusedThing } from './types';\nexport function f(a: Z) { return A(a); }\n";
        assert_eq!(
            organize("a.ts", src),
            "import { A, type Z } from './types';\nexport function f(a: Z) { return A(a); }\n"
        );
    }
}
