//! Remove unreferenced top-level declarations

use std::collections::{BTreeMap, HashSet};

use tree_sitter::Node;

use super::edits::statement_removal;
use super::{declarator_list_edit, Change, RefactorContext};
use crate::analyzer::hints::is_side_effect_free;
use crate::analyzer::scope::{DeclId, DeclKind};
use crate::error::RefactorError;
use crate::schema::TextEdit;
use crate::syntax::query::{named_children, smallest_covering};
use crate::syntax::Span;

struct Candidate {
    decl: DeclId,
    /// Text that goes away with the binding
    own: Span,
    statement: Span,
    declarator: Option<Span>,
}

pub fn remove_dead_code(ctx: &RefactorContext) -> Result<Change, RefactorError> {
    let candidates = candidates(ctx);
    let dead = dead_set(ctx, &candidates);
    if dead.is_empty() {
        return Ok(Change::default());
    }

    let source = ctx.source();
    let root = ctx.root();
    let mut target_spans = Vec::new();
    let mut edits = Vec::new();

    // Group by statement so multi-declarator lists are rewritten once
    let mut by_statement: BTreeMap<(usize, usize), Vec<&Candidate>> = BTreeMap::new();
    for c in candidates.iter().filter(|c| dead.contains(&c.decl)) {
        by_statement
            .entry((c.statement.start, c.statement.end))
            .or_default()
            .push(c);
        target_spans.push(c.own);
    }

    for members in by_statement.into_values() {
        let statement = members[0].statement;
        let declaration = members[0]
            .declarator
            .and_then(|d| smallest_covering(&root, d.start, d.end))
            .and_then(|d| d.parent());
        let partial = declaration.as_ref().and_then(|decl| {
            let declarators: Vec<Node> = named_children(decl)
                .into_iter()
                .filter(|c| c.kind() == "variable_declarator")
                .collect();
            let removed: HashSet<usize> = members.iter().filter_map(|m| m.declarator.map(|d| d.start)).collect();
            let kept: Vec<Node> = declarators
                .iter()
                .copied()
                .filter(|d| !removed.contains(&d.start_byte()))
                .collect();
            (!kept.is_empty()).then(|| declarator_list_edit(decl, &kept, source)).flatten()
        });
        match partial {
            Some(edit) => edits.push(edit),
            None => {
                let (from, to) = statement_removal(source, statement);
                edits.push(TextEdit {
                    start: from,
                    end: to,
                    new_text: String::new(),
                });
            }
        }
    }

    tracing::debug!(removed = target_spans.len(), "dead declarations found");
    target_spans.sort();
    Ok(Change { target_spans, edits })
}

/// Non-exported top-level functions, classes, types and pure variables
fn candidates(ctx: &RefactorContext) -> Vec<Candidate> {
    let root = ctx.root();
    ctx.scope
        .top_level()
        .filter(|(_, d)| !d.exported)
        .filter_map(|(id, d)| match d.kind {
            DeclKind::Function | DeclKind::Class | DeclKind::Type => Some(Candidate {
                decl: id,
                own: d.statement,
                statement: d.statement,
                declarator: None,
            }),
            DeclKind::Const | DeclKind::Let | DeclKind::Var => {
                let span = d.declarator?;
                let declarator = smallest_covering(&root, span.start, span.end)
                    .filter(|n| n.kind() == "variable_declarator")?;
                let simple = declarator.child_by_field_name("name").map(|n| n.kind()) == Some("identifier");
                let pure = declarator
                    .child_by_field_name("value")
                    .map_or(true, |v| is_side_effect_free(&v));
                (simple && pure).then(|| Candidate {
                    decl: id,
                    own: if d.sibling_declarators > 1 { span } else { d.statement },
                    statement: d.statement,
                    declarator: Some(span),
                })
            }
            _ => None,
        })
        .collect()
}

/// Grow the dead set until every reference to a member comes from dead code
fn dead_set(ctx: &RefactorContext, candidates: &[Candidate]) -> HashSet<DeclId> {
    let mut dead: HashSet<DeclId> = HashSet::new();
    loop {
        let mut changed = false;
        for c in candidates {
            if dead.contains(&c.decl) {
                continue;
            }
            let only_dead_uses = ctx.scope.references_to(c.decl).all(|r| {
                c.own.contains(&r.span)
                    || candidates
                        .iter()
                        .any(|other| dead.contains(&other.decl) && other.own.contains(&r.span))
            });
            if only_dead_uses {
                dead.insert(c.decl);
                changed = true;
            }
        }
        if !changed {
            return dead;
        }
    }
}
