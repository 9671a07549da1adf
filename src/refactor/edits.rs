//! Text edits, plan assembly and self-validation

use crate::error::RefactorError;
use crate::schema::{OperationKind, RefactoringPlan, SourceUnit, Span, TextEdit};
use crate::syntax::query::{line_end_inclusive, line_start};
use crate::syntax::{parse, LineIndex};

/// Apply non-overlapping edits to `text`
///
/// Edits are applied from the end of the text backwards so earlier offsets
/// stay valid. Zero-width inserts may touch the end of a replacement.
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> Result<String, RefactorError> {
    let mut sorted: Vec<&TextEdit> = edits.iter().collect();
    sorted.sort_by(|a, b| (a.start, a.end).cmp(&(b.start, b.end)));

    for pair in sorted.windows(2) {
        if pair[1].start < pair[0].end {
            return Err(RefactorError::UnsafeTransform {
                details: format!(
                    "edits {}..{} and {}..{} overlap",
                    pair[0].start, pair[0].end, pair[1].start, pair[1].end
                ),
            });
        }
    }

    let mut out = text.to_string();
    for edit in sorted.iter().rev() {
        if edit.start > edit.end || edit.end > out.len() || !out.is_char_boundary(edit.start) || !out.is_char_boundary(edit.end) {
            return Err(RefactorError::UnsafeTransform {
                details: format!("edit {}..{} is outside the source", edit.start, edit.end),
            });
        }
        out.replace_range(edit.start..edit.end, &edit.new_text);
    }
    Ok(out)
}

/// Assemble a plan and re-parse the proposed text
///
/// A proposal that no longer parses is rejected as `UnsafeTransform`; the
/// source unit itself is never modified.
pub fn build_plan(
    unit: &SourceUnit,
    operation_kind: OperationKind,
    target_spans: Vec<Span>,
    mut edits: Vec<TextEdit>,
    dry_run: bool,
) -> Result<RefactoringPlan, RefactorError> {
    edits.sort_by(|a, b| (a.start, a.end).cmp(&(b.start, b.end)));
    edits.dedup();
    let proposed_text = apply_edits(unit.text(), &edits)?;

    if let Err(err) = parse(&proposed_text, unit.dialect()) {
        return Err(RefactorError::UnsafeTransform {
            details: format!("result does not parse at {}:{}: {}", err.line, err.column, err.message),
        });
    }

    let index = LineIndex::new(unit.text());
    let affected_spans = edits.iter().map(|e| index.span(e.start, e.end)).collect();

    Ok(RefactoringPlan {
        operation_kind,
        target_spans,
        proposed_text,
        edits,
        affected_spans,
        is_dry_run: dry_run,
        base_hash: unit.content_hash().to_string(),
    })
}

pub fn replace(span: Span, new_text: impl Into<String>) -> TextEdit {
    TextEdit {
        start: span.start,
        end: span.end,
        new_text: new_text.into(),
    }
}

pub fn insert(offset: usize, new_text: impl Into<String>) -> TextEdit {
    TextEdit {
        start: offset,
        end: offset,
        new_text: new_text.into(),
    }
}

/// Byte range removing a statement together with its attached comments
///
/// When the statement owns its lines, whole lines go (including comment
/// lines directly above it); otherwise only the statement text is removed.
pub fn statement_removal(text: &str, span: Span) -> (usize, usize) {
    let first_line = line_start(text, span.start);
    let owns_start = text[first_line..span.start].trim().is_empty();
    let last_line_end = line_end_inclusive(text, span.end);
    let owns_end = text[span.end..last_line_end].trim().is_empty();
    if !owns_start || !owns_end {
        return (span.start, span.end);
    }
    (attached_comment_start(text, first_line), last_line_end)
}

/// Start of the run of comment lines directly above `line` (no blank line between)
pub fn attached_comment_start(text: &str, line: usize) -> usize {
    let mut start = line;
    let mut in_block = false;
    while start > 0 {
        let prev = line_start(text, start - 1);
        let content = text[prev..start].trim();
        let is_comment = if in_block {
            if content.starts_with("/*") {
                in_block = false;
            }
            true
        } else if content.starts_with("//") || (content.starts_with("/*") && content.ends_with("*/")) {
            true
        } else if content.ends_with("*/") {
            in_block = !content.starts_with("/*");
            true
        } else {
            false
        };
        if !is_comment || content.is_empty() {
            break;
        }
        start = prev;
    }
    if in_block {
        // Unterminated block comment run; keep the comments untouched
        return line;
    }
    start
}
