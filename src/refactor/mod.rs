//! Safe, previewable source transformations
//!
//! Every operation works on a fresh parse of the unit, produces a list of
//! non-overlapping text edits, and is only accepted when the edited text
//! parses again. The source unit itself is never modified; committing a
//! plan goes through `RefactoringPlan::commit`.

pub mod convert;
pub mod dead_code;
pub mod edits;
pub mod extract;
pub mod imports;
pub mod rename;
pub mod variables;

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use crate::analyzer::scope::{DeclId, Reference, ScopeKind, ScopeModel};
use crate::error::RefactorError;
use crate::schema::{AnalysisResult, OperationKind, RefactorHint, RefactoringPlan, SourceUnit, Span, TextEdit};
use crate::syntax::query::{contains_matching, is_valid_identifier};
use crate::syntax::{parse, SyntaxTree};

/// Byte range selected by the caller; surrounding whitespace is ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Shrink the selection past leading and trailing whitespace
    pub fn trimmed(&self, text: &str) -> Result<Self, RefactorError> {
        if self.start > self.end || self.end > text.len() {
            return Err(RefactorError::InvalidSelection {
                details: format!("{}..{} is outside 0..{}", self.start, self.end, text.len()),
            });
        }
        let slice = text.get(self.start..self.end).ok_or_else(|| RefactorError::InvalidSelection {
            details: format!("{}..{} does not fall on character boundaries", self.start, self.end),
        })?;
        let start = self.start + (slice.len() - slice.trim_start().len());
        let end = self.end - (slice.len() - slice.trim_end().len());
        if start >= end {
            return Err(RefactorError::InvalidSelection {
                details: "selection is empty".to_string(),
            });
        }
        Ok(Self { start, end })
    }
}

/// A requested transformation and its parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
pub enum RefactorOperation {
    ExtractFunction { selection: Selection, name: String },
    ExtractComponent { selection: Selection, name: String },
    ConvertFunctionStyle { position: usize },
    RenameSymbol { position: usize, new_name: String },
    ExtractVariable {
        selection: Selection,
        #[serde(default)]
        name: Option<String>,
    },
    InlineVariable { position: usize },
    OrganizeImports,
    RemoveDeadCode,
}

impl RefactorOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::ExtractFunction { .. } => OperationKind::ExtractFunction,
            Self::ExtractComponent { .. } => OperationKind::ExtractComponent,
            Self::ConvertFunctionStyle { .. } => OperationKind::ConvertFunctionStyle,
            Self::RenameSymbol { .. } => OperationKind::RenameSymbol,
            Self::ExtractVariable { .. } => OperationKind::ExtractVariable,
            Self::InlineVariable { .. } => OperationKind::InlineVariable,
            Self::OrganizeImports => OperationKind::OrganizeImports,
            Self::RemoveDeadCode => OperationKind::RemoveDeadCode,
        }
    }

    /// Operation a hint can be turned into without further user input
    pub fn from_hint(hint: &RefactorHint) -> Option<Self> {
        match hint.operation {
            OperationKind::OrganizeImports => Some(Self::OrganizeImports),
            OperationKind::RemoveDeadCode => Some(Self::RemoveDeadCode),
            OperationKind::ConvertFunctionStyle => Some(Self::ConvertFunctionStyle {
                position: hint.target_span.start,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefactorOptions {
    pub dry_run: bool,
}

impl Default for RefactorOptions {
    fn default() -> Self {
        Self { dry_run: true }
    }
}

/// Parsed state shared by the individual operations
pub struct RefactorContext<'a> {
    pub unit: &'a SourceUnit,
    pub tree: &'a SyntaxTree,
    pub scope: &'a ScopeModel,
}

impl<'a> RefactorContext<'a> {
    pub fn source(&self) -> &'a str {
        self.tree.source()
    }

    pub fn root(&self) -> Node<'a> {
        self.tree.root()
    }

    /// Innermost named node at a byte offset
    pub fn node_at(&self, position: usize) -> Option<Node<'a>> {
        if position > self.source().len() {
            return None;
        }
        self.root().named_descendant_for_byte_range(position, position)
    }

    /// Whether a reference is only evaluated when some nested function runs
    pub fn is_deferred(&self, reference: &Reference, decl: DeclId) -> bool {
        let target = self.scope.declarations[decl].scope;
        self.scope
            .chain(reference.scope)
            .into_iter()
            .take_while(|s| *s != target)
            .any(|s| self.scope.scopes[s].kind == ScopeKind::Function)
    }
}

/// Edits produced by one operation, before validation
#[derive(Debug, Clone, Default)]
pub struct Change {
    pub target_spans: Vec<Span>,
    pub edits: Vec<TextEdit>,
}

/// Compute a refactoring plan for `unit`
///
/// `analysis` must describe the same content; a mismatched hash is rejected
/// as `StaleSource` rather than producing edits against the wrong text.
pub fn refactor(
    unit: &SourceUnit,
    analysis: &AnalysisResult,
    operation: &RefactorOperation,
    options: &RefactorOptions,
) -> Result<RefactoringPlan, RefactorError> {
    let kind = operation.kind();
    match plan(unit, analysis, operation, options) {
        Ok(plan) => {
            tracing::debug!(
                file = %unit.path(),
                operation = %kind,
                edits = plan.edits.len(),
                dry_run = plan.is_dry_run,
                "refactor planned"
            );
            Ok(plan)
        }
        Err(err) => {
            tracing::warn!(
                file = %unit.path(),
                operation = %kind,
                reason = err.reason(),
                "refactor rejected: {}",
                err
            );
            Err(err)
        }
    }
}

fn plan(
    unit: &SourceUnit,
    analysis: &AnalysisResult,
    operation: &RefactorOperation,
    options: &RefactorOptions,
) -> Result<RefactoringPlan, RefactorError> {
    if analysis.content_hash != unit.content_hash() {
        return Err(RefactorError::StaleSource {
            expected: analysis.content_hash.clone(),
            actual: unit.content_hash().to_string(),
        });
    }

    let tree = parse(unit.text(), unit.dialect())?;
    let scope = ScopeModel::build(&tree);
    let ctx = RefactorContext {
        unit,
        tree: &tree,
        scope: &scope,
    };

    let change = match operation {
        RefactorOperation::ExtractFunction { selection, name } => extract::extract_function(&ctx, *selection, name)?,
        RefactorOperation::ExtractComponent { selection, name } => extract::extract_component(&ctx, *selection, name)?,
        RefactorOperation::ConvertFunctionStyle { position } => convert::convert_function_style(&ctx, *position)?,
        RefactorOperation::RenameSymbol { position, new_name } => rename::rename_symbol(&ctx, *position, new_name)?,
        RefactorOperation::ExtractVariable { selection, name } => {
            variables::extract_variable(&ctx, *selection, name.as_deref())?
        }
        RefactorOperation::InlineVariable { position } => variables::inline_variable(&ctx, *position)?,
        RefactorOperation::OrganizeImports => imports::organize_imports(&ctx)?,
        RefactorOperation::RemoveDeadCode => dead_code::remove_dead_code(&ctx)?,
    };

    edits::build_plan(unit, operation.kind(), change.target_spans, change.edits, options.dry_run)
}

// ============================================================================
// Shared helpers
// ============================================================================

pub(crate) fn check_identifier(name: &str) -> Result<(), RefactorError> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(RefactorError::InvalidName { name: name.to_string() })
    }
}

/// A new binding called `name` visible from `scope` would shadow or be shadowed
pub(crate) fn name_taken(model: &ScopeModel, name: &str, scope: usize) -> bool {
    model.lookup(name, scope).is_some()
        || model
            .references
            .iter()
            .any(|r| r.name == name && model.is_within(r.scope, scope))
}

/// Re-indent a multi-line snippet from one base indentation to another
///
/// Snippets containing multi-line template literals are only prefixed, so
/// the literal contents stay byte-identical.
pub(crate) fn reindent(node: &Node, text: &str, from: &str, to: &str) -> String {
    let has_multiline_template = contains_matching(node, false, |n| {
        n.kind() == "template_string" && n.start_position().row != n.end_position().row
    });
    if has_multiline_template {
        return format!("{}{}", to, text);
    }
    text.split('\n')
        .enumerate()
        .map(|(i, line)| {
            if line.trim().is_empty() {
                String::new()
            } else if i == 0 {
                format!("{}{}", to, line)
            } else {
                let stripped = line.strip_prefix(from).unwrap_or_else(|| line.trim_start());
                format!("{}{}", to, stripped)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replacement for a `const a = 1, b = 2;` declarator list keeping only `kept`
pub(crate) fn declarator_list_edit(declaration: &Node, kept: &[Node], source: &str) -> Option<TextEdit> {
    let declarators: Vec<Node> = crate::syntax::query::named_children(declaration)
        .into_iter()
        .filter(|c| c.kind() == "variable_declarator")
        .collect();
    let first = declarators.first()?;
    let last = declarators.last()?;
    let text = kept
        .iter()
        .map(|d| crate::syntax::query::node_text(d, source))
        .collect::<Vec<_>>()
        .join(", ");
    Some(TextEdit {
        start: first.start_byte(),
        end: last.end_byte(),
        new_text: text,
    })
}
