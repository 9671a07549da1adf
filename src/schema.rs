//! Data model shared by the analyzer, optimizer, refactorer and service

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, RefactorError};
use crate::lang::Dialect;
use crate::utils::content_hash;

pub use crate::syntax::Span;

/// One file submitted for analysis. Immutable; identity is path + content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    path: String,
    text: String,
    dialect: Dialect,
    content_hash: String,
}

impl SourceUnit {
    /// Create a unit, detecting the dialect from the path extension
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Result<Self, AnalysisError> {
        let path = path.into();
        let dialect = Dialect::from_path(Path::new(&path))?;
        Ok(Self::with_dialect(path, text, dialect))
    }

    pub fn with_dialect(path: impl Into<String>, text: impl Into<String>, dialect: Dialect) -> Self {
        let text = text.into();
        Self {
            path: path.into(),
            content_hash: content_hash(&text),
            text,
            dialect,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Same path and dialect, new content
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self::with_dialect(self.path.clone(), text, self.dialect)
    }

    /// File stem, e.g. `Header` for `src/Header.tsx`
    pub fn file_stem(&self) -> &str {
        Path::new(&self.path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("")
    }
}

/// Which optional sections an `AnalysisResult` carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sections {
    pub metrics: bool,
    pub patterns: bool,
    pub suggestions: bool,
}

/// Aggregate file metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub line_count: usize,
    pub function_count: usize,
    pub average_complexity: f64,
    pub max_complexity: usize,
    /// Annotated parameters and return types over all annotatable slots
    pub type_coverage_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionStyle {
    Declaration,
    Arrow,
    Expression,
    Method,
}

/// A named function, arrow function or method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    pub span: Span,
    pub cyclomatic_complexity: usize,
    pub parameter_count: usize,
    pub is_exported: bool,
    pub is_async: bool,
    pub style: FunctionStyle,
}

/// Component prop definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropInfo {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prop_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,

    pub required: bool,
}

impl PropInfo {
    /// Whether the declared type is known to be a primitive
    pub fn is_primitive(&self) -> bool {
        match &self.prop_type {
            Some(t) => t
                .split('|')
                .map(str::trim)
                .all(|part| {
                    matches!(
                        part,
                        "string" | "number" | "boolean" | "bigint" | "null" | "undefined" | "symbol"
                    ) || part.starts_with('"')
                        || part.starts_with('\'')
                        || part.parse::<f64>().is_ok()
                        || part == "true"
                        || part == "false"
                }),
            None => false,
        }
    }
}

/// A function classified as a UI component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub name: String,
    pub span: Span,
    pub hooks_used: BTreeSet<String>,
    pub props_shape: Vec<PropInfo>,
    pub has_memoization: bool,
    pub is_default_export: bool,
    /// Deepest JSX element nesting in the render output
    pub jsx_depth: usize,
    /// A loop or list `.map(...)` runs during render
    pub has_render_loop: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecifierKind {
    Default,
    Named,
    Namespace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSpecifier {
    /// Name exported by the module (`default` / `*` for default and namespace)
    pub imported: String,
    /// Local binding name
    pub local: String,
    pub kind: SpecifierKind,
    pub is_type_only: bool,
}

/// How a namespace import (`import * as ns`) is used
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceUsage {
    /// Distinct `ns.member` names referenced
    pub members: BTreeSet<String>,
    /// The namespace object itself is passed around as a value
    pub escapes: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportInfo {
    pub module_path: String,
    pub binding_names: Vec<String>,
    pub is_type_only: bool,
    pub span: Span,
    pub specifiers: Vec<ImportSpecifier>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_usage: Option<NamespaceUsage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportInfo {
    /// Source module for re-exports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_path: Option<String>,
    pub binding_names: Vec<String>,
    pub is_type_only: bool,
    pub is_default: bool,
    pub span: Span,
}

/// `import('...')` expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicImport {
    pub module_path: String,
    pub span: Span,
    /// Wrapped in `lazy(...)` / `React.lazy(...)`
    pub is_lazy: bool,
}

/// A capitalized JSX element rendered in this file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsxUsage {
    pub name: String,
    pub span: Span,
    /// Rendered behind `&&`, `||` or a ternary
    pub conditional: bool,
    /// Props passed an object, array or function literal
    pub non_primitive_props: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingKind {
    Import,
    Function,
    Class,
    Variable,
    Type,
}

/// Usage data for a top-level binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingInfo {
    pub name: String,
    pub kind: BindingKind,
    /// The declaring statement
    pub span: Span,
    pub name_span: Span,
    pub references: usize,
    /// References that are JSX element names (`<Name />`)
    pub jsx_references: usize,
    pub is_exported: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternKind {
    AntiPattern,
    BestPractice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

/// A rule-detected code shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub rule: String,
    pub kind: PatternKind,
    pub span: Span,
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    ExtractFunction,
    ExtractComponent,
    ConvertFunctionStyle,
    RenameSymbol,
    ExtractVariable,
    InlineVariable,
    OrganizeImports,
    RemoveDeadCode,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtractFunction => "extract-function",
            Self::ExtractComponent => "extract-component",
            Self::ConvertFunctionStyle => "convert-function-style",
            Self::RenameSymbol => "rename-symbol",
            Self::ExtractVariable => "extract-variable",
            Self::InlineVariable => "inline-variable",
            Self::OrganizeImports => "organize-imports",
            Self::RemoveDeadCode => "remove-dead-code",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A refactoring the analyzer thinks is worth offering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefactorHint {
    pub operation: OperationKind,
    pub target_span: Span,
    pub reason: String,
}

/// Everything the analyzer learned about one source unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub file: String,
    pub dialect: Dialect,
    pub content_hash: String,
    pub source_len: usize,
    pub sections: Sections,
    pub metrics: Metrics,
    pub functions: Vec<FunctionInfo>,
    pub components: Vec<ComponentInfo>,
    pub imports: Vec<ImportInfo>,
    pub exports: Vec<ExportInfo>,
    /// Local edge list: this file → module paths it imports
    pub dependencies: Vec<String>,
    pub dynamic_imports: Vec<DynamicImport>,
    pub jsx_usages: Vec<JsxUsage>,
    pub bindings: Vec<BindingInfo>,
    pub patterns: Vec<Pattern>,
    pub hints: Vec<RefactorHint>,
}

impl AnalysisResult {
    /// Check that every recorded span lies within the analyzed text
    pub fn validate(&self) -> Result<(), String> {
        let spans = self
            .functions
            .iter()
            .map(|f| (&f.name, f.span))
            .chain(self.components.iter().map(|c| (&c.name, c.span)))
            .chain(self.patterns.iter().map(|p| (&p.rule, p.span)))
            .chain(self.bindings.iter().map(|b| (&b.name, b.span)));

        for (label, span) in spans {
            if span.start > span.end || span.end > self.source_len {
                return Err(format!(
                    "span {}..{} of '{}' is outside 0..{}",
                    span.start, span.end, label, self.source_len
                ));
            }
        }
        Ok(())
    }

    /// Copy with the optional sections not requested cleared
    pub fn project(&self, sections: Sections) -> Self {
        let mut out = self.clone();
        if !sections.metrics {
            out.metrics = Metrics::default();
        }
        if !sections.patterns {
            out.patterns.clear();
        }
        if !sections.suggestions {
            out.hints.clear();
        }
        out.sections = Sections {
            metrics: self.sections.metrics && sections.metrics,
            patterns: self.sections.patterns && sections.patterns,
            suggestions: self.sections.suggestions && sections.suggestions,
        };
        out
    }

    pub fn function(&self, name: &str) -> Option<&FunctionInfo> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn component(&self, name: &str) -> Option<&ComponentInfo> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn binding(&self, name: &str) -> Option<&BindingInfo> {
        self.bindings.iter().find(|b| b.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuggestionKind {
    Memoize,
    Split,
    TreeShake,
    LazyLoad,
}

impl SuggestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memoize => "memoize",
            Self::Split => "split",
            Self::TreeShake => "tree-shake",
            Self::LazyLoad => "lazy-load",
        }
    }
}

/// Coarse, heuristic impact estimate. Not a measured benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Medium,
    High,
}

impl Impact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationSuggestion {
    pub kind: SuggestionKind,
    pub target_span: Span,
    pub rationale: String,
    pub estimated_impact: Impact,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_action: Option<String>,
}

/// Replace `[start, end)` of the original text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub start: usize,
    pub end: usize,
    pub new_text: String,
}

/// A previewable source-to-source transformation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefactoringPlan {
    pub operation_kind: OperationKind,
    pub target_spans: Vec<Span>,
    /// Full text of the file after the edit
    pub proposed_text: String,
    pub edits: Vec<TextEdit>,
    /// Regions of the original text invalidated by the edit
    pub affected_spans: Vec<Span>,
    pub is_dry_run: bool,
    /// Content hash of the text the plan was computed against
    pub base_hash: String,
}

impl RefactoringPlan {
    pub fn is_noop(&self) -> bool {
        self.edits.is_empty()
    }

    /// Apply the plan, producing the new source unit
    ///
    /// Dry runs and plans built for different content are refused; the
    /// original unit is never modified either way.
    pub fn commit(&self, unit: &SourceUnit) -> Result<SourceUnit, RefactorError> {
        if self.is_dry_run {
            return Err(RefactorError::DryRunPlan);
        }
        if unit.content_hash() != self.base_hash {
            return Err(RefactorError::StaleSource {
                expected: self.base_hash.clone(),
                actual: unit.content_hash().to_string(),
            });
        }
        Ok(unit.with_text(self.proposed_text.clone()))
    }
}
