//! Per-file analysis
//!
//! Extracts functions, components, imports/exports, binding usage, metrics,
//! rule patterns and refactor hints from one source unit. Analysis is a pure
//! function of the unit text, its dialect and the configuration.

pub mod complexity;
pub mod components;
pub mod hints;
pub mod modules;
pub mod scope;

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use crate::config::Config;
use crate::error::AnalysisError;
use crate::rules::{self, RuleContext};
use crate::schema::{
    AnalysisResult, BindingInfo, BindingKind, FunctionInfo, Metrics, Sections, SourceUnit, Span,
};
use crate::syntax::{parse, visit_all, SyntaxTree};

use self::complexity::{cyclomatic, declared_name, is_async, parameters, style_of, type_slots};
use self::scope::{DeclKind, RefKind, ScopeModel};

/// Which optional sections to compute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzeOptions {
    pub include_metrics: bool,
    pub include_patterns: bool,
    /// Refactor hints
    pub include_suggestions: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self::all()
    }
}

impl AnalyzeOptions {
    pub fn all() -> Self {
        Self {
            include_metrics: true,
            include_patterns: true,
            include_suggestions: true,
        }
    }

    pub fn sections(&self) -> Sections {
        Sections {
            metrics: self.include_metrics,
            patterns: self.include_patterns,
            suggestions: self.include_suggestions,
        }
    }
}

/// Parse and analyze a source unit
pub fn analyze(unit: &SourceUnit, options: &AnalyzeOptions, config: &Config) -> Result<AnalysisResult, AnalysisError> {
    let tree = parse(unit.text(), unit.dialect())?;
    let result = analyze_tree(unit, &tree, options, config);
    result.validate().map_err(|details| AnalysisError::InvariantViolation { details })?;
    Ok(result)
}

/// Analyze an already parsed tree of `unit`
pub fn analyze_tree(unit: &SourceUnit, tree: &SyntaxTree, options: &AnalyzeOptions, config: &Config) -> AnalysisResult {
    let root = tree.root();
    let source = tree.source();
    let scope = ScopeModel::build(tree);

    // Module surface
    let imports = modules::extract_imports(tree, &scope);
    let exports = modules::extract_exports(tree);
    let dynamic_imports = modules::extract_dynamic_imports(tree);
    let dependencies = modules::dependencies(&imports, &exports, &dynamic_imports);
    let jsx_usages = if unit.dialect().supports_jsx() {
        modules::extract_jsx_usages(tree)
    } else {
        Vec::new()
    };

    // Functions and components
    let functions = extract_functions(&root, source, &scope);
    let components = components::collect(tree, unit.file_stem(), &exports);
    let bindings = extract_bindings(&scope);

    let mut result = AnalysisResult {
        file: unit.path().to_string(),
        dialect: unit.dialect(),
        content_hash: unit.content_hash().to_string(),
        source_len: source.len(),
        sections: options.sections(),
        metrics: Metrics::default(),
        functions,
        components,
        imports,
        exports,
        dependencies,
        dynamic_imports,
        jsx_usages,
        bindings,
        patterns: Vec::new(),
        hints: Vec::new(),
    };

    if options.include_metrics {
        result.metrics = compute_metrics(&root, unit, &result.functions);
    }

    if options.include_patterns {
        let ctx = RuleContext {
            source,
            dialect: unit.dialect(),
            config,
            components: &result.components,
        };
        result.patterns = rules::run(tree, &ctx);
    }

    if options.include_suggestions {
        result.hints = hints::collect(tree, &scope, &result, config);
    }

    tracing::trace!(
        file = %unit.path(),
        functions = result.functions.len(),
        components = result.components.len(),
        patterns = result.patterns.len(),
        "analyzed"
    );
    result
}

// ============================================================================
// Functions
// ============================================================================

fn extract_functions(root: &Node, source: &str, scope: &ScopeModel) -> Vec<FunctionInfo> {
    let mut functions = Vec::new();
    visit_all(*root, |node| {
        let Some(name) = declared_name(&node, source) else {
            return;
        };
        let span = Span::from_node(&node);
        let is_exported = scope
            .top_level()
            .any(|(_, d)| d.exported && d.name == name && d.statement.contains(&span))
            || (name == "default" && node.parent().map_or(false, |p| p.kind() == "export_statement"));

        functions.push(FunctionInfo {
            cyclomatic_complexity: cyclomatic(&node, source),
            parameter_count: parameters(&node).len(),
            is_async: is_async(&node),
            style: style_of(&node),
            name,
            span,
            is_exported,
        });
    });
    functions
}

// ============================================================================
// Bindings
// ============================================================================

fn extract_bindings(scope: &ScopeModel) -> Vec<BindingInfo> {
    scope
        .top_level()
        .map(|(id, decl)| {
            let own = decl.declarator.unwrap_or(decl.statement);
            let outside: Vec<_> = scope
                .references_to(id)
                .filter(|r| !own.contains(&r.span))
                .collect();
            let kind = match decl.kind {
                DeclKind::Import => BindingKind::Import,
                DeclKind::Function => BindingKind::Function,
                DeclKind::Class => BindingKind::Class,
                DeclKind::Type => BindingKind::Type,
                _ => BindingKind::Variable,
            };
            BindingInfo {
                name: decl.name.clone(),
                kind,
                span: decl.statement,
                name_span: decl.name_span,
                references: outside.len(),
                jsx_references: outside.iter().filter(|r| r.kind == RefKind::JsxName).count(),
                is_exported: decl.exported,
            }
        })
        .collect()
}

// ============================================================================
// Metrics
// ============================================================================

fn compute_metrics(root: &Node, unit: &SourceUnit, functions: &[FunctionInfo]) -> Metrics {
    let text = unit.text();
    let line_count = if text.is_empty() { 0 } else { text.lines().count() };

    let function_count = functions.len();
    let max_complexity = functions.iter().map(|f| f.cyclomatic_complexity).max().unwrap_or(0);
    let average_complexity = if function_count == 0 {
        0.0
    } else {
        functions.iter().map(|f| f.cyclomatic_complexity).sum::<usize>() as f64 / function_count as f64
    };

    let (mut annotated, mut total) = (0usize, 0usize);
    visit_all(*root, |node| {
        if crate::syntax::NodeKind::of(&node).is_function_like() {
            let (a, t) = type_slots(&node, text);
            annotated += a;
            total += t;
        }
    });
    let type_coverage_ratio = match (unit.dialect().is_typed(), total) {
        (false, _) => 0.0,
        (true, 0) => 1.0,
        (true, _) => annotated as f64 / total as f64,
    };

    Metrics {
        line_count,
        function_count,
        average_complexity,
        max_complexity,
        type_coverage_ratio,
    }
}
