//! Optimization suggestions derived from an analysis result
//!
//! Four independent policies (memoize, split, tree-shake, lazy-load) each
//! propose suggestions; the combined list is de-duplicated on
//! (kind, target span) and ranked by impact, position and kind.
//!
//! Impact estimates are coarse heuristics based on render cost and file
//! size. They are not measurements.

use std::collections::HashSet;
use std::path::Path;

use crate::config::Config;
use crate::error::OptimizationError;
use crate::schema::{AnalysisResult, ComponentInfo, Impact, OptimizationSuggestion, Span, SpecifierKind, SuggestionKind};
use crate::syntax::query::is_capitalized;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizeOptions {
    pub max_file_size_for_split: usize,
    pub tree_shake_max_bindings: usize,
    pub memo_min_jsx_depth: usize,
    /// Files the caller already loads lazily; never proposed for splitting
    pub lazy_loaded_paths: Vec<String>,
}

impl OptimizeOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_file_size_for_split: config.max_file_size_for_split_suggestion,
            tree_shake_max_bindings: config.tree_shake_max_bindings,
            memo_min_jsx_depth: config.memo_min_jsx_depth,
            lazy_loaded_paths: Vec::new(),
        }
    }
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Produce ranked, de-duplicated suggestions
pub fn optimize(
    analysis: &AnalysisResult,
    options: &OptimizeOptions,
) -> Result<Vec<OptimizationSuggestion>, OptimizationError> {
    if !analysis.sections.metrics {
        return Err(OptimizationError::MissingAnalysisSection { section: "metrics" });
    }
    analysis
        .validate()
        .map_err(|details| OptimizationError::InvalidAnalysis { details })?;

    let mut suggestions = Vec::new();
    suggestions.extend(memoize(analysis, options));
    suggestions.extend(split(analysis, options));
    suggestions.extend(tree_shake(analysis, options));
    suggestions.extend(lazy_load(analysis));

    let mut seen = HashSet::new();
    suggestions.retain(|s| seen.insert((s.kind, s.target_span)));
    suggestions.sort_by(|a, b| {
        b.estimated_impact
            .cmp(&a.estimated_impact)
            .then(a.target_span.start.cmp(&b.target_span.start))
            .then(a.kind.cmp(&b.kind))
    });

    tracing::debug!(file = %analysis.file, count = suggestions.len(), "ranked suggestions");
    Ok(suggestions)
}

// ============================================================================
// Memoize
// ============================================================================

fn memoize(analysis: &AnalysisResult, options: &OptimizeOptions) -> Vec<OptimizationSuggestion> {
    analysis
        .components
        .iter()
        .filter(|c| !c.has_memoization)
        .filter_map(|c| {
            let untyped_or_object_props: Vec<&str> = c
                .props_shape
                .iter()
                .filter(|p| !p.is_primitive())
                .map(|p| p.name.as_str())
                .collect();
            let literal_call_sites = analysis
                .jsx_usages
                .iter()
                .filter(|u| u.name == c.name && !u.non_primitive_props.is_empty())
                .count();
            if untyped_or_object_props.is_empty() && literal_call_sites == 0 {
                return None;
            }

            let deep = c.jsx_depth > options.memo_min_jsx_depth;
            if !deep && !c.has_render_loop {
                return None;
            }

            let mut reasons = Vec::new();
            if c.has_render_loop {
                reasons.push("renders a list".to_string());
            }
            if deep {
                reasons.push(format!("JSX depth {}", c.jsx_depth));
            }
            if !untyped_or_object_props.is_empty() {
                reasons.push(format!("non-primitive props: {}", untyped_or_object_props.join(", ")));
            }
            if literal_call_sites > 0 {
                reasons.push(format!("{} call site(s) pass fresh literals", literal_call_sites));
            }

            Some(OptimizationSuggestion {
                kind: SuggestionKind::Memoize,
                target_span: c.span,
                rationale: format!("'{}' is not memoized and {}", c.name, reasons.join("; ")),
                estimated_impact: if deep && c.has_render_loop {
                    Impact::High
                } else {
                    Impact::Medium
                },
                code_action: Some(memo_action(c)),
            })
        })
        .collect()
}

fn memo_action(component: &ComponentInfo) -> String {
    if component.is_default_export {
        format!("export default memo({});", component.name)
    } else {
        format!("const Memoized{0} = memo({0});", component.name)
    }
}

// ============================================================================
// Split
// ============================================================================

fn split(analysis: &AnalysisResult, options: &OptimizeOptions) -> Vec<OptimizationSuggestion> {
    let line_count = analysis.metrics.line_count;
    if line_count <= options.max_file_size_for_split {
        return Vec::new();
    }
    if options
        .lazy_loaded_paths
        .iter()
        .any(|p| same_module(&analysis.file, p))
    {
        return Vec::new();
    }

    let stem = Path::new(&analysis.file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("module");
    let target: Option<(String, Span)> = analysis
        .components
        .iter()
        .find(|c| c.is_default_export)
        .map(|c| (c.name.clone(), c.span))
        .or_else(|| {
            analysis
                .exports
                .iter()
                .find(|e| e.is_default && e.module_path.is_none())
                .map(|e| (binding_name_for(stem), e.span))
        });
    let Some((name, span)) = target else {
        return Vec::new();
    };

    vec![OptimizationSuggestion {
        kind: SuggestionKind::Split,
        target_span: span,
        rationale: format!(
            "{} lines exceed the split threshold of {}; load '{}' on demand",
            line_count, options.max_file_size_for_split, name
        ),
        estimated_impact: if line_count > options.max_file_size_for_split * 2 {
            Impact::High
        } else {
            Impact::Medium
        },
        code_action: Some(format!("const {} = lazy(() => import('./{}'));", name, stem)),
    }]
}

fn binding_name_for(stem: &str) -> String {
    let mut chars = stem.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '_');
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + &chars.collect::<String>(),
        None => "Module".to_string(),
    }
}

/// Compare a file path against a module reference, ignoring extension and `./`
fn same_module(file: &str, reference: &str) -> bool {
    fn normalize(p: &str) -> &str {
        let p = p.trim_start_matches("./");
        match p.rfind('.') {
            Some(dot) if dot > p.rfind('/').map_or(0, |s| s + 1) => &p[..dot],
            _ => p,
        }
    }
    let (file, reference) = (normalize(file), normalize(reference));
    file == reference || file.ends_with(&format!("/{}", reference))
}

// ============================================================================
// Tree-shake
// ============================================================================

fn tree_shake(analysis: &AnalysisResult, options: &OptimizeOptions) -> Vec<OptimizationSuggestion> {
    analysis
        .imports
        .iter()
        .filter(|i| !i.is_type_only)
        .filter_map(|import| {
            let usage = import.namespace_usage.as_ref()?;
            let local = import
                .specifiers
                .iter()
                .find(|s| s.kind == SpecifierKind::Namespace)
                .map(|s| s.local.as_str())?;
            if usage.escapes || usage.members.is_empty() || usage.members.len() > options.tree_shake_max_bindings {
                return None;
            }
            let members: Vec<&str> = usage.members.iter().map(String::as_str).collect();
            Some(OptimizationSuggestion {
                kind: SuggestionKind::TreeShake,
                target_span: import.span,
                rationale: format!(
                    "namespace '{}' only uses {}; named imports let the bundler drop the rest of '{}'",
                    local,
                    members.join(", "),
                    import.module_path
                ),
                estimated_impact: if import.module_path.starts_with('.') {
                    Impact::Low
                } else {
                    Impact::Medium
                },
                code_action: Some(format!(
                    "import {{ {} }} from '{}';",
                    members.join(", "),
                    import.module_path
                )),
            })
        })
        .collect()
}

// ============================================================================
// Lazy-load
// ============================================================================

/// One suggestion per import, naming every conditionally rendered binding it brings in
fn lazy_load(analysis: &AnalysisResult) -> Vec<OptimizationSuggestion> {
    let mut out = Vec::new();
    for import in analysis.imports.iter().filter(|i| i.module_path.starts_with('.') && !i.is_type_only) {
        let mut names = Vec::new();
        let mut actions = Vec::new();
        for spec in &import.specifiers {
            if spec.kind == SpecifierKind::Namespace || !is_capitalized(&spec.local) {
                continue;
            }
            let usages: Vec<_> = analysis.jsx_usages.iter().filter(|u| u.name == spec.local).collect();
            if usages.is_empty() || !usages.iter().all(|u| u.conditional) {
                continue;
            }
            let only_rendered = analysis
                .binding(&spec.local)
                .map_or(false, |b| b.references == b.jsx_references);
            if !only_rendered {
                continue;
            }

            let loader = match spec.kind {
                SpecifierKind::Default => format!("import('{}')", import.module_path),
                _ => format!(
                    "import('{}').then((m) => ({{ default: m.{} }}))",
                    import.module_path, spec.imported
                ),
            };
            names.push(format!("'{}'", spec.local));
            actions.push(format!("const {} = lazy(() => {});", spec.local, loader));
        }
        if names.is_empty() {
            continue;
        }
        let subject = if names.len() == 1 {
            format!("{} is", names[0])
        } else {
            format!("{} are", names.join(", "))
        };
        out.push(OptimizationSuggestion {
            kind: SuggestionKind::LazyLoad,
            target_span: import.span,
            rationale: format!(
                "{} only rendered conditionally; load '{}' when first shown",
                subject, import.module_path
            ),
            estimated_impact: Impact::Medium,
            code_action: Some(actions.join("\n")),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{analyze, AnalyzeOptions};
    use crate::schema::SourceUnit;

    fn suggestions(path: &str, src: &str, options: &OptimizeOptions) -> Vec<OptimizationSuggestion> {
        let unit = SourceUnit::new(path, src).unwrap();
        let analysis = analyze(&unit, &AnalyzeOptions::all(), &Config::default()).unwrap();
        optimize(&analysis, options).unwrap()
    }

    #[test]
    fn test_memoize_list_component() {
        let src = "function Big({x}){ return <div>{[1,2,3].map(i=><span key={i}>{x}</span>)}</div>; }";
        let found = suggestions("Big.jsx", src, &OptimizeOptions::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, SuggestionKind::Memoize);
        assert_eq!((found[0].target_span.start, found[0].target_span.end), (0, src.len()));
    }

    #[test]
    fn test_no_memoize_for_primitive_props_or_cheap_render() {
        let src = "function Label({ text }: { text: string }) { return <ul>{items.map(i => <li key={i}>{text}</li>)}</ul>; }\nfunction Cheap({ style }) { return <div style={style} />; }";
        let found = suggestions("Label.tsx", src, &OptimizeOptions::default());
        assert!(found.iter().all(|s| s.kind != SuggestionKind::Memoize));
    }

    #[test]
    fn test_missing_metrics_section() {
        let unit = SourceUnit::new("a.ts", "const a = 1;").unwrap();
        let options = AnalyzeOptions {
            include_metrics: false,
            ..AnalyzeOptions::all()
        };
        let analysis = analyze(&unit, &options, &Config::default()).unwrap();
        let err = optimize(&analysis, &OptimizeOptions::default()).unwrap_err();
        assert_eq!(err.reason(), "missing-analysis-section");
    }

    #[test]
    fn test_invalid_analysis() {
        let unit = SourceUnit::new("a.ts", "function f() {}").unwrap();
        let mut analysis = analyze(&unit, &AnalyzeOptions::all(), &Config::default()).unwrap();
        analysis.functions[0].span.end = 10_000;
        let err = optimize(&analysis, &OptimizeOptions::default()).unwrap_err();
        assert_eq!(err.reason(), "invalid-analysis");
    }

    #[test]
    fn test_split_large_default_export() {
        let body = "  const v = 1;\n".repeat(20);
        let src = format!("export default function Page() {{\n{}  return <main />;\n}}\n", body);
        let options = OptimizeOptions {
            max_file_size_for_split: 10,
            ..OptimizeOptions::default()
        };
        let found = suggestions("src/Page.jsx", &src, &options);
        let split: Vec<_> = found.iter().filter(|s| s.kind == SuggestionKind::Split).collect();
        assert_eq!(split.len(), 1);
        assert_eq!(split[0].estimated_impact, Impact::High);
        assert!(split[0].code_action.as_deref().unwrap().contains("lazy(() => import('./Page'))"));

        let already_lazy = OptimizeOptions {
            lazy_loaded_paths: vec!["./Page".to_string()],
            ..options
        };
        let found = suggestions("src/Page.jsx", &src, &already_lazy);
        assert!(found.iter().all(|s| s.kind != SuggestionKind::Split));
    }

    #[test]
    fn test_tree_shake_namespace_import() {
        let src = "import * as _ from 'lodash';\nimport * as all from 'all';\nexport const a = _.pick(x);\nexport const b = all;";
        let found = suggestions("a.ts", src, &OptimizeOptions::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, SuggestionKind::TreeShake);
        assert_eq!(found[0].code_action.as_deref(), Some("import { pick } from 'lodash';"));
    }

    #[test]
    fn test_lazy_load_conditional_component() {
        let src = "import Modal from './Modal';\nimport Footer from './Footer';\nexport function App({ open }) { return <div>{open && <Modal />}<Footer /></div>; }";
        let found = suggestions("App.jsx", src, &OptimizeOptions::default());
        let lazy: Vec<_> = found.iter().filter(|s| s.kind == SuggestionKind::LazyLoad).collect();
        assert_eq!(lazy.len(), 1);
        assert!(lazy[0].rationale.contains("'Modal'"));
    }

    #[test]
    fn test_lazy_load_keeps_every_binding_of_one_import() {
        let src = "import Modal, { Drawer } from './overlays';\nexport function App({ a, b }) { return <div>{a && <Modal />}{b ? <Drawer /> : null}</div>; }";
        let found = suggestions("App.jsx", src, &OptimizeOptions::default());
        let lazy: Vec<_> = found.iter().filter(|s| s.kind == SuggestionKind::LazyLoad).collect();
        assert_eq!(lazy.len(), 1);
        assert!(lazy[0].rationale.contains("'Modal', 'Drawer' are"));
        let action = lazy[0].code_action.as_deref().unwrap();
        assert!(action.contains("const Modal = lazy(() => import('./overlays'));"));
        assert!(action.contains("const Drawer = lazy(() => import('./overlays').then((m) => ({ default: m.Drawer })));"));
    }

    #[test]
    fn test_ranking_and_uniqueness() {
        let src = "import * as _ from 'lodash';\nexport function List({ xs }) { return <ul>{xs.map(x => <li key={x}><a><b><i>{_.upper(x)}</i></b></a></li>)}</ul>; }";
        let found = suggestions("List.jsx", src, &OptimizeOptions::default());
        let keys: HashSet<_> = found.iter().map(|s| (s.kind, s.target_span)).collect();
        assert_eq!(keys.len(), found.len());
        assert!(found.windows(2).all(|w| w[0].estimated_impact >= w[1].estimated_impact));
        assert_eq!(found[0].kind, SuggestionKind::Memoize);
        assert_eq!(found[0].estimated_impact, Impact::High);
    }
}
