//! Framework-agnostic rules (the `core` pack)

use tree_sitter::Node;

use super::{Rule, RuleContext};
use crate::analyzer::complexity::{cyclomatic, declared_name, parameters};
use crate::config::RulePack;
use crate::schema::{Pattern, PatternKind, Severity};
use crate::syntax::query::named_children;

const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "generator_function",
    "arrow_function",
    "method_definition",
];

pub static RULES: &[Rule] = &[
    Rule {
        id: "complexity",
        pack: RulePack::Core,
        kind: PatternKind::AntiPattern,
        kinds: FUNCTION_KINDS,
        check: check_complexity,
    },
    Rule {
        id: "too-many-parameters",
        pack: RulePack::Core,
        kind: PatternKind::AntiPattern,
        kinds: FUNCTION_KINDS,
        check: check_parameters,
    },
    Rule {
        id: "nested-ternary",
        pack: RulePack::Core,
        kind: PatternKind::AntiPattern,
        kinds: &["ternary_expression"],
        check: check_nested_ternary,
    },
    Rule {
        id: "empty-catch",
        pack: RulePack::Core,
        kind: PatternKind::AntiPattern,
        kinds: &["catch_clause"],
        check: check_empty_catch,
    },
];

fn check_complexity(rule: &Rule, ctx: &RuleContext, node: &Node) -> Vec<Pattern> {
    let Some(name) = declared_name(node, ctx.source) else {
        return Vec::new();
    };
    let complexity = cyclomatic(node, ctx.source);
    let severity = if complexity > ctx.config.complexity_critical_threshold {
        Severity::Critical
    } else if complexity > ctx.config.complexity_warning_threshold {
        Severity::Warning
    } else {
        return Vec::new();
    };
    vec![ctx.pattern(
        rule,
        node,
        severity,
        format!("'{}' has cyclomatic complexity {}", name, complexity),
    )]
}

fn check_parameters(rule: &Rule, ctx: &RuleContext, node: &Node) -> Vec<Pattern> {
    let count = parameters(node).len();
    if count <= ctx.config.max_parameters {
        return Vec::new();
    }
    let name = declared_name(node, ctx.source).unwrap_or_else(|| "anonymous function".to_string());
    vec![ctx.pattern(
        rule,
        node,
        Severity::Warning,
        format!(
            "'{}' takes {} parameters (max {}); consider an options object",
            name, count, ctx.config.max_parameters
        ),
    )]
}

/// Reported on the inner ternary
fn check_nested_ternary(rule: &Rule, ctx: &RuleContext, node: &Node) -> Vec<Pattern> {
    let mut parent = node.parent();
    while let Some(p) = parent {
        if p.kind() != "parenthesized_expression" {
            break;
        }
        parent = p.parent();
    }
    match parent {
        Some(p) if p.kind() == "ternary_expression" => vec![ctx.pattern(
            rule,
            node,
            Severity::Warning,
            "nested ternary expression; prefer if/else or a lookup",
        )],
        _ => Vec::new(),
    }
}

fn check_empty_catch(rule: &Rule, ctx: &RuleContext, node: &Node) -> Vec<Pattern> {
    let empty = node
        .child_by_field_name("body")
        .map_or(false, |body| named_children(&body).is_empty());
    if !empty {
        return Vec::new();
    }
    vec![ctx.pattern(rule, node, Severity::Warning, "empty catch block swallows the error")]
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::lang::Dialect;
    use crate::rules::{run, RuleContext};
    use crate::schema::{Pattern, Severity};
    use crate::syntax::parse;

    fn patterns(src: &str, config: &Config) -> Vec<Pattern> {
        let tree = parse(src, Dialect::TypeScript).unwrap();
        let ctx = RuleContext {
            source: src,
            dialect: Dialect::TypeScript,
            config,
            components: &[],
        };
        run(&tree, &ctx)
    }

    #[test]
    fn test_complexity_thresholds() {
        let config = Config {
            complexity_warning_threshold: 2,
            complexity_critical_threshold: 3,
            ..Config::default()
        };
        let found = patterns(
            "function a(x) { if (x) {} if (x) {} }\nfunction b(x) { if (x) {} if (x) {} if (x) {} }\nfunction c() {}",
            &config,
        );
        let complexity: Vec<_> = found.iter().filter(|p| p.rule == "complexity").collect();
        assert_eq!(complexity.len(), 2);
        assert_eq!(complexity[0].severity, Severity::Warning);
        assert_eq!(complexity[1].severity, Severity::Critical);
    }

    #[test]
    fn test_too_many_parameters() {
        let found = patterns("function f(a, b, c, d, e, g) {}", &Config::default());
        assert!(found.iter().any(|p| p.rule == "too-many-parameters"));
        let found = patterns("function f(a, b) {}", &Config::default());
        assert!(found.is_empty());
    }

    #[test]
    fn test_nested_ternary_reports_inner() {
        let src = "const v = a ? (b ? 1 : 2) : 3;";
        let found = patterns(src, &Config::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rule, "nested-ternary");
        assert_eq!(&src[found[0].span.start..found[0].span.end], "b ? 1 : 2");
    }

    #[test]
    fn test_empty_catch() {
        let found = patterns("try { run(); } catch (e) {}", &Config::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rule, "empty-catch");
        let found = patterns("try { run(); } catch (e) { log(e); }", &Config::default());
        assert!(found.is_empty());
    }
}
