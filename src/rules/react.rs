//! React component and hook rules

use tree_sitter::Node;

use super::{Rule, RuleContext};
use crate::analyzer::complexity::{declared_name, is_logical};
use crate::analyzer::modules::is_fresh_literal;
use crate::config::RulePack;
use crate::schema::{Pattern, PatternKind, Severity};
use crate::syntax::kinds::NodeKind;
use crate::syntax::query::{
    call_arguments, callee_name, component_wrapper, get_node_text, is_capitalized, is_hook_name, named_children,
    node_text, unwrap_parens,
};
use crate::syntax::{traverse, Visit};

const COMPONENT_KINDS: &[&str] = &["function_declaration", "function_expression", "arrow_function"];

/// Hooks whose last argument is a dependency list
const DEPENDENCY_HOOKS: &[&str] = &["useEffect", "useLayoutEffect", "useMemo", "useCallback"];

const EFFECT_HOOKS: &[&str] = &["useEffect", "useLayoutEffect"];

pub static RULES: &[Rule] = &[
    Rule {
        id: "inline-object-prop",
        pack: RulePack::React,
        kind: PatternKind::AntiPattern,
        kinds: &["jsx_attribute"],
        check: check_inline_object_prop,
    },
    Rule {
        id: "missing-effect-deps",
        pack: RulePack::React,
        kind: PatternKind::AntiPattern,
        kinds: &["call_expression"],
        check: check_missing_deps,
    },
    Rule {
        id: "unmemoized-wide-component",
        pack: RulePack::React,
        kind: PatternKind::AntiPattern,
        kinds: COMPONENT_KINDS,
        check: check_wide_component,
    },
    Rule {
        id: "conditional-hook",
        pack: RulePack::React,
        kind: PatternKind::AntiPattern,
        kinds: &["call_expression"],
        check: check_conditional_hook,
    },
    Rule {
        id: "missing-list-key",
        pack: RulePack::React,
        kind: PatternKind::AntiPattern,
        kinds: &["call_expression"],
        check: check_list_key,
    },
    Rule {
        id: "memoized-component",
        pack: RulePack::React,
        kind: PatternKind::BestPractice,
        kinds: &["call_expression"],
        check: check_memoized,
    },
    Rule {
        id: "effect-cleanup",
        pack: RulePack::React,
        kind: PatternKind::BestPractice,
        kinds: &["call_expression"],
        check: check_effect_cleanup,
    },
];

/// Hook name of a `useX(...)` or `React.useX(...)` call
fn hook_call(node: &Node, source: &str) -> Option<String> {
    let (name, object) = callee_name(node, source)?;
    let receiver_ok = object.as_deref().map_or(true, |o| o == "React");
    (receiver_ok && is_hook_name(&name)).then_some(name)
}

fn check_inline_object_prop(rule: &Rule, ctx: &RuleContext, node: &Node) -> Vec<Pattern> {
    let on_component = node
        .parent()
        .and_then(|tag| tag.child_by_field_name("name"))
        .map_or(false, |name| is_capitalized(node_text(&name, ctx.source)));
    if !on_component {
        return Vec::new();
    }
    let children = named_children(node);
    let (Some(prop), Some(value)) = (children.first(), children.get(1)) else {
        return Vec::new();
    };
    let literal = (value.kind() == "jsx_expression")
        .then(|| named_children(value).into_iter().next())
        .flatten()
        .map(unwrap_parens)
        .filter(is_fresh_literal);
    match literal {
        Some(expr) => {
            let what = match expr.kind() {
                "object" => "object",
                "array" => "array",
                _ => "function",
            };
            vec![ctx.pattern(
                rule,
                node,
                Severity::Warning,
                format!(
                    "prop '{}' receives a new {} literal on every render",
                    node_text(prop, ctx.source),
                    what
                ),
            )]
        }
        None => Vec::new(),
    }
}

fn check_missing_deps(rule: &Rule, ctx: &RuleContext, node: &Node) -> Vec<Pattern> {
    let Some(hook) = hook_call(node, ctx.source) else {
        return Vec::new();
    };
    if !DEPENDENCY_HOOKS.contains(&hook.as_str()) || call_arguments(node).len() != 1 {
        return Vec::new();
    }
    vec![ctx.pattern(
        rule,
        node,
        Severity::Warning,
        format!("{} has no dependency array and runs on every render", hook),
    )]
}

fn check_wide_component(rule: &Rule, ctx: &RuleContext, node: &Node) -> Vec<Pattern> {
    let Some(component) = ctx.component_at(node) else {
        return Vec::new();
    };
    if component.has_memoization || component.props_shape.len() <= ctx.config.memo_prop_threshold {
        return Vec::new();
    }
    vec![ctx.pattern(
        rule,
        node,
        Severity::Info,
        format!(
            "component '{}' takes {} props and is not memoized",
            component.name,
            component.props_shape.len()
        ),
    )]
}

/// Hooks called under a branch, loop or short-circuit inside a component or custom hook
fn check_conditional_hook(rule: &Rule, ctx: &RuleContext, node: &Node) -> Vec<Pattern> {
    let Some(hook) = hook_call(node, ctx.source) else {
        return Vec::new();
    };

    let mut child_id = node.id();
    let mut conditional: Option<&'static str> = None;
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if NodeKind::of(&ancestor).is_function_like() {
            let owner_is_render = declared_name(&ancestor, ctx.source)
                .map_or(false, |name| is_capitalized(&name) || is_hook_name(&name));
            return match (owner_is_render, conditional) {
                (true, Some(construct)) => vec![ctx.pattern(
                    rule,
                    node,
                    Severity::Critical,
                    format!("{} is called inside {}; hooks must run unconditionally", hook, construct),
                )],
                _ => Vec::new(),
            };
        }
        let is_condition_of = |field: &str| {
            ancestor
                .child_by_field_name(field)
                .map_or(false, |c| c.id() == child_id)
        };
        if conditional.is_none() {
            conditional = match ancestor.kind() {
                "if_statement" if !is_condition_of("condition") => Some("an if statement"),
                "ternary_expression" if !is_condition_of("condition") => Some("a conditional expression"),
                "binary_expression" if is_logical(&ancestor) && !is_condition_of("left") => {
                    Some("a short-circuit expression")
                }
                "switch_case" => Some("a switch case"),
                "catch_clause" => Some("a catch block"),
                _ if NodeKind::of(&ancestor).is_loop() => Some("a loop"),
                _ => None,
            };
        }
        child_id = ancestor.id();
        current = ancestor.parent();
    }
    Vec::new()
}

/// `items.map(item => <Row />)` where the returned element has no `key`
fn check_list_key(rule: &Rule, ctx: &RuleContext, node: &Node) -> Vec<Pattern> {
    let is_map = callee_name(node, ctx.source).map_or(false, |(name, object)| name == "map" && object.is_some());
    if !is_map {
        return Vec::new();
    }
    let Some(callback) = call_arguments(node).into_iter().next() else {
        return Vec::new();
    };
    if !NodeKind::of(&callback).is_function_like() {
        return Vec::new();
    }
    let Some(element) = returned_expression(&callback).map(unwrap_parens) else {
        return Vec::new();
    };
    let tag = match element.kind() {
        "jsx_element" => named_children(&element)
            .into_iter()
            .find(|c| c.kind() == "jsx_opening_element"),
        "jsx_self_closing_element" => Some(element),
        "jsx_fragment" => None,
        _ => return Vec::new(),
    };
    let has_key = tag.map_or(false, |tag| {
        named_children(&tag).iter().any(|attr| {
            attr.kind() == "jsx_attribute"
                && named_children(attr)
                    .first()
                    .map_or(false, |name| node_text(name, ctx.source) == "key")
        })
    });
    if has_key {
        return Vec::new();
    }
    vec![ctx.pattern(
        rule,
        &element,
        Severity::Warning,
        "element rendered from a list has no 'key' prop",
    )]
}

/// Expression body of an arrow, or the first top-level `return` value
fn returned_expression<'t>(func: &Node<'t>) -> Option<Node<'t>> {
    let body = func.child_by_field_name("body")?;
    if body.kind() != "statement_block" {
        return Some(body);
    }
    let mut found = None;
    traverse(body, |n| {
        if found.is_some() || NodeKind::of(&n).is_function_like() {
            return Visit::SkipSubtree;
        }
        if n.kind() == "return_statement" {
            found = named_children(&n).into_iter().find(|c| c.kind() != "comment");
            return Visit::SkipSubtree;
        }
        Visit::Continue
    });
    found
}

fn check_memoized(rule: &Rule, ctx: &RuleContext, node: &Node) -> Vec<Pattern> {
    if component_wrapper(node, ctx.source) != Some("memo") {
        return Vec::new();
    }
    let target = call_arguments(node)
        .first()
        .map(|arg| match arg.kind() {
            "identifier" => get_node_text(arg, ctx.source),
            _ => declared_name(arg, ctx.source).unwrap_or_else(|| "component".to_string()),
        })
        .unwrap_or_else(|| "component".to_string());
    vec![ctx.pattern(
        rule,
        node,
        Severity::Info,
        format!("'{}' is memoized and skips re-renders with equal props", target),
    )]
}

fn check_effect_cleanup(rule: &Rule, ctx: &RuleContext, node: &Node) -> Vec<Pattern> {
    let Some(hook) = hook_call(node, ctx.source) else {
        return Vec::new();
    };
    if !EFFECT_HOOKS.contains(&hook.as_str()) {
        return Vec::new();
    }
    let Some(callback) = call_arguments(node).into_iter().next() else {
        return Vec::new();
    };
    let returns_cleanup = callback
        .child_by_field_name("body")
        .filter(|b| b.kind() == "statement_block")
        .and_then(|_| returned_expression(&callback))
        .map(unwrap_parens)
        .map_or(false, |value| {
            NodeKind::of(&value).is_function_like() || value.kind() == "identifier"
        });
    if !returns_cleanup {
        return Vec::new();
    }
    vec![ctx.pattern(
        rule,
        node,
        Severity::Info,
        format!("{} returns a cleanup function", hook),
    )]
}

#[cfg(test)]
mod tests {
    use crate::analyzer::components;
    use crate::config::Config;
    use crate::lang::Dialect;
    use crate::rules::{run, RuleContext};
    use crate::schema::{Pattern, PatternKind, Severity};
    use crate::syntax::parse;

    fn patterns(src: &str) -> Vec<Pattern> {
        let config = Config::default();
        let tree = parse(src, Dialect::Jsx).unwrap();
        let found = components::collect(&tree, "Widget", &[]);
        let ctx = RuleContext {
            source: src,
            dialect: Dialect::Jsx,
            config: &config,
            components: &found,
        };
        run(&tree, &ctx)
    }

    fn rules(found: &[Pattern]) -> Vec<&str> {
        found.iter().map(|p| p.rule.as_str()).collect()
    }

    #[test]
    fn test_conditional_hook_is_critical() {
        let src = "function Widget({ on }) {\n  if (on) {\n    const [a] = useState(0);\n  }\n  const b = on && useMemo(() => 1, []);\n  return <div />;\n}";
        let found: Vec<_> = patterns(src).into_iter().filter(|p| p.rule == "conditional-hook").collect();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.severity == Severity::Critical));
    }

    #[test]
    fn test_unconditional_hooks_are_fine() {
        let src = "function Widget() {\n  const [a] = useState(0);\n  useEffect(() => { if (a) { run(); } }, [a]);\n  return <div />;\n}";
        assert!(!rules(&patterns(src)).contains(&"conditional-hook"));
    }

    #[test]
    fn test_missing_effect_deps() {
        let src = "function Widget() { useEffect(() => { run(); }); return <div />; }";
        assert!(rules(&patterns(src)).contains(&"missing-effect-deps"));
    }

    #[test]
    fn test_missing_list_key() {
        let src = "function Widget({ xs }) { return <ul>{xs.map(x => <li>{x}</li>)}</ul>; }";
        assert!(rules(&patterns(src)).contains(&"missing-list-key"));
        let src = "function Widget({ xs }) { return <ul>{xs.map(x => <li key={x}>{x}</li>)}</ul>; }";
        assert!(!rules(&patterns(src)).contains(&"missing-list-key"));
    }

    #[test]
    fn test_inline_object_prop_only_on_components() {
        let src = "function Widget() { return <div style={{ a: 1 }}><Card style={{ a: 1 }} /></div>; }";
        let found: Vec<_> = patterns(src).into_iter().filter(|p| p.rule == "inline-object-prop").collect();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_best_practices() {
        let src = "const Widget = memo(function Inner() {\n  useEffect(() => {\n    const id = setInterval(tick, 10);\n    return () => clearInterval(id);\n  }, []);\n  return <div />;\n});";
        let found = patterns(src);
        let best: Vec<_> = found
            .iter()
            .filter(|p| p.kind == PatternKind::BestPractice)
            .map(|p| p.rule.as_str())
            .collect();
        assert_eq!(best, vec!["memoized-component", "effect-cleanup"]);
    }

    #[test]
    fn test_wide_unmemoized_component() {
        let src = "function Widget({ a, b, c, d, e, f }) { return <div />; }";
        assert!(rules(&patterns(src)).contains(&"unmemoized-wide-component"));
        let src = "function Widget({ a, b }) { return <div />; }";
        assert!(!rules(&patterns(src)).contains(&"unmemoized-wide-component"));
    }
}
