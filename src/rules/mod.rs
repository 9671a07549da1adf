//! Pattern rule registry
//!
//! Each rule is a plain function over one node, tagged with the node kinds
//! it wants to see and the pack it belongs to. `run` walks the tree once and
//! dispatches every node to the rules registered for its kind.

pub mod general;
pub mod react;

use tree_sitter::Node;

use crate::config::{Config, RulePack};
use crate::lang::Dialect;
use crate::schema::{ComponentInfo, Pattern, PatternKind, Severity, Span};
use crate::syntax::{visit_all, SyntaxTree};

/// What a rule can see besides the node itself
pub struct RuleContext<'a> {
    pub source: &'a str,
    pub dialect: Dialect,
    pub config: &'a Config,
    pub components: &'a [ComponentInfo],
}

impl RuleContext<'_> {
    pub fn pattern(&self, rule: &Rule, node: &Node, severity: Severity, message: impl Into<String>) -> Pattern {
        Pattern {
            rule: rule.id.to_string(),
            kind: rule.kind,
            span: Span::from_node(node),
            message: message.into(),
            severity,
        }
    }

    pub fn component_at(&self, node: &Node) -> Option<&ComponentInfo> {
        let span = Span::from_node(node);
        self.components.iter().find(|c| c.span == span)
    }
}

pub type CheckFn = fn(&Rule, &RuleContext, &Node) -> Vec<Pattern>;

pub struct Rule {
    pub id: &'static str,
    pub pack: RulePack,
    pub kind: PatternKind,
    /// Node kinds the rule is dispatched for
    pub kinds: &'static [&'static str],
    pub check: CheckFn,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("pack", &self.pack)
            .finish()
    }
}

/// Every known rule, core pack first
pub fn registry() -> impl Iterator<Item = &'static Rule> {
    general::RULES.iter().chain(react::RULES.iter())
}

/// Rules enabled by the configured packs
pub fn enabled(config: &Config) -> Vec<&'static Rule> {
    registry().filter(|r| config.has_pack(r.pack)).collect()
}

/// Run the enabled rules over the whole tree
///
/// Output is ordered by span, then rule id, so equal inputs always produce
/// equal pattern lists.
pub fn run(tree: &SyntaxTree, ctx: &RuleContext) -> Vec<Pattern> {
    let rules = enabled(ctx.config);
    let mut patterns = Vec::new();
    visit_all(tree.root(), |node| {
        for rule in rules.iter().filter(|r| r.kinds.contains(&node.kind())) {
            patterns.extend((rule.check)(rule, ctx, &node));
        }
    });
    patterns.sort_by(|a, b| {
        (a.span.start, a.span.end, &a.rule).cmp(&(b.span.start, b.span.end, &b.rule))
    });
    patterns.dedup_by(|a, b| a.rule == b.rule && a.span == b.span);
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_rule_ids_are_unique() {
        let mut seen = HashSet::new();
        for rule in registry() {
            assert!(seen.insert(rule.id), "duplicate rule id {}", rule.id);
            assert!(!rule.kinds.is_empty());
        }
    }

    #[test]
    fn test_packs_select_rules() {
        let config = Config {
            rule_packs: vec![RulePack::Core],
            ..Config::default()
        };
        assert!(enabled(&config).iter().all(|r| r.pack == RulePack::Core));
        assert!(enabled(&Config::default()).iter().any(|r| r.pack == RulePack::React));
    }
}
