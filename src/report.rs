//! Plain-text rendering for the CLI

use crate::schema::{AnalysisResult, OptimizationSuggestion, RefactoringPlan};
use crate::service::OrchestrationResult;

const RULE: &str = "═══════════════════════════════════════════════════════\n";
const SEPARATOR: &str = "───────────────────────────────────────────────────────\n";

fn header(report: &mut String, title: &str) {
    report.push_str(RULE);
    report.push_str(&format!("{:^55}\n", title));
    report.push_str(RULE);
}

/// Everything in a service result, section by section
pub fn format_result(result: &OrchestrationResult) -> String {
    let mut report = format_analysis(&result.analysis);
    if !result.suggestions.is_empty() {
        report.push('\n');
        report.push_str(&format_suggestions(&result.suggestions));
    }
    if let Some(plan) = &result.plan {
        report.push('\n');
        report.push_str(&format_plan(plan));
    }
    for plan in &result.refactor_candidates {
        report.push('\n');
        report.push_str(&format_plan(plan));
    }
    report
}

pub fn format_analysis(analysis: &AnalysisResult) -> String {
    let mut report = String::new();
    header(&mut report, "FRONTEND ANALYSIS REPORT");
    report.push_str(&format!("File:              {}\n", analysis.file));
    report.push_str(&format!("Dialect:           {}\n", analysis.dialect.name()));
    report.push_str(&format!("Content hash:      {}\n\n", analysis.content_hash));

    if analysis.sections.metrics {
        let m = &analysis.metrics;
        report.push_str(&format!("Lines:             {:>6}\n", m.line_count));
        report.push_str(&format!("Functions:         {:>6}\n", m.function_count));
        report.push_str(&format!("Avg complexity:    {:>6.2}\n", m.average_complexity));
        report.push_str(&format!("Max complexity:    {:>6}\n", m.max_complexity));
        report.push_str(&format!("Type coverage:     {:>5.1}%\n", m.type_coverage_ratio * 100.0));
    }
    report.push_str(&format!("Components:        {:>6}\n", analysis.components.len()));
    report.push_str(&format!("Imports:           {:>6}\n", analysis.imports.len()));
    report.push_str(&format!("Exports:           {:>6}\n", analysis.exports.len()));

    if !analysis.functions.is_empty() {
        report.push('\n');
        report.push_str(SEPARATOR);
        report.push_str("Functions:\n");
        for f in &analysis.functions {
            report.push_str(&format!(
                "  {:<28} cc {:>3}  params {:>2}  L{}\n",
                f.name,
                f.cyclomatic_complexity,
                f.parameter_count,
                f.span.lines()
            ));
        }
    }

    if !analysis.components.is_empty() {
        report.push('\n');
        report.push_str(SEPARATOR);
        report.push_str("Components:\n");
        for c in &analysis.components {
            let hooks: Vec<&str> = c.hooks_used.iter().map(String::as_str).collect();
            report.push_str(&format!(
                "  {:<28} props {:>2}  memo {:<3}  hooks [{}]\n",
                c.name,
                c.props_shape.len(),
                if c.has_memoization { "yes" } else { "no" },
                hooks.join(", ")
            ));
        }
    }

    if !analysis.patterns.is_empty() {
        report.push('\n');
        report.push_str(SEPARATOR);
        report.push_str("Patterns:\n");
        for p in &analysis.patterns {
            report.push_str(&format!(
                "  [{:<8}] {:<24} L{}  {}\n",
                p.severity.as_str(),
                p.rule,
                p.span.lines(),
                p.message
            ));
        }
    }

    if !analysis.hints.is_empty() {
        report.push('\n');
        report.push_str(SEPARATOR);
        report.push_str("Refactor hints:\n");
        for h in &analysis.hints {
            report.push_str(&format!("  {:<24} L{}  {}\n", h.operation.as_str(), h.target_span.lines(), h.reason));
        }
    }
    report
}

pub fn format_suggestions(suggestions: &[OptimizationSuggestion]) -> String {
    let mut report = String::new();
    header(&mut report, "OPTIMIZATION SUGGESTIONS");
    for s in suggestions {
        report.push_str(&format!(
            "[{:<6}] {:<10} L{}\n  {}\n",
            s.estimated_impact.as_str(),
            s.kind.as_str(),
            s.target_span.lines(),
            s.rationale
        ));
        if let Some(action) = &s.code_action {
            for line in action.lines() {
                report.push_str(&format!("    {}\n", line));
            }
        }
    }
    report
}

pub fn format_plan(plan: &RefactoringPlan) -> String {
    let mut report = String::new();
    header(&mut report, "REFACTORING PLAN");
    report.push_str(&format!("Operation:         {}\n", plan.operation_kind));
    report.push_str(&format!("Edits:             {:>6}\n", plan.edits.len()));
    report.push_str(&format!(
        "Mode:              {}\n",
        if plan.is_dry_run { "dry run" } else { "apply" }
    ));
    let affected: Vec<String> = plan.affected_spans.iter().map(|s| format!("L{}", s.lines())).collect();
    if !affected.is_empty() {
        report.push_str(&format!("Affected:          {}\n", affected.join(", ")));
    }
    if plan.is_noop() {
        report.push_str("\nNothing to change.\n");
        return report;
    }
    report.push_str(&format!("\n{}", SEPARATOR));
    report.push_str(&plan.proposed_text);
    if !plan.proposed_text.ends_with('\n') {
        report.push('\n');
    }
    report
}
