//! Shared fixtures and helpers

#![allow(dead_code)]

use frontend_intel::{
    analyze, refactor, AnalysisResult, AnalyzeOptions, Config, RefactorError, RefactorOperation,
    RefactorOptions, RefactoringPlan, SourceUnit,
};

pub mod fixtures;

pub fn unit(path: &str, src: &str) -> SourceUnit {
    SourceUnit::new(path, src).expect("supported extension")
}

pub fn analysis(path: &str, src: &str) -> AnalysisResult {
    analyze(&unit(path, src), &AnalyzeOptions::all(), &Config::default()).expect("source analyzes")
}

/// Dry-run plan for `op` on a fresh analysis of `src`
pub fn plan(path: &str, src: &str, op: RefactorOperation) -> Result<RefactoringPlan, RefactorError> {
    let unit = unit(path, src);
    let analysis = analyze(&unit, &AnalyzeOptions::all(), &Config::default()).expect("source analyzes");
    refactor(&unit, &analysis, &op, &RefactorOptions::default())
}

/// Byte offset of the first occurrence of `needle`
pub fn offset(src: &str, needle: &str) -> usize {
    src.find(needle)
        .unwrap_or_else(|| panic!("'{}' not found in source", needle))
}

pub fn reason(result: Result<RefactoringPlan, RefactorError>) -> String {
    match result {
        Ok(plan) => panic!("expected failure, got plan:\n{}", plan.proposed_text),
        Err(err) => err.reason().to_string(),
    }
}
