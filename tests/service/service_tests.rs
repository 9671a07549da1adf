//! Service behavior under sequential and concurrent requests

use std::sync::Arc;

use frontend_intel::schema::OperationKind;
use frontend_intel::{
    Config, Operation, OrchestrationService, ProcessOptions, ProcessRequest, RefactorOperation,
};

use crate::common::fixtures::{COUNTER_TSX, LIST_JSX};

fn analyze(path: &str, content: &str) -> ProcessRequest {
    ProcessRequest::new(path, content, Operation::Analyze)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_analysis() {
    let service = OrchestrationService::default();
    let (first, second) = tokio::join!(
        service.process(analyze("a.ts", "const x=1;")),
        service.process(analyze("a.ts", "const x=1;")),
    );
    let (first, second) = (first.unwrap(), second.unwrap());
    assert!(Arc::ptr_eq(&first.analysis, &second.analysis));
    assert_eq!(first.cache_key, second.cache_key);

    let stats = service.stats();
    assert_eq!(stats.analyses_run, 1);
    assert_eq!(stats.cache_misses, 1);
    // The second caller either joined the computation or found it finished
    assert_eq!(stats.deduplicated + stats.cache_hits, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_concurrent_callers() {
    let service = OrchestrationService::default();
    let mut handles = Vec::new();
    for _ in 0..16 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.process(analyze("List.jsx", LIST_JSX)).await
        }));
    }
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }
    assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0].analysis, &w[1].analysis)));
    let stats = service.stats();
    assert_eq!(stats.analyses_run, 1);
    assert_eq!(stats.cache_misses + stats.deduplicated + stats.cache_hits, 16);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_abandoned_caller_does_not_cancel_shared_work() {
    let service = OrchestrationService::default();
    let src: String = (0..400)
        .map(|i| format!("export function f{i}(a) {{ if (a > {i}) {{ return a && {i}; }} return {i}; }}\n"))
        .collect();

    let first = {
        let service = service.clone();
        let src = src.clone();
        tokio::spawn(async move { service.process(analyze("big.ts", &src)).await })
    };
    while service.stats().cache_misses == 0 {
        tokio::task::yield_now().await;
    }
    first.abort();
    let stats = service.stats();
    assert_eq!(stats.in_flight + stats.cached_entries, 1);

    let second = service.process(analyze("big.ts", &src)).await.unwrap();
    assert!(second.cache_hit);
    assert_eq!(second.analysis.functions.len(), 400);

    let stats = service.stats();
    assert_eq!(stats.analyses_run, 1);
    assert_eq!(stats.cache_misses, 1);
    assert_eq!(stats.in_flight, 0);
    assert_eq!(stats.cached_entries, 1);
}

#[tokio::test]
async fn test_cache_hit_and_content_change() {
    let service = OrchestrationService::default();
    let first = service.process(analyze("a.ts", "const x = 1;")).await.unwrap();
    assert!(!first.cache_hit);
    let again = service.process(analyze("a.ts", "const x = 1;")).await.unwrap();
    assert!(again.cache_hit);
    assert!(Arc::ptr_eq(&first.analysis, &again.analysis));

    let changed = service.process(analyze("a.ts", "const x = 2;")).await.unwrap();
    assert!(!changed.cache_hit);
    assert_ne!(changed.cache_key.content_hash, first.cache_key.content_hash);
    assert_eq!(service.stats().cached_entries, 1);

    // The old content was dropped when the new one was processed
    let back = service.process(analyze("a.ts", "const x = 1;")).await.unwrap();
    assert!(!back.cache_hit);
    assert_eq!(service.stats().analyses_run, 3);
}

#[tokio::test]
async fn test_invalidate_and_clear() {
    let service = OrchestrationService::default();
    service.process(analyze("a.ts", "let a;")).await.unwrap();
    service.process(analyze("b.ts", "let b;")).await.unwrap();
    assert_eq!(service.invalidate("a.ts"), 1);
    assert_eq!(service.invalidate("a.ts"), 0);
    assert_eq!(service.stats().cached_entries, 1);
    service.clear();
    assert_eq!(service.stats().cached_entries, 0);
    assert!(!service.process(analyze("b.ts", "let b;")).await.unwrap().cache_hit);
}

#[tokio::test]
async fn test_entry_limit_evicts_oldest() {
    let config = Config {
        cache_max_entries: 2,
        ..Config::default()
    };
    let service = OrchestrationService::new(config);
    for name in ["a.ts", "b.ts", "c.ts"] {
        service.process(analyze(name, "let v;")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }
    assert_eq!(service.stats().cached_entries, 2);
    assert!(!service.process(analyze("a.ts", "let v;")).await.unwrap().cache_hit);
}

#[tokio::test]
async fn test_zero_ttl_never_hits() {
    let config = Config {
        cache_ttl_ms: 0,
        ..Config::default()
    };
    let service = OrchestrationService::new(config);
    service.process(analyze("a.ts", "let v;")).await.unwrap();
    let again = service.process(analyze("a.ts", "let v;")).await.unwrap();
    assert!(!again.cache_hit);
    assert_eq!(service.stats().analyses_run, 2);
}

#[tokio::test]
async fn test_parse_errors_are_wrapped_and_not_cached() {
    let service = OrchestrationService::default();
    for _ in 0..2 {
        let err = service
            .process(analyze("broken.ts", "function ( {"))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "parse-failure");
        assert_eq!(err.operation, Operation::Analyze);
        assert_eq!(err.cache_key.path, "broken.ts");
        let report = err.report();
        assert_eq!(report.reason, "parse-failure");
    }
    assert_eq!(service.stats().analyses_run, 2);
    assert_eq!(service.stats().cached_entries, 0);
}

#[tokio::test]
async fn test_analyze_projects_requested_sections() {
    let service = OrchestrationService::default();
    let full = service.process(analyze("Counter.tsx", COUNTER_TSX)).await.unwrap();
    assert!(full.analysis.sections.metrics);

    let mut options = ProcessOptions::default();
    options.analyze.include_metrics = false;
    options.analyze.include_patterns = false;
    let narrow = service
        .process(analyze("Counter.tsx", COUNTER_TSX).with_options(options))
        .await
        .unwrap();
    assert!(narrow.cache_hit);
    assert!(!narrow.analysis.sections.metrics);
    assert!(narrow.analysis.patterns.is_empty());
    assert_eq!(narrow.analysis.functions, full.analysis.functions);
}

#[tokio::test]
async fn test_optimize_and_refactor_reuse_analysis() {
    let service = OrchestrationService::default();
    let src = "function Big({x}){ return <div>{[1,2,3].map(i=><span key={i}>{x}</span>)}</div>; }";
    let optimized = service
        .process(ProcessRequest::new("Big.jsx", src, Operation::Optimize))
        .await
        .unwrap();
    assert_eq!(optimized.suggestions.len(), 1);

    let renamed = service
        .process(
            ProcessRequest::new("Big.jsx", src, Operation::Refactor).with_refactor(RefactorOperation::RenameSymbol {
                position: src.find("x}").unwrap(),
                new_name: "label".into(),
            }),
        )
        .await
        .unwrap();
    assert!(renamed.cache_hit);
    let plan = renamed.plan.unwrap();
    assert!(plan.is_dry_run);
    assert!(plan.proposed_text.starts_with("function Big({x: label})"));
    assert_eq!(service.stats().analyses_run, 1);
}

#[tokio::test]
async fn test_refactor_dry_run_override() {
    let service = OrchestrationService::default();
    let mut options = ProcessOptions::default();
    options.refactor = Some(RefactorOperation::OrganizeImports);
    options.dry_run = Some(false);
    let result = service
        .process(ProcessRequest::new("Counter.tsx", COUNTER_TSX, Operation::Refactor).with_options(options))
        .await
        .unwrap();
    let plan = result.plan.unwrap();
    assert!(!plan.is_dry_run);
    assert_eq!(plan.operation_kind, OperationKind::OrganizeImports);
}

#[tokio::test]
async fn test_rejected_refactor_is_wrapped() {
    let service = OrchestrationService::default();
    let src = "let a = 1;\na = 2;\nconsole.log(a);\n";
    let err = service
        .process(
            ProcessRequest::new("a.js", src, Operation::Refactor)
                .with_refactor(RefactorOperation::InlineVariable { position: 4 }),
        )
        .await
        .unwrap_err();
    assert_eq!(err.reason(), "mutated-before-use");
    assert_eq!(err.operation, Operation::Refactor);
}

#[tokio::test]
async fn test_full_analysis_builds_candidate_plans() {
    let service = OrchestrationService::default();
    let src = "import { a, unused } from './a';\n\nconst helper = () => {\n  return a();\n};\n\nexport default helper;\n";
    let result = service
        .process(ProcessRequest::new("h.ts", src, Operation::FullAnalysis))
        .await
        .unwrap();
    let kinds: Vec<OperationKind> = result.refactor_candidates.iter().map(|p| p.operation_kind).collect();
    assert!(kinds.contains(&OperationKind::OrganizeImports));
    assert!(kinds.contains(&OperationKind::ConvertFunctionStyle));
    assert!(result.refactor_candidates.iter().all(|p| p.is_dry_run && !p.is_noop()));

    let mut options = ProcessOptions::default();
    options.refactor_candidates = false;
    let bare = service
        .process(ProcessRequest::new("h.ts", src, Operation::FullAnalysis).with_options(options))
        .await
        .unwrap();
    assert!(bare.refactor_candidates.is_empty());
}

#[tokio::test]
async fn test_result_serializes() {
    let service = OrchestrationService::default();
    let result = service
        .process(ProcessRequest::new("List.jsx", LIST_JSX, Operation::FullAnalysis))
        .await
        .unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["operation"], "full-analysis");
    assert_eq!(json["cache_key"]["path"], "List.jsx");
    assert!(json["analysis"]["functions"].is_array());
}
