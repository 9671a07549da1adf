//! Configuration loaded from disk changes service behavior

use std::fs;

use frontend_intel::schema::OperationKind;
use frontend_intel::{Config, IntelError, Operation, OrchestrationService, ProcessRequest};

use crate::common::fixtures::UTILS_TS;

fn write_config(body: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, body).unwrap();
    (dir, path)
}

#[tokio::test]
async fn test_thresholds_from_file_drive_hints() {
    let (_dir, path) = write_config("complexity_warning_threshold = 2\ncomplexity_critical_threshold = 4\n");
    let config = Config::load(Some(&path)).unwrap();
    let service = OrchestrationService::new(config);
    let result = service
        .process(ProcessRequest::new("utils.ts", UTILS_TS, Operation::Analyze))
        .await
        .unwrap();
    assert!(result
        .analysis
        .hints
        .iter()
        .any(|h| h.operation == OperationKind::ExtractFunction && h.reason.contains("classify")));
}

#[tokio::test]
async fn test_core_pack_only_skips_react_rules() {
    let src = "export function Item({ id }) {\n  if (id) {\n    const [v] = useState(0);\n    return <i>{v}</i>;\n  }\n  return null;\n}\n";
    let default_patterns = OrchestrationService::default()
        .process(ProcessRequest::new("Item.jsx", src, Operation::Analyze))
        .await
        .unwrap()
        .analysis
        .patterns
        .len();

    let (_dir, path) = write_config("rule_packs = [\"core\"]\n");
    let service = OrchestrationService::new(Config::load(Some(&path)).unwrap());
    let core_patterns = service
        .process(ProcessRequest::new("Item.jsx", src, Operation::Analyze))
        .await
        .unwrap()
        .analysis
        .patterns
        .len();
    assert!(core_patterns < default_patterns);
}

#[test]
fn test_dry_run_default_from_file() {
    let (_dir, path) = write_config("dry_run_default = false\ncache_max_entries = 8\n");
    let config = Config::load(Some(&path)).unwrap();
    assert!(!config.dry_run_default);
    assert_eq!(config.cache_max_entries, 8);
}

#[test]
fn test_invalid_file_is_a_config_error() {
    let (_dir, path) = write_config("cache_max_entries = 0\n");
    let err = Config::load(Some(&path)).unwrap_err();
    assert!(matches!(err, IntelError::Config { .. }));
}
