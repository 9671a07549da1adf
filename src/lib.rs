//! Frontend code intelligence for TypeScript and JavaScript
//!
//! Parses TS/TSX/JS/JSX with tree-sitter and provides:
//!
//! - per-file analysis: complexity metrics, functions, React components,
//!   imports/exports, binding usage, rule patterns and refactor hints
//! - ranked optimization suggestions (memoize, split, tree-shake, lazy-load)
//! - safe refactorings with dry run, re-parse validation and commit
//! - an async orchestration service with a (path, content hash) cache and
//!   in-flight de-duplication
//!
//! # Example
//!
//! ```ignore
//! use frontend_intel::{Operation, OrchestrationService, ProcessRequest};
//!
//! let service = OrchestrationService::default();
//! let result = service
//!     .process(ProcessRequest::new("a.ts", "const x = 1;", Operation::Analyze))
//!     .await?;
//! println!("{} functions", result.analysis.functions.len());
//! ```

pub mod analyzer;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod lang;
pub mod optimizer;
pub mod refactor;
pub mod report;
pub mod rules;
pub mod schema;
pub mod service;
pub mod syntax;
pub mod utils;

// Re-export commonly used types
pub use analyzer::{analyze, AnalyzeOptions};
pub use cache::CacheKey;
pub use cli::{Cli, OutputFormat};
pub use config::Config;
pub use error::{
    AnalysisError, IntelError, OptimizationError, ParseError, ProcessingError, RefactorError, Result,
};
pub use lang::Dialect;
pub use optimizer::{optimize, OptimizeOptions};
pub use refactor::{refactor, RefactorOperation, RefactorOptions, Selection};
pub use schema::{
    AnalysisResult, ComponentInfo, FunctionInfo, OptimizationSuggestion, RefactoringPlan, SourceUnit,
    SuggestionKind,
};
pub use service::{
    Operation, OrchestrationResult, OrchestrationService, ProcessOptions, ProcessRequest, ServiceStats,
};
