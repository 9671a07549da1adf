//! Error taxonomy
//!
//! Every layer has its own error type with a stable machine-readable
//! `reason()`. Lower-level errors are wrapped with context on the way up,
//! never replaced, so a caller can always render `reason` plus the message.

use std::process::ExitCode;

use serde::Serialize;
use thiserror::Error;

use crate::cache::CacheKey;
use crate::service::Operation;

/// Malformed source: position of the first syntax error found
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("syntax error at {line}:{column}: {message}")]
pub struct ParseError {
    /// 1-based line of the first failure
    pub line: usize,
    /// 1-based column of the first failure
    pub column: usize,
    /// What the parser tripped on
    pub message: String,
}

impl ParseError {
    pub fn reason(&self) -> &'static str {
        "parse-failure"
    }
}

/// Failures while producing an `AnalysisResult`
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    #[error("failed to parse source: {0}")]
    ParseFailure(#[from] ParseError),

    #[error("unsupported dialect for extension '{extension}'")]
    UnsupportedDialect { extension: String },

    #[error("analysis invariant violated: {details}")]
    InvariantViolation { details: String },
}

impl AnalysisError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::ParseFailure(_) => "parse-failure",
            Self::UnsupportedDialect { .. } => "unsupported-dialect",
            Self::InvariantViolation { .. } => "invariant-violation",
        }
    }
}

/// Failures while ranking optimization suggestions
#[derive(Debug, Clone, Error)]
pub enum OptimizationError {
    #[error("analysis result is missing the '{section}' section")]
    MissingAnalysisSection { section: &'static str },

    #[error("analysis result is structurally invalid: {details}")]
    InvalidAnalysis { details: String },
}

impl OptimizationError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingAnalysisSection { .. } => "missing-analysis-section",
            Self::InvalidAnalysis { .. } => "invalid-analysis",
        }
    }
}

/// Rejected or unsafe transformations. The original source is never touched.
#[derive(Debug, Clone, Error)]
pub enum RefactorError {
    #[error("invalid selection: {details}")]
    InvalidSelection { details: String },

    #[error("hook '{hook}' cannot be hoisted into a child component")]
    HookNotHoistable { hook: String },

    #[error("conversion would change `this` binding: {details}")]
    ThisBinding { details: String },

    #[error("name '{name}' collides with an existing binding")]
    NameCollision { name: String },

    #[error("'{name}' is not a valid identifier")]
    InvalidName { name: String },

    #[error("symbol not found: {details}")]
    SymbolNotFound { details: String },

    #[error("'{name}' is reassigned, inlining would change semantics")]
    MutatedBeforeUse { name: String },

    #[error("transformation is unsafe: {details}")]
    UnsafeTransform { details: String },

    #[error("unsupported target: {details}")]
    UnsupportedTarget { details: String },

    #[error("source does not parse: {0}")]
    ParseFailure(#[from] ParseError),

    #[error("plan was built for content {expected}, source is {actual}")]
    StaleSource { expected: String, actual: String },

    #[error("dry-run plans cannot be committed")]
    DryRunPlan,
}

impl RefactorError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidSelection { .. } => "invalid-selection",
            Self::HookNotHoistable { .. } => "hook-not-hoistable",
            Self::ThisBinding { .. } => "this-binding",
            Self::NameCollision { .. } => "name-collision",
            Self::InvalidName { .. } => "invalid-name",
            Self::SymbolNotFound { .. } => "symbol-not-found",
            Self::MutatedBeforeUse { .. } => "mutated-before-use",
            Self::UnsafeTransform { .. } => "unsafe-transform",
            Self::UnsupportedTarget { .. } => "unsupported-target",
            Self::ParseFailure(_) => "parse-failure",
            Self::StaleSource { .. } => "stale-source",
            Self::DryRunPlan => "dry-run-plan",
        }
    }
}

/// The underlying cause of a `ProcessingError`
#[derive(Debug, Clone, Error)]
pub enum ProcessingFailure {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Optimization(#[from] OptimizationError),

    #[error(transparent)]
    Refactor(#[from] RefactorError),

    #[error("invalid request: {details}")]
    InvalidRequest { details: String },

    #[error("analysis task aborted: {details}")]
    Aborted { details: String },
}

impl ProcessingFailure {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Analysis(e) => e.reason(),
            Self::Optimization(e) => e.reason(),
            Self::Refactor(e) => e.reason(),
            Self::InvalidRequest { .. } => "invalid-request",
            Self::Aborted { .. } => "aborted",
        }
    }
}

/// Orchestration-level error annotated with the request's operation and key
#[derive(Debug, Clone, Error)]
#[error("{operation} failed for {cache_key}: {failure}")]
pub struct ProcessingError {
    pub operation: Operation,
    pub cache_key: CacheKey,
    #[source]
    pub failure: ProcessingFailure,
}

impl ProcessingError {
    pub fn new(operation: Operation, cache_key: CacheKey, failure: impl Into<ProcessingFailure>) -> Self {
        Self {
            operation,
            cache_key,
            failure: failure.into(),
        }
    }

    pub fn reason(&self) -> &'static str {
        self.failure.reason()
    }

    /// Structured form for callers that render errors themselves
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            reason: self.reason().to_string(),
            operation: self.operation,
            file: self.cache_key.path.clone(),
            content_hash: self.cache_key.content_hash.clone(),
            message: self.failure.to_string(),
        }
    }
}

/// Serializable error payload for UI/CLI consumers
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub reason: String,
    pub operation: Operation,
    pub file: String,
    pub content_hash: String,
    pub message: String,
}

/// Crate-level error used by the binary and config loading
#[derive(Debug, Error)]
pub enum IntelError {
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    #[error("unsupported file type: {extension}")]
    UnsupportedLanguage { extension: String },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("serialization failed: {message}")]
    Serialization { message: String },

    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error(transparent)]
    Refactor(#[from] RefactorError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntelError {
    /// Exit code for the CLI, grouped by failure class
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::FileNotFound { .. } => ExitCode::from(2),
            Self::UnsupportedLanguage { .. } => ExitCode::from(3),
            Self::Config { .. } => ExitCode::from(4),
            Self::Processing(e) if e.reason() == "parse-failure" => ExitCode::from(5),
            Self::Processing(_) | Self::Refactor(_) => ExitCode::from(6),
            Self::Serialization { .. } | Self::Io(_) => ExitCode::from(1),
        }
    }
}

impl From<AnalysisError> for RefactorError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::ParseFailure(p) => Self::ParseFailure(p),
            other => Self::UnsupportedTarget {
                details: other.to_string(),
            },
        }
    }
}

/// Result alias for crate-level operations
pub type Result<T> = std::result::Result<T, IntelError>;
