//! Orchestration service
//!
//! Async front door for UI hooks, the CLI and tests. Every request is
//! analyzed once per (path, content hash); concurrent requests for the same
//! key join the computation already running instead of starting another.
//! The analysis itself runs on the blocking pool inside a detached task, so
//! a caller that goes away never cancels work other callers wait on.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::analyzer::{analyze, AnalyzeOptions};
use crate::cache::{AnalysisCache, CacheKey, Lookup, Outcome};
use crate::config::Config;
use crate::error::{ProcessingError, ProcessingFailure};
use crate::optimizer::{optimize, OptimizeOptions};
use crate::refactor::{refactor, RefactorOperation, RefactorOptions};
use crate::schema::{AnalysisResult, OptimizationSuggestion, RefactoringPlan, SourceUnit};
use crate::utils::content_hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Analyze,
    Optimize,
    Refactor,
    FullAnalysis,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::Optimize => "optimize",
            Self::Refactor => "refactor",
            Self::FullAnalysis => "full-analysis",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request knobs; everything is optional
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessOptions {
    /// Sections returned for `analyze`; the cache always holds all of them
    pub analyze: AnalyzeOptions,
    /// Required for `refactor`
    pub refactor: Option<RefactorOperation>,
    /// Overrides `dry_run_default` from the config
    pub dry_run: Option<bool>,
    /// Files the caller already loads lazily
    pub lazy_loaded_paths: Vec<String>,
    /// Turn whole-file refactor hints into dry-run plans during `full-analysis`
    pub refactor_candidates: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            analyze: AnalyzeOptions::all(),
            refactor: None,
            dry_run: None,
            lazy_loaded_paths: Vec::new(),
            refactor_candidates: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRequest {
    pub file_path: String,
    pub content: String,
    pub operation: Operation,
    #[serde(default)]
    pub options: ProcessOptions,
}

impl ProcessRequest {
    pub fn new(file_path: impl Into<String>, content: impl Into<String>, operation: Operation) -> Self {
        Self {
            file_path: file_path.into(),
            content: content.into(),
            operation,
            options: ProcessOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ProcessOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_refactor(mut self, operation: RefactorOperation) -> Self {
        self.options.refactor = Some(operation);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationResult {
    pub cache_key: CacheKey,
    pub operation: Operation,
    pub analysis: Arc<AnalysisResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<OptimizationSuggestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<RefactoringPlan>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub refactor_candidates: Vec<RefactoringPlan>,
    /// Whether the analysis came from the cache or a joined computation
    pub cache_hit: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Requests that joined an analysis already in flight
    pub deduplicated: u64,
    /// Analyses actually executed
    pub analyses_run: u64,
    pub cached_entries: usize,
    /// Analyses currently running for some key
    pub in_flight: usize,
}

struct Inner {
    config: Arc<Config>,
    cache: Mutex<AnalysisCache>,
    hits: AtomicU64,
    misses: AtomicU64,
    deduplicated: AtomicU64,
    analyses_run: AtomicU64,
}

/// Cheap to clone; clones share the cache
#[derive(Clone)]
pub struct OrchestrationService {
    inner: Arc<Inner>,
}

impl OrchestrationService {
    pub fn new(config: Config) -> Self {
        let cache = AnalysisCache::new(config.cache_ttl(), config.cache_max_entries);
        Self {
            inner: Arc::new(Inner {
                config: Arc::new(config),
                cache: Mutex::new(cache),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                deduplicated: AtomicU64::new(0),
                analyses_run: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Run one request end to end
    pub async fn process(&self, request: ProcessRequest) -> Result<OrchestrationResult, ProcessingError> {
        let started = Instant::now();
        let operation = request.operation;
        let cache_key = CacheKey::new(request.file_path.clone(), content_hash(&request.content));
        let fail = |failure: ProcessingFailure| {
            tracing::warn!(
                key = %cache_key,
                operation = %operation,
                reason = failure.reason(),
                "request failed: {}",
                failure
            );
            ProcessingError::new(operation, cache_key.clone(), failure)
        };

        if operation == Operation::Refactor && request.options.refactor.is_none() {
            return Err(fail(ProcessingFailure::InvalidRequest {
                details: "refactor requests need a refactor operation".to_string(),
            }));
        }
        let unit = SourceUnit::new(request.file_path, request.content).map_err(|e| fail(e.into()))?;

        let (analysis, cache_hit) = self.analysis_for(&unit, &cache_key).await.map_err(&fail)?;
        let options = &request.options;
        let mut result = OrchestrationResult {
            cache_key: cache_key.clone(),
            operation,
            analysis: Arc::clone(&analysis),
            suggestions: Vec::new(),
            plan: None,
            refactor_candidates: Vec::new(),
            cache_hit,
        };

        match operation {
            Operation::Analyze => {
                let sections = options.analyze.sections();
                if sections != analysis.sections {
                    result.analysis = Arc::new(analysis.project(sections));
                }
            }
            Operation::Optimize => {
                result.suggestions = self.suggestions(&analysis, options).map_err(&fail)?;
            }
            Operation::Refactor => {
                let op = options.refactor.as_ref().ok_or_else(|| {
                    fail(ProcessingFailure::InvalidRequest {
                        details: "missing refactor operation".to_string(),
                    })
                })?;
                let dry_run = options.dry_run.unwrap_or(self.inner.config.dry_run_default);
                let plan = refactor(&unit, &analysis, op, &RefactorOptions { dry_run })
                    .map_err(|e| fail(e.into()))?;
                result.plan = Some(plan);
            }
            Operation::FullAnalysis => {
                result.suggestions = self.suggestions(&analysis, options).map_err(&fail)?;
                if options.refactor_candidates {
                    result.refactor_candidates = refactor_candidates(&unit, &analysis);
                }
            }
        }

        tracing::debug!(
            key = %cache_key,
            operation = %operation,
            cache_hit,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request processed"
        );
        Ok(result)
    }

    /// Drop cached results for `path`
    pub fn invalidate(&self, path: &str) -> usize {
        let removed = self.inner.cache.lock().invalidate(path);
        tracing::debug!(path, removed, "cache invalidated");
        removed
    }

    pub fn clear(&self) {
        self.inner.cache.lock().clear();
        tracing::debug!("cache cleared");
    }

    pub fn stats(&self) -> ServiceStats {
        let (cached_entries, in_flight) = {
            let cache = self.inner.cache.lock();
            (cache.len(), cache.in_flight())
        };
        ServiceStats {
            cache_hits: self.inner.hits.load(Ordering::Relaxed),
            cache_misses: self.inner.misses.load(Ordering::Relaxed),
            deduplicated: self.inner.deduplicated.load(Ordering::Relaxed),
            analyses_run: self.inner.analyses_run.load(Ordering::Relaxed),
            cached_entries,
            in_flight,
        }
    }

    // ========================================================================
    // Analysis with cache and in-flight de-duplication
    // ========================================================================

    async fn analysis_for(
        &self,
        unit: &SourceUnit,
        key: &CacheKey,
    ) -> Result<(Arc<AnalysisResult>, bool), ProcessingFailure> {
        // Lock scope ends before any await
        let (generation, mut receiver, joined) = {
            let mut cache = self.inner.cache.lock();
            match cache.lookup(key) {
                Lookup::Hit(result) => {
                    self.inner.hits.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(key = %key, "cache hit");
                    return Ok((result, true));
                }
                Lookup::Pending { generation, receiver } => {
                    self.inner.deduplicated.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(key = %key, "joined in-flight analysis");
                    (generation, receiver, true)
                }
                Lookup::Miss => {
                    self.inner.misses.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(key = %key, "cache miss");
                    let ticket = cache.begin(key.clone());
                    let receiver = ticket.sender.subscribe();
                    self.spawn_analysis(unit.clone(), key.clone(), ticket.generation, ticket.sender);
                    (ticket.generation, receiver, false)
                }
            }
        };

        let outcome = match receiver.wait_for(Option::is_some).await {
            Ok(settled) => settled.clone(),
            Err(_) => None,
        };
        match outcome {
            Some(outcome) => outcome.map(|result| (result, joined)),
            None => {
                // The task died without reporting; free the slot for a retry
                let failure = ProcessingFailure::Aborted {
                    details: format!("analysis of {} ended without a result", key),
                };
                self.inner.cache.lock().complete(key, generation, &Err(failure.clone()));
                Err(failure)
            }
        }
    }

    fn spawn_analysis(
        &self,
        unit: SourceUnit,
        key: CacheKey,
        generation: u64,
        sender: tokio::sync::watch::Sender<Option<Outcome>>,
    ) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let started = Instant::now();
            let config = Arc::clone(&inner.config);
            inner.analyses_run.fetch_add(1, Ordering::Relaxed);
            let outcome: Outcome =
                match tokio::task::spawn_blocking(move || analyze(&unit, &AnalyzeOptions::all(), &config)).await {
                    Ok(Ok(result)) => Ok(Arc::new(result)),
                    Ok(Err(err)) => Err(err.into()),
                    Err(join) => Err(ProcessingFailure::Aborted {
                        details: join.to_string(),
                    }),
                };
            match &outcome {
                Ok(_) => tracing::debug!(
                    key = %key,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "analysis finished"
                ),
                Err(failure) => tracing::debug!(
                    key = %key,
                    reason = failure.reason(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "analysis failed"
                ),
            }
            inner.cache.lock().complete(&key, generation, &outcome);
            // No receivers left is fine: the result is cached either way
            let _ = sender.send(Some(outcome));
        });
    }

    fn suggestions(
        &self,
        analysis: &AnalysisResult,
        options: &ProcessOptions,
    ) -> Result<Vec<OptimizationSuggestion>, ProcessingFailure> {
        let mut optimize_options = OptimizeOptions::from_config(&self.inner.config);
        optimize_options.lazy_loaded_paths = options.lazy_loaded_paths.clone();
        Ok(optimize(analysis, &optimize_options)?)
    }
}

impl Default for OrchestrationService {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl fmt::Debug for OrchestrationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrchestrationService")
            .field("cache", &*self.inner.cache.lock())
            .finish()
    }
}

/// Dry-run plans for hints that need no further input
///
/// Hints whose transformation is rejected are skipped; so are plans that
/// would change nothing.
fn refactor_candidates(unit: &SourceUnit, analysis: &AnalysisResult) -> Vec<RefactoringPlan> {
    let mut operations: Vec<RefactorOperation> = Vec::new();
    for op in analysis.hints.iter().filter_map(RefactorOperation::from_hint) {
        if !operations.contains(&op) {
            operations.push(op);
        }
    }
    operations
        .iter()
        .filter_map(|op| match refactor(unit, analysis, op, &RefactorOptions { dry_run: true }) {
            Ok(plan) if !plan.is_noop() => Some(plan),
            Ok(_) => None,
            Err(err) => {
                tracing::debug!(operation = %op.kind(), reason = err.reason(), "hint not actionable");
                None
            }
        })
        .collect()
}
