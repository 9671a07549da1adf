//! In-memory analysis cache
//!
//! Results are keyed by (path, content hash). A slot is either a finished
//! result or an in-flight computation whose waiters subscribe to a watch
//! channel. The cache itself holds no lock; the service wraps it in one.
//!
//! Processing a new hash for a path drops every other hash for that path,
//! so a file never has more than one live entry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::watch;

use crate::error::ProcessingFailure;
use crate::schema::{AnalysisResult, SourceUnit};

/// Outcome broadcast to everyone waiting on one analysis
pub type Outcome = Result<Arc<AnalysisResult>, ProcessingFailure>;

/// Composite cache key: file path plus content hash
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CacheKey {
    pub path: String,
    pub content_hash: String,
}

impl CacheKey {
    pub fn new(path: impl Into<String>, content_hash: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content_hash: content_hash.into(),
        }
    }

    pub fn for_unit(unit: &SourceUnit) -> Self {
        Self::new(unit.path(), unit.content_hash())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.path, self.content_hash)
    }
}

enum Slot {
    Ready {
        result: Arc<AnalysisResult>,
        inserted: Instant,
    },
    InFlight {
        generation: u64,
        receiver: watch::Receiver<Option<Outcome>>,
    },
}

/// Result of looking a key up
pub enum Lookup {
    Hit(Arc<AnalysisResult>),
    /// Someone is already computing this key
    Pending {
        generation: u64,
        receiver: watch::Receiver<Option<Outcome>>,
    },
    Miss,
}

/// A freshly registered in-flight computation
pub struct Ticket {
    pub generation: u64,
    pub sender: watch::Sender<Option<Outcome>>,
}

pub struct AnalysisCache {
    slots: HashMap<CacheKey, Slot>,
    ttl: Duration,
    max_entries: usize,
    next_generation: u64,
}

impl AnalysisCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            slots: HashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
            next_generation: 0,
        }
    }

    /// Find a live result or an in-flight computation for `key`
    ///
    /// Expired entries are dropped on the way.
    pub fn lookup(&mut self, key: &CacheKey) -> Lookup {
        let expired = match self.slots.get(key) {
            None => return Lookup::Miss,
            Some(Slot::Ready { result, inserted }) => {
                if inserted.elapsed() < self.ttl {
                    return Lookup::Hit(Arc::clone(result));
                }
                true
            }
            Some(Slot::InFlight { generation, receiver }) => {
                return Lookup::Pending {
                    generation: *generation,
                    receiver: receiver.clone(),
                }
            }
        };
        if expired {
            tracing::debug!(key = %key, "cache entry expired");
            self.slots.remove(key);
        }
        Lookup::Miss
    }

    /// Register an in-flight computation for `key`
    ///
    /// Entries for the same path under any other hash are dropped.
    pub fn begin(&mut self, key: CacheKey) -> Ticket {
        let stale = self.invalidate_other_hashes(&key);
        if stale > 0 {
            tracing::debug!(key = %key, stale, "content changed, dropped older entries");
        }
        let generation = self.next_generation;
        self.next_generation += 1;
        let (sender, receiver) = watch::channel(None);
        self.slots.insert(key, Slot::InFlight { generation, receiver });
        Ticket { generation, sender }
    }

    /// Settle the in-flight slot registered under `generation`
    ///
    /// Successes become ready entries, failures free the slot so the next
    /// request retries. A slot that was invalidated or replaced meanwhile is
    /// left alone.
    pub fn complete(&mut self, key: &CacheKey, generation: u64, outcome: &Outcome) {
        let current = matches!(
            self.slots.get(key),
            Some(Slot::InFlight { generation: g, .. }) if *g == generation
        );
        if !current {
            return;
        }
        match outcome {
            Ok(result) => {
                self.slots.insert(
                    key.clone(),
                    Slot::Ready {
                        result: Arc::clone(result),
                        inserted: Instant::now(),
                    },
                );
                self.evict();
            }
            Err(_) => {
                self.slots.remove(key);
            }
        }
    }

    /// Drop every entry for `path`; returns how many were removed
    pub fn invalidate(&mut self, path: &str) -> usize {
        let before = self.slots.len();
        self.slots.retain(|key, _| key.path != path);
        before - self.slots.len()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Number of finished entries
    pub fn len(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| matches!(slot, Slot::Ready { .. }))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn in_flight(&self) -> usize {
        self.slots.len() - self.len()
    }

    fn invalidate_other_hashes(&mut self, key: &CacheKey) -> usize {
        let before = self.slots.len();
        self.slots
            .retain(|k, _| k.path != key.path || k.content_hash == key.content_hash);
        before - self.slots.len()
    }

    /// Oldest-first eviction of ready entries above `max_entries`
    fn evict(&mut self) {
        while self.len() > self.max_entries {
            let oldest = self
                .slots
                .iter()
                .filter_map(|(key, slot)| match slot {
                    Slot::Ready { inserted, .. } => Some((key, *inserted)),
                    Slot::InFlight { .. } => None,
                })
                .min_by_key(|(_, inserted)| *inserted)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    tracing::debug!(key = %key, "evicted oldest cache entry");
                    self.slots.remove(&key);
                }
                None => break,
            }
        }
    }
}

impl fmt::Debug for AnalysisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisCache")
            .field("ready", &self.len())
            .field("in_flight", &self.in_flight())
            .field("ttl", &self.ttl)
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{analyze, AnalyzeOptions};
    use crate::config::Config;
    use crate::error::AnalysisError;

    fn result_for(path: &str, text: &str) -> Arc<AnalysisResult> {
        let unit = SourceUnit::new(path, text).unwrap();
        Arc::new(analyze(&unit, &AnalyzeOptions::all(), &Config::default()).unwrap())
    }

    fn fill(cache: &mut AnalysisCache, path: &str, text: &str) -> (CacheKey, Arc<AnalysisResult>) {
        let result = result_for(path, text);
        let key = CacheKey::new(path, result.content_hash.clone());
        let ticket = cache.begin(key.clone());
        cache.complete(&key, ticket.generation, &Ok(Arc::clone(&result)));
        (key, result)
    }

    #[test]
    fn test_key_display() {
        assert_eq!(CacheKey::new("src/a.ts", "00ff").to_string(), "src/a.ts@00ff");
    }

    #[test]
    fn test_hit_returns_same_arc() {
        let mut cache = AnalysisCache::new(Duration::from_secs(60), 8);
        let (key, result) = fill(&mut cache, "a.ts", "const x = 1;");
        match cache.lookup(&key) {
            Lookup::Hit(found) => assert!(Arc::ptr_eq(&found, &result)),
            _ => panic!("expected hit"),
        }
    }

    #[test]
    fn test_in_flight_is_shared() {
        let mut cache = AnalysisCache::new(Duration::from_secs(60), 8);
        let key = CacheKey::new("a.ts", "1");
        let ticket = cache.begin(key.clone());
        assert_eq!(cache.in_flight(), 1);
        match cache.lookup(&key) {
            Lookup::Pending { generation, .. } => assert_eq!(generation, ticket.generation),
            _ => panic!("expected pending"),
        }
    }

    #[test]
    fn test_expired_entries_miss() {
        let mut cache = AnalysisCache::new(Duration::ZERO, 8);
        let (key, _) = fill(&mut cache, "a.ts", "const x = 1;");
        assert!(matches!(cache.lookup(&key), Lookup::Miss));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_new_hash_invalidates_old() {
        let mut cache = AnalysisCache::new(Duration::from_secs(60), 8);
        let (old, _) = fill(&mut cache, "a.ts", "const x = 1;");
        let (other_file, _) = fill(&mut cache, "b.ts", "const x = 1;");
        let (new, _) = fill(&mut cache, "a.ts", "const x = 2;");
        assert!(matches!(cache.lookup(&old), Lookup::Miss));
        assert!(matches!(cache.lookup(&new), Lookup::Hit(_)));
        assert!(matches!(cache.lookup(&other_file), Lookup::Hit(_)));
    }

    #[test]
    fn test_failures_are_not_cached() {
        let mut cache = AnalysisCache::new(Duration::from_secs(60), 8);
        let key = CacheKey::new("a.ts", "1");
        let ticket = cache.begin(key.clone());
        let failure = ProcessingFailure::Analysis(AnalysisError::InvariantViolation {
            details: "boom".into(),
        });
        cache.complete(&key, ticket.generation, &Err(failure));
        assert!(matches!(cache.lookup(&key), Lookup::Miss));
        assert_eq!(cache.in_flight(), 0);
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let mut cache = AnalysisCache::new(Duration::from_secs(60), 8);
        let key = CacheKey::new("a.ts", "1");
        let first = cache.begin(key.clone());
        assert_eq!(cache.invalidate("a.ts"), 1);
        let second = cache.begin(key.clone());
        cache.complete(&key, first.generation, &Ok(result_for("a.ts", "let a;")));
        assert!(matches!(cache.lookup(&key), Lookup::Pending { generation, .. } if generation == second.generation));
    }

    #[test]
    fn test_oldest_entry_evicted() {
        let mut cache = AnalysisCache::new(Duration::from_secs(60), 2);
        let (a, _) = fill(&mut cache, "a.ts", "let a;");
        std::thread::sleep(Duration::from_millis(2));
        let (b, _) = fill(&mut cache, "b.ts", "let b;");
        std::thread::sleep(Duration::from_millis(2));
        let (c, _) = fill(&mut cache, "c.ts", "let c;");
        assert_eq!(cache.len(), 2);
        assert!(matches!(cache.lookup(&a), Lookup::Miss));
        assert!(matches!(cache.lookup(&b), Lookup::Hit(_)));
        assert!(matches!(cache.lookup(&c), Lookup::Hit(_)));
    }

    #[test]
    fn test_clear() {
        let mut cache = AnalysisCache::new(Duration::from_secs(60), 8);
        fill(&mut cache, "a.ts", "let a;");
        cache.begin(CacheKey::new("b.ts", "2"));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.in_flight(), 0);
    }
}
