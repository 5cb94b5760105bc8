//! TTL cache for LLM score lists
//!
//! Keyed by the query plus the sorted candidate-id set, so a hit requires
//! the exact same candidates regardless of their order. Unbounded by entry
//! count; expired entries are swept lazily on read. The clock is injectable
//! so TTL behaviour is testable without sleeping.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tracing::debug;

use super::scorer::CandidateScore;

/// Default time-to-live for cached score lists
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Time source for TTL checks
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct CacheEntry {
    scores: Vec<CandidateScore>,
    stored_at: Instant,
}

/// In-process score cache, safe under concurrent queries
pub struct ScoreCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ScoreCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    /// Cached scores for this query and candidate set, if fresh.
    ///
    /// Sweeps every expired entry while it holds the write lock.
    pub fn get(&self, query: &str, candidate_ids: &[String]) -> Option<Vec<CandidateScore>> {
        let key = cache_key(query, candidate_ids);
        let now = self.clock.now();

        let mut entries = self.entries.write().expect("score cache lock poisoned");
        entries.retain(|_, entry| now.duration_since(entry.stored_at) <= self.ttl);

        let hit = entries.get(&key).map(|entry| entry.scores.clone());
        if hit.is_some() {
            debug!(query, candidates = candidate_ids.len(), "Score cache hit");
        }
        hit
    }

    pub fn put(&self, query: &str, candidate_ids: &[String], scores: Vec<CandidateScore>) {
        let key = cache_key(query, candidate_ids);
        let entry = CacheEntry {
            scores,
            stored_at: self.clock.now(),
        };

        self.entries
            .write()
            .expect("score cache lock poisoned")
            .insert(key, entry);
    }
}

/// `sha256(query || "|" || sorted ids)`, hex-encoded
fn cache_key(query: &str, candidate_ids: &[String]) -> String {
    let mut sorted: Vec<&str> = candidate_ids.iter().map(String::as_str).collect();
    sorted.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    for id in sorted {
        hasher.update(b"|");
        hasher.update(id.as_bytes());
    }

    format!("{:x}", hasher.finalize())
}
