//! Request-scoped predicate memoization
//!
//! Lives inside a [`RequestContext`](super::RequestContext) and is dropped
//! with it. No entry ever outlives the request that computed it, so
//! predicates never leak between principals.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use super::decision::AccessPredicate;
use crate::scope::ScopeSet;

/// Statistics about predicate reuse within a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Predicates served from the cache
    pub hits: usize,
    /// Predicates built on first use
    pub misses: usize,
    /// Distinct scope names cached
    pub entries: usize,
}

impl CacheStats {
    /// Fraction of lookups served from the cache
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Write-once map from scope name to its predicate
#[derive(Debug, Default)]
pub struct PredicateCache {
    predicates: DashMap<String, AccessPredicate>,
    stats: Arc<DashMap<&'static str, usize>>,
}

impl PredicateCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached predicate for `scope_name`, building it on first use
    pub fn get_or_build(&self, scope_name: &str, scopes: &ScopeSet) -> AccessPredicate {
        if let Some(predicate) = self.predicates.get(scope_name) {
            self.increment_stat("hits");
            debug!("Predicate cache hit for {}", scope_name);
            return predicate.clone();
        }

        self.increment_stat("misses");
        debug!("Predicate cache miss for {}", scope_name);
        let predicate = AccessPredicate::build(scope_name, scopes);

        self.predicates
            .entry(scope_name.to_string())
            .or_insert(predicate)
            .clone()
    }

    /// Number of cached predicates
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// Whether nothing has been cached yet
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Snapshot of hit and miss counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.get_stat("hits"),
            misses: self.get_stat("misses"),
            entries: self.predicates.len(),
        }
    }

    fn increment_stat(&self, key: &'static str) {
        self.stats
            .entry(key)
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }

    fn get_stat(&self, key: &'static str) -> usize {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }
}
