//! DOM Query Cache
//!
//! Selector-result memoization keyed by (scope, selector text, query kind)
//! and validated against the document generation. Parse failures are never
//! stored.

use std::collections::HashMap;
use std::rc::Rc;

use crate::{Generation, NodeId};

/// Default maximum number of memoized queries per document
pub const DEFAULT_MAX_ENTRIES: usize = 256;

/// Selector result cache with DOM generation validation
#[derive(Debug)]
pub struct QueryCache {
    /// Cached query results
    cache: HashMap<QueryKey, CachedResult>,
    /// Maximum cache entries
    max_entries: usize,
    hits: u64,
    misses: u64,
}

/// Cache key for selector queries
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    /// Scope node for the query
    pub root: NodeId,
    /// Selector string
    pub selector: String,
    /// Query type
    pub query_type: QueryType,
}

impl QueryKey {
    pub fn new(root: NodeId, selector: &str, query_type: QueryType) -> Self {
        Self {
            root,
            selector: selector.to_string(),
            query_type,
        }
    }
}

/// Query type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    /// `querySelector`: at most one node
    First,
    /// `querySelectorAll`: every match in document order
    All,
}

/// Cached query result
#[derive(Debug, Clone)]
struct CachedResult {
    /// DOM generation when cached
    generation: Generation,
    /// Result node IDs
    results: Rc<[NodeId]>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl QueryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            cache: HashMap::new(),
            max_entries: max_entries.max(1),
            hits: 0,
            misses: 0,
        }
    }

    /// Get cached result if computed at `generation`
    pub fn get(&mut self, key: &QueryKey, generation: Generation) -> Option<Rc<[NodeId]>> {
        match self.cache.get(key) {
            Some(cached) if cached.generation == generation => {
                self.hits += 1;
                Some(Rc::clone(&cached.results))
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store result in cache
    pub fn set(&mut self, key: QueryKey, results: Rc<[NodeId]>, generation: Generation) {
        if self.cache.len() >= self.max_entries && !self.cache.contains_key(&key) {
            self.evict_stale(generation);
        }

        self.cache.insert(
            key,
            CachedResult {
                generation,
                results,
            },
        );
    }

    /// Clear all cached results
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    fn evict_stale(&mut self, current: Generation) {
        self.cache.retain(|_, v| v.generation == current);
        if self.cache.len() >= self.max_entries {
            // everything is current; start over
            self.cache.clear();
        }
    }

    /// Stats
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.cache.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u32]) -> Rc<[NodeId]> {
        raw.iter().map(|&n| NodeId(n)).collect()
    }

    #[test]
    fn test_query_cache() {
        let mut cache = QueryCache::new(100);
        let g1 = Generation::new(1);

        let key = QueryKey::new(NodeId::ROOT, "div.foo", QueryType::All);
        cache.set(key.clone(), ids(&[1, 2, 3]), g1);
        assert_eq!(cache.get(&key, g1).as_deref(), Some(&ids(&[1, 2, 3])[..]));

        assert!(cache.get(&key, g1.next()).is_none());
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_query_kinds_are_distinct() {
        let mut cache = QueryCache::default();
        let g = Generation::new(3);
        cache.set(QueryKey::new(NodeId::ROOT, "p", QueryType::First), ids(&[4]), g);

        let all = QueryKey::new(NodeId::ROOT, "p", QueryType::All);
        assert!(cache.get(&all, g).is_none());
    }

    #[test]
    fn test_eviction_keeps_current() {
        let mut cache = QueryCache::new(2);
        let old = Generation::new(1);
        let new = Generation::new(2);
        cache.set(QueryKey::new(NodeId::ROOT, "a", QueryType::All), ids(&[1]), old);
        cache.set(QueryKey::new(NodeId::ROOT, "b", QueryType::All), ids(&[2]), new);
        cache.set(QueryKey::new(NodeId::ROOT, "c", QueryType::All), ids(&[3]), new);

        assert_eq!(cache.stats().entries, 2);
        assert!(cache.get(&QueryKey::new(NodeId::ROOT, "b", QueryType::All), new).is_some());
    }
}
