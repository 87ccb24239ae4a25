//! Bounded insertion-ordered cache for autocomplete responses, keyed by
//! `(lower(q), type, limit)`. When full, the oldest 25% of entries are
//! evicted to make room — a cheap approximation of LRU that avoids tracking
//! per-entry access times.

use discogsography_core::models::{AutocompleteSuggestion, QueryKind};
use indexmap::IndexMap;
use tokio::sync::Mutex;

use crate::metrics::MetricsCollector;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    query: String,
    kind: QueryKind,
    limit: usize,
}

pub struct AutocompleteCache {
    capacity: usize,
    entries: Mutex<IndexMap<CacheKey, Vec<AutocompleteSuggestion>>>,
}

impl AutocompleteCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(IndexMap::new()),
        }
    }

    pub async fn get(
        &self,
        q: &str,
        kind: QueryKind,
        limit: usize,
        metrics: &MetricsCollector,
    ) -> Option<Vec<AutocompleteSuggestion>> {
        let key = CacheKey {
            query: q.to_lowercase(),
            kind,
            limit,
        };
        let entries = self.entries.lock().await;
        let hit = entries.get(&key).cloned();
        if hit.is_some() {
            metrics.record_autocomplete_cache_hit();
        } else {
            metrics.record_autocomplete_cache_miss();
        }
        hit
    }

    pub async fn insert(
        &self,
        q: &str,
        kind: QueryKind,
        limit: usize,
        suggestions: Vec<AutocompleteSuggestion>,
        metrics: &MetricsCollector,
    ) {
        let key = CacheKey {
            query: q.to_lowercase(),
            kind,
            limit,
        };
        let mut entries = self.entries.lock().await;

        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            let evict_count = (self.capacity / 4).max(1);
            for _ in 0..evict_count {
                if entries.shift_remove_index(0).is_none() {
                    break;
                }
            }
            metrics.record_autocomplete_cache_eviction(evict_count as u64);
        }

        entries.insert(key, suggestions);
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggestion(id: &str) -> Vec<AutocompleteSuggestion> {
        vec![AutocompleteSuggestion {
            id: id.to_string(),
            kind: QueryKind::Artist,
            name: id.to_string(),
            score: 1.0,
        }]
    }

    #[tokio::test]
    async fn hit_after_insert() {
        let cache = AutocompleteCache::new(8);
        let metrics = MetricsCollector::new().unwrap();
        cache
            .insert("Radio", QueryKind::Artist, 10, suggestion("1"), &metrics)
            .await;

        let hit = cache.get("radio", QueryKind::Artist, 10, &metrics).await;
        assert!(hit.is_some());
    }

    #[tokio::test]
    async fn distinct_limit_is_a_distinct_key() {
        let cache = AutocompleteCache::new(8);
        let metrics = MetricsCollector::new().unwrap();
        cache
            .insert("radio", QueryKind::Artist, 10, suggestion("1"), &metrics)
            .await;

        let miss = cache.get("radio", QueryKind::Artist, 20, &metrics).await;
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn eviction_keeps_size_at_or_below_capacity() {
        let cache = AutocompleteCache::new(4);
        let metrics = MetricsCollector::new().unwrap();
        for i in 0..5 {
            cache
                .insert(&format!("q{i}"), QueryKind::Artist, 10, suggestion("1"), &metrics)
                .await;
        }
        assert!(cache.len().await <= 4);
    }
}
