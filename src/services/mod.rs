pub mod autocomplete_cache;
pub mod cache_invalidation;
pub mod graph_queries;
pub mod lucene;
pub mod recommendations;

pub use autocomplete_cache::AutocompleteCache;
pub use cache_invalidation::RateLimiter as CacheInvalidationRateLimiter;
