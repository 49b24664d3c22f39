//! Cache module for storing Steam responses to disk
//!
//! This module provides a cache manager that persists API responses to the filesystem,
//! stamping each entry with its fetch time and the TTL of its class (7 days for
//! library lists, 30 days for per-game details). Expired entries are still
//! returned with an `is_expired` flag so offline mode can keep using them.

mod manager;

pub use manager::{
    CacheClass, CacheKey, CacheManager, CacheStats, CachedData, DETAILS_TTL_DAYS,
    LIBRARY_TTL_DAYS,
};
