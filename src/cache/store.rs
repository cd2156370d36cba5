//! LRU store for fetched audit log pages.
//!
//! Entries are immutable `Arc`s keyed by request identity; a page for one
//! identity never overwrites another identity's entry.

use std::sync::{Arc, RwLock};

use lru::LruCache;
use metrics::counter;

use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};
use crate::application::request_key::RequestIdentity;
use crate::domain::entries::AuditLogPage;

const SOURCE: &str = "cache::store";

pub(crate) const METRIC_CACHE_HIT: &str = "scm_audit_log_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "scm_audit_log_cache_miss_total";
pub(crate) const METRIC_CACHE_EVICT: &str = "scm_audit_log_cache_evict_total";

pub struct PageStore {
    pages: RwLock<LruCache<RequestIdentity, Arc<AuditLogPage>>>,
}

impl PageStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            pages: RwLock::new(LruCache::new(config.page_limit_non_zero())),
        }
    }

    pub fn get(&self, identity: &RequestIdentity) -> Option<Arc<AuditLogPage>> {
        let hit = rw_write(&self.pages, SOURCE, "get")
            .get(identity)
            .map(Arc::clone);
        match hit {
            Some(_) => counter!(METRIC_CACHE_HIT).increment(1),
            None => counter!(METRIC_CACHE_MISS).increment(1),
        }
        hit
    }

    pub fn put(&self, identity: RequestIdentity, page: Arc<AuditLogPage>) {
        let evicted = rw_write(&self.pages, SOURCE, "put").push(identity.clone(), page);
        if evicted.is_some_and(|(evicted_identity, _)| evicted_identity != identity) {
            counter!(METRIC_CACHE_EVICT).increment(1);
        }
    }

    pub fn contains(&self, identity: &RequestIdentity) -> bool {
        rw_read(&self.pages, SOURCE, "contains").contains(identity)
    }

    pub fn len(&self) -> usize {
        rw_read(&self.pages, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all cached pages.
    pub fn clear(&self) {
        rw_write(&self.pages, SOURCE, "clear").clear();
    }
}
