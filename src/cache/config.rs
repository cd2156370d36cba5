//! Page cache configuration.

use std::num::NonZeroUsize;

use serde::Deserialize;

const DEFAULT_PAGE_LIMIT: usize = 64;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Keep fetched pages for reuse until evicted or reloaded.
    pub enabled: bool,
    /// Maximum number of pages kept in the LRU store.
    pub page_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            page_limit: settings.page_limit,
        }
    }
}

impl CacheConfig {
    /// Returns the page limit as NonZeroUsize, clamping to 1 if zero.
    pub fn page_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.page_limit).unwrap_or(NonZeroUsize::MIN)
    }
}
