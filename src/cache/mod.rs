//! Page cache for fetched audit log pages.
//!
//! Behaviour is controlled by the `[cache]` section of the configuration:
//!
//! ```toml
//! [cache]
//! enabled = true
//! page_limit = 64
//! ```

mod config;
mod lock;
mod store;

pub use config::CacheConfig;
pub(crate) use lock::{rw_read, rw_write};
pub use store::PageStore;
pub(crate) use store::{METRIC_CACHE_EVICT, METRIC_CACHE_HIT, METRIC_CACHE_MISS};
