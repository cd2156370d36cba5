//! Fetches audit log pages by request identity.
//!
//! Concurrent requests for the same identity share one in-flight call to the
//! [`AuditLogSource`]; successful pages are kept in the [`PageStore`] until
//! evicted or reloaded. Failures are returned to every waiting caller and are
//! never stored.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use metrics::{counter, histogram};
use scm_audit_log_api_types::{AuditLogDocument, LogEntryDto};
use tracing::{debug, warn};

use super::error::FetchFailure;
use super::request_key::RequestIdentity;
use crate::cache::{CacheConfig, PageStore};
use crate::domain::entries::{AuditLogEntry, AuditLogPage};

pub(crate) const METRIC_FETCH_TOTAL: &str = "scm_audit_log_fetch_total";
pub(crate) const METRIC_FETCH_COALESCED: &str = "scm_audit_log_fetch_coalesced_total";
pub(crate) const METRIC_FETCH_FAILURE: &str = "scm_audit_log_fetch_failure_total";
pub(crate) const METRIC_FETCH_MS: &str = "scm_audit_log_fetch_ms";

/// Anything that can answer a read request for one identity.
#[async_trait]
pub trait AuditLogSource: Send + Sync {
    async fn fetch_page(&self, identity: &RequestIdentity) -> Result<AuditLogPage, FetchFailure>;
}

type FetchResult = Result<Arc<AuditLogPage>, FetchFailure>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

#[derive(Clone)]
pub struct AuditLogFetcher {
    source: Arc<dyn AuditLogSource>,
    store: Option<Arc<PageStore>>,
    in_flight: Arc<DashMap<RequestIdentity, SharedFetch>>,
}

impl AuditLogFetcher {
    pub fn new(source: Arc<dyn AuditLogSource>, config: &CacheConfig) -> Self {
        let store = config.enabled.then(|| Arc::new(PageStore::new(config)));
        Self {
            source,
            store,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub async fn fetch(&self, identity: &RequestIdentity) -> FetchResult {
        if let Some(page) = self.store.as_ref().and_then(|store| store.get(identity)) {
            debug!(identity = %identity, "serving audit log page from cache");
            return Ok(page);
        }

        let shared = self.join_or_start(identity);
        let result = shared.clone().await;
        self.in_flight
            .remove_if(identity, |_, pending| pending.ptr_eq(&shared));
        result
    }

    /// Drop every cached page so that the next fetch goes to the source.
    pub fn reload(&self) {
        if let Some(store) = &self.store {
            store.clear();
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_cached(&self, identity: &RequestIdentity) -> bool {
        self.store
            .as_ref()
            .is_some_and(|store| store.contains(identity))
    }

    fn join_or_start(&self, identity: &RequestIdentity) -> SharedFetch {
        use dashmap::mapref::entry::Entry;

        match self.in_flight.entry(identity.clone()) {
            Entry::Occupied(pending) => {
                counter!(METRIC_FETCH_COALESCED).increment(1);
                debug!(identity = %identity, "joining in-flight audit log fetch");
                pending.get().clone()
            }
            Entry::Vacant(vacant) => {
                let fetch = start_fetch(
                    Arc::clone(&self.source),
                    self.store.clone(),
                    identity.clone(),
                );
                vacant.insert(fetch.clone());
                fetch
            }
        }
    }
}

fn start_fetch(
    source: Arc<dyn AuditLogSource>,
    store: Option<Arc<PageStore>>,
    identity: RequestIdentity,
) -> SharedFetch {
    async move {
        counter!(METRIC_FETCH_TOTAL).increment(1);
        let started_at = Instant::now();
        let result = source.fetch_page(&identity).await.map(Arc::new);
        histogram!(METRIC_FETCH_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        match &result {
            Ok(page) => {
                debug!(
                    identity = %identity,
                    entries = page.entries.len(),
                    page_total = page.page_total,
                    "audit log page fetched"
                );
                if let Some(store) = &store {
                    store.put(identity.clone(), Arc::clone(page));
                }
            }
            Err(failure) => {
                counter!(METRIC_FETCH_FAILURE, "kind" => failure.kind()).increment(1);
                warn!(identity = %identity, kind = failure.kind(), error = %failure, "audit log fetch failed");
            }
        }
        result
    }
    .boxed()
    .shared()
}

/// Decode a read response body into the page requested by `identity`.
///
/// `pageTotal` and `_embedded.entries` are required; the label facet is
/// optional.
pub fn decode_page(identity: &RequestIdentity, body: &[u8]) -> Result<AuditLogPage, FetchFailure> {
    let document: AuditLogDocument = serde_json::from_slice(body).map_err(|err| {
        FetchFailure::malformed(identity.as_str(), format!("failed to parse body: {err}"))
    })?;

    let page_total = document
        .page_total
        .ok_or_else(|| FetchFailure::malformed(identity.as_str(), "missing `pageTotal`"))?;
    let embedded = document
        .embedded
        .ok_or_else(|| FetchFailure::malformed(identity.as_str(), "missing `_embedded.entries`"))?;
    let entries = embedded
        .entries
        .ok_or_else(|| FetchFailure::malformed(identity.as_str(), "missing `_embedded.entries`"))?;

    Ok(AuditLogPage {
        entries: entries.into_iter().map(AuditLogEntry::from).collect(),
        page: identity.page(),
        page_total,
        labels: embedded.labels.map(|facet| facet.labels),
    })
}

impl From<LogEntryDto> for AuditLogEntry {
    fn from(dto: LogEntryDto) -> Self {
        Self {
            timestamp: dto.timestamp,
            entity: dto.entity,
            user: dto.user,
            action: dto.action,
            entry: dto.entry,
        }
    }
}
