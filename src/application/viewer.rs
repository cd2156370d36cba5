//! The viewer session: submits page requests and commits only the latest one.
//!
//! Every [`AuditLogViewer::show`] call takes a new generation. A fetch that
//! resolves after a newer request was submitted is handed back to its caller
//! as [`Submission::Superseded`] and never reaches the committed view, even
//! though the network call itself is allowed to finish.

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use metrics::counter;
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::bounds::{GuardDecision, PageBoundsGuard};
use super::error::FetchFailure;
use super::export;
use super::fetcher::AuditLogFetcher;
use super::links::{CapabilityLinks, audit_log_route};
use super::pagination::PageRequest;
use super::request_key::{RequestIdentity, build_for};
use crate::cache::{rw_read, rw_write};
use crate::domain::entries::AuditLogPage;
use crate::domain::filters::FilterState;

const SOURCE: &str = "application::viewer";

pub(crate) const METRIC_STALE_DISCARD: &str = "scm_audit_log_stale_discard_total";
pub(crate) const METRIC_PAGE_REDIRECT: &str = "scm_audit_log_page_redirect_total";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ViewOutcome {
    Loaded {
        page: Arc<AuditLogPage>,
        /// Page the user asked for when it had to be corrected.
        redirected_from: Option<NonZeroU32>,
    },
    Failed {
        #[serde(serialize_with = "serialize_failure")]
        failure: FetchFailure,
    },
}

fn serialize_failure<S>(failure: &FetchFailure, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&failure.notification())
}

/// What the presentation layer currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedView {
    pub generation: u64,
    /// The request that was served, with the corrected page after a redirect.
    pub request: PageRequest,
    pub identity: RequestIdentity,
    pub outcome: ViewOutcome,
}

impl CommittedView {
    /// Viewer route matching the served page, for updating the address bar.
    pub fn route(&self) -> String {
        audit_log_route(self.request.page, &self.request.filters)
    }

    pub fn page(&self) -> Option<&AuditLogPage> {
        match &self.outcome {
            ViewOutcome::Loaded { page, .. } => Some(page.as_ref()),
            ViewOutcome::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Committed(CommittedView),
    Superseded { generation: u64 },
}

#[derive(Clone)]
pub struct AuditLogViewer {
    inner: Arc<ViewerInner>,
}

struct ViewerInner {
    fetcher: AuditLogFetcher,
    base_link: String,
    export_link: Option<String>,
    generation: AtomicU64,
    committed: RwLock<Option<CommittedView>>,
}

impl AuditLogViewer {
    pub fn new(
        fetcher: AuditLogFetcher,
        base_link: impl Into<String>,
        export_link: Option<String>,
    ) -> Self {
        Self {
            inner: Arc::new(ViewerInner {
                fetcher,
                base_link: base_link.into(),
                export_link,
                generation: AtomicU64::new(0),
                committed: RwLock::new(None),
            }),
        }
    }

    /// Viewer for the links advertised by the host, or `None` when the caller
    /// may not read the audit log.
    pub fn from_links(fetcher: AuditLogFetcher, links: &CapabilityLinks) -> Option<Self> {
        let base_link = links.audit_log.clone()?;
        Some(Self::new(fetcher, base_link, links.csv_export.clone()))
    }

    pub fn base_link(&self) -> &str {
        &self.inner.base_link
    }

    pub fn can_export(&self) -> bool {
        self.inner.export_link.is_some()
    }

    /// Export link for the given filters; `None` when export is not offered.
    pub fn export_link(&self, filters: &FilterState) -> Option<String> {
        export::compose(self.inner.export_link.as_deref(), filters)
    }

    pub fn committed(&self) -> Option<CommittedView> {
        rw_read(&self.inner.committed, SOURCE, "committed").clone()
    }

    /// Submit `request` as the latest thing to show.
    #[instrument(skip(self, request), fields(page = request.page.get()))]
    pub async fn show(&self, request: PageRequest) -> Submission {
        let generation = self.submit();
        let asked_for = request.page;
        let mut request = request;
        let mut guard = PageBoundsGuard::new(request.page);

        loop {
            let identity = build_for(&self.inner.base_link, &request);
            let outcome = self.inner.fetcher.fetch(&identity).await;

            if !self.is_current(generation) {
                return self.discard(generation, &identity);
            }

            let outcome = match guard.resolve(outcome) {
                GuardDecision::Serve(page) => ViewOutcome::Loaded {
                    page,
                    redirected_from: guard.redirected().then_some(asked_for),
                },
                GuardDecision::Fail(failure) => ViewOutcome::Failed { failure },
                GuardDecision::Redirect(target) => {
                    counter!(METRIC_PAGE_REDIRECT).increment(1);
                    info!(
                        requested = request.page.get(),
                        redirect_to = target.get(),
                        "requested page is out of range; redirecting"
                    );
                    request = request.with_page(target);
                    guard.restart();
                    continue;
                }
            };

            return self.commit(CommittedView {
                generation,
                request,
                identity,
                outcome,
            });
        }
    }

    /// Drop cached pages and show `request` again from the source.
    pub async fn reload(&self, request: PageRequest) -> Submission {
        self.inner.fetcher.reload();
        self.show(request).await
    }

    /// Take the next generation. Held under the commit lock so that no older
    /// view can be written once a newer request exists.
    fn submit(&self) -> u64 {
        let _committed = rw_write(&self.inner.committed, SOURCE, "submit");
        self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == generation
    }

    fn commit(&self, view: CommittedView) -> Submission {
        let mut committed = rw_write(&self.inner.committed, SOURCE, "commit");
        if !self.is_current(view.generation) {
            drop(committed);
            return self.discard(view.generation, &view.identity);
        }
        *committed = Some(view.clone());
        Submission::Committed(view)
    }

    fn discard(&self, generation: u64, identity: &RequestIdentity) -> Submission {
        counter!(METRIC_STALE_DISCARD).increment(1);
        debug!(generation, identity = %identity, "discarding superseded audit log result");
        Submission::Superseded { generation }
    }
}
