//! Reconciles the requested page with the page total reported by the server.

use std::num::NonZeroU32;
use std::sync::Arc;

use tracing::warn;

use super::error::FetchFailure;
use super::pagination::FIRST_PAGE;
use crate::domain::entries::AuditLogPage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    Pending,
    Valid(Arc<AuditLogPage>),
    OutOfRange {
        requested: NonZeroU32,
        redirect_to: NonZeroU32,
    },
    Error(FetchFailure),
}

/// What the caller has to do after a fetch resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Serve(Arc<AuditLogPage>),
    Redirect(NonZeroU32),
    Fail(FetchFailure),
}

/// The last page that can serve `requested`, or `None` when it is in range.
///
/// Page 1 is always in range, even for an empty log.
pub fn corrected_page(requested: NonZeroU32, page_total: u32) -> Option<NonZeroU32> {
    if requested > FIRST_PAGE && requested.get() > page_total {
        Some(NonZeroU32::new(page_total).unwrap_or(FIRST_PAGE))
    } else {
        None
    }
}

#[derive(Debug, Clone)]
pub struct PageBoundsGuard {
    requested: NonZeroU32,
    redirects: u8,
    state: GuardState,
}

impl PageBoundsGuard {
    /// Out-of-range results are corrected at most this many times per request.
    pub const MAX_REDIRECTS: u8 = 1;

    pub fn new(requested: NonZeroU32) -> Self {
        Self {
            requested,
            redirects: 0,
            state: GuardState::Pending,
        }
    }

    /// The page currently being requested (the corrected one after a redirect).
    pub fn requested(&self) -> NonZeroU32 {
        self.requested
    }

    pub fn state(&self) -> &GuardState {
        &self.state
    }

    pub fn redirected(&self) -> bool {
        self.redirects > 0
    }

    /// Feed the outcome of the fetch for the current page.
    pub fn resolve(
        &mut self,
        outcome: Result<Arc<AuditLogPage>, FetchFailure>,
    ) -> GuardDecision {
        let page = match outcome {
            Ok(page) => page,
            Err(failure) => {
                self.state = GuardState::Error(failure.clone());
                return GuardDecision::Fail(failure);
            }
        };

        match corrected_page(self.requested, page.page_total) {
            Some(redirect_to) if self.redirects < Self::MAX_REDIRECTS => {
                self.state = GuardState::OutOfRange {
                    requested: self.requested,
                    redirect_to,
                };
                self.requested = redirect_to;
                self.redirects += 1;
                GuardDecision::Redirect(redirect_to)
            }
            Some(redirect_to) => {
                warn!(
                    requested = self.requested.get(),
                    page_total = page.page_total,
                    redirect_to = redirect_to.get(),
                    "page total shrank again after redirect; serving the page as returned"
                );
                self.state = GuardState::Valid(Arc::clone(&page));
                GuardDecision::Serve(page)
            }
            None => {
                self.state = GuardState::Valid(Arc::clone(&page));
                GuardDecision::Serve(page)
            }
        }
    }

    /// Move back to `Pending` before fetching the corrected page.
    pub fn restart(&mut self) {
        if matches!(self.state, GuardState::OutOfRange { .. }) {
            self.state = GuardState::Pending;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).expect("non-zero page")
    }

    fn result(served: u32, page_total: u32, entries: usize) -> Arc<AuditLogPage> {
        use crate::domain::entries::AuditLogEntry;
        use time::macros::datetime;

        let entries = (0..entries)
            .map(|idx| AuditLogEntry {
                timestamp: datetime!(2023-01-01 00:00 UTC),
                entity: format!("entity-{idx}"),
                user: "trillian".into(),
                action: "modified".into(),
                entry: format!("entry {idx}"),
            })
            .collect();
        Arc::new(AuditLogPage {
            entries,
            page: page(served),
            page_total,
            labels: None,
        })
    }

    #[test]
    fn starts_pending() {
        let guard = PageBoundsGuard::new(page(3));
        assert_eq!(guard.state(), &GuardState::Pending);
        assert!(!guard.redirected());
    }

    #[test]
    fn out_of_range_redirects_to_last_page() {
        let mut guard = PageBoundsGuard::new(page(9));
        let decision = guard.resolve(Ok(result(9, 5, 0)));

        assert_eq!(decision, GuardDecision::Redirect(page(5)));
        assert_eq!(
            guard.state(),
            &GuardState::OutOfRange {
                requested: page(9),
                redirect_to: page(5)
            }
        );
        assert_eq!(guard.requested(), page(5));

        guard.restart();
        assert_eq!(guard.state(), &GuardState::Pending);

        let served = result(5, 5, 3);
        let decision = guard.resolve(Ok(Arc::clone(&served)));
        assert_eq!(decision, GuardDecision::Serve(Arc::clone(&served)));
        assert_eq!(guard.state(), &GuardState::Valid(served));
        assert!(guard.redirected());
    }

    #[test]
    fn first_page_of_empty_log_is_valid() {
        let mut guard = PageBoundsGuard::new(FIRST_PAGE);
        let decision = guard.resolve(Ok(result(1, 0, 0)));

        match decision {
            GuardDecision::Serve(page) => assert!(page.entries.is_empty()),
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn empty_log_beyond_first_page_goes_to_first_page() {
        assert_eq!(corrected_page(page(4), 0), Some(FIRST_PAGE));
    }

    #[test]
    fn last_page_is_in_range() {
        assert_eq!(corrected_page(page(5), 5), None);
        assert_eq!(corrected_page(page(6), 5), Some(page(5)));
    }

    #[test]
    fn failure_is_terminal_error() {
        let mut guard = PageBoundsGuard::new(page(2));
        let failure = FetchFailure::network("https://scm.example/audit", "connection refused");
        let decision = guard.resolve(Err(failure.clone()));

        assert_eq!(decision, GuardDecision::Fail(failure.clone()));
        assert_eq!(guard.state(), &GuardState::Error(failure));
    }

    #[test]
    fn redirects_at_most_once() {
        let mut guard = PageBoundsGuard::new(page(9));
        assert_eq!(
            guard.resolve(Ok(result(9, 5, 0))),
            GuardDecision::Redirect(page(5))
        );
        guard.restart();

        let shrunk = result(5, 3, 0);
        assert_eq!(
            guard.resolve(Ok(Arc::clone(&shrunk))),
            GuardDecision::Serve(shrunk)
        );
    }
}
