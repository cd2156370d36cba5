//! Capability links advertised by the host and routes into the viewer.

use std::num::NonZeroU32;

use scm_audit_log_api_types::{AUDIT_LOG_CSV_EXPORT_REL, AUDIT_LOG_REL, IndexDocument};
use serde::Serialize;
use url::Url;
use url::form_urlencoded::Serializer;

use super::pagination::{FIRST_PAGE, PageRequest, page_from_segment};
use super::request_key::join_query;
use crate::domain::error::DomainError;
use crate::domain::filters::{FilterKey, FilterState};
use crate::domain::subjects::Subject;

/// Mount point of the viewer inside the host's admin area.
pub const AUDIT_LOG_ROUTE: &str = "/admin/audit-log";

/// Links to the read and export resources, as far as the caller may use them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapabilityLinks {
    pub audit_log: Option<String>,
    pub csv_export: Option<String>,
}

impl CapabilityLinks {
    /// Extract the audit log links from the host's index document.
    ///
    /// Relative hrefs are resolved against `base`; hrefs that cannot be
    /// resolved are treated as absent.
    pub fn from_index(index: &IndexDocument, base: &Url) -> Self {
        let resolve = |rel: &str| {
            index
                .href(rel)
                .and_then(|href| base.join(href).ok())
                .map(String::from)
        };
        Self {
            audit_log: resolve(AUDIT_LOG_REL),
            csv_export: resolve(AUDIT_LOG_CSV_EXPORT_REL),
        }
    }

    /// Whether the viewer can be shown at all.
    pub fn is_available(&self) -> bool {
        self.audit_log.is_some()
    }

    pub fn can_export(&self) -> bool {
        self.csv_export.is_some()
    }
}

/// Viewer route for `page` under `filters`, relative to the host root.
pub fn audit_log_route(page: NonZeroU32, filters: &FilterState) -> String {
    let mut serializer = Serializer::new(String::new());
    filters.append_to(&mut serializer);
    join_query(&format!("{AUDIT_LOG_ROUTE}/{page}"), &serializer.finish())
}

/// Resolve a viewer route (`/admin/audit-log/<page>?<filters>`) into a request.
///
/// The route may carry the host's `context_path` in front, as printed by
/// [`cross_link`]. A missing or unusable page segment means the first page.
pub fn parse_route(route: &str, context_path: &str) -> Result<PageRequest, DomainError> {
    let (path, query) = route.split_once('?').unwrap_or((route, ""));
    let context_path = context_path.trim_end_matches('/');
    let rest = path
        .strip_prefix(context_path)
        .and_then(|path| path.strip_prefix(AUDIT_LOG_ROUTE))
        .or_else(|| path.strip_prefix(AUDIT_LOG_ROUTE))
        .filter(|rest| rest.is_empty() || rest.starts_with('/'))
        .ok_or_else(|| DomainError::validation(format!("`{path}` is not an audit log route")))?;

    let segment = rest.trim_matches('/');
    let page = page_from_segment((!segment.is_empty()).then_some(segment));
    let filters = FilterState::from_query(query)?;
    Ok(PageRequest::new(page, filters))
}

/// Prefix a route with the host's context path (`/scm`, or empty).
pub fn with_context_path(context_path: &str, route: &str) -> String {
    format!("{}{route}", context_path.trim_end_matches('/'))
}

/// First page of the log pre-filtered to one subject.
pub fn subject_link(subject: &Subject) -> Result<String, DomainError> {
    let filters = FilterState::new()
        .with(FilterKey::Label, subject.label())?
        .with(FilterKey::Entity, subject.entity())?;
    Ok(audit_log_route(FIRST_PAGE, &filters))
}

/// Cross-link from a subject's detail page, or `None` when the viewer is not
/// available to the caller.
pub fn cross_link(
    links: &CapabilityLinks,
    context_path: &str,
    subject: &Subject,
) -> Result<Option<String>, DomainError> {
    if !links.is_available() {
        return Ok(None);
    }
    let route = subject_link(subject)?;
    Ok(Some(with_context_path(context_path, &route)))
}
