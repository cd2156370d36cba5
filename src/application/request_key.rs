//! Canonical request identities for audit log pages.
//!
//! The identity doubles as the outbound URL and as the key for caching and
//! in-flight coalescing, so it must be byte-identical for equivalent inputs.

use std::fmt;
use std::num::NonZeroU32;

use url::form_urlencoded::Serializer;

use super::pagination::{PAGE_NUMBER_PARAM, PageRequest};
use crate::domain::filters::FilterState;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestIdentity {
    url: String,
    page: NonZeroU32,
}

impl RequestIdentity {
    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn page(&self) -> NonZeroU32 {
        self.page
    }

    /// Query part of the identity (without the leading `?`).
    pub fn query(&self) -> Option<&str> {
        self.url.split_once('?').map(|(_, query)| query)
    }

    pub fn into_string(self) -> String {
        self.url
    }
}

impl fmt::Display for RequestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

impl AsRef<str> for RequestIdentity {
    fn as_ref(&self) -> &str {
        &self.url
    }
}

/// Build the identity for `page` of the listing at `base_link` under `filters`.
pub fn build(base_link: &str, page: NonZeroU32, filters: &FilterState) -> RequestIdentity {
    let mut serializer = Serializer::new(String::new());
    serializer.append_pair(PAGE_NUMBER_PARAM, &page.to_string());
    filters.append_to(&mut serializer);
    RequestIdentity {
        url: join_query(base_link, &serializer.finish()),
        page,
    }
}

pub fn build_for(base_link: &str, request: &PageRequest) -> RequestIdentity {
    build(base_link, request.page, &request.filters)
}

/// Append an encoded query to a link that may already carry one.
pub(crate) fn join_query(link: &str, query: &str) -> String {
    if query.is_empty() {
        return link.to_string();
    }
    let separator = if link.ends_with('?') || link.ends_with('&') {
        ""
    } else if link.contains('?') {
        "&"
    } else {
        "?"
    };
    format!("{link}{separator}{query}")
}
