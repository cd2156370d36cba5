//! Page requests: a 1-based page number plus the active filters.

use std::num::NonZeroU32;

use url::form_urlencoded;

use crate::domain::{error::DomainError, filters::FilterState};

/// Query parameter carrying the requested page.
pub const PAGE_NUMBER_PARAM: &str = "pageNumber";

pub const FIRST_PAGE: NonZeroU32 = NonZeroU32::MIN;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageRequest {
    pub page: NonZeroU32,
    pub filters: FilterState,
}

impl PageRequest {
    pub fn new(page: NonZeroU32, filters: FilterState) -> Self {
        Self { page, filters }
    }

    pub fn first(filters: FilterState) -> Self {
        Self::new(FIRST_PAGE, filters)
    }

    /// Same filters, different page.
    pub fn with_page(&self, page: NonZeroU32) -> Self {
        Self::new(page, self.filters.clone())
    }

    /// Parse the query part of a read request back into a page request.
    ///
    /// A missing `pageNumber` means the first page; a present but invalid one
    /// is rejected.
    pub fn from_query(query: &str) -> Result<Self, DomainError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let page = form_urlencoded::parse(query.as_bytes())
            .filter(|(key, _)| key == PAGE_NUMBER_PARAM)
            .last()
            .map(|(_, value)| parse_page_number(&value))
            .transpose()?
            .unwrap_or(FIRST_PAGE);
        let filters = FilterState::from_query(query)?;
        Ok(Self::new(page, filters))
    }
}

pub fn parse_page_number(value: &str) -> Result<NonZeroU32, DomainError> {
    value
        .parse::<NonZeroU32>()
        .map_err(|err| DomainError::validation(format!("invalid page number `{value}`: {err}")))
}

/// Page number from a route segment; anything unusable falls back to page 1.
pub fn page_from_segment(segment: Option<&str>) -> NonZeroU32 {
    segment
        .and_then(|value| value.parse::<NonZeroU32>().ok())
        .unwrap_or(FIRST_PAGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filters::FilterKey;

    #[test]
    fn from_query_defaults_to_first_page() {
        let request = PageRequest::from_query("entity=trillian").expect("valid query");
        assert_eq!(request.page, FIRST_PAGE);
        assert_eq!(request.filters.get(FilterKey::Entity), Some("trillian"));
    }

    #[test]
    fn from_query_rejects_zero_page() {
        let err = PageRequest::from_query("?pageNumber=0").expect_err("page 0 is invalid");
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[test]
    fn segment_fallback_matches_first_page() {
        assert_eq!(page_from_segment(None), FIRST_PAGE);
        assert_eq!(page_from_segment(Some("abc")), FIRST_PAGE);
        assert_eq!(page_from_segment(Some("0")), FIRST_PAGE);
        assert_eq!(page_from_segment(Some("7")).get(), 7);
    }

    #[test]
    fn with_page_keeps_filters() {
        let filters = FilterState::new()
            .with(FilterKey::Label, "group")
            .expect("valid filter");
        let request = PageRequest::first(filters.clone());
        let moved = request.with_page(NonZeroU32::new(4).expect("non-zero"));
        assert_eq!(moved.page.get(), 4);
        assert_eq!(moved.filters, filters);
    }
}
